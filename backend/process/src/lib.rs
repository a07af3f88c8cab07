//! # Catalog Sync
//!
//! Pulls every catalog segment from the remote store into a local directory, the same directory
//! the server reads first on startup. Then loads the directory back to make sure it forms a
//! complete catalog (every killer's power has addons).
use std::path::Path;

use anyhow::Result;
use dbd_core::{
    catalog::Catalog,
    sources::{SEGMENTS, Source, fetch_segment, load_catalog, write_segment},
};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;

pub async fn sync_catalog(base_url: &str, dir: &Path) -> Result<()> {
    let client = Client::new();

    let pb = ProgressBar::new(SEGMENTS.len() as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
        )?
        .progress_chars("=> "),
    );

    for segment in SEGMENTS {
        pb.set_message(format!("Fetching {segment}"));

        let value = fetch_segment(&client, base_url, segment).await?;
        write_segment(dir, segment, &value)?;

        pb.inc(1);
    }

    pb.finish_with_message("Done");
    Ok(())
}

pub async fn check_catalog(dir: &Path) -> Result<Catalog> {
    let sources = [Source::Filesystem {
        dir: dir.to_path_buf(),
    }];

    let catalog = load_catalog(&sources).await?;

    println!("Survivor Perks: {}", catalog.survivor_perks().len());
    println!("Killer Perks: {}", catalog.killer_perks().len());
    println!("Killers: {}", catalog.powers_per_killer().len());
    println!("Powers With Addons: {}\n", catalog.all_addons().len());

    Ok(catalog)
}
