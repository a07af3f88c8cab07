//! # Catalog Sources
//!
//! Where the catalog comes from.
//!
//! Each segment is tried against every source in order until one answers. A local directory is
//! listed first so a restart does not depend on the remote store, the remote store writes what it
//! serves back into that directory.
//!
//! ## Layout
//! - `<dir>/addons.json`
//! - `<dir>/killer_perks.json`
//! - `<dir>/powers.json`
//! - `<dir>/survivor_perks.json`
use std::{
    fs,
    path::{Path, PathBuf},
};

use reqwest::Client;
use serde_json::Value;
use tracing::{info, warn};

use crate::{catalog::Catalog, error::SourceError};

pub const ADDONS: &str = "addons";
pub const KILLER_PERKS: &str = "killer_perks";
pub const POWERS: &str = "powers";
pub const SURVIVOR_PERKS: &str = "survivor_perks";

pub const SEGMENTS: [&str; 4] = [ADDONS, KILLER_PERKS, POWERS, SURVIVOR_PERKS];

#[derive(Debug, Clone)]
pub enum Source {
    Filesystem {
        dir: PathBuf,
    },
    Remote {
        base_url: String,
        cache_dir: Option<PathBuf>,
    },
}

impl Source {
    pub fn name(&self) -> String {
        match self {
            Source::Filesystem { dir } => format!("filesystem ({})", dir.display()),
            Source::Remote { base_url, .. } => format!("remote ({base_url})"),
        }
    }

    pub async fn fetch(&self, client: &Client, segment: &'static str) -> Result<Value, SourceError> {
        match self {
            Source::Filesystem { dir } => read_segment(dir, segment),
            Source::Remote { base_url, cache_dir } => {
                let value = fetch_segment(client, base_url, segment).await?;

                if let Some(dir) = cache_dir {
                    if let Err(e) = write_segment(dir, segment, &value) {
                        warn!("Failed to cache {segment}: {e}");
                    }
                }

                Ok(value)
            }
        }
    }
}

pub fn segment_path(dir: &Path, segment: &str) -> PathBuf {
    dir.join(format!("{segment}.json"))
}

pub fn read_segment(dir: &Path, segment: &'static str) -> Result<Value, SourceError> {
    let path = segment_path(dir, segment);
    let data = fs::read_to_string(&path).map_err(|source| SourceError::Io {
        path: path.display().to_string(),
        source,
    })?;

    serde_json::from_str(&data).map_err(|source| SourceError::Parse { segment, source })
}

pub fn write_segment(dir: &Path, segment: &'static str, value: &Value) -> Result<(), SourceError> {
    let path = segment_path(dir, segment);
    let io_error = |source| SourceError::Io {
        path: path.display().to_string(),
        source,
    };

    fs::create_dir_all(dir).map_err(io_error)?;
    let data = serde_json::to_vec(value).map_err(|source| SourceError::Parse { segment, source })?;
    fs::write(&path, data).map_err(io_error)?;

    #[cfg(feature = "verbose")]
    info!("Cached {segment} to {}", path.display());

    Ok(())
}

pub async fn fetch_segment(client: &Client, base_url: &str, segment: &'static str) -> Result<Value, SourceError> {
    let url = format!("{}/{segment}.json", base_url.trim_end_matches('/'));
    let http_error = |source| SourceError::Http { segment, source };

    client
        .get(&url)
        .send()
        .await
        .map_err(http_error)?
        .error_for_status()
        .map_err(http_error)?
        .json()
        .await
        .map_err(http_error)
}

async fn try_sources(client: &Client, sources: &[Source], segment: &'static str) -> Result<Value, SourceError> {
    for source in sources {
        info!("Trying {} for {segment}...", source.name());

        match source.fetch(client, segment).await {
            Ok(value) => return Ok(value),
            Err(e) => {
                warn!("Could not get {segment} from {}: {e}. Attempting next source.", source.name());
            }
        }
    }

    Err(SourceError::Exhausted {
        segment,
        tried: sources.iter().map(Source::name).collect::<Vec<_>>().join(", "),
    })
}

pub async fn load_catalog(sources: &[Source]) -> Result<Catalog, SourceError> {
    info!("Loading catalog");
    let client = Client::new();

    let addons = try_sources(&client, sources, ADDONS).await?;
    let killer_perks = try_sources(&client, sources, KILLER_PERKS).await?;
    let powers = try_sources(&client, sources, POWERS).await?;
    let survivor_perks = try_sources(&client, sources, SURVIVOR_PERKS).await?;

    let catalog = Catalog::from_segments(survivor_perks, killer_perks, addons, powers)?;
    info!(
        "Loaded catalog: {} survivor perks, {} killer perks, {} killers",
        catalog.survivor_perks().len(),
        catalog.killer_perks().len(),
        catalog.powers_per_killer().len()
    );

    Ok(catalog)
}
