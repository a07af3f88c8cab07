use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Directory the catalog segments are written to and checked in
    dir: PathBuf,

    /// Base url of the remote store; without it the directory is only checked
    #[arg(long)]
    url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if let Some(url) = &args.url {
        process::sync_catalog(url, &args.dir).await?;
    }

    process::check_catalog(&args.dir).await?;

    Ok(())
}
