//! Publishes a build file to a running backend the way the extension's moderator view does:
//! advisory check against the live build first, warnings need a second confirmation.
use std::{
    fs,
    io::{self, Write},
    path::PathBuf,
};

use anyhow::{Context, Result, bail};
use clap::Parser;
use dbd_core::{
    advisory::{AdvisoryGate, Submission},
    build::Build,
};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// JSON file holding the build to publish
    build: PathBuf,

    /// Extension JWT of the broadcaster or a moderator
    #[arg(long)]
    token: String,

    #[arg(long, default_value = "http://localhost:5000")]
    url: String,

    /// Confirm warnings without asking
    #[arg(long)]
    yes: bool,
}

#[derive(Deserialize)]
struct Data<T> {
    data: T,
}

async fn live_build(client: &Client, args: &Args) -> Result<Option<Build>> {
    let response = client
        .get(format!("{}/get_build", args.url))
        .bearer_auth(&args.token)
        .send()
        .await?;

    if !response.status().is_success() {
        println!("Could not fetch the live build ({}), skipping comparison", response.status());
        return Ok(None);
    }

    let live: Data<Build> = response.json().await?;
    Ok(Some(live.data))
}

fn confirm() -> Result<bool> {
    print!("Publish anyway? [y/N] ");
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;

    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let data = fs::read_to_string(&args.build).with_context(|| format!("Reading {}", args.build.display()))?;
    let candidate: Build = serde_json::from_str(&data).context("Build file is not a valid build")?;

    let client = Client::new();
    let live = live_build(&client, &args).await?;

    let mut gate = AdvisoryGate::new();
    loop {
        match gate.submit(&candidate, live.as_ref()) {
            Submission::Proceed => break,
            Submission::Blocked(message) => bail!("{}", message.content),
            Submission::Warned(message) => {
                println!("{}", message.content);

                if !args.yes && !confirm()? {
                    println!("Not published");
                    return Ok(());
                }
            }
        }
    }

    let response = client
        .post(format!("{}/set_build", args.url))
        .bearer_auth(&args.token)
        .json(&candidate)
        .send()
        .await?;

    match response.status() {
        StatusCode::NO_CONTENT => println!("Published"),
        status => {
            let body = response.text().await.unwrap_or_default();
            bail!("Publishing failed with {status}: {body}");
        }
    }

    Ok(())
}
