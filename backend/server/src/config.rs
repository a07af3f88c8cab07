use std::{env, fmt::Display, fs::read_to_string, path::PathBuf, str::FromStr};

use thiserror::Error;
use tracing::{info, warn};

pub const DEFAULT_CLIENT_ID: &str = "4xyn35uwlhr23ek0xzmpf1w7tmen2q";

// base64 of `super-secret`
const DEV_SECRET: &str = "c3VwZXItc2VjcmV0";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid {key} value: {message}")]
    Invalid { key: &'static str, message: String },

    #[error("No {0} found in secrets or env variables, refusing to use dev secret in production mode")]
    MissingSecret(&'static str),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub production: bool,
    pub redis_url: String,
    pub client_id: String,
    /// Base64 encoded extension secret, signs and verifies extension JWTs.
    pub client_secret: String,
    /// OAuth client secret, only needed for the moderator lookup.
    pub api_secret: Option<String>,
    pub redirect_uri: String,
    pub catalog_dir: PathBuf,
    pub catalog_url: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let production = try_load::<String>("ENVIRONMENT", "development")? == "production";
        if !production {
            warn!("Running in development mode");
        }

        let client_secret = match read_secret("CLIENT_SECRET") {
            Some(secret) => secret,
            None if !production => {
                warn!("Using development/test secret `super-secret`");
                DEV_SECRET.to_string()
            }
            None => return Err(ConfigError::MissingSecret("CLIENT_SECRET")),
        };

        let api_secret = read_secret("API_SECRET");
        if api_secret.is_none() {
            warn!("API_SECRET not set, moderator lookups are disabled");
        }

        Ok(Self {
            port: try_load("PORT", "5000")?,
            production,
            redis_url: try_load("REDIS_URL", "redis://localhost:6379")?,
            client_id: try_load("CLIENT_ID", DEFAULT_CLIENT_ID)?,
            client_secret,
            api_secret,
            redirect_uri: try_load("REDIRECT_URI", "http://localhost:5000/oauth")?,
            catalog_dir: try_load("CATALOG_DIR", "/tmp")?,
            catalog_url: var("CATALOG_URL").ok(),
        })
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        warn!("Environment variable {key} not found, using default");
    })
}

fn try_load<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e: T::Err| ConfigError::Invalid {
            key,
            message: e.to_string(),
        })
}

/// Docker secret first, then the plain environment.
fn read_secret(secret_name: &str) -> Option<String> {
    let path = format!("/run/secrets/{secret_name}");

    read_to_string(&path)
        .map(|s| s.trim().to_string())
        .map_err(|e| {
            info!("Failed to read {secret_name} from file: {e}");
        })
        .or_else(|_| env::var(secret_name).map(|s| s.trim().to_string()))
        .ok()
        .filter(|secret| !secret.is_empty())
}
