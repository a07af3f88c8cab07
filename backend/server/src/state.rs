use std::{sync::Arc, time::Duration};

use dbd_core::{
    catalog::CatalogGate,
    sources::{Source, load_catalog},
};
use redis::aio::ConnectionManager;
use tokio::time::sleep;
use tracing::{error, info, warn};

use super::{auth::Keys, config::Config, database::init_redis, twitch::TwitchApi};

const RETRY_START: Duration = Duration::from_secs(5);
const RETRY_MAX: Duration = Duration::from_secs(300);

pub struct AppState {
    pub config: Config,
    pub keys: Keys,
    pub catalog: CatalogGate,
    pub redis_connection: ConnectionManager,
    pub twitch: TwitchApi,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Arc<Self>> {
        let keys = Keys::from_base64_secret(&config.client_secret)?;
        let redis_connection = init_redis(&config.redis_url).await?;
        let twitch = TwitchApi::new(
            config.client_id.clone(),
            config.api_secret.clone(),
            keys.encoding().clone(),
        );

        Ok(Arc::new(Self {
            config,
            keys,
            catalog: CatalogGate::new(),
            redis_connection,
            twitch,
        }))
    }

    pub fn catalog_sources(&self) -> Vec<Source> {
        let mut sources = vec![Source::Filesystem {
            dir: self.config.catalog_dir.clone(),
        }];

        if let Some(base_url) = &self.config.catalog_url {
            sources.push(Source::Remote {
                base_url: base_url.clone(),
                cache_dir: Some(self.config.catalog_dir.clone()),
            });
        }

        sources
    }
}

/// Loads the catalog, retrying with backoff until it installs. Requests that need it answer
/// with a not ready error meanwhile.
pub async fn init_catalog(state: Arc<AppState>) {
    let sources = state.catalog_sources();
    let mut delay = RETRY_START;

    loop {
        match load_catalog(&sources).await {
            Ok(catalog) => {
                if let Err(e) = state.catalog.install(catalog) {
                    warn!("{e}");
                    return;
                }
                info!("Successfully initialized catalog");
                return;
            }
            Err(e) => {
                error!("Failed to load catalog: {e}. Retrying in {}s", delay.as_secs());
                sleep(delay).await;
                delay = (delay * 2).min(RETRY_MAX);
            }
        }
    }
}
