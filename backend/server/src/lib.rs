//! Backend of the DbD Info Twitch extension.
//!
//! Viewers read the broadcaster's current Dead by Daylight build (perks, addons, killer). The
//! broadcaster and, depending on the sharing config, their moderators publish it.
//!
//!
//!
//! # Infrastructure
//! - Extension frontend talks to this server directly, every request carries the Twitch extension JWT
//! - Builds and OAuth tokens live in Redis
//! - Sharing config lives in the Twitch configuration service, broadcaster segment
//! - New builds are pushed to viewers over Twitch extension pubsub
//! - Game data (the catalog) is read once at startup from disk, falling back to the remote store
//!
//!
//!
//! # Routes
//!
//! | Route | Role |
//! |---|---|
//! | `GET /perks`, `/addons`, `/killer_names`, `/killer_addons` | viewer |
//! | `GET /get_build` | viewer |
//! | `POST /set_build` | moderator, then sharing config |
//! | `GET /get_oauth_status`, `/oauth`, `/moderators/{channel_id}` | broadcaster |
//!
//!
//!
//! # Environment
//!
//! | Variable | Default |
//! |---|---|
//! | `PORT` | `5000` |
//! | `ENVIRONMENT` | `development` |
//! | `REDIS_URL` | `redis://localhost:6379` |
//! | `CLIENT_ID` | extension client id |
//! | `REDIRECT_URI` | `http://localhost:5000/oauth` |
//! | `CATALOG_DIR` | `/tmp` |
//! | `CATALOG_URL` | unset, no remote source |
//!
//! Secrets `CLIENT_SECRET` and `API_SECRET` are read from `/run/secrets/<NAME>` or the environment.
//!
//!
//!
//! # Setup
//!
//! Run locally against a local Redis.
//! ```sh
//! RUST_LOG=info cargo run --bin extension
//! ```
//!
//! Warm the catalog directory first.
//! ```sh
//! cargo run --bin process -- /tmp --url https://example.com/gamedata
//! ```
use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    http::{
        Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::{get, post},
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod routes;
pub mod state;
pub mod twitch;
pub mod utils;

use config::Config;
use routes::{
    addons_handler, get_build_handler, killer_addons_handler, killer_names_handler, moderators_handler,
    not_found_handler, oauth_handler, oauth_status_handler, perks_handler, set_build_handler,
};
use state::{AppState, init_catalog};

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/perks", get(perks_handler))
        .route("/addons", get(addons_handler))
        .route("/killer_names", get(killer_names_handler))
        .route("/killer_addons", get(killer_addons_handler))
        .route("/get_oauth_status", get(oauth_status_handler))
        .route("/set_build", post(set_build_handler))
        .route("/get_build", get(get_build_handler))
        .route("/oauth", get(oauth_handler))
        .route("/moderators/{channel_id}", get(moderators_handler))
        .fallback(not_found_handler)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub async fn start_server() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Loading config...");
    let config = Config::load()?;

    info!("Initializing state...");
    let state = AppState::new(config).await?;

    tokio::spawn(init_catalog(state.clone()));

    info!("Starting server...");
    let app = router(state.clone());

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutting down...");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
