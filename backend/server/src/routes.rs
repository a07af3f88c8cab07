use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{StatusCode, header::LOCATION},
    response::{Html, IntoResponse, Response},
};
use dbd_core::{
    mutation::authorize_and_validate,
    permissions::{Role, reconcile_mods},
};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::{
    auth::AuthenticatedUser,
    database,
    error::AppError,
    state::AppState,
    twitch::{PubsubEvent, TwitchError},
    utils::{data, parse_body},
};

type SharedState = Arc<AppState>;

const OAUTH_SUCCESS_PAGE: &str = r#"<!DOCTYPE html>
<html>
  <head><title>Authorization successful</title></head>
  <body>
    <p>Moderator access was granted. You can close this window and return to the extension configuration.</p>
  </body>
</html>"#;

pub async fn perks_handler(State(state): State<SharedState>, user: AuthenticatedUser) -> Result<impl IntoResponse, AppError> {
    user.require(Role::Viewer)?;
    let snapshot = state.catalog.state();
    let catalog = snapshot.ready()?;

    Ok(data(json!({
        "survivor": catalog.survivor_perks(),
        "killer": catalog.killer_perks(),
    })))
}

pub async fn addons_handler(State(state): State<SharedState>, user: AuthenticatedUser) -> Result<impl IntoResponse, AppError> {
    user.require(Role::Viewer)?;
    let snapshot = state.catalog.state();

    Ok(data(snapshot.ready()?.all_addons().clone()))
}

pub async fn killer_names_handler(
    State(state): State<SharedState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    user.require(Role::Viewer)?;
    let snapshot = state.catalog.state();

    Ok(data(snapshot.ready()?.powers_per_killer().clone()))
}

pub async fn killer_addons_handler(
    State(state): State<SharedState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    user.require(Role::Viewer)?;
    let snapshot = state.catalog.state();

    Ok(data(snapshot.ready()?.addons_per_killer().clone()))
}

pub async fn oauth_status_handler(
    State(state): State<SharedState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    user.require(Role::Broadcaster)?;
    let channel_id = user.channel_id();
    debug!("get_oauth_status for {channel_id}");

    let available = database::has_oauth(state.redis_connection.clone(), channel_id).await?;

    Ok(data(json!({ "available": available })))
}

pub async fn set_build_handler(
    State(state): State<SharedState>,
    user: AuthenticatedUser,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    user.require(Role::Moderator)?;
    let channel_id = user.channel_id();
    debug!("set_build request received for {channel_id}");

    let config = state
        .twitch
        .configuration_segment(channel_id)
        .await
        .unwrap_or_else(|e| {
            warn!("Could not fetch configuration for {channel_id}, treating as unset: {e}");
            None
        });

    let build = authorize_and_validate(&user.actor, config.as_ref(), &parse_body(&body), &state.catalog.state())?;

    database::set_build(state.redis_connection.clone(), channel_id, &build).await?;

    if let Err(e) = state
        .twitch
        .send_message(channel_id, &PubsubEvent::NewBuild(&build))
        .await
    {
        warn!("Could not broadcast new build for {channel_id}: {e}");
    }

    #[cfg(feature = "verbose")]
    info!("Set build for {channel_id} to {:?}", build.as_build());

    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_build_handler(
    State(state): State<SharedState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    user.require(Role::Viewer)?;
    let channel_id = user.channel_id();

    let build = database::get_build(state.redis_connection.clone(), channel_id)
        .await?
        .unwrap_or_default();
    debug!("Sending back {build:?} for {channel_id}");

    Ok(data(build))
}

#[derive(Deserialize)]
pub struct OauthQuery {
    code: Option<String>,
    error_description: Option<String>,
}

pub async fn oauth_handler(
    State(state): State<SharedState>,
    user: AuthenticatedUser,
    Query(query): Query<OauthQuery>,
) -> Result<Response, AppError> {
    user.require(Role::Broadcaster)?;
    let redirect_uri = &state.config.redirect_uri;

    if let Some(error) = query.error_description {
        warn!("OAuth error: {error}");
        return Err(AppError::OauthDenied);
    }

    let Some(code) = query.code.filter(|code| !code.is_empty()) else {
        let url = state.twitch.authorize_url(redirect_uri, &user.token)?;
        debug!("No code found, redirecting to {url}");

        return Ok((StatusCode::FOUND, [(LOCATION, url.to_string())]).into_response());
    };

    let channel_id = user.channel_id();
    debug!("OAuth code received for {channel_id}");

    let token = state.twitch.exchange_code(&code, redirect_uri).await?;
    database::set_oauth(state.redis_connection.clone(), channel_id, &token).await?;
    info!("Stored oauth token for {channel_id}");

    if let Err(e) = state
        .twitch
        .send_message(channel_id, &PubsubEvent::OauthReady(None))
        .await
    {
        warn!("Could not send oauthReady for {channel_id}: {e}");
    }

    Ok(Html(OAUTH_SUCCESS_PAGE).into_response())
}

async fn access_token(state: &AppState, channel_id: &str) -> Result<String, AppError> {
    let stored = database::get_oauth(state.redis_connection.clone(), channel_id)
        .await?
        .ok_or_else(|| TwitchError::OauthMissing(channel_id.to_string()))?;

    let refreshed = state.twitch.refresh_token(channel_id, &stored).await?;
    database::set_oauth(state.redis_connection.clone(), channel_id, &refreshed).await?;

    Ok(refreshed.access_token)
}

pub async fn moderators_handler(
    State(state): State<SharedState>,
    user: AuthenticatedUser,
    Path(channel_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    user.require(Role::Broadcaster)?;
    debug!("/moderators request for {}", user.channel_id());

    if channel_id != user.channel_id() {
        return Err(AppError::NotBroadcaster(channel_id));
    }

    let access_token = access_token(&state, &channel_id).await?;
    let moderators = state.twitch.moderators(&channel_id, &access_token).await?;

    let config = state
        .twitch
        .configuration_segment(&channel_id)
        .await
        .unwrap_or_else(|e| {
            warn!("Could not fetch configuration for {channel_id}: {e}");
            None
        });
    let mod_list = reconcile_mods(config.as_ref().map(|config| &config.mod_list), &moderators);

    debug!("Returning {} moderators", moderators.len());
    Ok(data(json!({
        "moderators": moderators,
        "modList": mod_list,
    })))
}

pub async fn not_found_handler() -> AppError {
    AppError::NotFound
}
