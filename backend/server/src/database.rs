//! # Redis
//!
//! Per channel storage.
//!
//! ## Keys
//! - `<channel_id>_build`: JSON of the last published build, replaced wholesale on every publish
//! - `oauth/<user_id>`: JSON access and refresh token pair for the moderator lookup
//!
//! A channel without a build key shows the empty notPlaying build. There is no delete.
use std::time::Duration;

use dbd_core::build::{Build, ValidBuild};
use redis::{
    AsyncCommands, Client, RedisError,
    aio::{ConnectionManager, ConnectionManagerConfig},
};
use tracing::{debug, warn};

use crate::{error::AppError, twitch::OauthToken};

pub async fn init_redis(redis_url: &str) -> Result<ConnectionManager, RedisError> {
    let config = ConnectionManagerConfig::new()
        .set_number_of_retries(1)
        .set_connection_timeout(Duration::from_millis(100));

    let client = Client::open(redis_url)?;
    client.get_connection_manager_with_config(config).await
}

pub fn build_key(channel_id: &str) -> String {
    format!("{channel_id}_build")
}

pub fn oauth_key(user_id: &str) -> String {
    format!("oauth/{user_id}")
}

pub async fn get_build(mut connection: ConnectionManager, channel_id: &str) -> Result<Option<Build>, AppError> {
    let stored: Option<String> = connection.get(build_key(channel_id)).await?;
    debug!("Existing build for {channel_id}: {stored:?}");

    Ok(stored.and_then(|data| {
        serde_json::from_str(&data)
            .map_err(|e| warn!("Discarding unreadable build for {channel_id}: {e}"))
            .ok()
    }))
}

pub async fn set_build(mut connection: ConnectionManager, channel_id: &str, build: &ValidBuild) -> Result<(), AppError> {
    let data = serde_json::to_string(build).map_err(|e| AppError::InternalError(e.to_string()))?;
    let _: () = connection.set(build_key(channel_id), data).await?;

    Ok(())
}

pub async fn get_oauth(mut connection: ConnectionManager, user_id: &str) -> Result<Option<OauthToken>, AppError> {
    let stored: Option<String> = connection.get(oauth_key(user_id)).await?;

    stored
        .map(|data| serde_json::from_str(&data).map_err(|e| AppError::InternalError(e.to_string())))
        .transpose()
}

pub async fn set_oauth(mut connection: ConnectionManager, user_id: &str, token: &OauthToken) -> Result<(), AppError> {
    let data = serde_json::to_string(token).map_err(|e| AppError::InternalError(e.to_string()))?;
    let _: () = connection.set(oauth_key(user_id), data).await?;

    Ok(())
}

pub async fn has_oauth(mut connection: ConnectionManager, user_id: &str) -> Result<bool, AppError> {
    Ok(connection.exists(oauth_key(user_id)).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys() {
        assert_eq!(build_key("1234"), "1234_build");
        assert_eq!(oauth_key("1234"), "oauth/1234");
    }
}
