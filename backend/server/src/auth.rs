//! # Authentication
//!
//! Every request carries the JWT Twitch hands to the extension frontend, signed with the
//! base64 extension secret.
//!
//! ## Where the token is looked up
//! - `Authorization` header, with or without the `Bearer` prefix
//! - `auth` query parameter
//! - `state` query parameter, which is how the token comes back from the OAuth redirect
use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Query},
    http::{HeaderMap, Uri, header::AUTHORIZATION, request::Parts},
};
use dbd_core::permissions::{Actor, Role};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{error::AppError, state::AppState};

#[derive(Clone)]
pub struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl Keys {
    pub fn from_base64_secret(secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        Ok(Self {
            encoding: EncodingKey::from_base64_secret(secret)?,
            decoding: DecodingKey::from_base64_secret(secret)?,
        })
    }

    pub fn encoding(&self) -> &EncodingKey {
        &self.encoding
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PubsubPerms {
    #[serde(default)]
    pub listen: Vec<String>,
    #[serde(default)]
    pub send: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
    pub role: Role,
    pub channel_id: String,
    #[serde(default)]
    pub is_unlinked: bool,
    pub opaque_user_id: String,
    #[serde(default)]
    pub pubsub_perms: PubsubPerms,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub actor: Actor,
    pub opaque_user_id: String,
    pub is_unlinked: bool,
    pub pubsub_perms: PubsubPerms,
    /// Raw token, passed through as OAuth state.
    pub token: String,
}

impl AuthenticatedUser {
    pub fn require(&self, role: Role) -> Result<(), AppError> {
        debug!("Required permissions: {role:?}");
        self.actor.require(role)?;

        Ok(())
    }

    pub fn channel_id(&self) -> &str {
        &self.actor.channel_id
    }
}

#[derive(Deserialize)]
struct TokenQuery {
    auth: Option<String>,
    state: Option<String>,
}

pub fn find_token(headers: &HeaderMap, uri: &Uri) -> Option<String> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.strip_prefix("Bearer ").unwrap_or(value).trim().to_string());

    header
        .or_else(|| {
            let Query(query) = Query::<TokenQuery>::try_from_uri(uri).ok()?;
            query.auth.or(query.state)
        })
        .filter(|token| !token.is_empty())
}

pub fn authenticate(token: &str, keys: &Keys) -> Result<AuthenticatedUser, AppError> {
    let validation = Validation::new(Algorithm::HS256);
    let claims = decode::<Claims>(token, &keys.decoding, &validation)?.claims;

    Ok(AuthenticatedUser {
        actor: Actor {
            role: claims.role,
            user_id: claims.user_id,
            channel_id: claims.channel_id,
        },
        opaque_user_id: claims.opaque_user_id,
        is_unlinked: claims.is_unlinked,
        pubsub_perms: claims.pubsub_perms,
        token: token.to_string(),
    })
}

impl FromRequestParts<Arc<AppState>> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let token = find_token(&parts.headers, &parts.uri).ok_or(AppError::MissingToken)?;
        let user = authenticate(&token, &state.keys)?;

        debug!("Authenticated {} for {}", user.opaque_user_id, parts.uri.path());
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{Header, encode};

    use super::*;

    const SECRET: &str = "c3VwZXItc2VjcmV0";

    fn token_for(role: Role, user_id: Option<&str>, expires_in: Duration, secret: &str) -> String {
        let claims = Claims {
            exp: (Utc::now() + expires_in).timestamp(),
            iat: Some(Utc::now().timestamp()),
            role,
            channel_id: "1234".to_string(),
            is_unlinked: false,
            opaque_user_id: "U1234".to_string(),
            pubsub_perms: PubsubPerms::default(),
            user_id: user_id.map(str::to_string),
        };

        let keys = Keys::from_base64_secret(secret).unwrap();
        encode(&Header::default(), &claims, keys.encoding()).unwrap()
    }

    #[test]
    fn test_authenticate_valid_token() {
        let keys = Keys::from_base64_secret(SECRET).unwrap();
        let token = token_for(Role::Moderator, Some("5678"), Duration::minutes(5), SECRET);

        let user = authenticate(&token, &keys).unwrap();

        assert_eq!(user.actor.role, Role::Moderator);
        assert_eq!(user.actor.user_id.as_deref(), Some("5678"));
        assert_eq!(user.channel_id(), "1234");
        assert_eq!(user.token, token);
        assert!(user.require(Role::Moderator).is_ok());
        assert!(matches!(user.require(Role::Broadcaster), Err(AppError::Forbidden)));
    }

    #[test]
    fn test_unshared_identity() {
        let keys = Keys::from_base64_secret(SECRET).unwrap();
        let token = token_for(Role::Viewer, None, Duration::minutes(5), SECRET);

        assert_eq!(authenticate(&token, &keys).unwrap().actor.user_id, None);
    }

    #[test]
    fn test_expired_token() {
        let keys = Keys::from_base64_secret(SECRET).unwrap();
        let token = token_for(Role::Broadcaster, None, Duration::minutes(-10), SECRET);

        assert!(matches!(authenticate(&token, &keys), Err(AppError::InvalidToken(_))));
    }

    #[test]
    fn test_wrong_secret() {
        let keys = Keys::from_base64_secret(SECRET).unwrap();
        let token = token_for(Role::Broadcaster, None, Duration::minutes(5), "b3RoZXItc2VjcmV0");

        assert!(matches!(authenticate(&token, &keys), Err(AppError::InvalidToken(_))));
    }

    #[test]
    fn test_find_token() {
        let mut headers = HeaderMap::new();
        let plain: Uri = "/perks".parse().unwrap();

        assert_eq!(find_token(&headers, &plain), None);

        let query: Uri = "/oauth?code=abc&state=from-state".parse().unwrap();
        assert_eq!(find_token(&headers, &query).as_deref(), Some("from-state"));

        let query: Uri = "/perks?auth=from-auth&state=from-state".parse().unwrap();
        assert_eq!(find_token(&headers, &query).as_deref(), Some("from-auth"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        assert_eq!(find_token(&headers, &query).as_deref(), Some("from-header"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("bare-token"));
        assert_eq!(find_token(&headers, &plain).as_deref(), Some("bare-token"));
    }
}
