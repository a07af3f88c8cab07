use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use dbd_core::error::{BuildError, MutationError, PermissionError};
use redis::RedisError;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::{config::ConfigError, twitch::TwitchError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("No token found in request")]
    MissingToken,

    #[error("Invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("You do not have the permissions to perform this action")]
    Forbidden,

    #[error("{0}")]
    Unauthorized(String),

    #[error("You are not the broadcaster of {0}")]
    NotBroadcaster(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    MalformedPayload(String),

    #[error("Game data is not loaded yet, please try again later")]
    CatalogNotReady,

    #[error("OAuth is not available for {0}")]
    OauthUnavailable(String),

    #[error("Something went wrong with your OAuth request. Please try again later.")]
    OauthDenied,

    #[error("Something went wrong processing oauth request")]
    Upstream(#[source] TwitchError),

    #[error("This route could not be found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(#[from] RedisError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MissingToken | AppError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden | AppError::Unauthorized(_) | AppError::NotBroadcaster(_) => {
                StatusCode::FORBIDDEN
            }
            AppError::Validation(_)
            | AppError::MalformedPayload(_)
            | AppError::OauthUnavailable(_)
            | AppError::OauthDenied => StatusCode::BAD_REQUEST,
            AppError::CatalogNotReady | AppError::Upstream(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Database(_) | AppError::Config(_) | AppError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("{self}");
            "Unknown error, please try again later".to_string()
        } else {
            if let AppError::Upstream(e) = &self {
                error!("Twitch request failed: {e}");
            }
            self.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<PermissionError> for AppError {
    fn from(_: PermissionError) -> Self {
        AppError::Forbidden
    }
}

impl From<BuildError> for AppError {
    fn from(error: BuildError) -> Self {
        MutationError::from(error).into()
    }
}

impl From<MutationError> for AppError {
    fn from(error: MutationError) -> Self {
        match error {
            unauthorized @ MutationError::Unauthorized { .. } => {
                AppError::Unauthorized(unauthorized.to_string())
            }
            MutationError::Malformed(message) => {
                warn!("Malformed build payload, likely a client bug: {message}");
                AppError::MalformedPayload(message)
            }
            MutationError::Invalid(message) => AppError::Validation(message),
            MutationError::CatalogNotReady => AppError::CatalogNotReady,
        }
    }
}

impl From<TwitchError> for AppError {
    fn from(error: TwitchError) -> Self {
        match error {
            TwitchError::OauthMissing(user_id) | TwitchError::OauthRevoked(user_id) => {
                AppError::OauthUnavailable(user_id)
            }
            other => AppError::Upstream(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mutation_error_statuses() {
        let unauthorized: AppError = MutationError::Unauthorized {
            channel_id: "1234".to_string(),
        }
        .into();
        assert_eq!(unauthorized.status(), StatusCode::FORBIDDEN);
        assert!(unauthorized.to_string().contains("1234"));

        let invalid: AppError = MutationError::Invalid("bad perk".to_string()).into();
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
        assert_eq!(invalid.to_string(), "bad perk");

        let malformed: AppError = MutationError::Malformed("not an object".to_string()).into();
        assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);

        let not_ready: AppError = BuildError::CatalogNotReady.into();
        assert_eq!(not_ready.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_auth_statuses() {
        assert_eq!(AppError::MissingToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::from(PermissionError::InsufficientRole).status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_oauth_missing_is_client_error() {
        let error: AppError = TwitchError::OauthMissing("1234".to_string()).into();
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error.to_string(), "OAuth is not available for 1234");

        let revoked: AppError = TwitchError::OauthRevoked("1234".to_string()).into();
        assert_eq!(revoked.status(), StatusCode::BAD_REQUEST);
        assert_eq!(revoked.to_string(), "OAuth is not available for 1234");
    }

    #[test]
    fn test_internal_errors_are_hidden() {
        let response = AppError::InternalError("secret detail".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
