//! # Twitch API
//!
//! The few Twitch endpoints the backend proxies.
//!
//! ## Extension JWT
//! Configuration and pubsub calls are signed with the extension secret using the `external` role.
//!
//! ## OAuth
//! The moderator list needs a user access token with `moderation:read`. The broadcaster grants it
//! through the authorization code flow, the refresh token is stored and exchanged on every lookup.
use chrono::{Duration, Utc};
use dbd_core::{
    build::ValidBuild,
    permissions::{SharingConfig, TwitchModerator},
};
use jsonwebtoken::{EncodingKey, Header, encode};
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::auth::PubsubPerms;

const HELIX: &str = "https://api.twitch.tv/helix";
const OAUTH_AUTHORIZE: &str = "https://id.twitch.tv/oauth2/authorize";
const OAUTH_TOKEN: &str = "https://id.twitch.tv/oauth2/token";
const MODERATION_SCOPE: &str = "moderation:read";

#[derive(Error, Debug)]
pub enum TwitchError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Error {status} from {url}: {body}")]
    Status {
        status: StatusCode,
        url: String,
        body: String,
    },

    #[error("Could not sign request: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Unexpected payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Oauth access has not yet been granted by {0}")]
    OauthMissing(String),

    #[error("Access token for {0} could not be refreshed. May have been revoked by user.")]
    OauthRevoked(String),

    #[error("Invalid url: {0}")]
    Url(String),

    #[error("No API_SECRET configured")]
    MissingApiSecret,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OauthToken {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
}

impl From<TokenResponse> for OauthToken {
    fn from(response: TokenResponse) -> Self {
        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum PubsubEvent<'a> {
    NewBuild(&'a ValidBuild),
    OauthReady(Option<()>),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExternalClaims {
    pub exp: i64,
    pub role: String,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pubsub_perms: Option<PubsubPerms>,
}

#[derive(Deserialize)]
struct HelixList<T> {
    data: Vec<T>,
    #[serde(default)]
    pagination: Pagination,
}

#[derive(Deserialize, Default)]
struct Pagination {
    cursor: Option<String>,
}

#[derive(Deserialize)]
struct ConfigurationSegment {
    content: String,
}

#[derive(Serialize)]
struct PubsubMessage<'a> {
    target: [&'a str; 1],
    broadcaster_id: &'a str,
    is_global_broadcast: bool,
    message: String,
}

#[derive(Clone)]
pub struct TwitchApi {
    client: Client,
    client_id: String,
    api_secret: Option<String>,
    key: EncodingKey,
}

impl TwitchApi {
    pub fn new(client_id: String, api_secret: Option<String>, key: EncodingKey) -> Self {
        Self {
            client: Client::new(),
            client_id,
            api_secret,
            key,
        }
    }

    pub fn sign(&self, channel_id: &str, pubsub: bool) -> Result<String, TwitchError> {
        let claims = ExternalClaims {
            exp: (Utc::now() + Duration::minutes(1)).timestamp(),
            role: "external".to_string(),
            user_id: channel_id.to_string(),
            channel_id: pubsub.then(|| channel_id.to_string()),
            pubsub_perms: pubsub.then(|| PubsubPerms {
                listen: Vec::new(),
                send: vec!["broadcast".to_string()],
            }),
        };

        Ok(encode(&Header::default(), &claims, &self.key)?)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, TwitchError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let url = response.url().to_string();
        let body = response.text().await.unwrap_or_default();
        error!("Error while requesting {url}: {body}");

        Err(TwitchError::Status { status, url, body })
    }

    /// The broadcaster's sharing config, `None` when nothing was published yet.
    pub async fn configuration_segment(&self, channel_id: &str) -> Result<Option<SharingConfig>, TwitchError> {
        let jwt = self.sign(channel_id, false)?;

        let response = self
            .client
            .get(format!("{HELIX}/extensions/configurations"))
            .query(&[
                ("extension_id", self.client_id.as_str()),
                ("segment", "broadcaster"),
                ("broadcaster_id", channel_id),
            ])
            .bearer_auth(jwt)
            .header("Client-Id", &self.client_id)
            .send()
            .await?;

        let segments: HelixList<ConfigurationSegment> = Self::check(response).await?.json().await?;

        match segments.data.into_iter().next() {
            Some(segment) if !segment.content.is_empty() => Ok(serde_json::from_str(&segment.content)?),
            _ => Ok(None),
        }
    }

    pub async fn send_message(&self, channel_id: &str, event: &PubsubEvent<'_>) -> Result<(), TwitchError> {
        let jwt = self.sign(channel_id, true)?;
        let body = PubsubMessage {
            target: ["broadcast"],
            broadcaster_id: channel_id,
            is_global_broadcast: false,
            message: serde_json::to_string(event)?,
        };

        let response = self
            .client
            .post(format!("{HELIX}/extensions/pubsub"))
            .bearer_auth(jwt)
            .header("Client-Id", &self.client_id)
            .json(&body)
            .send()
            .await?;

        Self::check(response).await?;
        debug!("Sent pubsub message to {channel_id}");

        Ok(())
    }

    pub async fn moderators(&self, channel_id: &str, access_token: &str) -> Result<Vec<TwitchModerator>, TwitchError> {
        let mut moderators = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(format!("{HELIX}/moderation/moderators"))
                .query(&[("broadcaster_id", channel_id), ("first", "100")])
                .bearer_auth(access_token)
                .header("Client-Id", &self.client_id);

            if let Some(after) = &cursor {
                request = request.query(&[("after", after)]);
            }

            info!("Requesting moderators for {channel_id}");
            let page: HelixList<TwitchModerator> = Self::check(request.send().await?).await?.json().await?;
            moderators.extend(page.data);

            match page.pagination.cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }

        Ok(moderators)
    }

    fn api_secret(&self) -> Result<&str, TwitchError> {
        self.api_secret.as_deref().ok_or(TwitchError::MissingApiSecret)
    }

    pub fn authorize_url(&self, redirect_uri: &str, state: &str) -> Result<Url, TwitchError> {
        let url = Url::parse_with_params(
            OAUTH_AUTHORIZE,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("response_type", "code"),
                ("scope", MODERATION_SCOPE),
                ("state", state),
            ],
        )
        .map_err(|e| TwitchError::Url(e.to_string()))?;

        Ok(url)
    }

    pub async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<OauthToken, TwitchError> {
        let response = self
            .client
            .post(OAUTH_TOKEN)
            .query(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.api_secret()?),
                ("code", code),
                ("grant_type", "authorization_code"),
                ("redirect_uri", redirect_uri),
            ])
            .send()
            .await?;

        let tokens: TokenResponse = Self::check(response).await?.json().await?;
        Ok(tokens.into())
    }

    pub async fn refresh_token(&self, user_id: &str, token: &OauthToken) -> Result<OauthToken, TwitchError> {
        debug!("Refreshing token for {user_id}");

        let response = self
            .client
            .post(OAUTH_TOKEN)
            .query(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", token.refresh_token.as_str()),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.api_secret()?),
            ])
            .send()
            .await?;

        let response = Self::check(response).await.map_err(|e| {
            error!("Could not refresh token for {user_id}: {e}");
            TwitchError::OauthRevoked(user_id.to_string())
        })?;

        let tokens: TokenResponse = response.json().await?;
        Ok(tokens.into())
    }
}
