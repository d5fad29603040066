use crate::client::PusherConfig;
use crate::error::{PushError, PushResult};
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::debug;

/// A token is renewed this long before it expires.
const EXPIRY_MARGIN_SECS: i64 = 60;

struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Resource-owner password grant with a cached bearer token.
pub(crate) struct TokenProvider {
    cached: RwLock<Option<CachedToken>>,
}

impl TokenProvider {
    pub(crate) fn new() -> Self {
        Self {
            cached: RwLock::new(None),
        }
    }

    pub(crate) async fn bearer_token(
        &self,
        http_client: &Client,
        config: &PusherConfig,
    ) -> PushResult<String> {
        {
            let cached = self.cached.read().await;
            if let Some(ref token) = *cached {
                if token.expires_at > Utc::now() + Duration::seconds(EXPIRY_MARGIN_SECS) {
                    return Ok(token.token.clone());
                }
            }
        }

        if config.token_url.is_empty() {
            return Err(PushError::NotConfigured);
        }

        debug!(token_url = %config.token_url, "Requesting bearer token");
        let scope = config.scopes.join(" ");
        let response = http_client
            .post(&config.token_url)
            .basic_auth(&config.client_id, Some(&config.client_secret))
            .form(&[
                ("grant_type", "password"),
                ("username", config.user_name.as_str()),
                ("password", config.user_password.as_str()),
                ("scope", scope.as_str()),
            ])
            .send()
            .await
            .map_err(|e| PushError::Token(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            let reason = match serde_json::from_str::<TokenErrorResponse>(&body) {
                Ok(TokenErrorResponse {
                    error,
                    error_description: Some(description),
                }) => format!("{} ({})", error, description),
                Ok(TokenErrorResponse { error, .. }) => error,
                Err(_) => format!("{} - {}", status, body),
            };
            return Err(PushError::Token(reason));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| PushError::Token(format!("Failed to parse token response: {}", e)))?;

        if let Some(expires_in) = token_response.expires_in {
            let mut cached = self.cached.write().await;
            *cached = Some(CachedToken {
                token: token_response.access_token.clone(),
                expires_at: Utc::now() + Duration::seconds(expires_in),
            });
        }

        Ok(token_response.access_token)
    }

    pub(crate) async fn invalidate(&self) {
        let mut cached = self.cached.write().await;
        *cached = None;
    }
}
