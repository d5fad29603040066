//! Push pipeline client.

use crate::error::{PushError, PushResult};
use crate::model::{FilterMode, PushPayload};
use crate::token::TokenProvider;
use bridge_core::Sample;
use config::PusherSettings;
use metrics::counter;
use reqwest::{Client, StatusCode};
use std::fmt;
use std::sync::Once;
use std::time::Duration;
use tracing::{debug, info, instrument};

static CONFIG_DUMP: Once = Once::new();

/// Connection parameters of the sink and its token endpoint.
#[derive(Clone)]
pub struct PusherConfig {
    pub user_name: String,
    pub user_password: String,
    pub client_id: String,
    pub client_secret: String,
    pub token_url: String,
    pub push_url: String,
    pub scopes: Vec<String>,
    pub request_timeout: Duration,
}

impl fmt::Debug for PusherConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PusherConfig")
            .field("user_name", &"[REDACTED]")
            .field("client_id", &"[REDACTED]")
            .field("token_url", &self.token_url)
            .field("push_url", &self.push_url)
            .field("scopes", &self.scopes)
            .finish()
    }
}

impl From<&PusherSettings> for PusherConfig {
    fn from(settings: &PusherSettings) -> Self {
        Self {
            user_name: settings.user_name.clone(),
            user_password: settings.user_password.clone(),
            client_id: settings.client_id.clone(),
            client_secret: settings.client_secret.clone(),
            token_url: settings.token_url.clone(),
            push_url: settings.push_url.clone(),
            scopes: settings.scopes.clone(),
            request_timeout: settings.request_timeout(),
        }
    }
}

/// Result of one push call that did not raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Nothing left after filtering; no request was made.
    Skipped,
    Delivered { count: usize },
    /// The failure went to the error sink.
    Failed,
}

pub struct DataPusher {
    http_client: Client,
    config: PusherConfig,
    token: TokenProvider,
}

impl DataPusher {
    pub fn new(config: PusherConfig) -> PushResult<Self> {
        let http_client = Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        CONFIG_DUMP.call_once(|| dump_config(&config));

        Ok(Self {
            http_client,
            config,
            token: TokenProvider::new(),
        })
    }

    pub fn config(&self) -> &PusherConfig {
        &self.config
    }

    /// Send `samples` to the sink in one request.
    ///
    /// With an `on_error` sink every failure is handed to it and
    /// [`PushOutcome::Failed`] is returned; without one the error is returned.
    #[instrument(skip_all, fields(samples = samples.len(), filter = ?filter))]
    pub async fn push(
        &self,
        samples: &[Sample],
        filter: FilterMode,
        on_error: Option<&(dyn Fn(&PushError) + Send + Sync)>,
    ) -> PushResult<PushOutcome> {
        let data = filter.apply(samples);
        if data.is_empty() {
            debug!("No sample left to push");
            return Ok(PushOutcome::Skipped);
        }

        let count = data.len();
        match self.deliver(PushPayload { data }).await {
            Ok(()) => {
                counter!("bridge.push.samples").increment(count as u64);
                Ok(PushOutcome::Delivered { count })
            }
            Err(e) => {
                counter!("bridge.push.errors").increment(1);
                match on_error {
                    Some(report) => {
                        report(&e);
                        Ok(PushOutcome::Failed)
                    }
                    None => Err(e),
                }
            }
        }
    }

    async fn deliver(&self, payload: PushPayload) -> PushResult<()> {
        if self.config.push_url.is_empty() {
            return Err(PushError::NotConfigured);
        }

        let token = self
            .token
            .bearer_token(&self.http_client, &self.config)
            .await?;

        let response = self
            .http_client
            .post(&self.config.push_url)
            .bearer_auth(token)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            debug!(count = payload.data.len(), "Samples pushed");
            return Ok(());
        }

        if status == StatusCode::UNAUTHORIZED {
            self.token.invalidate().await;
        }
        Err(PushError::Delivery {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
        })
    }
}

fn describe(value: &str, secret: bool) -> String {
    if value.trim().is_empty() {
        "Empty".to_string()
    } else if value.to_ascii_uppercase().contains("NOT SET") {
        "Not set, should be provided through the environment".to_string()
    } else if secret {
        "Set but secret".to_string()
    } else {
        format!("Set to {}", value)
    }
}

fn dump_config(config: &PusherConfig) {
    info!("Data pusher config check:");
    info!("user_name: {}", describe(&config.user_name, true));
    info!("user_password: {}", describe(&config.user_password, true));
    info!("client_id: {}", describe(&config.client_id, true));
    info!("client_secret: {}", describe(&config.client_secret, true));
    info!("token_url: {}", describe(&config.token_url, false));
    info!("push_url: {}", describe(&config.push_url, false));
}
