//! JSON-over-HTTP source connector.
//!
//! Talks to a gateway that fronts the plant data source:
//! - `POST {url}/read` with `{"items": [...]}` returns
//!   `{"values": [{"itemName", "value", "quality", "timestamp", "error"}]}`
//! - `GET {url}/browse` returns `{"nodes": [...]}`

use async_trait::async_trait;
use bridge_core::{
    ItemReading, NamespaceNode, Quality, SourceConnector, SourceKind, SourceSession, SourceValue,
};
use chrono::{DateTime, Utc};
use errors::SourceError;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Serialize)]
struct ReadRequest<'a> {
    items: &'a [String],
}

#[derive(Debug, Deserialize)]
struct ReadResponse {
    #[serde(default)]
    values: Vec<WireReading>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireReading {
    item_name: String,
    #[serde(default)]
    value: serde_json::Value,
    #[serde(default = "default_quality")]
    quality: Quality,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    error: Option<String>,
}

fn default_quality() -> Quality {
    Quality::Bad
}

impl From<WireReading> for ItemReading {
    fn from(wire: WireReading) -> Self {
        let fault = wire.error.filter(|e| !e.trim().is_empty());
        Self {
            item_name: wire.item_name,
            value: SourceValue::from(wire.value),
            quality: if fault.is_some() {
                Quality::Bad
            } else {
                wire.quality
            },
            timestamp: wire.timestamp.unwrap_or_else(Utc::now),
            fault,
        }
    }
}

#[derive(Debug, Deserialize)]
struct BrowseResponse {
    #[serde(default)]
    nodes: Vec<NamespaceNode>,
}

/// Connector for sources exposed through an HTTP gateway.
#[derive(Debug, Clone)]
pub struct HttpGatewayConnector {
    client: Client,
}

impl HttpGatewayConnector {
    pub fn new(request_timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| SourceError::Connection {
                url: String::new(),
                reason: e.to_string(),
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl SourceConnector for HttpGatewayConnector {
    fn kind(&self) -> SourceKind {
        SourceKind::HttpGateway
    }

    async fn connect(&self, source_url: &str) -> Result<Box<dyn SourceSession>, SourceError> {
        let base = Url::parse(source_url).map_err(|e| SourceError::InvalidUrl {
            url: source_url.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(SourceError::InvalidUrl {
                url: source_url.to_string(),
                reason: format!("unsupported scheme '{}'", base.scheme()),
            });
        }
        Ok(Box::new(HttpGatewaySession {
            client: self.client.clone(),
            url: source_url.trim_end_matches('/').to_string(),
        }))
    }
}

struct HttpGatewaySession {
    client: Client,
    url: String,
}

impl HttpGatewaySession {
    fn transport_error(&self, e: &reqwest::Error) -> SourceError {
        if e.is_connect() {
            SourceError::Connection {
                url: self.url.clone(),
                reason: e.to_string(),
            }
        } else {
            SourceError::Read {
                url: self.url.clone(),
                reason: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl SourceSession for HttpGatewaySession {
    async fn read_items(&mut self, item_names: &[String]) -> Result<Vec<ItemReading>, SourceError> {
        debug!(source = %self.url, items = item_names.len(), "Reading items");
        let response = self
            .client
            .post(format!("{}/read", self.url))
            .json(&ReadRequest { items: item_names })
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Read {
                url: self.url.clone(),
                reason: format!("{} - {}", status.as_u16(), body),
            });
        }

        let payload: ReadResponse = response.json().await.map_err(|e| SourceError::Read {
            url: self.url.clone(),
            reason: e.to_string(),
        })?;
        Ok(payload.values.into_iter().map(ItemReading::from).collect())
    }

    async fn browse(&mut self) -> Result<Vec<NamespaceNode>, SourceError> {
        let response = self
            .client
            .get(format!("{}/browse", self.url))
            .send()
            .await
            .map_err(|e| SourceError::Browse {
                url: self.url.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Browse {
                url: self.url.clone(),
                reason: format!("{}", status.as_u16()),
            });
        }

        let payload: BrowseResponse = response.json().await.map_err(|e| SourceError::Browse {
            url: self.url.clone(),
            reason: e.to_string(),
        })?;
        Ok(payload.nodes)
    }

    async fn close(self: Box<Self>) -> Result<(), SourceError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_reading_with_error_is_faulted() {
        let wire: WireReading = serde_json::from_value(serde_json::json!({
            "itemName": "Tag1",
            "value": 3.0,
            "quality": "good",
            "error": "E_UNKNOWN_ITEM"
        }))
        .unwrap();
        let reading = ItemReading::from(wire);
        assert_eq!(reading.quality, Quality::Bad);
        assert_eq!(reading.fault.as_deref(), Some("E_UNKNOWN_ITEM"));
        assert!(!reading.is_good());
    }

    #[test]
    fn test_wire_reading_defaults() {
        let wire: WireReading =
            serde_json::from_value(serde_json::json!({ "itemName": "Tag1" })).unwrap();
        let reading = ItemReading::from(wire);
        assert_eq!(reading.value, SourceValue::Empty);
        assert_eq!(reading.quality, Quality::Bad);
    }

    #[tokio::test]
    async fn test_connect_rejects_bad_url() {
        let connector = HttpGatewayConnector::new(Duration::from_secs(5)).unwrap();
        let result = connector.connect("opcda://plant/Server.1").await;
        assert!(matches!(result, Err(SourceError::InvalidUrl { .. })));
        let result = connector.connect("not a url").await;
        assert!(matches!(result, Err(SourceError::InvalidUrl { .. })));
    }
}
