use async_trait::async_trait;
use chrono::{DateTime, Utc};
use errors::SourceError;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::types::Quality;

/// Raw value as delivered by a source, before numeric conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Empty,
}

impl SourceValue {
    /// Numeric form used by samples. Booleans map to 0/1; text must parse as
    /// a float.
    pub fn as_f64(&self) -> Result<f64, String> {
        match self {
            Self::Float(v) => Ok(*v),
            Self::Int(v) => Ok(*v as f64),
            Self::Bool(v) => Ok(if *v { 1.0 } else { 0.0 }),
            Self::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|e| format!("cannot convert '{s}' to a number: {e}")),
            Self::Empty => Err("value is empty".to_string()),
        }
    }
}

impl From<serde_json::Value> for SourceValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Empty,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => n.as_f64().map_or(Self::Empty, Self::Float),
            },
            serde_json::Value::String(s) => Self::Text(s),
            other => Self::Text(other.to_string()),
        }
    }
}

/// One value returned by a source for one requested item name.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemReading {
    pub item_name: String,
    pub value: SourceValue,
    pub quality: Quality,
    pub timestamp: DateTime<Utc>,
    /// Per-item fault reported by the source. A faulted reading is always
    /// treated as bad.
    pub fault: Option<String>,
}

impl ItemReading {
    pub fn good(item_name: impl Into<String>, value: SourceValue, timestamp: DateTime<Utc>) -> Self {
        Self {
            item_name: item_name.into(),
            value,
            quality: Quality::Good,
            timestamp,
            fault: None,
        }
    }

    pub fn faulted(item_name: impl Into<String>, fault: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            item_name: item_name.into(),
            value: SourceValue::Empty,
            quality: Quality::Bad,
            timestamp,
            fault: Some(fault.into()),
        }
    }

    pub fn is_good(&self) -> bool {
        self.fault.is_none() && self.quality.is_good()
    }
}

/// Descriptive property attached to a namespace leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemProperty {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

/// Node of a source's browsable namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceNode {
    pub item_name: String,
    #[serde(default)]
    pub is_leaf: bool,
    #[serde(default)]
    pub properties: Vec<ItemProperty>,
    #[serde(default)]
    pub children: Vec<NamespaceNode>,
}

impl NamespaceNode {
    /// Depth-first visit of every leaf below (and including) this node.
    pub fn leaves(&self) -> Vec<&NamespaceNode> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if node.is_leaf {
                out.push(node);
            }
            stack.extend(node.children.iter().rev());
        }
        out
    }
}

/// Protocol family a connector speaks.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    #[default]
    HttpGateway,
    OpcDa,
    OpcUa,
}

/// Opens sessions against a source endpoint.
///
/// Sessions are scoped to a single read cycle: the poll loop connects, reads
/// and closes on every cycle, so a connector must not assume sessions are
/// long-lived.
#[async_trait]
pub trait SourceConnector: Send + Sync {
    fn kind(&self) -> SourceKind;

    async fn connect(&self, source_url: &str) -> Result<Box<dyn SourceSession>, SourceError>;
}

/// An open connection to one source.
#[async_trait]
pub trait SourceSession: Send {
    /// Reads the current value of each named item.
    ///
    /// The result may be in any order and may omit items; callers match
    /// readings back to items by name.
    async fn read_items(&mut self, item_names: &[String]) -> Result<Vec<ItemReading>, SourceError>;

    /// Enumerates the source namespace.
    async fn browse(&mut self) -> Result<Vec<NamespaceNode>, SourceError>;

    async fn close(self: Box<Self>) -> Result<(), SourceError>;
}
