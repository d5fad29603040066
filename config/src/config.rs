//! # Service Settings
//!
//! Settings of the acquisition service itself, as opposed to the acquisition
//! configuration (sources, groups, items) that lives in the watched CSV file.
//!
//! All settings structures:
//! - Use `serde` for serialization/deserialization, every field defaulted
//! - Use `validator` for input validation
//! - Keep secrets out of `Debug` output

use bridge_core::SourceKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use validator::Validate;

/// Top-level settings document.
///
/// ## Usage
/// ```rust,no_run
/// use config::ServiceSettings;
///
/// let settings = ServiceSettings::default();
/// println!("Watching {}", settings.acquisition.config_file.display());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default, PartialEq)]
pub struct ServiceSettings {
    #[serde(default)]
    #[validate(nested)]
    pub acquisition: AcquisitionSettings,

    #[serde(default)]
    #[validate(nested)]
    pub source: SourceSettings,

    #[serde(default)]
    #[validate(nested)]
    pub pusher: PusherSettings,

    #[serde(default)]
    #[validate(nested)]
    pub observability: ObservabilitySettings,
}

/// Acquisition lifecycle settings.
///
/// ## Fields
/// - `config_file`: path of the acquisition CSV (default: "configuration.csv")
/// - `start_timeout_secs`: bound on orchestrator start (default: 30, range: 1-600)
/// - `stop_timeout_secs`: bound on orchestrator stop (default: 30, range: 1-600)
/// - `fingerprint_retry_attempts`: reads of a locked file (default: 5, range: 1-100)
/// - `fingerprint_retry_delay_ms`: delay between those reads (default: 1000)
/// - `keep_bad_values`: forward bad-quality samples (default: false)
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct AcquisitionSettings {
    #[serde(default = "default_config_file")]
    #[validate(custom(function = "validate_config_file"))]
    pub config_file: PathBuf,

    #[serde(default = "default_start_timeout")]
    #[validate(range(min = 1, max = 600))]
    pub start_timeout_secs: u64,

    #[serde(default = "default_stop_timeout")]
    #[validate(range(min = 1, max = 600))]
    pub stop_timeout_secs: u64,

    #[serde(default = "default_fingerprint_retry_attempts")]
    #[validate(range(min = 1, max = 100))]
    pub fingerprint_retry_attempts: usize,

    #[serde(default = "default_fingerprint_retry_delay")]
    #[validate(range(min = 1, max = 60000))]
    pub fingerprint_retry_delay_ms: u64,

    #[serde(default)]
    pub keep_bad_values: bool,
}

fn default_config_file() -> PathBuf {
    PathBuf::from("configuration.csv")
}

fn default_start_timeout() -> u64 {
    30
}

fn default_stop_timeout() -> u64 {
    30
}

fn default_fingerprint_retry_attempts() -> usize {
    5
}

fn default_fingerprint_retry_delay() -> u64 {
    1000
}

fn validate_config_file(value: &PathBuf) -> Result<(), validator::ValidationError> {
    if value.as_os_str().is_empty() {
        return Err(validator::ValidationError::new(
            "Acquisition configuration file is required",
        ));
    }
    Ok(())
}

impl AcquisitionSettings {
    pub fn start_timeout(&self) -> Duration {
        Duration::from_secs(self.start_timeout_secs)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }

    pub fn fingerprint_retry_delay(&self) -> Duration {
        Duration::from_millis(self.fingerprint_retry_delay_ms)
    }
}

impl Default for AcquisitionSettings {
    fn default() -> Self {
        Self {
            config_file: default_config_file(),
            start_timeout_secs: default_start_timeout(),
            stop_timeout_secs: default_stop_timeout(),
            fingerprint_retry_attempts: default_fingerprint_retry_attempts(),
            fingerprint_retry_delay_ms: default_fingerprint_retry_delay(),
            keep_bad_values: false,
        }
    }
}

/// Data source settings.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct SourceSettings {
    /// Connector technology
    #[serde(default)]
    pub kind: SourceKind,

    /// Substituted for sources addressed as `Default` in the CSV
    #[serde(default = "default_source_url")]
    #[validate(length(min = 1))]
    pub default_url: String,

    #[serde(default = "default_request_timeout")]
    #[validate(range(min = 1, max = 300))]
    pub request_timeout_secs: u64,
}

fn default_source_url() -> String {
    "UNSPECIFIED DEFAULT SOURCE".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl SourceSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            kind: SourceKind::default(),
            default_url: default_source_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Push pipeline settings.
///
/// Every credential may be empty at load time; the push pipeline reports what
/// is missing when it is constructed.
#[derive(Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct PusherSettings {
    #[serde(default)]
    pub user_name: String,

    #[serde(default)]
    pub user_password: String,

    #[serde(default)]
    pub client_id: String,

    #[serde(default)]
    pub client_secret: String,

    #[serde(default)]
    #[validate(custom(function = "validate_optional_url"))]
    pub token_url: String,

    #[serde(default)]
    #[validate(custom(function = "validate_optional_url"))]
    pub push_url: String,

    #[serde(default = "default_scopes")]
    #[validate(length(min = 1))]
    pub scopes: Vec<String>,

    #[serde(default = "default_request_timeout")]
    #[validate(range(min = 1, max = 300))]
    pub request_timeout_secs: u64,
}

fn default_scopes() -> Vec<String> {
    vec!["openid".to_string(), "push-data".to_string()]
}

fn validate_optional_url(value: &str) -> Result<(), validator::ValidationError> {
    if value.is_empty() || value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(validator::ValidationError::new("URL must use http or https"))
    }
}

impl PusherSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for PusherSettings {
    fn default() -> Self {
        Self {
            user_name: String::new(),
            user_password: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            token_url: String::new(),
            push_url: String::new(),
            scopes: default_scopes(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl fmt::Debug for PusherSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PusherSettings")
            .field("user_name", &self.user_name)
            .field("user_password", &"[redacted]")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .field("token_url", &self.token_url)
            .field("push_url", &self.push_url)
            .field("scopes", &self.scopes)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct ObservabilitySettings {
    /// Logging level, overridden by `RUST_LOG` when set
    #[serde(default = "default_logging_level")]
    #[validate(custom(function = "validate_logging_level"))]
    pub logging_level: String,
}

fn default_logging_level() -> String {
    "info".to_string()
}

fn validate_logging_level(value: &str) -> Result<(), validator::ValidationError> {
    match value {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(validator::ValidationError::new("Invalid logging level")),
    }
}

impl Default for ObservabilitySettings {
    fn default() -> Self {
        Self {
            logging_level: default_logging_level(),
        }
    }
}
