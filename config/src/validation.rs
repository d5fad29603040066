//! # Settings Validation
//!
//! Validates the service settings using the `validator` crate.

use crate::config::ServiceSettings;
use validator::Validate;

/// Validate the settings document.
///
/// ## Validation Rules
/// ### Acquisition
/// - `config_file`: non-empty
/// - `start_timeout_secs`, `stop_timeout_secs`: 1-600
/// - `fingerprint_retry_attempts`: 1-100
/// - `fingerprint_retry_delay_ms`: 1-60000
///
/// ### Source
/// - `default_url`: non-empty
/// - `request_timeout_secs`: 1-300
///
/// ### Pusher
/// - `token_url`, `push_url`: empty or http(s)
/// - `scopes`: at least one
///
/// ### Observability
/// - `logging_level`: must be "trace", "debug", "info", "warn", or "error"
pub fn validate(settings: &ServiceSettings) -> Result<(), validator::ValidationErrors> {
    settings.validate()
}
