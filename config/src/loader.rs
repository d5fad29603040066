//! # Environment Variable Loader
//!
//! Overlays service settings with environment variables following 12-factor
//! app principles, then resolves the final settings.
//!
//! # Naming Convention
//! Every variable carries the `TB_` prefix.

use crate::config::ServiceSettings;
use crate::error::{SettingsError, SettingsResult};
use crate::file_loader::load_from_file;
use crate::validation::validate;
use bridge_core::SourceKind;
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Load settings from defaults plus environment variables.
///
/// ## Environment Variables
/// ### Acquisition
/// - `TB_CONFIG_FILE`: acquisition CSV path
/// - `TB_START_TIMEOUT_SECS`, `TB_STOP_TIMEOUT_SECS`
/// - `TB_FINGERPRINT_RETRY_ATTEMPTS`, `TB_FINGERPRINT_RETRY_DELAY_MS`
/// - `TB_KEEP_BAD_VALUES`: true/false
///
/// ### Source
/// - `TB_SOURCE_KIND`: http-gateway/opc-da/opc-ua
/// - `TB_DEFAULT_SOURCE`: URL substituted for `Default` sources
/// - `TB_SOURCE_TIMEOUT_SECS`
///
/// ### Pusher
/// - `TB_PUSH_USER_NAME`, `TB_PUSH_USER_PASSWORD`
/// - `TB_PUSH_CLIENT_ID`, `TB_PUSH_CLIENT_SECRET`
/// - `TB_TOKEN_URL`, `TB_PUSH_URL`
/// - `TB_PUSH_SCOPES`: space or comma separated
/// - `TB_PUSH_TIMEOUT_SECS`
///
/// ### Observability
/// - `TB_LOG_LEVEL`: trace/debug/info/warn/error
pub fn load_from_env() -> SettingsResult<ServiceSettings> {
    apply_env_overrides(ServiceSettings::default())
}

/// Apply every `TB_*` variable that is set on top of `settings`.
pub fn apply_env_overrides(mut settings: ServiceSettings) -> SettingsResult<ServiceSettings> {
    let acquisition = &mut settings.acquisition;
    if let Some(path) = env_string("TB_CONFIG_FILE") {
        acquisition.config_file = PathBuf::from(path);
    }
    override_with(&mut acquisition.start_timeout_secs, "TB_START_TIMEOUT_SECS")?;
    override_with(&mut acquisition.stop_timeout_secs, "TB_STOP_TIMEOUT_SECS")?;
    override_with(
        &mut acquisition.fingerprint_retry_attempts,
        "TB_FINGERPRINT_RETRY_ATTEMPTS",
    )?;
    override_with(
        &mut acquisition.fingerprint_retry_delay_ms,
        "TB_FINGERPRINT_RETRY_DELAY_MS",
    )?;
    override_with(&mut acquisition.keep_bad_values, "TB_KEEP_BAD_VALUES")?;

    let source = &mut settings.source;
    if let Some(kind) = parse_env::<SourceKind>("TB_SOURCE_KIND")? {
        source.kind = kind;
    }
    override_string(&mut source.default_url, "TB_DEFAULT_SOURCE");
    override_with(&mut source.request_timeout_secs, "TB_SOURCE_TIMEOUT_SECS")?;

    let pusher = &mut settings.pusher;
    override_string(&mut pusher.user_name, "TB_PUSH_USER_NAME");
    override_string(&mut pusher.user_password, "TB_PUSH_USER_PASSWORD");
    override_string(&mut pusher.client_id, "TB_PUSH_CLIENT_ID");
    override_string(&mut pusher.client_secret, "TB_PUSH_CLIENT_SECRET");
    override_string(&mut pusher.token_url, "TB_TOKEN_URL");
    override_string(&mut pusher.push_url, "TB_PUSH_URL");
    if let Some(scopes) = env_string("TB_PUSH_SCOPES") {
        pusher.scopes = scopes
            .split([' ', ','])
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
    }
    override_with(&mut pusher.request_timeout_secs, "TB_PUSH_TIMEOUT_SECS")?;

    override_string(&mut settings.observability.logging_level, "TB_LOG_LEVEL");

    Ok(settings)
}

/// Resolve the effective settings: defaults, then the optional settings
/// file, then environment variables, then validation.
///
/// A missing file is only an error when a path was given explicitly.
pub fn resolve_settings(path: Option<&Path>) -> SettingsResult<ServiceSettings> {
    let base = match path {
        Some(path) => load_from_file(path)?,
        None => ServiceSettings::default(),
    };
    let settings = apply_env_overrides(base)?;
    validate(&settings)?;
    Ok(settings)
}

fn env_string(key: &str) -> Option<String> {
    let value = env::var(key).ok()?;
    debug!(key, "Setting overridden from environment");
    Some(value)
}

fn override_string(target: &mut String, key: &str) {
    if let Some(value) = env_string(key) {
        *target = value;
    }
}

fn override_with<T>(target: &mut T, key: &str) -> SettingsResult<()>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(value) = parse_env(key)? {
        *target = value;
    }
    Ok(())
}

fn parse_env<T>(key: &str) -> SettingsResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_string(key) {
        Some(s) => s
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| SettingsError::Env {
                key: key.to_string(),
                reason: e.to_string(),
            }),
        None => Ok(None),
    }
}
