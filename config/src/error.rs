//! Errors raised while resolving the service settings.

/// Service settings loading error.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse TOML: {0}")]
    TomlParse(String),

    #[error("Failed to parse YAML: {0}")]
    YamlParse(String),

    #[error("Settings file has no extension")]
    NoExtension,

    #[error("Unsupported settings file format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid value for environment variable {key}: {reason}")]
    Env { key: String, reason: String },

    #[error("Invalid settings: {0}")]
    Invalid(#[from] validator::ValidationErrors),
}

pub type SettingsResult<T> = Result<T, SettingsError>;
