//! # Settings File Loading
//!
//! Loads service settings from TOML or YAML files.
//!
//! Supports automatic format detection based on file extension.

use crate::config::ServiceSettings;
use crate::error::{SettingsError, SettingsResult};
use std::path::Path;

/// Load settings from a TOML file.
///
/// ## Usage
/// ```rust,no_run
/// use config::load_from_toml;
/// use std::path::Path;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let settings = load_from_toml(Path::new("tagbridge.toml"))?;
///     println!("Push URL: {}", settings.pusher.push_url);
///     Ok(())
/// }
/// ```
pub fn load_from_toml(path: &Path) -> SettingsResult<ServiceSettings> {
    let contents = std::fs::read_to_string(path)
        .map_err(|_e| SettingsError::FileNotFound(path.display().to_string()))?;

    toml::from_str(&contents).map_err(|e| SettingsError::TomlParse(e.to_string()))
}

/// Load settings from a YAML file.
pub fn load_from_yaml(path: &Path) -> SettingsResult<ServiceSettings> {
    let contents = std::fs::read_to_string(path)
        .map_err(|_e| SettingsError::FileNotFound(path.display().to_string()))?;

    serde_yaml::from_str(&contents).map_err(|e| SettingsError::YamlParse(e.to_string()))
}

/// Load settings from file, detecting the format from the extension.
///
/// ## Supported Formats
/// - `.toml`: TOML format
/// - `.yaml`, `.yml`: YAML format
pub fn load_from_file(path: &Path) -> SettingsResult<ServiceSettings> {
    let extension = path
        .extension()
        .and_then(|s| s.to_str())
        .ok_or(SettingsError::NoExtension)?;

    match extension.to_lowercase().as_str() {
        "toml" => load_from_toml(path),
        "yaml" | "yml" => load_from_yaml(path),
        other => Err(SettingsError::UnsupportedFormat(other.to_string())),
    }
}
