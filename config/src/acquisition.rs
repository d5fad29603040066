//! # Acquisition Configuration Loading
//!
//! Loads the watched CSV into a validated [`Configuration`]. A configuration
//! either passes every rule or is replaced by the empty configuration; a
//! partially valid configuration is never returned.

use crate::csv_reader::{build_configuration, read_records};
use bridge_core::{Configuration, ItemGroup};
use errors::ConfigurationError;
use std::path::Path;
use std::time::Duration;
use tracing::{error, warn};

/// Check the validation rules in order; the first violation wins.
pub fn validate_configuration(configuration: &Configuration) -> Result<(), ConfigurationError> {
    if configuration.is_empty() {
        return Err(ConfigurationError::NoGroup);
    }

    let groups: Vec<&ItemGroup> = configuration.groups().map(|(_, g)| g).collect();

    if groups.iter().any(|g| g.name.trim().is_empty()) {
        return Err(ConfigurationError::EmptyGroupName);
    }

    if let Some(group) = groups.iter().find(|g| g.cadence == Duration::ZERO) {
        return Err(ConfigurationError::InvalidCadence {
            group: group.name.clone(),
            cadence_secs: group.cadence.as_secs(),
        });
    }

    for group in &groups {
        if group.items.iter().any(|i| i.name.trim().is_empty()) {
            return Err(ConfigurationError::EmptyItemName {
                group: group.name.clone(),
            });
        }
    }

    Ok(())
}

/// Parse and validate CSV text, then substitute the default source.
pub fn parse_configuration(
    text: &str,
    default_source: &str,
) -> Result<Configuration, ConfigurationError> {
    let configuration = build_configuration(read_records(text)?);
    validate_configuration(&configuration)?;
    warn_case_collisions(&configuration);
    Ok(configuration.with_default_source(default_source))
}

/// Read, parse and validate the CSV file at `path`.
pub fn load_configuration(
    path: &Path,
    default_source: &str,
) -> Result<Configuration, ConfigurationError> {
    let text = std::fs::read_to_string(path).map_err(|e| ConfigurationError::Read {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    parse_configuration(&text, default_source)
}

/// Load the configuration, funnelling any error to `report` and falling back
/// to the empty configuration.
pub fn load_or_report(
    path: &Path,
    default_source: &str,
    report: impl FnOnce(&ConfigurationError),
) -> Configuration {
    match load_configuration(path, default_source) {
        Ok(configuration) => configuration,
        Err(e) => {
            report(&e);
            Configuration::empty()
        }
    }
}

/// Load the configuration, logging any error.
pub fn load_or_log(path: &Path, default_source: &str) -> Configuration {
    load_or_report(path, default_source, |e| {
        error!(path = %path.display(), error = %e, "Invalid acquisition configuration");
    })
}

/// Read results are matched back to items by name, ignoring case. Two
/// spellings of one name in a group will both receive the same value.
fn warn_case_collisions(configuration: &Configuration) {
    for (source, group) in configuration.groups() {
        for (i, item) in group.items.iter().enumerate() {
            let collides = group.items[..i]
                .iter()
                .any(|other| other.name != item.name && other.matches(&item.name));
            if collides {
                warn!(
                    source = %source.url,
                    group = %group.name,
                    item = %item.name,
                    "Item names differ only by case and will be matched to the same source value"
                );
            }
        }
    }
}
