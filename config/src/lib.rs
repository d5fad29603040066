//! # Configuration System
//!
//! Configuration management for the Tag Bridge acquisition service.
//!
//! This crate provides:
//! - The acquisition CSV reader and its validation rules
//! - Service settings structures (file, environment, defaults)
//! - Settings validation
//! - Hot reload of the acquisition configuration file
//!
//! # Precedence
//! Environment variables > settings file > defaults.

pub mod acquisition;
pub mod config;
pub mod csv_reader;
pub mod error;
pub mod file_loader;
pub mod hot_reload;
pub mod loader;
pub mod validation;

pub use acquisition::{
    load_configuration, load_or_log, load_or_report, parse_configuration, validate_configuration,
};
pub use config::{
    AcquisitionSettings, ObservabilitySettings, PusherSettings, ServiceSettings, SourceSettings,
};
pub use error::{SettingsError, SettingsResult};
pub use file_loader::{load_from_file, load_from_toml, load_from_yaml};
pub use hot_reload::{ConfigReloadEvent, WatchError, watch_config};
pub use loader::{apply_env_overrides, load_from_env, resolve_settings};
pub use validator::Validate;
