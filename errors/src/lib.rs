//! # Tag Bridge Errors
//!
//! Error taxonomy shared by the acquisition, configuration and utility crates.
//!
//! - Uses `thiserror` for structured error definitions
//! - Named fields carry the context needed in log lines
//! - Transient classification lives next to the variant that can be retried

use std::io;
use thiserror::Error;

/// Acquisition configuration errors.
///
/// Validation variants are checked in declaration order by the loader; the
/// first violation aborts the load.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("There is no group to read")]
    NoGroup,

    #[error("At least one group name is empty")]
    EmptyGroupName,

    #[error("The polling cycle {cadence_secs}s of group '{group}' is invalid (<= 0)")]
    InvalidCadence { group: String, cadence_secs: u64 },

    #[error("At least one item name is empty in group '{group}'")]
    EmptyItemName { group: String },

    #[error("Failed to read configuration '{path}': {reason}")]
    Read { path: String, reason: String },

    #[error("Malformed configuration record {record}: {reason}")]
    Parse { record: u64, reason: String },
}

/// Data source errors raised by a source connector.
///
/// Read errors are recovered by the group poll loop, which simply tries again
/// on its next cycle.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("Exception connecting source <{url}>: {reason}")]
    Connection { url: String, reason: String },

    #[error("Exception reading items on source <{url}>: {reason}")]
    Read { url: String, reason: String },

    #[error("Exception browsing source <{url}>: {reason}")]
    Browse { url: String, reason: String },

    #[error("Invalid source address <{url}>: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Source kind '{kind}' is not supported")]
    Unsupported { kind: String },
}

impl SourceError {
    /// Connection and read failures may clear up by the next poll cycle; a
    /// bad address or an unsupported connector will not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::Read { .. } | Self::Browse { .. }
        )
    }
}

/// Errors while computing the content fingerprint of a configuration file.
#[derive(Debug, Error)]
pub enum FingerprintError {
    #[error("Configuration file not found: {path}")]
    NotFound { path: String },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

impl FingerprintError {
    pub fn from_io(path: impl Into<String>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::NotFound {
            Self::NotFound { path }
        } else {
            Self::Io { path, source }
        }
    }

    /// A file being rewritten is briefly locked or unreadable; those errors
    /// clear up on their own.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::NotFound { .. } => false,
            Self::Io { source, .. } => matches!(
                source.kind(),
                io::ErrorKind::PermissionDenied
                    | io::ErrorKind::WouldBlock
                    | io::ErrorKind::Interrupted
                    | io::ErrorKind::UnexpectedEof
            ),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
