//! # Tag Bridge Service
//!
//! Runs acquisition under a configuration supervisor and exposes the
//! command-line entry points of the `tagbridge` binary.

pub mod commands;
pub mod error;
pub mod logging;
pub mod observer;
pub mod output;
pub mod signal;
pub mod supervisor;

pub use error::{SupervisorError, SupervisorResult};
pub use observer::PushingObserver;
pub use supervisor::{ConfigSupervisor, ReloadOutcome, SupervisorOptions};
