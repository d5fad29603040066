//! Shared test fixtures for the Tag Bridge workspace.
//!
//! - [`ScriptedConnector`]: an in-memory source whose read results, delays and
//!   failures are scripted by the test, and which counts every call
//! - [`RecordingObserver`]: records every poll loop hook with the (paused)
//!   tokio clock so timing properties can be asserted
//! - Configuration builders and CSV files on disk

mod fixtures;

pub use fixtures::*;
