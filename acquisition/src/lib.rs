//! # Acquisition
//!
//! Reads item groups from data sources on their own cadence.
//!
//! This crate provides:
//! - The connector factory and the HTTP gateway connector
//! - The group poll loop and the shaping of readings into samples
//! - The acquisition worker that runs one configuration generation

pub mod connector;
pub mod error;
pub mod http_gateway;
pub mod observer;
pub mod poll;
pub mod telemetry;
pub mod worker;

pub use connector::create_connector;
pub use error::{WorkerError, WorkerResult};
pub use http_gateway::HttpGatewayConnector;
pub use observer::ReadObserver;
pub use poll::{GroupPoller, GroupReadout, shape_readings};
pub use worker::{AcquisitionWorker, StopOutcome, WorkerHandle, stagger_interval};
