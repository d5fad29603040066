//! # Tag Bridge Pusher
//!
//! Delivers acquired samples to the ingestion endpoint.
//!
//! - Bearer token obtained with a resource-owner password grant and cached
//!   until shortly before it expires
//! - Unmapped samples filtered out on request, empty batches never sent
//! - Failures reported through an optional error sink instead of being
//!   retried

pub mod client;
pub mod error;
pub mod model;
mod token;

pub use client::{DataPusher, PushOutcome, PusherConfig};
pub use error::{PushError, PushResult};
pub use model::{DataPoint, FilterMode, PushPayload};
