//! # Tag Bridge Core
//!
//! Shared types and traits for the Tag Bridge acquisition service.
//!
//! This crate provides:
//! - The acquisition data model: sources, item groups, items, samples
//! - The immutable [`Configuration`] handed to one orchestrator generation
//! - The source connector boundary consumed by the poll loops
//!
//! Nothing in here performs I/O. Connectors live in the `acquisition` crate
//! and the CSV loader lives in the `config` crate.

pub mod traits;
pub mod types;

pub use traits::{
    ItemProperty, ItemReading, NamespaceNode, SourceConnector, SourceKind, SourceSession,
    SourceValue,
};
pub use types::{
    Configuration, GroupId, Item, ItemGroup, Quality, Sample, SourceConfig, DEFAULT_CADENCE,
    DEFAULT_GROUP_NAME, DEFAULT_SOURCE_URL, MIN_CADENCE, UNMAPPED_VARIABLE_ID,
};
