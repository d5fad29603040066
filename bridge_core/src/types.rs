//! Acquisition data model.
//!
//! A [`Configuration`] is built once per (re)load and never mutated after
//! validation; ownership moves wholesale into the orchestrator generation that
//! runs it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Source address used when a configuration row leaves the source blank.
/// Substituted by the service's default source at load time.
pub const DEFAULT_SOURCE_URL: &str = "Default";

/// Group name used when a configuration row leaves the group blank.
pub const DEFAULT_GROUP_NAME: &str = "DefaultGroup";

/// Cadence applied when the configured value is missing, unparsable or <= 0.
pub const DEFAULT_CADENCE: Duration = Duration::from_secs(15 * 60);

/// Fastest cadence a group may be polled at.
pub const MIN_CADENCE: Duration = Duration::from_secs(60);

/// Variable id of an item that is read but not forwarded to the sink.
pub const UNMAPPED_VARIABLE_ID: i32 = -1;

/// Stable identity of an item group, assigned once per configuration
/// generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(Uuid);

impl GroupId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for GroupId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One named data point on the source, mapped to a sink-side variable id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Source-side item name, matched case-insensitively.
    pub name: String,
    /// Sink-side variable id. Negative ids, normally [`UNMAPPED_VARIABLE_ID`], are never pushed.
    pub variable_id: i32,
}

impl Item {
    pub fn new(name: impl Into<String>, variable_id: i32) -> Self {
        Self {
            name: name.into(),
            variable_id,
        }
    }

    pub fn is_mapped(&self) -> bool {
        self.variable_id >= 0
    }

    pub fn matches(&self, source_name: &str) -> bool {
        self.name.eq_ignore_ascii_case(source_name)
    }
}

/// A named set of items polled together on one cadence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemGroup {
    id: GroupId,
    pub name: String,
    pub cadence: Duration,
    pub items: Vec<Item>,
}

impl ItemGroup {
    pub fn new(name: impl Into<String>, cadence: Duration) -> Self {
        Self {
            id: GroupId::new(),
            name: name.into(),
            cadence,
            items: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_items(mut self, items: impl IntoIterator<Item = Item>) -> Self {
        self.items.extend(items);
        self
    }

    pub fn id(&self) -> GroupId {
        self.id
    }

    /// Converts a raw cadence in minutes into the stored cadence.
    ///
    /// Non-finite or non-positive input yields [`DEFAULT_CADENCE`]; positive
    /// input faster than [`MIN_CADENCE`] is raised to the floor.
    pub fn cadence_from_minutes(minutes: f64) -> Duration {
        if !minutes.is_finite() || minutes <= 0.0 {
            return DEFAULT_CADENCE;
        }
        match Duration::try_from_secs_f64(minutes * 60.0) {
            Ok(cadence) => cadence.max(MIN_CADENCE),
            Err(_) => DEFAULT_CADENCE,
        }
    }

    /// Distinct source-side item names, first spelling wins.
    ///
    /// Several configured items may share a name (one tag mapped to several
    /// variable ids); the source only needs to be asked once.
    pub fn distinct_item_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::with_capacity(self.items.len());
        for item in &self.items {
            if !names.iter().any(|n| n.eq_ignore_ascii_case(&item.name)) {
                names.push(item.name.clone());
            }
        }
        names
    }

    pub fn items_named<'a>(&'a self, source_name: &'a str) -> impl Iterator<Item = &'a Item> + 'a {
        self.items.iter().filter(move |i| i.matches(source_name))
    }
}

/// One data source endpoint and the groups polled on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    pub url: String,
    pub groups: Vec<ItemGroup>,
}

impl SourceConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            groups: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_group(mut self, group: ItemGroup) -> Self {
        self.groups.push(group);
        self
    }

    pub fn is_default(&self) -> bool {
        self.url.eq_ignore_ascii_case(DEFAULT_SOURCE_URL)
    }
}

/// Complete acquisition configuration of one generation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Configuration {
    sources: Vec<SourceConfig>,
}

impl Configuration {
    pub fn new(sources: Vec<SourceConfig>) -> Self {
        Self { sources }
    }

    /// The configuration used when loading failed: nothing to poll.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn sources(&self) -> &[SourceConfig] {
        &self.sources
    }

    pub fn into_sources(self) -> Vec<SourceConfig> {
        self.sources
    }

    pub fn group_count(&self) -> usize {
        self.sources.iter().map(|s| s.groups.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.group_count() == 0
    }

    pub fn groups(&self) -> impl Iterator<Item = (&SourceConfig, &ItemGroup)> {
        self.sources
            .iter()
            .flat_map(|s| s.groups.iter().map(move |g| (s, g)))
    }

    pub fn find_group(&self, id: GroupId) -> Option<&ItemGroup> {
        self.groups().map(|(_, g)| g).find(|g| g.id() == id)
    }

    /// Replaces every source addressed as [`DEFAULT_SOURCE_URL`] with
    /// `default_url`, consuming this configuration.
    #[must_use]
    pub fn with_default_source(self, default_url: &str) -> Self {
        let sources = self
            .sources
            .into_iter()
            .map(|mut s| {
                if s.is_default() {
                    s.url = default_url.to_string();
                }
                s
            })
            .collect();
        Self { sources }
    }
}

/// Multi-line dump of the source, group and item tree.
impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return writeln!(f, "Empty configuration");
        }
        for source in &self.sources {
            writeln!(f, "Source <{}>", source.url)?;
            for group in &source.groups {
                writeln!(
                    f,
                    "  Group <{}> every {}s, {} item(s)",
                    group.name,
                    group.cadence.as_secs(),
                    group.items.len()
                )?;
                for item in &group.items {
                    writeln!(f, "    {} -> {}", item.name, item.variable_id)?;
                }
            }
        }
        Ok(())
    }
}

/// Quality flag reported by the source for one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Good,
    Bad,
}

impl Quality {
    pub fn is_good(self) -> bool {
        self == Self::Good
    }
}

/// One timestamped, quality-flagged value for an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub item_name: String,
    pub variable_id: i32,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub quality: Quality,
}

impl Sample {
    pub fn is_mapped(&self) -> bool {
        self.variable_id >= 0
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} @ {}: {} ({:?})",
            self.item_name,
            self.variable_id,
            self.timestamp.format("%Y-%m-%dT%H:%M:%S"),
            self.value,
            self.quality
        )
    }
}
