//! Tabular acquisition configuration reader.
//!
//! One CSV row per item, with the columns `OpcServer`, `ReadCycleMinutes`,
//! `GroupName`, `TagName` and `VariableId`. Headers are matched
//! case-insensitively; blank lines are skipped. Rows are grouped first by
//! source, then by group name, both in order of first appearance.

use bridge_core::{
    Configuration, DEFAULT_CADENCE, DEFAULT_GROUP_NAME, DEFAULT_SOURCE_URL, Item, ItemGroup,
    SourceConfig, UNMAPPED_VARIABLE_ID,
};
use errors::ConfigurationError;
use std::time::Duration;
use tracing::debug;

const SOURCE_COLUMN: &str = "OpcServer";
const CADENCE_COLUMN: &str = "ReadCycleMinutes";
const GROUP_COLUMN: &str = "GroupName";
const TAG_COLUMN: &str = "TagName";
const VARIABLE_COLUMN: &str = "VariableId";

/// One row of the acquisition CSV after default substitution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationRecord {
    pub source: String,
    pub cadence: Duration,
    pub group_name: String,
    pub tag_name: String,
    pub variable_id: i32,
}

#[derive(Debug, Clone, Copy, Default)]
struct ColumnMap {
    source: Option<usize>,
    cadence: Option<usize>,
    group: Option<usize>,
    tag: Option<usize>,
    variable: Option<usize>,
}

impl ColumnMap {
    fn from_headers(headers: &csv::StringRecord) -> Self {
        let find = |name: &str| headers.iter().position(|h| clean(h).eq_ignore_ascii_case(name));
        Self {
            source: find(SOURCE_COLUMN),
            cadence: find(CADENCE_COLUMN),
            group: find(GROUP_COLUMN),
            tag: find(TAG_COLUMN),
            variable: find(VARIABLE_COLUMN),
        }
    }
}

/// Trim whitespace, then the stray double quotes a spreadsheet leaves around
/// values that were typed with surrounding spaces.
fn clean(field: &str) -> &str {
    field.trim().trim_matches('"').trim()
}

fn field<'a>(record: &'a csv::StringRecord, index: Option<usize>) -> &'a str {
    index.and_then(|i| record.get(i)).map(clean).unwrap_or("")
}

fn or_default(value: &str, default: &str) -> String {
    if value.is_empty() {
        default.to_string()
    } else {
        value.to_string()
    }
}

fn parse_cadence(value: &str) -> Duration {
    match value.parse::<i32>() {
        Ok(minutes) => ItemGroup::cadence_from_minutes(minutes as f64),
        Err(_) => DEFAULT_CADENCE,
    }
}

/// Parse CSV text into records, applying per-field defaults.
pub fn read_records(text: &str) -> Result<Vec<ConfigurationRecord>, ConfigurationError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader.headers().map_err(parse_error)?.clone();
    let columns = ColumnMap::from_headers(&headers);

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(parse_error)?;
        if row.iter().all(|f| clean(f).is_empty()) {
            continue;
        }
        records.push(ConfigurationRecord {
            source: or_default(field(&row, columns.source), DEFAULT_SOURCE_URL),
            cadence: parse_cadence(field(&row, columns.cadence)),
            group_name: or_default(field(&row, columns.group), DEFAULT_GROUP_NAME),
            tag_name: field(&row, columns.tag).to_string(),
            variable_id: field(&row, columns.variable)
                .parse()
                .unwrap_or(UNMAPPED_VARIABLE_ID),
        });
    }
    Ok(records)
}

fn parse_error(e: csv::Error) -> ConfigurationError {
    ConfigurationError::Parse {
        record: e.position().map_or(0, csv::Position::record),
        reason: e.to_string(),
    }
}

/// Group records into a configuration.
///
/// A group's cadence is the fastest cadence among its rows. Rows without a
/// tag name are dropped, and so is any group (and source) left empty.
pub fn build_configuration(records: Vec<ConfigurationRecord>) -> Configuration {
    let mut sources: Vec<(String, Vec<ItemGroup>)> = Vec::new();

    for record in records {
        let source_index = match sources.iter().position(|(url, _)| *url == record.source) {
            Some(i) => i,
            None => {
                sources.push((record.source.clone(), Vec::new()));
                sources.len() - 1
            }
        };
        let groups = &mut sources[source_index].1;
        let group_index = match groups.iter().position(|g| g.name == record.group_name) {
            Some(i) => i,
            None => {
                groups.push(ItemGroup::new(record.group_name.clone(), record.cadence));
                groups.len() - 1
            }
        };
        let group = &mut groups[group_index];
        group.cadence = group.cadence.min(record.cadence);
        if record.tag_name.is_empty() {
            debug!(group = %group.name, "Skipping row without tag name");
            continue;
        }
        group.items.push(Item::new(record.tag_name, record.variable_id));
    }

    let sources = sources
        .into_iter()
        .filter_map(|(url, groups)| {
            let groups: Vec<ItemGroup> = groups
                .into_iter()
                .filter(|g| {
                    let keep = !g.items.is_empty();
                    if !keep {
                        debug!(source = %url, group = %g.name, "Dropping group without items");
                    }
                    keep
                })
                .collect();
            (!groups.is_empty()).then(|| SourceConfig { url, groups })
        })
        .collect();

    Configuration::new(sources)
}
