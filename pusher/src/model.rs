//! Sink wire format.

use bridge_core::Sample;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which samples a push keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    KeepAll,
    /// Drop samples with a negative variable id.
    #[default]
    DiscardUnmapped,
}

impl FilterMode {
    pub fn apply(self, samples: &[Sample]) -> Vec<DataPoint> {
        samples
            .iter()
            .filter(|s| self == Self::KeepAll || s.is_mapped())
            .map(DataPoint::from)
            .collect()
    }
}

/// One record of the push body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DataPoint {
    pub variable_id: i32,
    pub date: DateTime<Utc>,
    pub value: f64,
}

impl From<&Sample> for DataPoint {
    fn from(sample: &Sample) -> Self {
        Self {
            variable_id: sample.variable_id,
            date: sample.timestamp,
            value: sample.value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PushPayload {
    pub data: Vec<DataPoint>,
}
