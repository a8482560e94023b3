//! Raw observations, per-entity baselines and the observed-value index

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// A single raw panel observation. The value may be missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub entity_id: String,
    pub year: i32,
    #[serde(default)]
    pub value: Option<f64>,
}

impl Observation {
    pub fn new(entity_id: impl Into<String>, year: i32, value: Option<f64>) -> Self {
        Self {
            entity_id: entity_id.into(),
            year,
            value,
        }
    }
}

/// Anchor of one entity: the observation every projected series starts from.
///
/// The value is expected to already sit on the configured grid. Projectors
/// never modify it; the anchor-year row of every series carries it verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineRecord {
    pub entity_id: String,
    #[serde(alias = "year")]
    pub anchor_year: i32,
    #[serde(alias = "value")]
    pub baseline_value: f64,
}

impl BaselineRecord {
    pub fn new(entity_id: impl Into<String>, anchor_year: i32, baseline_value: f64) -> Self {
        Self {
            entity_id: entity_id.into(),
            anchor_year,
            baseline_value,
        }
    }
}

/// Observed values keyed by entity then year, used for bound filtering
#[derive(Debug, Clone, Default)]
pub struct ObservationIndex {
    values: HashMap<String, BTreeMap<i32, f64>>,
}

impl ObservationIndex {
    /// Build from raw observations, skipping missing and non-finite values.
    /// A later row for the same (entity, year) replaces an earlier one.
    pub fn from_observations(observations: &[Observation]) -> Self {
        let mut values: HashMap<String, BTreeMap<i32, f64>> = HashMap::new();
        for obs in observations {
            if let Some(v) = obs.value.filter(|v| v.is_finite()) {
                values
                    .entry(obs.entity_id.clone())
                    .or_default()
                    .insert(obs.year, v);
            }
        }
        Self { values }
    }

    /// Observed value for an entity in a year, if any
    pub fn get(&self, entity_id: &str, year: i32) -> Option<f64> {
        self.values.get(entity_id).and_then(|years| years.get(&year).copied())
    }

    /// Number of entities with at least one observed value
    pub fn entity_count(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
