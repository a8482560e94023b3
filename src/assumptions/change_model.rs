//! Change-prediction lookup table for the percentile method

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Error, Result};
use crate::projection::Granularity;

/// Discrete percentile label (0 to 100)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Percentile(u8);

impl Percentile {
    pub fn new(label: u8) -> std::result::Result<Self, ConfigError> {
        let percentile = Self(label);
        percentile.validate()?;
        Ok(percentile)
    }

    /// Unchecked; only for labels known to be valid
    pub(crate) const fn from_label(label: u8) -> Self {
        Self(label)
    }

    pub fn label(self) -> u8 {
        self.0
    }

    pub(crate) fn validate(self) -> std::result::Result<(), ConfigError> {
        if self.0 <= 100 {
            Ok(())
        } else {
            Err(ConfigError::InvalidPercentile(self.0))
        }
    }
}

impl fmt::Display for Percentile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One row of the fitted model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChangeModelRow {
    pub initial_value: f64,
    pub percentile: Percentile,
    pub change: f64,
}

impl ChangeModelRow {
    pub fn new(initial_value: f64, percentile: Percentile, change: f64) -> Self {
        Self { initial_value, percentile, change }
    }
}

/// Predicted change by (grid value, percentile). Sparse: a missing entry
/// means no further prediction is available for that value.
#[derive(Debug, Clone)]
pub struct ChangeModel {
    granularity: Granularity,
    changes: HashMap<(i64, Percentile), f64>,
}

impl ChangeModel {
    /// Build from model rows. Initial values are keyed by their grid index,
    /// so lookups are exact matches with no nearest-value fallback.
    pub fn from_rows<I>(rows: I, granularity: Granularity) -> Result<Self>
    where
        I: IntoIterator<Item = ChangeModelRow>,
    {
        let mut changes = HashMap::new();
        let mut off_grid = 0usize;

        for row in rows {
            if !row.initial_value.is_finite() || !row.change.is_finite() {
                return Err(Error::InvalidInput(format!(
                    "non-finite change model row: initial value {}, change {}",
                    row.initial_value, row.change
                )));
            }
            row.percentile.validate()?;
            if !granularity.is_aligned(row.initial_value) {
                off_grid += 1;
            }
            let key = (granularity.index(row.initial_value), row.percentile);
            if changes.insert(key, row.change).is_some() {
                warn!(
                    "duplicate change model entry for ({}, {}); keeping the last",
                    row.initial_value, row.percentile
                );
            }
        }

        if off_grid > 0 {
            debug!("{} change model values were snapped to the {} grid", off_grid, granularity.step());
        }

        Ok(Self { granularity, changes })
    }

    /// Predicted change starting from `value` (snapped to the grid) under
    /// percentile `percentile`
    pub fn change(&self, value: f64, percentile: Percentile) -> Option<f64> {
        self.changes
            .get(&(self.granularity.index(value), percentile))
            .copied()
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// Percentile labels with at least one entry
    pub fn percentiles(&self) -> BTreeSet<Percentile> {
        self.changes.keys().map(|&(_, p)| p).collect()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}
