//! Simulation grid: value rounding and per-series cursors
//!
//! Every (entity, scenario) pair gets one `SeriesCursor` holding its current
//! year and value. Projectors advance cursors one year at a time and append
//! points; nothing already emitted is edited.

use std::collections::HashSet;

use log::{debug, warn};

use super::config::{Bounds, ProjectionWindow};
use super::output::{ProjectedPoint, ScenarioKey};
use crate::baseline::{BaselineRecord, ObservationIndex};
use crate::error::ConfigError;

/// Rounding grid. Values are snapped by round-half-to-even on
/// `value / step`, then rescaled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Granularity {
    step: f64,
    /// Set when `1 / step` is a whole number, so rescaling can divide
    /// instead of multiply (`535 / 10` is exactly 53.5, `535 * 0.1` is not)
    steps_per_unit: Option<f64>,
}

impl Granularity {
    pub fn new(step: f64) -> Result<Self, ConfigError> {
        if !(step.is_finite() && step > 0.0) {
            return Err(ConfigError::InvalidGranularity(step));
        }
        let inverse = 1.0 / step;
        let whole = inverse.round();
        let steps_per_unit = (whole >= 1.0 && (inverse - whole).abs() < 1e-9 * whole).then_some(whole);
        Ok(Self { step, steps_per_unit })
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    fn scaled(&self, value: f64) -> f64 {
        match self.steps_per_unit {
            Some(n) => value * n,
            None => value / self.step,
        }
    }

    /// Integer grid index of `value`; used as an exact lookup key
    pub fn index(&self, value: f64) -> i64 {
        self.scaled(value).round_ties_even() as i64
    }

    /// Value sitting at a grid index
    pub fn value_at(&self, index: i64) -> f64 {
        match self.steps_per_unit {
            Some(n) => index as f64 / n,
            None => index as f64 * self.step,
        }
    }

    pub fn round(&self, value: f64) -> f64 {
        self.value_at(self.index(value))
    }

    pub fn is_aligned(&self, value: f64) -> bool {
        let scaled = self.scaled(value);
        (scaled - scaled.round()).abs() < 1e-6
    }
}

/// Drops rows whose backing observation lies outside the valid range
#[derive(Debug, Clone, Copy)]
pub struct BoundsFilter<'a> {
    bounds: Bounds,
    observations: Option<&'a ObservationIndex>,
}

impl<'a> BoundsFilter<'a> {
    pub fn new(bounds: Bounds, observations: Option<&'a ObservationIndex>) -> Self {
        Self { bounds, observations }
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// False when an observation exists for (entity, year) and is out of bounds
    pub fn admits(&self, entity_id: &str, year: i32) -> bool {
        self.observations
            .and_then(|index| index.get(entity_id, year))
            .map_or(true, |observed| self.bounds.contains(observed))
    }
}

/// Iteration state of one (entity, scenario) series
#[derive(Debug, Clone)]
pub struct SeriesCursor<K> {
    entity_id: String,
    scenario: K,
    anchor_year: i32,
    anchor_value: f64,
    last_year: i32,
    current_year: i32,
    current_value: f64,
    active: bool,
    points: Vec<ProjectedPoint<K>>,
}

impl<K: ScenarioKey> SeriesCursor<K> {
    fn seed(record: &BaselineRecord, scenario: K, last_year: i32) -> Self {
        let points = vec![ProjectedPoint::new(
            record.entity_id.clone(),
            record.anchor_year,
            scenario,
            record.baseline_value,
        )];
        Self {
            entity_id: record.entity_id.clone(),
            scenario,
            anchor_year: record.anchor_year,
            anchor_value: record.baseline_value,
            last_year,
            current_year: record.anchor_year,
            current_value: record.baseline_value,
            active: record.anchor_year < last_year,
            points,
        }
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn scenario(&self) -> K {
        self.scenario
    }

    pub fn anchor_year(&self) -> i32 {
        self.anchor_year
    }

    pub fn anchor_value(&self) -> f64 {
        self.anchor_value
    }

    pub fn current_value(&self) -> f64 {
        self.current_value
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Year the cursor would emit next, if it can still advance
    pub fn next_year(&self) -> Option<i32> {
        (self.active && self.current_year < self.last_year).then(|| self.current_year + 1)
    }

    /// Append the value for the next year
    pub fn advance(&mut self, value: f64) {
        let Some(year) = self.next_year() else {
            return;
        };
        self.points.push(ProjectedPoint::new(self.entity_id.clone(), year, self.scenario, value));
        self.current_year = year;
        self.current_value = value;
        if year >= self.last_year {
            self.active = false;
        }
    }

    /// Stop the series; nothing later than the current year is emitted
    pub fn truncate(&mut self) {
        self.active = false;
    }

    /// Drop the series entirely, seed row included
    pub fn discard(&mut self) {
        self.active = false;
        self.points.clear();
    }

    pub fn points(&self) -> &[ProjectedPoint<K>] {
        &self.points
    }
}

/// Entity × scenario grid of cursors, seeded from the baseline
#[derive(Debug, Clone)]
pub struct SimulationGrid<K> {
    cursors: Vec<SeriesCursor<K>>,
    excluded_entities: usize,
}

impl<K: ScenarioKey> SimulationGrid<K> {
    /// Seed one cursor per (entity, scenario). Entities with an unusable
    /// baseline are left out; this is not an error.
    pub fn build(
        baseline: &[BaselineRecord],
        scenarios: &[K],
        window: ProjectionWindow,
        filter: &BoundsFilter<'_>,
    ) -> Self {
        let mut seen = HashSet::new();
        let mut cursors = Vec::with_capacity(baseline.len() * scenarios.len());
        let mut excluded_entities = 0;

        for record in baseline {
            if !seen.insert(record.entity_id.as_str()) {
                warn!("duplicate baseline row for {}; keeping the first", record.entity_id);
                continue;
            }
            if !Self::usable(record, window, filter) {
                excluded_entities += 1;
                continue;
            }
            for &scenario in scenarios {
                cursors.push(SeriesCursor::seed(record, scenario, window.last_year()));
            }
        }

        Self { cursors, excluded_entities }
    }

    fn usable(record: &BaselineRecord, window: ProjectionWindow, filter: &BoundsFilter<'_>) -> bool {
        let value = record.baseline_value;
        if !value.is_finite() || !filter.bounds().contains(value) {
            debug!("{}: baseline value {} outside valid range, excluded", record.entity_id, value);
            return false;
        }
        if !window.admits_anchor(record.anchor_year) {
            debug!("{}: anchor year {} outside window, excluded", record.entity_id, record.anchor_year);
            return false;
        }
        if !filter.admits(&record.entity_id, record.anchor_year) {
            debug!("{}: observed value in {} out of bounds, excluded", record.entity_id, record.anchor_year);
            return false;
        }
        true
    }

    pub fn cursors(&self) -> &[SeriesCursor<K>] {
        &self.cursors
    }

    pub fn cursors_mut(&mut self) -> &mut [SeriesCursor<K>] {
        &mut self.cursors
    }

    pub fn excluded_entities(&self) -> usize {
        self.excluded_entities
    }

    /// Years the sweep has to visit: first year after the earliest anchor
    /// through the latest reachable year
    pub fn sweep_years(&self) -> Option<(i32, i32)> {
        let first = self.cursors.iter().filter_map(|c| c.next_year()).min()?;
        let last = self.cursors.iter().map(|c| c.last_year).max()?;
        Some((first, last))
    }

    /// All emitted points sorted by (entity, year, scenario)
    pub fn into_points(self) -> Vec<ProjectedPoint<K>> {
        let mut points: Vec<ProjectedPoint<K>> =
            self.cursors.into_iter().flat_map(|c| c.points).collect();
        points.sort_by(|a, b| {
            a.entity_id
                .cmp(&b.entity_id)
                .then(a.year.cmp(&b.year))
                .then(a.scenario.cmp(&b.scenario))
        });
        points
    }
}
