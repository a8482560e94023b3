//! Canonical progress curve for the speed method

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::projection::Direction;

/// Point on the canonical curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferencePoint {
    pub relative_time: f64,
    pub value: f64,
}

impl ReferencePoint {
    pub fn new(relative_time: f64, value: f64) -> Self {
        Self { relative_time, value }
    }
}

/// Canonical (relative time, value) curve, strictly increasing in time
#[derive(Debug, Clone, PartialEq)]
pub struct ReferencePath {
    points: Vec<ReferencePoint>,
}

impl ReferencePath {
    pub fn new(points: Vec<ReferencePoint>) -> Result<Self> {
        if points.is_empty() {
            return Err(Error::InvalidInput("reference path has no points".into()));
        }
        if let Some(bad) = points
            .iter()
            .find(|p| !p.relative_time.is_finite() || !p.value.is_finite())
        {
            return Err(Error::InvalidInput(format!(
                "non-finite reference point ({}, {})",
                bad.relative_time, bad.value
            )));
        }
        if let Some(pair) = points
            .windows(2)
            .find(|w| w[1].relative_time <= w[0].relative_time)
        {
            return Err(Error::InvalidInput(format!(
                "reference path is not increasing in time at {} -> {}",
                pair[0].relative_time, pair[1].relative_time
            )));
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[ReferencePoint] {
        &self.points
    }

    /// Relative time of the anchor point for `value`: the latest point on
    /// the curve that `value` has already reached (`direction.reached`).
    /// Returns `None` when no point qualifies.
    pub fn anchor_time(&self, value: f64, direction: Direction) -> Option<f64> {
        self.points
            .iter()
            .rev()
            .find(|p| direction.reached(p.value, value))
            .map(|p| p.relative_time)
    }

    /// Points strictly after relative time `time`
    pub fn points_after(&self, time: f64) -> impl Iterator<Item = &ReferencePoint> + '_ {
        let start = self.points.partition_point(|p| p.relative_time <= time);
        self.points[start..].iter()
    }

    /// Curve value at `time`, interpolated and clamped at both ends
    pub fn value_at(&self, time: f64) -> f64 {
        let xy: Vec<(f64, f64)> = self
            .points
            .iter()
            .map(|p| (p.relative_time, p.value))
            .collect();
        // points is never empty after construction
        interpolate_clamped(&xy, time).unwrap_or(self.points[0].value)
    }
}

/// Piecewise-linear interpolation over `(x, y)` pairs sorted by `x`.
/// Outside the covered range the nearest endpoint value is returned.
pub(crate) fn interpolate_clamped(points: &[(f64, f64)], x: f64) -> Option<f64> {
    let (first, last) = (points.first()?, points.last()?);
    if x <= first.0 {
        return Some(first.1);
    }
    if x >= last.0 {
        return Some(last.1);
    }

    let upper = points.partition_point(|&(px, _)| px <= x);
    let (x0, y0) = points[upper - 1];
    let (x1, y1) = points[upper];
    if x == x0 {
        return Some(y0);
    }
    Some(lerp(y0, y1, (x - x0) / (x1 - x0)))
}

/// Linear interpolation.
fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a * (1.0 - t) + b * t
}
