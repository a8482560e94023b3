//! Pick one anchor observation per entity
//!
//! Future projections anchor at the latest valid observation; historical
//! paths anchor at the earliest valid observation inside the window.

use std::collections::BTreeMap;

use log::debug;

use super::{BaselineRecord, Observation};
use crate::projection::{Bounds, Granularity, ProjectionMode};

/// Which valid observation becomes the anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorRule {
    Latest,
    Earliest,
}

impl From<ProjectionMode> for AnchorRule {
    fn from(mode: ProjectionMode) -> Self {
        match mode {
            ProjectionMode::Future => AnchorRule::Latest,
            ProjectionMode::Historical => AnchorRule::Earliest,
        }
    }
}

/// Build the baseline table: one record per entity, value rounded to the
/// grid. An observation is valid when present, finite, within bounds and
/// (if given) inside the `years` window. Output is sorted by entity.
pub fn extract_baseline(
    observations: &[Observation],
    rule: AnchorRule,
    years: Option<(i32, i32)>,
    granularity: Granularity,
    bounds: Bounds,
) -> Vec<BaselineRecord> {
    let mut anchors: BTreeMap<&str, (i32, f64)> = BTreeMap::new();

    for obs in observations {
        let Some(value) = obs.value.filter(|v| v.is_finite() && bounds.contains(*v)) else {
            continue;
        };
        if let Some((start, end)) = years {
            if obs.year < start || obs.year > end {
                continue;
            }
        }

        anchors
            .entry(obs.entity_id.as_str())
            .and_modify(|anchor| {
                let replace = match rule {
                    AnchorRule::Latest => obs.year > anchor.0,
                    AnchorRule::Earliest => obs.year < anchor.0,
                };
                if replace {
                    *anchor = (obs.year, value);
                }
            })
            .or_insert((obs.year, value));
    }

    debug!("Extracted {} baseline records ({:?} rule)", anchors.len(), rule);

    anchors
        .into_iter()
        .map(|(entity, (year, value))| {
            BaselineRecord::new(entity, year, bounds.clamp(granularity.round(value)))
        })
        .collect()
}
