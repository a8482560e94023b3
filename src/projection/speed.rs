//! Speed-path projector
//!
//! Locates each entity's baseline on the canonical reference curve, then
//! replays the rest of the curve with its timeline divided by the speed
//! multiplier and resamples it onto whole years. Every (entity, speed) pair
//! is independent, so all pairs run in parallel.

use log::{debug, trace};
use rayon::prelude::*;

use super::config::{Bounds, Direction, ProjectionWindow, SpeedMultiplier};
use super::grid::{BoundsFilter, Granularity, SeriesCursor, SimulationGrid};
use super::output::ProjectedPoint;
use crate::assumptions::{interpolate_clamped, ReferencePath};
use crate::baseline::{BaselineRecord, ObservationIndex};

/// Anchor-and-rescale projector
#[derive(Debug, Clone)]
pub struct SpeedPathProjector<'a> {
    reference_path: &'a ReferencePath,
    direction: Direction,
    granularity: Granularity,
    bounds: Bounds,
}

impl<'a> SpeedPathProjector<'a> {
    pub fn new(
        reference_path: &'a ReferencePath,
        direction: Direction,
        granularity: Granularity,
        bounds: Bounds,
    ) -> Self {
        Self {
            reference_path,
            direction,
            granularity,
            bounds,
        }
    }

    /// Project every (entity, speed) pair over `window`.
    ///
    /// Each series anchors at the latest curve point the baseline has
    /// already reached. Pairs with no such point (a baseline behind the start
    /// of the curve) produce no rows at all. Beyond the end of the rescaled
    /// curve the last curve value is held, clamped to the bounds.
    pub fn project(
        &self,
        baseline: &[BaselineRecord],
        speeds: &[SpeedMultiplier],
        window: ProjectionWindow,
        observations: Option<&ObservationIndex>,
    ) -> Vec<ProjectedPoint<SpeedMultiplier>> {
        let filter = BoundsFilter::new(self.bounds, observations);
        let mut grid = SimulationGrid::build(baseline, speeds, window, &filter);

        grid.cursors_mut()
            .par_iter_mut()
            .for_each(|cursor| self.trace_series(cursor, &filter));

        let unanchored = grid.cursors().iter().filter(|c| c.points().is_empty()).count();
        debug!(
            "Speed path: {} series, {} without an anchor on the reference path, {} entities excluded",
            grid.cursors().len(),
            unanchored,
            grid.excluded_entities()
        );

        grid.into_points()
    }

    /// Rescaled (year, value) knots of the reference curve for one series.
    /// The first knot is the observed anchor itself.
    pub fn rescaled_knots(&self, anchor_year: i32, anchor_value: f64, speed: SpeedMultiplier) -> Option<Vec<(f64, f64)>> {
        let anchor_time = self.reference_path.anchor_time(anchor_value, self.direction)?;
        let origin = anchor_year as f64;

        let knots: Vec<(f64, f64)> = std::iter::once((origin, anchor_value))
            .chain(
                self.reference_path
                    .points_after(anchor_time)
                    .map(|p| (origin + (p.relative_time - anchor_time) / speed.value(), p.value)),
            )
            .collect();
        Some(knots)
    }

    fn trace_series(&self, cursor: &mut SeriesCursor<SpeedMultiplier>, filter: &BoundsFilter<'_>) {
        let Some(knots) = self.rescaled_knots(cursor.anchor_year(), cursor.anchor_value(), cursor.scenario()) else {
            trace!(
                "{} x{}: baseline {} precedes the reference path",
                cursor.entity_id(),
                cursor.scenario(),
                cursor.anchor_value()
            );
            cursor.discard();
            return;
        };

        while let Some(year) = cursor.next_year() {
            if !filter.admits(cursor.entity_id(), year) {
                trace!("{} x{}: observed value out of bounds in {}", cursor.entity_id(), cursor.scenario(), year);
                cursor.truncate();
                break;
            }
            // knots always holds the anchor, so interpolation has a value
            let raw = interpolate_clamped(&knots, year as f64).unwrap_or(cursor.anchor_value());
            cursor.advance(self.bounds.clamp(self.granularity.round(raw)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assumptions::ReferencePoint;
    use crate::baseline::Observation;
    use approx::assert_abs_diff_eq;

    fn grid() -> Granularity {
        Granularity::new(0.1).unwrap()
    }

    fn speed(v: f64) -> SpeedMultiplier {
        SpeedMultiplier::new(v).unwrap()
    }

    fn path(points: &[(f64, f64)]) -> ReferencePath {
        ReferencePath::new(points.iter().map(|&(t, v)| ReferencePoint::new(t, v)).collect()).unwrap()
    }

    fn series(points: &[ProjectedPoint<SpeedMultiplier>], s: SpeedMultiplier) -> Vec<(i32, f64)> {
        points
            .iter()
            .filter(|pt| pt.scenario == s)
            .map(|pt| (pt.year, pt.value))
            .collect()
    }

    #[test]
    fn test_unit_speed_follows_curve() {
        let curve = path(&[(0.0, 50.0), (1.0, 55.0), (2.0, 62.0)]);
        let projector = SpeedPathProjector::new(&curve, Direction::HigherIsBetter, grid(), Bounds::default());
        let points = projector.project(
            &[BaselineRecord::new("A", 2020, 55.0)],
            &[speed(1.0)],
            ProjectionWindow::Future { target_year: 2023 },
            None,
        );

        assert_eq!(
            series(&points, speed(1.0)),
            vec![(2020, 55.0), (2021, 62.0), (2022, 62.0), (2023, 62.0)]
        );
    }

    #[test]
    fn test_unit_speed_is_translated_curve() {
        let knots: Vec<(f64, f64)> = (0..=20).map(|t| (t as f64, 20.0 + 3.0 * t as f64)).collect();
        let curve = path(&knots);
        let projector = SpeedPathProjector::new(&curve, Direction::HigherIsBetter, grid(), Bounds::default());
        let points = projector.project(
            &[BaselineRecord::new("A", 2015, 32.0)],
            &[speed(1.0)],
            ProjectionWindow::Future { target_year: 2030 },
            None,
        );

        // anchor at relative time 4; each later year reads the curve one step on
        for (year, value) in series(&points, speed(1.0)) {
            let expected = grid().round(curve.value_at(4.0 + (year - 2015) as f64));
            assert_abs_diff_eq!(value, expected, epsilon = 1e-9);
        }
        assert_eq!(points.len(), 16);
    }

    #[test]
    fn test_speed_compresses_and_stretches() {
        let curve = path(&[(0.0, 10.0), (4.0, 30.0), (8.0, 50.0)]);
        let projector = SpeedPathProjector::new(&curve, Direction::HigherIsBetter, grid(), Bounds::default());
        let points = projector.project(
            &[BaselineRecord::new("A", 2020, 10.0)],
            &[speed(0.5), speed(2.0)],
            ProjectionWindow::Future { target_year: 2024 },
            None,
        );

        // double speed covers the curve in four years
        assert_eq!(
            series(&points, speed(2.0)),
            vec![(2020, 10.0), (2021, 20.0), (2022, 30.0), (2023, 40.0), (2024, 50.0)]
        );
        // half speed advances 2.5 per year
        assert_eq!(
            series(&points, speed(0.5)),
            vec![(2020, 10.0), (2021, 12.5), (2022, 15.0), (2023, 17.5), (2024, 20.0)]
        );
    }

    #[test]
    fn test_baseline_between_curve_points() {
        let curve = path(&[(0.0, 50.0), (1.0, 55.0), (2.0, 62.0), (3.0, 66.0)]);
        let projector = SpeedPathProjector::new(&curve, Direction::HigherIsBetter, grid(), Bounds::default());
        let points = projector.project(
            &[BaselineRecord::new("A", 2020, 58.5)],
            &[speed(1.0)],
            ProjectionWindow::Future { target_year: 2022 },
            None,
        );

        // anchored at the native point 55 (time 1); the next year reads 62
        assert_eq!(series(&points, speed(1.0)), vec![(2020, 58.5), (2021, 62.0), (2022, 66.0)]);
    }

    #[test]
    fn test_baseline_behind_curve_excluded() {
        let curve = path(&[(0.0, 50.0), (1.0, 55.0), (2.0, 62.0)]);
        let projector = SpeedPathProjector::new(&curve, Direction::HigherIsBetter, grid(), Bounds::default());
        let points = projector.project(
            &[BaselineRecord::new("A", 2020, 40.0), BaselineRecord::new("B", 2020, 55.0)],
            &[speed(1.0), speed(2.0)],
            ProjectionWindow::Future { target_year: 2022 },
            None,
        );

        assert!(points.iter().all(|pt| pt.entity_id == "B"));
        assert_eq!(points.len(), 6);
    }

    #[test]
    fn test_baseline_beyond_curve_end_holds() {
        let curve = path(&[(0.0, 50.0), (1.0, 55.0), (2.0, 62.0)]);
        let projector = SpeedPathProjector::new(&curve, Direction::HigherIsBetter, grid(), Bounds::default());
        let points = projector.project(
            &[BaselineRecord::new("A", 2020, 70.0)],
            &[speed(1.0)],
            ProjectionWindow::Future { target_year: 2022 },
            None,
        );

        // anchors at the last point; nothing remains to replay
        assert_eq!(series(&points, speed(1.0)), vec![(2020, 70.0), (2021, 70.0), (2022, 70.0)]);
    }

    #[test]
    fn test_values_past_ceiling_are_clamped() {
        let curve = path(&[(0.0, 80.0), (1.0, 95.0), (2.0, 105.0)]);
        let projector = SpeedPathProjector::new(&curve, Direction::HigherIsBetter, grid(), Bounds::default());
        let points = projector.project(
            &[BaselineRecord::new("A", 2020, 80.0)],
            &[speed(1.0)],
            ProjectionWindow::Future { target_year: 2023 },
            None,
        );

        assert_eq!(
            series(&points, speed(1.0)),
            vec![(2020, 80.0), (2021, 95.0), (2022, 100.0), (2023, 100.0)]
        );
    }

    #[test]
    fn test_series_invariants() {
        let knots: Vec<(f64, f64)> = (0..=10).map(|t| (t as f64, 40.0 + 7.3 * t as f64)).collect();
        let curve = path(&knots);
        let bounds = Bounds::default();
        let projector = SpeedPathProjector::new(&curve, Direction::HigherIsBetter, grid(), bounds);
        let baseline = vec![
            BaselineRecord::new("A", 2020, 41.7),
            BaselineRecord::new("B", 2022, 63.2),
            BaselineRecord::new("C", 2025, 88.8),
        ];
        let speeds: Vec<SpeedMultiplier> = [0.25, 0.5, 1.0, 2.0, 4.0].into_iter().map(speed).collect();
        let points = projector.project(&baseline, &speeds, ProjectionWindow::Future { target_year: 2035 }, None);

        for record in &baseline {
            for &s in &speeds {
                let rows: Vec<(i32, f64)> = points
                    .iter()
                    .filter(|pt| pt.entity_id == record.entity_id && pt.scenario == s)
                    .map(|pt| (pt.year, pt.value))
                    .collect();

                assert_eq!(rows.first(), Some(&(record.anchor_year, record.baseline_value)));
                assert_eq!(rows.last().map(|r| r.0), Some(2035));
                for pair in rows.windows(2) {
                    assert_eq!(pair[1].0, pair[0].0 + 1);
                }
                for &(_, value) in &rows {
                    assert!(bounds.contains(value), "{} out of bounds", value);
                    assert!(grid().is_aligned(value), "{} off grid", value);
                }
            }
        }
        // the curve runs past 100, so fast series end on the ceiling
        assert!(points.iter().any(|pt| pt.value == 100.0));
        assert!(points.iter().all(|pt| pt.value <= 100.0));
    }

    #[test]
    fn test_lower_is_better() {
        let curve = path(&[(0.0, 40.0), (2.0, 30.0), (4.0, 10.0)]);
        let projector = SpeedPathProjector::new(&curve, Direction::LowerIsBetter, grid(), Bounds::default());
        let points = projector.project(
            &[BaselineRecord::new("A", 2020, 30.0)],
            &[speed(1.0)],
            ProjectionWindow::Future { target_year: 2023 },
            None,
        );

        assert_eq!(
            series(&points, speed(1.0)),
            vec![(2020, 30.0), (2021, 20.0), (2022, 10.0), (2023, 10.0)]
        );
    }

    #[test]
    fn test_historical_window_and_bounds_filter() {
        let curve = path(&[(0.0, 10.0), (10.0, 60.0)]);
        let observations = ObservationIndex::from_observations(&[Observation::new("A", 2004, Some(-1.0))]);
        let projector = SpeedPathProjector::new(&curve, Direction::HigherIsBetter, grid(), Bounds::default());
        let points = projector.project(
            &[BaselineRecord::new("A", 2001, 20.0)],
            &[speed(1.0)],
            ProjectionWindow::Historical { start_year: 2000, end_year: 2010 },
            Some(&observations),
        );

        assert_eq!(
            series(&points, speed(1.0)),
            vec![(2001, 20.0), (2002, 24.0), (2003, 28.0)]
        );
    }

    #[test]
    fn test_rescaled_knots() {
        let curve = path(&[(0.0, 50.0), (1.0, 55.0), (2.0, 62.0), (4.0, 70.0)]);
        let projector = SpeedPathProjector::new(&curve, Direction::HigherIsBetter, grid(), Bounds::default());

        let knots = projector.rescaled_knots(2020, 55.0, speed(4.0)).unwrap();
        assert_eq!(knots, vec![(2020.0, 55.0), (2020.25, 62.0), (2020.75, 70.0)]);
        assert_eq!(projector.rescaled_knots(2020, 80.0, speed(1.0)).unwrap(), vec![(2020.0, 80.0)]);
        assert!(projector.rescaled_knots(2020, 45.0, speed(1.0)).is_none());
    }
}
