//! Percentile-path projector
//!
//! Each (entity, percentile) series starts at the entity's anchor and is
//! advanced one year at a time by the change the model predicts for its
//! current grid value. A missing model entry ends the series silently.
//!
//! Years are a barrier: every cursor is moved to year `y` before any moves
//! to `y + 1`. Within a year the cursors are independent and run in
//! parallel.

use log::{debug, trace};
use rayon::prelude::*;

use super::config::{Bounds, ProjectionWindow};
use super::grid::{BoundsFilter, Granularity, SeriesCursor, SimulationGrid};
use super::output::ProjectedPoint;
use crate::assumptions::{ChangeModel, Percentile};
use crate::baseline::{BaselineRecord, ObservationIndex};

/// Iterative change-application projector
#[derive(Debug, Clone)]
pub struct PercentilePathProjector<'a> {
    change_model: &'a ChangeModel,
    granularity: Granularity,
    bounds: Bounds,
}

impl<'a> PercentilePathProjector<'a> {
    pub fn new(change_model: &'a ChangeModel, granularity: Granularity, bounds: Bounds) -> Self {
        Self {
            change_model,
            granularity,
            bounds,
        }
    }

    /// Project every (entity, percentile) pair over `window`.
    ///
    /// Future windows run from each anchor to the target year; historical
    /// windows require the anchor (the earliest observation) inside
    /// `[start, end]` and run to the end year. Rows whose observed value is
    /// out of bounds end the series in that year.
    pub fn project(
        &self,
        baseline: &[BaselineRecord],
        percentiles: &[Percentile],
        window: ProjectionWindow,
        observations: Option<&ObservationIndex>,
    ) -> Vec<ProjectedPoint<Percentile>> {
        let filter = BoundsFilter::new(self.bounds, observations);
        let mut grid = SimulationGrid::build(baseline, percentiles, window, &filter);

        if let Some((first, last)) = grid.sweep_years() {
            for year in first..=last {
                grid.cursors_mut()
                    .par_iter_mut()
                    .filter(|cursor| cursor.next_year() == Some(year))
                    .for_each(|cursor| self.step(cursor, year, &filter));
            }
        }

        let truncated = grid
            .cursors()
            .iter()
            .filter(|cursor| cursor.points().last().map(|p| p.year) != Some(window.last_year()))
            .count();
        debug!(
            "Percentile path: {} series, {} ended before {}, {} entities excluded",
            grid.cursors().len(),
            truncated,
            window.last_year(),
            grid.excluded_entities()
        );

        grid.into_points()
    }

    fn step(&self, cursor: &mut SeriesCursor<Percentile>, year: i32, filter: &BoundsFilter<'_>) {
        let current = cursor.current_value();
        let Some(change) = self.change_model.change(current, cursor.scenario()) else {
            trace!(
                "{} p{}: no change entry at {}, series ends in {}",
                cursor.entity_id(),
                cursor.scenario(),
                self.granularity.round(current),
                year - 1
            );
            cursor.truncate();
            return;
        };

        if !filter.admits(cursor.entity_id(), year) {
            trace!("{} p{}: observed value out of bounds in {}", cursor.entity_id(), cursor.scenario(), year);
            cursor.truncate();
            return;
        }

        let next = self.bounds.clamp(self.granularity.round(current + change));
        cursor.advance(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assumptions::ChangeModelRow;
    use crate::baseline::Observation;
    use approx::assert_abs_diff_eq;

    fn grid() -> Granularity {
        Granularity::new(0.1).unwrap()
    }

    fn p(label: u8) -> Percentile {
        Percentile::from_label(label)
    }

    fn model(rows: &[(f64, u8, f64)]) -> ChangeModel {
        ChangeModel::from_rows(
            rows.iter().map(|&(v, label, c)| ChangeModelRow::new(v, p(label), c)),
            grid(),
        )
        .unwrap()
    }

    fn series(points: &[ProjectedPoint<Percentile>]) -> Vec<(i32, f64)> {
        points.iter().map(|pt| (pt.year, pt.value)).collect()
    }

    #[test]
    fn test_two_step_projection() {
        let model = model(&[(50.0, 50, 2.0), (52.0, 50, 1.5)]);
        let projector = PercentilePathProjector::new(&model, grid(), Bounds::default());
        let points = projector.project(
            &[BaselineRecord::new("A", 2020, 50.0)],
            &[p(50)],
            ProjectionWindow::Future { target_year: 2022 },
            None,
        );

        assert_eq!(series(&points), vec![(2020, 50.0), (2021, 52.0), (2022, 53.5)]);
        assert!(points.iter().all(|pt| pt.entity_id == "A" && pt.scenario == p(50)));
    }

    #[test]
    fn test_missing_entry_truncates() {
        let model = model(&[(50.0, 50, 2.0)]);
        let projector = PercentilePathProjector::new(&model, grid(), Bounds::default());
        let points = projector.project(
            &[BaselineRecord::new("A", 2020, 50.0)],
            &[p(50)],
            ProjectionWindow::Future { target_year: 2022 },
            None,
        );

        assert_eq!(series(&points), vec![(2020, 50.0), (2021, 52.0)]);
    }

    #[test]
    fn test_no_entry_at_seed_gives_single_row() {
        let model = model(&[(50.0, 50, 2.0)]);
        let projector = PercentilePathProjector::new(&model, grid(), Bounds::default());
        let points = projector.project(
            &[BaselineRecord::new("A", 2020, 50.0)],
            &[p(50), p(80)],
            ProjectionWindow::Future { target_year: 2025 },
            None,
        );

        let p80: Vec<_> = points.iter().filter(|pt| pt.scenario == p(80)).collect();
        assert_eq!(p80.len(), 1);
        assert_eq!((p80[0].year, p80[0].value), (2020, 50.0));
    }

    #[test]
    fn test_values_clamped_to_bounds() {
        // a constant change walks the value up into the ceiling and holds it there
        let rows: Vec<(f64, u8, f64)> = (900..=1000).map(|i| (i as f64 / 10.0, 50, 4.0)).collect();
        let model = model(&rows);
        let projector = PercentilePathProjector::new(&model, grid(), Bounds::default());
        let points = projector.project(
            &[BaselineRecord::new("A", 2020, 95.0)],
            &[p(50)],
            ProjectionWindow::Future { target_year: 2024 },
            None,
        );

        assert_eq!(
            series(&points),
            vec![(2020, 95.0), (2021, 99.0), (2022, 100.0), (2023, 100.0), (2024, 100.0)]
        );
    }

    #[test]
    fn test_observed_out_of_bounds_ends_series() {
        let model = model(&[(50.0, 50, 1.0), (51.0, 50, 1.0), (52.0, 50, 1.0), (50.0, 20, 0.0)]);
        let observations = ObservationIndex::from_observations(&[
            Observation::new("A", 2021, Some(51.0)),
            Observation::new("A", 2022, Some(104.0)),
        ]);
        let projector = PercentilePathProjector::new(&model, grid(), Bounds::default());
        let points = projector.project(
            &[BaselineRecord::new("A", 2020, 50.0)],
            &[p(20), p(50)],
            ProjectionWindow::Future { target_year: 2023 },
            Some(&observations),
        );

        // 2022 is dropped for every percentile, and nothing after it is emitted
        assert!(points.iter().all(|pt| pt.year <= 2021));
        assert_eq!(points.len(), 4);
    }

    #[test]
    fn test_historical_window() {
        let model = model(&[(30.0, 50, 0.5), (30.5, 50, 0.5), (31.0, 50, 0.5), (31.5, 50, 0.5)]);
        let projector = PercentilePathProjector::new(&model, grid(), Bounds::default());
        let baseline = vec![
            BaselineRecord::new("A", 2001, 30.0),
            BaselineRecord::new("B", 1995, 30.0),
        ];
        let points = projector.project(
            &baseline,
            &[p(50)],
            ProjectionWindow::Historical { start_year: 2000, end_year: 2004 },
            None,
        );

        // B's anchor predates the window and is excluded
        assert!(points.iter().all(|pt| pt.entity_id == "A"));
        assert_eq!(
            series(&points),
            vec![(2001, 30.0), (2002, 30.5), (2003, 31.0), (2004, 31.5)]
        );
    }

    #[test]
    fn test_entities_with_different_anchor_years() {
        let model = model(&[(10.0, 50, 0.3), (10.3, 50, 0.3), (10.6, 50, 0.3)]);
        let projector = PercentilePathProjector::new(&model, grid(), Bounds::default());
        let baseline = vec![
            BaselineRecord::new("A", 2018, 10.0),
            BaselineRecord::new("B", 2020, 10.0),
        ];
        let points = projector.project(
            &baseline,
            &[p(50)],
            ProjectionWindow::Future { target_year: 2021 },
            None,
        );

        let a: Vec<_> = points.iter().filter(|pt| pt.entity_id == "A").collect();
        let b: Vec<_> = points.iter().filter(|pt| pt.entity_id == "B").collect();
        assert_eq!(a.len(), 4);
        assert_abs_diff_eq!(a[3].value, 10.9, epsilon = 1e-9);
        assert_eq!(b.len(), 2);
        assert_abs_diff_eq!(b[1].value, 10.3, epsilon = 1e-9);
    }

    #[test]
    fn test_series_invariants() {
        let rows: Vec<(f64, u8, f64)> = (0..=1000)
            .flat_map(|i| {
                let v = i as f64 / 10.0;
                [(v, 20, 0.37), (v, 80, 1.73)]
            })
            .collect();
        let model = model(&rows);
        let baseline = vec![
            BaselineRecord::new("A", 2019, 12.3),
            BaselineRecord::new("B", 2021, 97.1),
            BaselineRecord::new("C", 2020, 55.0),
        ];
        let projector = PercentilePathProjector::new(&model, grid(), Bounds::default());
        let points = projector.project(
            &baseline,
            &[p(20), p(80)],
            ProjectionWindow::Future { target_year: 2030 },
            None,
        );

        for record in &baseline {
            for percentile in [p(20), p(80)] {
                let rows: Vec<_> = points
                    .iter()
                    .filter(|pt| pt.entity_id == record.entity_id && pt.scenario == percentile)
                    .collect();
                assert_eq!(rows[0].year, record.anchor_year);
                assert_eq!(rows[0].value, record.baseline_value);
                assert!(rows.windows(2).all(|w| w[1].year == w[0].year + 1));
                assert_eq!(rows.last().unwrap().year, 2030);
            }
        }
        for pt in &points {
            assert!(Bounds::default().contains(pt.value));
            let scaled = pt.value * 10.0;
            assert_abs_diff_eq!(scaled, scaled.round(), epsilon = 1e-6);
        }
    }
}
