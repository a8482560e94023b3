//! Projection engine: validates a run and dispatches to the projectors

use log::info;
use serde::{Deserialize, Serialize};

use super::config::{ProjectionConfig, SpeedMultiplier};
use super::output::ProjectedPoint;
use super::percentile::PercentilePathProjector;
use super::speed::SpeedPathProjector;
use crate::assumptions::{ChangeModel, Percentile, ReferencePath};
use crate::baseline::{BaselineRecord, ObservationIndex};
use crate::error::{ConfigError, Result};

/// Which projection methods to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MethodFlags {
    pub percentile: bool,
    pub speed: bool,
}

impl MethodFlags {
    pub fn both() -> Self {
        Self { percentile: true, speed: true }
    }

    pub fn percentile_only() -> Self {
        Self { percentile: true, speed: false }
    }

    pub fn speed_only() -> Self {
        Self { percentile: false, speed: true }
    }

    pub fn any(&self) -> bool {
        self.percentile || self.speed
    }
}

/// Borrowed inputs for one run. Artifacts are only required for the
/// methods that use them.
#[derive(Debug, Clone, Copy)]
pub struct ProjectionInputs<'a> {
    pub baseline: &'a [BaselineRecord],
    pub change_model: Option<&'a ChangeModel>,
    pub reference_path: Option<&'a ReferencePath>,
    /// Actual observations; rows whose observed value is out of bounds are dropped
    pub observations: Option<&'a ObservationIndex>,
}

impl<'a> ProjectionInputs<'a> {
    pub fn new(baseline: &'a [BaselineRecord]) -> Self {
        Self {
            baseline,
            change_model: None,
            reference_path: None,
            observations: None,
        }
    }

    pub fn with_change_model(mut self, change_model: &'a ChangeModel) -> Self {
        self.change_model = Some(change_model);
        self
    }

    pub fn with_reference_path(mut self, reference_path: &'a ReferencePath) -> Self {
        self.reference_path = Some(reference_path);
        self
    }

    pub fn with_observations(mut self, observations: &'a ObservationIndex) -> Self {
        self.observations = Some(observations);
        self
    }
}

/// Result tables of a run; a table is present only if its method ran
#[derive(Debug, Clone, Default)]
pub struct ProjectionBundle {
    pub percentile_path: Option<Vec<ProjectedPoint<Percentile>>>,
    pub speed_path: Option<Vec<ProjectedPoint<SpeedMultiplier>>>,
}

/// Projection engine
pub struct ProjectionEngine {
    config: ProjectionConfig,
}

impl ProjectionEngine {
    pub fn new(config: ProjectionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProjectionConfig {
        &self.config
    }

    /// Run the requested methods.
    ///
    /// Configuration problems abort the whole run before anything is
    /// projected. Series that end early or entities that are excluded are
    /// reflected only in the size of the output.
    pub fn run(&self, inputs: &ProjectionInputs<'_>, methods: MethodFlags) -> Result<ProjectionBundle> {
        self.check(inputs, methods)?;

        let granularity = self.config.grid()?;
        let bounds = self.config.bounds();
        let window = self.config.window();
        let mut bundle = ProjectionBundle::default();

        if let Some(change_model) = inputs.change_model.filter(|_| methods.percentile) {
            let projector = PercentilePathProjector::new(change_model, granularity, bounds);
            let points = projector.project(inputs.baseline, &self.config.percentiles, window, inputs.observations);
            info!("Percentile path: {} rows for {} percentiles", points.len(), self.config.percentiles.len());
            bundle.percentile_path = Some(points);
        }

        if let Some(reference_path) = inputs.reference_path.filter(|_| methods.speed) {
            let projector = SpeedPathProjector::new(reference_path, self.config.direction, granularity, bounds);
            let points = projector.project(inputs.baseline, &self.config.speeds, window, inputs.observations);
            info!("Speed path: {} rows for {} speeds", points.len(), self.config.speeds.len());
            bundle.speed_path = Some(points);
        }

        Ok(bundle)
    }

    fn check(&self, inputs: &ProjectionInputs<'_>, methods: MethodFlags) -> std::result::Result<(), ConfigError> {
        if !methods.any() {
            return Err(ConfigError::NoMethodRequested);
        }
        if methods.percentile && inputs.change_model.is_none() {
            return Err(ConfigError::MissingChangeModel);
        }
        if methods.speed && inputs.reference_path.is_none() {
            return Err(ConfigError::MissingReferencePath);
        }

        self.config.validate_for(methods)?;

        if let Some(model) = inputs.change_model.filter(|_| methods.percentile) {
            let step = model.granularity().step();
            if (step - self.config.granularity).abs() > f64::EPSILON * step.max(1.0) {
                return Err(ConfigError::GranularityMismatch {
                    model: step,
                    config: self.config.granularity,
                });
            }
        }

        Ok(())
    }
}
