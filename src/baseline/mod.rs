//! Observation and baseline data structures

mod data;
pub mod extract;
pub mod loader;

pub use data::{Observation, BaselineRecord, ObservationIndex};
pub use extract::{AnchorRule, extract_baseline};
pub use loader::{load_observations, load_observations_from_reader, load_baseline, load_baseline_from_reader};
