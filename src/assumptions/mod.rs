//! Model artifacts consumed by the projectors
//!
//! Both are fitted elsewhere and handed over whole:
//! - `ChangeModel`: predicted yearly change by (grid value, percentile)
//! - `ReferencePath`: canonical (relative time, value) progress curve

mod change_model;
mod reference_path;
pub mod loader;

pub use change_model::{ChangeModel, ChangeModelRow, Percentile};
pub use reference_path::{ReferencePath, ReferencePoint};
pub(crate) use reference_path::interpolate_clamped;
pub use loader::{
    load_change_model, load_change_model_from_reader, load_reference_path,
    load_reference_path_from_reader,
};
