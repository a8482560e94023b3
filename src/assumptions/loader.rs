//! Load model artifacts from CSV
//!
//! Change model: `initial_value,percentile,change`
//! Reference path: `relative_time,value[,curve]`

use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use log::info;
use serde::Deserialize;

use super::{ChangeModel, ChangeModelRow, ReferencePath, ReferencePoint};
use crate::error::{Error, Result};
use crate::projection::Granularity;

/// Load the change model from a CSV file
pub fn load_change_model<P: AsRef<Path>>(path: P, granularity: Granularity) -> Result<ChangeModel> {
    let file = File::open(path)?;
    load_change_model_from_reader(file, granularity)
}

/// Load the change model from any reader
pub fn load_change_model_from_reader<R: Read>(reader: R, granularity: Granularity) -> Result<ChangeModel> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let rows = csv_reader
        .deserialize::<ChangeModelRow>()
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let model = ChangeModel::from_rows(rows, granularity)?;
    info!("Loaded change model with {} entries", model.len());
    Ok(model)
}

#[derive(Debug, Deserialize)]
struct ReferencePathRow {
    relative_time: f64,
    value: f64,
    #[serde(default)]
    curve: Option<String>,
}

/// Load a reference path from a CSV file; `curve` selects one named curve
/// when the file holds several
pub fn load_reference_path<P: AsRef<Path>>(path: P, curve: Option<&str>) -> Result<ReferencePath> {
    let file = File::open(path)?;
    load_reference_path_from_reader(file, curve)
}

pub fn load_reference_path_from_reader<R: Read>(reader: R, curve: Option<&str>) -> Result<ReferencePath> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let rows = csv_reader
        .deserialize::<ReferencePathRow>()
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let points: Vec<ReferencePoint> = match curve {
        Some(name) => rows
            .iter()
            .filter(|row| row.curve.as_deref() == Some(name))
            .map(|row| ReferencePoint::new(row.relative_time, row.value))
            .collect(),
        None => {
            let curves: BTreeSet<&str> = rows.iter().filter_map(|row| row.curve.as_deref()).collect();
            if curves.len() > 1 {
                return Err(Error::InvalidInput(format!(
                    "reference path file holds {} curves ({}); select one",
                    curves.len(),
                    curves.into_iter().collect::<Vec<_>>().join(", ")
                )));
            }
            rows.iter()
                .map(|row| ReferencePoint::new(row.relative_time, row.value))
                .collect()
        }
    };

    if points.is_empty() {
        if let Some(name) = curve {
            return Err(Error::InvalidInput(format!("no reference curve named {name}")));
        }
    }

    let path = ReferencePath::new(points)?;
    info!("Loaded reference path with {} points", path.points().len());
    Ok(path)
}
