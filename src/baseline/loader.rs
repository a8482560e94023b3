//! Load observations and baseline tables from CSV (`entity_id,year,value`)

use std::fs::File;
use std::io::Read;
use std::path::Path;

use log::info;

use super::{BaselineRecord, Observation};
use crate::error::Result;

/// Load raw observations from a CSV file. Empty value cells are missing.
pub fn load_observations<P: AsRef<Path>>(path: P) -> Result<Vec<Observation>> {
    let file = File::open(path)?;
    load_observations_from_reader(file)
}

pub fn load_observations_from_reader<R: Read>(reader: R) -> Result<Vec<Observation>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let observations = csv_reader
        .deserialize::<Observation>()
        .collect::<std::result::Result<Vec<_>, _>>()?;
    info!("Loaded {} observations", observations.len());
    Ok(observations)
}

/// Load a ready baseline table, one row per entity
pub fn load_baseline<P: AsRef<Path>>(path: P) -> Result<Vec<BaselineRecord>> {
    let file = File::open(path)?;
    load_baseline_from_reader(file)
}

pub fn load_baseline_from_reader<R: Read>(reader: R) -> Result<Vec<BaselineRecord>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let baseline = csv_reader
        .deserialize::<BaselineRecord>()
        .collect::<std::result::Result<Vec<_>, _>>()?;
    info!("Loaded {} baseline records", baseline.len());
    Ok(baseline)
}
