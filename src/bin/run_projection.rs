//! Run percentile and/or speed path projections from CSV inputs
//!
//! Writes `percentile_path.csv` and/or `speed_path.csv` to the output directory

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use log::info;

use indicator_paths::assumptions::{load_change_model, load_reference_path};
use indicator_paths::baseline::{extract_baseline, load_baseline, load_observations, AnchorRule};
use indicator_paths::projection::output::write_points;
use indicator_paths::projection::{ProjectionConfig, ProjectionMode};
use indicator_paths::{MethodFlags, ObservationIndex, ProjectionEngine, ProjectionInputs};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Method {
    Percentile,
    Speed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    Future,
    Historical,
}

impl From<Mode> for ProjectionMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Future => ProjectionMode::Future,
            Mode::Historical => ProjectionMode::Historical,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "run_projection", about = "Project indicator paths for a panel of entities")]
struct Args {
    /// JSON configuration; omitted fields use defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Raw observations (entity_id,year,value); used for bound filtering and,
    /// without --baseline, to extract anchors
    #[arg(long)]
    observations: Option<PathBuf>,

    /// Ready baseline table (entity_id,year,value), one row per entity
    #[arg(long)]
    baseline: Option<PathBuf>,

    /// Change model (initial_value,percentile,change)
    #[arg(long)]
    change_model: Option<PathBuf>,

    /// Reference path (relative_time,value[,curve])
    #[arg(long)]
    reference_path: Option<PathBuf>,

    /// Curve to select from a multi-curve reference path file
    #[arg(long)]
    curve: Option<String>,

    /// Methods to run
    #[arg(long, value_enum, value_delimiter = ',')]
    methods: Vec<Method>,

    /// Override the configured mode
    #[arg(long, value_enum)]
    mode: Option<Mode>,

    /// Override the configured target year
    #[arg(long)]
    target_year: Option<i32>,

    #[arg(long, default_value = ".")]
    output_dir: PathBuf,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let start = Instant::now();

    let mut config = match &args.config {
        Some(path) => ProjectionConfig::from_json_file(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => ProjectionConfig::default(),
    };
    if let Some(mode) = args.mode {
        config.mode = mode.into();
    }
    if let Some(year) = args.target_year {
        config.target_year = year;
    }
    let granularity = config.grid()?;

    let observations = match &args.observations {
        Some(path) => Some(
            load_observations(path).with_context(|| format!("reading observations {}", path.display()))?,
        ),
        None => None,
    };

    let baseline = match (&args.baseline, &observations) {
        (Some(path), _) => {
            load_baseline(path).with_context(|| format!("reading baseline {}", path.display()))?
        }
        (None, Some(observations)) => {
            let years = match config.mode {
                ProjectionMode::Future => None,
                ProjectionMode::Historical => Some((config.start_year, config.end_year)),
            };
            extract_baseline(
                observations,
                AnchorRule::from(config.mode),
                years,
                granularity,
                config.bounds(),
            )
        }
        (None, None) => bail!("either --baseline or --observations is required"),
    };
    info!("Baseline holds {} entities", baseline.len());

    let change_model = match &args.change_model {
        Some(path) => Some(
            load_change_model(path, granularity)
                .with_context(|| format!("reading change model {}", path.display()))?,
        ),
        None => None,
    };
    let reference_path = match &args.reference_path {
        Some(path) => Some(
            load_reference_path(path, args.curve.as_deref())
                .with_context(|| format!("reading reference path {}", path.display()))?,
        ),
        None => None,
    };
    let index = observations.as_deref().map(ObservationIndex::from_observations);

    let inputs = ProjectionInputs {
        baseline: &baseline,
        change_model: change_model.as_ref(),
        reference_path: reference_path.as_ref(),
        observations: index.as_ref(),
    };
    let methods = MethodFlags {
        percentile: args.methods.contains(&Method::Percentile),
        speed: args.methods.contains(&Method::Speed),
    };

    let engine = ProjectionEngine::new(config);
    let bundle = engine.run(&inputs, methods)?;

    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("creating {}", args.output_dir.display()))?;
    if let Some(points) = &bundle.percentile_path {
        let path = args.output_dir.join("percentile_path.csv");
        write_points(&path, points).with_context(|| format!("writing {}", path.display()))?;
        info!("Wrote {} rows to {}", points.len(), path.display());
    }
    if let Some(points) = &bundle.speed_path {
        let path = args.output_dir.join("speed_path.csv");
        write_points(&path, points).with_context(|| format!("writing {}", path.display()))?;
        info!("Wrote {} rows to {}", points.len(), path.display());
    }

    info!("Total time: {:?}", start.elapsed());
    Ok(())
}
