//! Score one recorded landmark sequence.
//!
//! ```text
//! score_sequence --input landmarks.json --exercise single_leg_squat --output results/
//! ```

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use motion_scan::config::{self, Config};
use motion_scan::error::Error;
use motion_scan::evaluator::Exercise;
use motion_scan::pipeline::{self, Pipeline};
use motion_scan::pose::Sequence;

const CONFIG_PATH: &str = "config.toml";

#[derive(Parser)]
#[command(name = "score_sequence")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Score a pose landmark sequence and check its tracking quality", long_about = None)]
struct Cli {
    /// Landmark sequence (JSON frame array or extraction record)
    #[arg(short, long)]
    input: PathBuf,

    /// Exercise to score (pelvic_stability, single_leg_squat, cross_step,
    /// jump_landing, push_pull, stride_mimic, upper_body_swing)
    #[arg(short, long, default_value = "single_leg_squat")]
    exercise: String,

    /// Threshold configuration
    #[arg(short, long, default_value = CONFIG_PATH)]
    config: PathBuf,

    /// Directory for the result and warnings.json
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    let exercise: Exercise = cli.exercise.parse()?;

    let text = fs::read_to_string(&cli.config)
        .with_context(|| format!("Failed to read config: {}", cli.config.display()))?;
    let (valid, errors) = config::preflight(&text);
    if !valid {
        error!(path = %cli.config.display(), "config preflight failed");
        bail!(Error::InvalidConfig(errors));
    }
    let config = Config::from_toml_str(&text).context("Failed to parse config")?;

    let sequence = Sequence::load_json(&cli.input)
        .with_context(|| format!("Failed to load landmarks: {}", cli.input.display()))?;
    info!(frames = sequence.len(), exercise = %exercise, "sequence loaded");

    let mut pipeline = Pipeline::new(&config);
    let source = cli.input.to_string_lossy();
    let result = pipeline.process(&sequence, exercise, Some(source.as_ref()))?;

    println!("{}", pipeline::summary(&result));

    if let Some(dir) = &cli.output {
        let path = pipeline
            .save_result(&result, dir)
            .context("Failed to save result")?;
        println!("Result: {}", path.display());
        println!("Warnings: {}", dir.join(pipeline::WARNINGS_FILE).display());
    }

    Ok(())
}
