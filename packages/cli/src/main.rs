#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Batch pipeline binary for the Montreal crime dashboard.
//!
//! One run fetches the full dataset, aggregates it, and publishes the
//! per-language artifacts. Every run recomputes from scratch — there is no
//! incremental state to manage.

mod pipeline;

use clap::{Args, Parser, Subcommand};

use crate::pipeline::PipelineError;

/// Open-data portal URL for the citizen-intervention dataset.
const DEFAULT_SOURCE_URL: &str = "http://donnees.ville.montreal.qc.ca/dataset/5829b5b0-ea6f-476f-be94-bc2b8797769a/resource/c6f482bf-bf0f-4960-8b2f-9982c211addd/download/interventionscitoyendo.csv";

#[derive(Parser)]
#[command(name = "mtl_crime_cli", about = "Montreal crime dashboard pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Inputs shared by every subcommand.
#[derive(Args)]
pub(crate) struct InputOpts {
    /// Source CSV URL
    #[arg(long, default_value = DEFAULT_SOURCE_URL)]
    pub(crate) source_url: String,

    /// Path to the hex grid GeoJSON asset
    #[arg(long, default_value = "assets/hex_island_pop.geojson")]
    pub(crate) grid: std::path::PathBuf,

    /// Output directory for generated artifacts
    #[arg(long, default_value = ".")]
    pub(crate) output_dir: std::path::PathBuf,

    /// CSV field delimiter
    #[arg(long, default_value = ",")]
    pub(crate) delimiter: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline: charts, supporting data, GeoJSON, tile upload
    Run {
        #[command(flatten)]
        inputs: InputOpts,

        /// Generate artifacts but skip the tileset upload
        #[arg(long)]
        skip_upload: bool,
    },
    /// Generate the chart and supporting-data bundles only
    Charts {
        #[command(flatten)]
        inputs: InputOpts,
    },
    /// Generate the per-language GeoJSON artifacts only
    Geojson {
        #[command(flatten)]
        inputs: InputOpts,
    },
    /// Detect significant year-over-year changes per hex
    Changes {
        #[command(flatten)]
        inputs: InputOpts,

        /// Width of the comparison window, in months
        #[arg(long, default_value_t = mtl_crime_analytics::windows::DEFAULT_WINDOW_MONTHS)]
        months: u32,

        /// Significance threshold, in percent
        #[arg(long, default_value_t = mtl_crime_analytics::changes::DEFAULT_THRESHOLD_PCT)]
        threshold: f64,

        /// Minimum baseline count for a hex/category pair to qualify
        #[arg(long, default_value_t = mtl_crime_analytics::changes::DEFAULT_MIN_BASELINE)]
        min_baseline: u64,
    },
}

#[tokio::main]
async fn main() -> Result<(), PipelineError> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            inputs,
            skip_upload,
        } => pipeline::run(&inputs, skip_upload).await?,
        Commands::Charts { inputs } => pipeline::charts(&inputs).await?,
        Commands::Geojson { inputs } => pipeline::geojson(&inputs).await?,
        Commands::Changes {
            inputs,
            months,
            threshold,
            min_baseline,
        } => pipeline::changes(&inputs, months, threshold, min_baseline).await?,
    }

    Ok(())
}
