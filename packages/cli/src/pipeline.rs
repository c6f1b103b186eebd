//! Pipeline stages wired together around a per-run context.
//!
//! The context — incident table plus hex grid — is built once per run and
//! passed explicitly to every stage. Nothing in the pipeline reads from an
//! ambient dataset, so stage order within a run cannot change results.

use std::path::Path;

use mtl_crime_analytics::changes::detect_changes;
use mtl_crime_analytics::windows::comparison_windows;
use mtl_crime_generate::charts::{line_chart_bundle, pie_chart_bundle, supporting_data};
use mtl_crime_generate::{
    ExportError, legend_range, merge, to_geojson, write_chart_scripts, write_geojson,
    write_supporting_data,
};
use mtl_crime_models::{IncidentTable, Lang};
use mtl_crime_publish::mapbox::MapboxUploader;
use mtl_crime_publish::{PublishError, publish_with_retry};
use mtl_crime_source::SourceError;
use mtl_crime_spatial::{HexCounts, HexGrid, SpatialError, join_to_grid};
use thiserror::Error;

use crate::InputOpts;

/// Errors that can abort a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Dataset loading failed.
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Grid loading or joining failed.
    #[error("Spatial error: {0}")]
    Spatial(#[from] SpatialError),

    /// Artifact generation failed.
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// Tileset publishing failed.
    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A required environment variable is unset.
    #[error("Missing environment variable: {name}")]
    MissingEnv {
        /// Name of the missing variable.
        name: String,
    },
}

/// Everything a run needs, loaded once and shared read-only by all stages.
pub struct RunContext {
    /// The full incident table, sorted by date.
    pub incidents: IncidentTable,
    /// The static hex grid with its spatial index.
    pub grid: HexGrid,
}

impl RunContext {
    /// Fetches the dataset and loads the grid asset.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if either input fails to load; a run never
    /// continues on partial inputs.
    pub async fn load(inputs: &InputOpts) -> Result<Self, PipelineError> {
        let incidents = mtl_crime_source::load(&inputs.source_url, delimiter(inputs)).await?;
        let grid = HexGrid::load(&inputs.grid)?;
        Ok(Self { incidents, grid })
    }

    /// Complete per-hex counts over the whole dataset.
    fn hex_counts(&self) -> HexCounts {
        HexCounts::complete(&join_to_grid(&self.incidents, &self.grid), &self.grid)
    }
}

fn delimiter(inputs: &InputOpts) -> u8 {
    inputs
        .delimiter
        .as_bytes()
        .first()
        .copied()
        .unwrap_or(mtl_crime_source::DEFAULT_DELIMITER)
}

fn env_var(name: &str) -> Result<String, PipelineError> {
    std::env::var(name).map_err(|_| PipelineError::MissingEnv {
        name: name.to_string(),
    })
}

/// Tileset id environment variable for a language.
fn tileset_env(lang: Lang) -> &'static str {
    match lang {
        Lang::Fr => "TILESET_ID_FR",
        Lang::En => "TILESET_ID_EN",
    }
}

/// Full pipeline: chart bundles, supporting data, GeoJSON, tile upload.
///
/// # Errors
///
/// Returns [`PipelineError`] on the first failed stage.
pub async fn run(inputs: &InputOpts, skip_upload: bool) -> Result<(), PipelineError> {
    let context = RunContext::load(inputs).await?;
    let counts = context.hex_counts();
    let records = merge(&context.grid, &counts);
    let legend = legend_range(&counts);

    let uploader = if skip_upload {
        None
    } else {
        Some(MapboxUploader::new(
            &env_var("MAPBOX_USERNAME")?,
            &env_var("MAPBOX_API_KEY")?,
        )?)
    };

    for &lang in Lang::ALL {
        log::info!("Processing {} outputs", lang.code());

        write_bundles(&context, &records, legend, lang, &inputs.output_dir)?;

        let collection = to_geojson(&records, lang);
        let path = write_geojson(&inputs.output_dir, lang, &collection)?;

        if let Some(uploader) = &uploader {
            let tileset = env_var(tileset_env(lang))?;
            publish_with_retry(uploader, &path, &tileset).await?;
        }
    }

    log::info!("Pipeline run complete");
    Ok(())
}

/// Chart and supporting-data bundles only.
///
/// # Errors
///
/// Returns [`PipelineError`] on the first failed stage.
pub async fn charts(inputs: &InputOpts) -> Result<(), PipelineError> {
    let context = RunContext::load(inputs).await?;
    let counts = context.hex_counts();
    let records = merge(&context.grid, &counts);
    let legend = legend_range(&counts);

    for &lang in Lang::ALL {
        write_bundles(&context, &records, legend, lang, &inputs.output_dir)?;
    }
    Ok(())
}

/// Per-language GeoJSON artifacts only, no upload.
///
/// # Errors
///
/// Returns [`PipelineError`] on the first failed stage.
pub async fn geojson(inputs: &InputOpts) -> Result<(), PipelineError> {
    let context = RunContext::load(inputs).await?;
    let counts = context.hex_counts();
    let records = merge(&context.grid, &counts);

    for &lang in Lang::ALL {
        let collection = to_geojson(&records, lang);
        write_geojson(&inputs.output_dir, lang, &collection)?;
    }
    Ok(())
}

/// Year-over-year change detection, written as a JSON artifact.
///
/// # Errors
///
/// Returns [`PipelineError`] on the first failed stage.
pub async fn changes(
    inputs: &InputOpts,
    months: u32,
    threshold: f64,
    min_baseline: u64,
) -> Result<(), PipelineError> {
    let context = RunContext::load(inputs).await?;

    let Some(windows) = comparison_windows(&context.incidents, months) else {
        log::warn!("No data available for change detection");
        return Ok(());
    };

    log::info!(
        "Comparing last {months} months ({} incidents) against the year before ({} incidents)",
        windows.current.len(),
        windows.baseline.len(),
    );

    let baseline = HexCounts::complete(&join_to_grid(&windows.baseline, &context.grid), &context.grid);
    let current = HexCounts::complete(&join_to_grid(&windows.current, &context.grid), &context.grid);

    let table = detect_changes(&baseline, &current, threshold, min_baseline);
    log::info!("{} hexes with significant year-over-year changes", table.len());

    std::fs::create_dir_all(&inputs.output_dir)?;
    let path = inputs.output_dir.join(format!("changes_{months}m.json"));
    std::fs::write(&path, serde_json::to_string(&table)?)?;
    log::info!("Wrote {}", path.display());

    Ok(())
}

fn write_bundles(
    context: &RunContext,
    records: &[mtl_crime_generate::HexRecord],
    legend: mtl_crime_generate::LegendRange,
    lang: Lang,
    output_dir: &Path,
) -> Result<(), PipelineError> {
    let line = line_chart_bundle(&context.incidents, lang);
    let pie = pie_chart_bundle(&context.incidents, lang);
    let support = supporting_data(&context.incidents, records, legend, lang);

    write_chart_scripts(output_dir, lang, &line, &pie)?;
    write_supporting_data(output_dir, lang, &support)?;
    Ok(())
}
