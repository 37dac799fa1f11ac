// src/main.rs

mod analysis;
mod config;
mod export;
mod ingest;
mod pipeline;
mod taxonomy;
mod types;

use analysis::ShiftSchedule;
use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use walkdir::WalkDir;

fn find_datasets(input_dir: &str) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(input_dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .map_or(false, |ext| ext.eq_ignore_ascii_case("csv"))
        })
        .collect();
    files.sort();
    files
}

fn process_dataset(path: &Path, config: &types::Config, schedule: &ShiftSchedule) -> Result<()> {
    let (events, report) = ingest::read_events_from_path(path)?;
    let output = pipeline::run(&events, config)?;

    let dataset_name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("dataset");
    let output_dir = Path::new(&config.io.output_dir).join(dataset_name);
    export::export_all(&output, schedule, &output_dir.to_string_lossy())?;

    info!("📊 {} summary:", dataset_name);
    info!(
        "  Events: {} kept / {} read ({} bad timestamps)",
        report.rows_kept, report.rows_read, report.rows_dropped_bad_timestamp
    );
    info!("  Vehicles: {}", report.vehicles);
    info!("  Transitions: {}", output.classified.len());
    info!("  Complete cycles: {}", output.cycles.len());
    info!("  Travel intervals: {}", output.travel.len());
    if !output.candidate_zones.is_empty() {
        warn!(
            "  🗺️  Candidate unmapped zones: {}",
            output.candidate_zones.len()
        );
    }
    if !output.quality.unclassified_labels.is_empty() {
        warn!(
            "  Unclassified geofence labels: {:?}",
            output.quality.unclassified_labels
        );
    }

    Ok(())
}

fn main() -> Result<()> {
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.yaml".to_string());
    let config = types::Config::load_or_default(&config_path)?;

    tracing_subscriber::fmt()
        .with_env_filter(format!("haul_analytics={}", config.logging.level))
        .init();

    info!("🚚 Haul Cycle Analytics Starting");
    info!("✓ Configuration loaded from {}", config_path);

    let schedule = ShiftSchedule::from_config(&config.shift)?;
    info!(
        "Shift boundaries: day {} / night {}",
        schedule.day_start.format("%H:%M"),
        schedule.night_start.format("%H:%M")
    );

    let datasets = find_datasets(&config.io.input_dir);
    if datasets.is_empty() {
        error!("No CSV datasets found in {}", config.io.input_dir);
        return Ok(());
    }
    info!("Found {} dataset(s) to process", datasets.len());

    for (idx, path) in datasets.iter().enumerate() {
        info!("\n========================================");
        info!(
            "Processing dataset {}/{}: {}",
            idx + 1,
            datasets.len(),
            path.display()
        );
        info!("========================================\n");

        if let Err(e) = process_dataset(path, &config, &schedule) {
            error!("Failed to process {}: {:#}", path.display(), e);
        }
    }

    Ok(())
}
