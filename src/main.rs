// src/main.rs
//
// Offline replay driver: walks a directory of raw model-output dumps
// (little-endian f32 `.bin` files, one frame each), runs them through the
// lane pipeline, and writes the validated lane set of every frame as JSON.
// Useful for tuning thresholds against recorded drives without a GPU.

use anyhow::{Context, Result};
use lane_overlay::{Config, LanePipeline};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use walkdir::WalkDir;

fn main() -> Result<()> {
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.yaml".to_string());
    let config = Config::load(&config_path)?;

    tracing_subscriber::fmt()
        .with_env_filter(format!("lane_overlay={},ort=warn", config.logging.level))
        .init();

    info!("🛣️  Lane overlay replay starting");
    info!("✓ Configuration loaded from {}", config_path);

    let dumps = find_tensor_dumps(&config.video.input_dir)?;
    if dumps.is_empty() {
        error!("No tensor dumps found in {}", config.video.input_dir);
        return Ok(());
    }
    info!("Found {} tensor dump(s) to replay", dumps.len());

    fs::create_dir_all(&config.video.output_dir)?;

    let output_dir = PathBuf::from(&config.video.output_dir);
    let mut pipeline = LanePipeline::new(config);

    for dump in &dumps {
        let flat = match read_tensor_dump(dump) {
            Ok(flat) => flat,
            Err(e) => {
                warn!("skipping {}: {e:#}", dump.display());
                continue;
            }
        };

        let lanes = pipeline.process_output(flat);

        let out_path = output_dir
            .join(dump.file_stem().unwrap_or_default())
            .with_extension("json");
        let json = serde_json::to_string_pretty(&lanes)?;
        fs::write(&out_path, json)
            .with_context(|| format!("writing {}", out_path.display()))?;
    }

    let summary = pipeline.metrics().summary();
    info!(
        "Replay finished: {} frames, {} with lanes, {} malformed ({:.1} fps)",
        summary.frames_processed, summary.frames_with_lanes, summary.malformed_outputs, summary.fps
    );

    Ok(())
}

/// Collect `*.bin` dumps under the input directory, sorted by name so frame
/// order follows the capture order.
fn find_tensor_dumps(input_dir: &str) -> Result<Vec<PathBuf>> {
    let mut dumps = Vec::new();
    for entry in WalkDir::new(input_dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("bin") {
            dumps.push(path.to_path_buf());
        }
    }
    dumps.sort();
    Ok(dumps)
}

fn read_tensor_dump(path: &Path) -> Result<Vec<f32>> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    anyhow::ensure!(
        bytes.len() % 4 == 0,
        "dump length {} is not a multiple of 4",
        bytes.len()
    );
    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}
