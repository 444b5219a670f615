use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub model: ModelConfig,
    pub inference: InferenceConfig,
    pub detection: DetectionConfig,
    pub tracking: TrackingConfig,
    pub validation: ValidationConfig,
    pub video: VideoConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub path: String,
    pub input_width: usize,
    pub input_height: usize,
    /// Number of horizontal grid cells. The model emits `griding_num + 1`
    /// classes per row anchor; the extra last class means "no lane".
    pub griding_num: usize,
    pub num_anchors: usize,
    pub num_lanes: usize,
    /// Row-anchor y positions in the model's native resolution. Must have
    /// `num_anchors` entries.
    #[serde(default = "default_row_anchors")]
    pub row_anchors: Vec<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    pub use_cuda: bool,
    pub num_threads: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Minimum softmax probability for a grid argmax to become a point.
    pub point_threshold: f32,
    /// Minimum candidate score to survive selection.
    pub lane_confidence_threshold: f32,
    pub min_points_per_lane: usize,
    /// How many lanes the output carries (slot 0 = left, 1 = right, ...).
    pub expected_lanes: usize,
    /// Straightness scoring: x-variance at native resolution that maps to a
    /// straightness term of zero. Rescaled with the square of the
    /// target/native width ratio so scores are resolution-independent.
    pub x_variance_base: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// Frames of history kept per lane slot (FIFO, oldest evicted).
    pub max_history_frames: usize,
    /// Points within this many pixels of y are averaged together.
    pub y_merge_tolerance: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Lane-pair width band as fractions of target width.
    pub min_lane_width_ratio: f32,
    pub max_lane_width_ratio: f32,
    /// Reference row for width measurement, as a fraction of target height.
    pub reference_row_ratio: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoConfig {
    pub input_dir: String,
    pub output_dir: String,
    pub target_width: usize,
    pub target_height: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

/// TuSimple row anchors: y = 64, 68, ..., 284 at 288 native height.
fn default_row_anchors() -> Vec<f32> {
    (0..56).map(|i| 64.0 + 4.0 * i as f32).collect()
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())
            .with_context(|| format!("reading config {}", path.as_ref().display()))?;
        let config: Config = serde_yaml::from_str(&contents).context("parsing config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.model.num_lanes < self.detection.expected_lanes {
            bail!(
                "model emits {} lane channels but {} output lanes are expected",
                self.model.num_lanes,
                self.detection.expected_lanes
            );
        }
        if self.model.row_anchors.len() != self.model.num_anchors {
            bail!(
                "{} row anchors configured, model has {}",
                self.model.row_anchors.len(),
                self.model.num_anchors
            );
        }
        if self.validation.min_lane_width_ratio >= self.validation.max_lane_width_ratio {
            bail!("lane width band is empty");
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: ModelConfig {
                path: "models/ufld_tusimple.onnx".to_string(),
                input_width: 800,
                input_height: 288,
                griding_num: 100,
                num_anchors: 56,
                num_lanes: 4,
                row_anchors: default_row_anchors(),
            },
            inference: InferenceConfig {
                use_cuda: false,
                num_threads: 4,
            },
            detection: DetectionConfig {
                point_threshold: 0.2,
                lane_confidence_threshold: 0.7,
                min_points_per_lane: 5,
                expected_lanes: 2,
                x_variance_base: 10_000.0,
            },
            tracking: TrackingConfig {
                max_history_frames: 5,
                y_merge_tolerance: 2.0,
            },
            validation: ValidationConfig {
                min_lane_width_ratio: 0.15,
                max_lane_width_ratio: 0.5,
                reference_row_ratio: 0.75,
            },
            video: VideoConfig {
                input_dir: "./tensors".to_string(),
                output_dir: "./lanes_out".to_string(),
                target_width: 1280,
                target_height: 720,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}
