//! Lane overlay pipeline: turns the raw class-probability tensor of a
//! grid-based lane-detection model into stable, temporally-smoothed lane
//! curves ready for on-screen overlay.
//!
//! The per-frame flow is strictly sequential: grid decode → quality
//! scoring/selection → temporal smoothing over a bounded history → Bezier
//! curve refinement → lane-pair width validation. Only the temporal tracker
//! carries state across frames, and [`LanePipeline::reset`] clears it.

pub mod config;
pub mod inference;
pub mod pipeline;
pub mod postprocess;
pub mod preprocessing;
pub mod tensor;
pub mod types;

pub use config::Config;
pub use inference::{LaneInference, OrtEngine};
pub use pipeline::{FramePacer, LanePipeline, PipelineMetrics};
pub use tensor::LaneTensor;
pub use types::{Frame, LaneCandidate, Point, ValidatedLaneSet};
