// src/pipeline/metrics.rs
//
// Per-run observability for the lane pipeline. Counters are atomic so a
// monitoring thread can snapshot them while the pipeline runs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct PipelineMetrics {
    pub frames_processed: Arc<AtomicU64>,
    pub frames_with_lanes: Arc<AtomicU64>,
    pub frames_dropped: Arc<AtomicU64>,
    pub inference_failures: Arc<AtomicU64>,
    pub malformed_outputs: Arc<AtomicU64>,
    pub postprocess_time_us: Arc<AtomicU64>,
    pub started_at: Instant,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            frames_processed: Arc::new(AtomicU64::new(0)),
            frames_with_lanes: Arc::new(AtomicU64::new(0)),
            frames_dropped: Arc::new(AtomicU64::new(0)),
            inference_failures: Arc::new(AtomicU64::new(0)),
            malformed_outputs: Arc::new(AtomicU64::new(0)),
            postprocess_time_us: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }

    pub fn inc(&self, counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_timing(&self, counter: &AtomicU64, duration_us: u64) {
        counter.store(duration_us, Ordering::Relaxed);
    }

    pub fn fps(&self) -> f64 {
        let frames = self.frames_processed.load(Ordering::Relaxed);
        let elapsed = self.started_at.elapsed().as_secs_f64();
        if elapsed > 0.01 {
            frames as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            frames_processed: self.frames_processed.load(Ordering::Relaxed),
            frames_with_lanes: self.frames_with_lanes.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            inference_failures: self.inference_failures.load(Ordering::Relaxed),
            malformed_outputs: self.malformed_outputs.load(Ordering::Relaxed),
            last_postprocess_us: self.postprocess_time_us.load(Ordering::Relaxed),
            fps: self.fps(),
            elapsed_secs: self.started_at.elapsed().as_secs_f64(),
        }
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricsSummary {
    pub frames_processed: u64,
    pub frames_with_lanes: u64,
    pub frames_dropped: u64,
    pub inference_failures: u64,
    pub malformed_outputs: u64,
    pub last_postprocess_us: u64,
    pub fps: f64,
    pub elapsed_secs: f64,
}
