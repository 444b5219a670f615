// src/pipeline/scheduler.rs
//
// Frame pacing for live capture. Frames that arrive while the pipeline is
// still paying off the cost of the previous one are dropped, never queued:
// only the newest frame is worth smoothing, and a backlog just adds latency.

use tracing::debug;

pub struct FramePacer {
    /// Exponential moving average of per-frame processing cost, seconds.
    avg_processing_secs: f64,
    last_accepted_ts: Option<f64>,
    frames_skipped: u64,
}

const EMA_ALPHA: f64 = 0.2;

impl FramePacer {
    pub fn new() -> Self {
        Self {
            avg_processing_secs: 0.0,
            last_accepted_ts: None,
            frames_skipped: 0,
        }
    }

    /// Should the frame stamped `timestamp` (stream seconds) be processed?
    ///
    /// Accepts whenever enough stream time has passed to cover the average
    /// processing cost of a frame; everything in between is skipped.
    pub fn should_process(&mut self, timestamp: f64) -> bool {
        let accept = match self.last_accepted_ts {
            None => true,
            Some(last) => timestamp - last >= self.avg_processing_secs,
        };

        if accept {
            self.last_accepted_ts = Some(timestamp);
        } else {
            self.frames_skipped += 1;
            debug!(
                "skipping frame at {:.3}s, pipeline budget {:.1}ms",
                timestamp,
                self.avg_processing_secs * 1000.0
            );
        }
        accept
    }

    /// Record how long the last accepted frame took end-to-end.
    pub fn record_processing(&mut self, secs: f64) {
        if self.avg_processing_secs == 0.0 {
            self.avg_processing_secs = secs;
        } else {
            self.avg_processing_secs =
                EMA_ALPHA * secs + (1.0 - EMA_ALPHA) * self.avg_processing_secs;
        }
    }

    pub fn frames_skipped(&self) -> u64 {
        self.frames_skipped
    }
}

impl Default for FramePacer {
    fn default() -> Self {
        Self::new()
    }
}
