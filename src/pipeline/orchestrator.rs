// src/pipeline/orchestrator.rs
//
// Owns the per-frame flow: decode → score/select → track → refine →
// validate. The only cross-frame state is the tracker's slot history, so
// everything here runs on one execution context and a reset can never
// interleave with a frame in flight.

use crate::config::Config;
use crate::inference::LaneInference;
use crate::pipeline::PipelineMetrics;
use crate::postprocess::{decode_lanes, refine_curve, select_lanes, validate_lanes, TemporalTracker};
use crate::preprocessing::prepare_input;
use crate::tensor::LaneTensor;
use crate::types::{Frame, ValidatedLaneSet};
use std::time::Instant;
use tracing::{debug, warn};

pub struct LanePipeline {
    config: Config,
    tracker: TemporalTracker,
    metrics: PipelineMetrics,
}

impl LanePipeline {
    pub fn new(config: Config) -> Self {
        let tracker = TemporalTracker::new(
            config.model.num_lanes,
            config.tracking.max_history_frames,
            config.tracking.y_merge_tolerance,
        );
        Self {
            config,
            tracker,
            metrics: PipelineMetrics::new(),
        }
    }

    /// Run one frame end-to-end through the inference engine and the
    /// postprocessing stages. An engine failure degrades to an empty lane
    /// set for this frame; the stream keeps going.
    pub fn process_frame(
        &mut self,
        frame: &Frame,
        engine: &mut dyn LaneInference,
    ) -> ValidatedLaneSet {
        let raw = prepare_input(frame, &self.config.model)
            .and_then(|input| engine.infer(&input));

        match raw {
            Ok(output) => self.process_output(output),
            Err(e) => {
                warn!("inference unavailable, emitting empty lane set: {e:#}");
                self.metrics.inc(&self.metrics.inference_failures);
                self.metrics.inc(&self.metrics.frames_processed);
                ValidatedLaneSet::empty(self.config.detection.expected_lanes)
            }
        }
    }

    /// Postprocess an already-produced flat model output for one frame.
    ///
    /// A tensor that doesn't match the configured shape is treated the same
    /// as a failed inference: log, count, emit empty, continue.
    pub fn process_output(&mut self, flat: Vec<f32>) -> ValidatedLaneSet {
        let model = &self.config.model;
        let tensor = match LaneTensor::from_flat(
            flat,
            model.griding_num + 1,
            model.num_anchors,
            model.num_lanes,
        ) {
            Ok(tensor) => tensor,
            Err(e) => {
                warn!("malformed model output, skipping frame: {e:#}");
                self.metrics.inc(&self.metrics.malformed_outputs);
                self.metrics.inc(&self.metrics.frames_processed);
                return ValidatedLaneSet::empty(self.config.detection.expected_lanes);
            }
        };

        let started = Instant::now();
        let target_w = self.config.video.target_width as f32;
        let target_h = self.config.video.target_height as f32;

        let candidates = decode_lanes(&tensor, model, &self.config.detection, target_w, target_h);
        let selected = select_lanes(candidates, model, &self.config.detection, target_w);
        let smoothed = self.tracker.advance(&selected);
        let refined: Vec<_> = smoothed.iter().map(|s| refine_curve(s)).collect();

        let result = validate_lanes(
            refined,
            &self.config.validation,
            self.config.detection.min_points_per_lane,
            self.config.detection.expected_lanes,
            target_w,
            target_h,
        );

        self.metrics.inc(&self.metrics.frames_processed);
        if !result.is_empty() {
            self.metrics.inc(&self.metrics.frames_with_lanes);
        }
        self.metrics.set_timing(
            &self.metrics.postprocess_time_us,
            started.elapsed().as_micros() as u64,
        );
        debug!("frame postprocessed in {:?}", started.elapsed());

        result
    }

    /// Clear tracker history, e.g. when detection is paused. The next frame
    /// is smoothed against a fresh window.
    pub fn reset(&mut self) {
        self.tracker.reset();
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;

    fn test_config() -> Config {
        let mut config = Config::default();
        // Keep target at native resolution so expected x positions are the
        // plain grid-to-pixel mapping.
        config.video.target_width = 800;
        config.video.target_height = 288;
        config
    }

    /// Flat [griding+1, anchors, lanes] logits with chosen grid cells boosted.
    fn tensor_with_lanes(config: &Config, picks: &[(usize, usize)]) -> Vec<f32> {
        let model = &config.model;
        let classes = model.griding_num + 1;
        let mut flat = vec![0.0f32; classes * model.num_anchors * model.num_lanes];
        for lane in 0..model.num_lanes {
            let picked = picks.iter().find(|(l, _)| *l == lane);
            for anchor in 0..model.num_anchors {
                let class = match picked {
                    Some(&(_, grid)) => grid,
                    None => model.griding_num, // "no lane"
                };
                flat[class * model.num_anchors * model.num_lanes
                    + anchor * model.num_lanes
                    + lane] = 10.0;
            }
        }
        flat
    }

    #[test]
    fn test_end_to_end_two_lane_scenario() {
        let config = test_config();
        let mut pipeline = LanePipeline::new(config.clone());

        // Channel 0 at grid 30 (x = 240), channel 2 at grid 70 (x = 560).
        let flat = tensor_with_lanes(&config, &[(0, 30), (2, 70)]);
        let result = pipeline.process_output(flat);

        assert_eq!(result.lanes.len(), 2);
        assert!(!result.lanes[0].is_empty());
        assert!(!result.lanes[1].is_empty());
        // Left-right ordering: slot 0 near 240, slot 1 near 560. The pair
        // width of 320px sits inside the [120, 400] band at 800px target.
        assert!(result.lanes[0].iter().all(|p| (p.x - 240.0).abs() < 1.0));
        assert!(result.lanes[1].iter().all(|p| (p.x - 560.0).abs() < 1.0));
        // Refinement densifies well beyond the 56 row anchors.
        assert!(result.lanes[0].len() > 56);
    }

    #[test]
    fn test_all_no_lane_gives_empty_set_every_frame() {
        let config = test_config();
        let mut pipeline = LanePipeline::new(config.clone());
        let flat = tensor_with_lanes(&config, &[]);
        for _ in 0..8 {
            let result = pipeline.process_output(flat.clone());
            assert!(result.is_empty());
            assert_eq!(result.lanes.len(), 2);
        }
    }

    #[test]
    fn test_malformed_tensor_degrades_to_empty() {
        let config = test_config();
        let mut pipeline = LanePipeline::new(config);
        let result = pipeline.process_output(vec![0.0; 17]);
        assert!(result.is_empty());
        assert_eq!(pipeline.metrics().summary().malformed_outputs, 1);
    }

    #[test]
    fn test_reset_forgets_previous_lanes() {
        let config = test_config();
        let mut pipeline = LanePipeline::new(config.clone());

        for _ in 0..5 {
            pipeline.process_output(tensor_with_lanes(&config, &[(0, 30), (2, 70)]));
        }
        pipeline.reset();

        // First post-reset frame with lanes in a different place smooths to
        // exactly that frame, with no pull from pre-reset history.
        let result = pipeline.process_output(tensor_with_lanes(&config, &[(0, 50), (2, 90)]));
        assert!(result.lanes[0].iter().all(|p| (p.x - 400.0).abs() < 1.0));
        assert!(result.lanes[1].iter().all(|p| (p.x - 720.0).abs() < 1.0));
    }

    #[test]
    fn test_smoothing_averages_across_frames() {
        let config = test_config();
        let mut pipeline = LanePipeline::new(config.clone());

        pipeline.process_output(tensor_with_lanes(&config, &[(0, 30), (2, 70)]));
        let result = pipeline.process_output(tensor_with_lanes(&config, &[(0, 32), (2, 70)]));

        // Grid 30 → 240, grid 32 → 256: the two-frame average is 248.
        assert!(result.lanes[0].iter().all(|p| (p.x - 248.0).abs() < 1.0));
    }

    struct FailingEngine;
    impl LaneInference for FailingEngine {
        fn infer(&mut self, _input: &[f32]) -> anyhow::Result<Vec<f32>> {
            bail!("engine not ready")
        }
    }

    struct CannedEngine(Vec<f32>);
    impl LaneInference for CannedEngine {
        fn infer(&mut self, _input: &[f32]) -> anyhow::Result<Vec<f32>> {
            Ok(self.0.clone())
        }
    }

    fn black_frame() -> Frame {
        Frame {
            data: vec![0; 64 * 48 * 3],
            width: 64,
            height: 48,
            timestamp: 0.0,
        }
    }

    #[test]
    fn test_inference_failure_degrades_to_empty() {
        let config = test_config();
        let mut pipeline = LanePipeline::new(config);
        let frame = black_frame();
        let result = pipeline.process_frame(&frame, &mut FailingEngine);
        assert!(result.is_empty());
        assert_eq!(pipeline.metrics().summary().inference_failures, 1);
    }

    #[test]
    fn test_process_frame_runs_full_path() {
        let config = test_config();
        let mut pipeline = LanePipeline::new(config.clone());
        let frame = black_frame();
        let mut engine = CannedEngine(tensor_with_lanes(&config, &[(0, 30), (2, 70)]));
        let result = pipeline.process_frame(&frame, &mut engine);
        assert!(!result.is_empty());
    }
}
