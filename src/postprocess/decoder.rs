// Grid decoder: turns the model's per-row-anchor class distribution into
// image-space lane points.
//
// Model output layout is [griding_num + 1, num_anchors, num_lanes]; the last
// class is the reserved "no lane" bin. One argmax per (lane, row anchor), so
// a candidate never carries two points on the same row.

use crate::config::{DetectionConfig, ModelConfig};
use crate::tensor::LaneTensor;
use crate::types::{LaneCandidate, Point};
use tracing::debug;

/// Numerically stable in-place softmax. A degenerate input (sum of
/// exponentials ≤ 0, e.g. all -inf) yields all zeros rather than NaN.
pub fn softmax(values: &mut [f32]) {
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut sum = 0.0f32;
    for v in values.iter_mut() {
        *v = (*v - max).exp();
        sum += *v;
    }
    if sum <= 0.0 || !sum.is_finite() {
        values.fill(0.0);
        return;
    }
    for v in values.iter_mut() {
        *v /= sum;
    }
}

/// Decode every lane channel of one frame's tensor into raw candidates.
///
/// Points come out in target-resolution coordinates. Absent detections just
/// produce short or empty candidates; there is no error path.
pub fn decode_lanes(
    tensor: &LaneTensor,
    model: &ModelConfig,
    detection: &DetectionConfig,
    target_width: f32,
    target_height: f32,
) -> Vec<LaneCandidate> {
    let scale_x = target_width / model.input_width as f32;
    let scale_y = target_height / model.input_height as f32;

    let mut candidates = Vec::with_capacity(model.num_lanes);

    for lane_idx in 0..model.num_lanes {
        let mut points = Vec::new();

        for anchor_idx in 0..model.num_anchors {
            let mut probs: Vec<f32> = tensor.class_scores(anchor_idx, lane_idx).to_vec();
            softmax(&mut probs);

            let (grid_idx, prob) = argmax(&probs);

            // Last class is "no lane at this row".
            if grid_idx == model.griding_num || prob <= detection.point_threshold {
                continue;
            }

            let x_native = grid_idx as f32 * model.input_width as f32 / model.griding_num as f32;
            let y_native = model.row_anchors[anchor_idx];
            points.push(Point::new(x_native * scale_x, y_native * scale_y));
        }

        debug!("lane channel {}: {} raw points", lane_idx, points.len());
        candidates.push(LaneCandidate { points, score: 0.0 });
    }

    candidates
}

fn argmax(values: &[f32]) -> (usize, f32) {
    let mut best_idx = 0;
    let mut best = f32::NEG_INFINITY;
    for (i, &v) in values.iter().enumerate() {
        if v > best {
            best = v;
            best_idx = i;
        }
    }
    (best_idx, best)
}
