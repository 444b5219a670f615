// Lane quality scoring and top-K selection.
//
// Score blends point count (capped at 15) and straightness (inverse of
// x-variance). The variance cutoff is defined at the model's native width
// and rescaled by the square of the target/native ratio, so the same lane
// scores the same at 400px and 1600px output.

use crate::config::{DetectionConfig, ModelConfig};
use crate::types::LaneCandidate;
use tracing::debug;

const POINT_COUNT_WEIGHT: f32 = 0.4;
const STRAIGHTNESS_WEIGHT: f32 = 0.6;
const FULL_SCORE_POINT_COUNT: f32 = 15.0;

pub fn score_candidate(
    candidate: &LaneCandidate,
    detection: &DetectionConfig,
    variance_threshold: f32,
) -> f32 {
    if candidate.points.len() < detection.min_points_per_lane {
        return 0.0;
    }

    let count_term = (candidate.points.len() as f32 / FULL_SCORE_POINT_COUNT).min(1.0);
    let straightness_term = 1.0 - (x_variance(candidate) / variance_threshold).min(1.0);

    POINT_COUNT_WEIGHT * count_term + STRAIGHTNESS_WEIGHT * straightness_term
}

/// Score all candidates and keep the best `expected_lanes` that clear the
/// confidence threshold.
///
/// The result always has `num_lanes` slots; slot i holds the i-th ranked
/// surviving candidate and everything past the cut is an empty candidate.
/// Ties keep the model's channel order (stable sort).
pub fn select_lanes(
    mut candidates: Vec<LaneCandidate>,
    model: &ModelConfig,
    detection: &DetectionConfig,
    target_width: f32,
) -> Vec<LaneCandidate> {
    let ratio = target_width / model.input_width as f32;
    let variance_threshold = detection.x_variance_base * ratio * ratio;

    for candidate in candidates.iter_mut() {
        candidate.score = score_candidate(candidate, detection, variance_threshold);
    }

    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut selected = vec![LaneCandidate::default(); model.num_lanes];
    let mut kept = 0;
    for candidate in candidates {
        if kept == detection.expected_lanes {
            break;
        }
        if candidate.score < detection.lane_confidence_threshold {
            break;
        }
        selected[kept] = candidate;
        kept += 1;
    }

    debug!("selected {} of {} lane channels", kept, model.num_lanes);
    selected
}

/// Population variance of the candidate's x coordinates.
fn x_variance(candidate: &LaneCandidate) -> f32 {
    let n = candidate.points.len() as f32;
    let mean = candidate.points.iter().map(|p| p.x).sum::<f32>() / n;
    candidate
        .points
        .iter()
        .map(|p| (p.x - mean) * (p.x - mean))
        .sum::<f32>()
        / n
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::types::Point;

    fn vertical_lane(x: f32, n: usize) -> LaneCandidate {
        LaneCandidate {
            points: (0..n).map(|i| Point::new(x, 100.0 + i as f32 * 10.0)).collect(),
            score: 0.0,
        }
    }

    #[test]
    fn test_too_few_points_scores_zero() {
        let config = Config::default();
        let lane = vertical_lane(100.0, 4);
        assert_eq!(score_candidate(&lane, &config.detection, 10_000.0), 0.0);
    }

    #[test]
    fn test_straight_dense_lane_scores_one() {
        let config = Config::default();
        let lane = vertical_lane(100.0, 20);
        let score = score_candidate(&lane, &config.detection, 10_000.0);
        assert!((score - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_high_variance_drops_straightness_term() {
        let config = Config::default();
        let mut lane = vertical_lane(100.0, 20);
        for (i, p) in lane.points.iter_mut().enumerate() {
            p.x = if i % 2 == 0 { 0.0 } else { 600.0 };
        }
        let score = score_candidate(&lane, &config.detection, 10_000.0);
        // Straightness term saturates at zero; only the count term remains.
        assert!((score - POINT_COUNT_WEIGHT).abs() < 1e-5);
    }

    #[test]
    fn test_selection_keeps_top_ranked_in_order() {
        let config = Config::default();
        let candidates = vec![
            vertical_lane(500.0, 8),  // decent
            LaneCandidate::default(), // empty
            vertical_lane(200.0, 20), // best
            vertical_lane(700.0, 3),  // below min points
        ];
        let selected = select_lanes(candidates, &config.model, &config.detection, 800.0);
        assert_eq!(selected.len(), 4);
        // Rank 0 is the 20-point lane, rank 1 the 8-point lane.
        assert_eq!(selected[0].points.len(), 20);
        assert_eq!(selected[1].points.len(), 8);
        assert!(selected[2].is_empty());
        assert!(selected[3].is_empty());
    }

    #[test]
    fn test_selection_drops_below_threshold() {
        let mut config = Config::default();
        config.detection.lane_confidence_threshold = 0.99;
        let candidates = vec![vertical_lane(500.0, 8), vertical_lane(200.0, 8)];
        let selected = select_lanes(candidates, &config.model, &config.detection, 800.0);
        // 8 points caps the count term below 0.99.
        assert!(selected.iter().all(|c| c.is_empty()));
    }

    #[test]
    fn test_selection_caps_at_expected_lanes() {
        let config = Config::default();
        let candidates = vec![
            vertical_lane(100.0, 20),
            vertical_lane(300.0, 20),
            vertical_lane(500.0, 20),
            vertical_lane(700.0, 20),
        ];
        let selected = select_lanes(candidates, &config.model, &config.detection, 800.0);
        let kept = selected.iter().filter(|c| !c.is_empty()).count();
        assert_eq!(kept, config.detection.expected_lanes);
    }
}
