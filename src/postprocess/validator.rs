// Geometric plausibility check: of all adjacent lane pairs, keep the one
// whose width at a reference row looks most like a real lane.

use crate::config::ValidationConfig;
use crate::types::{Point, ValidatedLaneSet};
use tracing::debug;

/// Pick the best-fitting adjacent lane pair and assign it to output slots
/// (0 = left, 1 = right). Falls back to the densest curves, left to right,
/// when no pair's width lands inside the configured band.
pub fn validate_lanes(
    curves: Vec<Vec<Point>>,
    validation: &ValidationConfig,
    min_points: usize,
    expected_lanes: usize,
    target_width: f32,
    target_height: f32,
) -> ValidatedLaneSet {
    let mut result = ValidatedLaneSet::empty(expected_lanes);

    let mut usable: Vec<&Vec<Point>> =
        curves.iter().filter(|c| c.len() >= min_points).collect();

    if usable.len() < 2 {
        // Nothing to pair; pass the single valid curve through, if any.
        if let (Some(curve), Some(slot)) = (usable.first(), result.lanes.first_mut()) {
            *slot = (*curve).clone();
        }
        return result;
    }

    // Mean x stands in for left-to-right ordering.
    usable.sort_by(|a, b| {
        mean_x(a)
            .partial_cmp(&mean_x(b))
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let min_width = validation.min_lane_width_ratio * target_width;
    let max_width = validation.max_lane_width_ratio * target_width;
    let ideal_width = (min_width + max_width) / 2.0;
    let ref_y = validation.reference_row_ratio * target_height;

    let mut best_pair: Option<(usize, f32)> = None;
    for i in 0..usable.len() - 1 {
        // A curve that doesn't reach the reference row can't be compared.
        let (Some(left_x), Some(right_x)) = (
            interpolate_x_at(usable[i], ref_y),
            interpolate_x_at(usable[i + 1], ref_y),
        ) else {
            continue;
        };

        let width = right_x - left_x;
        if width < min_width || width > max_width {
            continue;
        }

        let deviation = (width - ideal_width).abs();
        if best_pair.map_or(true, |(_, best)| deviation < best) {
            best_pair = Some((i, deviation));
        }
    }

    match best_pair {
        Some((i, _)) => {
            if let Some(slot) = result.lanes.get_mut(0) {
                *slot = usable[i].clone();
            }
            if let Some(slot) = result.lanes.get_mut(1) {
                *slot = usable[i + 1].clone();
            }
        }
        None => {
            debug!("no lane pair inside width band, falling back to densest curves");
            // Densest first, then re-ordered left to right into the slots.
            usable.sort_by(|a, b| b.len().cmp(&a.len()));
            let mut kept: Vec<&Vec<Point>> =
                usable.into_iter().take(expected_lanes).collect();
            kept.sort_by(|a, b| {
                mean_x(a)
                    .partial_cmp(&mean_x(b))
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            for (slot, curve) in result.lanes.iter_mut().zip(kept) {
                *slot = curve.clone();
            }
        }
    }

    result
}

/// Linear interpolation of the curve's x at `target_y`. The curve must be
/// sorted ascending in y; `None` when `target_y` is outside its y-range.
fn interpolate_x_at(curve: &[Point], target_y: f32) -> Option<f32> {
    let first = curve.first()?;
    let last = curve.last()?;
    if target_y < first.y || target_y > last.y {
        return None;
    }

    for pair in curve.windows(2) {
        let (p0, p1) = (pair[0], pair[1]);
        if p0.y <= target_y && target_y <= p1.y {
            let dy = p1.y - p0.y;
            if dy.abs() < f32::EPSILON {
                return Some(p0.x);
            }
            let t = (target_y - p0.y) / dy;
            return Some(p0.x + t * (p1.x - p0.x));
        }
    }

    None
}

fn mean_x(curve: &[Point]) -> f32 {
    if curve.is_empty() {
        return 0.0;
    }
    curve.iter().map(|p| p.x).sum::<f32>() / curve.len() as f32
}
