// Cross-frame temporal smoothing.
//
// Each lane slot owns a bounded FIFO of the point sets selected for it over
// the last `max_history_frames` frames. Smoothing averages x across history
// for points sharing (within tolerance) the same row, which damps the
// per-frame jitter of the grid argmax without lagging more than the window.

use crate::types::{LaneCandidate, Point};
use std::collections::VecDeque;
use tracing::debug;

pub struct TemporalTracker {
    slots: Vec<VecDeque<Vec<Point>>>,
    max_history: usize,
    y_tolerance: f32,
}

impl TemporalTracker {
    pub fn new(num_lanes: usize, max_history: usize, y_tolerance: f32) -> Self {
        Self {
            slots: (0..num_lanes)
                .map(|_| VecDeque::with_capacity(max_history))
                .collect(),
            max_history,
            y_tolerance,
        }
    }

    /// Fold one frame's selected candidates into the history and return the
    /// smoothed point sequence per slot, ascending in y.
    ///
    /// `frame_lanes` must be the fixed-size slot array from selection; an
    /// empty candidate still advances its slot so stale frames age out.
    pub fn advance(&mut self, frame_lanes: &[LaneCandidate]) -> Vec<Vec<Point>> {
        debug_assert_eq!(frame_lanes.len(), self.slots.len());

        for (slot, candidate) in self.slots.iter_mut().zip(frame_lanes) {
            slot.push_back(candidate.points.clone());
            if slot.len() > self.max_history {
                slot.pop_front();
            }
        }

        self.slots
            .iter()
            .map(|slot| smooth_history(slot, self.y_tolerance))
            .collect()
    }

    /// Drop all history, e.g. when detection is toggled off. The next frame
    /// starts from a clean window.
    pub fn reset(&mut self) {
        for slot in self.slots.iter_mut() {
            slot.clear();
        }
        debug!("tracker history cleared");
    }

    #[cfg(test)]
    fn history_len(&self, slot: usize) -> usize {
        self.slots[slot].len()
    }
}

/// Average x over all historical points that fall on (approximately) the
/// same row. Cluster rows are keyed by the first y seen for that row.
fn smooth_history(history: &VecDeque<Vec<Point>>, y_tolerance: f32) -> Vec<Point> {
    struct Row {
        y: f32,
        sum_x: f32,
        count: u32,
    }

    let mut rows: Vec<Row> = Vec::new();

    for frame in history {
        for point in frame {
            match rows
                .iter_mut()
                .find(|r| (r.y - point.y).abs() <= y_tolerance)
            {
                Some(row) => {
                    row.sum_x += point.x;
                    row.count += 1;
                }
                None => rows.push(Row {
                    y: point.y,
                    sum_x: point.x,
                    count: 1,
                }),
            }
        }
    }

    let mut smoothed: Vec<Point> = rows
        .iter()
        .map(|r| Point::new(r.sum_x / r.count as f32, r.y))
        .collect();
    smoothed.sort_by(|a, b| a.y.partial_cmp(&b.y).unwrap_or(std::cmp::Ordering::Equal));
    smoothed
}
