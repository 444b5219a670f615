// src/preprocessing.rs

use crate::config::ModelConfig;
use crate::types::Frame;
use anyhow::{ensure, Result};

// ImageNet statistics, matching the model's training pipeline.
const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Resize an RGB frame to the model's native resolution and normalize into
/// a CHW float buffer, in one pass per channel.
pub fn prepare_input(frame: &Frame, model: &ModelConfig) -> Result<Vec<f32>> {
    ensure!(
        frame.data.len() == frame.width * frame.height * 3,
        "frame buffer is {} bytes, expected {}x{} RGB",
        frame.data.len(),
        frame.width,
        frame.height
    );

    let (dst_w, dst_h) = (model.input_width, model.input_height);
    let x_ratio = frame.width as f32 / dst_w as f32;
    let y_ratio = frame.height as f32 / dst_h as f32;

    let mut input = vec![0.0f32; 3 * dst_h * dst_w];

    for dy in 0..dst_h {
        let sy = dy as f32 * y_ratio;
        let sy0 = sy.floor() as usize;
        let sy1 = (sy0 + 1).min(frame.height - 1);
        let fy = sy - sy0 as f32;

        for dx in 0..dst_w {
            let sx = dx as f32 * x_ratio;
            let sx0 = sx.floor() as usize;
            let sx1 = (sx0 + 1).min(frame.width - 1);
            let fx = sx - sx0 as f32;

            for c in 0..3 {
                let sample = bilinear(frame, sx0, sx1, sy0, sy1, fx, fy, c);
                let normalized = (sample / 255.0 - MEAN[c]) / STD[c];
                input[c * dst_h * dst_w + dy * dst_w + dx] = normalized;
            }
        }
    }

    Ok(input)
}

#[allow(clippy::too_many_arguments)]
#[inline]
fn bilinear(
    frame: &Frame,
    sx0: usize,
    sx1: usize,
    sy0: usize,
    sy1: usize,
    fx: f32,
    fy: f32,
    c: usize,
) -> f32 {
    let at = |x: usize, y: usize| frame.data[(y * frame.width + x) * 3 + c] as f32;

    at(sx0, sy0) * (1.0 - fx) * (1.0 - fy)
        + at(sx1, sy0) * fx * (1.0 - fy)
        + at(sx0, sy1) * (1.0 - fx) * fy
        + at(sx1, sy1) * fx * fy
}
