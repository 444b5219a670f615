use anyhow::{Context, Result};
use ndarray::{s, Array3, ArrayView1};

/// Dense `[classes, row_anchors, lanes]` tensor as returned by the
/// inference engine, with the batch dimension already stripped.
///
/// Construction is the single place where the MalformedTensor case is
/// caught: a flat buffer whose length does not match the expected shape
/// never reaches the decoder.
#[derive(Debug, Clone)]
pub struct LaneTensor {
    data: Array3<f32>,
}

impl LaneTensor {
    pub fn from_flat(
        flat: Vec<f32>,
        classes: usize,
        anchors: usize,
        lanes: usize,
    ) -> Result<Self> {
        let data = Array3::from_shape_vec((classes, anchors, lanes), flat)
            .with_context(|| {
                format!("model output does not match [{classes}, {anchors}, {lanes}]")
            })?;
        Ok(Self { data })
    }

    /// Class-probability logits for one (row anchor, lane) cell.
    pub fn class_scores(&self, anchor: usize, lane: usize) -> ArrayView1<'_, f32> {
        self.data.slice(s![.., anchor, lane])
    }

    pub fn classes(&self) -> usize {
        self.data.shape()[0]
    }

    pub fn anchors(&self) -> usize {
        self.data.shape()[1]
    }

    pub fn lanes(&self) -> usize {
        self.data.shape()[2]
    }
}
