// src/inference.rs

use crate::config::Config;
use anyhow::{Context, Result};
use ort::{
    execution_providers::{CPUExecutionProvider, CUDAExecutionProvider},
    session::{builder::GraphOptimizationLevel, Session},
};
use tracing::{debug, info};

/// Boundary to the lane-detection model. Implementations take the
/// preprocessed CHW float buffer and return the flat class tensor.
///
/// The pipeline treats any `Err` as "no detections this frame"; nothing
/// downstream ever sees an inference error.
pub trait LaneInference {
    fn infer(&mut self, input: &[f32]) -> Result<Vec<f32>>;
}

/// ONNX Runtime backed engine.
pub struct OrtEngine {
    session: Session,
    config: Config,
}

impl OrtEngine {
    pub fn new(config: Config) -> Result<Self> {
        info!("Initializing inference engine");
        info!("Model path: {}", config.model.path);

        let mut session_builder = Session::builder()?;

        if config.inference.use_cuda {
            info!("Enabling CUDA execution provider");
            session_builder =
                session_builder.with_execution_providers([CUDAExecutionProvider::default()
                    .with_device_id(0)
                    .build()])?;
        } else {
            session_builder = session_builder
                .with_execution_providers([CPUExecutionProvider::default().build()])?;
        }

        let session = session_builder
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(config.inference.num_threads)?
            .with_inter_threads(1)?
            .commit_from_file(&config.model.path)
            .context("Failed to load model")?;

        info!("✓ Inference engine initialized");

        Ok(Self { session, config })
    }
}

impl LaneInference for OrtEngine {
    fn infer(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        let shape = [
            1,
            3,
            self.config.model.input_height,
            self.config.model.input_width,
        ];

        let input_value =
            ort::value::Value::from_array((shape.as_slice(), input.to_vec().into_boxed_slice()))?;

        let outputs = self.session.run(ort::inputs!["input" => input_value])?;

        let output = &outputs[0];
        let (output_shape, data_slice) = output.try_extract_tensor::<f32>()?;
        debug!("model output shape: {:?}", output_shape);

        Ok(data_slice.to_vec())
    }
}
