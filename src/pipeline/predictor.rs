use std::collections::HashMap;
use std::path::Path;

use ndarray::{Array2, Ix2};
use ort::session::Session;
use ort::value::Tensor;

use super::{PipelineError, ProbabilityModel};
use crate::runtime::{create_session_builder, RuntimeConfig};

/// Element type the estimator's input tensor was exported with. Embedding
/// classifiers take floats; sequence models take integer token ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Float,
    Int64,
}

/// A probability classifier backed by an ONNX session.
///
/// The probability output is located by name at load time (a name containing
/// "prob" or "output" wins, else the last output), so exports from different
/// training stacks resolve the same way at inference time.
pub struct OnnxProbabilityModel {
    session: Session,
    input_name: String,
    output_index: usize,
    input_kind: InputKind,
}

impl OnnxProbabilityModel {
    pub fn load<P: AsRef<Path>>(
        path: P,
        input_kind: InputKind,
        config: &RuntimeConfig,
    ) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let session = create_session_builder(config)?
            .commit_from_file(path)
            .map_err(|e| {
                PipelineError::ModelError(format!("Failed to load model {:?}: {}", path, e))
            })?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        let output_index = session
            .outputs
            .iter()
            .position(|o| o.name.contains("prob") || o.name.contains("output"))
            .unwrap_or_else(|| session.outputs.len().saturating_sub(1));

        log::info!(
            "Probability model loaded from {:?} (input '{}', output #{})",
            path,
            input_name,
            output_index
        );

        Ok(Self {
            session,
            input_name,
            output_index,
            input_kind,
        })
    }

    fn run_float(&self, features: &Array2<f32>) -> Result<Array2<f32>, PipelineError> {
        let input_dyn = features.to_owned().into_dyn();
        let input = input_dyn.as_standard_layout();

        let mut input_tensors = HashMap::new();
        input_tensors.insert(
            self.input_name.as_str(),
            Tensor::from_array(&input).map_err(|e| {
                PipelineError::ModelError(format!("Failed to create input tensor: {}", e))
            })?,
        );

        let outputs = self
            .session
            .run(input_tensors)
            .map_err(|e| PipelineError::ModelError(format!("Failed to run model: {}", e)))?;
        self.extract_probs(&outputs)
    }

    fn run_int(&self, features: &Array2<f32>) -> Result<Array2<f32>, PipelineError> {
        let ids = features.mapv(|x| x as i64);
        let input_dyn = ids.into_dyn();
        let input = input_dyn.as_standard_layout();

        let mut input_tensors = HashMap::new();
        input_tensors.insert(
            self.input_name.as_str(),
            Tensor::from_array(&input).map_err(|e| {
                PipelineError::ModelError(format!("Failed to create input tensor: {}", e))
            })?,
        );

        let outputs = self
            .session
            .run(input_tensors)
            .map_err(|e| PipelineError::ModelError(format!("Failed to run model: {}", e)))?;
        self.extract_probs(&outputs)
    }

    fn extract_probs(
        &self,
        outputs: &ort::session::SessionOutputs,
    ) -> Result<Array2<f32>, PipelineError> {
        let view = outputs[self.output_index]
            .try_extract_tensor::<f32>()
            .map_err(|e| {
                PipelineError::ModelError(format!("Failed to extract probability tensor: {}", e))
            })?;

        match view.ndim() {
            2 => view
                .to_owned()
                .into_dimensionality::<Ix2>()
                .map_err(|e| PipelineError::ModelError(format!("Unexpected output shape: {}", e))),
            // Some exports emit a flat vector for a single row
            1 => {
                let row = view.to_owned();
                let len = row.len();
                Array2::from_shape_vec((1, len), row.into_iter().collect()).map_err(|e| {
                    PipelineError::ModelError(format!("Unexpected output shape: {}", e))
                })
            }
            n => Err(PipelineError::ModelError(format!(
                "Expected probability tensor of rank 1 or 2, got rank {}",
                n
            ))),
        }
    }
}

impl ProbabilityModel for OnnxProbabilityModel {
    fn predict_proba(&self, features: &Array2<f32>) -> Result<Array2<f32>, PipelineError> {
        if features.nrows() == 0 {
            return Err(PipelineError::ValidationError(
                "Empty feature batch".into(),
            ));
        }
        match self.input_kind {
            InputKind::Float => self.run_float(features),
            InputKind::Int64 => self.run_int(features),
        }
    }
}
