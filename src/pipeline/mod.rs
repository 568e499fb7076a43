//! Inference pipeline building blocks: feature extraction, probability
//! models, and result ranking.

pub mod embedding;
pub mod predictor;
pub mod ranker;
pub mod sequence;
pub mod tabular;
pub mod text;

use ndarray::Array2;
use ort::Error as OrtError;
use std::fmt;

/// Represents the different types of errors that can occur while running an
/// inference pipeline.
#[derive(Debug)]
pub enum PipelineError {
    /// Error occurred while loading or using a tokenizer or vocabulary
    TokenizerError(String),
    /// Error occurred while loading or running an ONNX model
    ModelError(String),
    /// Error occurred while making predictions
    PredictionError(String),
    /// Error occurred due to invalid input parameters
    ValidationError(String),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TokenizerError(msg) => write!(f, "Tokenizer error: {}", msg),
            Self::ModelError(msg) => write!(f, "Model error: {}", msg),
            Self::PredictionError(msg) => write!(f, "Prediction error: {}", msg),
            Self::ValidationError(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<OrtError> for PipelineError {
    fn from(err: OrtError) -> Self {
        PipelineError::ModelError(err.to_string())
    }
}

/// Turns raw text into the fixed-width numeric representation a model was
/// trained against. One row per input text.
pub trait FeatureExtractor: Send + Sync {
    fn extract(&self, texts: &[String]) -> Result<Array2<f32>, PipelineError>;
}

/// Scores feature rows into a class-probability matrix: rows = input items,
/// columns = classes, each row summing to ~1.0.
pub trait ProbabilityModel: Send + Sync {
    fn predict_proba(&self, features: &Array2<f32>) -> Result<Array2<f32>, PipelineError>;
}
