use std::collections::HashMap;

use ndarray::{s, Array1, Array2};
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::{Tokenizer, TruncationParams};

use super::{FeatureExtractor, PipelineError};
use crate::runtime::{create_session_builder, RuntimeConfig};

/// Serving-time token budget for the pretrained encoder. Longer inputs are
/// truncated by the tokenizer itself, which keeps the trailing separator
/// token in place, matching the training-time contract of the downstream
/// classifier.
pub const MAX_ENCODER_TOKENS: usize = 128;

/// Pooled-embedding feature extractor.
///
/// Tokenizes input text into sub-word ids, runs the pretrained encoder in
/// inference-only mode, and takes the first output position's hidden vector
/// as the feature representation. Deterministic given identical text and
/// identical weights.
///
/// The encoder model is expected to:
/// - Accept two inputs: input_ids and attention_mask (both shape [batch_size, sequence_length])
/// - Output hidden states of shape [batch_size, sequence_length, embedding_size]
pub struct ClsEncoder {
    tokenizer: Tokenizer,
    session: Session,
}

impl ClsEncoder {
    pub fn load(
        model_path: &str,
        tokenizer_path: &str,
        config: &RuntimeConfig,
    ) -> Result<Self, PipelineError> {
        let mut tokenizer = Tokenizer::from_file(tokenizer_path).map_err(|e| {
            PipelineError::TokenizerError(format!("Failed to load tokenizer: {}", e))
        })?;
        configure_truncation(&mut tokenizer, MAX_ENCODER_TOKENS)?;
        log::info!("Encoder tokenizer loaded from {}", tokenizer_path);

        let session = create_session_builder(config)?.commit_from_file(model_path)?;
        Self::validate_encoder(&session)?;
        log::info!("Encoder model loaded and validated from {}", model_path);

        Ok(Self { tokenizer, session })
    }

    /// Checks that the model has the input/output structure of a transformer
    /// encoder before any inference runs.
    fn validate_encoder(session: &Session) -> Result<(), PipelineError> {
        let inputs = &session.inputs;
        if inputs.len() < 2 {
            return Err(PipelineError::ModelError(format!(
                "Encoder must have at least 2 inputs (input_ids and attention_mask), found {}",
                inputs.len()
            )));
        }

        let outputs = &session.outputs;
        if outputs.is_empty() {
            return Err(PipelineError::ModelError(
                "Encoder must have at least 1 output for hidden states".to_string(),
            ));
        }

        Ok(())
    }

    /// Converts text into token IDs. Truncation to the serving budget happens
    /// inside the tokenizer, so special tokens survive it.
    fn tokenize(&self, text: &str) -> Result<Vec<u32>, PipelineError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| PipelineError::TokenizerError(e.to_string()))?;
        let token_ids: Vec<u32> = encoding.get_ids().to_vec();

        if token_ids.is_empty() {
            return Err(PipelineError::ValidationError(
                "Input text produced no tokens".into(),
            ));
        }

        Ok(token_ids)
    }

    /// Runs the encoder and returns the first token's hidden vector.
    ///
    /// Input format: input_ids and attention_mask [1, sequence_length].
    /// Output format: [1, sequence_length, embedding_size]; position [0,0,:]
    /// is the pooled representation.
    fn embed(&self, tokens: &[u32]) -> Result<Array1<f32>, PipelineError> {
        let input_array = Array2::from_shape_vec(
            (1, tokens.len()),
            tokens.iter().map(|&x| x as i64).collect(),
        )
        .map_err(|e| PipelineError::ModelError(format!("Failed to create input array: {}", e)))?;
        let input_dyn = input_array.into_dyn();
        let input_ids = input_dyn.as_standard_layout();

        let mask_array = Array2::from_shape_vec(
            (1, tokens.len()),
            tokens.iter().map(|&x| if x == 0 { 0i64 } else { 1i64 }).collect(),
        )
        .map_err(|e| PipelineError::ModelError(format!("Failed to create mask array: {}", e)))?;
        let mask_dyn = mask_array.into_dyn();
        let attention_mask = mask_dyn.as_standard_layout();

        let mut input_tensors = HashMap::new();
        input_tensors.insert(
            "input_ids",
            Tensor::from_array(&input_ids).map_err(|e| {
                PipelineError::ModelError(format!("Failed to create input tensor: {}", e))
            })?,
        );
        input_tensors.insert(
            "attention_mask",
            Tensor::from_array(&attention_mask).map_err(|e| {
                PipelineError::ModelError(format!("Failed to create mask tensor: {}", e))
            })?,
        );

        let outputs = self
            .session
            .run(input_tensors)
            .map_err(|e| PipelineError::ModelError(format!("Failed to run encoder: {}", e)))?;
        let output_tensor = outputs[0].try_extract_tensor::<f32>().map_err(|e| {
            PipelineError::ModelError(format!("Failed to extract output tensor: {}", e))
        })?;

        if output_tensor.ndim() != 3 {
            return Err(PipelineError::ModelError(format!(
                "Expected encoder output of rank 3, got rank {}",
                output_tensor.ndim()
            )));
        }

        let embedding_slice = output_tensor.slice(s![0, 0, ..]);
        Ok(Array1::from_iter(embedding_slice.iter().cloned()))
    }
}

fn configure_truncation(
    tokenizer: &mut Tokenizer,
    max_tokens: usize,
) -> Result<(), PipelineError> {
    let params = TruncationParams {
        max_length: max_tokens,
        ..TruncationParams::default()
    };
    tokenizer.with_truncation(Some(params)).map_err(|e| {
        PipelineError::TokenizerError(format!("Failed to configure truncation: {}", e))
    })?;
    Ok(())
}

impl FeatureExtractor for ClsEncoder {
    fn extract(&self, texts: &[String]) -> Result<Array2<f32>, PipelineError> {
        let mut flat: Vec<f32> = Vec::new();
        let mut width = 0usize;

        for text in texts {
            let tokens = self.tokenize(text)?;
            let embedding = self.embed(&tokens)?;
            if width == 0 {
                width = embedding.len();
            } else if embedding.len() != width {
                return Err(PipelineError::ModelError(format!(
                    "Inconsistent embedding widths: {} vs {}",
                    width,
                    embedding.len()
                )));
            }
            flat.extend(embedding.iter());
        }

        Array2::from_shape_vec((texts.len(), width), flat)
            .map_err(|e| PipelineError::ModelError(format!("Failed to stack embeddings: {}", e)))
    }
}
