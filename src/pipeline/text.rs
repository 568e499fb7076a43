use ndarray::Array2;

use super::ranker::{RankedPrediction, ResultRanker};
use super::{FeatureExtractor, PipelineError, ProbabilityModel};

// A well-formed distribution sums to ~1; anything further off than this gets
// logged as a broken upstream export.
const DISTRIBUTION_TOLERANCE: f32 = 1e-3;

/// End-to-end text classification: feature extraction, probability scoring,
/// top-K ranking. Stateless per call; safe to share behind an `Arc`.
pub struct TextPipeline {
    extractor: Box<dyn FeatureExtractor>,
    model: Box<dyn ProbabilityModel>,
    ranker: ResultRanker,
}

impl TextPipeline {
    pub fn new(
        extractor: Box<dyn FeatureExtractor>,
        model: Box<dyn ProbabilityModel>,
        ranker: ResultRanker,
    ) -> Self {
        Self {
            extractor,
            model,
            ranker,
        }
    }

    /// Classifies a batch of texts, returning the concatenation of per-input
    /// top-K blocks in input order. Either every input ranks or the whole
    /// call fails; there are no partial results.
    pub fn classify(&self, texts: &[String]) -> Result<Vec<RankedPrediction>, PipelineError> {
        if texts.is_empty() {
            return Err(PipelineError::ValidationError(
                "Input batch cannot be empty".into(),
            ));
        }
        if let Some(pos) = texts.iter().position(|t| t.trim().is_empty()) {
            return Err(PipelineError::ValidationError(format!(
                "Input text {} cannot be empty",
                pos + 1
            )));
        }

        let features = self.extractor.extract(texts)?;
        let probs = self.model.predict_proba(&features)?;

        if probs.nrows() != texts.len() {
            return Err(PipelineError::PredictionError(format!(
                "Model returned {} rows for {} inputs",
                probs.nrows(),
                texts.len()
            )));
        }
        Self::check_distributions(&probs);

        let mut results = Vec::with_capacity(texts.len() * crate::pipeline::ranker::TOP_K);
        for row in probs.outer_iter() {
            results.extend(self.ranker.rank(row));
        }
        Ok(results)
    }

    fn check_distributions(probs: &Array2<f32>) {
        for (i, row) in probs.outer_iter().enumerate() {
            let sum: f32 = row.sum();
            if (sum - 1.0).abs() > DISTRIBUTION_TOLERANCE {
                log::warn!(
                    "Probability row {} sums to {:.4}, expected ~1.0; check the exported model",
                    i,
                    sum
                );
            }
        }
    }
}
