use std::collections::HashMap;

use ndarray::Array2;

use super::{FeatureExtractor, PipelineError};

/// Fixed sequence length for the title model. Shorter inputs are zero-padded
/// at the front, longer ones keep their trailing tokens, matching the padding
/// utility the model was trained with.
pub const MAX_SEQUENCE_LENGTH: usize = 50;

// Characters stripped during text normalization before vocabulary lookup,
// matching the fitted tokenizer's filter set.
const FILTER_CHARS: &str = "!\"#$%&()*+,-./:;<=>?@[\\]^_`{|}~\t\n";

/// Vocabulary-based feature extractor for the sequence model.
///
/// Maps text to word-index sequences using a fitted vocabulary, then
/// pre-pads/pre-truncates every sequence to [`MAX_SEQUENCE_LENGTH`]. Words
/// outside the vocabulary are skipped. Index 0 is reserved for padding and
/// never appears in the vocabulary.
///
/// Indices travel through the f32 feature rows before the model casts them
/// back to integers, so they must stay below 2^24 to round-trip exactly.
/// Fitted vocabularies are orders of magnitude smaller than that.
pub struct SequenceVectorizer {
    vocab: HashMap<String, u32>,
    max_len: usize,
}

impl SequenceVectorizer {
    pub fn new(vocab: HashMap<String, u32>) -> Self {
        Self {
            vocab,
            max_len: MAX_SEQUENCE_LENGTH,
        }
    }

    pub fn vocab_size(&self) -> usize {
        self.vocab.len()
    }

    /// Lowercases, strips filter characters, and splits on whitespace.
    fn normalize(text: &str) -> Vec<String> {
        text.to_lowercase()
            .chars()
            .map(|c| if FILTER_CHARS.contains(c) { ' ' } else { c })
            .collect::<String>()
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }

    /// Converts one text into its vocabulary-index sequence. Unknown words
    /// are dropped rather than mapped to a sentinel.
    pub fn text_to_sequence(&self, text: &str) -> Vec<u32> {
        Self::normalize(text)
            .iter()
            .filter_map(|word| self.vocab.get(word).copied())
            .collect()
    }

    /// Pre-padding and pre-truncation to `max_len`: shorter sequences get
    /// zeros at the start, longer ones keep their last `max_len` entries.
    pub fn pad(sequence: &[u32], max_len: usize) -> Vec<u32> {
        if sequence.len() >= max_len {
            sequence[sequence.len() - max_len..].to_vec()
        } else {
            let mut padded = vec![0u32; max_len - sequence.len()];
            padded.extend_from_slice(sequence);
            padded
        }
    }
}

impl FeatureExtractor for SequenceVectorizer {
    fn extract(&self, texts: &[String]) -> Result<Array2<f32>, PipelineError> {
        let mut flat: Vec<f32> = Vec::with_capacity(texts.len() * self.max_len);
        for text in texts {
            let sequence = self.text_to_sequence(text);
            let padded = Self::pad(&sequence, self.max_len);
            debug_assert!(
                padded.iter().all(|&id| id < (1 << 24)),
                "vocabulary index exceeds exact f32 range"
            );
            flat.extend(padded.iter().map(|&id| id as f32));
        }

        Array2::from_shape_vec((texts.len(), self.max_len), flat)
            .map_err(|e| PipelineError::ModelError(format!("Failed to build sequence batch: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vectorizer() -> SequenceVectorizer {
        let mut vocab = HashMap::new();
        vocab.insert("software".to_string(), 1);
        vocab.insert("engineer".to_string(), 2);
        vocab.insert("backend".to_string(), 3);
        SequenceVectorizer::new(vocab)
    }

    #[test]
    fn test_normalization_strips_punctuation_and_case() {
        let v = vectorizer();
        assert_eq!(v.text_to_sequence("Software, ENGINEER!"), vec![1, 2]);
    }

    #[test]
    fn test_unknown_words_skipped() {
        let v = vectorizer();
        assert_eq!(v.text_to_sequence("senior software wizard"), vec![1]);
    }

    #[test]
    fn test_pre_padding() {
        let padded = SequenceVectorizer::pad(&[1, 2, 3], 5);
        assert_eq!(padded, vec![0, 0, 1, 2, 3]);
    }

    #[test]
    fn test_pre_truncation_keeps_tail() {
        let padded = SequenceVectorizer::pad(&[1, 2, 3, 4, 5, 6], 4);
        assert_eq!(padded, vec![3, 4, 5, 6]);
    }

    #[test]
    fn test_extract_shape_and_padding() {
        let v = vectorizer();
        let batch = v
            .extract(&["software engineer".to_string(), "backend".to_string()])
            .unwrap();
        assert_eq!(batch.shape(), &[2, MAX_SEQUENCE_LENGTH]);
        // Pre-padded: the ids sit at the end of each row
        assert_eq!(batch[[0, MAX_SEQUENCE_LENGTH - 2]], 1.0);
        assert_eq!(batch[[0, MAX_SEQUENCE_LENGTH - 1]], 2.0);
        assert_eq!(batch[[1, MAX_SEQUENCE_LENGTH - 1]], 3.0);
        assert_eq!(batch[[1, 0]], 0.0);
    }

    #[test]
    fn test_large_index_survives_f32_row() {
        let mut vocab = HashMap::new();
        vocab.insert("rare".to_string(), (1 << 24) - 1);
        let v = SequenceVectorizer::new(vocab);
        let batch = v.extract(&["rare".to_string()]).unwrap();
        assert_eq!(
            batch[[0, MAX_SEQUENCE_LENGTH - 1]] as i64,
            (1i64 << 24) - 1
        );
    }

    #[test]
    fn test_text_with_no_known_words_is_all_padding() {
        let v = vectorizer();
        let batch = v.extract(&["completely unknown words".to_string()]).unwrap();
        assert!(batch.iter().all(|&x| x == 0.0));
    }
}
