use std::cmp::Ordering;
use std::collections::HashMap;

use ndarray::ArrayView1;
use serde::Serialize;

/// Number of top classes emitted per input. Distributions with fewer classes
/// emit everything they have.
pub const TOP_K: usize = 5;

/// One ranked entry of a prediction result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedPrediction {
    pub category_id: i64,
    pub category: String,
    pub confidence: f32,
}

/// Resolves a numeric class id to a human-readable label. Resolvers are
/// consulted in order; the first non-empty answer wins.
pub trait LabelResolver: Send + Sync {
    fn resolve(&self, class_id: i64) -> Option<String>;
}

/// Inverse mapping of a fitted label encoder: class id indexes into the
/// ordered class list.
pub struct EncoderClasses {
    classes: Vec<String>,
}

impl EncoderClasses {
    pub fn new(classes: Vec<String>) -> Self {
        Self { classes }
    }
}

impl LabelResolver for EncoderClasses {
    fn resolve(&self, class_id: i64) -> Option<String> {
        usize::try_from(class_id)
            .ok()
            .and_then(|idx| self.classes.get(idx).cloned())
    }
}

/// Static id -> label table loaded from the category labels artifact.
pub struct StaticLabelMap {
    labels: HashMap<i64, String>,
}

impl StaticLabelMap {
    pub fn new(labels: HashMap<i64, String>) -> Self {
        Self { labels }
    }
}

impl LabelResolver for StaticLabelMap {
    fn resolve(&self, class_id: i64) -> Option<String> {
        self.labels.get(&class_id).cloned()
    }
}

/// Sorts a class-probability distribution, truncates to the top-K entries,
/// and resolves each class id to a label.
///
/// Candidate ids come from the estimator's native class labels when present,
/// else the positional indices. Ties break toward the lower original index.
/// When every resolver passes, the numeric id is stringified; ranking never
/// fails on a missing label.
pub struct ResultRanker {
    class_ids: Option<Vec<i64>>,
    resolvers: Vec<Box<dyn LabelResolver>>,
    top_k: usize,
}

impl ResultRanker {
    pub fn new() -> Self {
        Self {
            class_ids: None,
            resolvers: Vec::new(),
            top_k: TOP_K,
        }
    }

    /// Overrides positional ids with the estimator's native class labels.
    pub fn with_class_ids(mut self, class_ids: Vec<i64>) -> Self {
        self.class_ids = Some(class_ids);
        self
    }

    pub fn with_resolver(mut self, resolver: Box<dyn LabelResolver>) -> Self {
        self.resolvers.push(resolver);
        self
    }

    fn class_id(&self, index: usize) -> i64 {
        match &self.class_ids {
            Some(ids) => ids.get(index).copied().unwrap_or(index as i64),
            None => index as i64,
        }
    }

    fn resolve_label(&self, class_id: i64) -> String {
        self.resolvers
            .iter()
            .find_map(|r| r.resolve(class_id))
            .unwrap_or_else(|| class_id.to_string())
    }

    /// Ranks one probability row into at most `top_k` labeled entries,
    /// confidence non-increasing.
    pub fn rank(&self, probs: ArrayView1<f32>) -> Vec<RankedPrediction> {
        let mut order: Vec<usize> = (0..probs.len()).collect();
        order.sort_by(|&a, &b| {
            probs[b]
                .partial_cmp(&probs[a])
                .unwrap_or(Ordering::Equal)
                .then(a.cmp(&b))
        });
        order.truncate(self.top_k);

        order
            .into_iter()
            .map(|idx| {
                let class_id = self.class_id(idx);
                RankedPrediction {
                    category_id: class_id,
                    category: self.resolve_label(class_id),
                    confidence: probs[idx],
                }
            })
            .collect()
    }
}

impl Default for ResultRanker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array1;

    fn static_map() -> Box<dyn LabelResolver> {
        let mut labels = HashMap::new();
        labels.insert(0, "Engineering".to_string());
        labels.insert(1, "Sales".to_string());
        labels.insert(2, "HR".to_string());
        Box::new(StaticLabelMap::new(labels))
    }

    #[test]
    fn test_three_class_distribution_without_encoder() {
        let ranker = ResultRanker::new().with_resolver(static_map());
        let probs = Array1::from(vec![0.7f32, 0.2, 0.1]);
        let ranked = ranker.rank(probs.view());

        assert_eq!(
            ranked,
            vec![
                RankedPrediction {
                    category_id: 0,
                    category: "Engineering".to_string(),
                    confidence: 0.7
                },
                RankedPrediction {
                    category_id: 1,
                    category: "Sales".to_string(),
                    confidence: 0.2
                },
                RankedPrediction {
                    category_id: 2,
                    category: "HR".to_string(),
                    confidence: 0.1
                },
            ]
        );
    }

    #[test]
    fn test_truncates_to_top_k() {
        let ranker = ResultRanker::new();
        let probs = Array1::from(vec![0.05f32, 0.3, 0.1, 0.2, 0.15, 0.12, 0.08]);
        let ranked = ranker.rank(probs.view());

        assert_eq!(ranked.len(), TOP_K);
        assert_eq!(ranked[0].category_id, 1);
        for pair in ranked.windows(2) {
            assert!(pair[0].confidence >= pair[1].confidence);
        }
    }

    #[test]
    fn test_ties_break_toward_lower_index() {
        let ranker = ResultRanker::new();
        let probs = Array1::from(vec![0.25f32, 0.25, 0.25, 0.25]);
        let ranked = ranker.rank(probs.view());
        let ids: Vec<i64> = ranked.iter().map(|r| r.category_id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_no_duplicate_ids_in_result() {
        let ranker = ResultRanker::new();
        let probs = Array1::from(vec![0.1f32, 0.4, 0.3, 0.1, 0.05, 0.05]);
        let ranked = ranker.rank(probs.view());
        let mut ids: Vec<i64> = ranked.iter().map(|r| r.category_id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), TOP_K);
    }

    #[test]
    fn test_encoder_wins_over_static_map() {
        let ranker = ResultRanker::new()
            .with_resolver(Box::new(EncoderClasses::new(vec![
                "Backend".to_string(),
                "Frontend".to_string(),
            ])))
            .with_resolver(static_map());
        let probs = Array1::from(vec![0.6f32, 0.4]);
        let ranked = ranker.rank(probs.view());
        assert_eq!(ranked[0].category, "Backend");
    }

    #[test]
    fn test_encoder_miss_falls_back_to_static_map() {
        // Encoder only knows class 0; the static map covers the rest
        let ranker = ResultRanker::new()
            .with_resolver(Box::new(EncoderClasses::new(vec!["Backend".to_string()])))
            .with_resolver(static_map());
        let probs = Array1::from(vec![0.4f32, 0.6]);
        let ranked = ranker.rank(probs.view());
        assert_eq!(ranked[0].category, "Sales");
        assert_eq!(ranked[1].category, "Backend");
    }

    #[test]
    fn test_stringified_id_when_all_resolvers_miss() {
        let ranker = ResultRanker::new();
        let probs = Array1::from(vec![0.9f32, 0.1]);
        let ranked = ranker.rank(probs.view());
        assert_eq!(ranked[0].category, "0");
        assert_eq!(ranked[1].category, "1");
    }

    #[test]
    fn test_native_class_ids() {
        let ranker = ResultRanker::new().with_class_ids(vec![10, 20, 30]);
        let probs = Array1::from(vec![0.2f32, 0.5, 0.3]);
        let ranked = ranker.rank(probs.view());
        assert_eq!(ranked[0].category_id, 20);
        assert_eq!(ranked[0].category, "20");
    }

    #[test]
    fn test_fewer_classes_than_k_emits_all() {
        let ranker = ResultRanker::new();
        let probs = Array1::from(vec![0.5f32, 0.5]);
        assert_eq!(ranker.rank(probs.view()).len(), 2);
    }

    #[test]
    fn test_serializes_camel_case() {
        let entry = RankedPrediction {
            category_id: 3,
            category: "HR".to_string(),
            confidence: 0.25,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["categoryId"], 3);
        assert_eq!(json["category"], "HR");
    }
}
