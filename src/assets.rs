use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::ServiceError;

/// Fixed set of serialized artifacts the services load at startup.
///
/// Required artifacts abort startup when missing or corrupt. Optional ones
/// (label encoders, the static category map, explicit class ids) load
/// best-effort; a failure is logged and the reference stays absent, which
/// later activates the fallback path in the result ranker.
pub struct AssetCatalog {
    root: PathBuf,
}

/// Fitted label encoder, serialized as its ordered class list. A class id is
/// an index into `classes`, mirroring `inverse_transform` on the training
/// side.
#[derive(Debug, Clone, Deserialize)]
pub struct LabelEncoderClasses {
    pub classes: Vec<String>,
}

impl AssetCatalog {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    // Text service artifacts
    pub fn category_model_path(&self) -> PathBuf {
        self.root.join("category_model.onnx")
    }

    pub fn title_model_path(&self) -> PathBuf {
        self.root.join("title_model.onnx")
    }

    pub fn vocab_path(&self) -> PathBuf {
        self.root.join("vocab.json")
    }

    pub fn label_encoder_path(&self) -> PathBuf {
        self.root.join("label_encoder.json")
    }

    pub fn title_label_encoder_path(&self) -> PathBuf {
        self.root.join("title_label_encoder.json")
    }

    pub fn category_labels_path(&self) -> PathBuf {
        self.root.join("category_labels.json")
    }

    pub fn class_ids_path(&self) -> PathBuf {
        self.root.join("class_ids.json")
    }

    // Tabular service artifacts
    pub fn tabular_model_path(&self) -> PathBuf {
        self.root.join("model.onnx")
    }

    pub fn tabular_model2_path(&self) -> PathBuf {
        self.root.join("model2.onnx")
    }

    pub fn feature_schema_path(&self) -> PathBuf {
        self.root.join("features.json")
    }

    pub fn feature_schema2_path(&self) -> PathBuf {
        self.root.join("features2.json")
    }

    /// Checks that a required binary artifact exists. Session construction
    /// reports corruption; this catches plain absence with a clearer message.
    pub fn require(&self, path: &Path) -> Result<PathBuf, ServiceError> {
        if !path.exists() {
            return Err(ServiceError::ArtifactUnavailable(format!(
                "required artifact not found: {}",
                path.display()
            )));
        }
        Ok(path.to_path_buf())
    }

    /// Loads and deserializes a required JSON artifact.
    pub fn load_required_json<T: DeserializeOwned>(&self, path: &Path) -> Result<T, ServiceError> {
        let bytes = std::fs::read(path).map_err(|e| {
            ServiceError::ArtifactUnavailable(format!(
                "failed to read {}: {}",
                path.display(),
                e
            ))
        })?;
        serde_json::from_slice(&bytes).map_err(|e| {
            ServiceError::ArtifactUnavailable(format!(
                "failed to parse {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Loads an optional JSON artifact; any failure is swallowed after a log
    /// line and the caller sees `None`.
    pub fn load_optional_json<T: DeserializeOwned>(&self, path: &Path) -> Option<T> {
        match std::fs::read(path) {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(value) => Some(value),
                Err(e) => {
                    log::warn!(
                        "Optional artifact {} unreadable, continuing without it: {}",
                        path.display(),
                        e
                    );
                    None
                }
            },
            Err(_) => {
                log::info!(
                    "Optional artifact {} not present, fallback path active",
                    path.display()
                );
                None
            }
        }
    }

    /// Loads the static id -> label map. Keys are stringified integers in the
    /// JSON file; non-numeric keys are dropped with a warning.
    pub fn load_category_labels(&self) -> Option<HashMap<i64, String>> {
        let raw: HashMap<String, String> = self.load_optional_json(&self.category_labels_path())?;
        let mut labels = HashMap::with_capacity(raw.len());
        for (key, value) in raw {
            match key.parse::<i64>() {
                Ok(id) => {
                    labels.insert(id, value);
                }
                Err(_) => {
                    log::warn!("Ignoring non-numeric category key '{}'", key);
                }
            }
        }
        Some(labels)
    }
}
