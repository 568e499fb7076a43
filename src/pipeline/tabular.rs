use std::collections::HashMap;
use std::path::Path;

use ndarray::Array2;
use ort::session::Session;
use ort::value::Tensor;
use serde::Serialize;
use serde_json::{Map, Value};

use super::PipelineError;
use crate::runtime::{create_session_builder, RuntimeConfig};

/// Raw prediction value from a tabular estimator. Classifier exports emit
/// integer labels, regressors emit floats; the wire format keeps whichever
/// the model produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PredictionValue {
    Int(i64),
    Float(f32),
}

/// Single-row prediction over a named-field payload. Object-safe so request
/// handlers can be exercised against a stub.
pub trait TabularPredictor: Send + Sync {
    fn predict_fields(&self, fields: &Map<String, Value>)
        -> Result<Vec<PredictionValue>, PipelineError>;
}

/// Generic tabular estimator: an ONNX session plus the ordered feature
/// column list it was trained on.
///
/// A request payload is a flat JSON object; it becomes a single feature row
/// in schema order. Missing or non-numeric fields are the client's fault;
/// extra fields are ignored. Output is the raw prediction, no ranking.
pub struct TabularModel {
    session: Session,
    input_name: String,
    output_index: usize,
    schema: Vec<String>,
}

impl TabularModel {
    pub fn load<P: AsRef<Path>>(
        path: P,
        schema: Vec<String>,
        config: &RuntimeConfig,
    ) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        if schema.is_empty() {
            return Err(PipelineError::ModelError(
                "Feature schema cannot be empty".into(),
            ));
        }

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

        // The passthrough endpoints return `predict` output, not
        // probabilities: prefer the label output when the export has one.
        let output_index = session
            .outputs
            .iter()
            .position(|o| o.name.contains("label"))
            .unwrap_or(0);

        log::info!(
            "Tabular model loaded from {:?} ({} features, input '{}')",
            path,
            schema.len(),
            input_name
        );

        Ok(Self {
            session,
            input_name,
            output_index,
            schema,
        })
    }

    /// Builds the feature row in schema order from a flat JSON object.
    pub fn row_from_fields(&self, fields: &Map<String, Value>) -> Result<Vec<f32>, PipelineError> {
        row_in_schema_order(&self.schema, fields)
    }

    fn predict(&self, row: &[f32]) -> Result<Vec<PredictionValue>, PipelineError> {
        let input_array = Array2::from_shape_vec((1, row.len()), row.to_vec())
            .map_err(|e| PipelineError::ModelError(format!("Failed to create input array: {}", e)))?;
        let input_dyn = input_array.into_dyn();
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

        if let Ok(view) = outputs[self.output_index].try_extract_tensor::<f32>() {
            return Ok(view.iter().map(|&v| PredictionValue::Float(v)).collect());
        }
        if let Ok(view) = outputs[self.output_index].try_extract_tensor::<i64>() {
            return Ok(view.iter().map(|&v| PredictionValue::Int(v)).collect());
        }

        Err(PipelineError::PredictionError(
            "Model output is neither a float nor an int64 tensor".into(),
        ))
    }
}

/// Maps a flat JSON object onto an ordered feature row. Missing or
/// non-numeric fields reject the request; extra fields are ignored.
pub fn row_in_schema_order(
    schema: &[String],
    fields: &Map<String, Value>,
) -> Result<Vec<f32>, PipelineError> {
    let mut row = Vec::with_capacity(schema.len());
    for column in schema {
        let value = fields
            .get(column)
            .ok_or_else(|| PipelineError::ValidationError(format!("Missing field '{}'", column)))?;
        let number = value.as_f64().ok_or_else(|| {
            PipelineError::ValidationError(format!(
                "Field '{}' must be numeric, got {}",
                column, value
            ))
        })?;
        row.push(number as f32);
    }
    Ok(row)
}

impl TabularPredictor for TabularModel {
    fn predict_fields(
        &self,
        fields: &Map<String, Value>,
    ) -> Result<Vec<PredictionValue>, PipelineError> {
        let row = self.row_from_fields(fields)?;
        self.predict(&row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_prediction_value_serialization() {
        assert_eq!(
            serde_json::to_string(&vec![PredictionValue::Int(42)]).unwrap(),
            "[42]"
        );
        assert_eq!(
            serde_json::to_string(&vec![PredictionValue::Float(0.5)]).unwrap(),
            "[0.5]"
        );
    }

    fn fields(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    fn schema() -> Vec<String> {
        vec!["age".to_string(), "salary".to_string()]
    }

    #[test]
    fn test_row_order_follows_schema() {
        let row = row_in_schema_order(
            &schema(),
            &fields(json!({"salary": 85000.0, "age": 31, "extra": 99})),
        )
        .unwrap();
        assert_eq!(row, vec![31.0, 85000.0]);
    }

    #[test]
    fn test_missing_field_rejected() {
        let err = row_in_schema_order(&schema(), &fields(json!({"age": 31}))).unwrap_err();
        assert!(matches!(err, PipelineError::ValidationError(_)));
        assert!(err.to_string().contains("salary"));
    }

    #[test]
    fn test_non_numeric_field_rejected() {
        let err = row_in_schema_order(
            &schema(),
            &fields(json!({"age": "thirty-one", "salary": 85000.0})),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::ValidationError(_)));
    }
}
