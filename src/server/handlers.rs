use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::task;

use super::{TabularServiceState, TextServiceState};
use crate::error::ServiceError;
use crate::pipeline::ranker::RankedPrediction;
use crate::pipeline::tabular::PredictionValue;

/// Health check; no side effects.
pub async fn health() -> Json<Value> {
    Json(json!({ "message": "API is Running" }))
}

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub text: String,
}

/// `predict2` accepts a single string or a list of strings; a single string
/// normalizes to a one-element batch.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum TextInput {
    One(String),
    Many(Vec<String>),
}

impl TextInput {
    pub fn into_batch(self) -> Vec<String> {
        match self {
            Self::One(text) => vec![text],
            Self::Many(texts) => texts,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Predict2Request {
    pub text: TextInput,
}

#[derive(Debug, Serialize)]
pub struct RankedResponse {
    pub results: Vec<RankedPrediction>,
}

#[derive(Debug, Serialize)]
pub struct TabularResponse {
    #[serde(rename = "Prediction")]
    pub prediction: Vec<PredictionValue>,
}

type JsonBody<T> = Result<Json<T>, JsonRejection>;

// Body parsing happens before any inference; a rejected body never reaches a
// model.
fn parse<T>(payload: JsonBody<T>) -> Result<T, ServiceError> {
    match payload {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => Err(ServiceError::MalformedInput(rejection.body_text())),
    }
}

pub async fn predict_category(
    State(state): State<Arc<TextServiceState>>,
    payload: JsonBody<PredictRequest>,
) -> Result<Json<RankedResponse>, ServiceError> {
    let request = parse(payload)?;
    let texts = vec![request.text];
    // ONNX inference is blocking; keep it off the event loop.
    let results = task::spawn_blocking(move || state.category.classify(&texts)).await??;
    Ok(Json(RankedResponse { results }))
}

pub async fn predict_title(
    State(state): State<Arc<TextServiceState>>,
    payload: JsonBody<Predict2Request>,
) -> Result<Json<RankedResponse>, ServiceError> {
    let request = parse(payload)?;
    let texts = request.text.into_batch();
    let results = task::spawn_blocking(move || state.title.classify(&texts)).await??;
    Ok(Json(RankedResponse { results }))
}

pub async fn predict_tabular(
    State(state): State<Arc<TabularServiceState>>,
    payload: JsonBody<Map<String, Value>>,
) -> Result<Json<TabularResponse>, ServiceError> {
    let fields = parse(payload)?;
    let prediction = task::spawn_blocking(move || state.model.predict_fields(&fields)).await??;
    Ok(Json(TabularResponse { prediction }))
}

pub async fn predict_tabular2(
    State(state): State<Arc<TabularServiceState>>,
    payload: JsonBody<Map<String, Value>>,
) -> Result<Json<TabularResponse>, ServiceError> {
    let fields = parse(payload)?;
    let prediction = task::spawn_blocking(move || state.model2.predict_fields(&fields)).await??;
    Ok(Json(TabularResponse { prediction }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_input_normalizes_single_string() {
        let input: TextInput = serde_json::from_str(r#""one text""#).unwrap();
        assert_eq!(input.into_batch(), vec!["one text".to_string()]);
    }

    #[test]
    fn test_text_input_accepts_list() {
        let input: TextInput = serde_json::from_str(r#"["a", "b"]"#).unwrap();
        assert_eq!(input.into_batch().len(), 2);
    }

    #[test]
    fn test_tabular_response_shape() {
        let response = TabularResponse {
            prediction: vec![PredictionValue::Int(1)],
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["Prediction"][0], 1);
    }
}
