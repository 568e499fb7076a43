use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::pipeline::PipelineError;

/// Request-facing error classification.
///
/// `MalformedInput` is the client's fault and maps to 400; everything else is
/// a server-side failure and maps to 500. `ArtifactUnavailable` and
/// `InvalidConfiguration` only occur during startup and are fatal before the
/// server ever binds, but they share this type so asset loading and router
/// construction can report through one error path.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("malformed input: {0}")]
    MalformedInput(String),
    #[error("inference failure: {0}")]
    InferenceFailure(String),
    #[error("artifact unavailable: {0}")]
    ArtifactUnavailable(String),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl ServiceError {
    fn status(&self) -> StatusCode {
        match self {
            Self::MalformedInput(_) => StatusCode::BAD_REQUEST,
            Self::InferenceFailure(_)
            | Self::ArtifactUnavailable(_)
            | Self::InvalidConfiguration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("request failed: {}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<PipelineError> for ServiceError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::ValidationError(msg) => Self::MalformedInput(msg),
            other => Self::InferenceFailure(other.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for ServiceError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::InferenceFailure(format!("inference task failed: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ServiceError::MalformedInput("bad".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::InferenceFailure("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ServiceError::ArtifactUnavailable("missing".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ServiceError::InvalidConfiguration("bad origin".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_pipeline_error_classification() {
        let err: ServiceError = PipelineError::ValidationError("empty text".into()).into();
        assert!(matches!(err, ServiceError::MalformedInput(_)));

        let err: ServiceError = PipelineError::ModelError("shape mismatch".into()).into();
        assert!(matches!(err, ServiceError::InferenceFailure(_)));
    }
}
