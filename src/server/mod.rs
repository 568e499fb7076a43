//! HTTP endpoint layer: immutable inference contexts built once at startup,
//! injected into every request handler; routers wire one route per predictor.

pub mod handlers;

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::assets::{AssetCatalog, LabelEncoderClasses};
use crate::error::ServiceError;
use crate::pipeline::embedding::ClsEncoder;
use crate::pipeline::predictor::{InputKind, OnnxProbabilityModel};
use crate::pipeline::ranker::{EncoderClasses, ResultRanker, StaticLabelMap};
use crate::pipeline::sequence::SequenceVectorizer;
use crate::pipeline::tabular::{TabularModel, TabularPredictor};
use crate::pipeline::text::TextPipeline;
use crate::pipeline::PipelineError;
use crate::runtime::RuntimeConfig;

/// Development origin allowed by the text service unless overridden.
pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:5173";

// Loader failures surface as unavailable artifacts: the process must not
// start serving with a partial model set.
fn startup_error(err: PipelineError) -> ServiceError {
    ServiceError::ArtifactUnavailable(err.to_string())
}

/// Read-only state of the text service: both classification pipelines.
pub struct TextServiceState {
    pub category: TextPipeline,
    pub title: TextPipeline,
}

impl TextServiceState {
    /// Deserializes every text-service artifact and assembles both
    /// pipelines. Required artifacts abort startup; optional label sources
    /// quietly leave the ranker on its fallback chain.
    pub fn load(
        catalog: &AssetCatalog,
        encoder_model_path: &str,
        encoder_tokenizer_path: &str,
        config: &RuntimeConfig,
    ) -> Result<Self, ServiceError> {
        let static_labels = catalog.load_category_labels();

        // Category pipeline: pooled encoder embedding -> classifier
        let encoder = ClsEncoder::load(encoder_model_path, encoder_tokenizer_path, config)
            .map_err(startup_error)?;
        let category_model_path = catalog.require(&catalog.category_model_path())?;
        let category_model =
            OnnxProbabilityModel::load(&category_model_path, InputKind::Float, config)
                .map_err(startup_error)?;

        let mut category_ranker = ResultRanker::new();
        if let Some(ids) = catalog.load_optional_json::<Vec<i64>>(&catalog.class_ids_path()) {
            category_ranker = category_ranker.with_class_ids(ids);
        }
        if let Some(encoder_classes) =
            catalog.load_optional_json::<LabelEncoderClasses>(&catalog.label_encoder_path())
        {
            category_ranker =
                category_ranker.with_resolver(Box::new(EncoderClasses::new(encoder_classes.classes)));
        }
        if let Some(labels) = static_labels.clone() {
            category_ranker = category_ranker.with_resolver(Box::new(StaticLabelMap::new(labels)));
        }

        // Title pipeline: padded vocabulary sequences -> sequence model
        let vocab: HashMap<String, u32> = catalog.load_required_json(&catalog.vocab_path())?;
        let vectorizer = SequenceVectorizer::new(vocab);
        let title_model_path = catalog.require(&catalog.title_model_path())?;
        let title_model = OnnxProbabilityModel::load(&title_model_path, InputKind::Int64, config)
            .map_err(startup_error)?;

        let mut title_ranker = ResultRanker::new();
        if let Some(encoder_classes) =
            catalog.load_optional_json::<LabelEncoderClasses>(&catalog.title_label_encoder_path())
        {
            title_ranker =
                title_ranker.with_resolver(Box::new(EncoderClasses::new(encoder_classes.classes)));
        }
        if let Some(labels) = static_labels {
            title_ranker = title_ranker.with_resolver(Box::new(StaticLabelMap::new(labels)));
        }

        Ok(Self {
            category: TextPipeline::new(
                Box::new(encoder),
                Box::new(category_model),
                category_ranker,
            ),
            title: TextPipeline::new(
                Box::new(vectorizer),
                Box::new(title_model),
                title_ranker,
            ),
        })
    }
}

/// Read-only state of the tabular service: two passthrough estimators.
pub struct TabularServiceState {
    pub model: Box<dyn TabularPredictor>,
    pub model2: Box<dyn TabularPredictor>,
}

impl TabularServiceState {
    pub fn load(catalog: &AssetCatalog, config: &RuntimeConfig) -> Result<Self, ServiceError> {
        let schema: Vec<String> = catalog.load_required_json(&catalog.feature_schema_path())?;
        let model_path = catalog.require(&catalog.tabular_model_path())?;
        let model = TabularModel::load(&model_path, schema, config).map_err(startup_error)?;

        let schema2: Vec<String> = catalog.load_required_json(&catalog.feature_schema2_path())?;
        let model2_path = catalog.require(&catalog.tabular_model2_path())?;
        let model2 = TabularModel::load(&model2_path, schema2, config).map_err(startup_error)?;

        Ok(Self {
            model: Box::new(model),
            model2: Box::new(model2),
        })
    }
}

/// Router for the text service. CORS is an explicit allow-list with a single
/// development origin.
pub fn text_router(
    state: Arc<TextServiceState>,
    allowed_origin: &str,
) -> Result<Router, ServiceError> {
    let origin: HeaderValue = allowed_origin.parse().map_err(|_| {
        ServiceError::InvalidConfiguration(format!("invalid CORS origin: {}", allowed_origin))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true);

    Ok(Router::new()
        .route("/", get(handlers::health))
        .route("/predict", post(handlers::predict_category))
        .route("/predict2", post(handlers::predict_title))
        .layer(cors)
        .with_state(state))
}

/// Router for the tabular service. All origins permitted.
pub fn tabular_router(state: Arc<TabularServiceState>) -> Router {
    Router::new()
        .route("/", get(handlers::health))
        .route("/predict", post(handlers::predict_tabular))
        .route("/predict2", post(handlers::predict_tabular2))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
