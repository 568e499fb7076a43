//! ONNX-backed category inference services.
//!
//! Two HTTP services wrapping pre-trained models behind JSON endpoints:
//!
//! - **Text service**: classifies free text into job categories. One pipeline
//!   pools a transformer encoder's first-token embedding and feeds it to a
//!   downstream probability classifier; a second maps text to padded
//!   vocabulary-index sequences for a sequence model. Both return ranked
//!   top-5 `{categoryId, category, confidence}` entries.
//! - **Tabular service**: generic estimators over flat JSON feature maps,
//!   returning raw predictions without ranking.
//!
//! All models are ONNX artifacts executed with `ort`. Everything is loaded
//! once at startup into an immutable inference context; request handlers only
//! read shared state, so concurrent requests need no locking.
//!
//! # Basic Usage
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use jobcat::{AssetCatalog, RuntimeConfig, TextServiceState};
//! use std::sync::Arc;
//!
//! let catalog = AssetCatalog::new("assets");
//! let state = Arc::new(TextServiceState::load(
//!     &catalog,
//!     "models/minilm/model.onnx",
//!     "models/minilm/tokenizer.json",
//!     &RuntimeConfig::default(),
//! )?);
//!
//! let results = state.category.classify(&["software engineer backend".to_string()])?;
//! for entry in results {
//!     println!("{} ({:.2})", entry.category, entry.confidence);
//! }
//! # Ok(())
//! # }
//! ```

pub mod assets;
pub mod error;
pub mod model_manager;
pub mod pipeline;
mod runtime;
pub mod server;

pub use assets::AssetCatalog;
pub use error::ServiceError;
pub use model_manager::{BuiltinEncoder, ModelError, ModelInfo, ModelManager};
pub use pipeline::embedding::ClsEncoder;
pub use pipeline::ranker::{RankedPrediction, ResultRanker, TOP_K};
pub use pipeline::sequence::SequenceVectorizer;
pub use pipeline::tabular::TabularModel;
pub use pipeline::text::TextPipeline;
pub use pipeline::{FeatureExtractor, PipelineError, ProbabilityModel};
pub use runtime::{create_session_builder, RuntimeConfig};
pub use server::{tabular_router, text_router, TabularServiceState, TextServiceState};

pub fn init_logger() {
    env_logger::init();
}
