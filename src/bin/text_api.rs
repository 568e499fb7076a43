use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use log::info;

use jobcat::server::DEFAULT_ALLOWED_ORIGIN;
use jobcat::{
    text_router, AssetCatalog, BuiltinEncoder, ModelInfo, ModelManager, RuntimeConfig,
    TextServiceState,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 8000)]
    port: u16,

    /// Directory containing the serialized model artifacts
    #[arg(long, default_value = "assets")]
    assets: String,

    /// Origin allowed by CORS
    #[arg(long, default_value = DEFAULT_ALLOWED_ORIGIN)]
    allow_origin: String,

    /// Force a fresh download of the encoder files
    #[arg(short, long)]
    fresh: bool,
}

async fn ensure_encoder_downloaded(
    manager: &ModelManager,
    fresh: bool,
) -> anyhow::Result<ModelInfo> {
    let model_info = BuiltinEncoder::MiniLM.get_model_info();

    if fresh {
        info!("Fresh download requested - removing any existing encoder files...");
        manager.remove_download(&model_info.name)?;
    }
    manager.ensure_model_downloaded(&model_info).await?;

    Ok(model_info)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    info!("=== Starting Text Inference Service ===");
    let start_time = Instant::now();

    let manager = ModelManager::new_default()?;
    let model_info = ensure_encoder_downloaded(&manager, args.fresh).await?;
    let encoder_path = manager.get_model_path(&model_info.name);
    let tokenizer_path = manager.get_tokenizer_path(&model_info.name);

    let catalog = AssetCatalog::new(&args.assets);
    let state = Arc::new(TextServiceState::load(
        &catalog,
        &encoder_path.to_string_lossy(),
        &tokenizer_path.to_string_lossy(),
        &RuntimeConfig::default(),
    )?);
    info!(
        "Inference context ready (took {:.2?})",
        start_time.elapsed()
    );

    let app = text_router(state, &args.allow_origin)?;
    let listener = tokio::net::TcpListener::bind((args.host.as_str(), args.port)).await?;
    info!("Text service listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
