use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use log::info;

use jobcat::{tabular_router, AssetCatalog, RuntimeConfig, TabularServiceState};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 5000)]
    port: u16,

    /// Directory containing the serialized model artifacts
    #[arg(long, default_value = "assets")]
    assets: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    info!("=== Starting Tabular Inference Service ===");
    let start_time = Instant::now();

    let catalog = AssetCatalog::new(&args.assets);
    let state = Arc::new(TabularServiceState::load(
        &catalog,
        &RuntimeConfig::default(),
    )?);
    info!(
        "Inference context ready (took {:.2?})",
        start_time.elapsed()
    );

    let app = tabular_router(state);
    let listener = tokio::net::TcpListener::bind((args.host.as_str(), args.port)).await?;
    info!("Tabular service listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
