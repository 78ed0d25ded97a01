mod analysis;
mod config;
mod db;
mod errors;
mod llm_client;
mod models;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::analysis::store::AnalysisStore;
use crate::analysis::text::PdfTextExtractor;
use crate::config::Config;
use crate::db::create_pool;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;

#[derive(Parser)]
#[command(name = "analyzer", version, about = "AI résumé analysis service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Create the database schema and exit
    InitDb,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::InitDb => init_db(&config).await,
    }
}

async fn init_db(config: &Config) -> Result<()> {
    let pool = create_pool(&config.data_dir).await?;
    AnalysisStore::new(pool.clone()).ensure_schema().await?;
    pool.close().await;
    info!("Database schema ensured in {}", config.data_dir.display());
    Ok(())
}

async fn serve(config: Config) -> Result<()> {
    info!("Starting Resume Analyzer API v{}", env!("CARGO_PKG_VERSION"));

    let pool = create_pool(&config.data_dir).await?;
    let store = AnalysisStore::new(pool.clone());
    store.ensure_schema().await?;

    let llm = LlmClient::new(
        config.gemini_api_key.clone(),
        config.gemini_model.clone(),
        config.gemini_api_base.clone(),
    )?;
    if config.gemini_api_key.is_none() {
        tracing::warn!("GEMINI_API_KEY is not set; analysis requests will fail");
    }
    info!("LLM client initialized (model: {})", llm.model());

    let state = AppState {
        store,
        text_extractor: Arc::new(PdfTextExtractor),
        model: Arc::new(llm),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    info!("Shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
    }
}
