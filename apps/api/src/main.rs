mod config;
mod embedding;
mod errors;
mod llm_client;
mod recommendation;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::embedding::FastEmbedder;
use crate::llm_client::LlmClient;
use crate::recommendation::summarizer::{SummaryModel, Summarizer};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on out-of-range values)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let crate_target = env!("CARGO_PKG_NAME").replace('-', "_");
            EnvFilter::new(format!("{crate_target}={}", &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting recommender API v{}", env!("CARGO_PKG_VERSION"));

    // Load the embedding model once; it is read-only shared infrastructure
    // for the lifetime of the process. First run may download weights, so
    // keep the load off the async runtime.
    let model_name = config.embedding_model_name.clone();
    let embedder = tokio::task::spawn_blocking(move || FastEmbedder::new(&model_name)).await??;

    // Missing API key is a supported mode: fallback-only summaries.
    let summary_model: Option<Arc<dyn SummaryModel>> = match &config.anthropic_api_key {
        Some(api_key) => {
            info!("LLM summarizer enabled (model: {})", llm_client::MODEL);
            Some(Arc::new(LlmClient::new(api_key.clone())))
        }
        None => {
            warn!("ANTHROPIC_API_KEY is not set; summaries will use the local fallback");
            None
        }
    };
    let summarizer = Summarizer::new(
        summary_model,
        config.summarizer_timeout,
        config.max_concurrent_summaries,
    );

    // Build app state
    let state = AppState {
        embedder: Arc::new(embedder),
        summarizer: Arc::new(summarizer),
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
