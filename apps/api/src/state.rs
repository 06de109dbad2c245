use std::sync::Arc;

use crate::config::Config;
use crate::embedding::Embedder;
use crate::recommendation::recommender::PipelineOptions;
use crate::recommendation::summarizer::Summarizer;

/// Shared application state injected into all route handlers via Axum
/// extractors. The embedding model and summarizer are loaded once at startup
/// and shared read-only.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Pluggable embedding backend. Production: `FastEmbedder`.
    pub embedder: Arc<dyn Embedder>,
    pub summarizer: Arc<Summarizer>,
}

impl AppState {
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            default_top_k: self.config.default_top_k,
            name_similarity_threshold: self.config.dedup_name_similarity_threshold,
        }
    }
}
