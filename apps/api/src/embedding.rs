//! Embedding Service — text to fixed-length normalized dense vectors.
//!
//! The model is loaded once at startup and shared read-only behind
//! `Arc<dyn Embedder>`; inference is CPU-bound and runs under
//! `spawn_blocking`. All vectors leave this module L2-normalized, so the
//! ranker can treat cosine similarity as a plain dot product.

use std::sync::Arc;

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use thiserror::Error;
use tracing::info;

/// 384-dimensional sentence model, the default for résumé-sized inputs.
pub const DEFAULT_MODEL_NAME: &str = "all-MiniLM-L6-v2";

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding batch was empty")]
    EmptyBatch,

    #[error("embedding model failed: {0}")]
    Model(String),
}

/// Pluggable embedding backend. Carried in `AppState` as `Arc<dyn Embedder>`
/// so tests can swap in a deterministic stand-in without touching the
/// pipeline.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embeds a batch, preserving input order. Deterministic for identical
    /// text and model version.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Single-item convenience used for the job description.
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let batch = [text.to_string()];
        let mut vectors = self.embed(&batch).await?;
        vectors
            .pop()
            .ok_or_else(|| EmbeddingError::Model("model returned no vector".to_string()))
    }
}

/// Production embedder backed by a fastembed ONNX model.
pub struct FastEmbedder {
    model: Arc<TextEmbedding>,
}

impl FastEmbedder {
    /// Loads the named model (downloading it on first use). Fails startup on
    /// unknown model names rather than falling back silently.
    pub fn new(model_name: &str) -> anyhow::Result<Self> {
        let model = resolve_model(model_name)?;
        let text_embedding =
            TextEmbedding::try_new(InitOptions::new(model).with_show_download_progress(false))?;
        info!("Embedding model '{model_name}' loaded");
        Ok(Self {
            model: Arc::new(text_embedding),
        })
    }
}

#[async_trait]
impl Embedder for FastEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Err(EmbeddingError::EmptyBatch);
        }
        let batch: Vec<String> = texts.iter().map(|t| prepare_input(t)).collect();
        let model = Arc::clone(&self.model);
        let vectors = tokio::task::spawn_blocking(move || model.embed(batch, None))
            .await
            .map_err(|e| EmbeddingError::Model(e.to_string()))?
            .map_err(|e| EmbeddingError::Model(e.to_string()))?;
        Ok(vectors.into_iter().map(l2_normalize).collect())
    }
}

fn resolve_model(name: &str) -> anyhow::Result<EmbeddingModel> {
    match name {
        "all-MiniLM-L6-v2" | "sentence-transformers/all-MiniLM-L6-v2" => {
            Ok(EmbeddingModel::AllMiniLML6V2)
        }
        "bge-small-en-v1.5" | "BAAI/bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
        other => anyhow::bail!(
            "unsupported embedding model '{other}' \
            (supported: all-MiniLM-L6-v2, bge-small-en-v1.5)"
        ),
    }
}

/// Blank résumés embed as a single whitespace token instead of erroring,
/// which keeps the pipeline resilient and pushes them to the bottom of the
/// ranking naturally.
fn prepare_input(text: &str) -> String {
    if text.trim().is_empty() {
        " ".to_string()
    } else {
        text.to_string()
    }
}

pub(crate) fn l2_normalize(mut vector: Vec<f32>) -> Vec<f32> {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in &mut vector {
            *value /= norm;
        }
    }
    vector
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_l2_normalize_yields_unit_norm() {
        let normalized = l2_normalize(vec![3.0, 4.0]);
        let norm: f32 = normalized.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
        assert!((normalized[0] - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_l2_normalize_leaves_zero_vector_alone() {
        assert_eq!(l2_normalize(vec![0.0, 0.0]), vec![0.0, 0.0]);
    }

    #[test]
    fn test_blank_input_becomes_whitespace_token() {
        assert_eq!(prepare_input(""), " ");
        assert_eq!(prepare_input("  \n "), " ");
        assert_eq!(prepare_input("real text"), "real text");
    }

    #[test]
    fn test_resolve_model_accepts_known_names() {
        assert!(resolve_model("all-MiniLM-L6-v2").is_ok());
        assert!(resolve_model("sentence-transformers/all-MiniLM-L6-v2").is_ok());
        assert!(resolve_model("bge-small-en-v1.5").is_ok());
    }

    #[test]
    fn test_resolve_model_rejects_unknown_names() {
        assert!(resolve_model("word2vec").is_err());
    }

    #[tokio::test]
    #[ignore = "downloads the embedding model on first run"]
    async fn test_real_model_is_deterministic_and_normalized() {
        let embedder = FastEmbedder::new(DEFAULT_MODEL_NAME).unwrap();
        let text = "Senior Python backend engineer, 5 years, AWS";
        let first = embedder.embed_one(text).await.unwrap();
        let second = embedder.embed_one(text).await.unwrap();
        assert_eq!(first.len(), 384);
        for (a, b) in first.iter().zip(&second) {
            assert!((a - b).abs() < 1e-6);
        }
        let norm: f32 = first.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }
}
