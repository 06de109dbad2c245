//! Recommendation pipeline — composes extraction, parsing, deduplication,
//! embedding, ranking, and summarization into one request/response cycle.
//!
//! Stage machine: Received → Extracted → Parsed → Deduplicated → Embedded →
//! Ranked → Summarized → Complete. A failure extracting or parsing one
//! document drops that document with a recorded warning; the request only
//! fails when no document survives. Embedding failures are fatal — there is
//! no ranking signal without vectors. Summarization failures never surface
//! (the summarizer guarantees fallback text).
//!
//! No state outlives the request.

use std::fmt;

use tokio::task::JoinSet;
use tracing::{info, warn};
use uuid::Uuid;

use crate::embedding::Embedder;
use crate::errors::AppError;
use crate::recommendation::dedup::{deduplicate, DedupOutcome};
use crate::recommendation::extractor::{extract, ExtractionError, SourceDocument};
use crate::recommendation::models::{
    Candidate, Recommendation, RecommendationRow, ScoredCandidate,
};
use crate::recommendation::parser;
use crate::recommendation::ranker;
use crate::recommendation::summarizer::Summarizer;

pub const DEFAULT_TOP_K: usize = 5;
pub const TOP_K_MIN: usize = 1;
pub const TOP_K_MAX: usize = 20;

/// Candidates with fewer tokens than this draw a thin-content warning.
const THIN_CONTENT_MIN_TOKENS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Received,
    Extracted,
    Parsed,
    Deduplicated,
    Embedded,
    Ranked,
    Summarized,
    Complete,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Received => "received",
            Stage::Extracted => "extracted",
            Stage::Parsed => "parsed",
            Stage::Deduplicated => "deduplicated",
            Stage::Embedded => "embedded",
            Stage::Ranked => "ranked",
            Stage::Summarized => "summarized",
            Stage::Complete => "complete",
        };
        f.write_str(name)
    }
}

/// One recommendation request: a job description plus candidate documents.
#[derive(Debug)]
pub struct RecommendRequest {
    pub job_description: String,
    pub documents: Vec<SourceDocument>,
    pub top_k: Option<usize>,
}

/// Pipeline tunables sourced from configuration.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub default_top_k: usize,
    pub name_similarity_threshold: f32,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            default_top_k: DEFAULT_TOP_K,
            name_similarity_threshold: 0.8,
        }
    }
}

/// Runs the full pipeline for one request.
pub async fn recommend(
    embedder: &dyn Embedder,
    summarizer: &Summarizer,
    options: &PipelineOptions,
    request: RecommendRequest,
) -> Result<Recommendation, AppError> {
    let request_id = Uuid::new_v4();
    let RecommendRequest {
        job_description,
        documents,
        top_k,
    } = request;

    if job_description.trim().is_empty() {
        return Err(AppError::Validation(
            "job description must not be empty".to_string(),
        ));
    }
    let top_k = top_k.unwrap_or(options.default_top_k);
    if !(TOP_K_MIN..=TOP_K_MAX).contains(&top_k) {
        return Err(AppError::Validation(format!(
            "top_k must be between {TOP_K_MIN} and {TOP_K_MAX}, got {top_k}"
        )));
    }
    if documents.is_empty() {
        return Err(AppError::Validation(
            "at least one candidate document is required".to_string(),
        ));
    }
    info!(%request_id, stage = %Stage::Received, documents = documents.len(), top_k);

    let mut warnings: Vec<String> = Vec::new();

    // Extraction and parsing are independent per document, so they fan out
    // across the blocking pool; results are re-sorted into submission order
    // because dedup's first-occurrence semantics depend on it.
    let document_count = documents.len();
    let mut tasks: JoinSet<(usize, String, Result<Candidate, ExtractionError>)> = JoinSet::new();
    for (index, document) in documents.into_iter().enumerate() {
        let source_id = document.source_id.clone();
        tasks.spawn_blocking(move || {
            let outcome =
                extract(&document).map(|text| parser::parse(&text, &document.source_id));
            (index, source_id, outcome)
        });
    }
    let mut extracted = Vec::with_capacity(document_count);
    while let Some(joined) = tasks.join_next().await {
        let entry = joined
            .map_err(|e| AppError::Internal(anyhow::anyhow!("extraction task failed: {e}")))?;
        extracted.push(entry);
    }
    extracted.sort_by_key(|(index, _, _)| *index);
    info!(%request_id, stage = %Stage::Extracted, documents = document_count);

    let mut candidates: Vec<Candidate> = Vec::with_capacity(document_count);
    for (_, source_id, outcome) in extracted {
        match outcome {
            Ok(candidate) => candidates.push(candidate),
            Err(e) => {
                warn!(%request_id, %source_id, "document skipped: {e}");
                warnings.push(format!("document {source_id} was skipped: {e}"));
            }
        }
    }
    if candidates.is_empty() {
        return Err(AppError::NoValidCandidates(
            "none of the submitted documents produced usable text".to_string(),
        ));
    }
    info!(%request_id, stage = %Stage::Parsed, candidates = candidates.len());

    let DedupOutcome {
        candidates,
        warnings: dedup_warnings,
    } = deduplicate(&candidates, options.name_similarity_threshold);
    warnings.extend(dedup_warnings);
    info!(%request_id, stage = %Stage::Deduplicated, candidates = candidates.len());

    for candidate in &candidates {
        if candidate.raw_text.split_whitespace().count() < THIN_CONTENT_MIN_TOKENS {
            warnings.push(format!(
                "document {} has very little text content; its ranking may be unreliable",
                candidate.source_id
            ));
        }
    }

    let job_vector = embedder
        .embed_one(&job_description)
        .await
        .map_err(|e| AppError::Embedding(e.to_string()))?;
    let candidate_texts: Vec<String> = candidates.iter().map(|c| c.raw_text.clone()).collect();
    let candidate_vectors = embedder
        .embed(&candidate_texts)
        .await
        .map_err(|e| AppError::Embedding(e.to_string()))?;
    info!(%request_id, stage = %Stage::Embedded, vectors = candidate_vectors.len());

    let ranked = ranker::rank(&job_vector, &candidate_vectors, top_k);
    info!(%request_id, stage = %Stage::Ranked, returned = ranked.len());

    // Summaries only for the returned window — candidates below the cut
    // never cost an LLM call.
    let summary_inputs: Vec<(String, f32)> = ranked
        .iter()
        .map(|&(index, score)| (candidates[index].raw_text.clone(), score))
        .collect();
    let summaries = summarizer.summarize_all(&job_description, &summary_inputs).await;
    info!(%request_id, stage = %Stage::Summarized, summaries = summaries.len());

    let scored: Vec<ScoredCandidate> = ranked
        .iter()
        .zip(summaries)
        .map(|(&(index, score), summary)| ScoredCandidate {
            candidate: candidates[index].clone(),
            score,
            summary: Some(summary),
        })
        .collect();

    let results: Vec<RecommendationRow> = scored
        .into_iter()
        .enumerate()
        .map(|(position, scored_candidate)| {
            let rank = position + 1;
            RecommendationRow {
                rank,
                source_id: scored_candidate.candidate.source_id.clone(),
                name: scored_candidate.candidate.display_name(rank),
                email: scored_candidate.candidate.email,
                phone: scored_candidate.candidate.phone,
                score: round_score(scored_candidate.score),
                summary: scored_candidate.summary.unwrap_or_default(),
            }
        })
        .collect();
    info!(%request_id, stage = %Stage::Complete, results = results.len(), warnings = warnings.len());

    Ok(Recommendation { results, warnings })
}

/// Scores are surfaced with 4 decimal places.
fn round_score(score: f32) -> f32 {
    (score * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use bytes::Bytes;

    use super::*;
    use crate::embedding::{l2_normalize, EmbeddingError};
    use crate::recommendation::extractor::DocumentPayload;

    const BUCKETS: usize = 64;

    /// Deterministic bag-of-words hashing embedder; enough signal for
    /// ranking tests without a real model.
    struct KeywordEmbedder;

    fn embed_text(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; BUCKETS];
        for token in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let mut hash: u32 = 2_166_136_261;
            for byte in token.bytes() {
                hash ^= byte as u32;
                hash = hash.wrapping_mul(16_777_619);
            }
            vector[(hash as usize) % BUCKETS] += 1.0;
        }
        l2_normalize(vector)
    }

    #[async_trait]
    impl Embedder for KeywordEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            if texts.is_empty() {
                return Err(EmbeddingError::EmptyBatch);
            }
            Ok(texts.iter().map(|t| embed_text(t)).collect())
        }
    }

    fn fallback_summarizer() -> Summarizer {
        Summarizer::new(None, Duration::from_secs(1), 3)
    }

    fn text_document(source_id: &str, text: &str) -> SourceDocument {
        SourceDocument {
            source_id: source_id.to_string(),
            payload: DocumentPayload::Text(text.to_string()),
        }
    }

    fn request(documents: Vec<SourceDocument>, top_k: Option<usize>) -> RecommendRequest {
        RecommendRequest {
            job_description: "Senior Python backend engineer, 5 years, AWS".to_string(),
            documents,
            top_k,
        }
    }

    async fn run(request: RecommendRequest) -> Result<Recommendation, AppError> {
        recommend(
            &KeywordEmbedder,
            &fallback_summarizer(),
            &PipelineOptions::default(),
            request,
        )
        .await
    }

    #[tokio::test]
    async fn test_scenario_close_unrelated_empty_ranking() {
        let documents = vec![
            text_document(
                "close",
                "Jane Doe\nSenior Python backend engineer with 5 years of AWS experience",
            ),
            text_document(
                "unrelated",
                "Bob Lee\nGraphic designer, 5 years of branding and typography work",
            ),
            text_document("empty", ""),
        ];
        let outcome = run(request(documents, None)).await.unwrap();

        let order: Vec<&str> = outcome
            .results
            .iter()
            .map(|r| r.source_id.as_str())
            .collect();
        assert_eq!(order, vec!["close", "unrelated", "empty"]);
        assert!(outcome.results[0].score > outcome.results[1].score);
        assert!(outcome.results[1].score > outcome.results[2].score);
        assert!(outcome
            .warnings
            .iter()
            .any(|w| w.contains("empty") && w.contains("very little text")));
        for row in &outcome.results {
            assert!(!row.summary.is_empty());
        }
    }

    #[tokio::test]
    async fn test_scenario_shared_email_keeps_one_jane() {
        let documents = vec![
            text_document("short", "Jane Doe\njane@x.com\nPython engineer"),
            text_document(
                "long",
                "Jane Doe\njane@x.com\nPython backend engineer with AWS, Terraform and Kubernetes",
            ),
        ];
        let outcome = run(request(documents, None)).await.unwrap();
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.results[0].source_id, "long");
        assert_eq!(outcome.results[0].name, "Jane Doe");
        assert!(outcome.warnings.iter().any(|w| w.contains("merged")));
    }

    #[tokio::test]
    async fn test_output_len_bounded_by_top_k() {
        let documents = (0..4)
            .map(|i| text_document(&format!("doc{i}"), &format!("Candidate text number {i} python")))
            .collect();
        let outcome = run(request(documents, Some(2))).await.unwrap();
        assert_eq!(outcome.results.len(), 2);
        assert_eq!(outcome.results[0].rank, 1);
        assert_eq!(outcome.results[1].rank, 2);
    }

    #[tokio::test]
    async fn test_failed_document_becomes_warning_not_failure() {
        let documents = vec![
            SourceDocument {
                source_id: "broken.pdf".to_string(),
                payload: DocumentPayload::File {
                    file_name: "broken.pdf".to_string(),
                    bytes: Bytes::from_static(b"not a pdf"),
                },
            },
            text_document("ok", "Jane Doe\nPython backend engineer"),
        ];
        let outcome = run(request(documents, None)).await.unwrap();
        assert_eq!(outcome.results.len(), 1);
        assert!(outcome
            .warnings
            .iter()
            .any(|w| w.contains("broken.pdf") && w.contains("skipped")));
    }

    #[tokio::test]
    async fn test_all_documents_failing_is_fatal() {
        let documents = vec![SourceDocument {
            source_id: "broken.docx".to_string(),
            payload: DocumentPayload::File {
                file_name: "broken.docx".to_string(),
                bytes: Bytes::from_static(b"junk"),
            },
        }];
        let result = run(request(documents, None)).await;
        assert!(matches!(result, Err(AppError::NoValidCandidates(_))));
    }

    #[tokio::test]
    async fn test_empty_job_description_is_rejected() {
        let mut req = request(vec![text_document("a", "text")], None);
        req.job_description = "   ".to_string();
        assert!(matches!(run(req).await, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_out_of_range_top_k_is_rejected() {
        let documents = vec![text_document("a", "some candidate text")];
        assert!(matches!(
            run(request(documents, Some(0))).await,
            Err(AppError::Validation(_))
        ));
        let documents = vec![text_document("a", "some candidate text")];
        assert!(matches!(
            run(request(documents, Some(21))).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_no_documents_is_rejected() {
        assert!(matches!(
            run(request(vec![], None)).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_nameless_candidate_gets_placeholder() {
        let documents = vec![text_document(
            "anon",
            "experienced python backend engineer with aws",
        )];
        let outcome = run(request(documents, None)).await.unwrap();
        assert_eq!(outcome.results[0].name, "Candidate 1");
    }

    #[test]
    fn test_round_score_keeps_four_decimals() {
        assert_eq!(round_score(0.123_456), 0.1235);
        assert_eq!(round_score(1.0), 1.0);
    }
}
