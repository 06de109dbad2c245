//! Summarization — natural-language fit explanations that never fail.
//!
//! Primary path: one LLM call per candidate through `llm_client`. Every
//! failure mode — transport error, API error, empty content, per-call
//! timeout — converts to a deterministic local fallback built from the
//! similarity score and the keyword overlap between job and résumé text.
//! `SummarizationError` exists only inside this module; callers always get
//! a non-empty `String`.
//!
//! Batch summaries run concurrently under a semaphore so one slow call never
//! serializes the rest, and a timed-out call falls back for that candidate
//! only.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::warn;

use crate::llm_client::{LlmClient, LlmError};
use crate::recommendation::prompts::{SUMMARY_PROMPT_TEMPLATE, SUMMARY_SYSTEM};

/// Job/résumé text is truncated to this many chars in the prompt.
const PROMPT_TEXT_LIMIT: usize = 1000;
const MAX_SHARED_KEYWORDS: usize = 3;

/// Tokens too generic to be worth naming in a fallback summary.
const STOPWORDS: &[&str] = &[
    "about", "candidate", "every", "experience", "from", "have", "into", "looking", "member",
    "minimum", "more", "must", "nice", "other", "plus", "preferred", "required", "responsibilities",
    "role", "skills", "some", "strong", "team", "that", "their", "this", "what", "will", "with",
    "work", "years", "your",
];

#[derive(Debug, Error)]
enum SummarizationError {
    #[error("summary call timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("model returned an empty summary")]
    Empty,
}

/// Generation backend seam. Production wires in `LlmClient`; tests inject
/// failing or hanging stand-ins to exercise the fallback contract.
#[async_trait]
pub trait SummaryModel: Send + Sync {
    async fn complete(&self, prompt: &str, system: &str) -> Result<String, LlmError>;
}

#[async_trait]
impl SummaryModel for LlmClient {
    async fn complete(&self, prompt: &str, system: &str) -> Result<String, LlmError> {
        LlmClient::complete(self, prompt, system).await
    }
}

/// Fit-summary generator. `model: None` (no API key configured) runs
/// fallback-only for the whole process.
#[derive(Clone)]
pub struct Summarizer {
    model: Option<Arc<dyn SummaryModel>>,
    timeout: Duration,
    max_concurrent: usize,
}

impl Summarizer {
    pub fn new(
        model: Option<Arc<dyn SummaryModel>>,
        timeout: Duration,
        max_concurrent: usize,
    ) -> Self {
        Self {
            model,
            timeout,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Summarizes one candidate. Always returns a non-empty string — this
    /// boundary is where generation failures turn into fallback text.
    pub async fn summarize(&self, job_text: &str, resume_text: &str, score: f32) -> String {
        let Some(model) = &self.model else {
            return fallback_summary(job_text, resume_text, score);
        };
        match self
            .try_generate(model.as_ref(), job_text, resume_text, score)
            .await
        {
            Ok(summary) => summary,
            Err(e) => {
                warn!("summary generation failed, using fallback: {e}");
                fallback_summary(job_text, resume_text, score)
            }
        }
    }

    /// Summarizes a batch with bounded concurrency and a per-call timeout.
    /// Output order matches input order; a slow or failing call affects its
    /// own slot only.
    pub async fn summarize_all(&self, job_text: &str, items: &[(String, f32)]) -> Vec<String> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut tasks: JoinSet<(usize, String)> = JoinSet::new();

        for (index, (resume_text, score)) in items.iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let summarizer = self.clone();
            let job_text = job_text.to_string();
            let resume_text = resume_text.clone();
            let score = *score;
            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("summary semaphore is never closed");
                let summary = summarizer.summarize(&job_text, &resume_text, score).await;
                (index, summary)
            });
        }

        let mut summaries = vec![String::new(); items.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, summary)) => summaries[index] = summary,
                Err(e) => warn!("summary task failed to join: {e}"),
            }
        }
        // A slot left empty (task panic) still gets deterministic text.
        for (index, slot) in summaries.iter_mut().enumerate() {
            if slot.is_empty() {
                *slot = fallback_summary(job_text, &items[index].0, items[index].1);
            }
        }
        summaries
    }

    async fn try_generate(
        &self,
        model: &dyn SummaryModel,
        job_text: &str,
        resume_text: &str,
        score: f32,
    ) -> Result<String, SummarizationError> {
        let prompt = build_prompt(job_text, resume_text, score);
        let summary = tokio::time::timeout(self.timeout, model.complete(&prompt, SUMMARY_SYSTEM))
            .await
            .map_err(|_| SummarizationError::Timeout(self.timeout))??;
        if summary.trim().is_empty() {
            return Err(SummarizationError::Empty);
        }
        Ok(summary)
    }
}

fn build_prompt(job_text: &str, resume_text: &str, score: f32) -> String {
    SUMMARY_PROMPT_TEMPLATE
        .replace("{job_text}", truncate_chars(job_text, PROMPT_TEXT_LIMIT))
        .replace("{resume_text}", truncate_chars(resume_text, PROMPT_TEXT_LIMIT))
        .replace("{score}", &format!("{score:.3}"))
}

fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

/// Deterministic template summary keyed off the similarity score tier, with
/// up to three shared keywords when job and résumé overlap.
fn fallback_summary(job_text: &str, resume_text: &str, score: f32) -> String {
    let base = if score > 0.8 {
        format!(
            "This candidate demonstrates excellent alignment with the job requirements. \
            The high similarity score of {score:.3} suggests a strong potential fit."
        )
    } else if score > 0.6 {
        format!(
            "This candidate shows good alignment with the job requirements, \
            supported by a similarity score of {score:.3}."
        )
    } else if score > 0.4 {
        format!(
            "This candidate has a moderate match for the job, with a similarity score \
            of {score:.3} indicating some relevant qualifications."
        )
    } else {
        format!(
            "This candidate has limited overlap with the job requirements, \
            as indicated by a low similarity score of {score:.3}."
        )
    };

    let shared = keyword_overlap(job_text, resume_text);
    if shared.is_empty() {
        base
    } else {
        format!("{base} Shared keywords: {}.", shared.join(", "))
    }
}

/// Alphabetically ordered (for determinism) intersection of significant
/// tokens, capped at `MAX_SHARED_KEYWORDS`.
fn keyword_overlap(job_text: &str, resume_text: &str) -> Vec<String> {
    let job_tokens = significant_tokens(job_text);
    let resume_tokens = significant_tokens(resume_text);
    let mut shared: Vec<String> = job_tokens.intersection(&resume_tokens).cloned().collect();
    shared.sort_unstable();
    shared.truncate(MAX_SHARED_KEYWORDS);
    shared
}

fn significant_tokens(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.len() >= 4 && !STOPWORDS.contains(token))
        .map(str::to_string)
        .collect()
}
