use axum::extract::{Multipart, State};
use axum::Json;
use serde::Deserialize;
use tracing::debug;

use crate::errors::AppError;
use crate::recommendation::extractor::{DocumentPayload, SourceDocument};
use crate::recommendation::models::Recommendation;
use crate::recommendation::recommender::{recommend, RecommendRequest};
use crate::state::AppState;

/// POST /api/v1/recommendations
///
/// Multipart form: a `job_description` text field, optional `top_k`, repeated
/// `resume` file parts (pdf/docx/txt) and repeated `resume_text` text parts.
/// Handlers only decode the request — all pipeline logic lives in
/// `recommender`.
pub async fn handle_recommend_multipart(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Recommendation>, AppError> {
    let mut job_description = String::new();
    let mut top_k: Option<usize> = None;
    let mut documents: Vec<SourceDocument> = Vec::new();
    let mut text_blocks = 0usize;
    let mut unnamed_files = 0usize;

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "job_description" => {
                job_description = field.text().await.map_err(bad_multipart)?;
            }
            "top_k" => {
                let raw = field.text().await.map_err(bad_multipart)?;
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    top_k = Some(trimmed.parse().map_err(|_| {
                        AppError::Validation(format!("top_k must be an integer, got '{trimmed}'"))
                    })?);
                }
            }
            "resume" => {
                let file_name = match field.file_name() {
                    Some(name) if !name.trim().is_empty() => name.to_string(),
                    _ => {
                        unnamed_files += 1;
                        format!("upload_{unnamed_files}")
                    }
                };
                let bytes = field.bytes().await.map_err(bad_multipart)?;
                documents.push(SourceDocument {
                    source_id: file_name.clone(),
                    payload: DocumentPayload::File { file_name, bytes },
                });
            }
            "resume_text" => {
                text_blocks += 1;
                let text = field.text().await.map_err(bad_multipart)?;
                documents.push(SourceDocument {
                    source_id: format!("text_{text_blocks}"),
                    payload: DocumentPayload::Text(text),
                });
            }
            other => debug!("ignoring unknown multipart field '{other}'"),
        }
    }

    run_pipeline(&state, job_description, documents, top_k).await
}

#[derive(Debug, Deserialize)]
pub struct RecommendTextRequest {
    pub job_description: String,
    pub resumes: Vec<String>,
    pub top_k: Option<usize>,
}

/// POST /api/v1/recommendations/text
///
/// JSON variant for clients submitting plain text blocks only.
pub async fn handle_recommend_text(
    State(state): State<AppState>,
    Json(request): Json<RecommendTextRequest>,
) -> Result<Json<Recommendation>, AppError> {
    let documents = request
        .resumes
        .into_iter()
        .enumerate()
        .map(|(index, text)| SourceDocument {
            source_id: format!("text_{}", index + 1),
            payload: DocumentPayload::Text(text),
        })
        .collect();

    run_pipeline(&state, request.job_description, documents, request.top_k).await
}

async fn run_pipeline(
    state: &AppState,
    job_description: String,
    documents: Vec<SourceDocument>,
    top_k: Option<usize>,
) -> Result<Json<Recommendation>, AppError> {
    let request = RecommendRequest {
        job_description,
        documents,
        top_k,
    };
    let recommendation = recommend(
        state.embedder.as_ref(),
        &state.summarizer,
        &state.pipeline_options(),
        request,
    )
    .await?;
    Ok(Json(recommendation))
}

fn bad_multipart(error: axum::extract::multipart::MultipartError) -> AppError {
    AppError::Validation(format!("malformed multipart request: {error}"))
}
