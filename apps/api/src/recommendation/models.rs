use serde::{Deserialize, Serialize};

/// A parsed candidate extracted from one submitted document or text block.
///
/// All contact fields are best-effort heuristics — a candidate with nothing
/// but `raw_text` is valid. Candidates live for one request only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    /// Identifies the originating upload/entry, stable for the request.
    pub source_id: String,
    pub raw_text: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl Candidate {
    /// Display name with the `Candidate N` placeholder for nameless entries.
    pub fn display_name(&self, ordinal: usize) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("Candidate {ordinal}"))
    }
}

/// A candidate paired with its similarity score and (optional) fit summary.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    /// Cosine similarity against the job description, clamped to [-1, 1].
    pub score: f32,
    pub summary: Option<String>,
}

/// One row of the ranked result table returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationRow {
    pub rank: usize,
    pub source_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Rounded to 4 decimal places for display.
    pub score: f32,
    pub summary: String,
}

/// Final pipeline output: ranked rows plus non-fatal warnings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub results: Vec<RecommendationRow>,
    pub warnings: Vec<String>,
}
