// LLM prompt constants for the fit summary call.

/// System prompt for fit summaries — plain prose, no preamble.
pub const SUMMARY_SYSTEM: &str =
    "You are an expert technical recruiter evaluating candidates against a job description. \
    Respond with the summary text only. \
    Do NOT use markdown, headings, or bullet points. \
    Do NOT restate the job description or the resume.";

/// Summary prompt template. Replace `{job_text}`, `{resume_text}`, and
/// `{score}` before sending. Both texts are truncated upstream so the prompt
/// stays small regardless of document size.
pub const SUMMARY_PROMPT_TEMPLATE: &str = r#"Job Description: {job_text}

Candidate Resume: {resume_text}

Similarity Score: {score}

Based on the job description and resume above, write a professional 2-4 sentence summary explaining how well this candidate fits the role. Focus on:
- Skills and experience alignment
- Relevant qualifications
- Overall suitability
"#;
