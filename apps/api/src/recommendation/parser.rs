//! Candidate Parsing — pulls contact fields out of normalized résumé text.
//!
//! Parsing is total by design: résumé formats are too irregular for strict
//! validation, so every heuristic degrades to `None` and a candidate with
//! nothing but raw text is valid output.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::recommendation::models::Candidate;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap()
});

/// Domestic and international forms: optional `+CC`, separators `-`, `.`,
/// space, and optional area-code parentheses.
static PHONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\+\d{1,3}[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}").unwrap()
});

/// First lines that are common résumé section headers, not names.
const SECTION_HEADERS: &[&str] = &[
    "resume",
    "curriculum vitae",
    "cv",
    "summary",
    "profile",
    "objective",
    "contact",
    "experience",
    "education",
    "skills",
];

const NAME_MAX_WORDS: usize = 4;
const NAME_MAX_LEN: usize = 60;

/// Extracts a `Candidate` from normalized text. Never fails.
pub fn parse(text: &str, source_id: &str) -> Candidate {
    Candidate {
        source_id: source_id.to_string(),
        raw_text: text.to_string(),
        name: extract_name(text),
        email: EMAIL_RE.find(text).map(|m| m.as_str().to_string()),
        phone: PHONE_RE.find(text).map(|m| m.as_str().to_string()),
    }
}

/// First non-empty line, accepted only if it plausibly is a personal name.
/// Best-effort metadata: a miss here degrades to the `Candidate N`
/// placeholder and never affects ranking.
fn extract_name(text: &str) -> Option<String> {
    let first_line = text.lines().find(|l| !l.trim().is_empty())?.trim();
    looks_like_name(first_line).then(|| first_line.to_string())
}

fn looks_like_name(line: &str) -> bool {
    if line.is_empty() || line.len() > NAME_MAX_LEN {
        return false;
    }
    if line.contains('@') || line.chars().any(|c| c.is_ascii_digit()) {
        return false;
    }
    if SECTION_HEADERS.contains(&line.to_lowercase().as_str()) {
        return false;
    }
    let words: Vec<&str> = line.split_whitespace().collect();
    if words.is_empty() || words.len() > NAME_MAX_WORDS {
        return false;
    }
    words.iter().all(|w| looks_like_name_word(w))
}

/// A name word starts with an uppercase letter and is not shouting —
/// all-caps beyond a short initial reads as a section header.
fn looks_like_name_word(word: &str) -> bool {
    let mut chars = word.chars().filter(|c| c.is_alphabetic());
    let Some(first) = chars.next() else {
        return false;
    };
    if !first.is_uppercase() {
        return false;
    }
    if word.chars().any(|c| !c.is_alphabetic() && !matches!(c, '.' | '\'' | '-')) {
        return false;
    }
    let alphabetic: Vec<char> = word.chars().filter(|c| c.is_alphabetic()).collect();
    if alphabetic.len() > 3 && alphabetic.iter().all(|c| c.is_uppercase()) {
        return false;
    }
    true
}

/// Lowercased, trimmed email for duplicate comparison.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Digits-plus-leading-plus form for duplicate comparison:
/// `(123) 456-7890` and `123.456.7890` compare equal.
pub fn normalize_phone(phone: &str) -> String {
    let trimmed = phone.trim();
    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    if trimmed.starts_with('+') {
        format!("+{digits}")
    } else {
        digits
    }
}

/// Case- and whitespace-insensitive name form for duplicate comparison.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESUME: &str = "Jane Doe\nSenior Software Engineer\njane.doe@example.com\n(123) 456-7890\n\nExperience:\n5 years of Python and AWS";

    #[test]
    fn test_parse_extracts_all_fields() {
        let candidate = parse(RESUME, "file_1");
        assert_eq!(candidate.name.as_deref(), Some("Jane Doe"));
        assert_eq!(candidate.email.as_deref(), Some("jane.doe@example.com"));
        assert_eq!(candidate.phone.as_deref(), Some("(123) 456-7890"));
        assert_eq!(candidate.source_id, "file_1");
        assert_eq!(candidate.raw_text, RESUME);
    }

    #[test]
    fn test_parse_never_fails_on_garbage() {
        let candidate = parse("%%%### ???", "text_1");
        assert!(candidate.name.is_none());
        assert!(candidate.email.is_none());
        assert!(candidate.phone.is_none());
    }

    #[test]
    fn test_parse_empty_text_is_valid() {
        let candidate = parse("", "text_1");
        assert!(candidate.name.is_none());
        assert_eq!(candidate.raw_text, "");
    }

    #[test]
    fn test_first_email_wins() {
        let candidate = parse("a@x.com then b@y.com", "t");
        assert_eq!(candidate.email.as_deref(), Some("a@x.com"));
    }

    #[test]
    fn test_international_phone_matches() {
        let candidate = parse("call +44 123 456 7890 anytime", "t");
        assert_eq!(candidate.phone.as_deref(), Some("+44 123 456 7890"));
    }

    #[test]
    fn test_section_header_is_not_a_name() {
        assert!(parse("Curriculum Vitae\nJane Doe", "t").name.is_none());
        assert!(parse("SUMMARY\ntext", "t").name.is_none());
    }

    #[test]
    fn test_email_first_line_is_not_a_name() {
        assert!(parse("jane.doe@example.com\nEngineer", "t").name.is_none());
    }

    #[test]
    fn test_long_or_numbered_first_line_is_not_a_name() {
        assert!(parse("Jane Doe 42\ntext", "t").name.is_none());
        let long_line = "A Very Long Opening Statement About Career Goals And Aspirations";
        assert!(parse(long_line, "t").name.is_none());
    }

    #[test]
    fn test_lowercase_first_line_is_not_a_name() {
        assert!(parse("experienced software engineer\ntext", "t").name.is_none());
    }

    #[test]
    fn test_name_with_initials_and_hyphen_is_accepted() {
        let candidate = parse("J. R. O'Neil-Smith\nEngineer", "t");
        assert_eq!(candidate.name.as_deref(), Some("J. R. O'Neil-Smith"));
    }

    #[test]
    fn test_normalize_phone_strips_separators() {
        assert_eq!(normalize_phone("(123) 456-7890"), "1234567890");
        assert_eq!(normalize_phone("123.456.7890"), "1234567890");
        assert_eq!(normalize_phone("+1-123-456-7890"), "+11234567890");
    }

    #[test]
    fn test_normalize_email_case_insensitive() {
        assert_eq!(normalize_email(" Jane@X.COM "), "jane@x.com");
    }

    #[test]
    fn test_normalize_name_collapses_case_and_whitespace() {
        assert_eq!(normalize_name("  Jane   DOE "), "jane doe");
    }
}
