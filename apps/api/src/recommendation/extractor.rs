//! Text Extraction — turns submitted documents into normalized plain text.
//!
//! A document arrives either as an uploaded file (PDF, DOCX, or plain text,
//! tagged by its file extension) or as a manually entered text block. Each
//! binary format has its own extractor behind a small trait; everything funnels
//! through the same whitespace normalization so downstream field parsing sees
//! one consistent shape.
//!
//! Extraction is a pure function of the input bytes. Failures are per-document
//! and collected as warnings by the orchestrator, never fatal on their own.

use std::io::Read;

use bytes::Bytes;
use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("unsupported file type '{0}' (expected pdf, docx, or txt)")]
    UnsupportedFormat(String),

    #[error("could not read PDF: {0}")]
    Pdf(String),

    #[error("could not read DOCX: {0}")]
    Docx(String),

    #[error("document contained no extractable text")]
    EmptyDocument,
}

/// Supported document formats, resolved from the uploaded file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
    PlainText,
}

impl DocumentFormat {
    pub fn from_file_name(file_name: &str) -> Result<Self, ExtractionError> {
        let extension = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "pdf" => Ok(DocumentFormat::Pdf),
            "docx" => Ok(DocumentFormat::Docx),
            "txt" | "text" => Ok(DocumentFormat::PlainText),
            other => Err(ExtractionError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Raw content of one submission.
#[derive(Debug, Clone)]
pub enum DocumentPayload {
    /// An uploaded file; the format is inferred from `file_name`.
    File { file_name: String, bytes: Bytes },
    /// A manually entered text block. Never rejected for being empty —
    /// thin content is ranked and warned about, not dropped.
    Text(String),
}

/// One submitted document plus the id it is reported under in warnings
/// and result rows.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub source_id: String,
    pub payload: DocumentPayload,
}

trait FormatExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError>;
}

struct PdfExtractor;

impl FormatExtractor for PdfExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractionError::Pdf(e.to_string()))
    }
}

/// DOCX is a zip container; the body text lives in `word/document.xml` as
/// `w:t` runs grouped into `w:p` paragraphs. Paragraph order is document
/// order, which preserves reading order for the field parser.
struct DocxExtractor;

impl FormatExtractor for DocxExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        let cursor = std::io::Cursor::new(bytes);
        let mut archive =
            zip::ZipArchive::new(cursor).map_err(|e| ExtractionError::Docx(e.to_string()))?;
        let mut entry = archive
            .by_name("word/document.xml")
            .map_err(|e| ExtractionError::Docx(format!("missing word/document.xml: {e}")))?;
        let mut xml = String::new();
        entry
            .read_to_string(&mut xml)
            .map_err(|e| ExtractionError::Docx(e.to_string()))?;

        let mut reader = Reader::from_str(&xml);
        let mut text = String::new();
        let mut in_text_run = false;
        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) if e.name().as_ref() == b"w:t" => in_text_run = true,
                Ok(Event::End(e)) => match e.name().as_ref() {
                    b"w:t" => in_text_run = false,
                    b"w:p" => text.push('\n'),
                    _ => {}
                },
                Ok(Event::Empty(e)) if e.name().as_ref() == b"w:br" => text.push('\n'),
                Ok(Event::Text(t)) if in_text_run => {
                    let run = t
                        .unescape()
                        .map_err(|e| ExtractionError::Docx(e.to_string()))?;
                    text.push_str(&run);
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => return Err(ExtractionError::Docx(e.to_string())),
            }
        }
        Ok(text)
    }
}

/// Extracts normalized plain text from a submitted document.
///
/// Uploaded files that yield no text at all are an error (corrupt or blank
/// upload); manual text blocks pass through even when empty.
pub fn extract(document: &SourceDocument) -> Result<String, ExtractionError> {
    match &document.payload {
        DocumentPayload::Text(text) => Ok(normalize_text(text)),
        DocumentPayload::File { file_name, bytes } => {
            let raw = match DocumentFormat::from_file_name(file_name)? {
                DocumentFormat::Pdf => PdfExtractor.extract(bytes)?,
                DocumentFormat::Docx => DocxExtractor.extract(bytes)?,
                DocumentFormat::PlainText => String::from_utf8_lossy(bytes).into_owned(),
            };
            let text = normalize_text(&raw);
            if text.is_empty() {
                return Err(ExtractionError::EmptyDocument);
            }
            Ok(text)
        }
    }
}

/// Whitespace normalization shared by every extraction path.
///
/// Line structure is preserved — the name heuristic in the field parser keys
/// off the first non-empty line. Within a line, runs of spaces and tabs
/// collapse to one space and control characters are dropped; runs of blank
/// lines collapse to a single blank line.
pub fn normalize_text(raw: &str) -> String {
    let unified = raw.replace("\r\n", "\n").replace('\r', "\n");
    let mut out: Vec<String> = Vec::new();
    let mut previous_blank = true;
    for line in unified.lines() {
        let cleaned: String = line.chars().filter(|c| !c.is_control()).collect();
        let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            if !previous_blank {
                out.push(String::new());
            }
            previous_blank = true;
        } else {
            out.push(collapsed);
            previous_blank = false;
        }
    }
    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }
    out.join("\n")
}
