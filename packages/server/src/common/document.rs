//! Attached-document handling.
//!
//! A document never fails a turn: anything unreadable becomes a sentinel
//! ([`UNREADABLE_DOCUMENT`], or [`UNSUPPORTED_PDF_DOCUMENT`] for a PDF) and
//! flows into the prompt as plain text.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;
use tracing::warn;

use crate::common::utils::truncate_chars;

pub const NO_DOCUMENT: &str = "Nenhum documento anexado nesta interação.";
pub const UNREADABLE_DOCUMENT: &str = "ERRO: Arquivo corrompido ou ilegível.";
pub const UNSUPPORTED_PDF_DOCUMENT: &str = "AVISO: O usuário anexou um PDF, formato que não é lido \
automaticamente. Peça que cole o texto do documento na conversa.";

pub const MAX_DOCUMENT_CHARS: usize = 100_000;
pub const CLASSIFIER_EXCERPT_CHARS: usize = 2_000;

const TRUNCATION_MARKER: &str = "\n...[CONTEÚDO TRUNCADO]...";

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("invalid base64 payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("binary PDF payloads are not supported, send extracted text")]
    UnsupportedPdf,

    #[error("document is not valid UTF-8 text")]
    NotText,
}

impl DocumentError {
    /// Text placed in the prompt instead of the document.
    pub fn sentinel(&self) -> &'static str {
        match self {
            DocumentError::UnsupportedPdf => UNSUPPORTED_PDF_DOCUMENT,
            DocumentError::InvalidBase64(_) | DocumentError::NotText => UNREADABLE_DOCUMENT,
        }
    }
}

/// Decode and extract an uploaded document, falling back to the sentinel.
pub fn document_from_base64(encoded: &str) -> String {
    let result = STANDARD
        .decode(encoded.trim())
        .map_err(DocumentError::from)
        .and_then(|bytes| extract_text(&bytes));

    match result {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, "Attached document could not be read");
            e.sentinel().to_string()
        }
    }
}

/// Extract text from raw bytes, truncating oversized documents.
pub fn extract_text(bytes: &[u8]) -> Result<String, DocumentError> {
    if bytes.is_empty() {
        return Ok(String::new());
    }
    if bytes.starts_with(b"%PDF") {
        return Err(DocumentError::UnsupportedPdf);
    }

    let text = std::str::from_utf8(bytes).map_err(|_| DocumentError::NotText)?;
    let head = truncate_chars(text, MAX_DOCUMENT_CHARS);

    if head.len() < text.len() {
        warn!(limit = MAX_DOCUMENT_CHARS, "Attached document truncated");
        Ok(format!("{}{}", head, TRUNCATION_MARKER))
    } else {
        Ok(text.to_string())
    }
}

/// Short excerpt the classifier sees instead of the whole document.
pub fn classifier_excerpt(document: Option<&str>) -> String {
    match document {
        Some(text) if text.trim().chars().count() >= 5 => format!(
            "--- INÍCIO DO DOCUMENTO ANEXADO ---\n{}\n--- FIM DO TRECHO ---",
            truncate_chars(text, CLASSIFIER_EXCERPT_CHARS)
        ),
        _ => NO_DOCUMENT.to_string(),
    }
}
