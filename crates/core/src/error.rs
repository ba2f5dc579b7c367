//! Error types for the peruse PDF reading library.

use thiserror::Error;

/// Primary error type for PDF reading operations.
#[derive(Error, Debug)]
pub enum PdfError {
    #[error("not a PDF file: empty input")]
    EmptyFile,

    #[error("not a PDF file: {0}")]
    NotPdf(String),

    #[error("unsupported PDF version {major}.{minor}")]
    UnsupportedVersion { major: i64, minor: i64 },

    #[error("invalid token at offset {pos}: {msg}")]
    TokenError { pos: u64, msg: String },

    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("malformed PDF: {0}")]
    Syntax(String),

    #[error("no valid cross-reference table found")]
    NoValidXref,

    #[error("type error: expected {expected}, got {got}")]
    TypeError {
        expected: &'static str,
        got: &'static str,
    },

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("strict extraction failed on page {page}: {source}")]
    PageFailed {
        page: usize,
        #[source]
        source: Box<PdfError>,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience Result type alias for PdfError.
pub type Result<T> = std::result::Result<T, PdfError>;
