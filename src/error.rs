//! Error taxonomy for the OCR pipeline.
//!
//! Every failure exposes a stable [`ErrorKind`] so the HTTP layer can map it
//! to a status code without looking at message text.

use serde::Serialize;
use thiserror::Error;

/// Why a single model call failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "reason", content = "status")]
pub enum RecognitionFailure {
    /// Connection refused, DNS failure, reset, ...
    Transport,
    Timeout,
    /// Endpoint answered with a non-success HTTP status.
    Status(u16),
    /// Body could not be decoded as a chat completion.
    InvalidBody,
    /// Completion contained zero choices.
    NoChoices,
    /// First choice carried no content at all.
    EmptyContent,
}

/// One model call failed.
#[derive(Error, Debug, Clone)]
#[error("recognition failed ({failure:?}): {message}")]
pub struct RecognitionError {
    pub failure: RecognitionFailure,
    pub message: String,
}

impl RecognitionError {
    pub fn new(failure: RecognitionFailure, message: impl Into<String>) -> Self {
        Self {
            failure,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for RecognitionError {
    fn from(e: reqwest::Error) -> Self {
        let failure = if e.is_timeout() {
            RecognitionFailure::Timeout
        } else if let Some(status) = e.status() {
            RecognitionFailure::Status(status.as_u16())
        } else if e.is_decode() {
            RecognitionFailure::InvalidBody
        } else {
            RecognitionFailure::Transport
        };
        Self::new(failure, e.to_string())
    }
}

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("Invalid {kind} file: {message}")]
    Decode { kind: &'static str, message: String },

    #[error("File too large: {size} bytes exceeds limit of {limit} bytes")]
    TooLarge { size: usize, limit: usize },

    #[error("PDF too long: {pages} pages exceeds limit of {limit}")]
    TooManyPages { pages: usize, limit: usize },

    #[error("OCR service unavailable: {0}")]
    ServiceUnavailable(#[source] RecognitionError),

    #[error("Failed to render page {page}: {message}")]
    Render { page: u32, message: String },
}

/// Stable, inspectable classification of an [`OcrError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnsupportedType,
    Decode,
    TooLarge,
    TooManyPages,
    ServiceUnavailable,
    Render,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::UnsupportedType => "unsupported_type",
            ErrorKind::Decode => "decode",
            ErrorKind::TooLarge => "too_large",
            ErrorKind::TooManyPages => "too_many_pages",
            ErrorKind::ServiceUnavailable => "service_unavailable",
            ErrorKind::Render => "render",
        }
    }
}

impl OcrError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OcrError::UnsupportedType(_) => ErrorKind::UnsupportedType,
            OcrError::Decode { .. } => ErrorKind::Decode,
            OcrError::TooLarge { .. } => ErrorKind::TooLarge,
            OcrError::TooManyPages { .. } => ErrorKind::TooManyPages,
            OcrError::ServiceUnavailable(_) => ErrorKind::ServiceUnavailable,
            OcrError::Render { .. } => ErrorKind::Render,
        }
    }

    pub(crate) fn decode(kind: &'static str, message: impl ToString) -> Self {
        OcrError::Decode {
            kind,
            message: message.to_string(),
        }
    }

    /// Client-input errors are never retried or swallowed.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::UnsupportedType
                | ErrorKind::Decode
                | ErrorKind::TooLarge
                | ErrorKind::TooManyPages
        )
    }
}

pub type Result<T> = std::result::Result<T, OcrError>;
