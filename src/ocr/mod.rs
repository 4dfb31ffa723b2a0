//! Recognition backends.
//!
//! Defines the [`Recognizer`] trait so the orchestrator can drive any
//! vision-model backend (or a test stub) through the same two calls.

pub mod lm_studio;

use crate::error::RecognitionError;
use crate::schema::RecognitionResult;

/// Confidence reported for a successful image recognition.
pub const IMAGE_CONFIDENCE: f64 = 0.9;
/// Confidence reported for a successful text cleanup.
pub const CLEANUP_CONFIDENCE: f64 = 0.95;
/// Confidence reported when cleanup failed and the input text is returned.
pub const FALLBACK_CONFIDENCE: f64 = 0.8;

/// Async trait implemented by each recognition backend.
#[async_trait::async_trait]
pub trait Recognizer: Send + Sync {
    /// Model identity reported alongside results.
    fn model(&self) -> &str;

    /// Extract text from one JPEG image. Failures are returned to the caller,
    /// which decides whether they are fatal.
    async fn recognize_image(&self, image: &[u8]) -> Result<RecognitionResult, RecognitionError>;

    /// Normalize already-extracted text. Never fails: on any error the input
    /// is returned unchanged as a fallback result.
    async fn clean_text(&self, text: &str) -> RecognitionResult;
}
