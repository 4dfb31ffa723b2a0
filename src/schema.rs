//! In-memory entities flowing through the OCR pipeline.

use serde::Serialize;

/// Document category accepted by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Image,
    Pdf,
}

impl FileType {
    /// Resolve a declared type (a file extension such as `png` or `.PDF`)
    /// against the configured image formats.
    pub fn resolve(declared: &str, image_formats: &[String]) -> Option<Self> {
        let ext = declared.trim().trim_start_matches('.').to_lowercase();
        if ext == "pdf" {
            Some(FileType::Pdf)
        } else if !ext.is_empty() && image_formats.iter().any(|f| *f == ext) {
            Some(FileType::Image)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Image => "image",
            FileType::Pdf => "pdf",
        }
    }
}

/// Extension of `filename`, if it has one.
pub fn extension_of(filename: &str) -> Option<&str> {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty())
}

/// Payload of one unit of recognition work.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitContent {
    /// Normalized, re-encoded JPEG bytes.
    Image(Vec<u8>),
    /// Text already extracted natively from a PDF page.
    PreExtractedText(String),
}

/// One atom of work submitted to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionUnit {
    /// 1-based page number; 1 for a standalone image.
    pub sequence: u32,
    pub content: UnitContent,
}

impl RecognitionUnit {
    pub fn image(sequence: u32, data: Vec<u8>) -> Self {
        Self {
            sequence,
            content: UnitContent::Image(data),
        }
    }

    pub fn text(sequence: u32, text: impl Into<String>) -> Self {
        Self {
            sequence,
            content: UnitContent::PreExtractedText(text.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultSource {
    Model,
    Fallback,
}

/// Outcome of recognizing a single unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecognitionResult {
    pub text: String,
    pub confidence: f64,
    pub source: ResultSource,
}

impl RecognitionResult {
    /// Whether this result adds anything to the aggregated document.
    pub fn contributes(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

/// Details about a normalized image upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageMeta {
    pub original_width: u32,
    pub original_height: u32,
    /// Color mode of the decoded upload, e.g. `Rgba8`.
    pub original_color: String,
    pub width: u32,
    pub height: u32,
    pub downscaled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PdfMeta {
    pub page_count: usize,
    /// Pages carrying native text.
    pub text_pages: usize,
    /// Pages rendered for image recognition.
    pub scanned_pages: usize,
    /// Scanned pages whose recognition failed and were skipped.
    pub failed_pages: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DocumentMeta {
    Image(ImageMeta),
    Pdf(PdfMeta),
}

/// Final answer for one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedOutcome {
    pub text: String,
    pub confidence: f64,
    pub file_type: FileType,
    pub meta: DocumentMeta,
    pub model: String,
}
