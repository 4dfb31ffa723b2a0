#![allow(dead_code)]

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use llm_ocr_server::config::Settings;
use llm_ocr_server::error::{OcrError, RecognitionError, RecognitionFailure, Result};
use llm_ocr_server::ocr::{Recognizer, CLEANUP_CONFIDENCE, IMAGE_CONFIDENCE};
use llm_ocr_server::pdf::{PdfDocument, PdfEngine};
use llm_ocr_server::schema::{RecognitionResult, ResultSource};
use llm_ocr_server::OcrService;
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Scripted answer of the stub model for one image.
#[derive(Debug, Clone)]
pub enum Reply {
    Text(&'static str),
    Delayed(u64, &'static str),
    Fail(RecognitionFailure),
}

/// Recognizer stub. Rendered pages from [`FakePdfEngine`] are one byte long
/// (the page number), so replies are keyed by the image's first byte.
pub struct StubRecognizer {
    replies: HashMap<u8, Reply>,
    default: Reply,
    pub image_calls: AtomicUsize,
    pub cleanup_calls: AtomicUsize,
}

impl StubRecognizer {
    pub fn new(default: Reply) -> Self {
        Self {
            replies: HashMap::new(),
            default,
            image_calls: AtomicUsize::new(0),
            cleanup_calls: AtomicUsize::new(0),
        }
    }

    pub fn page(mut self, page: u8, reply: Reply) -> Self {
        self.replies.insert(page, reply);
        self
    }
}

#[async_trait::async_trait]
impl Recognizer for StubRecognizer {
    fn model(&self) -> &str {
        "stub-ocr"
    }

    async fn recognize_image(&self, image: &[u8]) -> std::result::Result<RecognitionResult, RecognitionError> {
        self.image_calls.fetch_add(1, Ordering::SeqCst);
        let reply = image
            .first()
            .and_then(|b| self.replies.get(b))
            .unwrap_or(&self.default)
            .clone();

        let text = match reply {
            Reply::Text(text) => text,
            Reply::Delayed(ms, text) => {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                text
            }
            Reply::Fail(failure) => return Err(RecognitionError::new(failure, "stubbed failure")),
        };

        Ok(RecognitionResult {
            text: text.to_string(),
            confidence: IMAGE_CONFIDENCE,
            source: ResultSource::Model,
        })
    }

    async fn clean_text(&self, text: &str) -> RecognitionResult {
        self.cleanup_calls.fetch_add(1, Ordering::SeqCst);
        RecognitionResult {
            text: text.to_string(),
            confidence: CLEANUP_CONFIDENCE,
            source: ResultSource::Model,
        }
    }
}

/// PDF engine over a fixed page list: `Some(text)` pages carry native text,
/// `None` pages are scanned. Any input starting with `%PDF` opens.
#[derive(Clone)]
pub struct FakePdfEngine {
    pub pages: Vec<Option<&'static str>>,
}

impl FakePdfEngine {
    pub fn new(pages: Vec<Option<&'static str>>) -> Self {
        Self { pages }
    }
}

struct FakePdf {
    pages: Vec<Option<&'static str>>,
}

impl PdfEngine for FakePdfEngine {
    fn open(&self, data: &[u8]) -> Result<Box<dyn PdfDocument>> {
        if !data.starts_with(b"%PDF") {
            return Err(OcrError::Decode {
                kind: "PDF",
                message: "missing %PDF header".to_string(),
            });
        }
        Ok(Box::new(FakePdf {
            pages: self.pages.clone(),
        }))
    }
}

impl PdfDocument for FakePdf {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_text(&self, page: u32) -> Result<String> {
        Ok(self.pages[page as usize - 1].unwrap_or_default().to_string())
    }

    fn render_pages(&self, pages: &[u32], _scale: f32) -> Result<Vec<Vec<u8>>> {
        Ok(pages.iter().map(|p| vec![*p as u8]).collect())
    }
}

pub fn service(
    settings: &Settings,
    pdf: FakePdfEngine,
    recognizer: Arc<dyn Recognizer>,
) -> OcrService {
    OcrService::new(settings, Arc::new(pdf), recognizer)
}

pub fn png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba([240, 240, 240, 255]));
    let mut bytes = Vec::new();
    DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

pub fn pdf_bytes(len: usize) -> Vec<u8> {
    let mut bytes = b"%PDF-1.5\n".to_vec();
    bytes.resize(len.max(bytes.len()), b' ');
    bytes
}
