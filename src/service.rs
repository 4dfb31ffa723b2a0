//! OCR orchestration: validation, extraction, per-unit recognition, and
//! aggregation into one result per document.

use crate::config::{Limits, Settings};
use crate::error::{OcrError, RecognitionError, Result};
use crate::extractor::{ContentExtractor, Extraction};
use crate::ocr::Recognizer;
use crate::pdf::PdfEngine;
use crate::schema::{
    AggregatedOutcome, DocumentMeta, FileType, RecognitionResult, RecognitionUnit, UnitContent,
};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Recognition outcome of one unit, tagged with its position.
#[derive(Debug)]
pub struct UnitOutcome {
    pub sequence: u32,
    pub result: std::result::Result<RecognitionResult, RecognitionError>,
}

/// Top-level coordinator. Holds no per-request state, so one instance serves
/// concurrent requests.
#[derive(Clone)]
pub struct OcrService {
    extractor: ContentExtractor,
    recognizer: Arc<dyn Recognizer>,
    limits: Limits,
    image_formats: Vec<String>,
}

impl OcrService {
    pub fn new(
        settings: &Settings,
        pdf: Arc<dyn PdfEngine>,
        recognizer: Arc<dyn Recognizer>,
    ) -> Self {
        Self {
            extractor: ContentExtractor::new(pdf, settings.limits.clone()),
            recognizer,
            limits: settings.limits.clone(),
            image_formats: settings.image_formats.clone(),
        }
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    pub fn image_formats(&self) -> &[String] {
        &self.image_formats
    }

    /// Process one uploaded document end to end.
    ///
    /// `declared_type` is the upload's file extension (`png`, `pdf`, ...).
    pub async fn process(
        &self,
        data: Vec<u8>,
        filename: &str,
        declared_type: &str,
    ) -> Result<AggregatedOutcome> {
        let started = Instant::now();

        let file_type = FileType::resolve(declared_type, &self.image_formats)
            .ok_or_else(|| OcrError::UnsupportedType(declared_type.to_string()))?;

        if data.len() > self.limits.max_file_size_bytes {
            return Err(OcrError::TooLarge {
                size: data.len(),
                limit: self.limits.max_file_size_bytes,
            });
        }

        info!(
            "Processing {} ({} bytes) as {}",
            filename,
            data.len(),
            file_type.as_str()
        );

        let extraction = self.extract(data, file_type).await?;

        let outcome = match file_type {
            FileType::Image => self.process_image(extraction).await?,
            FileType::Pdf => self.process_pdf(extraction).await,
        };

        info!(
            "Finished {}: {} chars, confidence {:.2}, {:.2}s",
            filename,
            outcome.text.len(),
            outcome.confidence,
            started.elapsed().as_secs_f64()
        );

        Ok(outcome)
    }

    /// Run the CPU-bound extractor on the blocking pool.
    async fn extract(&self, data: Vec<u8>, file_type: FileType) -> Result<Extraction> {
        let extractor = self.extractor.clone();
        tokio::task::spawn_blocking(move || extractor.extract(&data, file_type))
            .await
            .unwrap_or_else(|e| std::panic::resume_unwind(e.into_panic()))
    }

    /// A standalone image has no fallback content: recognition failure is
    /// fatal.
    async fn process_image(&self, extraction: Extraction) -> Result<AggregatedOutcome> {
        let mut text = String::new();
        let mut confidence = 0.0;

        for unit in extraction.units {
            let result = self
                .recognize_unit(unit)
                .await
                .result
                .map_err(OcrError::ServiceUnavailable)?;
            text.push_str(&result.text);
            confidence = result.confidence;
        }

        Ok(AggregatedOutcome {
            text,
            confidence,
            file_type: FileType::Image,
            meta: extraction.meta,
            model: self.recognizer.model().to_string(),
        })
    }

    /// Pages are independent: a failed scanned page is skipped, never fatal.
    async fn process_pdf(&self, extraction: Extraction) -> AggregatedOutcome {
        let mut outcomes: Vec<UnitOutcome> = stream::iter(extraction.units)
            .map(|unit| self.recognize_unit(unit))
            .buffer_unordered(self.limits.page_concurrency.max(1))
            .collect()
            .await;
        outcomes.sort_by_key(|o| o.sequence);

        let failed_pages: Vec<u32> = outcomes
            .iter()
            .filter_map(|o| match &o.result {
                Err(e) => {
                    warn!("Failed to OCR page {}: {}", o.sequence, e);
                    Some(o.sequence)
                }
                Ok(_) => None,
            })
            .collect();

        let (text, confidence) = aggregate(&outcomes);

        let meta = match extraction.meta {
            DocumentMeta::Pdf(mut meta) => {
                meta.failed_pages = failed_pages;
                DocumentMeta::Pdf(meta)
            }
            other => other,
        };

        AggregatedOutcome {
            text,
            confidence,
            file_type: FileType::Pdf,
            meta,
            model: self.recognizer.model().to_string(),
        }
    }

    async fn recognize_unit(&self, unit: RecognitionUnit) -> UnitOutcome {
        let sequence = unit.sequence;
        let result = match unit.content {
            UnitContent::Image(jpeg) => self.recognizer.recognize_image(&jpeg).await,
            UnitContent::PreExtractedText(text) => Ok(self.recognizer.clean_text(&text).await),
        };
        debug!("Unit {} done (ok: {})", sequence, result.is_ok());
        UnitOutcome { sequence, result }
    }
}

/// Boundary marker placed before every segment after the first.
pub fn page_marker(sequence: u32) -> String {
    format!("\n\n--- Page {} ---\n\n", sequence)
}

/// Fold `sequence`-ordered outcomes into the document text and mean
/// confidence. Only results with non-empty text contribute to either.
pub fn aggregate(outcomes: &[UnitOutcome]) -> (String, f64) {
    let contributing: Vec<(u32, &RecognitionResult)> = outcomes
        .iter()
        .filter_map(|o| match &o.result {
            Ok(r) if r.contributes() => Some((o.sequence, r)),
            _ => None,
        })
        .collect();

    if contributing.is_empty() {
        return (String::new(), 0.0);
    }

    let text = contributing
        .iter()
        .enumerate()
        .fold(String::new(), |mut acc, (i, (sequence, r))| {
            if i > 0 {
                acc.push_str(&page_marker(*sequence));
            }
            acc.push_str(r.text.trim());
            acc
        });
    let confidence =
        contributing.iter().map(|(_, r)| r.confidence).sum::<f64>() / contributing.len() as f64;

    (text, confidence)
}
