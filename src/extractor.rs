//! Content extraction: turns an uploaded document into recognition units.

use crate::config::Limits;
use crate::error::{OcrError, Result};
use crate::imaging;
use crate::pdf::PdfEngine;
use crate::schema::{DocumentMeta, FileType, PdfMeta, RecognitionUnit};
use std::sync::Arc;
use tracing::{debug, info};

/// Units produced from one document, plus what was learned about it.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Ordered by `sequence`.
    pub units: Vec<RecognitionUnit>,
    pub meta: DocumentMeta,
}

#[derive(Clone)]
pub struct ContentExtractor {
    pdf: Arc<dyn PdfEngine>,
    limits: Limits,
}

impl ContentExtractor {
    pub fn new(pdf: Arc<dyn PdfEngine>, limits: Limits) -> Self {
        Self { pdf, limits }
    }

    /// Decompose `data` into recognition units. CPU-bound; callers on an async
    /// runtime should run this on the blocking pool.
    pub fn extract(&self, data: &[u8], file_type: FileType) -> Result<Extraction> {
        match file_type {
            FileType::Image => self.extract_image(data),
            FileType::Pdf => self.extract_pdf(data),
        }
    }

    fn extract_image(&self, data: &[u8]) -> Result<Extraction> {
        let normalized = imaging::normalize(data, self.limits.max_image_dimension)?;
        debug!(
            "Normalized image {}x{} {} -> {}x{} ({} bytes)",
            normalized.meta.original_width,
            normalized.meta.original_height,
            normalized.meta.original_color,
            normalized.meta.width,
            normalized.meta.height,
            normalized.jpeg.len()
        );

        Ok(Extraction {
            units: vec![RecognitionUnit::image(1, normalized.jpeg)],
            meta: DocumentMeta::Image(normalized.meta),
        })
    }

    fn extract_pdf(&self, data: &[u8]) -> Result<Extraction> {
        let doc = self.pdf.open(data)?;

        let page_count = doc.page_count();
        if page_count > self.limits.max_pdf_pages {
            return Err(OcrError::TooManyPages {
                pages: page_count,
                limit: self.limits.max_pdf_pages,
            });
        }

        // Native text first; pages without any are rendered in one batch
        let mut texts: Vec<(u32, String)> = Vec::new();
        let mut scanned: Vec<u32> = Vec::new();
        for page in 1..=page_count as u32 {
            let text = doc.page_text(page)?;
            let text = text.trim();
            if text.is_empty() {
                scanned.push(page);
            } else {
                texts.push((page, text.to_string()));
            }
        }

        let rendered = doc.render_pages(&scanned, self.limits.pdf_render_scale)?;

        let mut units: Vec<RecognitionUnit> = texts
            .iter()
            .map(|(page, text)| RecognitionUnit::text(*page, text.as_str()))
            .chain(
                scanned
                    .iter()
                    .zip(rendered)
                    .map(|(page, jpeg)| RecognitionUnit::image(*page, jpeg)),
            )
            .collect();
        units.sort_by_key(|u| u.sequence);

        info!(
            "PDF decomposed: {} pages ({} with text, {} scanned)",
            page_count,
            texts.len(),
            scanned.len()
        );

        Ok(Extraction {
            units,
            meta: DocumentMeta::Pdf(PdfMeta {
                page_count,
                text_pages: texts.len(),
                scanned_pages: scanned.len(),
                failed_pages: Vec::new(),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::pdf::{test_pdfs, LopdfEngine, PdfDocument};
    use crate::schema::UnitContent;
    use std::sync::Mutex;

    /// In-memory PDF: each entry is one page's native text.
    struct FakePdf {
        pages: Vec<&'static str>,
        rendered: Arc<Mutex<Vec<u32>>>,
    }

    struct FakeEngine {
        pages: Vec<&'static str>,
        rendered: Arc<Mutex<Vec<u32>>>,
    }

    impl PdfEngine for FakeEngine {
        fn open(&self, data: &[u8]) -> Result<Box<dyn PdfDocument>> {
            if !data.starts_with(b"%PDF") {
                return Err(OcrError::decode("PDF", "missing header"));
            }
            Ok(Box::new(FakePdf {
                pages: self.pages.clone(),
                rendered: self.rendered.clone(),
            }))
        }
    }

    impl PdfDocument for FakePdf {
        fn page_count(&self) -> usize {
            self.pages.len()
        }

        fn page_text(&self, page: u32) -> Result<String> {
            Ok(self.pages[page as usize - 1].to_string())
        }

        fn render_pages(&self, pages: &[u32], _scale: f32) -> Result<Vec<Vec<u8>>> {
            self.rendered.lock().unwrap().extend_from_slice(pages);
            Ok(pages.iter().map(|p| vec![*p as u8]).collect())
        }
    }

    fn fake_extractor(pages: Vec<&'static str>, limits: Limits) -> (ContentExtractor, Arc<Mutex<Vec<u32>>>) {
        let rendered = Arc::new(Mutex::new(Vec::new()));
        let engine = FakeEngine {
            pages,
            rendered: rendered.clone(),
        };
        (ContentExtractor::new(Arc::new(engine), limits), rendered)
    }

    #[test]
    fn test_mixed_pages_in_order() {
        let (extractor, rendered) =
            fake_extractor(vec!["  first page \n", "", " \t", "last"], Limits::default());

        let extraction = extractor.extract(b"%PDF-1.5", FileType::Pdf).unwrap();

        let sequences: Vec<u32> = extraction.units.iter().map(|u| u.sequence).collect();
        assert_eq!(sequences, vec![1, 2, 3, 4]);
        assert_eq!(
            extraction.units[0].content,
            UnitContent::PreExtractedText("first page".to_string())
        );
        assert_eq!(extraction.units[1].content, UnitContent::Image(vec![2]));
        assert_eq!(extraction.units[2].content, UnitContent::Image(vec![3]));
        assert_eq!(
            extraction.units[3].content,
            UnitContent::PreExtractedText("last".to_string())
        );
        assert_eq!(*rendered.lock().unwrap(), vec![2, 3]);

        match extraction.meta {
            DocumentMeta::Pdf(meta) => {
                assert_eq!(meta.page_count, 4);
                assert_eq!(meta.text_pages, 2);
                assert_eq!(meta.scanned_pages, 2);
            }
            other => panic!("unexpected meta: {:?}", other),
        }
    }

    #[test]
    fn test_page_limit() {
        let limits = Limits {
            max_pdf_pages: 2,
            ..Limits::default()
        };
        let (extractor, _) = fake_extractor(vec!["a", "b", "c"], limits.clone());
        let err = extractor.extract(b"%PDF", FileType::Pdf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TooManyPages);

        let (extractor, _) = fake_extractor(vec!["a", "b"], limits);
        assert_eq!(extractor.extract(b"%PDF", FileType::Pdf).unwrap().units.len(), 2);
    }

    #[test]
    fn test_zero_pages_yield_no_units() {
        let extractor = ContentExtractor::new(Arc::new(LopdfEngine), Limits::default());
        let extraction = extractor
            .extract(&test_pdfs::build(&[]), FileType::Pdf)
            .unwrap();
        assert!(extraction.units.is_empty());
    }

    #[test]
    fn test_native_text_pdf_with_lopdf() {
        let extractor = ContentExtractor::new(Arc::new(LopdfEngine), Limits::default());
        let extraction = extractor
            .extract(&test_pdfs::build(&[Some("Invoice 42")]), FileType::Pdf)
            .unwrap();
        assert_eq!(extraction.units.len(), 1);
        match &extraction.units[0].content {
            UnitContent::PreExtractedText(text) => assert!(text.contains("Invoice 42")),
            other => panic!("expected text unit, got {:?}", other),
        }
    }

    #[test]
    fn test_pdf_bytes_declared_as_image_fail_to_decode() {
        let (extractor, _) = fake_extractor(vec![], Limits::default());
        let err = extractor.extract(b"%PDF-1.5", FileType::Image).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
    }
}
