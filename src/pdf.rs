//! PDF access: page tree and native text through `lopdf`, rasterization
//! through `pdfium-render`.

use crate::error::{OcrError, Result};
use crate::imaging;
use image::{DynamicImage, RgbaImage};
use lopdf::Document;
use pdfium_render::prelude::*;
use std::io::Cursor;
use tracing::{debug, warn};

/// Opens PDF documents.
pub trait PdfEngine: Send + Sync {
    fn open(&self, data: &[u8]) -> Result<Box<dyn PdfDocument>>;
}

/// An opened PDF. Pages are 1-based.
pub trait PdfDocument: Send {
    fn page_count(&self) -> usize;

    /// Native text of a page; empty for scanned pages.
    fn page_text(&self, page: u32) -> Result<String>;

    /// Rasterize the given pages at `scale` times the PDF base resolution,
    /// returning one JPEG per requested page in the same order.
    fn render_pages(&self, pages: &[u32], scale: f32) -> Result<Vec<Vec<u8>>>;
}

/// Default engine: `lopdf` parses, pdfium (bound at render time) rasterizes.
#[derive(Debug, Clone, Default)]
pub struct LopdfEngine;

impl PdfEngine for LopdfEngine {
    fn open(&self, data: &[u8]) -> Result<Box<dyn PdfDocument>> {
        let doc = Document::load_from(Cursor::new(data)).map_err(|e| OcrError::decode("PDF", e))?;
        Ok(Box::new(LopdfDocument {
            data: data.to_vec(),
            doc,
        }))
    }
}

struct LopdfDocument {
    data: Vec<u8>,
    doc: Document,
}

impl PdfDocument for LopdfDocument {
    fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    fn page_text(&self, page: u32) -> Result<String> {
        match self.doc.extract_text(&[page]) {
            Ok(text) => Ok(text),
            Err(e) => {
                // Unsupported encodings are common; treat the page as scanned
                warn!("Native text extraction failed for page {}: {}", page, e);
                Ok(String::new())
            }
        }
    }

    fn render_pages(&self, pages: &[u32], scale: f32) -> Result<Vec<Vec<u8>>> {
        if pages.is_empty() {
            return Ok(Vec::new());
        }
        let first = pages[0];

        let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library())
            .map_err(|e| render_error(first, format!("Failed to bind pdfium library: {:?}", e)))?;
        let pdfium = Pdfium::new(bindings);

        let document = pdfium
            .load_pdf_from_byte_slice(&self.data, None)
            .map_err(|e| render_error(first, format!("{:?}", e)))?;

        let config = PdfRenderConfig::new().scale_page_by_factor(scale);

        pages
            .iter()
            .map(|&page| {
                let index = u16::try_from(page.saturating_sub(1))
                    .map_err(|_| render_error(page, "page index out of range"))?;
                let pdf_page = document
                    .pages()
                    .get(index)
                    .map_err(|e| render_error(page, format!("{:?}", e)))?;
                let bitmap = pdf_page
                    .render_with_config(&config)
                    .map_err(|e| render_error(page, format!("{:?}", e)))?;

                let (width, height) = (bitmap.width() as u32, bitmap.height() as u32);
                let rgba = RgbaImage::from_raw(width, height, bitmap.as_rgba_bytes())
                    .ok_or_else(|| render_error(page, "bitmap size mismatch"))?;
                let img = imaging::flatten(DynamicImage::ImageRgba8(rgba));
                debug!("Rendered page {} at {}x{}", page, width, height);

                imaging::encode_jpeg(&img).map_err(|e| render_error(page, e))
            })
            .collect()
    }
}

fn render_error(page: u32, message: impl ToString) -> OcrError {
    OcrError::Render {
        page,
        message: message.to_string(),
    }
}
