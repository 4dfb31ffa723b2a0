//! LLM OCR Server - extracts text from images and PDFs through a
//! vision-capable language model.

pub mod api;
pub mod chat;
pub mod config;
pub mod error;
pub mod extractor;
pub mod imaging;
pub mod ocr;
pub mod pdf;
pub mod schema;
pub mod service;

pub use error::{ErrorKind, OcrError};
pub use service::OcrService;
