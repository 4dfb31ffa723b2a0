//! Process configuration.
//!
//! Settings are read once from the environment at startup (after `.env` is
//! loaded by `main`) and are immutable afterwards.

use anyhow::{Context, Result};
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "http://localhost:1234";
const DEFAULT_MODEL: &str = "nielsgl/RolmOCR-8bit";
const DEFAULT_IMAGE_FORMATS: &str = "jpg,jpeg,png,bmp,tiff,webp";

/// Connection details for the chat completion endpoint doing recognition.
#[derive(Debug, Clone)]
pub struct ModelEndpoint {
    pub base_url: String,
    /// Sent as a bearer token when non-empty.
    pub api_key: String,
    pub model: String,
}

/// Limits enforced by the extractor and orchestrator.
#[derive(Debug, Clone)]
pub struct Limits {
    pub max_file_size_bytes: usize,
    pub max_pdf_pages: usize,
    pub max_image_dimension: u32,
    pub pdf_render_scale: f32,
    pub page_concurrency: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_file_size_bytes: 10 * 1024 * 1024,
            max_pdf_pages: 50,
            max_image_dimension: 2048,
            pdf_render_scale: 2.0,
            page_concurrency: 4,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Timeouts {
    pub recognition: Duration,
    pub cleanup: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            recognition: Duration::from_secs(60),
            cleanup: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub endpoint: ModelEndpoint,
    pub limits: Limits,
    pub timeouts: Timeouts,
    /// Lowercase extensions accepted as images.
    pub image_formats: Vec<String>,
    pub host: String,
    pub port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: ModelEndpoint {
                base_url: DEFAULT_BASE_URL.to_string(),
                api_key: String::new(),
                model: DEFAULT_MODEL.to_string(),
            },
            limits: Limits::default(),
            timeouts: Timeouts::default(),
            image_formats: parse_formats(DEFAULT_IMAGE_FORMATS),
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl Settings {
    /// Load settings from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Settings::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let max_file_size_mb: usize = parse_var(&lookup, "MAX_FILE_SIZE_MB", 10)?;

        Ok(Self {
            endpoint: ModelEndpoint {
                base_url: get("LM_STUDIO_BASE_URL").unwrap_or(defaults.endpoint.base_url),
                api_key: lookup("LM_STUDIO_API_KEY").unwrap_or_default(),
                model: get("LM_STUDIO_MODEL_NAME").unwrap_or(defaults.endpoint.model),
            },
            limits: Limits {
                max_file_size_bytes: max_file_size_mb * 1024 * 1024,
                max_pdf_pages: parse_var(
                    &lookup,
                    "SUPPORTED_PDF_MAX_PAGES",
                    defaults.limits.max_pdf_pages,
                )?,
                max_image_dimension: parse_var(
                    &lookup,
                    "MAX_IMAGE_DIMENSION",
                    defaults.limits.max_image_dimension,
                )?,
                pdf_render_scale: parse_var(
                    &lookup,
                    "PDF_RENDER_SCALE",
                    defaults.limits.pdf_render_scale,
                )?,
                page_concurrency: parse_var::<usize, _>(
                    &lookup,
                    "PAGE_CONCURRENCY",
                    defaults.limits.page_concurrency,
                )?
                .max(1),
            },
            timeouts: Timeouts {
                recognition: Duration::from_secs(parse_var(&lookup, "OCR_TIMEOUT_SECS", 60)?),
                cleanup: Duration::from_secs(parse_var(&lookup, "CLEANUP_TIMEOUT_SECS", 30)?),
            },
            image_formats: get("SUPPORTED_IMAGE_FORMATS")
                .map(|s| parse_formats(&s))
                .unwrap_or(defaults.image_formats),
            host: get("HOST").unwrap_or(defaults.host),
            port: parse_var(&lookup, "PORT", defaults.port)?,
        })
    }

    /// Socket address string the server binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: {:?}", key, raw)),
        _ => Ok(default),
    }
}

fn parse_formats(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|f| f.trim().trim_start_matches('.').to_lowercase())
        .filter(|f| !f.is_empty())
        .collect()
}
