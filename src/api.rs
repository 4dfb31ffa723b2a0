//! HTTP front end: multipart upload in, JSON out.

use crate::error::{ErrorKind, OcrError, RecognitionFailure};
use crate::schema::{extension_of, AggregatedOutcome};
use crate::service::OcrService;
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

/// Room for multipart framing on top of the file itself.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<OcrService>,
}

pub fn router(service: Arc<OcrService>) -> Router {
    let body_limit = service.limits().max_file_size_bytes + MULTIPART_OVERHEAD;

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/ocr", post(process_ocr))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(AppState { service })
}

// ============================================================================
// Handlers
// ============================================================================

async fn root() -> Json<serde_json::Value> {
    Json(json!({"message": "OCR API Server is running", "status": "healthy"}))
}

async fn health() -> &'static str {
    "ok"
}

#[derive(Serialize)]
struct OcrResponse {
    success: bool,
    filename: String,
    #[serde(flatten)]
    outcome: AggregatedOutcome,
    processing_time: f64,
}

#[derive(Serialize)]
struct OcrFailure {
    success: bool,
    error: String,
    kind: String,
    processing_time: f64,
    filename: String,
}

/// Upload an image or PDF and extract its text.
async fn process_ocr(State(state): State<AppState>, multipart: Multipart) -> Response {
    let span = info_span!("ocr", request_id = %Uuid::new_v4());
    handle_upload(state, multipart).instrument(span).await
}

async fn handle_upload(state: AppState, mut multipart: Multipart) -> Response {
    let started = Instant::now();

    let (filename, data) = match read_file_field(&mut multipart).await {
        Ok(Some(upload)) => upload,
        Ok(None) => {
            return failure(
                StatusCode::BAD_REQUEST,
                "No file provided".to_string(),
                "bad_request",
                started,
                "unknown",
            )
        }
        Err((status, message)) => {
            return failure(status, message, upload_error_kind(status), started, "unknown")
        }
    };

    info!("Received file: {} ({} bytes)", filename, data.len());

    let declared_type = extension_of(&filename).unwrap_or_default().to_string();
    match state.service.process(data, &filename, &declared_type).await {
        Ok(outcome) => Json(OcrResponse {
            success: true,
            filename,
            outcome,
            processing_time: elapsed_secs(started),
        })
        .into_response(),
        Err(e) => {
            error!("OCR failed for {}: {}", filename, e);
            failure(
                status_for(e.kind()),
                user_message(&e),
                e.kind().as_str(),
                started,
                &filename,
            )
        }
    }
}

/// First `file` field of the form; `None` if absent or unnamed.
async fn read_file_field(
    multipart: &mut Multipart,
) -> Result<Option<(String, Vec<u8>)>, (StatusCode, String)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (e.status(), format!("Multipart error: {}", e.body_text())))?
    {
        if field.name() == Some("file") {
            let filename = match field.file_name() {
                Some(name) if !name.is_empty() => name.to_string(),
                _ => return Ok(None),
            };
            let data = field
                .bytes()
                .await
                .map_err(|e| (e.status(), format!("Failed to read file: {}", e.body_text())))?;
            return Ok(Some((filename, data.to_vec())));
        }
    }
    Ok(None)
}

// ============================================================================
// Helper functions
// ============================================================================

/// Kind reported when the upload itself could not be read.
fn upload_error_kind(status: StatusCode) -> &'static str {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        ErrorKind::TooLarge.as_str()
    } else {
        "bad_request"
    }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::UnsupportedType | ErrorKind::Decode | ErrorKind::TooManyPages => {
            StatusCode::BAD_REQUEST
        }
        ErrorKind::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        ErrorKind::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Render => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Short message shown to API clients. Upstream details stay in the logs.
fn user_message(e: &OcrError) -> String {
    match e {
        OcrError::ServiceUnavailable(inner) => match inner.failure {
            RecognitionFailure::Transport => "OCR service unavailable".to_string(),
            RecognitionFailure::Timeout => "Processing timeout".to_string(),
            RecognitionFailure::Status(_)
            | RecognitionFailure::InvalidBody
            | RecognitionFailure::NoChoices
            | RecognitionFailure::EmptyContent => "OCR model error".to_string(),
        },
        OcrError::Render { .. } => "PDF processing failed".to_string(),
        other => other.to_string(),
    }
}

fn failure(
    status: StatusCode,
    error: String,
    kind: &str,
    started: Instant,
    filename: &str,
) -> Response {
    let body = OcrFailure {
        success: false,
        error,
        kind: kind.to_string(),
        processing_time: elapsed_secs(started),
        filename: filename.to_string(),
    };
    (status, Json(body)).into_response()
}

fn elapsed_secs(started: Instant) -> f64 {
    (started.elapsed().as_secs_f64() * 100.0).round() / 100.0
}
