//! LLM OCR Server - upload an image or PDF, get its text back.

use llm_ocr_server::config::Settings;
use llm_ocr_server::ocr::lm_studio::LmStudioRecognizer;
use llm_ocr_server::pdf::LopdfEngine;
use llm_ocr_server::{api, OcrService};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "llm_ocr_server=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::from_env()?;
    info!(
        "Recognition endpoint: {} (model: {})",
        settings.endpoint.base_url, settings.endpoint.model
    );

    let client = reqwest::Client::builder().build()?;
    let recognizer = LmStudioRecognizer::new(client, &settings.endpoint, settings.timeouts.clone());
    let service = OcrService::new(&settings, Arc::new(LopdfEngine), Arc::new(recognizer));

    let app = api::router(Arc::new(service));

    // Run server
    let addr = settings.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
