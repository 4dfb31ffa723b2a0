//! Client for OpenAI-compatible chat completion endpoints (LM Studio, vLLM,
//! OpenRouter, ...).

use crate::config::ModelEndpoint;
use crate::error::{RecognitionError, RecognitionFailure};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// Sampling parameters for one completion call.
#[derive(Debug, Clone, Copy)]
pub struct Sampling {
    pub temperature: f64,
    pub max_tokens: u32,
    pub timeout: Duration,
}

#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    url: String,
    api_key: String,
    model: String,
}

impl ChatClient {
    pub fn new(client: Client, endpoint: &ModelEndpoint) -> Self {
        Self {
            client,
            url: format!("{}{}", endpoint.base_url.trim_end_matches('/'), COMPLETIONS_PATH),
            api_key: endpoint.api_key.clone(),
            model: endpoint.model.clone(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send one completion request and return the first choice's content.
    ///
    /// Zero choices or a first choice with null content is a failure. An
    /// explicit empty string is returned as is.
    pub async fn complete(
        &self,
        messages: Vec<Message>,
        sampling: Sampling,
    ) -> Result<String, RecognitionError> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            temperature: Some(sampling.temperature),
            max_tokens: Some(sampling.max_tokens),
        };

        debug!("Sending completion request: model={} url={}", request.model, self.url);

        let mut builder = self
            .client
            .post(&self.url)
            .timeout(sampling.timeout)
            .json(&request);
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }

        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(RecognitionError::new(
                RecognitionFailure::Status(status.as_u16()),
                format!("Model API error ({}): {}", status, error_text),
            ));
        }

        let body = response.bytes().await?;
        let response: ChatCompletionResponse = serde_json::from_slice(&body).map_err(|e| {
            RecognitionError::new(
                RecognitionFailure::InvalidBody,
                format!("Failed to parse completion response: {}", e),
            )
        })?;

        if let Some(usage) = &response.usage {
            debug!(
                "Completion usage: {} tokens (prompt: {}, completion: {})",
                usage.total_tokens, usage.prompt_tokens, usage.completion_tokens
            );
        }

        let choice = response.choices.into_iter().next().ok_or_else(|| {
            RecognitionError::new(RecognitionFailure::NoChoices, "No response from model")
        })?;

        choice.message.content.ok_or_else(|| {
            RecognitionError::new(RecognitionFailure::EmptyContent, "Model returned no content")
        })
    }
}

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

// ============================================================================
// Message types
// ============================================================================

/// A user turn; the recognizer never sends system or assistant turns.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    role: &'static str,
    content: MessageContent,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, Serialize)]
struct ImageUrl {
    url: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: MessageContent::Text(content.into()),
        }
    }

    /// Create a user message with text and one JPEG image, inlined as a
    /// base64 data URL.
    pub fn user_with_jpeg(text: impl Into<String>, jpeg: &[u8]) -> Self {
        let data_url = format!("data:image/jpeg;base64,{}", BASE64.encode(jpeg));
        Self {
            role: "user",
            content: MessageContent::Parts(vec![
                ContentPart::Text { text: text.into() },
                ContentPart::ImageUrl {
                    image_url: ImageUrl { url: data_url },
                },
            ]),
        }
    }
}
