//! Vision-model recognizer backed by an OpenAI-compatible chat endpoint
//! (LM Studio serving an OCR model by default).

use super::{Recognizer, CLEANUP_CONFIDENCE, FALLBACK_CONFIDENCE, IMAGE_CONFIDENCE};
use crate::chat::{ChatClient, Message, Sampling};
use crate::config::{ModelEndpoint, Timeouts};
use crate::error::RecognitionError;
use crate::schema::{RecognitionResult, ResultSource};
use tracing::{debug, warn};

const OCR_PROMPT: &str = "Please extract all text from this image. Return only the extracted text without any additional formatting or commentary.";
const CLEANUP_PROMPT: &str = "Please clean up and format this extracted text, removing any unnecessary whitespace or formatting artifacts while preserving the original meaning:";

const TEMPERATURE: f64 = 0.1;
const MAX_TOKENS: u32 = 2000;

pub struct LmStudioRecognizer {
    chat: ChatClient,
    timeouts: Timeouts,
}

impl LmStudioRecognizer {
    pub fn new(client: reqwest::Client, endpoint: &ModelEndpoint, timeouts: Timeouts) -> Self {
        Self {
            chat: ChatClient::new(client, endpoint),
            timeouts,
        }
    }

    fn sampling(&self, timeout: std::time::Duration) -> Sampling {
        Sampling {
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            timeout,
        }
    }
}

#[async_trait::async_trait]
impl Recognizer for LmStudioRecognizer {
    fn model(&self) -> &str {
        self.chat.model()
    }

    async fn recognize_image(&self, image: &[u8]) -> Result<RecognitionResult, RecognitionError> {
        debug!("Recognizing image ({} bytes)", image.len());
        let content = self
            .chat
            .complete(
                vec![Message::user_with_jpeg(OCR_PROMPT, image)],
                self.sampling(self.timeouts.recognition),
            )
            .await?;

        Ok(RecognitionResult {
            text: content.trim().to_string(),
            confidence: IMAGE_CONFIDENCE,
            source: ResultSource::Model,
        })
    }

    async fn clean_text(&self, text: &str) -> RecognitionResult {
        debug!("Cleaning extracted text ({} chars)", text.len());
        let prompt = format!("{}\n\n{}", CLEANUP_PROMPT, text);
        match self
            .chat
            .complete(vec![Message::user(prompt)], self.sampling(self.timeouts.cleanup))
            .await
        {
            Ok(content) if !content.trim().is_empty() => RecognitionResult {
                text: content.trim().to_string(),
                confidence: CLEANUP_CONFIDENCE,
                source: ResultSource::Model,
            },
            Ok(_) => {
                warn!("Text cleanup returned nothing, keeping extracted text");
                fallback(text)
            }
            Err(e) => {
                warn!("Text cleanup failed, keeping extracted text: {}", e);
                fallback(text)
            }
        }
    }
}

fn fallback(text: &str) -> RecognitionResult {
    RecognitionResult {
        text: text.to_string(),
        confidence: FALLBACK_CONFIDENCE,
        source: ResultSource::Fallback,
    }
}
