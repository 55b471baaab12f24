//! Client for the upstream chat-completions provider
//!
//! Requests are always streamed; the raw SSE bytes are handed back untouched
//! and decoded by the caller.

use crate::generation::{ByteStream, GenerationError, error_message};
use crate::prompts::ChatMessage;
use futures::StreamExt;
use serde_json::json;
use tracing::{debug, warn};
use url::Url;

const REFERER: &str = "https://github.com/pagesmith/pagesmith";
const TITLE: &str = "Pagesmith";

/// Anything that can stream a chat completion as raw SSE bytes
#[async_trait::async_trait]
pub trait ChatCompletions: Send + Sync {
    async fn stream_chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<ByteStream, GenerationError>;
}

/// OpenAI/OpenRouter style `/chat/completions` endpoint
pub struct UpstreamClient {
    http: reqwest::Client,
    url: Url,
    api_key: String,
    max_tokens: u32,
}

impl UpstreamClient {
    pub fn new(http: reqwest::Client, url: Url, api_key: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            http,
            url,
            api_key: api_key.into(),
            max_tokens,
        }
    }
}

#[async_trait::async_trait]
impl ChatCompletions for UpstreamClient {
    async fn stream_chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<ByteStream, GenerationError> {
        let body = json!({
            "model": model,
            "messages": messages,
            "max_tokens": self.max_tokens,
            "stream": true,
        });

        debug!("Requesting completion from {} with model {}", self.url, model);
        let response = self
            .http
            .post(self.url.clone())
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", REFERER)
            .header("X-Title", TITLE)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = error_message(&text, status.as_u16());
            warn!("Upstream returned {}: {}", status, message);
            return Err(GenerationError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(GenerationError::from))
            .boxed())
    }
}
