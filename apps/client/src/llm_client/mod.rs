//! LLM client — the single gateway for Claude API calls in the Zogakzogak
//! client.
//!
//! ARCHITECTURAL RULE: no other module may call the Anthropic API directly.
//! The emotion and recognition services both go through here.
//!
//! Model: claude-sonnet-4-5 (hardcoded — do not make configurable to prevent drift)

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// The model used for all LLM calls.
/// This is intentionally hardcoded to prevent accidental drift.
pub const MODEL: &str = "claude-sonnet-4-5";
/// Scoring and vision replies are tiny; a small cap keeps latency down on a
/// phone connection.
const MAX_TOKENS: u32 = 1024;
const MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Gave up after {attempts} attempts")]
    RateLimited { attempts: u32 },
}

/// A base64-encoded image attached to a prompt.
#[derive(Debug, Clone)]
pub struct ImageAttachment {
    /// e.g. "image/jpeg" or "image/png"
    pub media_type: String,
    /// base64 payload, without the data-URI prefix
    pub data: String,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    /// Scoring must be repeatable; both services run at temperature zero.
    temperature: f32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: Vec<RequestBlock<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RequestBlock<'a> {
    Text { text: &'a str },
    Image { source: ImageSource<'a> },
}

#[derive(Debug, Serialize)]
struct ImageSource<'a> {
    #[serde(rename = "type")]
    source_type: &'a str,
    media_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub content: Vec<ContentBlock>,
    pub usage: Usage,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl LlmResponse {
    /// All text blocks, concatenated.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter(|b| b.block_type == "text")
            .filter_map(|b| b.text.as_deref())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

/// The single LLM client shared by the emotion and recognition services.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
}

impl LlmClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
        }
    }

    /// Makes a text-only call.
    pub async fn call(&self, prompt: &str, system: &str) -> Result<LlmResponse, LlmError> {
        self.call_with_images(prompt, system, &[]).await
    }

    /// Makes a call with inline base64 images preceding the prompt text.
    /// Rate limits and server errors are retried with exponential backoff;
    /// client errors are returned as-is.
    pub async fn call_with_images(
        &self,
        prompt: &str,
        system: &str,
        images: &[ImageAttachment],
    ) -> Result<LlmResponse, LlmError> {
        let mut content: Vec<RequestBlock> = images
            .iter()
            .map(|img| RequestBlock::Image {
                source: ImageSource {
                    source_type: "base64",
                    media_type: &img.media_type,
                    data: &img.data,
                },
            })
            .collect();
        content.push(RequestBlock::Text { text: prompt });

        let body = AnthropicRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            temperature: 0.0,
            system,
            messages: vec![AnthropicMessage {
                role: "user",
                content,
            }],
        };

        let mut backoff = Duration::from_secs(1);
        let mut last_error = None;

        for attempt in 1..=MAX_ATTEMPTS {
            match self.attempt(&body).await {
                Ok(response) => return Ok(response),
                Err(e) if retryable(&e) && attempt < MAX_ATTEMPTS => {
                    warn!(
                        "LLM call attempt {attempt} failed ({e}); retrying in {}s",
                        backoff.as_secs()
                    );
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            attempts: MAX_ATTEMPTS,
        }))
    }

    async fn attempt(&self, body: &AnthropicRequest<'_>) -> Result<LlmResponse, LlmError> {
        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<AnthropicError>(&raw)
                .map(|e| e.error.message)
                .unwrap_or(raw);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: LlmResponse = response.json().await?;
        debug!(
            "LLM call used {} input / {} output tokens",
            parsed.usage.input_tokens, parsed.usage.output_tokens
        );
        Ok(parsed)
    }
}

fn retryable(error: &LlmError) -> bool {
    match error {
        LlmError::Http(_) => true,
        LlmError::Api { status, .. } => *status == 429 || *status >= 500,
        LlmError::RateLimited { .. } => false,
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
pub(crate) fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"joy\": 50}\n```";
        assert_eq!(strip_json_fences(input), "{\"joy\": 50}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"joy\": 50}\n```";
        assert_eq!(strip_json_fences(input), "{\"joy\": 50}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"joy\": 50}";
        assert_eq!(strip_json_fences(input), "{\"joy\": 50}");
    }

    #[test]
    fn test_image_block_serializes_with_type_tags() {
        let block = RequestBlock::Image {
            source: ImageSource {
                source_type: "base64",
                media_type: "image/jpeg",
                data: "aGVsbG8=",
            },
        };
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["type"], "image");
        assert_eq!(json["source"]["type"], "base64");
        assert_eq!(json["source"]["media_type"], "image/jpeg");
    }

    #[test]
    fn test_response_text_concatenates_text_blocks() {
        let response = LlmResponse {
            content: vec![
                ContentBlock {
                    block_type: "text".to_string(),
                    text: Some("yes".to_string()),
                },
                ContentBlock {
                    block_type: "tool_use".to_string(),
                    text: None,
                },
                ContentBlock {
                    block_type: "text".to_string(),
                    text: Some("indeed".to_string()),
                },
            ],
            usage: Usage {
                input_tokens: 1,
                output_tokens: 1,
            },
        };
        assert_eq!(response.text(), "yes\nindeed");
    }

    #[test]
    fn test_rate_limit_and_server_errors_are_retryable() {
        assert!(retryable(&LlmError::Api {
            status: 429,
            message: String::new()
        }));
        assert!(retryable(&LlmError::Api {
            status: 503,
            message: String::new()
        }));
        assert!(!retryable(&LlmError::Api {
            status: 400,
            message: String::new()
        }));
    }
}
