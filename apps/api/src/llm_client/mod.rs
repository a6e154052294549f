/// LLM Client: the single point of entry for language-model calls.
///
/// No other module talks to the model endpoint directly; summarization goes
/// through here. Speaks the Anthropic Messages wire format.
use std::time::Duration;

use anyhow::Context;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;

pub mod prompts;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 2048;
const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The endpoint still answered 429 on the final attempt.
    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,
}

impl LlmError {
    /// True when the model answered but its output could not be used.
    pub fn is_output_error(&self) -> bool {
        matches!(self, LlmError::Parse(_) | LlmError::EmptyContent)
    }
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
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
    /// Extracts the text content from the first text block.
    pub fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
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

/// Connection settings for the model endpoint.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub api_url: String,
    pub model: String,
    pub api_key: String,
    pub timeout: Duration,
    /// Total attempts per call, including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each further one.
    pub backoff_base: Duration,
}

/// Wraps the Messages API with bounded retry and structured output helpers.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    settings: LlmSettings,
}

impl LlmClient {
    pub fn new(settings: LlmSettings) -> Result<Self, LlmError> {
        let client = Client::builder().timeout(settings.timeout).build()?;
        Ok(Self { client, settings })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let api_key = config
            .llm_api_key
            .clone()
            .context("LLM_API_KEY is required for the llm summarizer backend")?;
        let settings = LlmSettings {
            api_url: config.llm_api_url.clone(),
            model: config.llm_model.clone(),
            api_key,
            timeout: Duration::from_secs(config.llm_timeout_secs),
            max_attempts: config.llm_max_retries.max(1),
            backoff_base: DEFAULT_BACKOFF_BASE,
        };
        Ok(Self::new(settings)?)
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    /// Makes a raw call to the model, returning the full response object.
    /// Retries connection errors, 429 and 5xx with exponential backoff.
    /// Any other non-success status is returned immediately.
    pub async fn call(&self, prompt: &str, system: &str) -> Result<LlmResponse, LlmError> {
        let request_body = AnthropicRequest {
            model: &self.settings.model,
            max_tokens: MAX_TOKENS,
            temperature: 0.0,
            system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: prompt,
            }],
        };

        let max_attempts = self.settings.max_attempts.max(1);
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            let response = self
                .client
                .post(&self.settings.api_url)
                .header("x-api-key", &self.settings.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("content-type", "application/json")
                .json(&request_body)
                .send()
                .await;

            let retryable = match response {
                Err(e) => LlmError::Http(e),
                Ok(response) => {
                    let status = response.status();

                    if status.as_u16() == 429 || status.is_server_error() {
                        let body = response.text().await.unwrap_or_default();
                        warn!("LLM API returned {}: {}", status, body);
                        if status.as_u16() == 429 {
                            LlmError::RateLimited {
                                retries: attempt - 1,
                            }
                        } else {
                            LlmError::Api {
                                status: status.as_u16(),
                                message: body,
                            }
                        }
                    } else if !status.is_success() {
                        let body = response.text().await.unwrap_or_default();
                        let message = serde_json::from_str::<AnthropicError>(&body)
                            .map(|e| e.error.message)
                            .unwrap_or(body);
                        return Err(LlmError::Api {
                            status: status.as_u16(),
                            message,
                        });
                    } else {
                        let llm_response: LlmResponse = response.json().await?;

                        debug!(
                            "LLM call succeeded: input_tokens={}, output_tokens={}",
                            llm_response.usage.input_tokens, llm_response.usage.output_tokens
                        );

                        return Ok(llm_response);
                    }
                }
            };

            if attempt >= max_attempts {
                return Err(retryable);
            }

            // Exponential backoff: base, 2x base, 4x base
            let delay = self.settings.backoff_base * (1 << (attempt - 1));
            warn!(
                "LLM call attempt {} failed ({}), retrying after {}ms...",
                attempt,
                retryable,
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Calls the model and deserializes the text response as JSON.
    /// The prompt must instruct the model to return valid JSON.
    pub async fn call_json<T: DeserializeOwned>(
        &self,
        prompt: &str,
        system: &str,
    ) -> Result<T, LlmError> {
        let response = self.call(prompt, system).await?;

        let text = response.text().ok_or(LlmError::EmptyContent)?;

        // Strip markdown code fences if the model wraps JSON in them
        let text = strip_json_fences(text);

        serde_json::from_str(text).map_err(LlmError::Parse)
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
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
pub(crate) mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};
    use serde_json::json;

    pub(crate) fn client_for(server: &MockServer, max_attempts: u32) -> LlmClient {
        LlmClient::new(LlmSettings {
            api_url: server.url("/v1/messages"),
            model: "test-model".to_string(),
            api_key: "test-key".to_string(),
            timeout: Duration::from_secs(5),
            max_attempts,
            backoff_base: Duration::from_millis(10),
        })
        .expect("client")
    }

    pub(crate) fn text_reply(text: &str) -> serde_json::Value {
        json!({
            "content": [{"type": "text", "text": text}],
            "usage": {"input_tokens": 12, "output_tokens": 34}
        })
    }

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[tokio::test]
    async fn test_call_json_sends_auth_headers_and_parses_fenced_output() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/messages")
                    .header("x-api-key", "test-key")
                    .header("anthropic-version", ANTHROPIC_VERSION);
                then.status(200)
                    .json_body(text_reply("```json\n{\"answer\": 42}\n```"));
            })
            .await;

        let client = client_for(&server, 1);
        let value: serde_json::Value = client.call_json("prompt", "system").await.unwrap();
        assert_eq!(value["answer"], 42);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/messages");
                then.status(400)
                    .json_body(json!({"error": {"message": "bad request"}}));
            })
            .await;

        let client = client_for(&server, 3);
        let err = client.call("prompt", "system").await.unwrap_err();
        match err {
            LlmError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "bad request");
            }
            other => panic!("unexpected {other:?}"),
        }
        mock.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn test_server_errors_are_retried_up_to_the_attempt_limit() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/messages");
                then.status(503).body("overloaded");
            })
            .await;

        let client = client_for(&server, 3);
        let err = client.call("prompt", "system").await.unwrap_err();
        assert!(matches!(err, LlmError::Api { status: 503, .. }));
        assert!(!err.is_output_error());
        mock.assert_hits_async(3).await;
    }

    #[tokio::test]
    async fn test_exhausted_rate_limit_is_reported_as_rate_limited() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/messages");
                then.status(429).body("slow down");
            })
            .await;

        let client = client_for(&server, 2);
        let err = client.call("prompt", "system").await.unwrap_err();
        assert!(matches!(err, LlmError::RateLimited { retries: 1 }));
        mock.assert_hits_async(2).await;
    }

    #[tokio::test]
    async fn test_connection_errors_are_retried() {
        let client = LlmClient::new(LlmSettings {
            api_url: "http://127.0.0.1:1/v1/messages".to_string(),
            model: "test-model".to_string(),
            api_key: "test-key".to_string(),
            timeout: Duration::from_secs(2),
            max_attempts: 2,
            backoff_base: Duration::from_millis(10),
        })
        .expect("client");
        let err = client.call("prompt", "system").await.unwrap_err();
        assert!(matches!(err, LlmError::Http(_)));
    }

    #[tokio::test]
    async fn test_non_json_output_is_output_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/messages");
                then.status(200).json_body(text_reply("I cannot help with that."));
            })
            .await;

        let client = client_for(&server, 1);
        let err = client
            .call_json::<serde_json::Value>("prompt", "system")
            .await
            .unwrap_err();
        assert!(err.is_output_error());
    }
}
