//! Anthropic Messages API runner
//!
//! One request per work item, no internal retries: backoff belongs to the
//! scheduler, so every failure is reported straight back as a `RunnerError`.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{Runner, RunnerError};
use crate::config::LlmConfig;
use crate::domain::{ModelBudget, WorkItem};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Phrases the API uses when the input does not fit the context window
const TOKEN_LIMIT_MARKERS: [&str; 3] = ["prompt is too long", "too many tokens", "context length"];

fn is_token_limit_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    TOKEN_LIMIT_MARKERS.iter().any(|m| lower.contains(m))
}

/// Runner backed by Anthropic's Messages API
pub struct AnthropicRunner {
    model: String,
    api_key: String,
    base_url: String,
    http: Client,
    max_tokens: u32,
    timeout: Duration,
}

impl AnthropicRunner {
    /// Create a runner from LLM settings and the model budget
    ///
    /// Reads the API key from the environment variable named in config.
    pub fn from_config(config: &LlmConfig, budget: &ModelBudget) -> Result<Self, RunnerError> {
        debug!(model = %budget.name, base_url = %config.base_url, "AnthropicRunner::from_config: called");
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| RunnerError::Config(format!("{} is not set", config.api_key_env)))?;

        let timeout = Duration::from_millis(config.timeout_ms);
        let http = Client::builder().timeout(timeout).build().map_err(RunnerError::Network)?;

        Ok(Self {
            model: budget.name.clone(),
            api_key,
            base_url: config.base_url.clone(),
            http,
            max_tokens: budget.max_tokens,
            timeout,
        })
    }

    /// Build the request body for the Anthropic API
    fn build_request_body(&self, item: &WorkItem) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": [
                { "role": "user", "content": item.user },
            ],
        });
        if !item.system.is_empty() {
            body["system"] = serde_json::json!(item.system);
        }
        body
    }

    fn classify_status(status: u16, message: String) -> RunnerError {
        if status == 400 && is_token_limit_message(&message) {
            debug!(status, "classify_status: token limit");
            return RunnerError::TokenLimit(message);
        }
        RunnerError::Api { status, message }
    }

    async fn send(&self, item: &WorkItem) -> Result<String, RunnerError> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = self.build_request_body(item);

        let response = self
            .http
            .post(url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RunnerError::Timeout(self.timeout)
                } else {
                    RunnerError::Network(e)
                }
            })?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            debug!(id = item.id, status, "send: API error");
            return Err(Self::classify_status(status, text));
        }

        let api_response: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| RunnerError::InvalidResponse(e.to_string()))?;
        Ok(api_response.text())
    }
}

#[async_trait]
impl Runner for AnthropicRunner {
    async fn chat(&self, item: &WorkItem, cancel: CancellationToken) -> Result<String, RunnerError> {
        debug!(id = item.id, model = %self.model, "AnthropicRunner::chat: called");
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(id = item.id, "AnthropicRunner::chat: cancelled");
                Err(RunnerError::Cancelled)
            }
            result = self.send(item) => result,
        }
    }
}

// Anthropic API response types

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
}

impl AnthropicResponse {
    fn text(self) -> String {
        self.content
            .into_iter()
            .filter_map(|block| match block {
                AnthropicContentBlock::Text { text } => Some(text),
                AnthropicContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum AnthropicContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner() -> AnthropicRunner {
        AnthropicRunner {
            model: "claude-haiku".to_string(),
            api_key: "test-key".to_string(),
            base_url: "http://127.0.0.1:9".to_string(),
            http: Client::new(),
            max_tokens: 512,
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_build_request_body() {
        let body = runner().build_request_body(&WorkItem::new(1, "You are terse", "Hello"));

        assert_eq!(body["model"], "claude-haiku");
        assert_eq!(body["max_tokens"], 512);
        assert_eq!(body["system"], "You are terse");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "Hello");
    }

    #[test]
    fn test_build_request_body_without_system() {
        let body = runner().build_request_body(&WorkItem::new(1, "", "Hello"));
        assert!(body.get("system").is_none());
    }

    #[test]
    fn test_classify_token_limit() {
        let err = AnthropicRunner::classify_status(400, "prompt is too long: 210000 tokens > 200000 maximum".to_string());
        assert!(matches!(err, RunnerError::TokenLimit(_)));
        assert!(err.is_retryable());

        let err = AnthropicRunner::classify_status(400, "invalid request".to_string());
        assert!(matches!(err, RunnerError::Api { status: 400, .. }));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_response_text_joins_text_blocks() {
        let json = r#"{"content": [{"type": "text", "text": "Hello, "}, {"type": "thinking", "thinking": "hm"}, {"type": "text", "text": "world"}]}"#;
        let response: AnthropicResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.text(), "Hello, world");
    }

    #[tokio::test]
    async fn test_chat_honours_cancellation() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = runner().chat(&WorkItem::new(1, "", "hi"), cancel).await;
        assert!(matches!(result, Err(RunnerError::Cancelled)));
    }
}
