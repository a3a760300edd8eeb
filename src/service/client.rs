//! HTTP client for OpenAI-compatible chat completion APIs.
//!
//! Sends one system message and one user message, asks for a low
//! temperature, and returns the first choice's content with any surrounding
//! markdown code fence removed.

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{GenerationRequest, GenerationService, ServiceError, DEFAULT_SYSTEM_DIRECTIVE};

/// Default URL of the hosted API.
pub const DEFAULT_URL: &str = "https://api.deepseek.com/v1";

/// Default model for code generation.
pub const DEFAULT_MODEL: &str = "deepseek-coder";

/// Connection settings for [`ChatClient`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatClientConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
}

impl Default for ChatClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_URL.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.1,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// HTTP client for a chat completions endpoint.
#[derive(Debug, Clone)]
pub struct ChatClient {
    config: ChatClientConfig,
    client: Client,
}

impl ChatClient {
    pub fn new(config: ChatClientConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    pub fn config(&self) -> &ChatClientConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    /// Send a request and return the cleaned completion text.
    pub async fn chat(&self, request: &GenerationRequest) -> Result<String, ServiceError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(ServiceError::MissingApiKey)?;

        let system = request.system.as_deref().unwrap_or(DEFAULT_SYSTEM_DIRECTIVE);
        let payload = json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": request.prompt },
            ],
            "temperature": self.config.temperature,
        });

        tracing::debug!(
            endpoint = %self.endpoint(),
            model = %self.config.model,
            prompt_chars = request.prompt.len(),
            "sending completion request"
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ServiceError::Unauthorized,
                _ => ServiceError::Server(format!("{}: {}", status, body)),
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::MalformedResponse(e.to_string()))?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ServiceError::MalformedResponse("response has no choices".to_string()))?;

        Ok(strip_code_fence(&content).to_string())
    }
}

impl GenerationService for ChatClient {
    async fn complete(&self, request: &GenerationRequest) -> Result<String, ServiceError> {
        self.chat(request).await
    }
}

/// Remove a leading ```` ```json ```` / ```` ``` ```` line and a trailing fence.
pub(crate) fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the language tag on the opening line.
    let rest = match rest.find('\n') {
        Some(i) if rest[..i].chars().all(|c| c.is_ascii_alphanumeric()) => &rest[i + 1..],
        _ => strip_inline_tag(rest),
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Drop a tag glued to the body, as in "```json[...]```".
fn strip_inline_tag(rest: &str) -> &str {
    if !rest.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return rest;
    }
    let tag_len = rest
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(rest.len());
    let body = &rest[tag_len..];
    if body.starts_with(['[', '{']) {
        body
    } else {
        rest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_fence() {
        let text = "```json\n[{\"path\":\"a\",\"contents\":\"b\"}]\n```";
        assert_eq!(strip_code_fence(text), "[{\"path\":\"a\",\"contents\":\"b\"}]");
    }

    #[test]
    fn strips_bare_fence() {
        assert_eq!(strip_code_fence("```\n[]\n```\n"), "[]");
    }

    #[test]
    fn strips_single_line_fence_with_tag() {
        let text = "```json[{\"path\":\"a\",\"contents\":\"b\"}]```";
        assert_eq!(strip_code_fence(text), "[{\"path\":\"a\",\"contents\":\"b\"}]");
    }

    #[test]
    fn strips_single_line_fence_without_tag() {
        assert_eq!(strip_code_fence("```[1]```"), "[1]");
    }

    #[test]
    fn keeps_single_line_text_that_is_not_json() {
        assert_eq!(strip_code_fence("```sorry```"), "sorry");
    }

    #[test]
    fn leaves_plain_text_alone() {
        assert_eq!(strip_code_fence("  [1, 2]  "), "[1, 2]");
    }
}
