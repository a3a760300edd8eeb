//! Boundary to the external text-generation service.
//!
//! The pipeline only needs "prompt in, text out". [`ChatClient`] talks to an
//! OpenAI-compatible chat completions endpoint; [`CannedService`] returns a
//! fixed response for offline runs and tests.

mod client;
mod prompt;

use std::future::Future;

use thiserror::Error;

pub use client::{ChatClient, ChatClientConfig};
pub use prompt::{build_prompt, count_words, DEFAULT_SYSTEM_DIRECTIVE, MANIFEST_FORMAT_INSTRUCTIONS};

/// Generation service errors.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unauthorized: API key required or invalid")]
    Unauthorized,

    #[error("Server error: {0}")]
    Server(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("No API key configured (set GENFORGE_API_KEY or DEEPSEEK_API_KEY)")]
    MissingApiKey,
}

impl ServiceError {
    /// Errors that no amount of retrying or fallback wrapping can fix.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Unauthorized | Self::MissingApiKey)
    }
}

/// A single completion request.
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    pub prompt: String,
    /// System/style directive, used by agentic coding flows.
    pub system: Option<String>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system: None,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

/// Anything that turns a prompt into free-form text.
pub trait GenerationService: Send + Sync {
    fn complete(
        &self,
        request: &GenerationRequest,
    ) -> impl Future<Output = Result<String, ServiceError>> + Send;
}

/// Returns the same text for every request.
#[derive(Debug, Clone)]
pub struct CannedService {
    response: String,
}

impl CannedService {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
        }
    }
}

impl GenerationService for CannedService {
    async fn complete(&self, _request: &GenerationRequest) -> Result<String, ServiceError> {
        Ok(self.response.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canned_service_ignores_the_request() {
        let service = CannedService::new("[]");
        let first = tokio_test::block_on(service.complete(&GenerationRequest::new("a")));
        let second = tokio_test::block_on(service.complete(&GenerationRequest::new("b").with_system("s")));
        assert_eq!(first.unwrap(), "[]");
        assert_eq!(second.unwrap(), "[]");
    }

    #[test]
    fn only_auth_errors_are_configuration_errors() {
        assert!(ServiceError::Unauthorized.is_configuration());
        assert!(ServiceError::MissingApiKey.is_configuration());
        assert!(!ServiceError::Server("502".into()).is_configuration());
        assert!(!ServiceError::MalformedResponse("empty".into()).is_configuration());
    }
}
