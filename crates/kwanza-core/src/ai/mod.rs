//! Pluggable AI provider abstraction
//!
//! - `AnalysisBackend` trait: the one operation every analysis flow needs -
//!   send a prompt, get raw text back
//! - `AiClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Backend implementations: `GeminiBackend`, `MockBackend`
//!
//! # Configuration
//!
//! Environment variables:
//! - `AI_BACKEND`: Backend to use (gemini, mock). Default: gemini
//! - `GEMINI_API_KEY`: API key (required for the gemini backend)
//! - `GEMINI_MODEL`: Model name (default: gemini-pro)
//!
//! When no backend can be constructed, `from_env` returns None and callers
//! fall back to the fixed sample payloads.

pub mod gemini;
mod mock;
pub mod parsing;

pub use gemini::GeminiBackend;
pub use mock::MockBackend;

use async_trait::async_trait;

use crate::error::Result;

/// Trait for AI providers that turn a prompt into raw response text
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// Send a prompt and return the model's raw text response
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Model name (for logging)
    fn model(&self) -> &str;

    /// Host URL (for logging)
    fn host(&self) -> &str;
}

/// Concrete AI client enum
///
/// Provides Clone and compile-time dispatch without Box<dyn> overhead.
#[derive(Clone)]
pub enum AiClient {
    /// Google Gemini (Generative Language API)
    Gemini(GeminiBackend),
    /// Mock backend for tests and keyless demo runs
    Mock(MockBackend),
}

impl AiClient {
    /// Create an AI client from environment variables
    ///
    /// Returns None when the selected backend cannot be constructed (most
    /// commonly: no `GEMINI_API_KEY` set), which puts the analysis endpoints
    /// into sample mode.
    pub fn from_env() -> Option<Self> {
        let backend = std::env::var("AI_BACKEND").unwrap_or_else(|_| "gemini".to_string());

        match backend.to_lowercase().as_str() {
            "gemini" => GeminiBackend::from_env().map(AiClient::Gemini),
            "mock" => Some(AiClient::Mock(MockBackend::new())),
            _ => {
                tracing::warn!(backend = %backend, "Unknown AI_BACKEND, falling back to gemini");
                GeminiBackend::from_env().map(AiClient::Gemini)
            }
        }
    }

    /// Create a mock backend for testing
    pub fn mock() -> Self {
        AiClient::Mock(MockBackend::new())
    }

    /// Create a mock backend that always returns the given text
    pub fn mock_with_response(response: impl Into<String>) -> Self {
        AiClient::Mock(MockBackend::with_response(response))
    }
}

#[async_trait]
impl AnalysisBackend for AiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        match self {
            AiClient::Gemini(b) => b.generate(prompt).await,
            AiClient::Mock(b) => b.generate(prompt).await,
        }
    }

    fn model(&self) -> &str {
        match self {
            AiClient::Gemini(b) => b.model(),
            AiClient::Mock(b) => b.model(),
        }
    }

    fn host(&self) -> &str {
        match self {
            AiClient::Gemini(b) => b.host(),
            AiClient::Mock(b) => b.host(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ai_client_mock() {
        let client = AiClient::mock();
        assert_eq!(client.model(), "mock");
        assert_eq!(client.host(), "mock://localhost");
    }

    #[tokio::test]
    async fn test_mock_override_response() {
        let client = AiClient::mock_with_response("{\"ok\": true}");
        let text = client.generate("anything").await.unwrap();
        assert_eq!(text, "{\"ok\": true}");
    }
}
