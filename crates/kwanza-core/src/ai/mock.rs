//! Mock backend for testing
//!
//! Returns deterministic canned responses without any network access. The
//! default behavior matches the incoming prompt to one of the three analysis
//! flows and replies with that flow's sample payload, so the full
//! request/parse/persist path can run end-to-end in tests and keyless demos.

use async_trait::async_trait;

use crate::analysis::{sample_credit_response, sample_forecast, sample_fraud_report};
use crate::error::Result;

use super::AnalysisBackend;

/// Mock AI backend
#[derive(Clone, Default)]
pub struct MockBackend {
    /// When set, every call returns this text verbatim
    response: Option<String>,
}

impl MockBackend {
    /// Create a mock that answers with the matching sample payload
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock that always returns the given text
    pub fn with_response(response: impl Into<String>) -> Self {
        Self {
            response: Some(response.into()),
        }
    }
}

#[async_trait]
impl AnalysisBackend for MockBackend {
    async fn generate(&self, prompt: &str) -> Result<String> {
        if let Some(ref response) = self.response {
            return Ok(response.clone());
        }

        let value = if prompt.contains("cash flow forecast") {
            serde_json::to_value(sample_forecast())?
        } else if prompt.contains("fraudulent activity") {
            serde_json::to_value(sample_fraud_report())?
        } else if prompt.contains("credit analysis") {
            serde_json::to_value(sample_credit_response())?
        } else {
            serde_json::Value::Object(serde_json::Map::new())
        };

        Ok(serde_json::to_string(&value)?)
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}
