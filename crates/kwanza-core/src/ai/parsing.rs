//! Payload extraction and validation for AI provider responses
//!
//! Models frequently wrap their JSON in a fenced code block; these helpers
//! strip the wrapper, parse the remainder, and check the kind-specific shape
//! before anything is persisted.

use serde_json::Value;

use crate::error::{Error, Result};
use crate::models::{CreditResponse, ForecastReport, FraudReport};

/// Extract the structured payload from free-form model output
///
/// Strips an optional ```json ... ``` (or bare ```) wrapper and parses the
/// remaining text. Parse failure is a hard error carrying a truncated echo of
/// the raw response for diagnosis.
pub fn extract_json_payload(raw: &str) -> Result<Value> {
    let mut text = raw.trim();

    if let Some(stripped) = text.strip_prefix("```json") {
        text = stripped;
    } else if let Some(stripped) = text.strip_prefix("```") {
        text = stripped;
    }
    if let Some(stripped) = text.strip_suffix("```") {
        text = stripped;
    }

    serde_json::from_str(text.trim())
        .map_err(|e| Error::InvalidData(format!("Invalid JSON from AI: {} | Raw: {}", e, preview(raw))))
}

/// Parse and validate a cash-flow forecast response
pub fn parse_forecast(raw: &str) -> Result<ForecastReport> {
    let value = extract_json_payload(raw)?;
    serde_json::from_value(value).map_err(|e| {
        Error::InvalidData(format!(
            "Forecast response did not match the expected shape: {}",
            e
        ))
    })
}

/// Parse and validate a fraud detection response
pub fn parse_fraud_report(raw: &str) -> Result<FraudReport> {
    let value = extract_json_payload(raw)?;
    serde_json::from_value(value).map_err(|e| {
        Error::InvalidData(format!(
            "Fraud response did not match the expected shape: {}",
            e
        ))
    })
}

/// Parse and validate a credit analysis response
///
/// A response that parses but lacks the `credit_analysis_report` field fails
/// with a provider error, distinct from a parse failure.
pub fn parse_credit_response(raw: &str) -> Result<CreditResponse> {
    let value = extract_json_payload(raw)?;

    if value.get("credit_analysis_report").is_none() {
        return Err(Error::Provider(
            "AI response missing 'credit_analysis_report' field.".to_string(),
        ));
    }

    serde_json::from_value(value).map_err(|e| {
        Error::InvalidData(format!(
            "Credit response did not match the expected shape: {}",
            e
        ))
    })
}

/// First 200 characters of a raw response, for error messages
fn preview(raw: &str) -> String {
    if raw.chars().count() > 200 {
        format!("{}...", raw.chars().take(200).collect::<String>())
    } else {
        raw.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{sample_credit_response, sample_forecast, sample_fraud_report};

    #[test]
    fn test_extract_plain_json() {
        let value = extract_json_payload(r#"{"a": 1}"#).unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn test_extract_fenced_json() {
        let value = extract_json_payload("```json\n{\"a\": 1}\n```").unwrap();
        assert_eq!(value["a"], 1);

        let value = extract_json_payload("```\n{\"a\": 2}\n```").unwrap();
        assert_eq!(value["a"], 2);
    }

    #[test]
    fn test_extract_rejects_non_json() {
        let err = extract_json_payload("I could not produce a forecast today").unwrap_err();
        assert!(err.to_string().contains("Invalid JSON from AI"));
    }

    #[test]
    fn test_parse_forecast_roundtrip() {
        let raw = serde_json::to_string(&sample_forecast()).unwrap();
        let report = parse_forecast(&format!("```json\n{}\n```", raw)).unwrap();
        assert_eq!(
            report.cash_flow_forecast.next_month_prediction_aoa,
            1_200_000.75
        );
        assert_eq!(report.currency, "AOA");
    }

    #[test]
    fn test_parse_forecast_wrong_shape() {
        let err = parse_forecast(r#"{"improvement_tips": []}"#).unwrap_err();
        assert!(err.to_string().contains("expected shape"));
    }

    #[test]
    fn test_parse_fraud_roundtrip() {
        let raw = serde_json::to_string(&sample_fraud_report()).unwrap();
        let report = parse_fraud_report(&raw).unwrap();
        assert_eq!(report.fraud_report.len(), 2);
        assert_eq!(
            report.fraud_report[0].transaction_id.as_deref(),
            Some("sample_txn_1")
        );
    }

    #[test]
    fn test_parse_credit_roundtrip() {
        let raw = serde_json::to_string(&sample_credit_response()).unwrap();
        let response = parse_credit_response(&raw).unwrap();
        assert_eq!(response.credit_analysis_report.credit_score, "Good (7/10)");
    }

    #[test]
    fn test_parse_credit_missing_report_field_is_distinct() {
        let err = parse_credit_response(r#"{"currency": "AOA"}"#).unwrap_err();
        match err {
            Error::Provider(message) => {
                assert!(message.contains("credit_analysis_report"));
            }
            other => panic!("expected a provider error, got: {}", other),
        }
    }
}
