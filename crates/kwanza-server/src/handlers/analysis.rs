//! AI analysis handlers
//!
//! The three flows share a pattern: with no AI backend configured, answer
//! with the fixed sample payload (persisting it for forecast/credit so the
//! storage path is exercised in demo mode); otherwise build a prompt from
//! stored transactions, call the provider, validate the response, persist,
//! and return. Provider and parse failures degrade to a 500 envelope that
//! still carries usable fallback data.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde_json::json;
use tracing::{error, warn};

use crate::{AppError, AppState};
use kwanza_core::ai::{parsing, AiClient, AnalysisBackend};
use kwanza_core::analysis;
use kwanza_core::db::TransactionFilter;
use kwanza_core::error::Error;
use kwanza_core::models::{
    CreditResponse, ForecastReport, FraudAssessment, FraudReport, FRAUD_ANALYSIS_KEY,
};

/// POST /api/analyze_cashflow - Cash-flow forecast for the next 3 months
pub async fn analyze_cashflow(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let Some(ai) = state.ai.clone() else {
        warn!("AI backend not configured. Returning sample forecast.");
        let sample = analysis::sample_forecast();
        store_forecast(&state, &sample);
        return Ok((StatusCode::OK, Json(sample)).into_response());
    };

    let transactions = state.db.list_transactions(&TransactionFilter::default())?;
    if transactions.is_empty() {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "No transactions available for analysis"})),
        )
            .into_response());
    }

    let prompt = analysis::forecast_prompt(&transactions, Utc::now().date_naive());

    let report = match generate_forecast(&ai, &prompt).await {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "Cash-flow analysis failed");
            return Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Failed to get analysis from AI. Using sample data.",
                    "details": e.to_string(),
                    "sample_data": analysis::fallback_forecast(),
                })),
            )
                .into_response());
        }
    };

    store_forecast(&state, &report);

    Ok((StatusCode::OK, Json(report)).into_response())
}

async fn generate_forecast(ai: &AiClient, prompt: &str) -> kwanza_core::Result<ForecastReport> {
    let raw = ai.generate(prompt).await?;
    parsing::parse_forecast(&raw)
}

/// The analysis result is returned regardless of persistence outcome; a
/// store failure is reported through logging only.
fn store_forecast(state: &AppState, report: &ForecastReport) {
    if let Err(e) = state.db.insert_forecast(report) {
        error!(error = %e, "Failed to store AI forecast");
    }
}

/// POST /api/detect_fraud - Per-transaction suspicion assessment
pub async fn detect_fraud(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let Some(ai) = state.ai.clone() else {
        warn!("AI backend not configured. Returning sample fraud report.");
        return Ok((StatusCode::OK, Json(analysis::sample_fraud_report())).into_response());
    };

    let transactions = state.db.list_transactions(&TransactionFilter::default())?;
    if transactions.is_empty() {
        return Ok((
            StatusCode::OK,
            Json(json!({"message": "No transactions found to analyze."})),
        )
            .into_response());
    }

    let prompt = analysis::fraud_prompt(&transactions);

    let report = match generate_fraud(&ai, &prompt).await {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "Fraud analysis failed");
            return Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Failed to get fraud analysis from AI. Using sample data.",
                    "details": e.to_string(),
                    "sample_data": analysis::fallback_fraud(),
                })),
            )
                .into_response());
        }
    };

    merge_fraud_entries(&state, &report);

    Ok((StatusCode::OK, Json(report)).into_response())
}

async fn generate_fraud(ai: &AiClient, prompt: &str) -> kwanza_core::Result<FraudReport> {
    let raw = ai.generate(prompt).await?;
    parsing::parse_fraud_report(&raw)
}

/// Merge each returned entry into its transaction's analysis map
///
/// Entries with unknown or non-numeric ids are logged and skipped; merges
/// are row-isolated, so one failure never discards the rest of the report.
fn merge_fraud_entries(state: &AppState, report: &FraudReport) {
    let scanned_at = Utc::now();

    for entry in &report.fraud_report {
        let Some(ref id_str) = entry.transaction_id else {
            continue;
        };

        let Ok(id) = id_str.parse::<i64>() else {
            warn!(transaction_id = %id_str, "Fraud entry carries a non-numeric transaction id");
            continue;
        };

        let assessment = FraudAssessment {
            is_suspicious: entry.is_suspicious,
            reason: entry.reason.clone(),
            risk_score: entry.risk_score,
            recommended_action: entry.recommended_action.clone(),
            last_scanned_at: scanned_at,
        };

        let value = match serde_json::to_value(&assessment) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Failed to serialize fraud assessment");
                continue;
            }
        };

        match state.db.merge_analysis_result(id, FRAUD_ANALYSIS_KEY, &value) {
            Ok(true) => {}
            Ok(false) => {
                warn!(transaction_id = id, "Fraud entry references an unknown transaction")
            }
            Err(e) => {
                warn!(transaction_id = id, error = %e, "Failed to merge fraud assessment")
            }
        }
    }
}

/// POST /api/analyze_credit - Creditworthiness assessment over the trailing
/// 180 days
pub async fn analyze_credit(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let Some(ai) = state.ai.clone() else {
        warn!("AI backend not configured. Returning sample credit analysis.");
        let sample = analysis::sample_credit_response();
        store_credit_report(&state, &sample);
        return Ok((StatusCode::OK, Json(sample)).into_response());
    };

    let transactions = state.db.list_transactions(&TransactionFilter::default())?;
    if transactions.is_empty() {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "No transactions available for credit analysis"})),
        )
            .into_response());
    }

    let (summary, highlights) = analysis::financial_summary(&transactions, Utc::now());
    let prompt = analysis::credit_prompt(&summary, &highlights);

    let raw = match ai.generate(&prompt).await {
        Ok(raw) => raw,
        Err(e) => return Ok(credit_failure_response(&e)),
    };

    let response = match parsing::parse_credit_response(&raw) {
        Ok(response) => response,
        // A response that parsed but lacks the report field is surfaced
        // as-is, without fallback data
        Err(Error::Provider(message)) => {
            error!(%message, "Credit analysis response incomplete");
            return Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": message})),
            )
                .into_response());
        }
        Err(e) => return Ok(credit_failure_response(&e)),
    };

    store_credit_report(&state, &response);

    Ok((StatusCode::OK, Json(response)).into_response())
}

fn credit_failure_response(e: &Error) -> Response {
    error!(error = %e, "Credit analysis failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": "Failed to get credit analysis from AI. Using sample data.",
            "details": e.to_string(),
            "sample_data": analysis::fallback_credit(&e.to_string()),
        })),
    )
        .into_response()
}

fn store_credit_report(state: &AppState, response: &CreditResponse) {
    if let Err(e) = state.db.insert_credit_report(&response.credit_analysis_report) {
        error!(error = %e, "Failed to store AI credit report");
    }
}
