//! Transaction handlers

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;

use crate::{AppError, AppState};
use kwanza_core::db::TransactionFilter;
use kwanza_core::ingest::parse_payment_date;
use kwanza_core::models::{NewTransaction, Transaction, TransactionKind, TransactionStatus};

/// Response for a successfully created transaction
#[derive(Serialize)]
pub struct AddTransactionResponse {
    pub message: String,
    pub transaction: Transaction,
}

/// POST /api/transactions - Add a single transaction
///
/// Accepts `amount` as either a number or a numeric string, and
/// `payment_date` as YYYY-MM-DD or an ISO date-time.
pub async fn add_transaction(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> Result<Response, AppError> {
    if !body.is_object() || body.as_object().is_some_and(|o| o.is_empty()) {
        return Err(AppError::bad_request("No input data provided"));
    }

    let tx = validate_new_transaction(&body)?;

    let id = state.db.insert_transaction(&tx)?;
    let stored: Transaction = state
        .db
        .get_transaction(id)?
        .ok_or_else(|| AppError::internal("Failed to add transaction"))?;

    Ok((
        StatusCode::CREATED,
        Json(AddTransactionResponse {
            message: "Transaction added successfully".to_string(),
            transaction: stored,
        }),
    )
        .into_response())
}

/// GET /api/transactions - List transactions with equality filters
///
/// Query parameters map directly onto record fields; a filter on an unknown
/// field matches nothing.
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<Transaction>>, AppError> {
    let filter =
        TransactionFilter::from_pairs(params.iter().map(|(k, v)| (k.as_str(), v.as_str())));

    let transactions = state.db.list_transactions(&filter)?;

    Ok(Json(transactions))
}

/// Validate a raw JSON body into a `NewTransaction`, naming the offending
/// field on failure
fn validate_new_transaction(body: &Value) -> Result<NewTransaction, AppError> {
    let field = |name: &str| -> Result<&Value, AppError> {
        body.get(name)
            .filter(|v| !v.is_null())
            .ok_or_else(|| AppError::bad_request(&format!("Missing field: {}", name)))
    };

    let kind: TransactionKind = field("type")?
        .as_str()
        .and_then(|s| s.trim().parse().ok())
        .ok_or_else(|| AppError::bad_request("Invalid 'type', must be 'income' or 'expense'"))?;

    let description = field("description")?
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::bad_request("Invalid 'description', must be non-empty text"))?
        .to_string();

    let amount = match field("amount")? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| AppError::bad_request("Invalid 'amount', must be a number"))?;

    let payment_date = field("payment_date")?
        .as_str()
        .and_then(parse_payment_date)
        .ok_or_else(|| {
            AppError::bad_request("Invalid 'payment_date' format, expected YYYY-MM-DD")
        })?;

    let status: TransactionStatus = field("status")?
        .as_str()
        .and_then(|s| s.trim().parse().ok())
        .ok_or_else(|| {
            AppError::bad_request("Invalid 'status', must be 'paid', 'pending', or 'scheduled'")
        })?;

    Ok(NewTransaction {
        kind,
        description,
        amount,
        payment_date,
        status,
    })
}
