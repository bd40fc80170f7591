//! Transaction file upload handler

use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::info;

use crate::{AppError, AppState, MAX_UPLOAD_SIZE};
use kwanza_core::error::Error;
use kwanza_core::ingest::{self, FileFormat};

/// POST /api/upload_transactions - Ingest a CSV/XLSX transaction file
///
/// Expects a multipart form with a `transaction_file` field. Row-level
/// validation failures never abort the batch; the response status reflects
/// the mix of outcomes (200 full success, 207 partial, 400 total failure).
pub async fn upload_transactions(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut filename: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(&format!("Failed to read form field: {}", e)))?
    {
        if field.name() == Some("transaction_file") {
            filename = field.file_name().map(|s| s.to_string());

            let bytes = field
                .bytes()
                .await
                .map_err(|_| AppError::bad_request("Failed to read file data"))?;

            if bytes.len() > MAX_UPLOAD_SIZE {
                return Err(AppError::bad_request(&format!(
                    "File too large. Maximum size is {} MB",
                    MAX_UPLOAD_SIZE / 1024 / 1024
                )));
            }

            file_data = Some(bytes.to_vec());
        }
    }

    let Some(file_data) = file_data else {
        return Err(AppError::bad_request("No file part in the request"));
    };

    let filename = filename.unwrap_or_default();
    if filename.is_empty() {
        return Err(AppError::bad_request("No selected file"));
    }

    let Some(format) = FileFormat::from_filename(&filename) else {
        return Err(AppError::bad_request(
            "File type not allowed. Please upload CSV or XLSX.",
        ));
    };

    let report = match ingest::ingest(&state.db, format, &file_data) {
        Ok(report) => report,
        // File-level failures: unreadable file, missing columns
        Err(e @ (Error::Import(_) | Error::Spreadsheet(_) | Error::Csv(_))) => {
            return Err(AppError::bad_request(&e.to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    info!(
        filename = %filename,
        imported = report.imported,
        errors = report.errors.len(),
        "Processed transaction upload"
    );

    let errors: Vec<String> = report.errors.iter().map(|e| e.to_string()).collect();

    let response = if report.imported > 0 && errors.is_empty() {
        (
            StatusCode::OK,
            Json(json!({
                "message": format!("{} transactions imported successfully.", report.imported),
            })),
        )
    } else if report.imported > 0 {
        (
            StatusCode::MULTI_STATUS,
            Json(json!({
                "message": format!("{} transactions imported successfully.", report.imported),
                "errors": errors,
            })),
        )
    } else if !errors.is_empty() {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "Failed to import any transactions. See errors.",
                "errors": errors,
            })),
        )
    } else {
        (
            StatusCode::OK,
            Json(json!({
                "message": "No transactions found or processed in the file.",
            })),
        )
    };

    Ok(response.into_response())
}
