//! Kwanza Core Library
//!
//! Shared functionality for the Kwanza finance backend:
//! - Storage layer (transactions, AI report collections)
//! - Tabular ingestion (CSV/XLSX uploads with per-row validation)
//! - Analysis request builders and sample payloads
//! - Pluggable AI backends (Gemini, mock) with response validation

pub mod ai;
pub mod analysis;
pub mod db;
pub mod error;
pub mod ingest;
pub mod models;

pub use ai::{AiClient, AnalysisBackend, GeminiBackend, MockBackend};
pub use db::{Database, StoredReport, TransactionFilter};
pub use error::{Error, Result};
pub use ingest::{FileFormat, IngestReport, RowError};
pub use models::{
    CreditReport, CreditResponse, ForecastReport, FraudAssessment, FraudEntry, FraudReport,
    NewTransaction, Transaction, TransactionKind, TransactionStatus,
};
