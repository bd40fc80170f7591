//! AI report collections
//!
//! Three append-only collections: forecasts, credit reports, risk reports.
//! Reports are immutable once stored; reads only ever return the most
//! recently created report of a kind.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::{CreditReport, ForecastReport};

/// A report as stored, with its assigned id and creation timestamp
#[derive(Debug, Clone)]
pub struct StoredReport<T> {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub report: T,
}

impl Database {
    /// Append a cash-flow forecast to `ai_forecasts`
    pub fn insert_forecast(&self, report: &ForecastReport) -> Result<i64> {
        self.insert_report("ai_forecasts", report)
    }

    /// Most recent forecast, if any
    pub fn latest_forecast(&self) -> Result<Option<StoredReport<ForecastReport>>> {
        self.latest_report("ai_forecasts")
    }

    /// Append a credit analysis report to `ai_credit_reports`
    pub fn insert_credit_report(&self, report: &CreditReport) -> Result<i64> {
        self.insert_report("ai_credit_reports", report)
    }

    /// Most recent credit report, if any
    pub fn latest_credit_report(&self) -> Result<Option<StoredReport<CreditReport>>> {
        self.latest_report("ai_credit_reports")
    }

    /// Append a free-form risk report to `ai_risk_reports`
    pub fn insert_risk_report(&self, report: &Value) -> Result<i64> {
        self.insert_report("ai_risk_reports", report)
    }

    /// Most recent risk report, if any
    pub fn latest_risk_report(&self) -> Result<Option<StoredReport<Value>>> {
        self.latest_report("ai_risk_reports")
    }

    fn insert_report<T: Serialize>(&self, table: &str, report: &T) -> Result<i64> {
        let conn = self.conn()?;

        conn.execute(
            &format!("INSERT INTO {} (body) VALUES (?)", table),
            params![serde_json::to_string(report)?],
        )?;

        Ok(conn.last_insert_rowid())
    }

    fn latest_report<T: DeserializeOwned>(&self, table: &str) -> Result<Option<StoredReport<T>>> {
        let conn = self.conn()?;

        let row: Option<(i64, String, String)> = conn
            .query_row(
                &format!(
                    "SELECT id, body, created_at FROM {} ORDER BY created_at DESC, id DESC LIMIT 1",
                    table
                ),
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        match row {
            Some((id, body, created_at)) => Ok(Some(StoredReport {
                id,
                created_at: parse_datetime(&created_at),
                report: serde_json::from_str(&body)?,
            })),
            None => Ok(None),
        }
    }
}
