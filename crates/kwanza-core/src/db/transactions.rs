//! Transaction operations

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Row};
use serde_json::{Map, Value};

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::{NewTransaction, Transaction, TransactionKind, TransactionStatus};

/// Equality filter over transaction fields
///
/// Built from raw query pairs. A filter naming an unknown field, or carrying
/// a value the field's type cannot hold, matches no records - the same
/// behavior the query would have against a document store.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub id: Option<i64>,
    pub kind: Option<TransactionKind>,
    pub status: Option<TransactionStatus>,
    pub description: Option<String>,
    pub amount: Option<f64>,
    pub payment_date: Option<NaiveDate>,
    unmatchable: bool,
}

impl TransactionFilter {
    /// Build a filter from raw key/value pairs (e.g. query string parameters)
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut filter = Self::default();
        for (key, value) in pairs {
            match key {
                "id" => match value.parse() {
                    Ok(id) => filter.id = Some(id),
                    Err(_) => filter.unmatchable = true,
                },
                "type" => match value.parse() {
                    Ok(kind) => filter.kind = Some(kind),
                    Err(_) => filter.unmatchable = true,
                },
                "status" => match value.parse() {
                    Ok(status) => filter.status = Some(status),
                    Err(_) => filter.unmatchable = true,
                },
                "description" => filter.description = Some(value.to_string()),
                "amount" => match value.parse() {
                    Ok(amount) => filter.amount = Some(amount),
                    Err(_) => filter.unmatchable = true,
                },
                "payment_date" => match value.parse() {
                    Ok(date) => filter.payment_date = Some(date),
                    Err(_) => filter.unmatchable = true,
                },
                _ => filter.unmatchable = true,
            }
        }
        filter
    }

    /// Whether this filter can match any record at all
    pub fn is_matchable(&self) -> bool {
        !self.unmatchable
    }
}

impl Database {
    /// Insert a transaction, returning its new id
    ///
    /// The store fills in `created_at` and the empty `ai_analysis_results`
    /// map.
    pub fn insert_transaction(&self, tx: &NewTransaction) -> Result<i64> {
        let conn = self.conn()?;

        conn.execute(
            r#"
            INSERT INTO transactions (type, description, amount, payment_date, status, ai_analysis_results)
            VALUES (?, ?, ?, ?, ?, '{}')
            "#,
            params![
                tx.kind.as_str(),
                tx.description,
                tx.amount,
                tx.payment_date.to_string(),
                tx.status.as_str(),
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Fetch a single transaction by id
    pub fn get_transaction(&self, id: i64) -> Result<Option<Transaction>> {
        let conn = self.conn()?;

        let tx = conn
            .query_row(
                r#"
                SELECT id, type, description, amount, payment_date, status, ai_analysis_results, created_at
                FROM transactions WHERE id = ?
                "#,
                params![id],
                Self::row_to_transaction,
            )
            .optional()?;

        Ok(tx)
    }

    /// List transactions matching an equality filter
    pub fn list_transactions(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>> {
        if !filter.is_matchable() {
            return Ok(Vec::new());
        }

        let conn = self.conn()?;

        // Build dynamic WHERE clause
        let mut conditions: Vec<&str> = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(id) = filter.id {
            conditions.push("id = ?");
            params.push(Box::new(id));
        }
        if let Some(kind) = filter.kind {
            conditions.push("type = ?");
            params.push(Box::new(kind.as_str()));
        }
        if let Some(status) = filter.status {
            conditions.push("status = ?");
            params.push(Box::new(status.as_str()));
        }
        if let Some(ref description) = filter.description {
            conditions.push("description = ?");
            params.push(Box::new(description.clone()));
        }
        if let Some(amount) = filter.amount {
            conditions.push("amount = ?");
            params.push(Box::new(amount));
        }
        if let Some(date) = filter.payment_date {
            conditions.push("payment_date = ?");
            params.push(Box::new(date.to_string()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let sql = format!(
            r#"
            SELECT id, type, description, amount, payment_date, status, ai_analysis_results, created_at
            FROM transactions
            {}
            ORDER BY id ASC
            "#,
            where_clause
        );

        let mut stmt = conn.prepare(&sql)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let transactions = stmt
            .query_map(params_refs.as_slice(), Self::row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(transactions)
    }

    /// Merge a value under one key of a transaction's analysis map
    ///
    /// Rewrites only the addressed key; sibling keys already present in the
    /// map are preserved. The read-modify-write runs inside a single SQLite
    /// transaction. Returns false when no such transaction exists.
    pub fn merge_analysis_result(&self, id: i64, key: &str, value: &Value) -> Result<bool> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let existing: Option<String> = tx
            .query_row(
                "SELECT ai_analysis_results FROM transactions WHERE id = ?",
                params![id],
                |row| row.get(0),
            )
            .optional()?;

        let Some(raw) = existing else {
            return Ok(false);
        };

        let mut map: Map<String, Value> = serde_json::from_str(&raw).unwrap_or_default();
        map.insert(key.to_string(), value.clone());

        tx.execute(
            "UPDATE transactions SET ai_analysis_results = ? WHERE id = ?",
            params![serde_json::to_string(&map)?, id],
        )?;
        tx.commit()?;

        Ok(true)
    }

    fn row_to_transaction(row: &Row<'_>) -> rusqlite::Result<Transaction> {
        let kind: String = row.get(1)?;
        let date: String = row.get(4)?;
        let status: String = row.get(5)?;
        let analysis: String = row.get(6)?;
        let created_at: String = row.get(7)?;

        Ok(Transaction {
            id: row.get(0)?,
            kind: kind.parse().map_err(|e| text_conversion_error(1, e))?,
            description: row.get(2)?,
            amount: row.get(3)?,
            payment_date: NaiveDate::parse_from_str(&date, "%Y-%m-%d")
                .map_err(|e| text_conversion_error(4, e.to_string()))?,
            status: status.parse().map_err(|e| text_conversion_error(5, e))?,
            created_at: parse_datetime(&created_at),
            ai_analysis_results: serde_json::from_str(&analysis).unwrap_or_default(),
        })
    }
}

fn text_conversion_error(index: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        index,
        rusqlite::types::Type::Text,
        Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, message)),
    )
}
