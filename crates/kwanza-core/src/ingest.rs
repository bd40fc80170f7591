//! Tabular transaction ingestion
//!
//! Parses an uploaded CSV or XLSX file into transaction records. File-level
//! problems (unreadable file, missing columns) fail the whole batch; row-level
//! problems are collected per row and never abort the import.

use std::io::Cursor;

use calamine::{Data, Reader, Xlsx};
use chrono::NaiveDate;
use csv::ReaderBuilder;
use tracing::debug;

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{NewTransaction, TransactionKind, TransactionStatus};

/// Supported upload formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Xlsx,
}

impl FileFormat {
    /// Detect the format from a filename extension. Returns None for
    /// anything other than `.csv` / `.xlsx`.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let ext = std::path::Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())?;
        match ext.to_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "xlsx" => Some(Self::Xlsx),
            _ => None,
        }
    }
}

/// A validation failure scoped to one input row
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    /// 1-indexed row in the source file, counting the header row
    pub row: usize,
    pub message: String,
}

impl std::fmt::Display for RowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Row {}: {}", self.row, self.message)
    }
}

/// A successfully validated row, tagged with its source row number
#[derive(Debug, Clone)]
pub struct ParsedRow {
    pub row_number: usize,
    pub tx: NewTransaction,
}

/// Outcome of parsing an upload, before any store writes
#[derive(Debug, Default)]
pub struct ParsedBatch {
    pub rows: Vec<ParsedRow>,
    pub errors: Vec<RowError>,
}

/// Outcome of a full ingest: rows written plus the accumulated row errors
#[derive(Debug)]
pub struct IngestReport {
    pub imported: usize,
    pub errors: Vec<RowError>,
}

/// Parse and validate an upload without touching the store
pub fn parse_upload(format: FileFormat, bytes: &[u8]) -> Result<ParsedBatch> {
    let table = match format {
        FileFormat::Csv => parse_csv_table(bytes)?,
        FileFormat::Xlsx => parse_xlsx_table(bytes)?,
    };

    let columns = resolve_columns(&table)?;

    let mut batch = ParsedBatch::default();
    for (index, cells) in table.rows.iter().enumerate() {
        // User-facing row numbers match the source file: 1-indexed, after
        // the header row
        let row_number = index + 2;
        match validate_row(cells, &columns) {
            Ok(tx) => batch.rows.push(ParsedRow { row_number, tx }),
            Err(message) => batch.errors.push(RowError {
                row: row_number,
                message,
            }),
        }
    }

    debug!(
        rows = batch.rows.len(),
        errors = batch.errors.len(),
        "Parsed upload"
    );

    Ok(batch)
}

/// Parse an upload and insert every valid row
///
/// Store failures on individual rows join the row-error list; they do not
/// abort the batch.
pub fn ingest(db: &Database, format: FileFormat, bytes: &[u8]) -> Result<IngestReport> {
    let batch = parse_upload(format, bytes)?;

    let mut imported = 0;
    let mut errors = batch.errors;

    for parsed in &batch.rows {
        match db.insert_transaction(&parsed.tx) {
            Ok(_) => imported += 1,
            Err(e) => errors.push(RowError {
                row: parsed.row_number,
                message: format!("Error processing row - {}", e),
            }),
        }
    }

    errors.sort_by_key(|e| e.row);

    Ok(IngestReport { imported, errors })
}

/// A uniform row/column table of strings, however it was parsed
struct Table {
    /// Normalized header names (lower-case, spaces and hyphens -> '_')
    headers: Vec<String>,
    /// Headers exactly as they appeared in the file, for diagnostics
    original_headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

/// One canonical column resolved to its position and source name
struct Column {
    index: usize,
    /// Normalized source header, used in row error messages so they cite
    /// the column the user actually uploaded
    name: String,
}

struct ColumnMap {
    kind: Column,
    description: Column,
    amount: Column,
    payment_date: Column,
    status: Column,
}

fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase().replace([' ', '-'], "_")
}

/// Resolve the canonical columns against the normalized headers
///
/// Each canonical field matches its English name or its Portuguese alias;
/// files from Angolan users commonly carry Portuguese headers.
fn resolve_columns(table: &Table) -> Result<ColumnMap> {
    let find = |aliases: &[&str]| {
        table
            .headers
            .iter()
            .position(|h| aliases.contains(&h.as_str()))
            .map(|index| Column {
                index,
                name: table.headers[index].clone(),
            })
    };

    let mut missing: Vec<&str> = Vec::new();
    let mut require = |canonical: &'static str, aliases: &[&str]| {
        let column = find(aliases);
        if column.is_none() {
            missing.push(canonical);
        }
        column
    };

    let kind = require("type", &["type", "tipo"]);
    let description = require("description", &["description", "descricao"]);
    let amount = require("amount", &["amount", "valor"]);
    let payment_date = require(
        "payment_date",
        &["payment_date", "data_de_pagamento", "data_pagamento"],
    );
    let status = require("status", &["status"]);

    match (kind, description, amount, payment_date, status) {
        (Some(kind), Some(description), Some(amount), Some(payment_date), Some(status)) => {
            Ok(ColumnMap {
                kind,
                description,
                amount,
                payment_date,
                status,
            })
        }
        _ => Err(Error::Import(format!(
            "Missing required columns in file after normalization: {}. Original columns found: {:?}",
            missing.join(", "),
            table.original_headers
        ))),
    }
}

fn parse_csv_table(bytes: &[u8]) -> Result<Table> {
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(Error::Import("The uploaded file is empty.".to_string()));
    }

    let text = decode_text(bytes);

    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let header_record = rdr.headers()?.clone();
    if header_record.is_empty() {
        return Err(Error::Import("The uploaded file is empty.".to_string()));
    }

    let original_headers: Vec<String> = header_record.iter().map(|h| h.to_string()).collect();
    let headers: Vec<String> = original_headers.iter().map(|h| normalize_header(h)).collect();

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let mut cells: Vec<String> = record.iter().map(|c| c.to_string()).collect();
        // Short records pad out so column lookups stay in bounds
        cells.resize(headers.len().max(cells.len()), String::new());
        rows.push(cells);
    }

    Ok(Table {
        headers,
        original_headers,
        rows,
    })
}

/// Decode CSV bytes: UTF-8 first, Latin-1 as the fallback
///
/// Latin-1 maps every byte directly to the code point of the same value, so
/// the fallback cannot fail.
fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

fn parse_xlsx_table(bytes: &[u8]) -> Result<Table> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes.to_vec()))
        .map_err(|e| Error::Spreadsheet(format!("Failed to open XLSX: {}", e)))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| Error::Import("The uploaded file is empty.".to_string()))?
        .map_err(|e| Error::Spreadsheet(format!("Failed to read worksheet: {}", e)))?;

    let mut row_iter = range.rows();
    let header_cells = row_iter
        .next()
        .ok_or_else(|| Error::Import("The uploaded file is empty.".to_string()))?;

    let original_headers: Vec<String> = header_cells.iter().map(cell_to_string).collect();
    let headers: Vec<String> = original_headers.iter().map(|h| normalize_header(h)).collect();

    let rows: Vec<Vec<String>> = row_iter
        .map(|cells| cells.iter().map(cell_to_string).collect())
        .collect();

    Ok(Table {
        headers,
        original_headers,
        rows,
    })
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64()),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(_) => String::new(),
    }
}

/// Convert an Excel serial date to ISO format
pub fn excel_serial_to_date(serial: f64) -> String {
    // Excel epoch is 1899-12-30 (accounting for the 1900 leap year bug)
    let base = NaiveDate::from_ymd_opt(1899, 12, 30).unwrap();
    let date = base + chrono::Duration::days(serial as i64);
    date.format("%Y-%m-%d").to_string()
}

fn validate_row(cells: &[String], columns: &ColumnMap) -> std::result::Result<NewTransaction, String> {
    let cell = |col: &Column| cells.get(col.index).map(String::as_str).unwrap_or("");

    let kind_raw = cell(&columns.kind).trim().to_lowercase();
    let description = cell(&columns.description).trim().to_string();
    let amount_raw = cell(&columns.amount).trim().to_string();
    let date_raw = cell(&columns.payment_date).trim().to_string();
    let status_raw = cell(&columns.status).trim().to_lowercase();

    if amount_raw.is_empty() {
        return Err(format!("'{}' is missing.", columns.amount.name));
    }
    let amount = parse_amount(&amount_raw).map_err(|_| {
        format!(
            "'{}' ({}) is not a valid number.",
            columns.amount.name, amount_raw
        )
    })?;

    if date_raw.is_empty() {
        return Err(format!("'{}' is missing.", columns.payment_date.name));
    }
    let payment_date = parse_payment_date(&date_raw).ok_or_else(|| {
        format!(
            "'{}' ({}) is not a valid date.",
            columns.payment_date.name, date_raw
        )
    })?;

    if kind_raw.is_empty() {
        return Err(format!("'{}' is missing.", columns.kind.name));
    }
    if description.is_empty() {
        return Err(format!("'{}' is missing.", columns.description.name));
    }
    if status_raw.is_empty() {
        return Err(format!("'{}' is missing.", columns.status.name));
    }

    let kind: TransactionKind = kind_raw.parse().map_err(|_| {
        format!(
            "Invalid '{}': {}. Must be 'income' or 'expense'.",
            columns.kind.name, kind_raw
        )
    })?;
    let status: TransactionStatus = status_raw.parse().map_err(|_| {
        format!(
            "Invalid '{}': {}. Must be 'paid', 'pending', or 'scheduled'.",
            columns.status.name, status_raw
        )
    })?;

    Ok(NewTransaction {
        kind,
        description,
        amount,
        payment_date,
        status,
    })
}

/// Parse an amount string, handling currency markers and separators
pub fn parse_amount(s: &str) -> Result<f64> {
    let cleaned: String = s
        .trim()
        .replace("Kz", "")
        .replace(['$', ',', ' '], "")
        .replace('(', "-")
        .replace(')', "");

    cleaned
        .parse::<f64>()
        .map_err(|_| Error::Import(format!("Unable to parse amount: {}", s)))
}

/// Parse a payment date in the common representations uploads carry
///
/// ISO dates, ISO date-times (time-of-day truncated), day-first and
/// month-first slash formats.
pub fn parse_payment_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();

    let formats = [
        "%Y-%m-%d", // 2024-07-20
        "%d/%m/%Y", // 20/07/2024
        "%m/%d/%Y", // 07/20/2024
        "%d-%m-%Y", // 20-07-2024
        "%Y/%m/%d", // 2024/07/20
    ];

    for fmt in formats {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }

    // ISO date-times: keep the calendar date, drop the time of day
    if let Some((date_part, _)) = s.split_once('T') {
        if let Ok(date) = NaiveDate::parse_from_str(date_part, "%Y-%m-%d") {
            return Some(date);
        }
    }
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.date());
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn csv_batch(content: &str) -> ParsedBatch {
        parse_upload(FileFormat::Csv, content.as_bytes()).unwrap()
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(FileFormat::from_filename("txs.csv"), Some(FileFormat::Csv));
        assert_eq!(FileFormat::from_filename("TXS.XLSX"), Some(FileFormat::Xlsx));
        assert_eq!(FileFormat::from_filename("txs.pdf"), None);
        assert_eq!(FileFormat::from_filename("no_extension"), None);
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1,234.56").unwrap(), 1234.56);
        assert_eq!(parse_amount("-123.45").unwrap(), -123.45);
        assert_eq!(parse_amount("(100.00)").unwrap(), -100.00);
        assert_eq!(parse_amount("Kz 1500").unwrap(), 1500.0);
        assert!(parse_amount("abc").is_err());
    }

    #[test]
    fn test_parse_payment_date() {
        let expected = NaiveDate::from_ymd_opt(2024, 7, 20).unwrap();
        assert_eq!(parse_payment_date("2024-07-20"), Some(expected));
        assert_eq!(parse_payment_date("20/07/2024"), Some(expected));
        assert_eq!(parse_payment_date("2024-07-20T15:30:00"), Some(expected));
        assert_eq!(parse_payment_date("2024-07-20 15:30:00"), Some(expected));
        assert_eq!(parse_payment_date("not a date"), None);
    }

    #[test]
    fn test_excel_serial_to_date() {
        assert_eq!(excel_serial_to_date(45667.0), "2025-01-10");
    }

    #[test]
    fn test_cell_to_string() {
        assert_eq!(cell_to_string(&Data::Float(1500.0)), "1500");
        assert_eq!(cell_to_string(&Data::Float(800.5)), "800.5");
        assert_eq!(cell_to_string(&Data::Int(7)), "7");
        assert_eq!(cell_to_string(&Data::String("Salary".to_string())), "Salary");
        assert_eq!(cell_to_string(&Data::Empty), "");
    }

    #[test]
    fn test_parse_valid_english_csv() {
        let batch = csv_batch(
            "type,description,amount,payment_date,status\n\
             income,Salary,1500,2024-07-20,paid\n\
             expense,Office rent,800.50,2024-07-21,pending\n",
        );

        assert_eq!(batch.rows.len(), 2);
        assert!(batch.errors.is_empty());
        assert_eq!(batch.rows[0].row_number, 2);
        assert_eq!(batch.rows[0].tx.kind, TransactionKind::Income);
        assert_eq!(batch.rows[1].tx.amount, 800.50);
        assert_eq!(batch.rows[1].tx.status, TransactionStatus::Pending);
    }

    #[test]
    fn test_parse_portuguese_headers_and_values() {
        let batch = csv_batch(
            "tipo,descricao,valor,data_de_pagamento,status\n\
             receita,Salary,1500,2024-07-20,pago\n\
             despesa,Supplies,200,2024-07-21,agendado\n",
        );

        assert_eq!(batch.rows.len(), 2);
        assert!(batch.errors.is_empty());
        assert_eq!(batch.rows[0].tx.kind, TransactionKind::Income);
        assert_eq!(batch.rows[1].tx.kind, TransactionKind::Expense);
        assert_eq!(batch.rows[1].tx.status, TransactionStatus::Scheduled);
    }

    #[test]
    fn test_header_normalization() {
        // Spaces and hyphens in headers normalize to underscores
        let batch = csv_batch(
            "Tipo,Descricao,Valor,Data-de-Pagamento,Status\n\
             receita,Salary,1500,2024-07-20,pago\n",
        );
        assert_eq!(batch.rows.len(), 1);
    }

    #[test]
    fn test_missing_columns_fail_file() {
        let err = parse_upload(
            FileFormat::Csv,
            b"type,description,amount\nincome,Salary,1500\n",
        )
        .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("payment_date"));
        assert!(message.contains("status"));
        // Diagnostics cite the original header names
        assert!(message.contains("type"));
    }

    #[test]
    fn test_row_errors_cite_source_column_and_row() {
        let batch = csv_batch(
            "tipo,descricao,valor,data_de_pagamento,status\n\
             receita,Salary,1500,2024-07-20,pago\n\
             despesa,,200,2024-07-21,pago\n",
        );

        assert_eq!(batch.rows.len(), 1);
        assert_eq!(batch.errors.len(), 1);
        assert_eq!(batch.errors[0].row, 3);
        assert_eq!(batch.errors[0].message, "'descricao' is missing.");
        assert_eq!(batch.errors[0].to_string(), "Row 3: 'descricao' is missing.");
    }

    #[test]
    fn test_invalid_amount_and_date_rows() {
        let batch = csv_batch(
            "type,description,amount,payment_date,status\n\
             income,Salary,abc,2024-07-20,paid\n\
             income,Bonus,100,someday,paid\n\
             income,Refund,,2024-07-20,paid\n",
        );

        assert!(batch.rows.is_empty());
        assert_eq!(batch.errors.len(), 3);
        assert!(batch.errors[0].message.contains("not a valid number"));
        assert!(batch.errors[0].message.contains("abc"));
        assert!(batch.errors[1].message.contains("not a valid date"));
        assert_eq!(batch.errors[2].message, "'amount' is missing.");
    }

    #[test]
    fn test_invalid_enumerated_values() {
        let batch = csv_batch(
            "type,description,amount,payment_date,status\n\
             transfer,Salary,100,2024-07-20,paid\n\
             income,Salary,100,2024-07-20,done\n",
        );

        assert!(batch.rows.is_empty());
        assert_eq!(
            batch.errors[0].message,
            "Invalid 'type': transfer. Must be 'income' or 'expense'."
        );
        assert_eq!(
            batch.errors[1].message,
            "Invalid 'status': done. Must be 'paid', 'pending', or 'scheduled'."
        );
    }

    #[test]
    fn test_row_failures_do_not_abort_batch() {
        let batch = csv_batch(
            "type,description,amount,payment_date,status\n\
             income,Salary,1500,2024-07-20,paid\n\
             bogus,Bad,1,2024-07-20,paid\n\
             expense,Rent,800,2024-07-21,paid\n",
        );

        assert_eq!(batch.rows.len(), 2);
        assert_eq!(batch.errors.len(), 1);
        assert_eq!(batch.errors[0].row, 3);
    }

    #[test]
    fn test_latin1_fallback() {
        // "Café" with 0xE9 is invalid UTF-8 but valid Latin-1
        let mut content: Vec<u8> =
            b"type,description,amount,payment_date,status\nexpense,Caf".to_vec();
        content.push(0xE9);
        content.extend_from_slice(b",300,2024-07-20,paid\n");

        let batch = parse_upload(FileFormat::Csv, &content).unwrap();
        assert_eq!(batch.rows.len(), 1);
        assert_eq!(batch.rows[0].tx.description, "Caf\u{e9}");
    }

    #[test]
    fn test_empty_file() {
        let err = parse_upload(FileFormat::Csv, b"").unwrap_err();
        assert!(err.to_string().contains("empty"));

        let err = parse_upload(FileFormat::Csv, b"   \n  ").unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn test_header_only_file_yields_no_rows_no_errors() {
        let batch = csv_batch("type,description,amount,payment_date,status\n");
        assert!(batch.rows.is_empty());
        assert!(batch.errors.is_empty());
    }

    #[test]
    fn test_ingest_writes_valid_rows() {
        let db = Database::in_memory().unwrap();
        let report = ingest(
            &db,
            FileFormat::Csv,
            b"tipo,descricao,valor,data_de_pagamento,status\n\
              receita,Salary,1500,2024-07-20,pago\n\
              despesa,,200,2024-07-21,pago\n",
        )
        .unwrap();

        assert_eq!(report.imported, 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].row, 3);

        let stored = db
            .list_transactions(&crate::db::TransactionFilter::default())
            .unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].description, "Salary");
    }
}
