//! Domain models for Kwanza

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The designated currency code for all monetary fields.
pub const CURRENCY: &str = "AOA";

/// Key under which fraud results are merged into `ai_analysis_results`.
pub const FRAUD_ANALYSIS_KEY: &str = "fraud_guard";

/// Transaction direction
///
/// Uploaded files from Angolan users commonly carry the Portuguese
/// vocabulary, so parsing accepts both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl std::str::FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "income" | "receita" => Ok(Self::Income),
            "expense" | "despesa" => Ok(Self::Expense),
            _ => Err(format!("Unknown transaction type: {}", s)),
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payment status of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Paid,
    Pending,
    Scheduled,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Paid => "paid",
            Self::Pending => "pending",
            Self::Scheduled => "scheduled",
        }
    }
}

impl std::str::FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "paid" | "pago" => Ok(Self::Paid),
            "pending" | "pendente" => Ok(Self::Pending),
            "scheduled" | "agendado" => Ok(Self::Scheduled),
            _ => Err(format!("Unknown transaction status: {}", s)),
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A stored transaction
///
/// Identifiers are rendered as strings on every JSON surface; the fraud
/// analysis contract echoes them back in that form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(with = "id_string")]
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub description: String,
    pub amount: f64,
    pub payment_date: NaiveDate,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    /// Analysis kind -> result sub-record. Empty at creation, never absent.
    pub ai_analysis_results: Map<String, Value>,
}

/// A transaction awaiting insertion (store assigns id, created_at, and the
/// empty analysis map)
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub kind: TransactionKind,
    pub description: String,
    pub amount: f64,
    pub payment_date: NaiveDate,
    pub status: TransactionStatus,
}

/// Normalized fraud result merged into a transaction's analysis map
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FraudAssessment {
    pub is_suspicious: bool,
    pub reason: Option<String>,
    pub risk_score: Option<f64>,
    pub recommended_action: Option<String>,
    pub last_scanned_at: DateTime<Utc>,
}

/// Cash-flow forecast report (persisted to `ai_forecasts`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastReport {
    pub cash_flow_forecast: CashFlowForecast,
    pub improvement_tips: Vec<String>,
    /// Free-form percentage breakdowns (ratio, savings rate, top categories)
    pub evaluation_percentages: Value,
    pub currency: String,
    /// Chart series consumed by the forecast tab front-end
    #[serde(default)]
    pub chart_data: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashFlowForecast {
    #[serde(rename = "next_month_prediction_AOA")]
    pub next_month_prediction_aoa: f64,
    #[serde(rename = "three_month_total_AOA")]
    pub three_month_total_aoa: f64,
    pub trend_description: String,
    pub confidence_score: f64,
}

/// Fraud scan result returned to the caller
///
/// Not persisted as a document; entries are merged into their transactions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FraudReport {
    pub fraud_report: Vec<FraudEntry>,
    pub summary: FraudSummary,
    #[serde(default = "default_currency")]
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FraudEntry {
    #[serde(default)]
    pub transaction_id: Option<String>,
    pub is_suspicious: bool,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub risk_score: Option<f64>,
    #[serde(default)]
    pub recommended_action: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FraudSummary {
    pub total_transactions_scanned: i64,
    pub suspicious_transactions_found: i64,
    /// Low / Medium / High
    pub overall_risk_level: String,
}

/// Credit analysis report (persisted to `ai_credit_reports`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditReport {
    pub credit_score: String,
    #[serde(rename = "recommended_credit_limit_AOA")]
    pub recommended_credit_limit_aoa: f64,
    pub key_positive_factors: Vec<String>,
    pub key_negative_factors: Vec<String>,
    pub assessment_summary: String,
    /// High / Medium / Low
    pub confidence_level: String,
}

/// Full credit analysis response envelope from the provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditResponse {
    pub credit_analysis_report: CreditReport,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    CURRENCY.to_string()
}

/// Serialize i64 ids as JSON strings, accept strings or numbers on input
mod id_string {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(id: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(id)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Num(i64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Num(n) => Ok(n),
            Raw::Text(s) => s.parse().map_err(de::Error::custom),
        }
    }
}
