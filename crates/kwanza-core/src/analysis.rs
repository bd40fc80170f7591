//! Analysis request building
//!
//! Turns stored transactions into model-ready prompts for the three analysis
//! flows, computes the derived credit summary, and defines the fixed sample
//! payloads used when no AI provider is configured (and the degraded
//! fallbacks carried by error envelopes).

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::models::{
    CashFlowForecast, CreditReport, CreditResponse, ForecastReport, FraudEntry, FraudReport,
    FraudSummary, Transaction, TransactionKind, CURRENCY,
};

/// Window for the credit analysis: trailing 180 days
const CREDIT_WINDOW_DAYS: i64 = 180;

/// How many recent transactions the credit prompt shows verbatim
const CREDIT_HIGHLIGHT_LIMIT: usize = 5;

/// Derived financial summary fed to the credit analysis prompt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialSummary {
    #[serde(rename = "total_income_last_6m_AOA")]
    pub total_income: f64,
    #[serde(rename = "total_expenses_last_6m_AOA")]
    pub total_expenses: f64,
    #[serde(rename = "net_cash_flow_last_6m_AOA")]
    pub net_cash_flow: f64,
    /// Percentage string when income is positive, otherwise "N/A"
    pub calculated_expense_to_income_ratio: String,
    #[serde(rename = "average_monthly_net_flow_AOA")]
    pub average_monthly_net_flow: f64,
    #[serde(rename = "number_of_transactions_last_6m")]
    pub transaction_count: usize,
}

/// A recent transaction rendered for the credit prompt
#[derive(Debug, Clone, Serialize)]
pub struct TransactionHighlight {
    pub date: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub amount: String,
}

/// Compute the trailing-window summary and up to five most-recent highlights
pub fn financial_summary(
    transactions: &[Transaction],
    now: DateTime<Utc>,
) -> (FinancialSummary, Vec<TransactionHighlight>) {
    let cutoff = (now - Duration::days(CREDIT_WINDOW_DAYS)).date_naive();

    let mut recent: Vec<&Transaction> = transactions
        .iter()
        .filter(|t| t.payment_date > cutoff)
        .collect();

    let mut total_income = 0.0;
    let mut total_expenses = 0.0;
    for t in &recent {
        match t.kind {
            TransactionKind::Income => total_income += t.amount,
            TransactionKind::Expense => total_expenses += t.amount,
        }
    }

    let ratio = if total_income > 0.0 {
        format!(
            "{:.2}% (Expense Ratio)",
            (total_expenses / total_income) * 100.0
        )
    } else {
        "N/A".to_string()
    };

    // Rough monthly approximation over the six-month window
    let average_monthly_net_flow = if total_income > 0.0 {
        (total_income - total_expenses) / 6.0
    } else {
        0.0
    };

    let summary = FinancialSummary {
        total_income,
        total_expenses,
        net_cash_flow: total_income - total_expenses,
        calculated_expense_to_income_ratio: ratio,
        average_monthly_net_flow,
        transaction_count: recent.len(),
    };

    recent.sort_by(|a, b| b.payment_date.cmp(&a.payment_date));
    let highlights = recent
        .iter()
        .take(CREDIT_HIGHLIGHT_LIMIT)
        .map(|t| TransactionHighlight {
            date: t.payment_date.to_string(),
            kind: t.kind.to_string(),
            description: t.description.clone(),
            amount: format!("{} {}", t.amount, CURRENCY),
        })
        .collect();

    (summary, highlights)
}

fn forecast_rows(transactions: &[Transaction]) -> Value {
    Value::Array(
        transactions
            .iter()
            .map(|t| {
                json!({
                    "date": t.payment_date.to_string(),
                    "type": t.kind.as_str(),
                    "description": t.description,
                    "amount": t.amount,
                })
            })
            .collect(),
    )
}

fn fraud_rows(transactions: &[Transaction]) -> Value {
    Value::Array(
        transactions
            .iter()
            .map(|t| {
                json!({
                    "id": t.id.to_string(),
                    "date": t.payment_date.to_string(),
                    "description": t.description,
                    "amount": t.amount,
                    "type": t.kind.as_str(),
                })
            })
            .collect(),
    )
}

/// Build the cash-flow forecast prompt
///
/// The embedded JSON example is the contract the provider must return;
/// `ai::parsing` validates against the same shape.
pub fn forecast_prompt(transactions: &[Transaction], today: NaiveDate) -> String {
    let data = serde_json::to_string_pretty(&forecast_rows(transactions)).unwrap_or_default();

    format!(
        r#"Analyze the following financial transactions from Angola and provide a cash flow forecast for the next 3 months.
The current date is {today}.
Data:
{data}

Please return the analysis in JSON format with the following structure:
{{
    "cash_flow_forecast": {{
        "next_month_prediction_AOA": <value>,
        "three_month_total_AOA": <value>,
        "trend_description": "<textual description of the trend>",
        "confidence_score": <0.0 to 1.0>
    }},
    "improvement_tips": [
        "<actionable tip 1>",
        "<actionable tip 2>"
    ],
    "evaluation_percentages": {{
        "income_vs_expense_ratio": "<percentage>%",
        "savings_rate_forecast": "<percentage>%",
        "key_expense_categories": {{
            "<category1>": "<percentage>%",
            "<category2>": "<percentage>%"
        }}
    }},
    "currency": "AOA",
    "chart_data": {{
        "labels": ["<Previous Month>", "<Current Month>", "<Next Month (Forecast)>"],
        "datasets": [
            {{
                "label": "Income (AOA)",
                "data": [<previous_month_income>, <current_month_income>, <forecasted_income>],
                "borderColor": "rgba(75, 192, 192, 1)",
                "backgroundColor": "rgba(75, 192, 192, 0.2)"
            }},
            {{
                "label": "Expenses (AOA)",
                "data": [<previous_month_expenses>, <current_month_expenses>, <forecasted_expenses>],
                "borderColor": "rgba(255, 99, 132, 1)",
                "backgroundColor": "rgba(255, 99, 132, 0.2)"
            }}
        ]
    }}
}}
Ensure all monetary values are in AOA. Provide realistic example values for the chart_data section based on the overall forecast.
The chart_data labels should reflect past, current, and future months relative to the analysis date."#
    )
}

/// Build the fraud detection prompt
pub fn fraud_prompt(transactions: &[Transaction]) -> String {
    let data = serde_json::to_string_pretty(&fraud_rows(transactions)).unwrap_or_default();

    format!(
        r#"Analyze the following financial transactions from Angola for potential fraudulent activity.
For each transaction identified as suspicious, provide a reason, a risk score (0-1), and a recommended action.
Data:
{data}

Please return the analysis in JSON format:
{{
    "fraud_report": [
        {{
            "transaction_id": "<original_transaction_id>",
            "is_suspicious": <true_or_false>,
            "reason": "<explanation_if_suspicious>",
            "risk_score": <0.0_to_1.0_if_suspicious_else_0.0>,
            "recommended_action": "<e.g., Review manually, Block account, No action needed>"
        }}
    ],
    "summary": {{
        "total_transactions_scanned": <count>,
        "suspicious_transactions_found": <count>,
        "overall_risk_level": "<Low/Medium/High based on findings>"
    }},
    "currency": "AOA"
}}
Include entries for ALL transactions scanned, marking non-suspicious ones appropriately.
Ensure all monetary values are in AOA.
The transaction_id in the report must match the original id from the input."#
    )
}

/// Build the credit analysis prompt from the derived summary and highlights
pub fn credit_prompt(summary: &FinancialSummary, highlights: &[TransactionHighlight]) -> String {
    let summary_json = serde_json::to_string_pretty(summary).unwrap_or_default();
    let highlights_json = serde_json::to_string_pretty(highlights).unwrap_or_default();

    format!(
        r#"Perform an automatic credit analysis based on the following financial data for an entity in Angola.
Provide a credit score (a category like Poor, Fair, Good, Excellent, with a 1-10 rating), a recommended credit limit in AOA, and key factors influencing the decision.

Financial Summary (last 6 months):
{summary_json}

Transaction History Highlights (last 6 months, up to 5 transactions):
{highlights_json}

Please return the analysis in JSON format:
{{
    "credit_analysis_report": {{
        "credit_score": "<e.g., Good (7/10)>",
        "recommended_credit_limit_AOA": <value_float_or_int>,
        "key_positive_factors": ["<factor 1>", "<factor 2>"],
        "key_negative_factors": ["<factor 1>"],
        "assessment_summary": "<textual summary of the creditworthiness and financial stability>",
        "confidence_level": "<High/Medium/Low>"
    }},
    "currency": "AOA"
}}
Ensure all monetary values are in AOA. Base your assessment on typical Angolan business context if possible.
Focus on financial stability, income consistency, expense management, and cash flow patterns.
The recommended_credit_limit_AOA must be a numerical value."#
    )
}

/// Fixed forecast returned (and persisted) when no provider is configured
pub fn sample_forecast() -> ForecastReport {
    ForecastReport {
        cash_flow_forecast: CashFlowForecast {
            next_month_prediction_aoa: 1_200_000.75,
            three_month_total_aoa: 3_500_000.00,
            trend_description:
                "Slightly positive cash flow trend expected if current income and expense patterns continue."
                    .to_string(),
            confidence_score: 0.70,
        },
        improvement_tips: vec![
            "Consider reducing discretionary spending on entertainment by 15%.".to_string(),
            "Look for opportunities to increase freelance income by seeking 1-2 new small projects."
                .to_string(),
            "Review monthly subscriptions and cancel any that are unused.".to_string(),
        ],
        evaluation_percentages: json!({
            "income_vs_expense_ratio": "120%",
            "savings_rate_forecast": "15%",
            "key_expense_categories": {
                "Aluguel": "40%",
                "Alimentação": "25%",
                "Transporte": "15%"
            }
        }),
        currency: CURRENCY.to_string(),
        chart_data: json!({
            "labels": ["Mês Anterior", "Mês Atual", "Próximo Mês (Previsto)"],
            "datasets": [
                {
                    "label": "Receitas (AOA)",
                    "data": [1_000_000, 1_100_000, 1_200_000.75],
                    "borderColor": "rgba(75, 192, 192, 1)",
                    "backgroundColor": "rgba(75, 192, 192, 0.2)"
                },
                {
                    "label": "Despesas (AOA)",
                    "data": [800_000, 850_000, 900_000],
                    "borderColor": "rgba(255, 99, 132, 1)",
                    "backgroundColor": "rgba(255, 99, 132, 0.2)"
                }
            ]
        }),
    }
}

/// Fixed fraud report returned when no provider is configured
pub fn sample_fraud_report() -> FraudReport {
    FraudReport {
        fraud_report: vec![
            FraudEntry {
                transaction_id: Some("sample_txn_1".to_string()),
                is_suspicious: true,
                reason: Some(
                    "Unusually large transaction amount compared to typical spending patterns."
                        .to_string(),
                ),
                risk_score: Some(0.85),
                recommended_action: Some("Review manually".to_string()),
            },
            FraudEntry {
                transaction_id: Some("sample_txn_2".to_string()),
                is_suspicious: true,
                reason: Some("Transaction with a new payee in a high-risk category.".to_string()),
                risk_score: Some(0.65),
                recommended_action: Some("Monitor payee activity".to_string()),
            },
        ],
        summary: FraudSummary {
            total_transactions_scanned: 20,
            suspicious_transactions_found: 2,
            overall_risk_level: "Medium".to_string(),
        },
        currency: CURRENCY.to_string(),
    }
}

/// Fixed credit analysis returned (report part persisted) when no provider
/// is configured
pub fn sample_credit_response() -> CreditResponse {
    CreditResponse {
        credit_analysis_report: CreditReport {
            credit_score: "Good (7/10)".to_string(),
            recommended_credit_limit_aoa: 750_000.00,
            key_positive_factors: vec![
                "Consistent income stream noted over the past 6 months.".to_string(),
                "Positive net cash flow on average.".to_string(),
            ],
            key_negative_factors: vec![
                "Occasional high-value expense spikes.".to_string(),
                "Limited history of managing large debts.".to_string(),
            ],
            assessment_summary:
                "The entity shows a generally positive financial health with good repayment capacity. Credit limit recommended with standard caution."
                    .to_string(),
            confidence_level: "Medium".to_string(),
        },
        currency: CURRENCY.to_string(),
    }
}

/// Degraded forecast payload carried inside the 500 error envelope
pub fn fallback_forecast() -> Value {
    json!({
        "cash_flow_forecast": {
            "next_month_prediction_AOA": 50000.0,
            "three_month_total_AOA": 150000.0,
            "trend_description": "Error fetching real data.",
            "confidence_score": 0.1
        },
        "improvement_tips": ["Check API key and network."],
        "evaluation_percentages": {"income_vs_expense_ratio": "N/A"},
        "currency": CURRENCY,
        "chart_data": {"labels": ["M1", "M2", "M3"], "datasets": []}
    })
}

/// Degraded fraud payload carried inside the 500 error envelope
pub fn fallback_fraud() -> Value {
    json!({
        "fraud_report": [],
        "summary": {
            "total_transactions_scanned": 0,
            "suspicious_transactions_found": 0,
            "overall_risk_level": "Error"
        },
        "currency": CURRENCY
    })
}

/// Degraded credit payload carried inside the 500 error envelope
pub fn fallback_credit(details: &str) -> Value {
    json!({
        "credit_analysis_report": {
            "credit_score": "Error Processing (0/10)",
            "recommended_credit_limit_AOA": 0,
            "key_positive_factors": ["Error in processing"],
            "key_negative_factors": [details],
            "assessment_summary": "Could not complete credit assessment due to an internal error.",
            "confidence_level": "Low"
        },
        "currency": CURRENCY
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransactionStatus;
    use chrono::TimeZone;
    use serde_json::Map;

    fn tx(id: i64, kind: TransactionKind, amount: f64, date: NaiveDate) -> Transaction {
        Transaction {
            id,
            kind,
            description: format!("tx-{}", id),
            amount,
            payment_date: date,
            status: TransactionStatus::Paid,
            created_at: Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap(),
            ai_analysis_results: Map::new(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_financial_summary_math() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let txs = vec![
            tx(1, TransactionKind::Income, 1000.0, date),
            tx(2, TransactionKind::Income, 500.0, date),
            tx(3, TransactionKind::Expense, 600.0, date),
        ];

        let (summary, highlights) = financial_summary(&txs, now());
        assert_eq!(summary.total_income, 1500.0);
        assert_eq!(summary.total_expenses, 600.0);
        assert_eq!(summary.net_cash_flow, 900.0);
        assert_eq!(summary.calculated_expense_to_income_ratio, "40.00% (Expense Ratio)");
        assert_eq!(summary.average_monthly_net_flow, 150.0);
        assert_eq!(summary.transaction_count, 3);
        assert_eq!(highlights.len(), 3);
    }

    #[test]
    fn test_financial_summary_excludes_old_transactions() {
        let recent = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let old = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
        let txs = vec![
            tx(1, TransactionKind::Income, 1000.0, recent),
            tx(2, TransactionKind::Income, 9999.0, old),
        ];

        let (summary, _) = financial_summary(&txs, now());
        assert_eq!(summary.total_income, 1000.0);
        assert_eq!(summary.transaction_count, 1);
    }

    #[test]
    fn test_financial_summary_no_income_is_na() {
        // Zero qualifying income must yield "N/A", never a division error
        let txs = vec![tx(
            1,
            TransactionKind::Expense,
            500.0,
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        )];

        let (summary, _) = financial_summary(&txs, now());
        assert_eq!(summary.calculated_expense_to_income_ratio, "N/A");
        assert_eq!(summary.average_monthly_net_flow, 0.0);

        let (empty_summary, highlights) = financial_summary(&[], now());
        assert_eq!(empty_summary.calculated_expense_to_income_ratio, "N/A");
        assert_eq!(empty_summary.transaction_count, 0);
        assert!(highlights.is_empty());
    }

    #[test]
    fn test_highlights_take_five_most_recent() {
        let mut txs = Vec::new();
        for day in 1..=8 {
            txs.push(tx(
                day,
                TransactionKind::Income,
                100.0,
                NaiveDate::from_ymd_opt(2024, 6, day as u32).unwrap(),
            ));
        }

        let (_, highlights) = financial_summary(&txs, now());
        assert_eq!(highlights.len(), 5);
        assert_eq!(highlights[0].date, "2024-06-08");
        assert_eq!(highlights[4].date, "2024-06-04");
        assert_eq!(highlights[0].amount, "100 AOA");
    }

    #[test]
    fn test_forecast_prompt_embeds_data_and_schema() {
        let txs = vec![tx(
            7,
            TransactionKind::Income,
            1500.0,
            NaiveDate::from_ymd_opt(2024, 7, 20).unwrap(),
        )];
        let prompt = forecast_prompt(&txs, NaiveDate::from_ymd_opt(2024, 7, 21).unwrap());

        assert!(prompt.contains("The current date is 2024-07-21"));
        assert!(prompt.contains("\"tx-7\""));
        assert!(prompt.contains("next_month_prediction_AOA"));
        assert!(prompt.contains("\"currency\": \"AOA\""));
        assert!(prompt.contains("chart_data"));
    }

    #[test]
    fn test_fraud_prompt_includes_string_ids() {
        let txs = vec![tx(
            42,
            TransactionKind::Expense,
            900.0,
            NaiveDate::from_ymd_opt(2024, 7, 20).unwrap(),
        )];
        let prompt = fraud_prompt(&txs);

        assert!(prompt.contains("\"id\": \"42\""));
        assert!(prompt.contains("overall_risk_level"));
        assert!(prompt.contains("Low/Medium/High"));
    }

    #[test]
    fn test_credit_prompt_embeds_summary() {
        let (summary, highlights) = financial_summary(
            &[tx(
                1,
                TransactionKind::Income,
                1000.0,
                NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            )],
            now(),
        );
        let prompt = credit_prompt(&summary, &highlights);

        assert!(prompt.contains("total_income_last_6m_AOA"));
        assert!(prompt.contains("credit_analysis_report"));
        assert!(prompt.contains("High/Medium/Low"));
    }

    #[test]
    fn test_sample_payloads_are_deterministic() {
        let a = serde_json::to_value(sample_forecast()).unwrap();
        let b = serde_json::to_value(sample_forecast()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a["currency"], "AOA");
        assert_eq!(a["cash_flow_forecast"]["next_month_prediction_AOA"], 1_200_000.75);

        let fraud = serde_json::to_value(sample_fraud_report()).unwrap();
        assert_eq!(fraud["summary"]["overall_risk_level"], "Medium");

        let credit = serde_json::to_value(sample_credit_response()).unwrap();
        assert_eq!(credit["credit_analysis_report"]["credit_score"], "Good (7/10)");
    }
}
