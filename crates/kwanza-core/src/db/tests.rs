//! Storage layer tests

use chrono::NaiveDate;
use serde_json::json;

use super::{Database, TransactionFilter};
use crate::models::{
    CashFlowForecast, CreditReport, ForecastReport, NewTransaction, TransactionKind,
    TransactionStatus, CURRENCY, FRAUD_ANALYSIS_KEY,
};

fn sample_tx(description: &str, amount: f64) -> NewTransaction {
    NewTransaction {
        kind: if amount >= 0.0 {
            TransactionKind::Income
        } else {
            TransactionKind::Expense
        },
        description: description.to_string(),
        amount,
        payment_date: NaiveDate::from_ymd_opt(2024, 7, 20).unwrap(),
        status: TransactionStatus::Paid,
    }
}

fn sample_forecast(prediction: f64) -> ForecastReport {
    ForecastReport {
        cash_flow_forecast: CashFlowForecast {
            next_month_prediction_aoa: prediction,
            three_month_total_aoa: prediction * 3.0,
            trend_description: "Stable".to_string(),
            confidence_score: 0.5,
        },
        improvement_tips: vec!["Save more".to_string()],
        evaluation_percentages: json!({"income_vs_expense_ratio": "110%"}),
        currency: CURRENCY.to_string(),
        chart_data: json!({"labels": [], "datasets": []}),
    }
}

#[test]
fn test_insert_and_get_transaction() {
    let db = Database::in_memory().unwrap();

    let id = db.insert_transaction(&sample_tx("Salary", 1500.0)).unwrap();
    let tx = db.get_transaction(id).unwrap().unwrap();

    assert_eq!(tx.id, id);
    assert_eq!(tx.kind, TransactionKind::Income);
    assert_eq!(tx.description, "Salary");
    assert_eq!(tx.amount, 1500.0);
    assert_eq!(tx.payment_date, NaiveDate::from_ymd_opt(2024, 7, 20).unwrap());
    assert_eq!(tx.status, TransactionStatus::Paid);
    // The store initializes the analysis map; empty but present
    assert!(tx.ai_analysis_results.is_empty());
}

#[test]
fn test_get_transaction_missing() {
    let db = Database::in_memory().unwrap();
    assert!(db.get_transaction(999).unwrap().is_none());
}

#[test]
fn test_list_transactions_with_filters() {
    let db = Database::in_memory().unwrap();
    db.insert_transaction(&sample_tx("Salary", 1500.0)).unwrap();
    db.insert_transaction(&sample_tx("Rent", -800.0)).unwrap();
    db.insert_transaction(&sample_tx("Consulting", 400.0)).unwrap();

    let all = db.list_transactions(&TransactionFilter::default()).unwrap();
    assert_eq!(all.len(), 3);

    let incomes = db
        .list_transactions(&TransactionFilter::from_pairs([("type", "income")]))
        .unwrap();
    assert_eq!(incomes.len(), 2);

    let by_description = db
        .list_transactions(&TransactionFilter::from_pairs([("description", "Rent")]))
        .unwrap();
    assert_eq!(by_description.len(), 1);
    assert_eq!(by_description[0].amount, -800.0);
}

#[test]
fn test_list_transactions_by_id() {
    let db = Database::in_memory().unwrap();
    let id = db.insert_transaction(&sample_tx("Salary", 1500.0)).unwrap();
    db.insert_transaction(&sample_tx("Rent", -800.0)).unwrap();

    let found = db
        .list_transactions(&TransactionFilter::from_pairs([(
            "id",
            id.to_string().as_str(),
        )]))
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].description, "Salary");
}

#[test]
fn test_unknown_filter_field_matches_nothing() {
    let db = Database::in_memory().unwrap();
    db.insert_transaction(&sample_tx("Salary", 1500.0)).unwrap();

    let filter = TransactionFilter::from_pairs([("merchant", "anything")]);
    assert!(!filter.is_matchable());
    assert!(db.list_transactions(&filter).unwrap().is_empty());

    // Same for a value the field's type cannot hold
    let filter = TransactionFilter::from_pairs([("type", "transfer")]);
    assert!(db.list_transactions(&filter).unwrap().is_empty());
}

#[test]
fn test_merge_analysis_result_preserves_siblings() {
    let db = Database::in_memory().unwrap();
    let id = db.insert_transaction(&sample_tx("Salary", 1500.0)).unwrap();

    db.merge_analysis_result(id, "cash_flow", &json!({"note": "steady"}))
        .unwrap();
    db.merge_analysis_result(
        id,
        FRAUD_ANALYSIS_KEY,
        &json!({"is_suspicious": false, "risk_score": 0.1}),
    )
    .unwrap();

    let tx = db.get_transaction(id).unwrap().unwrap();
    assert_eq!(tx.ai_analysis_results["cash_flow"]["note"], "steady");
    assert_eq!(
        tx.ai_analysis_results[FRAUD_ANALYSIS_KEY]["is_suspicious"],
        false
    );

    // Overwriting one key leaves the other untouched
    db.merge_analysis_result(
        id,
        FRAUD_ANALYSIS_KEY,
        &json!({"is_suspicious": true, "risk_score": 0.9}),
    )
    .unwrap();

    let tx = db.get_transaction(id).unwrap().unwrap();
    assert_eq!(tx.ai_analysis_results["cash_flow"]["note"], "steady");
    assert_eq!(
        tx.ai_analysis_results[FRAUD_ANALYSIS_KEY]["risk_score"],
        0.9
    );
}

#[test]
fn test_merge_analysis_result_missing_transaction() {
    let db = Database::in_memory().unwrap();
    let merged = db
        .merge_analysis_result(12345, FRAUD_ANALYSIS_KEY, &json!({}))
        .unwrap();
    assert!(!merged);
}

#[test]
fn test_latest_forecast_returns_newest() {
    let db = Database::in_memory().unwrap();
    assert!(db.latest_forecast().unwrap().is_none());

    db.insert_forecast(&sample_forecast(100_000.0)).unwrap();
    db.insert_forecast(&sample_forecast(200_000.0)).unwrap();

    let latest = db.latest_forecast().unwrap().unwrap();
    assert_eq!(
        latest.report.cash_flow_forecast.next_month_prediction_aoa,
        200_000.0
    );
}

#[test]
fn test_latest_credit_report() {
    let db = Database::in_memory().unwrap();
    assert!(db.latest_credit_report().unwrap().is_none());

    let report = CreditReport {
        credit_score: "Good (7/10)".to_string(),
        recommended_credit_limit_aoa: 750_000.0,
        key_positive_factors: vec!["Consistent income".to_string()],
        key_negative_factors: vec![],
        assessment_summary: "Healthy".to_string(),
        confidence_level: "Medium".to_string(),
    };
    db.insert_credit_report(&report).unwrap();

    let latest = db.latest_credit_report().unwrap().unwrap();
    assert_eq!(latest.report.credit_score, "Good (7/10)");
    assert_eq!(latest.report.recommended_credit_limit_aoa, 750_000.0);
}

#[test]
fn test_risk_report_roundtrip() {
    let db = Database::in_memory().unwrap();

    db.insert_risk_report(&json!({"overall_risk_level": "Low"}))
        .unwrap();
    db.insert_risk_report(&json!({"overall_risk_level": "High"}))
        .unwrap();

    let latest = db.latest_risk_report().unwrap().unwrap();
    assert_eq!(latest.report["overall_risk_level"], "High");
}
