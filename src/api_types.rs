use crate::storage;
use crate::types::currency::Currency;
use crate::types::fire::DEFAULT_RETURN_RATE;
use crate::types::savings_entry::SavingsEntry;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

// can be adjusted to compile with various DB backend support
pub type AppStorage = storage::SqliteStorage;

#[derive(Clone)]
pub struct AppState {
    pub storage: AppStorage,
    pub currency: Currency,
}

impl AppState {
    pub fn new(storage: AppStorage, currency: Currency) -> AppState {
        AppState { storage, currency }
    }

    pub fn entry_views(&self, entries: Vec<SavingsEntry>) -> Vec<EntryView> {
        entries
            .into_iter()
            .map(|e| EntryView::new(e, &self.currency))
            .collect()
    }
}

#[derive(Serialize, Debug)]
pub struct EntryView {
    pub id: i64,
    pub name: String,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub formatted: String,
}

impl EntryView {
    pub fn new(entry: SavingsEntry, currency: &Currency) -> EntryView {
        EntryView {
            formatted: currency.format_amount(entry.amount),
            id: entry.id,
            name: entry.name,
            amount: entry.amount,
            created_at: entry.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct EntriesResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub entries: Vec<EntryView>,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> MessageResponse {
        MessageResponse {
            message: message.into(),
        }
    }
}

#[derive(Debug, PartialEq)]
pub struct FireRequest {
    pub monthly_income: f64,
    pub monthly_expenses: f64,
    pub return_rate: f64,
}

impl FireRequest {
    /// `None` when a field is missing or not numeric. `return_rate` may be
    /// omitted but not `null`.
    pub fn from_json(body: &Value) -> Option<FireRequest> {
        let field = |name: &str| body.get(name).and_then(as_number);
        let return_rate = match body.get("return_rate") {
            None => DEFAULT_RETURN_RATE,
            Some(v) => as_number(v)?,
        };
        Some(FireRequest {
            monthly_income: field("monthly_income")?,
            monthly_expenses: field("monthly_expenses")?,
            return_rate,
        })
    }
}

// numbers and numeric strings
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
