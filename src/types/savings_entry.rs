use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq)]
pub struct SavingsEntry {
    pub id: i64,
    pub name: String,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}

// validated, not yet stored
#[derive(Clone, Debug, PartialEq)]
pub struct NewSavingsEntry {
    name: String,
    amount: Decimal,
}

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Missing or invalid 'savings' in request")]
    MissingBatch,
    #[error("Invalid entry: Missing name.")]
    MissingName,
    #[error("Invalid entry: Invalid amount.")]
    InvalidAmount,
    #[error("Invalid entry: Amount cannot be negative.")]
    NegativeAmount,
}

impl NewSavingsEntry {
    pub fn new(name: &str, amount: Decimal) -> Result<NewSavingsEntry, ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::MissingName);
        }
        if amount.is_zero() {
            // drops the sign of "-0"
            return Ok(NewSavingsEntry {
                name: name.to_owned(),
                amount: Decimal::ZERO,
            });
        }
        if amount.is_sign_negative() {
            return Err(ValidationError::NegativeAmount);
        }
        Ok(NewSavingsEntry {
            name: name.to_owned(),
            amount,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    fn from_json(item: &Value) -> Result<NewSavingsEntry, ValidationError> {
        let name = item
            .get("name")
            .and_then(Value::as_str)
            .ok_or(ValidationError::MissingName)?;
        let amount = item
            .get("amount")
            .and_then(parse_amount)
            .ok_or(ValidationError::InvalidAmount)?;
        NewSavingsEntry::new(name, amount)
    }
}

/// Accepts a JSON number or a numeric string, plain or scientific notation.
pub fn parse_amount(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_owned(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

/// Validates the whole `{"savings": [...]}` body up front so that a bad item
/// anywhere in the batch rejects it before anything is written.
pub fn validate_batch(body: &Value) -> Result<Vec<NewSavingsEntry>, ValidationError> {
    body.get("savings")
        .and_then(Value::as_array)
        .ok_or(ValidationError::MissingBatch)?
        .iter()
        .map(NewSavingsEntry::from_json)
        .collect()
}
