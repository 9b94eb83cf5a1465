use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_RETURN_RATE: f64 = 0.05;
pub const MAX_YEARS: u32 = 100;
// 25x annual expenses, i.e. a 4% safe withdrawal rate
pub const FIRE_MULTIPLIER: f64 = 25.0;

const NO_SAVINGS_MESSAGE: &str =
    "Your savings rate is zero or negative. FIRE is not possible with current values.";
const CAPPED_MESSAGE: &str = "FIRE number is not reached within 100 years at this return rate.";

#[derive(Error, Debug, PartialEq)]
pub enum ProjectionError {
    #[error("Calculation error: {0}")]
    Calculation(String),
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ProjectionPoint {
    pub year: u32,
    pub savings: Decimal,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct FireProjection {
    pub fire_number: Decimal,
    pub years_to_fire: Option<u32>,
    pub projections: Vec<ProjectionPoint>,
    // false both for a non-positive savings rate and for hitting MAX_YEARS
    pub reached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Rounds `value` to 2 fractional digits, ties away from zero.
///
/// The float goes through its shortest round-trip decimal form first, so
/// `1234.565_f64` is treated as exactly `1234.565` and rounds to `1234.57`
/// instead of following the binary expansion down to `1234.56`.
pub fn round_half_up(value: f64) -> Result<Decimal, ProjectionError> {
    if !value.is_finite() {
        return Err(ProjectionError::Calculation(format!(
            "non-finite value {}",
            value
        )));
    }
    let exact = Decimal::from_str(&value.to_string()).map_err(|e| {
        ProjectionError::Calculation(format!("{} cannot be represented: {}", value, e))
    })?;
    Ok(exact.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
}

/// Simulates yearly compounding of the monthly surplus until the FIRE number
/// (25x annual expenses) is reached or `MAX_YEARS` pass.
///
/// Inputs are not range-checked. Negative income, expenses or rates simply
/// flow through the arithmetic; only non-finite or out-of-range results are
/// reported as errors.
pub fn calculate_fire(
    monthly_income: f64,
    monthly_expenses: f64,
    return_rate: f64,
) -> Result<FireProjection, ProjectionError> {
    let annual_expenses = monthly_expenses * 12.0;
    let target = annual_expenses * FIRE_MULTIPLIER;
    let fire_number = round_half_up(target)?;
    let yearly_savings = (monthly_income - monthly_expenses) * 12.0;
    if !yearly_savings.is_finite() || !return_rate.is_finite() {
        return Err(ProjectionError::Calculation(
            "income, expenses and return rate must be finite".to_owned(),
        ));
    }

    if yearly_savings <= 0.0 {
        return Ok(FireProjection {
            fire_number,
            years_to_fire: None,
            projections: Vec::new(),
            reached: false,
            message: Some(NO_SAVINGS_MESSAGE.to_owned()),
        });
    }

    let mut savings = 0.0_f64;
    let mut years = 0_u32;
    let mut projections = Vec::new();
    while savings < target && years < MAX_YEARS {
        savings = savings * (1.0 + return_rate) + yearly_savings;
        years += 1;
        projections.push(ProjectionPoint {
            year: years,
            savings: round_half_up(savings)?,
        });
    }

    let reached = savings >= target;
    Ok(FireProjection {
        fire_number,
        years_to_fire: Some(years),
        projections,
        reached,
        message: (!reached).then(|| CAPPED_MESSAGE.to_owned()),
    })
}
