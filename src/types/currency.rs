use rust_decimal::{Decimal, RoundingStrategy};
use rusty_money::iso::{self, find, Currency as rmCurrency};
use rusty_money::{Formatter, Money, Params, Position};
use std::fmt;

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub struct Currency {
    // display currency for savings amounts, picked by ISO code
    pub rmc: rmCurrency,
}

impl Currency {
    pub fn new(rmc: &rmCurrency) -> Currency {
        Currency { rmc: *rmc }
    }

    pub fn from_code(code: &str) -> Option<Currency> {
        find(&code.trim().to_uppercase()).map(Currency::new)
    }

    pub fn code(&self) -> &'static str {
        self.rmc.iso_alpha_code
    }

    /// Display string for an amount: currency symbol, `,` every three
    /// digits, `.` and exactly two fractional digits (`₹1,234,567.50`).
    ///
    /// Grouping is always by thousands regardless of the currency's locale.
    pub fn format_amount(&self, amount: Decimal) -> String {
        // the formatter only prints the fractional digits the scale carries
        let mut cents = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        cents.rescale(2);
        let money = Money::from_decimal(cents, &self.rmc);
        let params = Params {
            digit_separator: ',',
            exponent_separator: '.',
            separator_pattern: vec![3; 6],
            rounding: Some(2),
            symbol: Some(self.rmc.symbol),
            positions: vec![Position::Sign, Position::Symbol, Position::Amount],
            ..Default::default()
        };
        Formatter::money(&money, params)
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::new(iso::INR)
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
