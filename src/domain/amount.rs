//! Amount and Balance types
//!
//! Domain primitives for monetary values. A transfer amount is validated at
//! construction time so a non-positive amount can never reach the ledger.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Neg;
use std::str::FromStr;

/// Maximum allowed transfer amount (1 trillion)
const MAX_AMOUNT: Decimal = Decimal::from_parts(3_567_587_328, 232, 0, false, 0);

/// Maximum decimal places (8)
const MAX_SCALE: u32 = 8;

/// Amount represents a validated transfer value.
///
/// # Invariants
/// - Value is always positive (> 0)
/// - Maximum 8 decimal places
/// - Maximum value is 1 trillion
///
/// # Example
/// ```
/// use rust_decimal::Decimal;
/// use event_ledger::domain::Amount;
///
/// let amount = Amount::new(Decimal::new(100, 0)).unwrap();
/// assert_eq!(amount.value(), Decimal::new(100, 0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

/// Errors that can occur when creating an Amount
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("Amount must be positive (got {0})")]
    NotPositive(Decimal),

    #[error("Amount has too many decimal places (max {MAX_SCALE}, got {0})")]
    TooManyDecimals(u32),

    #[error("Amount exceeds maximum allowed value ({MAX_AMOUNT})")]
    Overflow,

    #[error("Invalid amount format: {0}")]
    ParseError(String),
}

impl Amount {
    /// Create a new Amount with validation.
    ///
    /// # Errors
    /// - `AmountError::NotPositive` if value <= 0
    /// - `AmountError::TooManyDecimals` if more than 8 decimal places
    /// - `AmountError::Overflow` if value > 1 trillion
    pub fn new(value: Decimal) -> Result<Self, AmountError> {
        if value <= Decimal::ZERO {
            return Err(AmountError::NotPositive(value));
        }

        // Trailing zeros do not count against the scale limit
        let value = value.normalize();
        if value.scale() > MAX_SCALE {
            return Err(AmountError::TooManyDecimals(value.scale()));
        }

        if value > MAX_AMOUNT {
            return Err(AmountError::Overflow);
        }

        Ok(Self(value))
    }

    /// Create an Amount from an integer (no decimal places).
    pub fn from_integer(value: i64) -> Result<Self, AmountError> {
        Self::new(Decimal::from(value))
    }

    /// Get the underlying Decimal value.
    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let decimal = Decimal::from_str(s.trim())
            .map_err(|e| AmountError::ParseError(e.to_string()))?;
        Amount::new(decimal)
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = AmountError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Amount::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl Neg for Amount {
    type Output = Decimal;

    fn neg(self) -> Decimal {
        -self.0
    }
}

/// Balance represents an account balance.
///
/// Unlike [`Amount`], a balance is a signed running sum: it starts at zero and
/// moves by the signed amount of every posted transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Balance(Decimal);

impl Balance {
    /// Create a balance from a decimal value
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Create a zero balance
    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// Get the underlying value
    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Check if balance covers a withdrawal of `amount`
    pub fn is_sufficient_for(&self, amount: &Amount) -> bool {
        self.0 >= amount.value()
    }

    /// Move the balance by a signed delta, or `None` when the sum leaves the
    /// `Decimal` range
    pub fn checked_post(self, delta: Decimal) -> Option<Balance> {
        self.0.checked_add(delta).map(Self)
    }

    /// Move the balance by a signed delta, clamping at the `Decimal` bounds
    pub fn post(self, delta: Decimal) -> Balance {
        Self(self.0.saturating_add(delta))
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_amount_positive() {
        let amount = Amount::new(dec!(100));
        assert!(amount.is_ok());
        assert_eq!(amount.unwrap().value(), dec!(100));
    }

    #[test]
    fn test_amount_zero_rejected() {
        let amount = Amount::new(Decimal::ZERO);
        assert!(matches!(amount, Err(AmountError::NotPositive(_))));
    }

    #[test]
    fn test_amount_negative_rejected() {
        let amount = Amount::new(dec!(-100));
        assert!(matches!(amount, Err(AmountError::NotPositive(_))));
    }

    #[test]
    fn test_amount_too_many_decimals() {
        let amount = Amount::new(dec!(0.123456789));
        assert!(matches!(amount, Err(AmountError::TooManyDecimals(9))));
    }

    #[test]
    fn test_amount_trailing_zeros_ignored() {
        let amount = Amount::new(dec!(1.5000000000)).unwrap();
        assert_eq!(amount.value(), dec!(1.5));
    }

    #[test]
    fn test_amount_max_value() {
        assert!(Amount::new(dec!(1000000000000)).is_ok());
        assert!(matches!(
            Amount::new(dec!(1000000000000.01)),
            Err(AmountError::Overflow)
        ));
    }

    #[test]
    fn test_amount_from_str() {
        let amount: Amount = " 123.456 ".parse().unwrap();
        assert_eq!(amount.value(), dec!(123.456));

        let bad: Result<Amount, _> = "twelve".parse();
        assert!(matches!(bad, Err(AmountError::ParseError(_))));
    }

    #[test]
    fn test_amount_deserialize_rejects_non_positive() {
        let ok: Amount = serde_json::from_str("\"50\"").unwrap();
        assert_eq!(ok.value(), dec!(50));

        assert!(serde_json::from_str::<Amount>("0").is_err());
        assert!(serde_json::from_str::<Amount>("\"-5\"").is_err());
    }

    #[test]
    fn test_balance_post_and_sufficiency() {
        let balance = Balance::zero().post(dec!(100));
        assert_eq!(balance.value(), dec!(100));

        let fifty = Amount::from_integer(50).unwrap();
        assert!(balance.is_sufficient_for(&fifty));

        let balance = balance.post(-fifty).post(-fifty);
        assert_eq!(balance.value(), Decimal::ZERO);
        assert!(!balance.is_sufficient_for(&fifty));
    }

    #[test]
    fn test_balance_overflow_is_detected() {
        let full = Balance::new(Decimal::MAX);

        assert_eq!(full.checked_post(Decimal::MAX), None);
        assert_eq!(full.checked_post(dec!(-1)), Some(Balance::new(Decimal::MAX - dec!(1))));
        assert_eq!(full.post(Decimal::MAX), full);
        assert_eq!(Balance::new(Decimal::MIN).checked_post(dec!(-1)), None);
    }

    #[test]
    fn test_balance_can_go_negative() {
        let balance = Balance::zero().post(dec!(-10.25));
        assert_eq!(balance.value(), dec!(-10.25));
    }
}
