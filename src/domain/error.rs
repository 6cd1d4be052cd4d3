//! Domain Error Types
//!
//! Business rule violations raised by the account aggregate. Independent of
//! storage and transport.

use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// The account has no creation event
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Debit larger than the current balance
    #[error("Insufficient funds in {account_id}: available {available}, required {required}")]
    InsufficientFunds {
        account_id: String,
        available: Decimal,
        required: Decimal,
    },

    /// Posting would push the balance past the representable range
    #[error("Balance of {account_id} would overflow")]
    BalanceOverflow { account_id: String },
}
