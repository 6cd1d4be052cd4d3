//! Account Aggregate
//!
//! Account is the only aggregate of the ledger. Its state is derived by
//! folding events in version order, and it produces the events for the two
//! legs of a transfer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    AccountEvent, Amount, Balance, DomainError, Event, RecordedEvent, ACCOUNT_AGGREGATE_TYPE,
};

use super::{Aggregate, ReplayError};

/// Account Aggregate
///
/// State is derived from events, never directly mutated. The version is not
/// part of the serialized state: a snapshot records it in its own column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Account identifier
    id: String,

    /// Owner label from the creation event
    owner: String,

    /// Running sum of posted amounts
    balance: Balance,

    /// Number of events folded so far
    #[serde(skip)]
    version: i64,

    /// Timestamp of the AccountCreated event
    created_at: Option<DateTime<Utc>>,

    /// Timestamp of the last folded event
    updated_at: Option<DateTime<Utc>>,
}

impl Account {
    /// An account at version 0 with nothing folded into it yet
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Restore an account from snapshot state taken at `version`
    pub fn from_snapshot(
        version: i64,
        state: serde_json::Value,
    ) -> Result<Self, serde_json::Error> {
        let mut account: Account = serde_json::from_value(state)?;
        account.version = version;
        Ok(account)
    }

    /// Serialize the folded state for a snapshot
    pub fn snapshot_state(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Fold stored events on top of the current state.
    ///
    /// Each event must sit exactly one version above the state it is applied
    /// to, belong to this account and keep the balance within range.
    pub fn replay<I>(self, events: I) -> Result<Self, ReplayError>
    where
        I: IntoIterator<Item = RecordedEvent>,
    {
        events.into_iter().try_fold(self, |account, recorded| {
            let expected = account.version + 1;
            if recorded.version != expected {
                return Err(ReplayError::VersionGap {
                    aggregate_id: account.id.clone(),
                    expected,
                    found: recorded.version,
                });
            }
            if recorded.event.aggregate_id != account.id {
                return Err(ReplayError::ForeignEvent {
                    aggregate_id: account.id.clone(),
                    event_id: recorded.event.id,
                    found: recorded.event.aggregate_id,
                });
            }
            if let AccountEvent::TransactionPosted { amount, .. } = &recorded.event.data {
                if account.balance.checked_post(*amount).is_none() {
                    return Err(ReplayError::BalanceOverflow {
                        aggregate_id: account.id.clone(),
                        version: recorded.version,
                    });
                }
            }
            Ok(account.apply(recorded.event))
        })
    }

    /// Build the debit leg of a transfer, rejecting it when the balance does
    /// not cover the amount.
    ///
    /// The leg's event id is derived from `transaction_id` alone, so the
    /// caller owns transaction id uniqueness: a reused id posts again under
    /// the same event ids.
    pub fn debit(
        &self,
        transaction_id: &str,
        amount: Amount,
        counterparty: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<Event, DomainError> {
        if !self.exists() {
            return Err(DomainError::AccountNotFound(self.id.clone()));
        }

        if !self.balance.is_sufficient_for(&amount) {
            return Err(DomainError::InsufficientFunds {
                account_id: self.id.clone(),
                available: self.balance.value(),
                required: amount.value(),
            });
        }

        Ok(Event::transaction_posted(
            format!("{transaction_id}-dr"),
            &self.id,
            transaction_id,
            -amount,
            format!("Transfer to {counterparty}"),
            timestamp,
        ))
    }

    /// Build the credit leg of a transfer
    pub fn credit(
        &self,
        transaction_id: &str,
        amount: Amount,
        counterparty: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<Event, DomainError> {
        if !self.exists() {
            return Err(DomainError::AccountNotFound(self.id.clone()));
        }

        if self.balance.checked_post(amount.value()).is_none() {
            return Err(DomainError::BalanceOverflow {
                account_id: self.id.clone(),
            });
        }

        Ok(Event::transaction_posted(
            format!("{transaction_id}-cr"),
            &self.id,
            transaction_id,
            amount.value(),
            format!("Transfer from {counterparty}"),
            timestamp,
        ))
    }

    // =========================================================================
    // Getters
    // =========================================================================

    /// True once an AccountCreated event has been folded
    pub fn exists(&self) -> bool {
        self.created_at.is_some()
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn balance(&self) -> Balance {
        self.balance
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }
}

impl Aggregate for Account {
    type Event = Event;

    fn aggregate_type() -> &'static str {
        ACCOUNT_AGGREGATE_TYPE
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn apply(mut self, event: Self::Event) -> Self {
        match event.data {
            AccountEvent::AccountCreated { owner } => {
                self.id = event.aggregate_id;
                self.owner = owner;
                self.created_at = Some(event.timestamp);
            }
            // Out-of-range sums are rejected by replay and by credit
            // before an event gets here
            AccountEvent::TransactionPosted { amount, .. } => {
                self.balance = self.balance.post(amount);
            }
        }

        self.updated_at = Some(event.timestamp);
        self.version += 1;
        self
    }
}
