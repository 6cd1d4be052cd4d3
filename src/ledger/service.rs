//! Ledger Service
//!
//! Orchestrates account creation, account loading and double-entry
//! transfers on top of an event store and a snapshot store. Holds no state
//! of its own: every call rebuilds the accounts it touches.

use std::sync::Arc;

use chrono::Utc;

use crate::aggregate::{Account, Aggregate};
use crate::domain::{Amount, Event, RecordedEvent};
use crate::event_store::{AggregateOperation, EventStore, EventStoreError};
use crate::metrics::Metrics;
use crate::snapshot::{Snapshot, SnapshotStore};

use super::{LedgerError, RetryPolicy};

/// Outcome of a committed transfer
#[derive(Debug, Clone)]
pub struct TransactionReceipt {
    pub transaction_id: String,
    /// Source account after the debit
    pub from: Account,
    /// Destination account after the credit
    pub to: Account,
    /// Attempts used, including the successful one
    pub attempts: u32,
}

/// Command side of the ledger
#[derive(Debug, Clone)]
pub struct LedgerService<E, S> {
    events: E,
    snapshots: S,
    retry: RetryPolicy,
    metrics: Option<Arc<Metrics>>,
}

impl<E, S> LedgerService<E, S>
where
    E: EventStore,
    S: SnapshotStore,
{
    pub fn new(events: E, snapshots: S) -> Self {
        Self {
            events,
            snapshots,
            retry: RetryPolicy::default(),
            metrics: None,
        }
    }

    /// Count transfer outcomes in `metrics`
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    // =========================================================================
    // CreateAccount
    // =========================================================================

    /// Open an account by appending its creation event at version 1
    pub async fn create_account(&self, account_id: &str, owner: &str) -> Result<Account, LedgerError> {
        require_identifier("account id", account_id)?;

        let event = Event::account_created(account_id, owner, Utc::now());
        let operation = AggregateOperation::new(account_id, 0, vec![event.clone()]);

        match self.events.append(vec![operation]).await {
            Ok(()) => {}
            Err(EventStoreError::ConcurrencyConflict { .. }) => {
                return Err(LedgerError::AccountAlreadyExists(account_id.to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(account_id, owner, "Account created");

        let account = Account::new(account_id).apply(event);
        self.refresh_snapshot(&account).await;
        Ok(account)
    }

    // =========================================================================
    // LoadAccount
    // =========================================================================

    /// Rebuild an account from its snapshot plus the events recorded after it.
    ///
    /// A nonexistent account comes back at version 0 with a zero balance.
    pub async fn load_account(&self, account_id: &str) -> Result<Account, LedgerError> {
        let base = self.load_snapshot(account_id).await?;
        let stream = self.events.load(account_id, base.version()).await?;
        let replayed = stream.events.len();

        let account = base.replay(stream.events)?;
        debug_assert_eq!(account.version(), stream.version);

        tracing::debug!(
            account_id,
            version = account.version(),
            replayed,
            "Account loaded"
        );
        Ok(account)
    }

    /// Starting point for replay. An unreadable snapshot is ignored in favour
    /// of a full replay.
    async fn load_snapshot(&self, account_id: &str) -> Result<Account, LedgerError> {
        let Some(snapshot) = self.snapshots.load(account_id).await? else {
            return Ok(Account::new(account_id));
        };

        match Account::from_snapshot(snapshot.version, snapshot.state) {
            Ok(account) if account.id() == account_id => Ok(account),
            Ok(account) => {
                tracing::warn!(
                    account_id,
                    snapshot_id = account.id(),
                    "Snapshot belongs to another account, replaying from scratch"
                );
                Ok(Account::new(account_id))
            }
            Err(e) => {
                tracing::warn!(
                    account_id,
                    version = snapshot.version,
                    error = %e,
                    "Unreadable snapshot, replaying from scratch"
                );
                Ok(Account::new(account_id))
            }
        }
    }

    /// Every event recorded for an account, in version order
    pub async fn account_history(&self, account_id: &str) -> Result<Vec<RecordedEvent>, LedgerError> {
        Ok(self.events.load(account_id, 0).await?.events)
    }

    // =========================================================================
    // PostDoubleEntryTransaction
    // =========================================================================

    /// Move `amount` from `from_id` to `to_id` as one atomic debit/credit pair.
    ///
    /// Concurrency conflicts reload both accounts and try again, up to the
    /// policy's attempt budget. Every other error ends the transfer at once.
    ///
    /// `transaction_id` is not deduplicated: the caller must keep it unique,
    /// since posting the same id twice moves the funds twice.
    pub async fn post_double_entry_transaction(
        &self,
        transaction_id: &str,
        from_id: &str,
        to_id: &str,
        amount: Amount,
    ) -> Result<TransactionReceipt, LedgerError> {
        require_identifier("transaction id", transaction_id)?;
        require_identifier("source account", from_id)?;
        require_identifier("destination account", to_id)?;
        if from_id == to_id {
            return Err(LedgerError::Validation(
                "Cannot transfer to the same account".to_string(),
            ));
        }

        let max_attempts = self.retry.max_attempts();

        for attempt in 1..=max_attempts {
            match self
                .attempt_transaction(transaction_id, from_id, to_id, amount)
                .await
            {
                Ok((from, to)) => {
                    tracing::info!(
                        transaction_id,
                        from_id,
                        to_id,
                        %amount,
                        attempt,
                        "Transaction committed"
                    );
                    if let Some(metrics) = &self.metrics {
                        metrics.record_transfer_committed();
                    }
                    return Ok(TransactionReceipt {
                        transaction_id: transaction_id.to_string(),
                        from,
                        to,
                        attempts: attempt,
                    });
                }
                Err(LedgerError::ConcurrencyConflict {
                    aggregate_id,
                    version,
                }) => {
                    if let Some(metrics) = &self.metrics {
                        metrics.record_transfer_conflict();
                    }
                    if attempt == max_attempts {
                        break;
                    }

                    let delay = self.retry.backoff(attempt, &mut rand::thread_rng());
                    tracing::warn!(
                        transaction_id,
                        %aggregate_id,
                        version,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Concurrency conflict, retrying transaction"
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }

        tracing::error!(transaction_id, max_attempts, "Transaction retries exhausted");
        if let Some(metrics) = &self.metrics {
            metrics.record_retries_exhausted();
        }
        Err(LedgerError::RetriesExhausted {
            transaction_id: transaction_id.to_string(),
            attempts: max_attempts,
        })
    }

    /// One load → validate → append cycle
    async fn attempt_transaction(
        &self,
        transaction_id: &str,
        from_id: &str,
        to_id: &str,
        amount: Amount,
    ) -> Result<(Account, Account), LedgerError> {
        let from = self.load_account(from_id).await?;
        let to = self.load_account(to_id).await?;

        let timestamp = Utc::now();
        let debit = from.debit(transaction_id, amount, to_id, timestamp)?;
        let credit = to.credit(transaction_id, amount, from_id, timestamp)?;

        // Expected versions are the ones just loaded; a concurrent writer
        // that got there first makes this append conflict.
        self.events
            .append(vec![
                AggregateOperation::new(from_id, from.version(), vec![debit.clone()]),
                AggregateOperation::new(to_id, to.version(), vec![credit.clone()]),
            ])
            .await?;

        let from = from.apply(debit);
        let to = to.apply(credit);

        self.refresh_snapshot(&from).await;
        self.refresh_snapshot(&to).await;

        Ok((from, to))
    }

    // =========================================================================
    // Snapshots
    // =========================================================================

    /// Persist a snapshot when the account sits on the snapshot cadence.
    ///
    /// Runs after the commit and never fails the caller: errors are logged.
    /// The account passed in must hold exactly the committed state.
    async fn refresh_snapshot(&self, account: &Account) {
        if !account.should_snapshot() {
            return;
        }

        let state = match account.snapshot_state() {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(account_id = account.id(), error = %e, "Failed to encode snapshot");
                return;
            }
        };

        let snapshot = Snapshot {
            aggregate_id: account.id().to_string(),
            version: account.version(),
            state,
        };

        match self.snapshots.save(snapshot).await {
            Ok(()) => tracing::info!(
                "Snapshot saved for {} aggregate {} at version {}",
                Account::aggregate_type(),
                account.id(),
                account.version()
            ),
            Err(e) => tracing::warn!(
                account_id = account.id(),
                version = account.version(),
                error = %e,
                "Failed to save snapshot"
            ),
        }
    }
}

fn require_identifier(field: &str, value: &str) -> Result<(), LedgerError> {
    if value.trim().is_empty() {
        return Err(LedgerError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}
