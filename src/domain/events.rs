//! Domain Events
//!
//! Event definitions for Event Sourcing.
//! Events are immutable facts that have happened to a single account.
//!
//! The event kind travels next to the payload as an explicit discriminator
//! (`event_type` column), and decoding dispatches on it. The payload body
//! itself carries no type tag.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Aggregate type recorded with every stored event
pub const ACCOUNT_AGGREGATE_TYPE: &str = "ACCOUNT";

/// Discriminator for the closed set of account events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    AccountCreated,
    TransactionPosted,
}

impl EventKind {
    /// Storage name of the event kind
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::AccountCreated => "ACCOUNT_CREATED",
            EventKind::TransactionPosted => "TXN_POSTED",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a stored discriminator names no known event kind
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown event type: {0}")]
pub struct UnknownEventKind(pub String);

impl FromStr for EventKind {
    type Err = UnknownEventKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACCOUNT_CREATED" => Ok(EventKind::AccountCreated),
            "TXN_POSTED" => Ok(EventKind::TransactionPosted),
            other => Err(UnknownEventKind(other.to_string())),
        }
    }
}

/// Kind-specific event data
#[derive(Debug, Clone, PartialEq)]
pub enum AccountEvent {
    /// Account was opened
    AccountCreated { owner: String },

    /// Balance moved by a signed amount (positive = credit, negative = debit)
    TransactionPosted {
        transaction_id: String,
        amount: Decimal,
        reference: String,
    },
}

impl AccountEvent {
    /// Get the discriminator for this event
    pub fn kind(&self) -> EventKind {
        match self {
            AccountEvent::AccountCreated { .. } => EventKind::AccountCreated,
            AccountEvent::TransactionPosted { .. } => EventKind::TransactionPosted,
        }
    }
}

/// An immutable fact about one account
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub id: String,
    pub aggregate_id: String,
    pub timestamp: DateTime<Utc>,
    pub data: AccountEvent,
}

/// Serialized form of an event body. The kind fields sit beside the metadata.
#[derive(Serialize, Deserialize)]
struct EventBody<D> {
    id: String,
    aggregate_id: String,
    timestamp: DateTime<Utc>,
    #[serde(flatten)]
    data: D,
}

#[derive(Serialize, Deserialize)]
struct AccountCreatedData {
    owner: String,
}

#[derive(Serialize, Deserialize)]
struct TransactionPostedData {
    transaction_id: String,
    amount: Decimal,
    reference: String,
}

/// Errors decoding a stored event
#[derive(Debug, thiserror::Error)]
pub enum EventDecodeError {
    #[error(transparent)]
    UnknownKind(#[from] UnknownEventKind),

    #[error("Malformed {kind} payload: {source}")]
    Malformed {
        kind: EventKind,
        #[source]
        source: serde_json::Error,
    },
}

impl Event {
    /// Build an AccountCreated event with a fresh identifier
    pub fn account_created(aggregate_id: &str, owner: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: format!("evt_{}", Uuid::new_v4().simple()),
            aggregate_id: aggregate_id.to_string(),
            timestamp,
            data: AccountEvent::AccountCreated {
                owner: owner.to_string(),
            },
        }
    }

    /// Build a TransactionPosted event
    pub fn transaction_posted(
        id: String,
        aggregate_id: &str,
        transaction_id: &str,
        amount: Decimal,
        reference: String,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            aggregate_id: aggregate_id.to_string(),
            timestamp,
            data: AccountEvent::TransactionPosted {
                transaction_id: transaction_id.to_string(),
                amount,
                reference,
            },
        }
    }

    pub fn kind(&self) -> EventKind {
        self.data.kind()
    }

    /// Serialize the event body for storage
    pub fn to_payload(&self) -> Result<serde_json::Value, serde_json::Error> {
        match &self.data {
            AccountEvent::AccountCreated { owner } => self.body(AccountCreatedData {
                owner: owner.clone(),
            }),
            AccountEvent::TransactionPosted {
                transaction_id,
                amount,
                reference,
            } => self.body(TransactionPostedData {
                transaction_id: transaction_id.clone(),
                amount: *amount,
                reference: reference.clone(),
            }),
        }
    }

    fn body<D: Serialize>(&self, data: D) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(EventBody {
            id: self.id.clone(),
            aggregate_id: self.aggregate_id.clone(),
            timestamp: self.timestamp,
            data,
        })
    }

    /// Reconstruct an event from its stored discriminator and payload.
    ///
    /// Unknown discriminators are rejected rather than skipped.
    pub fn decode(event_type: &str, payload: serde_json::Value) -> Result<Self, EventDecodeError> {
        let kind: EventKind = event_type.parse()?;
        match kind {
            EventKind::AccountCreated => {
                let body: EventBody<AccountCreatedData> = parse_body(kind, payload)?;
                Ok(Self {
                    id: body.id,
                    aggregate_id: body.aggregate_id,
                    timestamp: body.timestamp,
                    data: AccountEvent::AccountCreated {
                        owner: body.data.owner,
                    },
                })
            }
            EventKind::TransactionPosted => {
                let body: EventBody<TransactionPostedData> = parse_body(kind, payload)?;
                Ok(Self {
                    id: body.id,
                    aggregate_id: body.aggregate_id,
                    timestamp: body.timestamp,
                    data: AccountEvent::TransactionPosted {
                        transaction_id: body.data.transaction_id,
                        amount: body.data.amount,
                        reference: body.data.reference,
                    },
                })
            }
        }
    }
}

fn parse_body<D: DeserializeOwned>(
    kind: EventKind,
    payload: serde_json::Value,
) -> Result<EventBody<D>, EventDecodeError> {
    serde_json::from_value(payload).map_err(|source| EventDecodeError::Malformed { kind, source })
}

/// An event as read back from the store, with its position in the stream
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvent {
    pub version: i64,
    pub event: Event,
}
