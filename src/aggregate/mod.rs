//! Aggregate module
//!
//! Aggregate Root pattern implementation for Event Sourcing.

pub mod account;

pub use account::Account;

/// Snapshot cadence: a snapshot is taken every time the version reaches a
/// multiple of this interval.
pub const SNAPSHOT_INTERVAL: i64 = 5;

/// Aggregate trait that all aggregates must implement
pub trait Aggregate: Sized + Default {
    /// The type of events this aggregate handles
    type Event;

    /// Get the aggregate type name (for storage)
    fn aggregate_type() -> &'static str;

    /// Get the aggregate ID
    fn id(&self) -> &str;

    /// Get the current version (number of events applied)
    fn version(&self) -> i64;

    /// Apply an event to update the aggregate state
    fn apply(self, event: Self::Event) -> Self;

    /// Check if a snapshot should be created
    fn should_snapshot(&self) -> bool {
        self.version() > 0 && self.version() % SNAPSHOT_INTERVAL == 0
    }
}

/// Errors raised while folding a stored stream into an aggregate
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReplayError {
    /// The stream skipped or repeated a version
    #[error("Version gap in aggregate {aggregate_id}: expected version {expected}, found {found}")]
    VersionGap {
        aggregate_id: String,
        expected: i64,
        found: i64,
    },

    /// An event recorded against another aggregate showed up in this stream
    #[error("Event {event_id} belongs to aggregate {found}, not {aggregate_id}")]
    ForeignEvent {
        aggregate_id: String,
        event_id: String,
        found: String,
    },

    /// A posted amount pushed the balance out of the representable range
    #[error("Balance overflow in aggregate {aggregate_id} at version {version}")]
    BalanceOverflow { aggregate_id: String, version: i64 },
}
