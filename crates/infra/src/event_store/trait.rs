use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use std::sync::Arc;
use stockledger_core::{AggregateId, ExpectedVersion, OwnerId};

/// An event ready to be appended to a stream (not yet assigned a sequence number).
///
/// Events go through this lifecycle:
///
/// 1. **Domain event**: produced by an aggregate's `handle()`
/// 2. **UncommittedEvent**: wrapped with stream metadata (owner_id, aggregate_id, ...)
/// 3. **StoredEvent**: persisted with an assigned sequence_number
/// 4. **EventEnvelope**: published to the event bus for consumers
///
/// Use [`UncommittedEvent::from_typed`] to build one from a typed domain event:
/// it serializes the payload to JSON and captures the event metadata needed for
/// later deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UncommittedEvent {
    pub event_id: Uuid,
    pub owner_id: OwnerId,
    pub aggregate_id: AggregateId,
    pub aggregate_type: String,

    pub event_type: String,
    pub event_version: u32,
    pub occurred_at: DateTime<Utc>,

    pub payload: JsonValue,
}

/// A stored event in an append-only stream (assigned a sequence number).
///
/// Sequence numbers are assigned by the store during append and are
/// monotonically increasing per stream, stream-scoped `(owner_id,
/// aggregate_id)`, and immutable once assigned. They provide the ordering,
/// optimistic-concurrency, and idempotency foundation everything downstream
/// relies on: an inventory record's stream *is* its movement ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub event_id: Uuid,
    pub owner_id: OwnerId,
    pub aggregate_id: AggregateId,
    pub aggregate_type: String,

    /// Monotonically increasing position in the aggregate stream.
    pub sequence_number: u64,

    pub event_type: String,
    pub event_version: u32,
    pub occurred_at: DateTime<Utc>,

    pub payload: JsonValue,
}

impl StoredEvent {
    pub fn stream_version(&self) -> u64 {
        self.sequence_number
    }

    /// Convert a stored event into an owner-scoped event envelope for publication.
    pub fn to_envelope(&self) -> stockledger_events::EventEnvelope<JsonValue> {
        stockledger_events::EventEnvelope::new(
            self.event_id,
            self.owner_id,
            self.aggregate_id,
            self.aggregate_type.clone(),
            self.sequence_number,
            self.payload.clone(),
        )
    }
}

/// Event store operation error.
///
/// Infrastructure errors (storage, concurrency, isolation) as opposed to
/// domain errors (validation, invariants).
#[derive(Debug, Error)]
pub enum EventStoreError {
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("owner isolation violation: {0}")]
    OwnerIsolation(String),

    #[error("aggregate type mismatch: {0}")]
    AggregateTypeMismatch(String),

    #[error("invalid append: {0}")]
    InvalidAppend(String),

    #[error("event publication failed: {0}")]
    Publish(String),
}

/// Append-only, owner-scoped event store.
///
/// Events are organized into **streams**, one stream per aggregate instance,
/// keyed by `(owner_id, aggregate_id)`. Within a stream events carry
/// monotonically increasing sequence numbers (1, 2, 3, ...).
///
/// Implementations must:
/// - enforce owner isolation (reject cross-owner operations)
/// - enforce optimistic concurrency (check the expected version before append)
/// - assign sequence numbers monotonically (no gaps, no duplicates)
/// - persist batches atomically (all events or none)
/// - never mutate or delete stored events
pub trait EventStore: Send + Sync {
    /// Append events to an aggregate stream (append-only).
    ///
    /// Implementations must:
    /// - enforce owner isolation
    /// - enforce optimistic concurrency against the current stream version
    /// - assign monotonically increasing `sequence_number`s starting at `current_version + 1`
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError>;

    /// Load the full stream for an owner + aggregate.
    fn load_stream(
        &self,
        owner_id: OwnerId,
        aggregate_id: AggregateId,
    ) -> Result<Vec<StoredEvent>, EventStoreError>;
}

impl<S> EventStore for Arc<S>
where
    S: EventStore + ?Sized,
{
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        (**self).append(events, expected_version)
    }

    fn load_stream(
        &self,
        owner_id: OwnerId,
        aggregate_id: AggregateId,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        (**self).load_stream(owner_id, aggregate_id)
    }
}

impl UncommittedEvent {
    /// Convenience constructor from a typed domain event.
    ///
    /// Keeps infra decoupled from business, while still capturing event metadata
    /// needed for future deserialization.
    pub fn from_typed<E>(
        owner_id: OwnerId,
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        event_id: Uuid,
        event: &E,
    ) -> Result<Self, EventStoreError>
    where
        E: stockledger_events::Event + Serialize,
    {
        let payload = serde_json::to_value(event).map_err(|e| {
            EventStoreError::InvalidAppend(format!("payload serialization failed: {e}"))
        })?;

        Ok(Self {
            event_id,
            owner_id,
            aggregate_id,
            aggregate_type: aggregate_type.into(),
            event_type: event.event_type().to_string(),
            event_version: event.version(),
            occurred_at: event.occurred_at(),
            payload,
        })
    }
}
