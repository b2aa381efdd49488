//! Command execution pipeline (application-level orchestration).
//!
//! This module implements the command dispatch pattern for event-sourced
//! aggregates. It orchestrates the full lifecycle: loading history, rehydrating
//! state, handling commands, persisting events, and publishing to the bus.
//!
//! ```text
//! Command
//!   ↓
//! 1. Load events from store (owner-scoped)
//!   ↓
//! 2. Rehydrate aggregate (apply historical events to rebuild state)
//!   ↓
//! 3. Handle command (pure decision logic, produces events)
//!   ↓
//! 4. Persist events to store (append-only, optimistic concurrency check)
//!   ↓
//! 5. Publish events to bus (for projections, hooks, etc.)
//! ```
//!
//! Steps 1-4 run in a bounded retry loop: a failed optimistic append means a
//! concurrent writer won the race for this stream, so the command is replayed
//! against the fresh stream head. Domain rejections are never retried.
//! Streams are per record, so contention is per record too; commands against
//! unrelated records proceed fully in parallel.
//!
//! Events are persisted before publication: if the append fails nothing is
//! published, and if publication fails the events are already durable, giving
//! at-least-once delivery (consumers must be idempotent).

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use stockledger_core::{Aggregate, AggregateId, DomainError, ExpectedVersion, OwnerId};
use stockledger_events::{EventBus, EventEnvelope};

use crate::event_store::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

/// Retry budget for optimistic concurrency conflicts.
pub const DEFAULT_RETRY_LIMIT: u32 = 5;

#[derive(Debug)]
pub enum DispatchError {
    /// Optimistic concurrency conflict that survived the retry budget.
    Concurrency(String),
    /// Owner isolation violation (cross-owner or cross-aggregate stream mixing).
    OwnerIsolation(String),
    /// Domain validation failure (deterministic).
    Validation(String),
    /// A movement quantity was zero or negative.
    InvalidQuantity(String),
    /// A movement would take the on-hand quantity below zero.
    InsufficientStock { requested: i64, available: i64 },
    /// The (owner, item) pair does not resolve to an inventory record.
    UnknownRecord,
    /// Illegal alert lifecycle transition.
    InvalidTransition(String),
    /// Domain invariant failure (deterministic).
    InvariantViolation(String),
    /// Domain-level not found.
    NotFound,
    /// Failed to deserialize historical event payloads into the aggregate event type.
    Deserialize(String),
    /// Persisting to the event store failed.
    Store(EventStoreError),
    /// Publication failed after a successful append (at-least-once; retry may duplicate).
    Publish(String),
}

impl From<EventStoreError> for DispatchError {
    fn from(value: EventStoreError) -> Self {
        match &value {
            EventStoreError::Concurrency(msg) => DispatchError::Concurrency(msg.clone()),
            EventStoreError::OwnerIsolation(msg) => DispatchError::OwnerIsolation(msg.clone()),
            _ => DispatchError::Store(value),
        }
    }
}

impl From<DomainError> for DispatchError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => DispatchError::Validation(msg),
            DomainError::InvalidQuantity(msg) => DispatchError::InvalidQuantity(msg),
            DomainError::InsufficientStock {
                requested,
                available,
            } => DispatchError::InsufficientStock {
                requested,
                available,
            },
            DomainError::UnknownRecord => DispatchError::UnknownRecord,
            DomainError::InvalidTransition(msg) => DispatchError::InvalidTransition(msg),
            DomainError::InvariantViolation(msg) => DispatchError::InvariantViolation(msg),
            DomainError::InvalidId(msg) => DispatchError::Validation(msg),
            DomainError::NotFound => DispatchError::NotFound,
            DomainError::Conflict(msg) => DispatchError::Concurrency(msg),
        }
    }
}

/// Reusable command execution engine for event-sourced aggregates.
///
/// The dispatcher sits between application services and the infrastructure
/// layer (event store, event bus). It provides a consistent execution model
/// for all commands while keeping domain code pure and testable.
///
/// Generic over the store and bus so tests run against `InMemoryEventStore` /
/// `InMemoryEventBus` and production backends can be swapped in without
/// touching domain code.
#[derive(Debug)]
pub struct CommandDispatcher<S, B> {
    store: S,
    bus: B,
    retry_limit: u32,
}

impl<S, B> CommandDispatcher<S, B> {
    pub fn new(store: S, bus: B) -> Self {
        Self {
            store,
            bus,
            retry_limit: DEFAULT_RETRY_LIMIT,
        }
    }

    pub fn with_retry_limit(mut self, retry_limit: u32) -> Self {
        self.retry_limit = retry_limit.max(1);
        self
    }

    pub fn into_parts(self) -> (S, B) {
        (self.store, self.bus)
    }
}

impl<S, B> CommandDispatcher<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Dispatch a command through the full event-sourcing pipeline.
    ///
    /// The `make_aggregate` closure produces a fresh, empty aggregate instance;
    /// it runs once per attempt, so it must be cheap and deterministic.
    ///
    /// Returns the committed `StoredEvent`s (with assigned sequence numbers) on
    /// success. Concurrency conflicts are retried internally up to the retry
    /// budget before surfacing as [`DispatchError::Concurrency`]; domain errors
    /// fail fast and are never retried.
    pub fn dispatch<A>(
        &self,
        owner_id: OwnerId,
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        command: A::Command,
        make_aggregate: impl Fn(OwnerId, AggregateId) -> A,
    ) -> Result<Vec<StoredEvent>, DispatchError>
    where
        A: Aggregate<Error = DomainError>,
        A::Event: stockledger_events::Event + Serialize + DeserializeOwned,
    {
        let aggregate_type = aggregate_type.into();
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            // 1) Load history (owner-scoped)
            let history = self.store.load_stream(owner_id, aggregate_id)?;
            validate_loaded_stream(owner_id, aggregate_id, &history)?;
            let expected = ExpectedVersion::Exact(stream_version(&history));

            // 2) Rehydrate aggregate
            let mut aggregate = make_aggregate(owner_id, aggregate_id);
            apply_history::<A>(&mut aggregate, &history)?;

            // 3) Decide events (no mutation); domain rejections fail fast
            let decided = aggregate.handle(&command).map_err(DispatchError::from)?;
            if decided.is_empty() {
                return Ok(vec![]);
            }

            // 4) Persist (append-only, optimistic)
            let uncommitted = decided
                .iter()
                .map(|ev| {
                    UncommittedEvent::from_typed(
                        owner_id,
                        aggregate_id,
                        aggregate_type.clone(),
                        Uuid::now_v7(),
                        ev,
                    )
                })
                .collect::<Result<Vec<_>, _>>()?;

            let committed = match self.store.append(uncommitted, expected) {
                Ok(committed) => committed,
                Err(EventStoreError::Concurrency(msg)) => {
                    if attempt >= self.retry_limit {
                        return Err(DispatchError::Concurrency(msg));
                    }
                    tracing::debug!(
                        %aggregate_id,
                        attempt,
                        "optimistic append lost the race, reloading stream"
                    );
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            // 5) Publish committed events (after append)
            for stored in &committed {
                self.bus
                    .publish(stored.to_envelope())
                    .map_err(|e| DispatchError::Publish(format!("{e:?}")))?;
            }

            return Ok(committed);
        }
    }
}

fn stream_version(stream: &[StoredEvent]) -> u64 {
    stream.last().map(|e| e.sequence_number).unwrap_or(0)
}

fn validate_loaded_stream(
    owner_id: OwnerId,
    aggregate_id: AggregateId,
    stream: &[StoredEvent],
) -> Result<(), DispatchError> {
    // Enforce owner isolation even if a buggy backend returns cross-owner data.
    // Also ensure the stream is monotonically increasing by sequence number.
    let mut last = 0u64;
    for (idx, e) in stream.iter().enumerate() {
        if e.owner_id != owner_id {
            return Err(DispatchError::OwnerIsolation(format!(
                "loaded stream contains wrong owner_id at index {idx}"
            )));
        }
        if e.aggregate_id != aggregate_id {
            return Err(DispatchError::OwnerIsolation(format!(
                "loaded stream contains wrong aggregate_id at index {idx}"
            )));
        }
        if e.sequence_number == 0 {
            return Err(DispatchError::Store(EventStoreError::InvalidAppend(
                "stored event has sequence_number=0".to_string(),
            )));
        }
        if e.sequence_number <= last {
            return Err(DispatchError::Store(EventStoreError::InvalidAppend(
                format!(
                    "non-monotonic sequence_number in loaded stream (last={last}, found={})",
                    e.sequence_number
                ),
            )));
        }
        last = e.sequence_number;
    }
    Ok(())
}

fn apply_history<A>(aggregate: &mut A, history: &[StoredEvent]) -> Result<(), DispatchError>
where
    A: Aggregate,
    A::Event: DeserializeOwned,
{
    // Ensure deterministic ordering.
    let mut sorted = history.to_vec();
    sorted.sort_by_key(|e| e.sequence_number);

    for stored in sorted {
        let ev: A::Event = serde_json::from_value(stored.payload)
            .map_err(|e| DispatchError::Deserialize(e.to_string()))?;
        aggregate.apply(&ev);
    }

    Ok(())
}
