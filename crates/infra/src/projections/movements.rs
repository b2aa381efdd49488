use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use stockledger_core::{AggregateId, OwnerId};
use stockledger_events::EventEnvelope;
use stockledger_inventory::{InventoryEvent, InventoryRecordId, Movement};

use crate::read_model::OwnerStore;

/// Append-only audit log of movements for one record, in ledger order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementLog {
    pub record_id: InventoryRecordId,
    pub movements: Vec<Movement>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct CursorKey {
    owner_id: OwnerId,
    aggregate_id: AggregateId,
}

#[derive(Debug, Error)]
pub enum MovementsProjectionError {
    #[error("failed to deserialize inventory event: {0}")]
    Deserialize(String),

    #[error("owner isolation violation: {0}")]
    OwnerIsolation(String),

    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },
}

/// Movement history projection.
///
/// Rows are derived from committed `MovementRecorded` events and never change
/// after insertion (the ledger is append-only; corrections are new movements).
#[derive(Debug)]
pub struct MovementsProjection<S>
where
    S: OwnerStore<InventoryRecordId, MovementLog>,
{
    store: S,
    cursors: RwLock<HashMap<CursorKey, u64>>,
}

impl<S> MovementsProjection<S>
where
    S: OwnerStore<InventoryRecordId, MovementLog>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: RwLock::new(HashMap::new()),
        }
    }

    /// Chronological movement history for one record, optionally bounded by an
    /// inclusive `[from, to]` time range.
    pub fn history(
        &self,
        owner_id: OwnerId,
        record_id: &InventoryRecordId,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Vec<Movement> {
        let log = match self.store.get(owner_id, record_id) {
            Some(log) => log,
            None => return vec![],
        };

        log.movements
            .into_iter()
            .filter(|m| from.is_none_or(|f| m.created_at >= f))
            .filter(|m| to.is_none_or(|t| m.created_at <= t))
            .collect()
    }

    /// All movement logs for an owner (analytics input).
    pub fn list(&self, owner_id: OwnerId) -> Vec<MovementLog> {
        self.store.list(owner_id)
    }

    /// Apply a published envelope into the projection.
    ///
    /// Same at-least-once discipline as the records projection: per-stream
    /// cursor, duplicates ignored, non-monotonic sequences rejected.
    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), MovementsProjectionError> {
        let owner_id = envelope.owner_id();
        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();

        if let Ok(mut cursors) = self.cursors.write() {
            let key = CursorKey {
                owner_id,
                aggregate_id,
            };
            let last = *cursors.get(&key).unwrap_or(&0);

            if seq == 0 {
                return Err(MovementsProjectionError::NonMonotonicSequence { last, found: seq });
            }

            if seq <= last {
                return Ok(());
            }

            if seq != last + 1 && last != 0 {
                return Err(MovementsProjectionError::NonMonotonicSequence { last, found: seq });
            }

            let event: InventoryEvent = serde_json::from_value(envelope.payload().clone())
                .map_err(|e| MovementsProjectionError::Deserialize(e.to_string()))?;

            if let InventoryEvent::MovementRecorded(e) = &event {
                if e.owner_id != owner_id {
                    return Err(MovementsProjectionError::OwnerIsolation(
                        "event owner_id does not match envelope owner_id".to_string(),
                    ));
                }
                if e.record_id.0 != aggregate_id {
                    return Err(MovementsProjectionError::OwnerIsolation(
                        "event record_id does not match envelope aggregate_id".to_string(),
                    ));
                }

                let mut log = self.store.get(owner_id, &e.record_id).unwrap_or(MovementLog {
                    record_id: e.record_id,
                    movements: Vec::new(),
                });
                log.movements.push(Movement::from(e));
                self.store.upsert(owner_id, e.record_id, log);
            }

            cursors.insert(key, seq);
        }

        Ok(())
    }
}
