use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use stockledger_core::{AggregateId, OwnerId};
use stockledger_events::EventEnvelope;
use stockledger_inventory::{
    InventoryEvent, InventoryRecordId, ItemId, StockStatus, StockThresholds,
};

use crate::read_model::OwnerStore;

/// Queryable inventory read model: one row per record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRecordView {
    pub record_id: InventoryRecordId,
    pub item_id: ItemId,
    pub quantity: i64,
    pub unit_cost: Option<u64>,
    pub thresholds: StockThresholds,
    pub status: StockStatus,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Owner+aggregate cursor to support at-least-once delivery (idempotent projection).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct CursorKey {
    owner_id: OwnerId,
    aggregate_id: AggregateId,
}

#[derive(Debug, Error)]
pub enum RecordsProjectionError {
    #[error("failed to deserialize inventory event: {0}")]
    Deserialize(String),

    #[error("owner isolation violation: {0}")]
    OwnerIsolation(String),

    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },
}

/// Inventory records projection.
///
/// Consumes published envelopes (JSON payloads) and maintains an owner-isolated
/// read model plus an `(owner, item) → record` lookup. Read models are
/// disposable and rebuildable from the event stream.
#[derive(Debug)]
pub struct RecordsProjection<S>
where
    S: OwnerStore<InventoryRecordId, InventoryRecordView>,
{
    store: S,
    item_index: RwLock<HashMap<(OwnerId, ItemId), InventoryRecordId>>,
    cursors: RwLock<HashMap<CursorKey, u64>>,
}

impl<S> RecordsProjection<S>
where
    S: OwnerStore<InventoryRecordId, InventoryRecordView>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            item_index: RwLock::new(HashMap::new()),
            cursors: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, owner_id: OwnerId, record_id: &InventoryRecordId) -> Option<InventoryRecordView> {
        self.store.get(owner_id, record_id)
    }

    /// Resolve a record through the `(owner, item)` lookup.
    pub fn get_by_item(&self, owner_id: OwnerId, item_id: &ItemId) -> Option<InventoryRecordView> {
        let record_id = {
            let index = self.item_index.read().ok()?;
            *index.get(&(owner_id, *item_id))?
        };
        self.store.get(owner_id, &record_id)
    }

    pub fn list(&self, owner_id: OwnerId) -> Vec<InventoryRecordView> {
        self.store.list(owner_id)
    }

    /// Apply a published envelope into the projection.
    ///
    /// - Enforces owner isolation
    /// - Enforces monotonic sequence per (owner, aggregate) stream
    /// - Idempotent for at-least-once delivery (replays <= cursor are ignored)
    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), RecordsProjectionError> {
        let owner_id = envelope.owner_id();
        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();

        // Cursor check (per owner + aggregate stream).
        if let Ok(mut cursors) = self.cursors.write() {
            let key = CursorKey {
                owner_id,
                aggregate_id,
            };
            let last = *cursors.get(&key).unwrap_or(&0);

            if seq == 0 {
                return Err(RecordsProjectionError::NonMonotonicSequence { last, found: seq });
            }

            if seq <= last {
                // Duplicate or replay; safe to ignore.
                return Ok(());
            }

            if seq != last + 1 && last != 0 {
                return Err(RecordsProjectionError::NonMonotonicSequence { last, found: seq });
            }

            let event: InventoryEvent = serde_json::from_value(envelope.payload().clone())
                .map_err(|e| RecordsProjectionError::Deserialize(e.to_string()))?;

            let (event_owner, record_id) = match &event {
                InventoryEvent::RecordOpened(e) => (e.owner_id, e.record_id),
                InventoryEvent::MovementRecorded(e) => (e.owner_id, e.record_id),
                InventoryEvent::ThresholdsSet(e) => (e.owner_id, e.record_id),
                InventoryEvent::UnitCostSet(e) => (e.owner_id, e.record_id),
                InventoryEvent::RecordDiscontinued(e) => (e.owner_id, e.record_id),
                InventoryEvent::RecordReactivated(e) => (e.owner_id, e.record_id),
            };

            if event_owner != owner_id {
                return Err(RecordsProjectionError::OwnerIsolation(
                    "event owner_id does not match envelope owner_id".to_string(),
                ));
            }
            if record_id.0 != aggregate_id {
                return Err(RecordsProjectionError::OwnerIsolation(
                    "event record_id does not match envelope aggregate_id".to_string(),
                ));
            }

            match event {
                InventoryEvent::RecordOpened(e) => {
                    self.store.upsert(
                        owner_id,
                        e.record_id,
                        InventoryRecordView {
                            record_id: e.record_id,
                            item_id: e.item_id,
                            quantity: 0,
                            unit_cost: None,
                            thresholds: StockThresholds::default(),
                            status: StockStatus::OutOfStock,
                            last_updated: None,
                        },
                    );
                    if let Ok(mut index) = self.item_index.write() {
                        index.insert((owner_id, e.item_id), e.record_id);
                    }
                }
                InventoryEvent::MovementRecorded(e) => {
                    if let Some(mut view) = self.store.get(owner_id, &e.record_id) {
                        view.quantity = e.quantity_after;
                        view.status = e.status_after;
                        view.last_updated = Some(e.occurred_at);
                        self.store.upsert(owner_id, e.record_id, view);
                    }
                }
                InventoryEvent::ThresholdsSet(e) => {
                    if let Some(mut view) = self.store.get(owner_id, &e.record_id) {
                        view.thresholds = e.thresholds;
                        view.status = e.status_after;
                        self.store.upsert(owner_id, e.record_id, view);
                    }
                }
                InventoryEvent::UnitCostSet(e) => {
                    if let Some(mut view) = self.store.get(owner_id, &e.record_id) {
                        view.unit_cost = e.unit_cost;
                        self.store.upsert(owner_id, e.record_id, view);
                    }
                }
                InventoryEvent::RecordDiscontinued(e) => {
                    if let Some(mut view) = self.store.get(owner_id, &e.record_id) {
                        view.status = StockStatus::Discontinued;
                        self.store.upsert(owner_id, e.record_id, view);
                    }
                }
                InventoryEvent::RecordReactivated(e) => {
                    if let Some(mut view) = self.store.get(owner_id, &e.record_id) {
                        view.status = e.status_after;
                        self.store.upsert(owner_id, e.record_id, view);
                    }
                }
            }

            // Advance cursor after successful apply.
            cursors.insert(key, seq);
        }

        Ok(())
    }

    /// Rebuild the read model from scratch by replaying envelopes.
    pub fn rebuild_from_scratch(
        &self,
        envelopes: impl IntoIterator<Item = EventEnvelope<JsonValue>>,
    ) -> Result<(), RecordsProjectionError> {
        if let Ok(mut cursors) = self.cursors.write() {
            cursors.clear();
        }

        let mut envs: Vec<_> = envelopes.into_iter().collect();

        // Clear read model per owner before rebuilding.
        {
            let mut owners = envs.iter().map(|e| e.owner_id()).collect::<Vec<_>>();
            owners.sort_by_key(|o| *o.as_uuid().as_bytes());
            owners.dedup();
            for o in &owners {
                self.store.clear_owner(*o);
            }
            if let Ok(mut index) = self.item_index.write() {
                index.retain(|(o, _), _| !owners.contains(o));
            }
        }

        // Deterministic replay order: owner, aggregate, sequence.
        envs.sort_by_key(|e| {
            (
                *e.owner_id().as_uuid().as_bytes(),
                *e.aggregate_id().as_uuid().as_bytes(),
                e.sequence_number(),
            )
        });

        for env in &envs {
            self.apply_envelope(env)?;
        }

        Ok(())
    }
}
