//! Ledger application service: movement orchestration + record directory.
//!
//! `LedgerService` is the write path for the inventory ledger. It resolves
//! `(owner, item)` pairs to record streams, dispatches aggregate commands,
//! keeps the read models fed, and invokes the alert hook on status
//! transitions. The hook runs synchronously but never fails a committed
//! movement.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use thiserror::Error;

use stockledger_advisor::{RecordSnapshot, RestockRecommendation, RestockScorer, ThresholdScorer};
use stockledger_core::{ActorId, AggregateId, OwnerId};
use stockledger_events::{EventBus, EventEnvelope};
use stockledger_inventory::{
    Discontinue, InventoryEvent, InventoryRecord, InventoryRecordCommand, InventoryRecordId,
    ItemId, Movement, MovementId, MovementReason, MovementType, Reactivate, RecordMovement,
    SetThresholds, SetUnitCost, StockStatus, ThresholdPatch,
};

use crate::alert_engine::AlertEngine;
use crate::analytics::OwnerAnalytics;
use crate::command_dispatcher::{CommandDispatcher, DispatchError};
use crate::event_store::{EventStore, StoredEvent};
use crate::notifications::NotificationDispatcher;
use crate::projections::{
    InventoryRecordView, MovementLog, MovementsProjection, RecordsProjection,
};
use crate::read_model::InMemoryOwnerStore;

/// Caller-supplied movement payload. Identity of the actor comes separately.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMovement {
    pub movement_type: MovementType,
    pub reason: MovementReason,
    pub quantity: i64,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub metadata: Option<JsonValue>,
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("unknown inventory record")]
    UnknownRecord,

    #[error("dispatch failed: {0:?}")]
    Dispatch(DispatchError),

    #[error("record directory lock poisoned")]
    Poisoned,

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<DispatchError> for LedgerError {
    fn from(value: DispatchError) -> Self {
        match value {
            DispatchError::UnknownRecord => LedgerError::UnknownRecord,
            other => LedgerError::Dispatch(other),
        }
    }
}

type DirectoryEntry = Arc<Mutex<Option<InventoryRecordId>>>;

/// Application service for the inventory quantity ledger.
pub struct LedgerService<S, B, N> {
    dispatcher: CommandDispatcher<S, B>,
    records: RecordsProjection<Arc<InMemoryOwnerStore<InventoryRecordId, InventoryRecordView>>>,
    movements: MovementsProjection<Arc<InMemoryOwnerStore<InventoryRecordId, MovementLog>>>,
    alerts: AlertEngine<S, B, N>,
    /// `(owner, item) → record` directory. Entry mutexes serialize the
    /// creating path so the one-record-per-pair invariant cannot race.
    directory: Mutex<HashMap<(OwnerId, ItemId), DirectoryEntry>>,
    scorer: ThresholdScorer,
}

impl<S, B, N> LedgerService<S, B, N>
where
    S: EventStore + Clone,
    B: EventBus<EventEnvelope<JsonValue>> + Clone,
    N: NotificationDispatcher,
{
    pub fn new(store: S, bus: B, notifier: N) -> Self {
        Self {
            dispatcher: CommandDispatcher::new(store.clone(), bus.clone()),
            records: RecordsProjection::new(Arc::new(InMemoryOwnerStore::new())),
            movements: MovementsProjection::new(Arc::new(InMemoryOwnerStore::new())),
            alerts: AlertEngine::new(store, bus, notifier),
            directory: Mutex::new(HashMap::new()),
            scorer: ThresholdScorer::new(),
        }
    }

    pub fn alerts(&self) -> &AlertEngine<S, B, N> {
        &self.alerts
    }

    /// Record a movement against `(owner, item)`.
    ///
    /// Auto-creates the record for `initial_stock` movements; any other reason
    /// against an unknown pair fails with [`LedgerError::UnknownRecord`]. On a
    /// status transition the alert hook runs synchronously but non-fatally.
    pub fn apply_movement(
        &self,
        owner_id: OwnerId,
        actor_id: ActorId,
        item_id: ItemId,
        movement: NewMovement,
    ) -> Result<Movement, LedgerError> {
        let entry = self.directory_entry(owner_id, item_id)?;
        let mut slot = entry.lock().map_err(|_| LedgerError::Poisoned)?;

        let (record_id, creating) = match *slot {
            Some(id) => (id, false),
            None => (InventoryRecordId::new(AggregateId::new()), true),
        };

        let command = InventoryRecordCommand::RecordMovement(RecordMovement {
            owner_id,
            record_id,
            item_id,
            movement_id: MovementId::new(),
            movement_type: movement.movement_type,
            reason: movement.reason,
            quantity: movement.quantity,
            performed_by: actor_id,
            reference: movement.reference,
            notes: movement.notes,
            metadata: movement.metadata,
            occurred_at: Utc::now(),
        });

        // Entry lock stays held across dispatch and read-model apply so the
        // projections see this record's events in sequence order.
        let committed = self.dispatch_record(owner_id, record_id, command)?;
        if creating {
            *slot = Some(record_id);
        }
        self.apply_committed(owner_id, &committed);
        drop(slot);

        let recorded = decode_events(&committed)
            .into_iter()
            .find_map(|e| match e {
                InventoryEvent::MovementRecorded(e) => Some(e),
                _ => None,
            })
            .ok_or_else(|| {
                LedgerError::Internal("committed batch without movement event".to_string())
            })?;

        let result = Movement::from(&recorded);
        self.run_alert_hook(
            owner_id,
            record_id,
            recorded.quantity_after,
            recorded.status_before,
            recorded.status_after,
        );
        Ok(result)
    }

    /// Configure thresholds for `(owner, item)`, opening the record at
    /// quantity zero when the pair is new. Threshold-only status transitions
    /// run the same alert hook as movements.
    pub fn set_thresholds(
        &self,
        owner_id: OwnerId,
        item_id: ItemId,
        patch: ThresholdPatch,
    ) -> Result<InventoryRecordView, LedgerError> {
        let entry = self.directory_entry(owner_id, item_id)?;
        let mut slot = entry.lock().map_err(|_| LedgerError::Poisoned)?;

        let (record_id, creating) = match *slot {
            Some(id) => (id, false),
            None => (InventoryRecordId::new(AggregateId::new()), true),
        };

        let command = InventoryRecordCommand::SetThresholds(SetThresholds {
            owner_id,
            record_id,
            item_id,
            patch,
            occurred_at: Utc::now(),
        });

        let committed = self.dispatch_record(owner_id, record_id, command)?;
        if creating {
            *slot = Some(record_id);
        }
        self.apply_committed(owner_id, &committed);
        drop(slot);

        if let Some(set) = decode_events(&committed).into_iter().find_map(|e| match e {
            InventoryEvent::ThresholdsSet(e) => Some(e),
            _ => None,
        }) {
            let quantity = self
                .records
                .get(owner_id, &record_id)
                .map(|v| v.quantity)
                .unwrap_or(0);
            self.run_alert_hook(owner_id, record_id, quantity, set.status_before, set.status_after);
        }

        self.record_view(owner_id, record_id)
    }

    pub fn set_unit_cost(
        &self,
        owner_id: OwnerId,
        item_id: ItemId,
        unit_cost: Option<u64>,
    ) -> Result<InventoryRecordView, LedgerError> {
        let (record_id, _committed) = self.with_record(owner_id, item_id, |record_id| {
            self.dispatch_record(
                owner_id,
                record_id,
                InventoryRecordCommand::SetUnitCost(SetUnitCost {
                    owner_id,
                    record_id,
                    unit_cost,
                    occurred_at: Utc::now(),
                }),
            )
        })?;
        self.record_view(owner_id, record_id)
    }

    pub fn discontinue(
        &self,
        owner_id: OwnerId,
        item_id: ItemId,
    ) -> Result<InventoryRecordView, LedgerError> {
        let (record_id, _committed) = self.with_record(owner_id, item_id, |record_id| {
            self.dispatch_record(
                owner_id,
                record_id,
                InventoryRecordCommand::Discontinue(Discontinue {
                    owner_id,
                    record_id,
                    occurred_at: Utc::now(),
                }),
            )
        })?;
        self.record_view(owner_id, record_id)
    }

    pub fn reactivate(
        &self,
        owner_id: OwnerId,
        item_id: ItemId,
    ) -> Result<InventoryRecordView, LedgerError> {
        let (record_id, committed) = self.with_record(owner_id, item_id, |record_id| {
            self.dispatch_record(
                owner_id,
                record_id,
                InventoryRecordCommand::Reactivate(Reactivate {
                    owner_id,
                    record_id,
                    occurred_at: Utc::now(),
                }),
            )
        })?;

        if let Some(reactivated) = decode_events(&committed).into_iter().find_map(|e| match e {
            InventoryEvent::RecordReactivated(e) => Some(e),
            _ => None,
        }) {
            let quantity = self
                .records
                .get(owner_id, &record_id)
                .map(|v| v.quantity)
                .unwrap_or(0);
            self.run_alert_hook(
                owner_id,
                record_id,
                quantity,
                StockStatus::Discontinued,
                reactivated.status_after,
            );
        }

        self.record_view(owner_id, record_id)
    }

    pub fn get_record(&self, owner_id: OwnerId, item_id: &ItemId) -> Option<InventoryRecordView> {
        self.records.get_by_item(owner_id, item_id)
    }

    pub fn get_record_by_id(
        &self,
        owner_id: OwnerId,
        record_id: &InventoryRecordId,
    ) -> Option<InventoryRecordView> {
        self.records.get(owner_id, record_id)
    }

    pub fn list_records(&self, owner_id: OwnerId) -> Vec<InventoryRecordView> {
        self.records.list(owner_id)
    }

    /// Chronological movement history (inclusive time bounds).
    pub fn movement_history(
        &self,
        owner_id: OwnerId,
        record_id: &InventoryRecordId,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<Movement>, LedgerError> {
        if self.records.get(owner_id, record_id).is_none() {
            return Err(LedgerError::UnknownRecord);
        }
        Ok(self.movements.history(owner_id, record_id, from, to))
    }

    pub fn analytics(&self, owner_id: OwnerId) -> OwnerAnalytics {
        OwnerAnalytics::compute(&self.records.list(owner_id), &self.movements.list(owner_id))
    }

    pub fn restock_recommendations(&self, owner_id: OwnerId) -> Vec<RestockRecommendation> {
        let snapshots: Vec<RecordSnapshot> = self
            .records
            .list(owner_id)
            .into_iter()
            .map(|v| RecordSnapshot {
                record_id: v.record_id,
                item_id: v.item_id,
                quantity: v.quantity,
                thresholds: v.thresholds,
                status: v.status,
                unit_cost: v.unit_cost,
                last_updated: v.last_updated,
            })
            .collect();
        self.scorer.recommend(&snapshots)
    }

    /// Feed an externally observed envelope into the ledger read models.
    ///
    /// Used by bus workers; the per-stream cursors make duplicates no-ops.
    pub fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) {
        if let Err(e) = self.records.apply_envelope(envelope) {
            tracing::warn!(error = %e, "records projection apply failed");
        }
        if let Err(e) = self.movements.apply_envelope(envelope) {
            tracing::warn!(error = %e, "movements projection apply failed");
        }
    }

    fn run_alert_hook(
        &self,
        owner_id: OwnerId,
        record_id: InventoryRecordId,
        quantity: i64,
        status_before: StockStatus,
        status_after: StockStatus,
    ) {
        if status_before == status_after {
            return;
        }
        let thresholds = self
            .records
            .get(owner_id, &record_id)
            .map(|v| v.thresholds)
            .unwrap_or_default();
        if let Err(e) = self.alerts.on_status_transition(
            owner_id,
            record_id,
            quantity,
            thresholds,
            status_before,
            status_after,
        ) {
            tracing::warn!(
                error = %e,
                record_id = %record_id,
                "alert hook failed; ledger write already committed"
            );
        }
    }

    fn record_view(
        &self,
        owner_id: OwnerId,
        record_id: InventoryRecordId,
    ) -> Result<InventoryRecordView, LedgerError> {
        self.records.get(owner_id, &record_id).ok_or_else(|| {
            LedgerError::Internal("record view missing after commit".to_string())
        })
    }

    fn directory_entry(
        &self,
        owner_id: OwnerId,
        item_id: ItemId,
    ) -> Result<DirectoryEntry, LedgerError> {
        let mut directory = self.directory.lock().map_err(|_| LedgerError::Poisoned)?;
        Ok(directory.entry((owner_id, item_id)).or_default().clone())
    }

    /// Run `f` against an existing record with its directory entry locked, so
    /// the committed batch reaches the projections in sequence order.
    fn with_record(
        &self,
        owner_id: OwnerId,
        item_id: ItemId,
        f: impl FnOnce(InventoryRecordId) -> Result<Vec<StoredEvent>, LedgerError>,
    ) -> Result<(InventoryRecordId, Vec<StoredEvent>), LedgerError> {
        let entry = self.directory_entry(owner_id, item_id)?;
        let mut slot = entry.lock().map_err(|_| LedgerError::Poisoned)?;
        let record_id = match *slot {
            Some(id) => id,
            // Directory is process-local; fall back to the projection.
            None => match self.records.get_by_item(owner_id, &item_id) {
                Some(view) => {
                    *slot = Some(view.record_id);
                    view.record_id
                }
                None => return Err(LedgerError::UnknownRecord),
            },
        };
        let committed = f(record_id)?;
        self.apply_committed(owner_id, &committed);
        Ok((record_id, committed))
    }

    fn dispatch_record(
        &self,
        owner_id: OwnerId,
        record_id: InventoryRecordId,
        command: InventoryRecordCommand,
    ) -> Result<Vec<StoredEvent>, LedgerError> {
        self.dispatcher
            .dispatch::<InventoryRecord>(
                owner_id,
                record_id.0,
                "ledger.record",
                command,
                |_owner_id, aggregate_id| {
                    InventoryRecord::empty(InventoryRecordId::new(aggregate_id))
                },
            )
            .map_err(Into::into)
    }

    /// Apply freshly committed events so the write path observes its own
    /// writes; a later bus replay of the same envelopes is deduped by cursor.
    fn apply_committed(&self, _owner_id: OwnerId, committed: &[StoredEvent]) {
        for stored in committed {
            self.apply_envelope(&stored.to_envelope());
        }
    }
}

fn decode_events(committed: &[StoredEvent]) -> Vec<InventoryEvent> {
    committed
        .iter()
        .filter_map(|stored| serde_json::from_value(stored.payload.clone()).ok())
        .collect()
}
