//! Alert engine: status-transition hook, deduplication, lifecycle dispatch.
//!
//! Alerts are evaluated synchronously inside the movement/threshold flow but
//! are never allowed to fail it: callers treat every error from this module as
//! non-fatal. The engine keeps its own mutex-guarded active-alert index so the
//! at-most-one-active-alert-per-type invariant cannot race the asynchronous
//! projection feed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use serde_json::{Value as JsonValue, json};
use thiserror::Error;

use stockledger_alerts::{
    AcknowledgeAlert, Alert, AlertCommand, AlertId, AlertPriority, AlertType, DismissAlert,
    OpenAlert, RefreshAlert, ResolveAlert,
};
use stockledger_core::{ActorId, AggregateId, OwnerId};
use stockledger_events::{EventBus, EventEnvelope};
use stockledger_inventory::{InventoryRecordId, StockStatus, StockThresholds};

use crate::command_dispatcher::{CommandDispatcher, DispatchError};
use crate::event_store::{EventStore, StoredEvent};
use crate::notifications::{NotificationDispatcher, NotificationRequest};
use crate::projections::{AlertView, AlertsProjection};
use crate::read_model::InMemoryOwnerStore;

const STOCK_LEVEL_TYPES: [AlertType; 3] = [
    AlertType::LowStock,
    AlertType::OutOfStock,
    AlertType::Overstock,
];

type ActiveIndex = HashMap<(OwnerId, InventoryRecordId, AlertType), AlertId>;

#[derive(Debug, Error)]
pub enum AlertEngineError {
    #[error("alert dispatch failed: {0:?}")]
    Dispatch(DispatchError),

    #[error("alert projection failed: {0}")]
    Projection(String),

    #[error("alert not found")]
    NotFound,

    #[error("alert engine index lock poisoned")]
    Poisoned,
}

impl From<DispatchError> for AlertEngineError {
    fn from(value: DispatchError) -> Self {
        match value {
            DispatchError::NotFound => AlertEngineError::NotFound,
            other => AlertEngineError::Dispatch(other),
        }
    }
}

/// Alert lifecycle orchestrator.
///
/// Owns an alert command dispatcher, the alerts projection, the synchronous
/// active-alert index, and the notification seam.
pub struct AlertEngine<S, B, N> {
    dispatcher: CommandDispatcher<S, B>,
    projection: AlertsProjection<Arc<InMemoryOwnerStore<AlertId, AlertView>>>,
    active: Mutex<ActiveIndex>,
    notifier: N,
}

impl<S, B, N> AlertEngine<S, B, N>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
    N: NotificationDispatcher,
{
    pub fn new(store: S, bus: B, notifier: N) -> Self {
        Self {
            dispatcher: CommandDispatcher::new(store, bus),
            projection: AlertsProjection::new(Arc::new(InMemoryOwnerStore::new())),
            active: Mutex::new(HashMap::new()),
            notifier,
        }
    }

    pub fn get(&self, owner_id: OwnerId, alert_id: &AlertId) -> Option<AlertView> {
        self.projection.get(owner_id, alert_id)
    }

    pub fn list(&self, owner_id: OwnerId) -> Vec<AlertView> {
        self.projection.list(owner_id)
    }

    pub fn list_active(&self, owner_id: OwnerId, alert_type: Option<AlertType>) -> Vec<AlertView> {
        self.projection.list_active(owner_id, alert_type)
    }

    /// React to a stock status transition on one record.
    ///
    /// - Transition to `in_stock`: auto-resolve every active stock-level alert.
    /// - Transition to a stock-level status: open an alert of the matching
    ///   type, refreshing an already-active one instead of duplicating it. An
    ///   active stock-level alert of a *different* type is resolved as
    ///   superseded first, so a record carries at most one active stock-level
    ///   alert.
    /// - Transition to `discontinued`: no alert activity.
    pub fn on_status_transition(
        &self,
        owner_id: OwnerId,
        record_id: InventoryRecordId,
        quantity: i64,
        thresholds: StockThresholds,
        status_before: StockStatus,
        status_after: StockStatus,
    ) -> Result<(), AlertEngineError> {
        let mut index = self.active.lock().map_err(|_| AlertEngineError::Poisoned)?;

        match status_after {
            StockStatus::InStock => {
                for alert_type in STOCK_LEVEL_TYPES {
                    self.resolve_indexed(
                        &mut index,
                        owner_id,
                        record_id,
                        alert_type,
                        "auto-resolved by stock replenishment",
                    )?;
                }
            }
            StockStatus::LowStock | StockStatus::OutOfStock | StockStatus::Overstock => {
                let (alert_type, priority) = match status_after {
                    StockStatus::LowStock => (AlertType::LowStock, AlertPriority::Medium),
                    StockStatus::OutOfStock => (AlertType::OutOfStock, AlertPriority::Critical),
                    _ => (AlertType::Overstock, AlertPriority::Low),
                };

                for superseded in STOCK_LEVEL_TYPES.into_iter().filter(|t| *t != alert_type) {
                    self.resolve_indexed(
                        &mut index,
                        owner_id,
                        record_id,
                        superseded,
                        &format!("superseded by {} alert", alert_type.as_str()),
                    )?;
                }

                let message = match alert_type {
                    AlertType::LowStock => format!(
                        "Low stock: {quantity} units remaining (minimum {})",
                        thresholds.minimum_stock
                    ),
                    AlertType::OutOfStock => "Out of stock".to_string(),
                    _ => format!(
                        "Overstock: {quantity} units on hand (maximum {})",
                        thresholds.maximum_stock
                    ),
                };
                let metadata = json!({
                    "quantity": quantity,
                    "minimum_stock": thresholds.minimum_stock,
                    "maximum_stock": thresholds.maximum_stock,
                    "previous_status": status_before.as_str(),
                    "new_status": status_after.as_str(),
                });

                self.open_or_refresh(
                    &mut index,
                    owner_id,
                    record_id,
                    alert_type,
                    priority,
                    message,
                    Some(metadata),
                )?;
            }
            StockStatus::Discontinued => {}
        }

        Ok(())
    }

    /// Open an alert manually (same deduplication rule as the hook: an active
    /// alert of the same type is refreshed instead of duplicated).
    pub fn create_alert(
        &self,
        owner_id: OwnerId,
        record_id: InventoryRecordId,
        alert_type: AlertType,
        priority: AlertPriority,
        message: String,
        metadata: Option<JsonValue>,
    ) -> Result<AlertView, AlertEngineError> {
        let mut index = self.active.lock().map_err(|_| AlertEngineError::Poisoned)?;
        let alert_id =
            self.open_or_refresh(&mut index, owner_id, record_id, alert_type, priority, message, metadata)?;
        self.view(owner_id, alert_id)
    }

    pub fn acknowledge(
        &self,
        owner_id: OwnerId,
        alert_id: AlertId,
        acknowledged_by: ActorId,
        notes: Option<String>,
    ) -> Result<AlertView, AlertEngineError> {
        let committed = self.dispatch_alert(
            owner_id,
            alert_id,
            AlertCommand::AcknowledgeAlert(AcknowledgeAlert {
                owner_id,
                alert_id,
                acknowledged_by,
                notes,
                occurred_at: Utc::now(),
            }),
        )?;
        self.apply_committed(&committed);

        // Deduplication covers active alerts only: once acknowledged, a later
        // trigger of the same type opens a fresh alert.
        let view = self.view(owner_id, alert_id)?;
        let mut index = self.active.lock().map_err(|_| AlertEngineError::Poisoned)?;
        index.remove(&(owner_id, view.record_id, view.alert_type));
        Ok(view)
    }

    pub fn resolve(
        &self,
        owner_id: OwnerId,
        alert_id: AlertId,
        resolved_by: Option<ActorId>,
        notes: Option<String>,
    ) -> Result<AlertView, AlertEngineError> {
        let committed = self.dispatch_alert(
            owner_id,
            alert_id,
            AlertCommand::ResolveAlert(ResolveAlert {
                owner_id,
                alert_id,
                resolved_by,
                notes,
                occurred_at: Utc::now(),
            }),
        )?;
        self.apply_committed(&committed);

        let view = self.view(owner_id, alert_id)?;
        let mut index = self.active.lock().map_err(|_| AlertEngineError::Poisoned)?;
        index.remove(&(owner_id, view.record_id, view.alert_type));
        Ok(view)
    }

    pub fn dismiss(
        &self,
        owner_id: OwnerId,
        alert_id: AlertId,
        dismissed_by: ActorId,
        notes: Option<String>,
    ) -> Result<AlertView, AlertEngineError> {
        let committed = self.dispatch_alert(
            owner_id,
            alert_id,
            AlertCommand::DismissAlert(DismissAlert {
                owner_id,
                alert_id,
                dismissed_by,
                notes,
                occurred_at: Utc::now(),
            }),
        )?;
        self.apply_committed(&committed);

        let view = self.view(owner_id, alert_id)?;
        let mut index = self.active.lock().map_err(|_| AlertEngineError::Poisoned)?;
        index.remove(&(owner_id, view.record_id, view.alert_type));
        Ok(view)
    }

    /// Feed an externally observed envelope into the alerts projection.
    ///
    /// Used by workers replaying the bus; duplicates are ignored by the cursor.
    pub fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) {
        if let Err(e) = self.projection.apply_envelope(envelope) {
            tracing::warn!(error = %e, "alerts projection apply failed");
        }
    }

    fn view(&self, owner_id: OwnerId, alert_id: AlertId) -> Result<AlertView, AlertEngineError> {
        self.projection
            .get(owner_id, &alert_id)
            .ok_or(AlertEngineError::NotFound)
    }

    /// Open a fresh alert or refresh the active one of the same type.
    /// Caller holds the index lock, which is what makes the dedupe race-free.
    fn open_or_refresh(
        &self,
        index: &mut MutexGuard<'_, ActiveIndex>,
        owner_id: OwnerId,
        record_id: InventoryRecordId,
        alert_type: AlertType,
        priority: AlertPriority,
        message: String,
        metadata: Option<JsonValue>,
    ) -> Result<AlertId, AlertEngineError> {
        if let Some(existing) = index.get(&(owner_id, record_id, alert_type)).copied() {
            let committed = self.dispatch_alert(
                owner_id,
                existing,
                AlertCommand::RefreshAlert(RefreshAlert {
                    owner_id,
                    alert_id: existing,
                    priority,
                    message,
                    metadata,
                    occurred_at: Utc::now(),
                }),
            )?;
            self.apply_committed(&committed);
            return Ok(existing);
        }

        let alert_id = AlertId::new(AggregateId::new());
        let committed = self.dispatch_alert(
            owner_id,
            alert_id,
            AlertCommand::OpenAlert(OpenAlert {
                owner_id,
                alert_id,
                record_id,
                alert_type,
                priority,
                message: message.clone(),
                metadata,
                occurred_at: Utc::now(),
            }),
        )?;
        self.apply_committed(&committed);
        index.insert((owner_id, record_id, alert_type), alert_id);

        // Fire-and-forget; delivery problems are the dispatcher's business.
        self.notifier.dispatch(NotificationRequest {
            owner_id,
            alert_id,
            record_id,
            alert_type,
            priority,
            message,
        });

        Ok(alert_id)
    }

    fn resolve_indexed(
        &self,
        index: &mut MutexGuard<'_, ActiveIndex>,
        owner_id: OwnerId,
        record_id: InventoryRecordId,
        alert_type: AlertType,
        notes: &str,
    ) -> Result<(), AlertEngineError> {
        let alert_id = match index.get(&(owner_id, record_id, alert_type)).copied() {
            Some(id) => id,
            None => return Ok(()),
        };

        let committed = self.dispatch_alert(
            owner_id,
            alert_id,
            AlertCommand::ResolveAlert(ResolveAlert {
                owner_id,
                alert_id,
                resolved_by: None,
                notes: Some(notes.to_string()),
                occurred_at: Utc::now(),
            }),
        )?;
        self.apply_committed(&committed);
        index.remove(&(owner_id, record_id, alert_type));
        Ok(())
    }

    fn dispatch_alert(
        &self,
        owner_id: OwnerId,
        alert_id: AlertId,
        command: AlertCommand,
    ) -> Result<Vec<StoredEvent>, AlertEngineError> {
        let committed = self.dispatcher.dispatch::<Alert>(
            owner_id,
            alert_id.0,
            "ledger.alert",
            command,
            |_owner_id, aggregate_id| Alert::empty(AlertId::new(aggregate_id)),
        )?;
        Ok(committed)
    }

    /// Apply freshly committed events to the local projection so lifecycle
    /// calls observe their own writes. The cursor makes a later bus replay of
    /// the same events a no-op.
    fn apply_committed(&self, committed: &[StoredEvent]) {
        for stored in committed {
            if let Err(e) = self.projection.apply_envelope(&stored.to_envelope()) {
                tracing::warn!(error = %e, "alerts projection apply failed");
            }
        }
    }
}
