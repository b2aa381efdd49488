use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use stockledger_alerts::{AlertEvent, AlertId, AlertPriority, AlertStatus, AlertType};
use stockledger_core::{ActorId, AggregateId, OwnerId};
use stockledger_events::EventEnvelope;
use stockledger_inventory::InventoryRecordId;

use crate::read_model::OwnerStore;

/// Queryable alert read model: one row per alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertView {
    pub alert_id: AlertId,
    pub record_id: InventoryRecordId,
    pub alert_type: AlertType,
    pub status: AlertStatus,
    pub priority: AlertPriority,
    pub message: String,
    pub metadata: Option<JsonValue>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub acknowledged_by: Option<ActorId>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<ActorId>,
    pub resolution_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct CursorKey {
    owner_id: OwnerId,
    aggregate_id: AggregateId,
}

#[derive(Debug, Error)]
pub enum AlertsProjectionError {
    #[error("failed to deserialize alert event: {0}")]
    Deserialize(String),

    #[error("owner isolation violation: {0}")]
    OwnerIsolation(String),

    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },

    #[error("alert event for unknown alert stream")]
    UnknownAlert,
}

/// Alerts projection.
#[derive(Debug)]
pub struct AlertsProjection<S>
where
    S: OwnerStore<AlertId, AlertView>,
{
    store: S,
    cursors: RwLock<HashMap<CursorKey, u64>>,
}

impl<S> AlertsProjection<S>
where
    S: OwnerStore<AlertId, AlertView>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, owner_id: OwnerId, alert_id: &AlertId) -> Option<AlertView> {
        self.store.get(owner_id, alert_id)
    }

    pub fn list(&self, owner_id: OwnerId) -> Vec<AlertView> {
        let mut alerts = self.store.list(owner_id);
        alerts.sort_by_key(|a| a.created_at);
        alerts
    }

    /// Active alerts for an owner, optionally filtered by type.
    pub fn list_active(&self, owner_id: OwnerId, alert_type: Option<AlertType>) -> Vec<AlertView> {
        self.list(owner_id)
            .into_iter()
            .filter(|a| a.status == AlertStatus::Active)
            .filter(|a| alert_type.is_none_or(|t| a.alert_type == t))
            .collect()
    }

    /// Apply a published envelope into the projection (idempotent, cursor-checked).
    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), AlertsProjectionError> {
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
                return Err(AlertsProjectionError::NonMonotonicSequence { last, found: seq });
            }

            if seq <= last {
                return Ok(());
            }

            if seq != last + 1 && last != 0 {
                return Err(AlertsProjectionError::NonMonotonicSequence { last, found: seq });
            }

            let event: AlertEvent = serde_json::from_value(envelope.payload().clone())
                .map_err(|e| AlertsProjectionError::Deserialize(e.to_string()))?;

            let (event_owner, alert_id) = match &event {
                AlertEvent::AlertOpened(e) => (e.owner_id, e.alert_id),
                AlertEvent::AlertRefreshed(e) => (e.owner_id, e.alert_id),
                AlertEvent::AlertAcknowledged(e) => (e.owner_id, e.alert_id),
                AlertEvent::AlertResolved(e) => (e.owner_id, e.alert_id),
                AlertEvent::AlertDismissed(e) => (e.owner_id, e.alert_id),
            };

            if event_owner != owner_id {
                return Err(AlertsProjectionError::OwnerIsolation(
                    "event owner_id does not match envelope owner_id".to_string(),
                ));
            }
            if alert_id.0 != aggregate_id {
                return Err(AlertsProjectionError::OwnerIsolation(
                    "event alert_id does not match envelope aggregate_id".to_string(),
                ));
            }

            match event {
                AlertEvent::AlertOpened(e) => {
                    self.store.upsert(
                        owner_id,
                        e.alert_id,
                        AlertView {
                            alert_id: e.alert_id,
                            record_id: e.record_id,
                            alert_type: e.alert_type,
                            status: AlertStatus::Active,
                            priority: e.priority,
                            message: e.message,
                            metadata: e.metadata,
                            acknowledged_at: None,
                            acknowledged_by: None,
                            resolved_at: None,
                            resolved_by: None,
                            resolution_notes: None,
                            created_at: e.occurred_at,
                            updated_at: e.occurred_at,
                        },
                    );
                }
                AlertEvent::AlertRefreshed(e) => {
                    let mut view = self
                        .store
                        .get(owner_id, &e.alert_id)
                        .ok_or(AlertsProjectionError::UnknownAlert)?;
                    view.priority = e.priority;
                    view.message = e.message;
                    view.metadata = e.metadata;
                    view.updated_at = e.occurred_at;
                    self.store.upsert(owner_id, e.alert_id, view);
                }
                AlertEvent::AlertAcknowledged(e) => {
                    let mut view = self
                        .store
                        .get(owner_id, &e.alert_id)
                        .ok_or(AlertsProjectionError::UnknownAlert)?;
                    view.status = AlertStatus::Acknowledged;
                    view.acknowledged_at = Some(e.occurred_at);
                    view.acknowledged_by = Some(e.acknowledged_by);
                    view.updated_at = e.occurred_at;
                    self.store.upsert(owner_id, e.alert_id, view);
                }
                AlertEvent::AlertResolved(e) => {
                    let mut view = self
                        .store
                        .get(owner_id, &e.alert_id)
                        .ok_or(AlertsProjectionError::UnknownAlert)?;
                    view.status = AlertStatus::Resolved;
                    view.resolved_at = Some(e.occurred_at);
                    view.resolved_by = e.resolved_by;
                    view.resolution_notes = e.notes;
                    view.updated_at = e.occurred_at;
                    self.store.upsert(owner_id, e.alert_id, view);
                }
                AlertEvent::AlertDismissed(e) => {
                    let mut view = self
                        .store
                        .get(owner_id, &e.alert_id)
                        .ok_or(AlertsProjectionError::UnknownAlert)?;
                    view.status = AlertStatus::Dismissed;
                    view.updated_at = e.occurred_at;
                    self.store.upsert(owner_id, e.alert_id, view);
                }
            }

            cursors.insert(key, seq);
        }

        Ok(())
    }
}
