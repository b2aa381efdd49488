//! Fire-and-forget alert notifications.
//!
//! Notifications are a side channel, never a dependency: the engine hands a
//! request to the dispatcher and moves on. No waiting, no retry; delivery
//! guarantees (if any) belong to the implementation behind the trait.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use stockledger_alerts::{AlertId, AlertPriority, AlertType};
use stockledger_core::OwnerId;
use stockledger_inventory::InventoryRecordId;

/// Outbound notification for a newly opened alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub owner_id: OwnerId,
    pub alert_id: AlertId,
    pub record_id: InventoryRecordId,
    pub alert_type: AlertType,
    pub priority: AlertPriority,
    pub message: String,
}

/// Notification delivery seam.
pub trait NotificationDispatcher: Send + Sync {
    fn dispatch(&self, request: NotificationRequest);
}

impl<D> NotificationDispatcher for Arc<D>
where
    D: NotificationDispatcher + ?Sized,
{
    fn dispatch(&self, request: NotificationRequest) {
        (**self).dispatch(request)
    }
}

/// Dispatcher that only logs. Default for dev/test wiring.
#[derive(Debug, Copy, Clone, Default)]
pub struct LogNotificationDispatcher;

impl NotificationDispatcher for LogNotificationDispatcher {
    fn dispatch(&self, request: NotificationRequest) {
        tracing::info!(
            alert_id = %request.alert_id,
            record_id = %request.record_id,
            alert_type = request.alert_type.as_str(),
            "alert notification"
        );
    }
}
