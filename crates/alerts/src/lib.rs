//! Alert domain module (event-sourced).
//!
//! Alerts are first-class records with their own lifecycle, not transient
//! notifications. The lifecycle state machine lives here; deduplication and
//! status-transition wiring live in the application layer.

pub mod alert;

pub use alert::{
    AcknowledgeAlert, Alert, AlertAcknowledged, AlertCommand, AlertDismissed, AlertEvent,
    AlertId, AlertOpened, AlertPriority, AlertRefreshed, AlertResolved, AlertStatus, AlertType,
    DismissAlert, OpenAlert, RefreshAlert, ResolveAlert,
};
