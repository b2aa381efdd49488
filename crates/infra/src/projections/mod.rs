//! Projection implementations (read model builders).
//!
//! Projections consume published envelopes and build query-optimized read
//! models. All projections are:
//! - **Rebuildable**: reconstructed from the event stream at any time
//! - **Owner-isolated**: data is partitioned by owner
//! - **Idempotent**: safe for at-least-once delivery (per-stream cursors)

pub mod alerts;
pub mod movements;
pub mod records;

pub use alerts::{AlertView, AlertsProjection, AlertsProjectionError};
pub use movements::{MovementLog, MovementsProjection, MovementsProjectionError};
pub use records::{InventoryRecordView, RecordsProjection, RecordsProjectionError};
