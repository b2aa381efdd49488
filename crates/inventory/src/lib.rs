//! Inventory ledger domain module (event-sourced).
//!
//! This crate contains the business rules for the inventory quantity ledger,
//! implemented purely as deterministic domain logic (no IO, no HTTP, no storage).
//! An inventory record's append-only event stream *is* its movement ledger.

pub mod movement;
pub mod record;
pub mod status;

pub use movement::{Movement, MovementId, MovementReason, MovementType};
pub use record::{
    Discontinue, InventoryEvent, InventoryRecord, InventoryRecordCommand, InventoryRecordId,
    ItemId, MovementRecorded, Reactivate, RecordDiscontinued, RecordMovement, RecordOpened,
    RecordReactivated, SetThresholds, SetUnitCost, StockThresholds, ThresholdPatch,
    ThresholdsSet, UnitCostSet,
};
pub use status::{StockStatus, derive_status};
