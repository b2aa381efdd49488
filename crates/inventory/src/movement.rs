//! Movement value types: the immutable, signed quantity-change events that make
//! up the ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use stockledger_core::ActorId;

use crate::record::{InventoryRecordId, MovementRecorded};

/// Movement identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MovementId(pub Uuid);

impl MovementId {
    /// Uses UUIDv7 (time-ordered). Prefer passing IDs explicitly in tests.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for MovementId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for MovementId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Physical direction of a movement. Direction comes from the type; the
/// requested quantity is always entered as a positive magnitude.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    Inbound,
    Outbound,
    Adjustment,
    /// Outbound on the source record; a cross-record transfer is two movements
    /// correlated by a shared `reference`.
    Transfer,
    Return,
    Damage,
    Expired,
    Theft,
    CycleCount,
}

impl MovementType {
    /// +1 for quantity-increasing types, -1 for decreasing ones.
    pub fn direction(self) -> i64 {
        match self {
            MovementType::Inbound
            | MovementType::Adjustment
            | MovementType::Return
            | MovementType::CycleCount => 1,
            MovementType::Outbound
            | MovementType::Transfer
            | MovementType::Damage
            | MovementType::Expired
            | MovementType::Theft => -1,
        }
    }

    /// Signed delta for a positive requested magnitude.
    pub fn signed_delta(self, quantity: i64) -> i64 {
        self.direction() * quantity
    }
}

/// Business reason attached to a movement.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementReason {
    Purchase,
    Sale,
    Adjustment,
    Transfer,
    Return,
    Damage,
    Expiry,
    Theft,
    CycleCount,
    /// Corrections are new movements, never edits of old ones.
    Correction,
    /// The only reason allowed to auto-create an inventory record.
    InitialStock,
}

/// Materialized view of a persisted movement.
///
/// Built from a committed [`MovementRecorded`] event; immutable thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    pub movement_id: MovementId,
    pub record_id: InventoryRecordId,
    pub movement_type: MovementType,
    pub reason: MovementReason,
    /// Positive magnitude of the requested change.
    pub quantity: i64,
    pub quantity_before: i64,
    pub quantity_after: i64,
    /// Unit cost in minor currency units at apply time.
    pub unit_cost: Option<u64>,
    pub total_cost: Option<u64>,
    pub performed_by: ActorId,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub metadata: Option<JsonValue>,
    pub created_at: DateTime<Utc>,
}

impl From<&MovementRecorded> for Movement {
    fn from(e: &MovementRecorded) -> Self {
        Self {
            movement_id: e.movement_id,
            record_id: e.record_id,
            movement_type: e.movement_type,
            reason: e.reason,
            quantity: e.quantity,
            quantity_before: e.quantity_before,
            quantity_after: e.quantity_after,
            unit_cost: e.unit_cost,
            total_cost: e.total_cost,
            performed_by: e.performed_by,
            reference: e.reference.clone(),
            notes: e.notes.clone(),
            metadata: e.metadata.clone(),
            created_at: e.occurred_at,
        }
    }
}
