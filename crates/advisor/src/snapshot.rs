use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockledger_inventory::{InventoryRecordId, ItemId, StockStatus, StockThresholds};

/// Point-in-time view of an inventory record, as read from a projection.
///
/// Scorers treat this as immutable input; the advisor never reaches back into
/// the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSnapshot {
    pub record_id: InventoryRecordId,
    pub item_id: ItemId,
    pub quantity: i64,
    pub thresholds: StockThresholds,
    pub status: StockStatus,
    /// Unit cost in minor currency units, when known.
    pub unit_cost: Option<u64>,
    pub last_updated: Option<DateTime<Utc>>,
}
