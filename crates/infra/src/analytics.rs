//! Owner-level inventory analytics (pure read composition, no mutation).

use serde::{Deserialize, Serialize};

use stockledger_inventory::{InventoryRecordId, ItemId, StockStatus};

use crate::projections::{InventoryRecordView, MovementLog};

const TOP_ITEMS_LIMIT: usize = 10;

/// Highest-value records for an owner, by on-hand value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopItem {
    pub record_id: InventoryRecordId,
    pub item_id: ItemId,
    pub quantity: i64,
    /// `quantity * unit_cost` in minor currency units.
    pub value: u64,
}

/// Aggregated figures over one owner's records and movement history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnerAnalytics {
    pub total_records: usize,
    /// Σ quantity × unit_cost (records without a unit cost contribute zero).
    pub total_value: u64,
    pub low_stock_count: usize,
    pub out_of_stock_count: usize,
    pub overstock_count: usize,
    pub average_unit_cost: Option<u64>,
    /// Σ outbound quantity ÷ mean on-hand quantity. Zero when undefined.
    pub average_stock_turnover: f64,
    pub top_items: Vec<TopItem>,
}

impl OwnerAnalytics {
    pub fn compute(records: &[InventoryRecordView], logs: &[MovementLog]) -> Self {
        let total_records = records.len();
        let total_value: u64 = records.iter().map(record_value).sum();

        let low_stock_count = count_status(records, StockStatus::LowStock);
        let out_of_stock_count = count_status(records, StockStatus::OutOfStock);
        let overstock_count = count_status(records, StockStatus::Overstock);

        let costed: Vec<u64> = records.iter().filter_map(|r| r.unit_cost).collect();
        let average_unit_cost = if costed.is_empty() {
            None
        } else {
            Some(costed.iter().sum::<u64>() / costed.len() as u64)
        };

        let outbound_total: i64 = logs
            .iter()
            .flat_map(|log| &log.movements)
            .filter(|m| m.movement_type.direction() < 0)
            .map(|m| m.quantity)
            .sum();
        let on_hand_total: i64 = records.iter().map(|r| r.quantity).sum();
        let average_stock_turnover = if total_records == 0 || on_hand_total == 0 {
            0.0
        } else {
            let mean_on_hand = on_hand_total as f64 / total_records as f64;
            outbound_total as f64 / mean_on_hand
        };

        let mut top_items: Vec<TopItem> = records
            .iter()
            .map(|r| TopItem {
                record_id: r.record_id,
                item_id: r.item_id,
                quantity: r.quantity,
                value: record_value(r),
            })
            .collect();
        top_items.sort_by(|a, b| b.value.cmp(&a.value));
        top_items.truncate(TOP_ITEMS_LIMIT);

        Self {
            total_records,
            total_value,
            low_stock_count,
            out_of_stock_count,
            overstock_count,
            average_unit_cost,
            average_stock_turnover,
            top_items,
        }
    }
}

fn record_value(record: &InventoryRecordView) -> u64 {
    record
        .unit_cost
        .map(|c| c.saturating_mul(record.quantity.max(0) as u64))
        .unwrap_or(0)
}

fn count_status(records: &[InventoryRecordView], status: StockStatus) -> usize {
    records.iter().filter(|r| r.status == status).count()
}
