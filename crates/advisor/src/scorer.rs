use stockledger_inventory::StockStatus;

use crate::recommendation::{RestockRecommendation, Urgency, prioritize};
use crate::snapshot::RecordSnapshot;

/// Scoring seam: turn a record snapshot into a recommendation (or nothing).
///
/// Implementations must be pure over their input snapshot.
pub trait RestockScorer: Send + Sync + 'static {
    fn score(&self, snapshot: &RecordSnapshot) -> Option<RestockRecommendation>;

    /// Score a batch and return it prioritized.
    fn recommend(&self, snapshots: &[RecordSnapshot]) -> Vec<RestockRecommendation> {
        let recommendations = snapshots.iter().filter_map(|s| self.score(s)).collect();
        prioritize(recommendations)
    }
}

/// Deterministic threshold-based scorer.
///
/// Recommends for `low_stock`/`out_of_stock` records only:
/// - quantity to order: `max(ceil(minimum_stock * 1.5), reorder_quantity)`
/// - urgency: `high` when out of stock or at/below half the minimum,
///   `medium` at/below the minimum, `low` otherwise.
#[derive(Debug, Copy, Clone, Default)]
pub struct ThresholdScorer;

impl ThresholdScorer {
    pub fn new() -> Self {
        Self
    }
}

impl RestockScorer for ThresholdScorer {
    fn score(&self, snapshot: &RecordSnapshot) -> Option<RestockRecommendation> {
        if !matches!(
            snapshot.status,
            StockStatus::LowStock | StockStatus::OutOfStock
        ) {
            return None;
        }

        let minimum = snapshot.thresholds.minimum_stock;
        // Integer ceil of minimum * 1.5 (minimum is validated non-negative).
        let target = (minimum * 3 + 1) / 2;
        let recommended_quantity = target.max(snapshot.thresholds.reorder_quantity);

        let urgency = if snapshot.status == StockStatus::OutOfStock
            || snapshot.quantity * 2 <= minimum
        {
            Urgency::High
        } else if snapshot.quantity <= minimum {
            Urgency::Medium
        } else {
            Urgency::Low
        };

        let estimated_cost = snapshot
            .unit_cost
            .map(|c| c.saturating_mul(recommended_quantity.max(0) as u64));

        Some(RestockRecommendation {
            record_id: snapshot.record_id,
            item_id: snapshot.item_id,
            current_quantity: snapshot.quantity,
            minimum_stock: minimum,
            recommended_quantity,
            urgency,
            estimated_cost,
            last_updated: snapshot.last_updated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use stockledger_core::AggregateId;
    use stockledger_inventory::{InventoryRecordId, ItemId, StockThresholds};

    fn snapshot(quantity: i64, minimum: i64, reorder_quantity: i64, status: StockStatus) -> RecordSnapshot {
        RecordSnapshot {
            record_id: InventoryRecordId::new(AggregateId::new()),
            item_id: ItemId::new(AggregateId::new()),
            quantity,
            thresholds: StockThresholds {
                minimum_stock: minimum,
                maximum_stock: 0,
                reorder_point: 0,
                reorder_quantity,
            },
            status,
            unit_cost: Some(200),
            last_updated: Some(Utc::now()),
        }
    }

    #[test]
    fn healthy_records_yield_nothing() {
        let scorer = ThresholdScorer::new();
        assert!(scorer.score(&snapshot(50, 10, 0, StockStatus::InStock)).is_none());
        assert!(scorer.score(&snapshot(500, 10, 0, StockStatus::Overstock)).is_none());
        assert!(scorer.score(&snapshot(5, 10, 0, StockStatus::Discontinued)).is_none());
    }

    #[test]
    fn recommended_quantity_is_max_of_scaled_minimum_and_reorder() {
        let scorer = ThresholdScorer::new();

        // ceil(10 * 1.5) = 15 > reorder_quantity 0
        let r = scorer.score(&snapshot(5, 10, 0, StockStatus::LowStock)).unwrap();
        assert_eq!(r.recommended_quantity, 15);

        // ceil(9 * 1.5) = 14 (27/2 rounded up)
        let r = scorer.score(&snapshot(4, 9, 0, StockStatus::LowStock)).unwrap();
        assert_eq!(r.recommended_quantity, 14);

        // reorder_quantity wins when larger
        let r = scorer.score(&snapshot(5, 10, 40, StockStatus::LowStock)).unwrap();
        assert_eq!(r.recommended_quantity, 40);
    }

    #[test]
    fn urgency_bands() {
        let scorer = ThresholdScorer::new();

        let r = scorer.score(&snapshot(0, 10, 0, StockStatus::OutOfStock)).unwrap();
        assert_eq!(r.urgency, Urgency::High);

        // At half the minimum -> high.
        let r = scorer.score(&snapshot(5, 10, 0, StockStatus::LowStock)).unwrap();
        assert_eq!(r.urgency, Urgency::High);

        // Above half but at/below minimum -> medium.
        let r = scorer.score(&snapshot(8, 10, 0, StockStatus::LowStock)).unwrap();
        assert_eq!(r.urgency, Urgency::Medium);
    }

    #[test]
    fn estimated_cost_uses_unit_cost() {
        let scorer = ThresholdScorer::new();
        let r = scorer.score(&snapshot(5, 10, 0, StockStatus::LowStock)).unwrap();
        assert_eq!(r.estimated_cost, Some(15 * 200));

        let mut s = snapshot(5, 10, 0, StockStatus::LowStock);
        s.unit_cost = None;
        let r = scorer.score(&s).unwrap();
        assert_eq!(r.estimated_cost, None);
    }

    #[test]
    fn recommend_returns_prioritized_batch() {
        let scorer = ThresholdScorer::new();
        let batch = vec![
            snapshot(8, 10, 0, StockStatus::LowStock),
            snapshot(0, 10, 0, StockStatus::OutOfStock),
            snapshot(50, 10, 0, StockStatus::InStock),
        ];
        let out = scorer.recommend(&batch);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].urgency, Urgency::High);
        assert_eq!(out[1].urgency, Urgency::Medium);
    }
}
