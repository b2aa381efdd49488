use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockledger_inventory::{InventoryRecordId, ItemId};

/// How soon the owner should act on a recommendation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    Medium,
    High,
}

/// A single restock recommendation for one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestockRecommendation {
    pub record_id: InventoryRecordId,
    pub item_id: ItemId,
    pub current_quantity: i64,
    pub minimum_stock: i64,
    pub recommended_quantity: i64,
    pub urgency: Urgency,
    /// `recommended_quantity * unit_cost`, when the unit cost is known.
    pub estimated_cost: Option<u64>,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Sort recommendations by urgency descending, then oldest `last_updated`
/// first. The sort is stable so equal entries keep their input order; records
/// with no `last_updated` sort last within their urgency band.
pub fn prioritize(mut recommendations: Vec<RestockRecommendation>) -> Vec<RestockRecommendation> {
    recommendations.sort_by(|a, b| {
        b.urgency.cmp(&a.urgency).then_with(|| {
            match (a.last_updated, b.last_updated) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => core::cmp::Ordering::Less,
                (None, Some(_)) => core::cmp::Ordering::Greater,
                (None, None) => core::cmp::Ordering::Equal,
            }
        })
    });
    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use stockledger_core::AggregateId;

    fn rec(urgency: Urgency, updated_secs: Option<i64>) -> RestockRecommendation {
        RestockRecommendation {
            record_id: InventoryRecordId::new(AggregateId::new()),
            item_id: ItemId::new(AggregateId::new()),
            current_quantity: 1,
            minimum_stock: 10,
            recommended_quantity: 15,
            urgency,
            estimated_cost: None,
            last_updated: updated_secs.map(|s| Utc.timestamp_opt(s, 0).unwrap()),
        }
    }

    #[test]
    fn urgency_dominates_ordering() {
        let out = prioritize(vec![
            rec(Urgency::Low, Some(1)),
            rec(Urgency::High, Some(100)),
            rec(Urgency::Medium, Some(50)),
        ]);
        let urgencies: Vec<_> = out.iter().map(|r| r.urgency).collect();
        assert_eq!(urgencies, vec![Urgency::High, Urgency::Medium, Urgency::Low]);
    }

    #[test]
    fn oldest_stale_first_within_equal_urgency() {
        let out = prioritize(vec![
            rec(Urgency::High, Some(300)),
            rec(Urgency::High, Some(100)),
            rec(Urgency::High, None),
            rec(Urgency::High, Some(200)),
        ]);
        let updated: Vec<_> = out
            .iter()
            .map(|r| r.last_updated.map(|t| t.timestamp()))
            .collect();
        assert_eq!(updated, vec![Some(100), Some(200), Some(300), None]);
    }

    #[test]
    fn sort_is_stable_for_equal_keys() {
        let a = rec(Urgency::Medium, Some(42));
        let b = rec(Urgency::Medium, Some(42));
        let out = prioritize(vec![a.clone(), b.clone()]);
        assert_eq!(out[0].record_id, a.record_id);
        assert_eq!(out[1].record_id, b.record_id);
    }
}
