use serde::Deserialize;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;

use stockledger_advisor::RestockRecommendation;
use stockledger_alerts::{AlertPriority, AlertStatus, AlertType};
use stockledger_infra::ledger_service::NewMovement;
use stockledger_infra::projections::{AlertView, InventoryRecordView};
use stockledger_inventory::{Movement, MovementReason, MovementType, ThresholdPatch};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct RecordMovementRequest {
    pub item_id: String,
    pub movement_type: MovementType,
    pub reason: MovementReason,
    pub quantity: i64,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub metadata: Option<JsonValue>,
}

impl RecordMovementRequest {
    pub fn into_movement(self) -> NewMovement {
        NewMovement {
            movement_type: self.movement_type,
            reason: self.reason,
            quantity: self.quantity,
            reference: self.reference,
            notes: self.notes,
            metadata: self.metadata,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SetThresholdsRequest {
    pub minimum_stock: Option<i64>,
    pub maximum_stock: Option<i64>,
    pub reorder_point: Option<i64>,
    pub reorder_quantity: Option<i64>,
}

impl SetThresholdsRequest {
    pub fn into_patch(self) -> ThresholdPatch {
        ThresholdPatch {
            minimum_stock: self.minimum_stock,
            maximum_stock: self.maximum_stock,
            reorder_point: self.reorder_point,
            reorder_quantity: self.reorder_quantity,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SetUnitCostRequest {
    /// Minor currency units; `null` clears the cost.
    pub unit_cost: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateAlertRequest {
    pub record_id: String,
    pub alert_type: AlertType,
    pub priority: AlertPriority,
    pub message: String,
    pub metadata: Option<JsonValue>,
}

#[derive(Debug, Deserialize)]
pub struct AlertNotesRequest {
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct AlertsQuery {
    #[serde(rename = "type")]
    pub alert_type: Option<AlertType>,
    pub status: Option<AlertStatus>,
}

// -------------------------
// JSON mapping helpers
// -------------------------

pub fn record_to_json(rm: InventoryRecordView) -> serde_json::Value {
    serde_json::json!({
        "record_id": rm.record_id.0.to_string(),
        "item_id": rm.item_id.0.to_string(),
        "quantity": rm.quantity,
        "unit_cost": rm.unit_cost,
        "thresholds": {
            "minimum_stock": rm.thresholds.minimum_stock,
            "maximum_stock": rm.thresholds.maximum_stock,
            "reorder_point": rm.thresholds.reorder_point,
            "reorder_quantity": rm.thresholds.reorder_quantity,
        },
        "status": rm.status.as_str(),
        "last_updated": rm.last_updated.map(|d| d.to_rfc3339()),
    })
}

pub fn movement_to_json(m: Movement) -> serde_json::Value {
    serde_json::json!({
        "movement_id": m.movement_id.0.to_string(),
        "record_id": m.record_id.0.to_string(),
        "movement_type": m.movement_type,
        "reason": m.reason,
        "quantity": m.quantity,
        "quantity_before": m.quantity_before,
        "quantity_after": m.quantity_after,
        "unit_cost": m.unit_cost,
        "total_cost": m.total_cost,
        "performed_by": m.performed_by.to_string(),
        "reference": m.reference,
        "notes": m.notes,
        "metadata": m.metadata,
        "created_at": m.created_at.to_rfc3339(),
    })
}

pub fn alert_to_json(a: AlertView) -> serde_json::Value {
    serde_json::json!({
        "alert_id": a.alert_id.0.to_string(),
        "record_id": a.record_id.0.to_string(),
        "alert_type": a.alert_type.as_str(),
        "status": a.status,
        "priority": a.priority,
        "message": a.message,
        "metadata": a.metadata,
        "acknowledged_at": a.acknowledged_at.map(|d| d.to_rfc3339()),
        "acknowledged_by": a.acknowledged_by.map(|id| id.to_string()),
        "resolved_at": a.resolved_at.map(|d| d.to_rfc3339()),
        "resolved_by": a.resolved_by.map(|id| id.to_string()),
        "resolution_notes": a.resolution_notes,
        "created_at": a.created_at.to_rfc3339(),
        "updated_at": a.updated_at.to_rfc3339(),
    })
}

pub fn recommendation_to_json(r: RestockRecommendation) -> serde_json::Value {
    serde_json::json!({
        "record_id": r.record_id.0.to_string(),
        "item_id": r.item_id.0.to_string(),
        "current_quantity": r.current_quantity,
        "minimum_stock": r.minimum_stock,
        "recommended_quantity": r.recommended_quantity,
        "urgency": r.urgency,
        "estimated_cost": r.estimated_cost,
        "last_updated": r.last_updated.map(|d| d.to_rfc3339()),
    })
}
