//! End-to-end scenarios across the ledger service, alert engine, and
//! projections over the in-memory store and bus.

use std::sync::{Arc, Mutex};
use std::thread;

use serde_json::Value as JsonValue;

use stockledger_alerts::{AlertPriority, AlertStatus, AlertType};
use stockledger_core::{ActorId, AggregateId, OwnerId};
use stockledger_events::{EventEnvelope, InMemoryEventBus};
use stockledger_inventory::{ItemId, MovementReason, MovementType, StockStatus, ThresholdPatch};

use crate::alert_engine::AlertEngineError;
use crate::command_dispatcher::DispatchError;
use crate::event_store::InMemoryEventStore;
use crate::ledger_service::{LedgerError, LedgerService, NewMovement};
use crate::notifications::{NotificationDispatcher, NotificationRequest};

#[derive(Debug, Clone, Default)]
struct RecordingNotifier {
    sent: Arc<Mutex<Vec<NotificationRequest>>>,
}

impl RecordingNotifier {
    fn sent(&self) -> Vec<NotificationRequest> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl NotificationDispatcher for RecordingNotifier {
    fn dispatch(&self, request: NotificationRequest) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(request);
        }
    }
}

type TestService = LedgerService<
    Arc<InMemoryEventStore>,
    Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>,
    RecordingNotifier,
>;

fn service() -> (TestService, RecordingNotifier) {
    let notifier = RecordingNotifier::default();
    let store = Arc::new(InMemoryEventStore::new());
    let bus = Arc::new(InMemoryEventBus::new());
    (LedgerService::new(store, bus, notifier.clone()), notifier)
}

fn movement(movement_type: MovementType, reason: MovementReason, quantity: i64) -> NewMovement {
    NewMovement {
        movement_type,
        reason,
        quantity,
        reference: None,
        notes: None,
        metadata: None,
    }
}

fn inbound(quantity: i64) -> NewMovement {
    movement(MovementType::Inbound, MovementReason::Purchase, quantity)
}

fn outbound(quantity: i64) -> NewMovement {
    movement(MovementType::Outbound, MovementReason::Sale, quantity)
}

fn thresholds(minimum: i64, maximum: i64) -> ThresholdPatch {
    ThresholdPatch {
        minimum_stock: Some(minimum),
        maximum_stock: Some(maximum),
        reorder_point: Some(minimum),
        reorder_quantity: Some(minimum * 2),
    }
}

#[test]
fn thresholds_then_purchase_lands_in_stock_without_alerts() {
    let (service, notifier) = service();
    let owner = OwnerId::new();
    let actor = ActorId::new();
    let item = ItemId::new(AggregateId::new());

    let view = service.set_thresholds(owner, item, thresholds(10, 100)).unwrap();
    assert_eq!(view.quantity, 0);
    assert_eq!(view.status, StockStatus::OutOfStock);
    assert_eq!(view.thresholds.minimum_stock, 10);

    let m = service.apply_movement(owner, actor, item, inbound(50)).unwrap();
    assert_eq!(m.quantity_before, 0);
    assert_eq!(m.quantity_after, 50);

    let view = service.get_record(owner, &item).unwrap();
    assert_eq!(view.quantity, 50);
    assert_eq!(view.status, StockStatus::InStock);

    assert!(service.alerts().list_active(owner, None).is_empty());
    assert!(notifier.sent().is_empty());
}

#[test]
fn sale_below_minimum_opens_medium_low_stock_alert() {
    let (service, notifier) = service();
    let owner = OwnerId::new();
    let actor = ActorId::new();
    let item = ItemId::new(AggregateId::new());

    service.set_thresholds(owner, item, thresholds(10, 100)).unwrap();
    service.apply_movement(owner, actor, item, inbound(50)).unwrap();
    let m = service.apply_movement(owner, actor, item, outbound(45)).unwrap();
    assert_eq!(m.quantity_after, 5);

    let view = service.get_record(owner, &item).unwrap();
    assert_eq!(view.status, StockStatus::LowStock);

    let active = service.alerts().list_active(owner, None);
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].alert_type, AlertType::LowStock);
    assert_eq!(active[0].priority, AlertPriority::Medium);
    assert_eq!(active[0].record_id, view.record_id);
    assert!(active[0].message.contains("5 units remaining"));

    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].alert_type, AlertType::LowStock);
    assert_eq!(sent[0].owner_id, owner);
}

#[test]
fn draining_to_zero_supersedes_the_low_stock_alert() {
    let (service, _notifier) = service();
    let owner = OwnerId::new();
    let actor = ActorId::new();
    let item = ItemId::new(AggregateId::new());

    service.set_thresholds(owner, item, thresholds(10, 100)).unwrap();
    service.apply_movement(owner, actor, item, inbound(50)).unwrap();
    service.apply_movement(owner, actor, item, outbound(45)).unwrap();
    let low = service.alerts().list_active(owner, Some(AlertType::LowStock))[0].clone();

    service.apply_movement(owner, actor, item, outbound(5)).unwrap();

    let active = service.alerts().list_active(owner, None);
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].alert_type, AlertType::OutOfStock);
    assert_eq!(active[0].priority, AlertPriority::Critical);

    let superseded = service.alerts().get(owner, &low.alert_id).unwrap();
    assert_eq!(superseded.status, AlertStatus::Resolved);
    assert_eq!(
        superseded.resolution_notes.as_deref(),
        Some("superseded by out_of_stock alert")
    );
}

#[test]
fn replenishment_auto_resolves_stock_level_alerts() {
    let (service, _notifier) = service();
    let owner = OwnerId::new();
    let actor = ActorId::new();
    let item = ItemId::new(AggregateId::new());

    service.set_thresholds(owner, item, thresholds(10, 100)).unwrap();
    service.apply_movement(owner, actor, item, inbound(50)).unwrap();
    service.apply_movement(owner, actor, item, outbound(50)).unwrap();
    let out = service.alerts().list_active(owner, Some(AlertType::OutOfStock))[0].clone();

    service.apply_movement(owner, actor, item, inbound(30)).unwrap();

    assert!(service.alerts().list_active(owner, None).is_empty());
    let resolved = service.alerts().get(owner, &out.alert_id).unwrap();
    assert_eq!(resolved.status, AlertStatus::Resolved);
    assert_eq!(
        resolved.resolution_notes.as_deref(),
        Some("auto-resolved by stock replenishment")
    );
    assert_eq!(resolved.resolved_by, None);
}

#[test]
fn alert_lifecycle_acknowledge_then_resolve() {
    let (service, _notifier) = service();
    let owner = OwnerId::new();
    let actor = ActorId::new();
    let item = ItemId::new(AggregateId::new());

    service.set_thresholds(owner, item, thresholds(10, 100)).unwrap();
    service.apply_movement(owner, actor, item, inbound(50)).unwrap();
    service.apply_movement(owner, actor, item, outbound(45)).unwrap();
    let alert_id = service.alerts().list_active(owner, None)[0].alert_id;

    let acked = service
        .alerts()
        .acknowledge(owner, alert_id, actor, Some("looking into it".to_string()))
        .unwrap();
    assert_eq!(acked.status, AlertStatus::Acknowledged);
    assert_eq!(acked.acknowledged_by, Some(actor));

    // An acknowledged alert can no longer be dismissed.
    let err = service.alerts().dismiss(owner, alert_id, actor, None).unwrap_err();
    assert!(matches!(
        err,
        AlertEngineError::Dispatch(DispatchError::InvalidTransition(_))
    ));

    let resolved = service
        .alerts()
        .resolve(owner, alert_id, Some(actor), Some("restocked manually".to_string()))
        .unwrap();
    assert_eq!(resolved.status, AlertStatus::Resolved);
    assert_eq!(resolved.resolved_by, Some(actor));

    // Resolved is terminal.
    let err = service.alerts().acknowledge(owner, alert_id, actor, None).unwrap_err();
    assert!(matches!(
        err,
        AlertEngineError::Dispatch(DispatchError::InvalidTransition(_))
    ));
}

#[test]
fn acknowledged_alerts_do_not_block_fresh_alerts_of_the_same_type() {
    let (service, _notifier) = service();
    let owner = OwnerId::new();
    let actor = ActorId::new();
    let item = ItemId::new(AggregateId::new());

    service.set_thresholds(owner, item, thresholds(10, 100)).unwrap();
    service.apply_movement(owner, actor, item, inbound(50)).unwrap();
    service.apply_movement(owner, actor, item, outbound(45)).unwrap();
    let first = service.alerts().list_active(owner, Some(AlertType::LowStock))[0].clone();

    service.alerts().acknowledge(owner, first.alert_id, actor, None).unwrap();
    assert!(service.alerts().list_active(owner, None).is_empty());

    // Manual open of the same type lands a fresh active alert instead of
    // tripping over the acknowledged one.
    let fresh = service
        .alerts()
        .create_alert(
            owner,
            first.record_id,
            AlertType::LowStock,
            AlertPriority::Medium,
            "still running low".to_string(),
            None,
        )
        .unwrap();
    assert_ne!(fresh.alert_id, first.alert_id);
    assert_eq!(fresh.status, AlertStatus::Active);
    service.alerts().resolve(owner, fresh.alert_id, Some(actor), None).unwrap();

    // The transition hook also opens a fresh alert after a dip back below the
    // minimum.
    service.apply_movement(owner, actor, item, inbound(40)).unwrap();
    service.apply_movement(owner, actor, item, outbound(40)).unwrap();

    let active = service.alerts().list_active(owner, Some(AlertType::LowStock));
    assert_eq!(active.len(), 1);
    assert_ne!(active[0].alert_id, first.alert_id);

    let acked = service.alerts().get(owner, &first.alert_id).unwrap();
    assert_eq!(acked.status, AlertStatus::Acknowledged);
}

#[test]
fn manual_alert_creation_and_dismissal() {
    let (service, notifier) = service();
    let owner = OwnerId::new();
    let actor = ActorId::new();
    let item = ItemId::new(AggregateId::new());

    service.set_thresholds(owner, item, thresholds(10, 100)).unwrap();
    let record = service.get_record(owner, &item).unwrap();

    let alert = service
        .alerts()
        .create_alert(
            owner,
            record.record_id,
            AlertType::SupplierIssue,
            AlertPriority::High,
            "supplier shipment delayed".to_string(),
            None,
        )
        .unwrap();
    assert_eq!(alert.status, AlertStatus::Active);
    assert_eq!(notifier.sent().len(), 1);

    let dismissed = service
        .alerts()
        .dismiss(owner, alert.alert_id, actor, Some("resolved offline".to_string()))
        .unwrap();
    assert_eq!(dismissed.status, AlertStatus::Dismissed);
    assert!(service.alerts().list_active(owner, None).is_empty());
}

#[test]
fn overdraw_is_rejected_and_record_is_unchanged() {
    let (service, _notifier) = service();
    let owner = OwnerId::new();
    let actor = ActorId::new();
    let item = ItemId::new(AggregateId::new());

    service
        .apply_movement(
            owner,
            actor,
            item,
            movement(MovementType::Inbound, MovementReason::InitialStock, 10),
        )
        .unwrap();

    let err = service.apply_movement(owner, actor, item, outbound(11)).unwrap_err();
    assert!(matches!(
        err,
        LedgerError::Dispatch(DispatchError::InsufficientStock {
            requested: 11,
            available: 10,
        })
    ));

    let view = service.get_record(owner, &item).unwrap();
    assert_eq!(view.quantity, 10);
    assert_eq!(service.movement_history(owner, &view.record_id, None, None).unwrap().len(), 1);
}

#[test]
fn non_initializing_movement_on_unknown_pair_is_rejected() {
    let (service, _notifier) = service();
    let owner = OwnerId::new();
    let actor = ActorId::new();
    let item = ItemId::new(AggregateId::new());

    let err = service.apply_movement(owner, actor, item, inbound(5)).unwrap_err();
    assert!(matches!(err, LedgerError::UnknownRecord));
    assert!(service.get_record(owner, &item).is_none());
}

#[test]
fn owners_are_isolated() {
    let (service, _notifier) = service();
    let owner_a = OwnerId::new();
    let owner_b = OwnerId::new();
    let actor = ActorId::new();
    let item = ItemId::new(AggregateId::new());

    service
        .apply_movement(
            owner_a,
            actor,
            item,
            movement(MovementType::Inbound, MovementReason::InitialStock, 10),
        )
        .unwrap();

    // Same item id under a different owner is a distinct record.
    assert!(service.get_record(owner_b, &item).is_none());
    let err = service.apply_movement(owner_b, actor, item, outbound(1)).unwrap_err();
    assert!(matches!(err, LedgerError::UnknownRecord));
    assert!(service.list_records(owner_b).is_empty());
    assert_eq!(service.list_records(owner_a).len(), 1);
}

#[test]
fn movement_history_honors_time_bounds() {
    let (service, _notifier) = service();
    let owner = OwnerId::new();
    let actor = ActorId::new();
    let item = ItemId::new(AggregateId::new());

    service
        .apply_movement(
            owner,
            actor,
            item,
            movement(MovementType::Inbound, MovementReason::InitialStock, 100),
        )
        .unwrap();
    let second = service.apply_movement(owner, actor, item, outbound(10)).unwrap();
    service.apply_movement(owner, actor, item, outbound(20)).unwrap();

    let record_id = service.get_record(owner, &item).unwrap().record_id;
    let all = service.movement_history(owner, &record_id, None, None).unwrap();
    assert_eq!(all.len(), 3);
    // Oldest first, and the before/after chain is contiguous.
    assert!(all.windows(2).all(|w| w[0].quantity_after == w[1].quantity_before));

    let tail = service
        .movement_history(owner, &record_id, Some(second.created_at), None)
        .unwrap();
    assert_eq!(tail.len(), 2);
    assert_eq!(tail[0].movement_id, second.movement_id);
}

#[test]
fn restock_recommendations_and_analytics_reflect_the_ledger() {
    let (service, _notifier) = service();
    let owner = OwnerId::new();
    let actor = ActorId::new();
    let healthy = ItemId::new(AggregateId::new());
    let depleted = ItemId::new(AggregateId::new());

    service.set_thresholds(owner, healthy, thresholds(10, 100)).unwrap();
    service.apply_movement(owner, actor, healthy, inbound(50)).unwrap();
    service.set_unit_cost(owner, healthy, Some(200)).unwrap();

    service.set_thresholds(owner, depleted, thresholds(10, 100)).unwrap();
    service.apply_movement(owner, actor, depleted, inbound(12)).unwrap();
    service.apply_movement(owner, actor, depleted, outbound(8)).unwrap();

    let recommendations = service.restock_recommendations(owner);
    assert_eq!(recommendations.len(), 1);
    assert_eq!(recommendations[0].item_id, depleted);
    // max(ceil(10 * 3 / 2), reorder_quantity 20) = 20.
    assert_eq!(recommendations[0].recommended_quantity, 20);

    let analytics = service.analytics(owner);
    assert_eq!(analytics.total_records, 2);
    assert_eq!(analytics.low_stock_count, 1);
    assert_eq!(analytics.out_of_stock_count, 0);
    assert_eq!(analytics.total_value, 50 * 200);
    assert_eq!(analytics.average_unit_cost, Some(200));
    assert!(analytics.average_stock_turnover > 0.0);
}

#[test]
fn reactivation_restores_the_derived_status() {
    let (service, _notifier) = service();
    let owner = OwnerId::new();
    let actor = ActorId::new();
    let item = ItemId::new(AggregateId::new());

    service.set_thresholds(owner, item, thresholds(10, 100)).unwrap();
    service.apply_movement(owner, actor, item, inbound(50)).unwrap();

    let view = service.discontinue(owner, item).unwrap();
    assert_eq!(view.status, StockStatus::Discontinued);

    let view = service.reactivate(owner, item).unwrap();
    assert_eq!(view.status, StockStatus::InStock);
    assert_eq!(view.quantity, 50);
}

#[test]
fn concurrent_sales_never_overdraw() {
    let (service, _notifier) = service();
    let service = Arc::new(service);
    let owner = OwnerId::new();
    let actor = ActorId::new();
    let item = ItemId::new(AggregateId::new());

    let opening = 40;
    service
        .apply_movement(
            owner,
            actor,
            item,
            movement(MovementType::Inbound, MovementReason::InitialStock, opening),
        )
        .unwrap();

    // 8 threads x 10 unit sales = 80 attempts against 40 on hand.
    let threads = 8;
    let per_thread = 10;
    let successes = Arc::new(Mutex::new(0i64));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let service = Arc::clone(&service);
            let successes = Arc::clone(&successes);
            thread::spawn(move || {
                for _ in 0..per_thread {
                    match service.apply_movement(owner, actor, item, outbound(1)) {
                        Ok(_) => {
                            if let Ok(mut n) = successes.lock() {
                                *n += 1;
                            }
                        }
                        Err(LedgerError::Dispatch(DispatchError::InsufficientStock {
                            ..
                        })) => {}
                        // Retry budget exhaustion under heavy contention is
                        // acceptable; it must not corrupt the ledger.
                        Err(LedgerError::Dispatch(DispatchError::Concurrency(_))) => {}
                        Err(other) => panic!("unexpected error: {other:?}"),
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        if let Err(e) = handle.join() {
            std::panic::resume_unwind(e);
        }
    }

    let succeeded = *successes.lock().unwrap();
    let view = service.get_record(owner, &item).unwrap();
    assert!(view.quantity >= 0);
    assert_eq!(view.quantity, opening - succeeded);

    let record_id = view.record_id;
    let history = service.movement_history(owner, &record_id, None, None).unwrap();
    assert_eq!(history.len() as i64, succeeded + 1);
    assert!(history.windows(2).all(|w| w[0].quantity_after == w[1].quantity_before));
}
