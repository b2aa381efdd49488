use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use chrono::Utc;
use std::sync::Arc;

use stockledger_core::{ActorId, AggregateId, ExpectedVersion, OwnerId};
use stockledger_events::{EventEnvelope, InMemoryEventBus};
use stockledger_infra::command_dispatcher::CommandDispatcher;
use stockledger_infra::event_store::{EventStore, InMemoryEventStore, UncommittedEvent};
use stockledger_infra::projections::{InventoryRecordView, RecordsProjection};
use stockledger_infra::read_model::InMemoryOwnerStore;
use stockledger_inventory::{
    InventoryEvent, InventoryRecord, InventoryRecordCommand, InventoryRecordId, ItemId,
    MovementId, MovementReason, MovementRecorded, MovementType, RecordMovement, RecordOpened,
    derive_status,
};

fn movement_command(
    owner_id: OwnerId,
    record_id: InventoryRecordId,
    item_id: ItemId,
    reason: MovementReason,
    quantity: i64,
) -> InventoryRecordCommand {
    InventoryRecordCommand::RecordMovement(RecordMovement {
        owner_id,
        record_id,
        item_id,
        movement_id: MovementId::new(),
        movement_type: MovementType::Inbound,
        reason,
        quantity,
        performed_by: ActorId::new(),
        reference: None,
        notes: None,
        metadata: None,
        occurred_at: Utc::now(),
    })
}

fn setup_dispatcher() -> (
    CommandDispatcher<InMemoryEventStore, Arc<InMemoryEventBus<EventEnvelope<serde_json::Value>>>>,
    OwnerId,
) {
    let store = InMemoryEventStore::new();
    let bus: Arc<InMemoryEventBus<EventEnvelope<serde_json::Value>>> =
        Arc::new(InMemoryEventBus::new());
    (CommandDispatcher::new(store, bus), OwnerId::new())
}

fn dispatch(
    dispatcher: &CommandDispatcher<
        InMemoryEventStore,
        Arc<InMemoryEventBus<EventEnvelope<serde_json::Value>>>,
    >,
    owner_id: OwnerId,
    record_id: InventoryRecordId,
    command: InventoryRecordCommand,
) {
    dispatcher
        .dispatch::<InventoryRecord>(owner_id, record_id.0, "ledger.record", command, |_, id| {
            InventoryRecord::empty(InventoryRecordId::new(id))
        })
        .unwrap();
}

fn bench_movement_dispatch_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("movement_dispatch_latency");
    group.sample_size(1000);

    // First movement on a fresh stream (no history to rehydrate).
    group.bench_function("initial_stock_fresh", |b| {
        let (dispatcher, owner_id) = setup_dispatcher();
        b.iter(|| {
            let record_id = InventoryRecordId::new(AggregateId::new());
            let item_id = ItemId::new(AggregateId::new());
            dispatch(
                &dispatcher,
                owner_id,
                record_id,
                movement_command(
                    owner_id,
                    record_id,
                    item_id,
                    MovementReason::InitialStock,
                    black_box(100),
                ),
            );
        });
    });

    // Each dispatch replays the full (growing) stream before handling.
    group.bench_function("movement_with_history", |b| {
        let (dispatcher, owner_id) = setup_dispatcher();
        let record_id = InventoryRecordId::new(AggregateId::new());
        let item_id = ItemId::new(AggregateId::new());
        dispatch(
            &dispatcher,
            owner_id,
            record_id,
            movement_command(owner_id, record_id, item_id, MovementReason::InitialStock, 100),
        );

        b.iter(|| {
            dispatch(
                &dispatcher,
                owner_id,
                record_id,
                movement_command(
                    owner_id,
                    record_id,
                    item_id,
                    MovementReason::Purchase,
                    black_box(5),
                ),
            );
        });
    });

    group.finish();
}

fn bench_event_append_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("event_append_throughput");

    for batch_size in [1, 10, 100, 1000].iter() {
        group.throughput(Throughput::Elements(*batch_size as u64));
        group.bench_with_input(
            BenchmarkId::new("batch_append", batch_size),
            batch_size,
            |b, &size| {
                let store = InMemoryEventStore::new();
                let owner_id = OwnerId::new();
                let record_id = InventoryRecordId::new(AggregateId::new());

                b.iter(|| {
                    let events: Vec<UncommittedEvent> = (0..size)
                        .map(|i| {
                            let event = InventoryEvent::MovementRecorded(movement_event(
                                owner_id, record_id, i as i64, 5,
                            ));
                            UncommittedEvent::from_typed(
                                owner_id,
                                record_id.0,
                                "ledger.record",
                                uuid::Uuid::now_v7(),
                                &event,
                            )
                            .unwrap()
                        })
                        .collect();

                    black_box(store.append(events, ExpectedVersion::Any).unwrap());
                });
            },
        );
    }

    group.finish();
}

fn movement_event(
    owner_id: OwnerId,
    record_id: InventoryRecordId,
    quantity_before: i64,
    quantity: i64,
) -> MovementRecorded {
    let quantity_after = quantity_before + quantity;
    MovementRecorded {
        owner_id,
        record_id,
        movement_id: MovementId::new(),
        movement_type: MovementType::Inbound,
        reason: MovementReason::Purchase,
        quantity,
        quantity_before,
        quantity_after,
        status_before: derive_status(quantity_before, 0, 0),
        status_after: derive_status(quantity_after, 0, 0),
        unit_cost: None,
        total_cost: None,
        performed_by: ActorId::new(),
        reference: None,
        notes: None,
        metadata: None,
        occurred_at: Utc::now(),
    }
}

fn bench_projection_rebuild_speed(c: &mut Criterion) {
    let mut group = c.benchmark_group("projection_rebuild_speed");

    for event_count in [10, 100, 1000, 10000].iter() {
        group.bench_with_input(
            BenchmarkId::new("rebuild_from_events", event_count),
            event_count,
            |b, &count| {
                let store = InMemoryEventStore::new();
                let owner_id = OwnerId::new();
                let record_id = InventoryRecordId::new(AggregateId::new());
                let item_id = ItemId::new(AggregateId::new());

                let mut all_envelopes = Vec::with_capacity(count);
                let opened = InventoryEvent::RecordOpened(RecordOpened {
                    owner_id,
                    record_id,
                    item_id,
                    occurred_at: Utc::now(),
                });
                let uncommitted = UncommittedEvent::from_typed(
                    owner_id,
                    record_id.0,
                    "ledger.record",
                    uuid::Uuid::now_v7(),
                    &opened,
                )
                .unwrap();
                let stored = store
                    .append(vec![uncommitted], ExpectedVersion::Exact(0))
                    .unwrap();
                all_envelopes.push(stored[0].to_envelope());

                let mut quantity = 0i64;
                for i in 0..(count - 1) {
                    let event = InventoryEvent::MovementRecorded(movement_event(
                        owner_id,
                        record_id,
                        quantity,
                        (i % 10) as i64 + 1,
                    ));
                    quantity += (i % 10) as i64 + 1;
                    let uncommitted = UncommittedEvent::from_typed(
                        owner_id,
                        record_id.0,
                        "ledger.record",
                        uuid::Uuid::now_v7(),
                        &event,
                    )
                    .unwrap();
                    let stored = store
                        .append(vec![uncommitted], ExpectedVersion::Exact((i + 1) as u64))
                        .unwrap();
                    all_envelopes.push(stored[0].to_envelope());
                }

                let read_model: Arc<InMemoryOwnerStore<InventoryRecordId, InventoryRecordView>> =
                    Arc::new(InMemoryOwnerStore::new());
                let projection = RecordsProjection::new(read_model);

                b.iter(|| {
                    projection
                        .rebuild_from_scratch(black_box(all_envelopes.clone()))
                        .unwrap();
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_movement_dispatch_latency,
    bench_event_append_throughput,
    bench_projection_rebuild_speed
);
criterion_main!(benches);
