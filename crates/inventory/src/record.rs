use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use stockledger_core::{
    ActorId, Aggregate, AggregateId, AggregateRoot, DomainError, OwnerId,
};
use stockledger_events::Event;

use crate::movement::{MovementId, MovementReason, MovementType};
use crate::status::{StockStatus, derive_status};

/// Inventory record identifier (owner-scoped via `owner_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InventoryRecordId(pub AggregateId);

impl InventoryRecordId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for InventoryRecordId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Opaque item reference supplied by the external catalog directory.
///
/// The ledger trusts referential validity of item identifiers it is given and
/// does not independently validate them.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub AggregateId);

impl ItemId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ItemId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Restock thresholds configured per record. All values are non-negative;
/// zero means "unconfigured" for that boundary.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockThresholds {
    pub minimum_stock: i64,
    pub maximum_stock: i64,
    pub reorder_point: i64,
    pub reorder_quantity: i64,
}

/// Partial threshold update; `None` leaves the current value untouched.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdPatch {
    pub minimum_stock: Option<i64>,
    pub maximum_stock: Option<i64>,
    pub reorder_point: Option<i64>,
    pub reorder_quantity: Option<i64>,
}

impl ThresholdPatch {
    fn validate(&self) -> Result<(), DomainError> {
        for (name, value) in [
            ("minimum_stock", self.minimum_stock),
            ("maximum_stock", self.maximum_stock),
            ("reorder_point", self.reorder_point),
            ("reorder_quantity", self.reorder_quantity),
        ] {
            if let Some(v) = value {
                if v < 0 {
                    return Err(DomainError::validation(format!(
                        "{name} must be non-negative"
                    )));
                }
            }
        }
        Ok(())
    }

    fn apply_to(&self, current: StockThresholds) -> StockThresholds {
        StockThresholds {
            minimum_stock: self.minimum_stock.unwrap_or(current.minimum_stock),
            maximum_stock: self.maximum_stock.unwrap_or(current.maximum_stock),
            reorder_point: self.reorder_point.unwrap_or(current.reorder_point),
            reorder_quantity: self.reorder_quantity.unwrap_or(current.reorder_quantity),
        }
    }
}

/// Aggregate root: InventoryRecord.
///
/// One record per (owner, item). Its append-only event stream is the movement
/// ledger; `quantity` and `status` are pure folds of that stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryRecord {
    id: InventoryRecordId,
    owner_id: Option<OwnerId>,
    item_id: Option<ItemId>,
    quantity: i64,
    unit_cost: Option<u64>,
    thresholds: StockThresholds,
    status: StockStatus,
    last_updated: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

impl InventoryRecord {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: InventoryRecordId) -> Self {
        Self {
            id,
            owner_id: None,
            item_id: None,
            quantity: 0,
            unit_cost: None,
            thresholds: StockThresholds::default(),
            status: StockStatus::OutOfStock,
            last_updated: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> InventoryRecordId {
        self.id
    }

    pub fn owner_id(&self) -> Option<OwnerId> {
        self.owner_id
    }

    pub fn item_id(&self) -> Option<ItemId> {
        self.item_id
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn unit_cost(&self) -> Option<u64> {
        self.unit_cost
    }

    pub fn thresholds(&self) -> StockThresholds {
        self.thresholds
    }

    pub fn status(&self) -> StockStatus {
        self.status
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    pub fn is_discontinued(&self) -> bool {
        self.status == StockStatus::Discontinued
    }

    /// Status after a hypothetical quantity/threshold change, honoring the
    /// sticky `discontinued` rule.
    fn derived_status(&self, quantity: i64, thresholds: StockThresholds) -> StockStatus {
        if self.is_discontinued() {
            StockStatus::Discontinued
        } else {
            derive_status(quantity, thresholds.minimum_stock, thresholds.maximum_stock)
        }
    }
}

impl AggregateRoot for InventoryRecord {
    type Id = InventoryRecordId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: RecordMovement.
///
/// The only way quantity ever changes. Auto-opens the record when it does not
/// exist yet and `reason == initial_stock`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMovement {
    pub owner_id: OwnerId,
    pub record_id: InventoryRecordId,
    pub item_id: ItemId,
    pub movement_id: MovementId,
    pub movement_type: MovementType,
    pub reason: MovementReason,
    /// Positive magnitude; direction comes from `movement_type`.
    pub quantity: i64,
    pub performed_by: ActorId,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub metadata: Option<JsonValue>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SetThresholds.
///
/// Registering thresholds for an unknown (owner, item) pair opens the record
/// at quantity zero (an owner registering interest in an item).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetThresholds {
    pub owner_id: OwnerId,
    pub record_id: InventoryRecordId,
    pub item_id: ItemId,
    pub patch: ThresholdPatch,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SetUnitCost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetUnitCost {
    pub owner_id: OwnerId,
    pub record_id: InventoryRecordId,
    /// Minor currency units; `None` clears the cost.
    pub unit_cost: Option<u64>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: Discontinue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discontinue {
    pub owner_id: OwnerId,
    pub record_id: InventoryRecordId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: Reactivate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reactivate {
    pub owner_id: OwnerId,
    pub record_id: InventoryRecordId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InventoryRecordCommand {
    RecordMovement(RecordMovement),
    SetThresholds(SetThresholds),
    SetUnitCost(SetUnitCost),
    Discontinue(Discontinue),
    Reactivate(Reactivate),
}

/// Event: RecordOpened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordOpened {
    pub owner_id: OwnerId,
    pub record_id: InventoryRecordId,
    pub item_id: ItemId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: MovementRecorded.
///
/// Immutable once appended. `quantity_before`/`quantity_after` and the status
/// pair are captured at apply time and never recomputed later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementRecorded {
    pub owner_id: OwnerId,
    pub record_id: InventoryRecordId,
    pub movement_id: MovementId,
    pub movement_type: MovementType,
    pub reason: MovementReason,
    pub quantity: i64,
    pub quantity_before: i64,
    pub quantity_after: i64,
    pub status_before: StockStatus,
    pub status_after: StockStatus,
    pub unit_cost: Option<u64>,
    pub total_cost: Option<u64>,
    pub performed_by: ActorId,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub metadata: Option<JsonValue>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ThresholdsSet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdsSet {
    pub owner_id: OwnerId,
    pub record_id: InventoryRecordId,
    pub thresholds: StockThresholds,
    pub status_before: StockStatus,
    pub status_after: StockStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Event: UnitCostSet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitCostSet {
    pub owner_id: OwnerId,
    pub record_id: InventoryRecordId,
    pub unit_cost: Option<u64>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RecordDiscontinued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordDiscontinued {
    pub owner_id: OwnerId,
    pub record_id: InventoryRecordId,
    pub status_before: StockStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RecordReactivated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordReactivated {
    pub owner_id: OwnerId,
    pub record_id: InventoryRecordId,
    pub status_after: StockStatus,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InventoryEvent {
    RecordOpened(RecordOpened),
    MovementRecorded(MovementRecorded),
    ThresholdsSet(ThresholdsSet),
    UnitCostSet(UnitCostSet),
    RecordDiscontinued(RecordDiscontinued),
    RecordReactivated(RecordReactivated),
}

impl Event for InventoryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            InventoryEvent::RecordOpened(_) => "ledger.record.opened",
            InventoryEvent::MovementRecorded(_) => "ledger.record.movement_recorded",
            InventoryEvent::ThresholdsSet(_) => "ledger.record.thresholds_set",
            InventoryEvent::UnitCostSet(_) => "ledger.record.unit_cost_set",
            InventoryEvent::RecordDiscontinued(_) => "ledger.record.discontinued",
            InventoryEvent::RecordReactivated(_) => "ledger.record.reactivated",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            InventoryEvent::RecordOpened(e) => e.occurred_at,
            InventoryEvent::MovementRecorded(e) => e.occurred_at,
            InventoryEvent::ThresholdsSet(e) => e.occurred_at,
            InventoryEvent::UnitCostSet(e) => e.occurred_at,
            InventoryEvent::RecordDiscontinued(e) => e.occurred_at,
            InventoryEvent::RecordReactivated(e) => e.occurred_at,
        }
    }
}

impl Aggregate for InventoryRecord {
    type Command = InventoryRecordCommand;
    type Event = InventoryEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            InventoryEvent::RecordOpened(e) => {
                self.id = e.record_id;
                self.owner_id = Some(e.owner_id);
                self.item_id = Some(e.item_id);
                self.quantity = 0;
                self.unit_cost = None;
                self.thresholds = StockThresholds::default();
                self.status = StockStatus::OutOfStock;
                self.created = true;
            }
            InventoryEvent::MovementRecorded(e) => {
                self.quantity = e.quantity_after;
                self.status = e.status_after;
                self.last_updated = Some(e.occurred_at);
            }
            InventoryEvent::ThresholdsSet(e) => {
                self.thresholds = e.thresholds;
                self.status = e.status_after;
            }
            InventoryEvent::UnitCostSet(e) => {
                self.unit_cost = e.unit_cost;
            }
            InventoryEvent::RecordDiscontinued(_) => {
                self.status = StockStatus::Discontinued;
            }
            InventoryEvent::RecordReactivated(e) => {
                self.status = e.status_after;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            InventoryRecordCommand::RecordMovement(cmd) => self.handle_movement(cmd),
            InventoryRecordCommand::SetThresholds(cmd) => self.handle_set_thresholds(cmd),
            InventoryRecordCommand::SetUnitCost(cmd) => self.handle_set_unit_cost(cmd),
            InventoryRecordCommand::Discontinue(cmd) => self.handle_discontinue(cmd),
            InventoryRecordCommand::Reactivate(cmd) => self.handle_reactivate(cmd),
        }
    }
}

impl InventoryRecord {
    fn ensure_owner(&self, owner_id: OwnerId) -> Result<(), DomainError> {
        if !self.created {
            return Ok(());
        }
        if self.owner_id != Some(owner_id) {
            return Err(DomainError::invariant("owner mismatch"));
        }
        Ok(())
    }

    fn ensure_record_id(&self, record_id: InventoryRecordId) -> Result<(), DomainError> {
        if self.id != record_id {
            return Err(DomainError::invariant("record_id mismatch"));
        }
        Ok(())
    }

    fn handle_movement(&self, cmd: &RecordMovement) -> Result<Vec<InventoryEvent>, DomainError> {
        self.ensure_owner(cmd.owner_id)?;
        self.ensure_record_id(cmd.record_id)?;

        if cmd.quantity <= 0 {
            return Err(DomainError::invalid_quantity(
                "movement quantity must be a positive integer",
            ));
        }

        let mut events = Vec::with_capacity(2);

        if !self.created {
            // Only an initializing movement may bring a record into existence.
            if cmd.reason != MovementReason::InitialStock {
                return Err(DomainError::UnknownRecord);
            }
            events.push(InventoryEvent::RecordOpened(RecordOpened {
                owner_id: cmd.owner_id,
                record_id: cmd.record_id,
                item_id: cmd.item_id,
                occurred_at: cmd.occurred_at,
            }));
        }

        let quantity_before = self.quantity;
        let quantity_after = quantity_before + cmd.movement_type.signed_delta(cmd.quantity);

        if quantity_after < 0 {
            // Never clamp: the movement is rejected and nothing is persisted.
            return Err(DomainError::insufficient_stock(cmd.quantity, quantity_before));
        }

        let status_before = self.status;
        let status_after = self.derived_status(quantity_after, self.thresholds);

        let total_cost = self.unit_cost.map(|c| c.saturating_mul(cmd.quantity as u64));

        events.push(InventoryEvent::MovementRecorded(MovementRecorded {
            owner_id: cmd.owner_id,
            record_id: cmd.record_id,
            movement_id: cmd.movement_id,
            movement_type: cmd.movement_type,
            reason: cmd.reason,
            quantity: cmd.quantity,
            quantity_before,
            quantity_after,
            status_before,
            status_after,
            unit_cost: self.unit_cost,
            total_cost,
            performed_by: cmd.performed_by,
            reference: cmd.reference.clone(),
            notes: cmd.notes.clone(),
            metadata: cmd.metadata.clone(),
            occurred_at: cmd.occurred_at,
        }));

        Ok(events)
    }

    fn handle_set_thresholds(
        &self,
        cmd: &SetThresholds,
    ) -> Result<Vec<InventoryEvent>, DomainError> {
        self.ensure_owner(cmd.owner_id)?;
        self.ensure_record_id(cmd.record_id)?;
        cmd.patch.validate()?;

        let mut events = Vec::with_capacity(2);

        if !self.created {
            events.push(InventoryEvent::RecordOpened(RecordOpened {
                owner_id: cmd.owner_id,
                record_id: cmd.record_id,
                item_id: cmd.item_id,
                occurred_at: cmd.occurred_at,
            }));
        }

        let current = if self.created {
            self.thresholds
        } else {
            StockThresholds::default()
        };
        let thresholds = cmd.patch.apply_to(current);
        let status_before = self.status;
        let status_after = self.derived_status(self.quantity, thresholds);

        events.push(InventoryEvent::ThresholdsSet(ThresholdsSet {
            owner_id: cmd.owner_id,
            record_id: cmd.record_id,
            thresholds,
            status_before,
            status_after,
            occurred_at: cmd.occurred_at,
        }));

        Ok(events)
    }

    fn handle_set_unit_cost(&self, cmd: &SetUnitCost) -> Result<Vec<InventoryEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::UnknownRecord);
        }
        self.ensure_owner(cmd.owner_id)?;
        self.ensure_record_id(cmd.record_id)?;

        Ok(vec![InventoryEvent::UnitCostSet(UnitCostSet {
            owner_id: cmd.owner_id,
            record_id: cmd.record_id,
            unit_cost: cmd.unit_cost,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_discontinue(&self, cmd: &Discontinue) -> Result<Vec<InventoryEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::UnknownRecord);
        }
        self.ensure_owner(cmd.owner_id)?;
        self.ensure_record_id(cmd.record_id)?;

        if self.is_discontinued() {
            return Err(DomainError::conflict("record already discontinued"));
        }

        Ok(vec![InventoryEvent::RecordDiscontinued(RecordDiscontinued {
            owner_id: cmd.owner_id,
            record_id: cmd.record_id,
            status_before: self.status,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reactivate(&self, cmd: &Reactivate) -> Result<Vec<InventoryEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::UnknownRecord);
        }
        self.ensure_owner(cmd.owner_id)?;
        self.ensure_record_id(cmd.record_id)?;

        if !self.is_discontinued() {
            return Err(DomainError::conflict("record is not discontinued"));
        }

        let status_after = derive_status(
            self.quantity,
            self.thresholds.minimum_stock,
            self.thresholds.maximum_stock,
        );

        Ok(vec![InventoryEvent::RecordReactivated(RecordReactivated {
            owner_id: cmd.owner_id,
            record_id: cmd.record_id,
            status_after,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn owner() -> OwnerId {
        OwnerId::new()
    }

    fn record_id() -> InventoryRecordId {
        InventoryRecordId::new(AggregateId::new())
    }

    fn item() -> ItemId {
        ItemId::new(AggregateId::new())
    }

    fn actor() -> ActorId {
        ActorId::new()
    }

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    fn movement_cmd(
        owner_id: OwnerId,
        rid: InventoryRecordId,
        item_id: ItemId,
        movement_type: MovementType,
        reason: MovementReason,
        quantity: i64,
    ) -> InventoryRecordCommand {
        InventoryRecordCommand::RecordMovement(RecordMovement {
            owner_id,
            record_id: rid,
            item_id,
            movement_id: MovementId::new(),
            movement_type,
            reason,
            quantity,
            performed_by: actor(),
            reference: None,
            notes: None,
            metadata: None,
            occurred_at: now(),
        })
    }

    fn apply_all(record: &mut InventoryRecord, events: &[InventoryEvent]) {
        for e in events {
            record.apply(e);
        }
    }

    /// Record with thresholds configured and an opening stock level.
    fn stocked_record(
        owner_id: OwnerId,
        rid: InventoryRecordId,
        item_id: ItemId,
        minimum: i64,
        maximum: i64,
        opening: i64,
    ) -> InventoryRecord {
        let mut record = InventoryRecord::empty(rid);
        let events = record
            .handle(&InventoryRecordCommand::SetThresholds(SetThresholds {
                owner_id,
                record_id: rid,
                item_id,
                patch: ThresholdPatch {
                    minimum_stock: Some(minimum),
                    maximum_stock: Some(maximum),
                    ..Default::default()
                },
                occurred_at: now(),
            }))
            .unwrap();
        apply_all(&mut record, &events);

        if opening > 0 {
            let events = record
                .handle(&movement_cmd(
                    owner_id,
                    rid,
                    item_id,
                    MovementType::Inbound,
                    MovementReason::InitialStock,
                    opening,
                ))
                .unwrap();
            apply_all(&mut record, &events);
        }
        record
    }

    #[test]
    fn initial_stock_movement_opens_record() {
        let record = InventoryRecord::empty(record_id());
        let (o, r, i) = (owner(), record.id_typed(), item());

        let events = record
            .handle(&movement_cmd(
                o,
                r,
                i,
                MovementType::Inbound,
                MovementReason::InitialStock,
                50,
            ))
            .unwrap();

        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], InventoryEvent::RecordOpened(_)));
        match &events[1] {
            InventoryEvent::MovementRecorded(e) => {
                assert_eq!(e.quantity_before, 0);
                assert_eq!(e.quantity_after, 50);
                assert_eq!(e.status_after, StockStatus::InStock);
            }
            other => panic!("expected MovementRecorded, got {other:?}"),
        }
    }

    #[test]
    fn non_initializing_movement_on_unknown_record_is_rejected() {
        let record = InventoryRecord::empty(record_id());
        let err = record
            .handle(&movement_cmd(
                owner(),
                record.id_typed(),
                item(),
                MovementType::Inbound,
                MovementReason::Purchase,
                10,
            ))
            .unwrap_err();
        assert_eq!(err, DomainError::UnknownRecord);
    }

    #[test]
    fn zero_and_negative_quantities_are_rejected() {
        let (o, r, i) = (owner(), record_id(), item());
        let record = stocked_record(o, r, i, 10, 100, 50);

        for q in [0, -5] {
            let err = record
                .handle(&movement_cmd(
                    o,
                    r,
                    i,
                    MovementType::Inbound,
                    MovementReason::Purchase,
                    q,
                ))
                .unwrap_err();
            assert!(matches!(err, DomainError::InvalidQuantity(_)));
        }
    }

    #[test]
    fn inbound_purchase_scenario() {
        // quantity=0, minimum=10, maximum=100; inbound purchase 50 -> in_stock.
        let (o, r, i) = (owner(), record_id(), item());
        let mut record = stocked_record(o, r, i, 10, 100, 0);
        assert_eq!(record.status(), StockStatus::OutOfStock);

        let events = record
            .handle(&movement_cmd(
                o,
                r,
                i,
                MovementType::Inbound,
                MovementReason::Purchase,
                50,
            ))
            .unwrap();
        assert_eq!(events.len(), 1);
        apply_all(&mut record, &events);

        assert_eq!(record.quantity(), 50);
        assert_eq!(record.status(), StockStatus::InStock);
    }

    #[test]
    fn outbound_sale_crosses_into_low_stock() {
        let (o, r, i) = (owner(), record_id(), item());
        let mut record = stocked_record(o, r, i, 10, 100, 50);

        let events = record
            .handle(&movement_cmd(
                o,
                r,
                i,
                MovementType::Outbound,
                MovementReason::Sale,
                45,
            ))
            .unwrap();
        match &events[0] {
            InventoryEvent::MovementRecorded(e) => {
                assert_eq!(e.status_before, StockStatus::InStock);
                assert_eq!(e.status_after, StockStatus::LowStock);
                assert_eq!(e.quantity_after, 5);
            }
            other => panic!("expected MovementRecorded, got {other:?}"),
        }
        apply_all(&mut record, &events);
        assert_eq!(record.status(), StockStatus::LowStock);
    }

    #[test]
    fn outbound_to_exactly_zero_succeeds_and_is_out_of_stock() {
        let (o, r, i) = (owner(), record_id(), item());
        let mut record = stocked_record(o, r, i, 10, 100, 5);

        let events = record
            .handle(&movement_cmd(
                o,
                r,
                i,
                MovementType::Outbound,
                MovementReason::Sale,
                5,
            ))
            .unwrap();
        apply_all(&mut record, &events);

        assert_eq!(record.quantity(), 0);
        assert_eq!(record.status(), StockStatus::OutOfStock);
    }

    #[test]
    fn overdraw_is_rejected_and_leaves_state_unchanged() {
        let (o, r, i) = (owner(), record_id(), item());
        let record = stocked_record(o, r, i, 10, 100, 5);
        let before = record.clone();

        let err = record
            .handle(&movement_cmd(
                o,
                r,
                i,
                MovementType::Outbound,
                MovementReason::Sale,
                6,
            ))
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::InsufficientStock {
                requested: 6,
                available: 5
            }
        );
        assert_eq!(record, before);
    }

    #[test]
    fn threshold_change_recomputes_status_without_movement() {
        let (o, r, i) = (owner(), record_id(), item());
        let mut record = stocked_record(o, r, i, 10, 100, 50);
        assert_eq!(record.status(), StockStatus::InStock);

        let events = record
            .handle(&InventoryRecordCommand::SetThresholds(SetThresholds {
                owner_id: o,
                record_id: r,
                item_id: i,
                patch: ThresholdPatch {
                    minimum_stock: Some(60),
                    ..Default::default()
                },
                occurred_at: now(),
            }))
            .unwrap();
        match &events[0] {
            InventoryEvent::ThresholdsSet(e) => {
                assert_eq!(e.status_before, StockStatus::InStock);
                assert_eq!(e.status_after, StockStatus::LowStock);
            }
            other => panic!("expected ThresholdsSet, got {other:?}"),
        }
        apply_all(&mut record, &events);
        assert_eq!(record.status(), StockStatus::LowStock);
    }

    #[test]
    fn negative_thresholds_are_rejected() {
        let (o, r, i) = (owner(), record_id(), item());
        let record = stocked_record(o, r, i, 10, 100, 50);

        let err = record
            .handle(&InventoryRecordCommand::SetThresholds(SetThresholds {
                owner_id: o,
                record_id: r,
                item_id: i,
                patch: ThresholdPatch {
                    reorder_point: Some(-1),
                    ..Default::default()
                },
                occurred_at: now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn discontinued_status_is_sticky_across_movements() {
        let (o, r, i) = (owner(), record_id(), item());
        let mut record = stocked_record(o, r, i, 10, 100, 50);

        let events = record
            .handle(&InventoryRecordCommand::Discontinue(Discontinue {
                owner_id: o,
                record_id: r,
                occurred_at: now(),
            }))
            .unwrap();
        apply_all(&mut record, &events);
        assert_eq!(record.status(), StockStatus::Discontinued);

        // Movements still flow, but derivation is suspended.
        let events = record
            .handle(&movement_cmd(
                o,
                r,
                i,
                MovementType::Outbound,
                MovementReason::Sale,
                45,
            ))
            .unwrap();
        apply_all(&mut record, &events);
        assert_eq!(record.quantity(), 5);
        assert_eq!(record.status(), StockStatus::Discontinued);

        // Reactivation resumes derivation from current quantity/thresholds.
        let events = record
            .handle(&InventoryRecordCommand::Reactivate(Reactivate {
                owner_id: o,
                record_id: r,
                occurred_at: now(),
            }))
            .unwrap();
        apply_all(&mut record, &events);
        assert_eq!(record.status(), StockStatus::LowStock);
    }

    #[test]
    fn unit_cost_flows_into_movement_costs() {
        let (o, r, i) = (owner(), record_id(), item());
        let mut record = stocked_record(o, r, i, 10, 100, 50);

        let events = record
            .handle(&InventoryRecordCommand::SetUnitCost(SetUnitCost {
                owner_id: o,
                record_id: r,
                unit_cost: Some(250),
                occurred_at: now(),
            }))
            .unwrap();
        apply_all(&mut record, &events);

        let events = record
            .handle(&movement_cmd(
                o,
                r,
                i,
                MovementType::Outbound,
                MovementReason::Sale,
                4,
            ))
            .unwrap();
        match &events[0] {
            InventoryEvent::MovementRecorded(e) => {
                assert_eq!(e.unit_cost, Some(250));
                assert_eq!(e.total_cost, Some(1000));
            }
            other => panic!("expected MovementRecorded, got {other:?}"),
        }
    }

    #[test]
    fn handle_does_not_mutate_state() {
        let (o, r, i) = (owner(), record_id(), item());
        let record = stocked_record(o, r, i, 10, 100, 50);
        let snapshot = record.clone();

        let cmd = movement_cmd(o, r, i, MovementType::Outbound, MovementReason::Sale, 5);
        let events1 = record.handle(&cmd).unwrap();
        let events2 = record.handle(&cmd).unwrap();

        assert_eq!(record, snapshot);
        assert_eq!(events1, events2);
    }

    fn arb_movement() -> impl Strategy<Value = (MovementType, MovementReason, i64)> {
        (
            prop_oneof![
                Just(MovementType::Inbound),
                Just(MovementType::Outbound),
                Just(MovementType::Adjustment),
                Just(MovementType::Transfer),
                Just(MovementType::Return),
                Just(MovementType::Damage),
                Just(MovementType::Expired),
                Just(MovementType::Theft),
                Just(MovementType::CycleCount),
            ],
            prop_oneof![
                Just(MovementReason::Purchase),
                Just(MovementReason::Sale),
                Just(MovementReason::Adjustment),
                Just(MovementReason::Correction),
                Just(MovementReason::CycleCount),
            ],
            1i64..200,
        )
    }

    proptest! {
        /// Quantity chaining + non-negativity: every accepted movement's
        /// `quantity_before` equals the previous `quantity_after`, and the
        /// on-hand quantity never goes below zero. Rejected movements change
        /// nothing.
        #[test]
        fn movement_chain_preserves_invariants(movements in prop::collection::vec(arb_movement(), 1..40)) {
            let (o, r, i) = (owner(), record_id(), item());
            let mut record = stocked_record(o, r, i, 10, 100, 50);
            let mut expected_before = record.quantity();

            for (mt, reason, qty) in movements {
                let snapshot = record.clone();
                match record.handle(&movement_cmd(o, r, i, mt, reason, qty)) {
                    Ok(events) => {
                        match &events[0] {
                            InventoryEvent::MovementRecorded(e) => {
                                prop_assert_eq!(e.quantity_before, expected_before);
                                prop_assert!(e.quantity_after >= 0);
                                prop_assert_eq!(
                                    e.quantity_after,
                                    e.quantity_before + mt.signed_delta(e.quantity)
                                );
                                expected_before = e.quantity_after;
                            }
                            other => prop_assert!(false, "unexpected event {:?}", other),
                        }
                        apply_all(&mut record, &events);
                        prop_assert!(record.quantity() >= 0);
                    }
                    Err(_) => {
                        prop_assert_eq!(&record, &snapshot);
                    }
                }
            }
        }

        /// Replaying the full event history from scratch reproduces the state.
        #[test]
        fn replay_reproduces_state(movements in prop::collection::vec(arb_movement(), 1..40)) {
            let (o, r, i) = (owner(), record_id(), item());
            let mut record = InventoryRecord::empty(r);
            let mut history: Vec<InventoryEvent> = Vec::new();

            let opening = record
                .handle(&movement_cmd(o, r, i, MovementType::Inbound, MovementReason::InitialStock, 50))
                .unwrap();
            for e in &opening {
                record.apply(e);
            }
            history.extend(opening);

            for (mt, reason, qty) in movements {
                if let Ok(events) = record.handle(&movement_cmd(o, r, i, mt, reason, qty)) {
                    for e in &events {
                        record.apply(e);
                    }
                    history.extend(events);
                }
            }

            let mut replayed = InventoryRecord::empty(r);
            for e in &history {
                replayed.apply(e);
            }

            prop_assert_eq!(replayed.quantity(), record.quantity());
            prop_assert_eq!(replayed.status(), record.status());
            prop_assert_eq!(replayed.version(), record.version());
        }
    }
}
