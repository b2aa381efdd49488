use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use stockledger_core::{ActorId, Aggregate, AggregateId, AggregateRoot, DomainError, OwnerId};
use stockledger_events::Event;
use stockledger_inventory::InventoryRecordId;

/// Alert identifier (owner-scoped via `owner_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertId(pub AggregateId);

impl AlertId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for AlertId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Condition category an alert reports on.
///
/// `LowStock`/`OutOfStock`/`Overstock` are the stock-level types driven by the
/// status deriver; the remaining types are opened manually or by external
/// collaborators.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    LowStock,
    OutOfStock,
    Overstock,
    PriceChange,
    ExpiryWarning,
    SeasonalDemand,
    SupplierIssue,
}

impl AlertType {
    pub fn is_stock_level(self) -> bool {
        matches!(
            self,
            AlertType::LowStock | AlertType::OutOfStock | AlertType::Overstock
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AlertType::LowStock => "low_stock",
            AlertType::OutOfStock => "out_of_stock",
            AlertType::Overstock => "overstock",
            AlertType::PriceChange => "price_change",
            AlertType::ExpiryWarning => "expiry_warning",
            AlertType::SeasonalDemand => "seasonal_demand",
            AlertType::SupplierIssue => "supplier_issue",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertPriority {
    Low,
    Medium,
    High,
    Critical,
}

/// Alert lifecycle status.
///
/// Legal transitions: `active → acknowledged → resolved`, `active → resolved`,
/// `active → dismissed`. `resolved` and `dismissed` are terminal.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Active,
    Acknowledged,
    Resolved,
    Dismissed,
}

impl AlertStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, AlertStatus::Resolved | AlertStatus::Dismissed)
    }
}

/// Aggregate root: Alert.
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    id: AlertId,
    owner_id: Option<OwnerId>,
    record_id: Option<InventoryRecordId>,
    alert_type: AlertType,
    status: AlertStatus,
    priority: AlertPriority,
    message: String,
    metadata: Option<JsonValue>,
    acknowledged_at: Option<DateTime<Utc>>,
    acknowledged_by: Option<ActorId>,
    acknowledgement_notes: Option<String>,
    resolved_at: Option<DateTime<Utc>>,
    resolved_by: Option<ActorId>,
    resolution_notes: Option<String>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

impl Alert {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: AlertId) -> Self {
        Self {
            id,
            owner_id: None,
            record_id: None,
            alert_type: AlertType::LowStock,
            status: AlertStatus::Active,
            priority: AlertPriority::Low,
            message: String::new(),
            metadata: None,
            acknowledged_at: None,
            acknowledged_by: None,
            acknowledgement_notes: None,
            resolved_at: None,
            resolved_by: None,
            resolution_notes: None,
            created_at: None,
            updated_at: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> AlertId {
        self.id
    }

    pub fn owner_id(&self) -> Option<OwnerId> {
        self.owner_id
    }

    pub fn record_id(&self) -> Option<InventoryRecordId> {
        self.record_id
    }

    pub fn alert_type(&self) -> AlertType {
        self.alert_type
    }

    pub fn status(&self) -> AlertStatus {
        self.status
    }

    pub fn priority(&self) -> AlertPriority {
        self.priority
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn metadata(&self) -> Option<&JsonValue> {
        self.metadata.as_ref()
    }

    pub fn resolution_notes(&self) -> Option<&str> {
        self.resolution_notes.as_deref()
    }

    pub fn is_active(&self) -> bool {
        self.status == AlertStatus::Active
    }
}

impl AggregateRoot for Alert {
    type Id = AlertId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: OpenAlert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenAlert {
    pub owner_id: OwnerId,
    pub alert_id: AlertId,
    pub record_id: InventoryRecordId,
    pub alert_type: AlertType,
    pub priority: AlertPriority,
    pub message: String,
    pub metadata: Option<JsonValue>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RefreshAlert.
///
/// A duplicate trigger while the alert is still active updates the message,
/// metadata, and priority in place rather than opening a second alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshAlert {
    pub owner_id: OwnerId,
    pub alert_id: AlertId,
    pub priority: AlertPriority,
    pub message: String,
    pub metadata: Option<JsonValue>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AcknowledgeAlert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcknowledgeAlert {
    pub owner_id: OwnerId,
    pub alert_id: AlertId,
    pub acknowledged_by: ActorId,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ResolveAlert.
///
/// `resolved_by` is optional so the engine can auto-resolve alerts without an
/// acting user (e.g. stock replenishment).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveAlert {
    pub owner_id: OwnerId,
    pub alert_id: AlertId,
    pub resolved_by: Option<ActorId>,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DismissAlert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DismissAlert {
    pub owner_id: OwnerId,
    pub alert_id: AlertId,
    pub dismissed_by: ActorId,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AlertCommand {
    OpenAlert(OpenAlert),
    RefreshAlert(RefreshAlert),
    AcknowledgeAlert(AcknowledgeAlert),
    ResolveAlert(ResolveAlert),
    DismissAlert(DismissAlert),
}

/// Event: AlertOpened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertOpened {
    pub owner_id: OwnerId,
    pub alert_id: AlertId,
    pub record_id: InventoryRecordId,
    pub alert_type: AlertType,
    pub priority: AlertPriority,
    pub message: String,
    pub metadata: Option<JsonValue>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: AlertRefreshed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRefreshed {
    pub owner_id: OwnerId,
    pub alert_id: AlertId,
    pub priority: AlertPriority,
    pub message: String,
    pub metadata: Option<JsonValue>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: AlertAcknowledged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertAcknowledged {
    pub owner_id: OwnerId,
    pub alert_id: AlertId,
    pub acknowledged_by: ActorId,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: AlertResolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertResolved {
    pub owner_id: OwnerId,
    pub alert_id: AlertId,
    pub resolved_by: Option<ActorId>,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: AlertDismissed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertDismissed {
    pub owner_id: OwnerId,
    pub alert_id: AlertId,
    pub dismissed_by: ActorId,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AlertEvent {
    AlertOpened(AlertOpened),
    AlertRefreshed(AlertRefreshed),
    AlertAcknowledged(AlertAcknowledged),
    AlertResolved(AlertResolved),
    AlertDismissed(AlertDismissed),
}

impl Event for AlertEvent {
    fn event_type(&self) -> &'static str {
        match self {
            AlertEvent::AlertOpened(_) => "ledger.alert.opened",
            AlertEvent::AlertRefreshed(_) => "ledger.alert.refreshed",
            AlertEvent::AlertAcknowledged(_) => "ledger.alert.acknowledged",
            AlertEvent::AlertResolved(_) => "ledger.alert.resolved",
            AlertEvent::AlertDismissed(_) => "ledger.alert.dismissed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            AlertEvent::AlertOpened(e) => e.occurred_at,
            AlertEvent::AlertRefreshed(e) => e.occurred_at,
            AlertEvent::AlertAcknowledged(e) => e.occurred_at,
            AlertEvent::AlertResolved(e) => e.occurred_at,
            AlertEvent::AlertDismissed(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Alert {
    type Command = AlertCommand;
    type Event = AlertEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            AlertEvent::AlertOpened(e) => {
                self.id = e.alert_id;
                self.owner_id = Some(e.owner_id);
                self.record_id = Some(e.record_id);
                self.alert_type = e.alert_type;
                self.status = AlertStatus::Active;
                self.priority = e.priority;
                self.message = e.message.clone();
                self.metadata = e.metadata.clone();
                self.created_at = Some(e.occurred_at);
                self.updated_at = Some(e.occurred_at);
                self.created = true;
            }
            AlertEvent::AlertRefreshed(e) => {
                self.priority = e.priority;
                self.message = e.message.clone();
                self.metadata = e.metadata.clone();
                self.updated_at = Some(e.occurred_at);
            }
            AlertEvent::AlertAcknowledged(e) => {
                self.status = AlertStatus::Acknowledged;
                self.acknowledged_at = Some(e.occurred_at);
                self.acknowledged_by = Some(e.acknowledged_by);
                self.acknowledgement_notes = e.notes.clone();
                self.updated_at = Some(e.occurred_at);
            }
            AlertEvent::AlertResolved(e) => {
                self.status = AlertStatus::Resolved;
                self.resolved_at = Some(e.occurred_at);
                self.resolved_by = e.resolved_by;
                self.resolution_notes = e.notes.clone();
                self.updated_at = Some(e.occurred_at);
            }
            AlertEvent::AlertDismissed(e) => {
                self.status = AlertStatus::Dismissed;
                self.updated_at = Some(e.occurred_at);
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            AlertCommand::OpenAlert(cmd) => self.handle_open(cmd),
            AlertCommand::RefreshAlert(cmd) => self.handle_refresh(cmd),
            AlertCommand::AcknowledgeAlert(cmd) => self.handle_acknowledge(cmd),
            AlertCommand::ResolveAlert(cmd) => self.handle_resolve(cmd),
            AlertCommand::DismissAlert(cmd) => self.handle_dismiss(cmd),
        }
    }
}

impl Alert {
    fn ensure_owner(&self, owner_id: OwnerId) -> Result<(), DomainError> {
        if !self.created {
            return Ok(());
        }
        if self.owner_id != Some(owner_id) {
            return Err(DomainError::invariant("owner mismatch"));
        }
        Ok(())
    }

    fn ensure_alert_id(&self, alert_id: AlertId) -> Result<(), DomainError> {
        if self.id != alert_id {
            return Err(DomainError::invariant("alert_id mismatch"));
        }
        Ok(())
    }

    fn handle_open(&self, cmd: &OpenAlert) -> Result<Vec<AlertEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("alert already exists"));
        }
        if cmd.message.trim().is_empty() {
            return Err(DomainError::validation("alert message must not be empty"));
        }

        Ok(vec![AlertEvent::AlertOpened(AlertOpened {
            owner_id: cmd.owner_id,
            alert_id: cmd.alert_id,
            record_id: cmd.record_id,
            alert_type: cmd.alert_type,
            priority: cmd.priority,
            message: cmd.message.clone(),
            metadata: cmd.metadata.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_refresh(&self, cmd: &RefreshAlert) -> Result<Vec<AlertEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_owner(cmd.owner_id)?;
        self.ensure_alert_id(cmd.alert_id)?;

        if self.status != AlertStatus::Active {
            return Err(DomainError::invalid_transition(
                "only active alerts can be refreshed",
            ));
        }

        Ok(vec![AlertEvent::AlertRefreshed(AlertRefreshed {
            owner_id: cmd.owner_id,
            alert_id: cmd.alert_id,
            priority: cmd.priority,
            message: cmd.message.clone(),
            metadata: cmd.metadata.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_acknowledge(&self, cmd: &AcknowledgeAlert) -> Result<Vec<AlertEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_owner(cmd.owner_id)?;
        self.ensure_alert_id(cmd.alert_id)?;

        if self.status != AlertStatus::Active {
            return Err(DomainError::invalid_transition(
                "only active alerts can be acknowledged",
            ));
        }

        Ok(vec![AlertEvent::AlertAcknowledged(AlertAcknowledged {
            owner_id: cmd.owner_id,
            alert_id: cmd.alert_id,
            acknowledged_by: cmd.acknowledged_by,
            notes: cmd.notes.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_resolve(&self, cmd: &ResolveAlert) -> Result<Vec<AlertEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_owner(cmd.owner_id)?;
        self.ensure_alert_id(cmd.alert_id)?;

        if !matches!(self.status, AlertStatus::Active | AlertStatus::Acknowledged) {
            return Err(DomainError::invalid_transition(
                "only active or acknowledged alerts can be resolved",
            ));
        }

        Ok(vec![AlertEvent::AlertResolved(AlertResolved {
            owner_id: cmd.owner_id,
            alert_id: cmd.alert_id,
            resolved_by: cmd.resolved_by,
            notes: cmd.notes.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_dismiss(&self, cmd: &DismissAlert) -> Result<Vec<AlertEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_owner(cmd.owner_id)?;
        self.ensure_alert_id(cmd.alert_id)?;

        if self.status != AlertStatus::Active {
            return Err(DomainError::invalid_transition(
                "only active alerts can be dismissed",
            ));
        }

        Ok(vec![AlertEvent::AlertDismissed(AlertDismissed {
            owner_id: cmd.owner_id,
            alert_id: cmd.alert_id,
            dismissed_by: cmd.dismissed_by,
            notes: cmd.notes.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }
}
