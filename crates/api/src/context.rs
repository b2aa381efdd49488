use stockledger_core::{ActorId, OwnerId};

/// Owner context for a request.
///
/// This is immutable and must be present for all ledger routes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct OwnerContext {
    owner_id: OwnerId,
}

impl OwnerContext {
    pub fn new(owner_id: OwnerId) -> Self {
        Self { owner_id }
    }

    pub fn owner_id(&self) -> OwnerId {
        self.owner_id
    }
}

/// Actor context for a request (required on mutating routes).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ActorContext {
    actor_id: ActorId,
}

impl ActorContext {
    pub fn new(actor_id: ActorId) -> Self {
        Self { actor_id }
    }

    pub fn actor_id(&self) -> ActorId {
        self.actor_id
    }
}
