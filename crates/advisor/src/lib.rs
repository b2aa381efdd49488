//! `stockledger-advisor`
//!
//! **Responsibility:** Read-only restock advice.
//!
//! This crate is intentionally **not** part of the ledger domain:
//! - It must not mutate ledger state or emit domain events.
//! - It consumes record snapshots and produces recommendations.
//! - Scoring is a trait seam so a predictive model can replace the
//!   deterministic threshold scorer without touching callers.

pub mod recommendation;
pub mod scorer;
pub mod snapshot;

pub use recommendation::{RestockRecommendation, Urgency, prioritize};
pub use scorer::{RestockScorer, ThresholdScorer};
pub use snapshot::RecordSnapshot;
