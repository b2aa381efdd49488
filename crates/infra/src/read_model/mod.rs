//! Owner-isolated read model storage abstractions.

pub mod owner_store;

pub use owner_store::{InMemoryOwnerStore, OwnerStore};
