//! Infrastructure layer: event store, dispatch, projections, services.

pub mod alert_engine;
pub mod analytics;
pub mod command_dispatcher;
pub mod event_store;
pub mod ledger_service;
pub mod notifications;
pub mod projections;
pub mod read_model;

#[cfg(test)]
mod integration_tests;
