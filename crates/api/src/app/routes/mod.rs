use axum::{
    routing::{get, post, put},
    Router,
};

pub mod alerts;
pub mod insights;
pub mod movements;
pub mod records;
pub mod system;

/// Router for all owner-scoped endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/stream", get(system::stream))
        .route("/movements", post(movements::record))
        .route("/movements/:record_id", get(movements::history))
        .route("/records", get(records::list))
        .route("/records/:item_id", get(records::get))
        .route("/records/:item_id/thresholds", put(records::set_thresholds))
        .route("/records/:item_id/unit-cost", put(records::set_unit_cost))
        .route("/records/:item_id/discontinue", post(records::discontinue))
        .route("/records/:item_id/reactivate", post(records::reactivate))
        .route("/alerts", post(alerts::create).get(alerts::list))
        .route("/alerts/:alert_id/acknowledge", put(alerts::acknowledge))
        .route("/alerts/:alert_id/resolve", put(alerts::resolve))
        .route("/alerts/:alert_id/dismiss", put(alerts::dismiss))
        .route(
            "/restock-recommendations",
            get(insights::restock_recommendations),
        )
        .route("/analytics", get(insights::analytics))
}
