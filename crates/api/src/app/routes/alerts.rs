use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use stockledger_alerts::AlertId;
use stockledger_core::AggregateId;
use stockledger_inventory::InventoryRecordId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

fn parse_alert_id(id: &str) -> Result<AlertId, axum::response::Response> {
    id.parse::<AggregateId>().map(AlertId::new).map_err(|_| {
        errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid alert id")
    })
}

pub async fn create(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<crate::context::OwnerContext>,
    Json(body): Json<dto::CreateAlertRequest>,
) -> axum::response::Response {
    let record: AggregateId = match body.record_id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid record id")
        }
    };

    match services.ledger().alerts().create_alert(
        owner.owner_id(),
        InventoryRecordId::new(record),
        body.alert_type,
        body.priority,
        body.message,
        body.metadata,
    ) {
        Ok(alert) => (StatusCode::CREATED, Json(dto::alert_to_json(alert))).into_response(),
        Err(e) => errors::alert_error_to_response(e),
    }
}

/// Active alerts by default; `status=` widens the listing explicitly.
pub async fn list(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<crate::context::OwnerContext>,
    Query(query): Query<dto::AlertsQuery>,
) -> axum::response::Response {
    let alerts = match query.status {
        None => services
            .ledger()
            .alerts()
            .list_active(owner.owner_id(), query.alert_type),
        Some(status) => services
            .ledger()
            .alerts()
            .list(owner.owner_id())
            .into_iter()
            .filter(|a| a.status == status)
            .filter(|a| query.alert_type.is_none_or(|t| a.alert_type == t))
            .collect(),
    };

    let alerts = alerts.into_iter().map(dto::alert_to_json).collect::<Vec<_>>();
    (StatusCode::OK, Json(alerts)).into_response()
}

pub async fn acknowledge(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<crate::context::OwnerContext>,
    Extension(actor): Extension<crate::context::ActorContext>,
    Path(alert_id): Path<String>,
    Json(body): Json<dto::AlertNotesRequest>,
) -> axum::response::Response {
    let alert_id = match parse_alert_id(&alert_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.ledger().alerts().acknowledge(
        owner.owner_id(),
        alert_id,
        actor.actor_id(),
        body.notes,
    ) {
        Ok(alert) => (StatusCode::OK, Json(dto::alert_to_json(alert))).into_response(),
        Err(e) => errors::alert_error_to_response(e),
    }
}

pub async fn resolve(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<crate::context::OwnerContext>,
    Extension(actor): Extension<crate::context::ActorContext>,
    Path(alert_id): Path<String>,
    Json(body): Json<dto::AlertNotesRequest>,
) -> axum::response::Response {
    let alert_id = match parse_alert_id(&alert_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.ledger().alerts().resolve(
        owner.owner_id(),
        alert_id,
        Some(actor.actor_id()),
        body.notes,
    ) {
        Ok(alert) => (StatusCode::OK, Json(dto::alert_to_json(alert))).into_response(),
        Err(e) => errors::alert_error_to_response(e),
    }
}

pub async fn dismiss(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<crate::context::OwnerContext>,
    Extension(actor): Extension<crate::context::ActorContext>,
    Path(alert_id): Path<String>,
    Json(body): Json<dto::AlertNotesRequest>,
) -> axum::response::Response {
    let alert_id = match parse_alert_id(&alert_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.ledger().alerts().dismiss(
        owner.owner_id(),
        alert_id,
        actor.actor_id(),
        body.notes,
    ) {
        Ok(alert) => (StatusCode::OK, Json(dto::alert_to_json(alert))).into_response(),
        Err(e) => errors::alert_error_to_response(e),
    }
}
