use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use stockledger_core::AggregateId;
use stockledger_inventory::ItemId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

fn parse_item_id(id: &str) -> Result<ItemId, axum::response::Response> {
    id.parse::<AggregateId>().map(ItemId::new).map_err(|_| {
        errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid item id")
    })
}

pub async fn list(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<crate::context::OwnerContext>,
) -> axum::response::Response {
    let records = services.ledger().list_records(owner.owner_id());
    (
        StatusCode::OK,
        Json(records.into_iter().map(dto::record_to_json).collect::<Vec<_>>()),
    )
        .into_response()
}

pub async fn get(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<crate::context::OwnerContext>,
    Path(item_id): Path<String>,
) -> axum::response::Response {
    let item = match parse_item_id(&item_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.ledger().get_record(owner.owner_id(), &item) {
        Some(rm) => (StatusCode::OK, Json(dto::record_to_json(rm))).into_response(),
        None => errors::json_error(StatusCode::NOT_FOUND, "unknown_record", "record not found"),
    }
}

pub async fn set_thresholds(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<crate::context::OwnerContext>,
    Path(item_id): Path<String>,
    Json(body): Json<dto::SetThresholdsRequest>,
) -> axum::response::Response {
    let item = match parse_item_id(&item_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services
        .ledger()
        .set_thresholds(owner.owner_id(), item, body.into_patch())
    {
        Ok(rm) => (StatusCode::OK, Json(dto::record_to_json(rm))).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn set_unit_cost(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<crate::context::OwnerContext>,
    Path(item_id): Path<String>,
    Json(body): Json<dto::SetUnitCostRequest>,
) -> axum::response::Response {
    let item = match parse_item_id(&item_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services
        .ledger()
        .set_unit_cost(owner.owner_id(), item, body.unit_cost)
    {
        Ok(rm) => (StatusCode::OK, Json(dto::record_to_json(rm))).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn discontinue(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<crate::context::OwnerContext>,
    Path(item_id): Path<String>,
) -> axum::response::Response {
    let item = match parse_item_id(&item_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.ledger().discontinue(owner.owner_id(), item) {
        Ok(rm) => (StatusCode::OK, Json(dto::record_to_json(rm))).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn reactivate(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<crate::context::OwnerContext>,
    Path(item_id): Path<String>,
) -> axum::response::Response {
    let item = match parse_item_id(&item_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.ledger().reactivate(owner.owner_id(), item) {
        Ok(rm) => (StatusCode::OK, Json(dto::record_to_json(rm))).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}
