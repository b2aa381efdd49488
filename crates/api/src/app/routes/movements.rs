use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use stockledger_core::AggregateId;
use stockledger_inventory::{InventoryRecordId, ItemId};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub async fn record(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<crate::context::OwnerContext>,
    Extension(actor): Extension<crate::context::ActorContext>,
    Json(body): Json<dto::RecordMovementRequest>,
) -> axum::response::Response {
    let item: AggregateId = match body.item_id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid item id")
        }
    };

    let movement = match services.ledger().apply_movement(
        owner.owner_id(),
        actor.actor_id(),
        ItemId::new(item),
        body.into_movement(),
    ) {
        Ok(m) => m,
        Err(e) => return errors::ledger_error_to_response(e),
    };

    (StatusCode::CREATED, Json(dto::movement_to_json(movement))).into_response()
}

pub async fn history(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<crate::context::OwnerContext>,
    Path(record_id): Path<String>,
    Query(query): Query<dto::HistoryQuery>,
) -> axum::response::Response {
    let record: AggregateId = match record_id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid record id")
        }
    };

    match services.ledger().movement_history(
        owner.owner_id(),
        &InventoryRecordId::new(record),
        query.from,
        query.to,
    ) {
        Ok(movements) => (
            StatusCode::OK,
            Json(
                movements
                    .into_iter()
                    .map(dto::movement_to_json)
                    .collect::<Vec<_>>(),
            ),
        )
            .into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}
