use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};

use crate::app::services::AppServices;
use crate::app::dto;

pub async fn restock_recommendations(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<crate::context::OwnerContext>,
) -> axum::response::Response {
    let recommendations = services
        .ledger()
        .restock_recommendations(owner.owner_id())
        .into_iter()
        .map(dto::recommendation_to_json)
        .collect::<Vec<_>>();

    (StatusCode::OK, Json(recommendations)).into_response()
}

pub async fn analytics(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<crate::context::OwnerContext>,
) -> axum::response::Response {
    let analytics = services.ledger().analytics(owner.owner_id());
    (StatusCode::OK, Json(analytics)).into_response()
}
