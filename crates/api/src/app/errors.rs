use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use stockledger_infra::alert_engine::AlertEngineError;
use stockledger_infra::command_dispatcher::DispatchError;
use stockledger_infra::ledger_service::LedgerError;

pub fn ledger_error_to_response(err: LedgerError) -> axum::response::Response {
    match err {
        LedgerError::UnknownRecord => {
            json_error(StatusCode::NOT_FOUND, "unknown_record", "unknown inventory record")
        }
        LedgerError::Dispatch(e) => dispatch_error_to_response(e),
        LedgerError::Poisoned | LedgerError::Internal(_) => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "internal error",
        ),
    }
}

pub fn alert_error_to_response(err: AlertEngineError) -> axum::response::Response {
    match err {
        AlertEngineError::NotFound => {
            json_error(StatusCode::NOT_FOUND, "not_found", "alert not found")
        }
        AlertEngineError::Dispatch(e) => dispatch_error_to_response(e),
        AlertEngineError::Projection(msg) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "projection_error", msg)
        }
        AlertEngineError::Poisoned => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "internal error",
        ),
    }
}

pub fn dispatch_error_to_response(err: DispatchError) -> axum::response::Response {
    match err {
        DispatchError::Concurrency(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        DispatchError::InsufficientStock {
            requested,
            available,
        } => json_error(
            StatusCode::CONFLICT,
            "insufficient_stock",
            format!("requested {requested} but only {available} on hand"),
        ),
        DispatchError::Validation(msg) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", msg)
        }
        DispatchError::InvalidQuantity(msg) => {
            json_error(StatusCode::BAD_REQUEST, "invalid_quantity", msg)
        }
        DispatchError::UnknownRecord => {
            json_error(StatusCode::NOT_FOUND, "unknown_record", "unknown inventory record")
        }
        DispatchError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        DispatchError::InvalidTransition(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invalid_transition", msg)
        }
        DispatchError::InvariantViolation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
        }
        DispatchError::OwnerIsolation(msg) => {
            json_error(StatusCode::FORBIDDEN, "owner_isolation", msg)
        }
        DispatchError::Deserialize(msg) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "deserialize_error", msg)
        }
        DispatchError::Store(e) => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "store_error",
            format!("{e:?}"),
        ),
        DispatchError::Publish(msg) => json_error(StatusCode::BAD_GATEWAY, "publish_error", msg),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
