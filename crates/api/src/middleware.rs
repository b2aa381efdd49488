use axum::{
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode},
    middleware::Next,
    response::Response,
};

use stockledger_core::{ActorId, OwnerId};

use crate::app::errors;
use crate::context::{ActorContext, OwnerContext};

pub const OWNER_HEADER: &str = "x-owner-id";
pub const ACTOR_HEADER: &str = "x-actor-id";

/// Attach owner/actor context from identity headers.
///
/// `X-Owner-Id` is required on every ledger route. `X-Actor-Id` is required
/// on mutating routes only; the ids are opaque and issued by an external
/// identity provider, so no authentication happens here.
pub async fn context_middleware(mut req: Request<Body>, next: Next) -> Response {
    let owner_id: OwnerId = match parse_header(req.headers(), OWNER_HEADER) {
        Ok(Some(id)) => id,
        Ok(None) => {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "missing_owner",
                "X-Owner-Id header is required",
            );
        }
        Err(resp) => return resp,
    };
    req.extensions_mut().insert(OwnerContext::new(owner_id));

    let actor_id: Option<ActorId> = match parse_header(req.headers(), ACTOR_HEADER) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match actor_id {
        Some(actor_id) => {
            req.extensions_mut().insert(ActorContext::new(actor_id));
        }
        None if is_mutating(req.method()) => {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "missing_actor",
                "X-Actor-Id header is required for mutating requests",
            );
        }
        None => {}
    }

    next.run(req).await
}

fn is_mutating(method: &Method) -> bool {
    !matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

fn parse_header<T: std::str::FromStr>(
    headers: &HeaderMap,
    name: &'static str,
) -> Result<Option<T>, Response> {
    let Some(value) = headers.get(name) else {
        return Ok(None);
    };
    value
        .to_str()
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .map(Some)
        .ok_or_else(|| {
            errors::json_error(
                StatusCode::BAD_REQUEST,
                "invalid_id",
                format!("{name} must be a UUID"),
            )
        })
}
