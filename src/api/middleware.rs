//! Session authentication middleware.
//!
//! Reads the session token from the `session` cookie or an
//! `Authorization: Bearer` header, resolves it to an `Actor`, and injects
//! the actor into request extensions for downstream handlers.

use axum::extract::Request;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::types::ApiContext;

const SESSION_COOKIE: &str = "session";

/// Require a valid session.
///
/// Accesses `ApiContext` from request extensions (injected by Extension layer).
pub async fn require_session(req: Request, next: Next) -> Response {
    match require_session_inner(req, next).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

async fn require_session_inner(mut req: Request, next: Next) -> Result<Response, ApiError> {
    let ctx: ApiContext = req
        .extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or(ApiError::Internal("missing API context".into()))?;

    let token = session_token(req.headers()).ok_or(ApiError::Unauthorized)?;
    let actor = ctx
        .sessions
        .resolve(&token, ctx.now())?
        .ok_or(ApiError::Unauthorized)?;

    tracing::debug!(user_id = %actor.user_id, role = actor.role.name(), "Session resolved");
    req.extensions_mut().insert(actor);

    Ok(next.run(req).await)
}

/// Extract the session token, preferring the cookie.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let from_cookie = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string());

    from_cookie
        .or_else(|| {
            headers
                .get(AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(|v| v.trim().to_string())
        })
        .filter(|token| !token.is_empty())
}
