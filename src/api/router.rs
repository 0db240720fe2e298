//! HTTP router.
//!
//! Returns a composable `Router` with every route nested under `/api/`.
//! Everything except the health check requires a session.

use axum::routing::{get, patch, put};
use axum::Router;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;

/// Build the API router.
///
/// The session middleware uses `Extension<ApiContext>` (injected as the
/// outermost layer). Handlers use `State<ApiContext>` (via `with_state`).
pub fn api_router(ctx: ApiContext) -> Router {
    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let protected = Router::new()
        .route(
            "/turnos",
            get(endpoints::appointments::list).post(endpoints::appointments::create),
        )
        .route(
            "/turnos/disponibilidad",
            get(endpoints::appointments::availability),
        )
        .route("/turnos/:id", get(endpoints::appointments::detail))
        .route(
            "/turnos/:id/reprogramar",
            put(endpoints::appointments::reschedule),
        )
        .route(
            "/turnos/:id/estado",
            patch(endpoints::appointments::change_status),
        )
        .route("/profesionales", get(endpoints::directory::professionals))
        .route(
            "/obras-sociales",
            get(endpoints::directory::insurance_providers),
        )
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::require_session))
        // Extension must be outermost so the middleware can extract ApiContext
        .layer(axum::Extension(ctx));

    let public = Router::new().route("/health", get(endpoints::health::check));

    Router::new().nest("/api", protected.merge(public))
}
