//! HTTP surface of the scheduling service.
//!
//! Routes are nested under `/api/`. All routes except the health check go
//! through the session middleware, which injects the calling `Actor`.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::{serve, ServerError};
pub use types::ApiContext;
