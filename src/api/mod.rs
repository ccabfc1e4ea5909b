//! HTTP transport for the interview service.
//!
//! Routes are nested under `/api/`. The router is composable:
//! `intake_api_router()` returns a `Router` that can be mounted on any
//! axum server instance.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod types;

pub use router::intake_api_router;
pub use types::ApiContext;
