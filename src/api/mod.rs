//! HTTP adapter.
//!
//! Exposes the extraction pipeline and the session inventory as a small
//! REST surface. The router is composable: `api_router()` returns a `Router`
//! that can be mounted on any axum server instance.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use error::ApiError;
pub use router::api_router;
pub use server::{start_api_server_on, ApiServer};
pub use types::ApiContext;
