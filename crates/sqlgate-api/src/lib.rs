// sqlgate API Library
//
// This crate provides the REST API layer for sqlgate,
// including HTTP handlers, routes, request/response models, the static
// route table, and the route document store.

pub mod handlers;
pub mod models;
pub mod router;
pub mod routes;
pub mod state;
pub mod store;

pub use models::{ApiResponse, ErrorDetail};
pub use router::{CompiledRoute, PathPattern, RouteTable};
pub use routes::configure_routes;
pub use state::ApiState;
pub use store::{RouteStore, StoreError};
