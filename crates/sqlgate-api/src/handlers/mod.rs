//! HTTP handlers for the sqlgate REST API.

pub mod admin;
pub mod dynamic;
pub mod health;

pub use admin::{
    create_route, delete_route, delete_statement, get_route, list_routes, update_route,
    update_statement,
};
pub use dynamic::dispatch;
pub use health::healthcheck;
