//! # sqlgate-commons
//!
//! Shared types for sqlgate: route/task/datasource models and the typed
//! error enum used across all sqlgate crates (sqlgate-core, sqlgate-api,
//! sqlgate-server). Keep this crate free of heavyweight dependencies so it
//! can sit at the bottom of the dependency graph.

pub mod errors;
pub mod models;

pub use errors::{FieldError, GatewayError, GatewayResult};
pub use models::{
    DatasourceDef, ParamDecl, ParamType, RouteDef, StatementEntry, TaskDef,
};
