//! Data model for sqlgate routes and datasources.

mod datasource;
mod route;

pub use datasource::DatasourceDef;
pub use route::{ParamDecl, ParamType, RouteDef, StatementEntry, TaskDef};
