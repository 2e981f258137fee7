//! # sqlgate-core
//!
//! The SQL task execution engine. Takes a declared parameter schema, one or
//! more named-placeholder SQL templates, and a runtime request payload, and
//! turns them into safely parameterized statements executed against a pooled
//! MySQL connection with correct transactional and session-isolation
//! semantics, then normalizes the result into a stable shape.
//!
//! Pipeline: [`params`] (merge + validate) → [`executor`] (acquire, bind via
//! [`binder`], execute in order, commit/rollback, [`session`] cleanup,
//! release) → [`normalize`] (stable result shape).

pub mod binder;
pub mod classifier;
pub mod executor;
pub mod normalize;
pub mod params;
pub mod pool;
pub mod session;

pub use binder::BoundStatement;
pub use classifier::StatementKind;
pub use executor::{RouteOutcome, TaskEngine};
pub use normalize::{MutationSummary, NormalizedResult, RawOutcome};
pub use params::ParamMap;
pub use pool::{PoolManager, PoolStatus};
