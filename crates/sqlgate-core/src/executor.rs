//! Task executor.
//!
//! Drives one task through its lifecycle:
//! acquire → (begin) → bind/execute each statement in order → commit or
//! roll back → session cleanup → release.
//!
//! Every statement of a task runs on the same held connection, transaction
//! or not. For non-transactional tasks this is a connection-affinity
//! guarantee, not an isolation guarantee: a session variable populated by
//! statement 1 (`SELECT ... INTO @v`) must be visible to statement 2.
//!
//! Session cleanup runs unconditionally on every exit path before the
//! connection returns to the pool; its failures are logged, never raised.
//! The task's value is the normalization of the LAST statement's raw
//! result.

use std::sync::Arc;

use log::{debug, warn};
use serde::Serialize;
use serde_json::Value as JsonValue;
use sqlx::mysql::{MySql, MySqlArguments, MySqlConnection};
use sqlx::query::Query;
use sqlx::Connection;
use sqlgate_commons::{GatewayError, GatewayResult, RouteDef, StatementEntry, TaskDef};

use crate::binder::{self, BoundStatement};
use crate::classifier::{self, StatementKind};
use crate::normalize::{self, NormalizedResult, RawOutcome};
use crate::params::ParamMap;
use crate::pool::PoolManager;
use crate::session;

/// Executes declarative tasks against pooled connections.
pub struct TaskEngine {
    pools: Arc<PoolManager>,
}

/// Result of one route invocation: the single task's result unwrapped in
/// the common case, an ordered list when the route declares several tasks.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RouteOutcome {
    Single(NormalizedResult),
    Many(Vec<NormalizedResult>),
}

impl TaskEngine {
    pub fn new(pools: Arc<PoolManager>) -> Self {
        Self { pools }
    }

    pub fn pools(&self) -> &Arc<PoolManager> {
        &self.pools
    }

    /// Execute all of a route's tasks in declared order with one validated
    /// parameter map. The first failing task aborts the remainder.
    pub async fn execute_route(
        &self,
        route: &RouteDef,
        params: &ParamMap,
    ) -> GatewayResult<RouteOutcome> {
        let mut results = Vec::with_capacity(route.tasks.len());
        for task in &route.tasks {
            results.push(self.execute_task(task, params).await?);
        }
        if results.len() == 1 {
            match results.pop() {
                Some(single) => Ok(RouteOutcome::Single(single)),
                None => Err(GatewayError::internal("route produced no result")),
            }
        } else {
            Ok(RouteOutcome::Many(results))
        }
    }

    /// Execute one task: all statements on one connection, transactional
    /// when flagged, session cleanup before release on every exit path.
    ///
    /// The task body runs on its own spawned task. The HTTP layer drops
    /// handler futures when the client disconnects mid-request; detaching
    /// here pins the whole lifecycle (execute, commit or rollback, session
    /// cleanup) so a vanished caller cannot return a connection to the pool
    /// with residual session state.
    pub async fn execute_task(
        &self,
        task: &TaskDef,
        params: &ParamMap,
    ) -> GatewayResult<NormalizedResult> {
        if task.statements.is_empty() {
            return Err(GatewayError::internal("task declares no statements"));
        }

        let handle = tokio::spawn(run_task(Arc::clone(&self.pools), task.clone(), params.clone()));
        handle
            .await
            .map_err(|e| GatewayError::internal(format!("task execution aborted: {e}")))?
    }
}

async fn run_task(
    pools: Arc<PoolManager>,
    task: TaskDef,
    params: ParamMap,
) -> GatewayResult<NormalizedResult> {
    let mut conn = pools.acquire(&task.datasource).await?;
    let reset_supported = pools.supports_variable_reset(&task.datasource);

    let outcome = if task.transaction {
        run_transactional(&mut conn, &task.statements, &params).await
    } else {
        run_statements(&mut conn, &task.statements, &params).await
    };

    // Unconditional, before release, on success and failure alike.
    session::cleanup(&mut conn, reset_supported).await;
    drop(conn);

    outcome.map(normalize::normalize)
}

async fn run_transactional(
    conn: &mut MySqlConnection,
    statements: &[StatementEntry],
    params: &ParamMap,
) -> GatewayResult<RawOutcome> {
    let mut tx = conn
        .begin()
        .await
        .map_err(|e| GatewayError::internal(format!("failed to begin transaction: {e}")))?;

    match run_statements(&mut tx, statements, params).await {
        Ok(raw) => {
            tx.commit()
                .await
                .map_err(|e| GatewayError::internal(format!("commit failed: {e}")))?;
            Ok(raw)
        }
        Err(e) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!("rollback failed after statement error: {}", rollback_err);
            }
            Err(e)
        }
    }
}

async fn run_statements(
    conn: &mut MySqlConnection,
    statements: &[StatementEntry],
    params: &ParamMap,
) -> GatewayResult<RawOutcome> {
    let mut last = None;
    for (idx, entry) in statements.iter().enumerate() {
        let bound = binder::bind(&entry.sql, params)?;
        let is_last = idx + 1 == statements.len();
        last = Some(execute_statement(conn, entry, &bound, is_last).await?);
    }
    last.ok_or_else(|| GatewayError::internal("task declares no statements"))
}

async fn execute_statement(
    conn: &mut MySqlConnection,
    entry: &StatementEntry,
    bound: &BoundStatement,
    fetch_warnings: bool,
) -> GatewayResult<RawOutcome> {
    let stmt_err = |e: sqlx::Error| GatewayError::StatementExecution {
        statement_id: entry.id.clone(),
        message: e.to_string(),
    };

    match classifier::classify(&entry.sql) {
        StatementKind::Query => {
            let rows = build_query(bound).fetch_all(&mut *conn).await.map_err(stmt_err)?;
            Ok(RawOutcome::Rows(rows))
        }
        StatementKind::Mutation => {
            let result = build_query(bound).execute(&mut *conn).await.map_err(stmt_err)?;
            // sqlx's mutation result carries no warning count; read it from
            // the session while we still hold the connection. Only the last
            // statement's result survives, so only it pays the round trip.
            let warning_count =
                if fetch_warnings { fetch_warning_count(conn).await } else { 0 };
            Ok(RawOutcome::Mutation {
                affected_rows: result.rows_affected(),
                insert_id: result.last_insert_id(),
                warning_count,
            })
        }
    }
}

fn build_query<'q>(bound: &'q BoundStatement) -> Query<'q, MySql, MySqlArguments> {
    let mut query = sqlx::query(&bound.sql);
    for value in &bound.args {
        query = bind_value(query, value);
    }
    query
}

/// Bind one JSON value as a driver argument. Arrays and objects bind as
/// JSON text (a single positional argument each, keeping the 1:1
/// placeholder-to-argument correspondence).
fn bind_value<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    value: &'q JsonValue,
) -> Query<'q, MySql, MySqlArguments> {
    match value {
        JsonValue::Null => query.bind(None::<String>),
        JsonValue::Bool(b) => query.bind(*b),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                query.bind(i)
            } else if let Some(u) = n.as_u64() {
                query.bind(u)
            } else {
                query.bind(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        JsonValue::String(s) => query.bind(s.as_str()),
        other => query.bind(other.to_string()),
    }
}

async fn fetch_warning_count(conn: &mut MySqlConnection) -> u64 {
    match sqlx::query_scalar::<_, i64>("SELECT @@warning_count").fetch_one(&mut *conn).await {
        Ok(n) if n >= 0 => n as u64,
        Ok(_) => 0,
        Err(e) => {
            debug!("could not read warning count: {}", e);
            0
        }
    }
}
