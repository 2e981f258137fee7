//! Session cleanup.
//!
//! A pooled connection, once released, must carry no residual per-request
//! session state into its next acquisition. MySQL exposes no SQL-level
//! "reset everything" primitive through this driver, but user-defined
//! session variables — the state class tasks actually create via
//! `SELECT ... INTO @var` — are enumerable through `performance_schema`.
//! Support is probed once per datasource at startup; when the probe fails
//! the fallback path is a logged warning, not an error.
//!
//! Cleanup failures are logged and never raised: the connection still
//! returns to the pool. Discarding the connection on every cleanup failure
//! could exhaust the pool under sustained errors.

use log::{debug, warn};
use sqlx::mysql::MySqlConnection;
use sqlx::Row;

/// Names of this connection's user-defined variables. The thread_id
/// subquery form works on every MySQL 5.7+ server.
const LIST_USER_VARIABLES: &str = "SELECT variable_name \
     FROM performance_schema.user_variables_by_thread \
     WHERE thread_id = (SELECT thread_id FROM performance_schema.threads \
                        WHERE processlist_id = CONNECTION_ID())";

/// Probe whether the server lets us enumerate user variables.
///
/// Fails on servers without `performance_schema` or without the
/// `user_variables_by_thread` instrument enabled.
pub async fn probe_reset_support(conn: &mut MySqlConnection) -> bool {
    sqlx::query(LIST_USER_VARIABLES).fetch_all(&mut *conn).await.is_ok()
}

/// Clear every user-defined session variable on this connection.
///
/// Variables are set to NULL rather than dropped (MySQL has no unset), which
/// is observably equivalent for the next acquirer: reads yield NULL.
pub async fn reset_user_variables(conn: &mut MySqlConnection) -> Result<usize, sqlx::Error> {
    let rows = sqlx::query(LIST_USER_VARIABLES).fetch_all(&mut *conn).await?;

    let mut cleared = 0;
    for row in &rows {
        let name: String = row.try_get(0)?;
        let stmt = format!("SET @`{}` = NULL", name.replace('`', "``"));
        sqlx::query(&stmt).execute(&mut *conn).await?;
        cleared += 1;
    }
    Ok(cleared)
}

/// Run session cleanup before a connection is released.
///
/// Unconditional on every exit path of a task. Never fails, never blocks
/// release: a cleanup error is logged and the connection goes back to the
/// pool regardless.
pub async fn cleanup(conn: &mut MySqlConnection, reset_supported: bool) {
    if !reset_supported {
        debug!("session cleanup skipped: user variable enumeration unsupported on this datasource");
        return;
    }
    match reset_user_variables(conn).await {
        Ok(0) => {}
        Ok(n) => debug!("session cleanup cleared {} user variable(s)", n),
        Err(e) => warn!("session cleanup failed (connection released anyway): {}", e),
    }
}
