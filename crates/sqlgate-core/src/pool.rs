//! Connection pool manager.
//!
//! Owns one sqlx MySQL pool per logical datasource. Pools are created
//! lazily at startup with a single liveness probe each; an unreachable
//! datasource never aborts startup — it is marked unavailable, logged, and
//! every task addressed to it fails at acquire time with
//! `DatasourceUnavailable` while other datasources keep working. A later
//! successful acquire flips the datasource back to available.
//!
//! Saturated pools queue acquires (bounded only by the generous acquire
//! timeout) rather than rejecting requests. Each new connection gets the
//! datasource's fixed session character set and time zone pinned before it
//! serves its first statement.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use log::{info, warn};
use serde::Serialize;
use sqlx::mysql::{MySql, MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use sqlx::pool::PoolConnection;
use sqlgate_commons::{DatasourceDef, GatewayError, GatewayResult};

use crate::session;

struct PoolEntry {
    def: DatasourceDef,
    pool: MySqlPool,
    available: AtomicBool,
    /// Whether this datasource supports enumerating user variables for
    /// session cleanup.
    variable_reset: AtomicBool,
    /// Whether the capability probe has run. A datasource unreachable at
    /// startup is probed on its first successful acquire instead, so
    /// recovery never locks in a stale "unsupported" answer.
    reset_probed: AtomicBool,
}

/// One pool per datasource, with acquire/release discipline enforcing
/// exclusive connection ownership for a task's duration.
pub struct PoolManager {
    entries: HashMap<String, PoolEntry>,
}

/// Point-in-time pool health for the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct PoolStatus {
    pub id: String,
    pub available: bool,
    pub connections: u32,
    pub idle: usize,
    pub max_connections: u32,
    pub session_reset_supported: bool,
    /// False while the capability probe is still pending (datasource was
    /// unreachable at startup and has not been acquired since)
    pub session_reset_probed: bool,
}

impl PoolManager {
    /// Create one pool per datasource and probe each once.
    ///
    /// Never fails: a probe error degrades only the routes bound to that
    /// datasource.
    pub async fn initialize(datasources: &[DatasourceDef]) -> Self {
        let mut entries = HashMap::new();

        for def in datasources {
            let pool = build_pool(def);
            let entry = PoolEntry {
                def: def.clone(),
                pool,
                available: AtomicBool::new(false),
                variable_reset: AtomicBool::new(false),
                reset_probed: AtomicBool::new(false),
            };

            match entry.pool.acquire().await {
                Ok(mut conn) => {
                    entry.available.store(true, Ordering::Relaxed);
                    let reset = session::probe_reset_support(&mut conn).await;
                    entry.variable_reset.store(reset, Ordering::Relaxed);
                    entry.reset_probed.store(true, Ordering::Relaxed);
                    info!(
                        "datasource '{}' reachable at {}:{} (session variable reset: {})",
                        def.id,
                        def.host,
                        def.port,
                        if reset { "supported" } else { "unsupported, isolation degraded" }
                    );
                }
                Err(e) => {
                    warn!(
                        "datasource '{}' unreachable at startup ({}); routes bound to it will fail until it recovers",
                        def.id, e
                    );
                }
            }

            entries.insert(def.id.clone(), entry);
        }

        Self { entries }
    }

    /// Acquire a connection, queueing while the pool is saturated.
    ///
    /// A datasource that was down at startup is retried here; success marks
    /// it available again.
    pub async fn acquire(&self, datasource_id: &str) -> GatewayResult<PoolConnection<MySql>> {
        let entry = self.entries.get(datasource_id).ok_or_else(|| {
            GatewayError::DatasourceUnavailable(datasource_id.to_string())
        })?;

        match entry.pool.acquire().await {
            Ok(mut conn) => {
                if !entry.available.swap(true, Ordering::Relaxed) {
                    info!("datasource '{}' is reachable again", datasource_id);
                }
                // A startup probe skipped because the datasource was down
                // completes here, on the first connection that works.
                if !entry.reset_probed.load(Ordering::Relaxed) {
                    let reset = session::probe_reset_support(&mut conn).await;
                    entry.variable_reset.store(reset, Ordering::Relaxed);
                    entry.reset_probed.store(true, Ordering::Relaxed);
                    info!(
                        "datasource '{}' session variable reset: {}",
                        datasource_id,
                        if reset { "supported" } else { "unsupported, isolation degraded" }
                    );
                }
                Ok(conn)
            }
            Err(e) => {
                entry.available.store(false, Ordering::Relaxed);
                warn!("failed to acquire connection for datasource '{}': {}", datasource_id, e);
                Err(GatewayError::DatasourceUnavailable(datasource_id.to_string()))
            }
        }
    }

    /// Whether session-variable cleanup is supported for this datasource.
    pub fn supports_variable_reset(&self, datasource_id: &str) -> bool {
        self.entries
            .get(datasource_id)
            .map(|e| e.variable_reset.load(Ordering::Relaxed))
            .unwrap_or(false)
    }

    /// Per-datasource pool health.
    pub fn status(&self) -> Vec<PoolStatus> {
        let mut statuses: Vec<PoolStatus> = self
            .entries
            .values()
            .map(|e| PoolStatus {
                id: e.def.id.clone(),
                available: e.available.load(Ordering::Relaxed),
                connections: e.pool.size(),
                idle: e.pool.num_idle(),
                max_connections: e.def.max_connections,
                session_reset_supported: e.variable_reset.load(Ordering::Relaxed),
                session_reset_probed: e.reset_probed.load(Ordering::Relaxed),
            })
            .collect();
        statuses.sort_by(|a, b| a.id.cmp(&b.id));
        statuses
    }

    /// Drain and close all pools. In-flight operations finish before their
    /// connection is closed.
    pub async fn shutdown(&self) {
        for entry in self.entries.values() {
            entry.pool.close().await;
            info!("datasource '{}' pool closed", entry.def.id);
        }
    }
}

fn build_pool(def: &DatasourceDef) -> MySqlPool {
    let options = MySqlConnectOptions::new()
        .host(&def.host)
        .port(def.port)
        .username(&def.username)
        .password(&def.password)
        .database(&def.database)
        .charset(&def.charset);

    let timezone_sql = format!("SET time_zone = '{}'", def.timezone.replace('\'', ""));

    MySqlPoolOptions::new()
        .max_connections(def.max_connections)
        // Establishing a connection is bounded by connect_timeout; waiting
        // for pool capacity is bounded only by the much larger acquire
        // timeout — requests queue, they are not rejected.
        .acquire_timeout(Duration::from_secs(def.acquire_timeout_secs.max(def.connect_timeout_secs)))
        .test_before_acquire(true)
        .after_connect(move |conn, _meta| {
            let timezone_sql = timezone_sql.clone();
            Box::pin(async move {
                sqlx::query(&timezone_sql).execute(&mut *conn).await?;
                Ok(())
            })
        })
        .connect_lazy_with(options)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(id: &str) -> DatasourceDef {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "host": "127.0.0.1",
            "port": 1,
            "username": "nobody",
            "database": "nodb",
            "connect_timeout_secs": 1,
            "acquire_timeout_secs": 1
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_unreachable_datasource_does_not_abort_startup() {
        let manager = PoolManager::initialize(&[def("dead")]).await;
        let status = manager.status();
        assert_eq!(status.len(), 1);
        assert!(!status[0].available);
    }

    #[tokio::test]
    async fn test_skipped_startup_probe_stays_pending() {
        // An unreachable datasource must not record "reset unsupported":
        // the probe is pending and re-runs on the first successful acquire,
        // so a recovered datasource gets real cleanup, not a stale answer.
        let manager = PoolManager::initialize(&[def("dead")]).await;
        let status = manager.status();
        assert!(!status[0].session_reset_probed);
        assert!(!status[0].session_reset_supported);

        // A failed acquire does not conclude the probe either
        let _ = manager.acquire("dead").await;
        assert!(!manager.status()[0].session_reset_probed);
    }

    #[tokio::test]
    async fn test_acquire_unknown_datasource_fails_typed() {
        let manager = PoolManager::initialize(&[]).await;
        let err = manager.acquire("ghost").await.err().expect("acquire should fail");
        match err {
            GatewayError::DatasourceUnavailable(id) => assert_eq!(id, "ghost"),
            other => panic!("expected DatasourceUnavailable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_acquire_unreachable_datasource_fails_typed() {
        let manager = PoolManager::initialize(&[def("dead")]).await;
        let err = manager.acquire("dead").await.err().expect("acquire should fail");
        match err {
            GatewayError::DatasourceUnavailable(id) => assert_eq!(id, "dead"),
            other => panic!("expected DatasourceUnavailable, got {other:?}"),
        }
    }
}
