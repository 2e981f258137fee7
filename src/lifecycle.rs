//! Server lifecycle management helpers.
//!
//! This module encapsulates the heavy lifting previously handled directly
//! in `main.rs`: building connection pools, loading the route document,
//! wiring the HTTP server, and coordinating graceful shutdown.

use std::sync::Arc;
use std::time::Duration;

use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use log::{info, warn};
use sqlgate_api::ApiState;
use sqlgate_core::{PoolManager, TaskEngine};

use crate::config::ServerConfig;
use crate::middleware;

/// Build the application state: one pool per configured datasource, the
/// route document, and the compiled dispatch table.
///
/// Unreachable datasources do not abort startup — their pools come up
/// degraded and recover on a later acquire. A route document that fails to
/// parse or compile is fatal: serving with a partial route table would
/// silently 404 declared endpoints.
pub async fn bootstrap(config: &ServerConfig) -> Result<Arc<ApiState>> {
    info!(
        "Initializing {} datasource pool(s)",
        config.datasources.len()
    );
    let pools = PoolManager::initialize(&config.datasources).await;

    for status in pools.status() {
        if status.available {
            info!(
                "Datasource '{}' ready (max {} connections, session reset {})",
                status.id,
                status.max_connections,
                if status.session_reset_supported { "supported" } else { "unsupported" }
            );
        } else {
            warn!("Datasource '{}' unreachable at startup", status.id);
        }
    }

    let engine = Arc::new(TaskEngine::new(Arc::new(pools)));

    let store = sqlgate_api::RouteStore::load(&config.server.routes_path)
        .with_context(|| format!("loading route document '{}'", config.server.routes_path))?;
    info!(
        "Loaded {} route definition(s) from {}",
        store.list().len(),
        config.server.routes_path
    );

    let state = ApiState::new(engine, Arc::new(store))
        .map_err(|e| anyhow::anyhow!("route table compilation failed: {}", e))?;

    Ok(Arc::new(state))
}

/// Run the HTTP server until SIGINT, then drain in-flight requests and
/// close every pool.
pub async fn run(config: &ServerConfig, state: Arc<ApiState>) -> Result<()> {
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let workers = if config.server.workers == 0 {
        num_cpus::get()
    } else {
        config.server.workers
    };

    info!("Starting HTTP server on {}", bind_addr);
    info!(
        "Server config: workers={}, max_connections={}, keepalive={}s",
        workers, config.performance.max_connections, config.performance.keepalive_timeout
    );

    let cors_settings = config.cors.clone();
    let app_state = state.clone();

    let server = HttpServer::new(move || {
        App::new()
            .wrap(middleware::request_logger())
            .wrap(middleware::build_cors_from_config(&cors_settings))
            .app_data(web::Data::new(app_state.clone()))
            .configure(sqlgate_api::configure_routes)
    })
    .workers(workers)
    .max_connections(config.performance.max_connections)
    .keep_alive(Duration::from_secs(config.performance.keepalive_timeout))
    .client_request_timeout(Duration::from_secs(config.performance.client_request_timeout))
    .bind(&bind_addr)
    .with_context(|| format!("binding {}", bind_addr))?
    .run();

    let handle = server.handle();

    tokio::select! {
        result = server => {
            result.context("HTTP server terminated")?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received, draining connections");
            // true = graceful: wait for workers to finish in-flight requests
            handle.stop(true).await;
        }
    }

    state.engine.pools().shutdown().await;
    info!("Shutdown complete");
    Ok(())
}
