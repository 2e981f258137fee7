// sqlgate server entrypoint
//!
//! The heavy lifting (pool initialization, middleware wiring, graceful
//! shutdown) lives in dedicated modules so this file remains a thin
//! orchestrator.

use anyhow::Result;
use log::info;
use sqlgate_server::config::ServerConfig;
use sqlgate_server::lifecycle::{bootstrap, run};
use sqlgate_server::logging;
use std::env;

#[actix_web::main]
async fn main() -> Result<()> {
    let config_path = env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
    let config = match ServerConfig::from_file(&config_path) {
        Ok(cfg) => {
            eprintln!(
                "Loaded config from: {}",
                std::fs::canonicalize(&config_path)
                    .unwrap_or_else(|_| std::path::PathBuf::from(&config_path))
                    .display()
            );
            cfg
        }
        Err(e) => {
            eprintln!("FATAL: failed to load {}: {}", config_path, e);
            eprintln!("Server cannot start without valid configuration");
            std::process::exit(1);
        }
    };

    // Logging before any other side effects
    logging::init_logging(
        &config.logging.level,
        &config.logging.file_path,
        config.logging.log_to_console,
        Some(&config.logging.targets),
        &config.logging.format,
    )?;

    info!(
        "sqlgate v{} (commit {}, branch {}, built {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_COMMIT_HASH"),
        env!("GIT_BRANCH"),
        env!("BUILD_DATE")
    );
    info!("Host: {}  Port: {}", config.server.host, config.server.port);

    // Build application state: pools, route document, dispatch table
    let state = bootstrap(&config).await?;

    // Run HTTP server until termination signal is received
    run(&config, state).await
}
