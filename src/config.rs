// Configuration module
use serde::{Deserialize, Serialize};
use sqlgate_commons::DatasourceDef;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub cors: CorsSettings,
    #[serde(default)]
    pub performance: PerformanceSettings,
    /// MySQL datasources routes can target. At least one is required.
    #[serde(default)]
    pub datasources: Vec<DatasourceDef>,
}

/// Server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// 0 means one worker per CPU core
    #[serde(default)]
    pub workers: usize,
    /// Path of the route definition document
    #[serde(default = "default_routes_path")]
    pub routes_path: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: 0,
            routes_path: default_routes_path(),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_file")]
    pub file_path: String,
    #[serde(default = "default_true")]
    pub log_to_console: bool,
    /// "compact" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Per-target level overrides, e.g. `sqlx = "debug"`
    #[serde(default)]
    pub targets: HashMap<String, String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_path: default_log_file(),
            log_to_console: true,
            format: default_log_format(),
            targets: HashMap::new(),
        }
    }
}

/// CORS settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsSettings {
    /// Empty or containing "*" allows any origin
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    #[serde(default = "default_cors_methods")]
    pub allowed_methods: Vec<String>,
    /// Empty or containing "*" allows any header
    #[serde(default)]
    pub allowed_headers: Vec<String>,
    #[serde(default)]
    pub allow_credentials: bool,
    #[serde(default = "default_cors_max_age")]
    pub max_age: u32,
}

impl Default for CorsSettings {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            allowed_methods: default_cors_methods(),
            allowed_headers: Vec::new(),
            allow_credentials: false,
            max_age: default_cors_max_age(),
        }
    }
}

/// Performance settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceSettings {
    #[serde(default = "default_keepalive_timeout")]
    pub keepalive_timeout: u64,
    #[serde(default = "default_client_request_timeout")]
    pub client_request_timeout: u64,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

impl Default for PerformanceSettings {
    fn default() -> Self {
        Self {
            keepalive_timeout: default_keepalive_timeout(),
            client_request_timeout: default_client_request_timeout(),
            max_connections: default_max_connections(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_routes_path() -> String {
    "routes.json".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/server.log".to_string()
}

fn default_log_format() -> String {
    "compact".to_string()
}

fn default_true() -> bool {
    true
}

fn default_cors_methods() -> Vec<String> {
    ["GET", "POST", "PUT", "DELETE", "OPTIONS"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_cors_max_age() -> u32 {
    3600
}

fn default_keepalive_timeout() -> u64 {
    75
}

fn default_client_request_timeout() -> u64 {
    60
}

fn default_max_connections() -> usize {
    25_000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            logging: LoggingSettings::default(),
            cors: CorsSettings::default(),
            performance: PerformanceSettings::default(),
            datasources: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;

        let mut config: ServerConfig = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file: {}", e))?;

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides for deployment-time settings.
    ///
    /// Supported environment variables:
    /// - SQLGATE_SERVER_HOST: Override server.host
    /// - SQLGATE_SERVER_PORT: Override server.port
    /// - SQLGATE_ROUTES_PATH: Override server.routes_path
    /// - SQLGATE_LOG_LEVEL: Override logging.level
    /// - SQLGATE_LOG_FILE: Override logging.file_path
    /// - SQLGATE_LOG_TO_CONSOLE: Override logging.log_to_console
    ///
    /// Environment variables take precedence over config.toml values.
    fn apply_env_overrides(&mut self) -> anyhow::Result<()> {
        use std::env;

        if let Ok(host) = env::var("SQLGATE_SERVER_HOST") {
            self.server.host = host;
        }

        if let Ok(port_str) = env::var("SQLGATE_SERVER_PORT") {
            self.server.port = port_str
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid SQLGATE_SERVER_PORT value: {}", port_str))?;
        }

        if let Ok(path) = env::var("SQLGATE_ROUTES_PATH") {
            self.server.routes_path = path;
        }

        if let Ok(level) = env::var("SQLGATE_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Ok(path) = env::var("SQLGATE_LOG_FILE") {
            self.logging.file_path = path;
        }

        if let Ok(flag) = env::var("SQLGATE_LOG_TO_CONSOLE") {
            self.logging.log_to_console = matches!(flag.as_str(), "1" | "true" | "yes");
        }

        Ok(())
    }

    /// Reject configurations that cannot possibly serve requests.
    fn validate(&self) -> anyhow::Result<()> {
        if self.datasources.is_empty() {
            anyhow::bail!("configuration declares no [[datasources]]");
        }

        let mut seen = std::collections::HashSet::new();
        for ds in &self.datasources {
            if ds.id.is_empty() {
                anyhow::bail!("datasource with empty id");
            }
            if !seen.insert(&ds.id) {
                anyhow::bail!("duplicate datasource id '{}'", ds.id);
            }
            if ds.host.is_empty() {
                anyhow::bail!("datasource '{}' has empty host", ds.id);
            }
            if ds.max_connections == 0 {
                anyhow::bail!("datasource '{}' allows zero connections", ds.id);
            }
        }

        if self.server.routes_path.is_empty() {
            anyhow::bail!("server.routes_path is empty");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_toml() -> &'static str {
        r#"
            [server]
            host = "0.0.0.0"
            port = 9090

            [[datasources]]
            id = "main"
            host = "db.internal"
            username = "gateway"
            password = "secret"
            database = "app"
        "#
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: ServerConfig = toml::from_str(minimal_toml()).unwrap();
        config.validate().unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.routes_path, "routes.json");
        assert_eq!(config.datasources.len(), 1);
        // Datasource defaults fill in
        assert_eq!(config.datasources[0].port, 3306);
        assert_eq!(config.datasources[0].max_connections, 10);
        // Ambient defaults
        assert_eq!(config.logging.level, "info");
        assert!(config.cors.allowed_origins.is_empty());
    }

    #[test]
    fn test_no_datasources_rejected() {
        let config: ServerConfig = toml::from_str("[server]\nport = 1").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_datasource_rejected() {
        let toml = r#"
            [[datasources]]
            id = "a"
            host = "h"
            username = "u"
            password = "p"
            database = "d"

            [[datasources]]
            id = "a"
            host = "h"
            username = "u"
            password = "p"
            database = "d"
        "#;
        let config: ServerConfig = toml::from_str(toml).unwrap();
        assert!(config.validate().is_err());
    }
}
