//! Datasource definition.
//!
//! Built once from configuration at process start; immutable for the
//! process lifetime. Each definition owns exactly one live pool.

use serde::{Deserialize, Serialize};

/// Connection parameters and pool sizing for one logical datasource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasourceDef {
    /// Stable identifier referenced by tasks (`TaskDef::datasource`)
    pub id: String,
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub database: String,

    /// Upper bound on open connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Seconds to wait when establishing a new connection
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Seconds a saturated pool may queue an acquire before giving up.
    /// Requests are queued, never rejected outright; this bound only
    /// protects against a wedged pool.
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,

    /// Session character set pinned on every new connection
    #[serde(default = "default_charset")]
    pub charset: String,

    /// Session time zone pinned on every new connection
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_port() -> u16 {
    3306
}

fn default_max_connections() -> u32 {
    10
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_acquire_timeout() -> u64 {
    600
}

fn default_charset() -> String {
    "utf8mb4".to_string()
}

fn default_timezone() -> String {
    "+00:00".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied_on_deserialize() {
        let ds: DatasourceDef = serde_json::from_str(
            r#"{"id":"main","host":"localhost","username":"app","database":"appdb"}"#,
        )
        .unwrap();
        assert_eq!(ds.port, 3306);
        assert_eq!(ds.max_connections, 10);
        assert_eq!(ds.charset, "utf8mb4");
        assert_eq!(ds.timezone, "+00:00");
        assert_eq!(ds.password, "");
    }
}
