//! Route, task, statement, and parameter declaration models.
//!
//! These are the declarative values the engine executes. They are read from
//! the route document store per request (cached in the route table), and are
//! immutable during a single invocation — edits go through the admin CRUD
//! endpoints, never through the execution engine.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Declared type of a route parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Number,
    Boolean,
    Array,
}

/// One declared parameter of a route.
///
/// Names are unique within a route. Optional parameters may carry a default
/// that is substituted when the request supplies no value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamDecl {
    pub name: String,
    #[serde(default)]
    pub required: bool,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<JsonValue>,
}

/// One SQL statement inside a task.
///
/// The id is stable within its task so administrative callers can edit or
/// remove just this statement. The template may contain zero or more
/// `:name` placeholders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementEntry {
    pub id: String,
    pub sql: String,
}

/// One execution unit: a datasource, an ordered statement list, and a
/// transaction flag.
///
/// With `transaction = true` the statements run atomically; with `false`
/// they still run sequentially on one connection (connection affinity, so
/// session-scoped variables set by an earlier statement are visible to a
/// later one), but without a wrapping transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDef {
    pub datasource: String,
    pub statements: Vec<StatementEntry>,
    #[serde(default)]
    pub transaction: bool,
}

impl TaskDef {
    /// Find a statement by its stable id.
    pub fn statement(&self, id: &str) -> Option<&StatementEntry> {
        self.statements.iter().find(|s| s.id == id)
    }
}

/// One HTTP endpoint definition: path, method, declared parameters, and the
/// task(s) to execute. In the common case a route declares exactly one task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteDef {
    pub id: String,
    /// Request path relative to the dynamic scope, e.g. `/users/{id}`
    pub path: String,
    /// HTTP method name, upper-case ("GET", "POST", ...)
    pub method: String,
    #[serde(default = "default_content_type")]
    pub content_type: String,
    #[serde(default)]
    pub params: Vec<ParamDecl>,
    pub tasks: Vec<TaskDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

fn default_content_type() -> String {
    "application/json".to_string()
}

impl RouteDef {
    /// Validate structural invariants: at least one task, parameter names
    /// unique, statement ids unique within each task.
    pub fn check(&self) -> Result<(), String> {
        if self.tasks.is_empty() {
            return Err(format!("route '{}' declares no tasks", self.id));
        }
        let mut seen = std::collections::HashSet::new();
        for p in &self.params {
            if !seen.insert(p.name.as_str()) {
                return Err(format!("route '{}' declares parameter '{}' twice", self.id, p.name));
            }
        }
        for (idx, task) in self.tasks.iter().enumerate() {
            if task.statements.is_empty() {
                return Err(format!("route '{}' task #{} has no statements", self.id, idx));
            }
            let mut ids = std::collections::HashSet::new();
            for s in &task.statements {
                if !ids.insert(s.id.as_str()) {
                    return Err(format!(
                        "route '{}' task #{} repeats statement id '{}'",
                        self.id, idx, s.id
                    ));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_route() -> RouteDef {
        serde_json::from_value(json!({
            "id": "get-user",
            "path": "/users/{id}",
            "method": "GET",
            "params": [
                {"name": "id", "required": true, "type": "number"}
            ],
            "tasks": [
                {
                    "datasource": "main",
                    "statements": [
                        {"id": "s1", "sql": "SELECT * FROM users WHERE id = :id"}
                    ]
                }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_route_deserializes_with_defaults() {
        let route = sample_route();
        assert_eq!(route.content_type, "application/json");
        assert!(!route.tasks[0].transaction);
        assert!(route.check().is_ok());
    }

    #[test]
    fn test_check_rejects_duplicate_param_names() {
        let mut route = sample_route();
        route.params.push(ParamDecl {
            name: "id".into(),
            required: false,
            param_type: ParamType::String,
            default: None,
        });
        assert!(route.check().unwrap_err().contains("twice"));
    }

    #[test]
    fn test_check_rejects_duplicate_statement_ids() {
        let mut route = sample_route();
        let dup = route.tasks[0].statements[0].clone();
        route.tasks[0].statements.push(dup);
        assert!(route.check().unwrap_err().contains("repeats"));
    }

    #[test]
    fn test_statement_lookup_by_id() {
        let route = sample_route();
        assert!(route.tasks[0].statement("s1").is_some());
        assert!(route.tasks[0].statement("nope").is_none());
    }
}
