//! Route document store.
//!
//! Route definitions persist as one JSON document on disk. The execution
//! engine never writes here — all edits arrive through the admin CRUD
//! handlers, which persist first and then swap the in-memory route table.
//!
//! Writes go through a temp-file-plus-rename so a crash mid-write cannot
//! truncate the document.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use sqlgate_commons::RouteDef;
use thiserror::Error;

/// Errors from route document operations.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("route '{0}' not found")]
    NotFound(String),

    #[error("route '{0}' already exists")]
    Conflict(String),

    #[error("invalid route definition: {0}")]
    Invalid(String),

    #[error("route document I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("route document parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// On-disk document shape.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RouteDocument {
    routes: Vec<RouteDef>,
}

/// File-backed route definition store.
pub struct RouteStore {
    path: PathBuf,
    routes: RwLock<Vec<RouteDef>>,
}

impl RouteStore {
    /// Load the document at `path`. A missing file is an empty store; the
    /// document is created on first write.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let routes = if path.exists() {
            let text = fs::read_to_string(&path)?;
            let doc: RouteDocument = serde_json::from_str(&text)?;
            for route in &doc.routes {
                route.check().map_err(StoreError::Invalid)?;
            }
            doc.routes
        } else {
            Vec::new()
        };
        Ok(Self { path, routes: RwLock::new(routes) })
    }

    pub fn list(&self) -> Vec<RouteDef> {
        self.read().clone()
    }

    pub fn get(&self, id: &str) -> Option<RouteDef> {
        self.read().iter().find(|r| r.id == id).cloned()
    }

    pub fn create(&self, route: RouteDef) -> Result<(), StoreError> {
        route.check().map_err(StoreError::Invalid)?;
        let mut routes = self.write();
        if routes.iter().any(|r| r.id == route.id) {
            return Err(StoreError::Conflict(route.id));
        }
        // Mutate a copy and persist it before committing to memory, so a
        // failed write leaves memory and disk agreeing.
        let mut next = routes.clone();
        next.push(route);
        self.persist(&next)?;
        *routes = next;
        Ok(())
    }

    pub fn update(&self, id: &str, route: RouteDef) -> Result<(), StoreError> {
        route.check().map_err(StoreError::Invalid)?;
        let mut routes = self.write();
        let mut next = routes.clone();
        let slot = next
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        *slot = route;
        self.persist(&next)?;
        *routes = next;
        Ok(())
    }

    pub fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut routes = self.write();
        let mut next = routes.clone();
        let before = next.len();
        next.retain(|r| r.id != id);
        if next.len() == before {
            return Err(StoreError::NotFound(id.to_string()));
        }
        self.persist(&next)?;
        *routes = next;
        Ok(())
    }

    /// Replace the SQL of one statement, addressed by its stable id within
    /// the route's tasks.
    pub fn update_statement(
        &self,
        route_id: &str,
        statement_id: &str,
        sql: String,
    ) -> Result<(), StoreError> {
        let mut routes = self.write();
        let mut next = routes.clone();
        let route = next
            .iter_mut()
            .find(|r| r.id == route_id)
            .ok_or_else(|| StoreError::NotFound(route_id.to_string()))?;
        let statement = route
            .tasks
            .iter_mut()
            .flat_map(|t| t.statements.iter_mut())
            .find(|s| s.id == statement_id)
            .ok_or_else(|| StoreError::NotFound(format!("{route_id}/{statement_id}")))?;
        statement.sql = sql;
        self.persist(&next)?;
        *routes = next;
        Ok(())
    }

    /// Remove one statement. Removing a task's last statement is rejected —
    /// a task with no statements is not executable.
    pub fn delete_statement(&self, route_id: &str, statement_id: &str) -> Result<(), StoreError> {
        let mut routes = self.write();
        let mut next = routes.clone();
        let route = next
            .iter_mut()
            .find(|r| r.id == route_id)
            .ok_or_else(|| StoreError::NotFound(route_id.to_string()))?;

        let task = route
            .tasks
            .iter_mut()
            .find(|t| t.statements.iter().any(|s| s.id == statement_id))
            .ok_or_else(|| StoreError::NotFound(format!("{route_id}/{statement_id}")))?;

        if task.statements.len() == 1 {
            return Err(StoreError::Invalid(format!(
                "cannot remove the last statement of a task in route '{route_id}'"
            )));
        }
        task.statements.retain(|s| s.id != statement_id);
        self.persist(&next)?;
        *routes = next;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, routes: &[RouteDef]) -> Result<(), StoreError> {
        let doc = RouteDocument { routes: routes.to_vec() };
        let text = serde_json::to_string_pretty(&doc)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<RouteDef>> {
        self.routes.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<RouteDef>> {
        self.routes.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn route(id: &str) -> RouteDef {
        serde_json::from_value(json!({
            "id": id,
            "path": format!("/{id}"),
            "method": "GET",
            "tasks": [{
                "datasource": "main",
                "statements": [
                    {"id": "s1", "sql": "SELECT 1"},
                    {"id": "s2", "sql": "SELECT 2"}
                ]
            }]
        }))
        .unwrap()
    }

    #[test]
    fn test_missing_file_is_empty_store() {
        let dir = tempdir().unwrap();
        let store = RouteStore::load(dir.path().join("routes.json")).unwrap();
        assert!(store.list().is_empty());
    }

    #[test]
    fn test_crud_round_trip_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("routes.json");

        let store = RouteStore::load(&path).unwrap();
        store.create(route("a")).unwrap();
        store.create(route("b")).unwrap();
        assert_eq!(store.list().len(), 2);

        // Reload from disk, the document survived
        let reloaded = RouteStore::load(&path).unwrap();
        assert_eq!(reloaded.list().len(), 2);
        assert!(reloaded.get("a").is_some());

        reloaded.delete("a").unwrap();
        assert!(reloaded.get("a").is_none());
        let again = RouteStore::load(&path).unwrap();
        assert_eq!(again.list().len(), 1);
    }

    #[test]
    fn test_duplicate_create_conflicts() {
        let dir = tempdir().unwrap();
        let store = RouteStore::load(dir.path().join("routes.json")).unwrap();
        store.create(route("a")).unwrap();
        assert!(matches!(store.create(route("a")), Err(StoreError::Conflict(_))));
    }

    #[test]
    fn test_update_missing_route_not_found() {
        let dir = tempdir().unwrap();
        let store = RouteStore::load(dir.path().join("routes.json")).unwrap();
        assert!(matches!(store.update("ghost", route("ghost")), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_statement_update_by_stable_id() {
        let dir = tempdir().unwrap();
        let store = RouteStore::load(dir.path().join("routes.json")).unwrap();
        store.create(route("a")).unwrap();

        store.update_statement("a", "s2", "SELECT 99".to_string()).unwrap();
        let updated = store.get("a").unwrap();
        assert_eq!(updated.tasks[0].statement("s2").unwrap().sql, "SELECT 99");
        // s1 untouched
        assert_eq!(updated.tasks[0].statement("s1").unwrap().sql, "SELECT 1");
    }

    #[test]
    fn test_statement_delete_keeps_task_nonempty() {
        let dir = tempdir().unwrap();
        let store = RouteStore::load(dir.path().join("routes.json")).unwrap();
        store.create(route("a")).unwrap();

        store.delete_statement("a", "s1").unwrap();
        assert_eq!(store.get("a").unwrap().tasks[0].statements.len(), 1);

        // Last statement cannot be removed
        assert!(matches!(
            store.delete_statement("a", "s2"),
            Err(StoreError::Invalid(_))
        ));
    }

    #[test]
    fn test_failed_persist_leaves_store_unchanged() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("routes.json");
        let store = RouteStore::load(&path).unwrap();

        // A directory squatting on the temp path makes the write fail
        fs::create_dir(dir.path().join("routes.json.tmp")).unwrap();

        assert!(matches!(store.create(route("a")), Err(StoreError::Io(_))));
        // Memory agrees with disk: no phantom route
        assert!(store.get("a").is_none());
        assert!(store.list().is_empty());
        assert!(RouteStore::load(&path).unwrap().list().is_empty());

        // Once the write path is clear again the same create succeeds
        fs::remove_dir(dir.path().join("routes.json.tmp")).unwrap();
        store.create(route("a")).unwrap();
        assert!(store.get("a").is_some());
        assert_eq!(RouteStore::load(&path).unwrap().list().len(), 1);
    }

    #[test]
    fn test_invalid_route_rejected_on_create() {
        let dir = tempdir().unwrap();
        let store = RouteStore::load(dir.path().join("routes.json")).unwrap();
        let mut bad = route("bad");
        bad.tasks.clear();
        assert!(matches!(store.create(bad), Err(StoreError::Invalid(_))));
    }
}
