//! Shared API state.
//!
//! Explicitly constructed at bootstrap and injected into handlers via
//! `web::Data` — no global singletons. The route table is an immutable
//! snapshot behind an `RwLock`; admin writes persist to the store first,
//! then swap in a freshly compiled table.

use std::sync::{Arc, RwLock};

use sqlgate_core::TaskEngine;

use crate::router::RouteTable;
use crate::store::RouteStore;

pub struct ApiState {
    pub engine: Arc<TaskEngine>,
    pub store: Arc<RouteStore>,
    table: RwLock<Arc<RouteTable>>,
}

impl ApiState {
    /// Compile the store's current routes into the initial table.
    pub fn new(engine: Arc<TaskEngine>, store: Arc<RouteStore>) -> Result<Self, String> {
        let table = RouteTable::build(&store.list())?;
        Ok(Self { engine, store, table: RwLock::new(Arc::new(table)) })
    }

    /// Current table snapshot.
    pub fn table(&self) -> Arc<RouteTable> {
        self.table.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Recompile the table from the store and swap it in.
    pub fn rebuild_table(&self) -> Result<(), String> {
        let table = RouteTable::build(&self.store.list())?;
        *self.table.write().unwrap_or_else(|e| e.into_inner()) = Arc::new(table);
        Ok(())
    }
}
