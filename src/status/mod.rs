//! Read-only status queries for polling clients.
//!
//! A thin façade over the task record store: it never mutates and adds no
//! caching layer, so clients always see the latest committed state.

use std::sync::Arc;

use uuid::Uuid;

use crate::storage::{StoreError, TaskRecord, TaskStore};

/// Default number of history entries returned.
pub const DEFAULT_HISTORY_LIMIT: i64 = 50;

/// Read-only query surface over the task record store.
pub struct StatusService {
    store: Arc<TaskStore>,
}

impl StatusService {
    /// Creates a new status service.
    pub fn new(store: Arc<TaskStore>) -> Self {
        Self { store }
    }

    /// Returns the current record for a task.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` for an unknown id, never a default
    /// record.
    pub async fn get_status(&self, task_id: Uuid) -> Result<TaskRecord, StoreError> {
        self.store.get(task_id).await
    }

    /// Returns recent tasks, newest first.
    pub async fn get_history(&self, limit: i64) -> Result<Vec<TaskRecord>, StoreError> {
        self.store.list_recent(limit).await
    }
}
