//! PostgreSQL persistent task storage.
//!
//! The task record store is the pipeline's only shared mutable state. All
//! coordination between producers and workers funnels through its
//! conditional status updates:
//!
//! - **TaskStore**: PostgreSQL client with conditional transitions
//! - **TaskRecord** / **TaskStatus**: the stored task and its state machine
//! - **Migrations**: idempotent schema management
//!
//! ```rust,ignore
//! use fastocr::storage::{NewTask, TaskStore};
//!
//! let store = TaskStore::connect("postgres://localhost/fastocr").await?;
//! store.run_migrations().await?;
//!
//! let id = store.create(&NewTask::new("uploads/scan.png")).await?;
//! store.mark_processing(id).await?;
//! store.complete(id, "recognized text").await?;
//!
//! let record = store.get(id).await?;
//! assert!(record.is_terminal());
//! ```

pub mod database;
pub mod migrations;
pub mod schema;
pub mod task;

// Re-export main types for convenience
pub use database::{StoreError, TaskStore};
pub use migrations::{AppliedMigration, MigrationError, MigrationRunner};
pub use task::{NewTask, TaskRecord, TaskStatus};
