//! Asynchronous task pipeline: producer, queue transport, worker pool.
//!
//! - **TaskProducer**: persists a `Pending` record, then publishes a message
//! - **TaskQueue**: durable Redis transport with at-least-once delivery
//! - **WorkerPool**: supervised workers with bounded in-process concurrency
//!
//! # Architecture
//!
//! ```text
//!                      ┌──────────────┐
//!                      │   Producer   │
//!                      │  (CLI/API)   │
//!                      └──────┬───────┘
//!                 record ┌────▼────┐ message
//!              ┌─────────┤         ├──────────┐
//!              │         └─────────┘          │
//!       ┌──────▼───────┐              ┌───────▼──────┐
//!       │  PostgreSQL  │              │ Redis queue  │
//!       │  task store  │              └───────┬──────┘
//!       └──────▲───────┘                      │
//!              │          ┌───────────────────┼──────────────────┐
//!              │          ▼                   ▼                  ▼
//!              │     ┌─────────┐         ┌─────────┐        ┌─────────┐
//!              └─────┤ Worker 1│         │ Worker 2│        │ Worker N│
//!       transitions  └─────────┘         └─────────┘        └─────────┘
//! ```
//!
//! Delivery is at-least-once; duplicates are resolved by the store's
//! conditional transitions, never by the transport. A message carries only
//! `{task_id, input_ref}`.

pub mod message;
pub mod producer;
pub mod queue;
pub mod worker_pool;

// Re-export main types for convenience
pub use message::{Delivery, TaskMessage};
pub use producer::{SubmitError, SubmitOutcome, TaskProducer};
pub use queue::{QueueError, QueueStats, TaskQueue};
pub use worker_pool::{PoolError, PoolStats, WorkerPool, WorkerPoolConfig};
