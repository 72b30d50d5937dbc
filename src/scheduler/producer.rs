//! Task producer: record first, publish second.
//!
//! The producer persists a `Pending` record before the queue message goes
//! out, so a status query never observes "task unknown" for an id it
//! returned. If the publish fails the record deliberately stays `Pending`
//! rather than being rolled back; a visible stalled task beats one that
//! silently vanishes, and an operational sweep can re-publish it.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::storage::{NewTask, StoreError, TaskStore};

use super::message::TaskMessage;
use super::queue::{QueueError, TaskQueue};

/// Errors that can occur while submitting a task.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The task record could not be created; nothing was enqueued.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The record was created but the message could not be published.
    /// The task remains visible in `Pending`.
    #[error("Publish failed for task {task_id}: {source}")]
    Transport {
        task_id: Uuid,
        #[source]
        source: QueueError,
    },
}

/// Outcome of one item in a batch submission.
#[derive(Debug)]
pub struct SubmitOutcome {
    /// The input reference that was submitted.
    pub input_ref: String,
    /// The assigned task id, or the error that prevented submission.
    pub result: Result<Uuid, SubmitError>,
}

/// Accepts units of work and hands them to the queue.
pub struct TaskProducer {
    store: Arc<TaskStore>,
    queue: Arc<TaskQueue>,
}

impl TaskProducer {
    /// Creates a new producer.
    pub fn new(store: Arc<TaskStore>, queue: Arc<TaskQueue>) -> Self {
        Self { store, queue }
    }

    /// Submits a unit of work and returns its task id.
    ///
    /// Creates the `Pending` record, then publishes `{task_id, input_ref}`.
    /// No deduplication by content: submitting the same `input_ref` twice
    /// creates two independent tasks.
    pub async fn submit(&self, task: NewTask) -> Result<Uuid, SubmitError> {
        let input_ref = task.input_ref.clone();
        let task_id = self.store.create(&task).await?;

        let message = TaskMessage::new(task_id, input_ref);
        if let Err(e) = self.queue.publish(&message).await {
            warn!(
                task_id = %task_id,
                error = %e,
                "Task record created but publish failed; record stays pending"
            );
            return Err(SubmitError::Transport {
                task_id,
                source: e,
            });
        }

        info!(task_id = %task_id, "Task submitted");
        Ok(task_id)
    }

    /// Submits several units of work, reporting a per-item outcome.
    ///
    /// One item's failure does not abort the rest of the batch.
    pub async fn submit_batch(&self, tasks: Vec<NewTask>) -> Vec<SubmitOutcome> {
        let mut outcomes = Vec::with_capacity(tasks.len());

        for task in tasks {
            let input_ref = task.input_ref.clone();
            let result = self.submit(task).await;
            outcomes.push(SubmitOutcome { input_ref, result });
        }

        outcomes
    }
}
