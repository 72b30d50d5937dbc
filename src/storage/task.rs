//! Task record types for the pipeline.
//!
//! This module defines the persistent view of a unit of OCR work:
//!
//! - `TaskStatus`: the forward-only task state machine
//! - `TaskRecord`: the stored task with its result or error
//! - `NewTask`: the fields a producer supplies at creation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of a task in the pipeline.
///
/// Transitions only move forward along
/// `Pending -> Processing -> {Done, Failed}`; `Done` and `Failed` are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created and queued, not yet claimed by a worker.
    Pending,
    /// Claimed by a worker; recognition in flight.
    Processing,
    /// Recognition succeeded; `result` is set.
    Done,
    /// Recognition failed after exhausting retries; `error` is set.
    Failed,
}

impl TaskStatus {
    /// Returns the stable string form used in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Processing => "processing",
            TaskStatus::Done => "done",
            TaskStatus::Failed => "failed",
        }
    }

    /// Parses the database string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TaskStatus::Pending),
            "processing" => Some(TaskStatus::Processing),
            "done" => Some(TaskStatus::Done),
            "failed" => Some(TaskStatus::Failed),
            _ => None,
        }
    }

    /// Returns whether this status admits no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Failed)
    }

    /// Returns whether a transition from `self` to `next` is allowed.
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (TaskStatus::Pending, TaskStatus::Processing)
                | (TaskStatus::Processing, TaskStatus::Done)
                | (TaskStatus::Processing, TaskStatus::Failed)
        )
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields supplied when creating a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTask {
    /// Opaque handle to the uploaded artifact (a path the upload store owns).
    pub input_ref: String,
    /// Original client-supplied filename, kept for history display.
    pub original_filename: Option<String>,
}

impl NewTask {
    /// Creates a new task description for the given input reference.
    pub fn new(input_ref: impl Into<String>) -> Self {
        Self {
            input_ref: input_ref.into(),
            original_filename: None,
        }
    }

    /// Sets the original filename.
    pub fn with_original_filename(mut self, name: impl Into<String>) -> Self {
        self.original_filename = Some(name.into());
        self
    }
}

/// A stored task record.
///
/// Exactly one record exists per id. `result` and `error` are mutually
/// exclusive and only set on the terminal transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Unique identifier, assigned at creation.
    pub id: Uuid,
    /// Current status.
    pub status: TaskStatus,
    /// Opaque handle to the uploaded artifact.
    pub input_ref: String,
    /// Original client-supplied filename, if known.
    pub original_filename: Option<String>,
    /// Recognized text; present iff `status == Done`.
    pub result: Option<String>,
    /// Failure description; present iff `status == Failed`.
    pub error: Option<String>,
    /// Number of processing attempts so far.
    pub attempts: i32,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// Advances on every status transition.
    pub updated_at: DateTime<Utc>,
}

impl TaskRecord {
    /// Returns whether the task has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        for status in [
            TaskStatus::Pending,
            TaskStatus::Processing,
            TaskStatus::Done,
            TaskStatus::Failed,
        ] {
            assert_eq!(TaskStatus::parse(status.as_str()), Some(status));
        }

        assert_eq!(TaskStatus::parse("queued"), None);
        assert_eq!(TaskStatus::parse(""), None);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(format!("{}", TaskStatus::Pending), "pending");
        assert_eq!(format!("{}", TaskStatus::Processing), "processing");
        assert_eq!(format!("{}", TaskStatus::Done), "done");
        assert_eq!(format!("{}", TaskStatus::Failed), "failed");
    }

    #[test]
    fn test_forward_only_transitions() {
        use TaskStatus::*;

        assert!(Pending.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Done));
        assert!(Processing.can_transition_to(Failed));

        // No regressions, no skipping, no leaving terminal states.
        assert!(!Pending.can_transition_to(Done));
        assert!(!Pending.can_transition_to(Failed));
        assert!(!Processing.can_transition_to(Pending));
        assert!(!Done.can_transition_to(Processing));
        assert!(!Done.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Done));
        assert!(!Failed.can_transition_to(Pending));
    }

    #[test]
    fn test_terminal_states() {
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::Processing.is_terminal());
        assert!(TaskStatus::Done.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
    }

    #[test]
    fn test_new_task_builder() {
        let task = NewTask::new("uploads/abc.png").with_original_filename("invoice.png");

        assert_eq!(task.input_ref, "uploads/abc.png");
        assert_eq!(task.original_filename, Some("invoice.png".to_string()));
    }

    #[test]
    fn test_status_serde_snake_case() {
        let json = serde_json::to_string(&TaskStatus::Processing).expect("serialize");
        assert_eq!(json, "\"processing\"");

        let parsed: TaskStatus = serde_json::from_str("\"failed\"").expect("deserialize");
        assert_eq!(parsed, TaskStatus::Failed);
    }
}
