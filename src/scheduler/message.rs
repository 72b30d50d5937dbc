//! Queue message types.
//!
//! The wire payload is deliberately minimal: a task id plus the opaque
//! input reference. Image bytes never travel through the transport.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Payload published for each task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskMessage {
    /// Id of the task record created before publication.
    pub task_id: Uuid,
    /// Opaque handle to the uploaded artifact.
    pub input_ref: String,
}

impl TaskMessage {
    /// Creates a message for the given task.
    pub fn new(task_id: Uuid, input_ref: impl Into<String>) -> Self {
        Self {
            task_id,
            input_ref: input_ref.into(),
        }
    }
}

/// A message delivered to a worker.
///
/// Keeps the raw serialized payload alongside the parsed message so that
/// acknowledgment can remove the exact processing-list entry this delivery
/// came from.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// The parsed message.
    pub message: TaskMessage,
    /// The serialized payload as it sits in the processing list.
    pub raw: String,
}

impl Delivery {
    /// Returns the task id carried by this delivery.
    pub fn task_id(&self) -> Uuid {
        self.message.task_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_roundtrip() {
        let message = TaskMessage::new(Uuid::new_v4(), "uploads/page.png");

        let json = serde_json::to_string(&message).expect("serialize");
        let parsed: TaskMessage = serde_json::from_str(&json).expect("deserialize");

        assert_eq!(parsed, message);
    }

    #[test]
    fn test_message_carries_no_payload_fields() {
        let message = TaskMessage::new(Uuid::new_v4(), "uploads/page.png");
        let value = serde_json::to_value(&message).expect("serialize");
        let object = value.as_object().expect("object");

        // The transport never carries recognition payloads or image bytes.
        assert_eq!(object.len(), 2);
        assert!(object.contains_key("task_id"));
        assert!(object.contains_key("input_ref"));
    }

    #[test]
    fn test_delivery_task_id() {
        let id = Uuid::new_v4();
        let message = TaskMessage::new(id, "uploads/page.png");
        let delivery = Delivery {
            raw: serde_json::to_string(&message).expect("serialize"),
            message,
        };

        assert_eq!(delivery.task_id(), id);
    }
}
