//! Redis-based task queue with reliable dequeue.
//!
//! Durable at-least-once message channel between the producer and the
//! worker pool, built on three Redis lists:
//!
//! - `{queue_name}`: main queue where messages are published
//! - `{queue_name}:processing`: in-flight deliveries awaiting acknowledgment
//!
//! Dequeue uses BRPOPLPUSH to atomically move a payload into the processing
//! list; a worker crash leaves the payload there, and `recover_processing`
//! pushes stranded payloads back onto the main queue at startup. A message
//! may therefore be delivered more than once; the task record store's
//! conflict-on-update rule resolves duplicates, not the transport.

use std::time::Duration;

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use thiserror::Error;

use super::message::{Delivery, TaskMessage};

/// Errors that can occur during queue operations.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Failed to connect to Redis.
    #[error("Redis connection failed: {0}")]
    ConnectionFailed(String),

    /// Redis operation failed.
    #[error("Redis operation failed: {0}")]
    RedisError(#[from] redis::RedisError),

    /// Failed to serialize or parse a message payload.
    #[error("Serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Redis-based task queue.
pub struct TaskQueue {
    /// Redis connection manager (handles reconnection automatically).
    redis: ConnectionManager,
    /// Name of the main queue.
    queue_name: String,
    /// Name of the processing list.
    processing_queue: String,
}

impl TaskQueue {
    /// Connects to Redis and creates a new task queue.
    ///
    /// # Arguments
    ///
    /// * `redis_url` - Redis connection URL (e.g., "redis://localhost:6379")
    /// * `queue_name` - Name of the queue (used as prefix for Redis keys)
    pub async fn connect(redis_url: &str, queue_name: &str) -> Result<Self, QueueError> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| QueueError::ConnectionFailed(e.to_string()))?;

        let redis = ConnectionManager::new(client)
            .await
            .map_err(|e| QueueError::ConnectionFailed(e.to_string()))?;

        Ok(Self::from_connection(redis, queue_name))
    }

    /// Creates a queue from an existing connection manager.
    pub fn from_connection(redis: ConnectionManager, queue_name: &str) -> Self {
        Self {
            redis,
            queue_name: queue_name.to_string(),
            processing_queue: format!("{}:processing", queue_name),
        }
    }

    /// Publishes a message durably.
    ///
    /// Returns once Redis has acknowledged the LPUSH; the payload survives
    /// broker restart given a persistence-enabled Redis.
    pub async fn publish(&self, message: &TaskMessage) -> Result<(), QueueError> {
        let serialized = serde_json::to_string(message)?;
        let mut conn = self.redis.clone();
        conn.lpush::<_, _, ()>(&self.queue_name, serialized).await?;
        Ok(())
    }

    /// Publishes multiple messages in a single pipelined operation.
    pub async fn publish_batch(&self, messages: &[TaskMessage]) -> Result<(), QueueError> {
        if messages.is_empty() {
            return Ok(());
        }

        let serialized: Result<Vec<String>, _> =
            messages.iter().map(serde_json::to_string).collect();
        let serialized = serialized?;

        let mut conn = self.redis.clone();

        let mut pipe = redis::pipe();
        for payload in &serialized {
            pipe.lpush(&self.queue_name, payload);
        }
        pipe.query_async::<_, ()>(&mut conn).await?;

        Ok(())
    }

    /// Dequeues the next message, blocking until one is available or timeout.
    ///
    /// BRPOPLPUSH atomically moves the payload from the main queue to the
    /// processing list, so a crash between dequeue and acknowledgment never
    /// loses the message.
    ///
    /// Returns `Ok(None)` if the timeout expired with no messages available.
    pub async fn dequeue(&self, timeout: Duration) -> Result<Option<Delivery>, QueueError> {
        let mut conn = self.redis.clone();
        let timeout_secs = timeout.as_secs().max(1) as usize;

        let result: Option<String> = redis::cmd("BRPOPLPUSH")
            .arg(&self.queue_name)
            .arg(&self.processing_queue)
            .arg(timeout_secs)
            .query_async(&mut conn)
            .await?;

        match result {
            Some(raw) => {
                let message: TaskMessage = serde_json::from_str(&raw)?;
                Ok(Some(Delivery { message, raw }))
            }
            None => Ok(None),
        }
    }

    /// Acknowledges a delivery, removing it from the processing list.
    pub async fn ack(&self, delivery: &Delivery) -> Result<(), QueueError> {
        let mut conn = self.redis.clone();
        conn.lrem::<_, _, ()>(&self.processing_queue, 1, &delivery.raw)
            .await?;
        Ok(())
    }

    /// Negatively acknowledges a delivery, returning it to the main queue.
    ///
    /// The removal from the processing list and the re-push are pipelined
    /// atomically so the payload is never in both lists.
    pub async fn requeue(&self, delivery: &Delivery) -> Result<(), QueueError> {
        let mut conn = self.redis.clone();

        let mut pipe = redis::pipe();
        pipe.atomic()
            .lrem(&self.processing_queue, 1, &delivery.raw)
            .rpush(&self.queue_name, &delivery.raw);
        pipe.query_async::<_, ()>(&mut conn).await?;

        Ok(())
    }

    /// Returns stranded in-flight payloads to the main queue.
    ///
    /// Called on worker pool startup to recover deliveries from workers
    /// that crashed before acknowledging. Returns the number of payloads
    /// recovered.
    pub async fn recover_processing(&self) -> Result<usize, QueueError> {
        let mut conn = self.redis.clone();
        let mut recovered = 0;

        let payloads: Vec<String> = conn.lrange(&self.processing_queue, 0, -1).await?;

        for payload in payloads {
            let mut pipe = redis::pipe();
            pipe.atomic()
                .lrem(&self.processing_queue, 1, &payload)
                .rpush(&self.queue_name, &payload);
            pipe.query_async::<_, ()>(&mut conn).await?;
            recovered += 1;
        }

        Ok(recovered)
    }

    /// Returns the number of messages waiting in the main queue.
    pub async fn len(&self) -> Result<usize, QueueError> {
        let mut conn = self.redis.clone();
        let len: usize = conn.llen(&self.queue_name).await?;
        Ok(len)
    }

    /// Returns the number of in-flight deliveries.
    pub async fn processing_len(&self) -> Result<usize, QueueError> {
        let mut conn = self.redis.clone();
        let len: usize = conn.llen(&self.processing_queue).await?;
        Ok(len)
    }

    /// Returns whether the main queue is empty.
    pub async fn is_empty(&self) -> Result<bool, QueueError> {
        Ok(self.len().await? == 0)
    }

    /// Returns queue statistics.
    pub async fn stats(&self) -> Result<QueueStats, QueueError> {
        let (pending, processing) = tokio::try_join!(self.len(), self.processing_len())?;

        Ok(QueueStats {
            queue_name: self.queue_name.clone(),
            pending_messages: pending,
            processing_messages: processing,
        })
    }

    /// Clears the main and processing lists.
    ///
    /// **Warning**: permanently deletes all queued messages.
    pub async fn clear(&self) -> Result<(), QueueError> {
        let mut conn = self.redis.clone();

        let mut pipe = redis::pipe();
        pipe.del(&self.queue_name).del(&self.processing_queue);
        pipe.query_async::<_, ()>(&mut conn).await?;

        Ok(())
    }

    /// Returns the queue name.
    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }
}

/// Statistics about queue state.
#[derive(Debug, Clone)]
pub struct QueueStats {
    /// Name of the queue.
    pub queue_name: String,
    /// Messages waiting to be delivered.
    pub pending_messages: usize,
    /// Deliveries awaiting acknowledgment.
    pub processing_messages: usize,
}

impl QueueStats {
    /// Returns the total number of messages in flight or waiting.
    pub fn total_messages(&self) -> usize {
        self.pending_messages + self.processing_messages
    }
}
