//! Worker pool for processing recognition tasks from the queue.
//!
//! Two nested levels of concurrency, both configurable:
//!
//! - the pool runs `num_workers` independent worker loops
//! - each worker holds a `prefetch`-permit semaphore bounding its own
//!   in-flight deliveries
//!
//! A worker loop that panics is restarted by its supervisor; graceful
//! shutdown drains in-flight deliveries before workers exit. All task-state
//! coordination goes through the record store's conditional updates; the
//! pool itself holds no locks.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::{broadcast, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::ocr::{Recognizer, RecognizerError};
use crate::storage::{StoreError, TaskStore};

use super::message::Delivery;
use super::queue::{QueueError, TaskQueue};

/// Errors that can occur in the worker pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Failed to talk to the task queue.
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    /// Pool is already running.
    #[error("Pool is already running")]
    AlreadyRunning,

    /// Pool is not running.
    #[error("Pool is not running")]
    NotRunning,

    /// Shutdown timed out.
    #[error("Shutdown timed out after {0:?}")]
    ShutdownTimeout(Duration),
}

/// Configuration for the worker pool.
#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    /// Number of worker loops to run.
    pub num_workers: usize,
    /// In-flight deliveries allowed per worker.
    pub prefetch: usize,
    /// Processing attempts before a task is marked failed.
    pub retry_limit: u32,
    /// How long a dequeue blocks waiting for a message.
    pub poll_interval: Duration,
    /// Upper bound on a single recognition call.
    pub recognize_timeout: Duration,
    /// Timeout for graceful shutdown.
    pub shutdown_timeout: Duration,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            num_workers: 3,
            prefetch: 3,
            retry_limit: 3,
            poll_interval: Duration::from_secs(1),
            recognize_timeout: Duration::from_secs(120),
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl WorkerPoolConfig {
    /// Creates a new configuration with the specified number of workers.
    pub fn new(num_workers: usize) -> Self {
        Self {
            num_workers,
            ..Default::default()
        }
    }

    /// Sets the per-worker prefetch window.
    pub fn with_prefetch(mut self, prefetch: usize) -> Self {
        self.prefetch = prefetch;
        self
    }

    /// Sets the retry limit.
    pub fn with_retry_limit(mut self, limit: u32) -> Self {
        self.retry_limit = limit;
        self
    }

    /// Sets the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the recognition timeout.
    pub fn with_recognize_timeout(mut self, timeout: Duration) -> Self {
        self.recognize_timeout = timeout;
        self
    }

    /// Sets the shutdown timeout.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

/// Statistics about the worker pool.
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    /// Total number of worker loops.
    pub num_workers: usize,
    /// Deliveries currently being processed across all workers.
    pub active_deliveries: usize,
    /// Tasks completed successfully.
    pub tasks_completed: u64,
    /// Tasks that reached terminal failure.
    pub tasks_failed: u64,
    /// Deliveries negatively acknowledged for retry.
    pub deliveries_requeued: u64,
    /// Duplicate deliveries resolved at the claim step.
    pub duplicates_dropped: u64,
    /// Average processing duration per terminal outcome.
    pub average_duration: Duration,
}

impl PoolStats {
    /// Returns the total number of terminal outcomes recorded.
    pub fn total_terminal(&self) -> u64 {
        self.tasks_completed + self.tasks_failed
    }

    /// Returns the success rate as a percentage.
    pub fn success_rate(&self) -> f64 {
        let total = self.total_terminal();
        if total == 0 {
            return 0.0;
        }
        (self.tasks_completed as f64 / total as f64) * 100.0
    }
}

/// Shared state for tracking pool statistics.
struct SharedPoolStats {
    tasks_completed: AtomicU64,
    tasks_failed: AtomicU64,
    deliveries_requeued: AtomicU64,
    duplicates_dropped: AtomicU64,
    total_duration_ms: AtomicU64,
    active_deliveries: AtomicU64,
}

impl SharedPoolStats {
    fn new() -> Self {
        Self {
            tasks_completed: AtomicU64::new(0),
            tasks_failed: AtomicU64::new(0),
            deliveries_requeued: AtomicU64::new(0),
            duplicates_dropped: AtomicU64::new(0),
            total_duration_ms: AtomicU64::new(0),
            active_deliveries: AtomicU64::new(0),
        }
    }

    fn record_completion(&self, duration: Duration) {
        self.tasks_completed.fetch_add(1, Ordering::SeqCst);
        self.total_duration_ms
            .fetch_add(duration.as_millis() as u64, Ordering::SeqCst);
    }

    fn record_failure(&self, duration: Duration) {
        self.tasks_failed.fetch_add(1, Ordering::SeqCst);
        self.total_duration_ms
            .fetch_add(duration.as_millis() as u64, Ordering::SeqCst);
    }

    fn record_requeue(&self) {
        self.deliveries_requeued.fetch_add(1, Ordering::SeqCst);
    }

    fn record_duplicate(&self) {
        self.duplicates_dropped.fetch_add(1, Ordering::SeqCst);
    }

    fn increment_active(&self) {
        self.active_deliveries.fetch_add(1, Ordering::SeqCst);
    }

    fn decrement_active(&self) {
        self.active_deliveries.fetch_sub(1, Ordering::SeqCst);
    }

    fn to_pool_stats(&self, num_workers: usize) -> PoolStats {
        let completed = self.tasks_completed.load(Ordering::SeqCst);
        let failed = self.tasks_failed.load(Ordering::SeqCst);
        let total_duration_ms = self.total_duration_ms.load(Ordering::SeqCst);

        let total = completed + failed;
        let average_duration = if total > 0 {
            Duration::from_millis(total_duration_ms / total)
        } else {
            Duration::ZERO
        };

        PoolStats {
            num_workers,
            active_deliveries: self.active_deliveries.load(Ordering::SeqCst) as usize,
            tasks_completed: completed,
            tasks_failed: failed,
            deliveries_requeued: self.deliveries_requeued.load(Ordering::SeqCst),
            duplicates_dropped: self.duplicates_dropped.load(Ordering::SeqCst),
            average_duration,
        }
    }
}

/// Shared collaborators and knobs handed to every worker and every in-flight
/// delivery task.
struct WorkerContext {
    queue: Arc<TaskQueue>,
    store: Arc<TaskStore>,
    recognizer: Arc<dyn Recognizer>,
    retry_limit: u32,
    poll_interval: Duration,
    recognize_timeout: Duration,
    stats: Arc<SharedPoolStats>,
}

/// Worker pool that supervises worker loops processing queue deliveries.
pub struct WorkerPool {
    config: WorkerPoolConfig,
    ctx: Arc<WorkerContext>,
    shutdown_tx: broadcast::Sender<()>,
    worker_handles: Vec<JoinHandle<()>>,
    is_running: AtomicBool,
}

impl WorkerPool {
    /// Creates a new worker pool from pre-connected collaborators.
    pub fn new(
        config: WorkerPoolConfig,
        store: Arc<TaskStore>,
        queue: Arc<TaskQueue>,
        recognizer: Arc<dyn Recognizer>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let stats = Arc::new(SharedPoolStats::new());

        let ctx = Arc::new(WorkerContext {
            queue,
            store,
            recognizer,
            retry_limit: config.retry_limit,
            poll_interval: config.poll_interval,
            recognize_timeout: config.recognize_timeout,
            stats,
        });

        Self {
            config,
            ctx,
            shutdown_tx,
            worker_handles: Vec::new(),
            is_running: AtomicBool::new(false),
        }
    }

    /// Starts all workers in the pool.
    ///
    /// Recovers deliveries stranded by crashed workers before the first
    /// worker starts polling.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::AlreadyRunning` if the pool is already running.
    pub async fn start(&mut self) -> Result<(), PoolError> {
        if self.is_running.load(Ordering::SeqCst) {
            return Err(PoolError::AlreadyRunning);
        }

        match self.ctx.queue.recover_processing().await {
            Ok(recovered) if recovered > 0 => {
                info!(recovered, "Recovered stranded deliveries");
            }
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "Failed to recover stranded deliveries");
            }
        }

        for i in 0..self.config.num_workers {
            let handle = self.spawn_supervised_worker(format!("worker-{}", i));
            self.worker_handles.push(handle);
        }

        self.is_running.store(true, Ordering::SeqCst);
        info!(
            num_workers = self.config.num_workers,
            prefetch = self.config.prefetch,
            "Worker pool started"
        );

        Ok(())
    }

    /// Spawns a supervisor that restarts its worker loop on panic.
    fn spawn_supervised_worker(&self, worker_id: String) -> JoinHandle<()> {
        let ctx = Arc::clone(&self.ctx);
        let shutdown_tx = self.shutdown_tx.clone();
        let prefetch = self.config.prefetch;

        tokio::spawn(async move {
            let mut supervisor_rx = shutdown_tx.subscribe();

            loop {
                let worker = Worker::new(
                    worker_id.clone(),
                    Arc::clone(&ctx),
                    shutdown_tx.subscribe(),
                    prefetch,
                );

                match tokio::spawn(worker.run()).await {
                    Ok(()) => break,
                    Err(e) => {
                        // A clean exit returns Ok; reaching here means the
                        // loop panicked or was aborted.
                        match supervisor_rx.try_recv() {
                            Err(broadcast::error::TryRecvError::Empty) => {
                                error!(worker_id = %worker_id, error = %e, "Worker crashed; restarting");
                            }
                            _ => break,
                        }
                    }
                }
            }
        })
    }

    /// Gracefully shuts down all workers.
    ///
    /// Workers finish their in-flight deliveries before stopping.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::ShutdownTimeout` if workers don't stop within
    /// the configured timeout.
    pub async fn shutdown(&mut self) -> Result<(), PoolError> {
        if !self.is_running.load(Ordering::SeqCst) {
            return Err(PoolError::NotRunning);
        }

        info!("Initiating worker pool shutdown");

        // Ignore send error - workers may have already stopped
        let _ = self.shutdown_tx.send(());

        let shutdown_future = async {
            for handle in self.worker_handles.drain(..) {
                if let Err(e) = handle.await {
                    error!(error = %e, "Worker supervisor panicked during shutdown");
                }
            }
        };

        match tokio::time::timeout(self.config.shutdown_timeout, shutdown_future).await {
            Ok(()) => {
                self.is_running.store(false, Ordering::SeqCst);
                info!("Worker pool shutdown complete");
                Ok(())
            }
            Err(_) => {
                self.is_running.store(false, Ordering::SeqCst);
                Err(PoolError::ShutdownTimeout(self.config.shutdown_timeout))
            }
        }
    }

    /// Returns current pool statistics.
    pub fn stats(&self) -> PoolStats {
        self.ctx.stats.to_pool_stats(self.config.num_workers)
    }

    /// Returns whether the pool is currently running.
    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }

    /// Returns the number of worker loops in the pool.
    pub fn num_workers(&self) -> usize {
        self.config.num_workers
    }
}

/// Terminal disposition of one delivery, for logging and stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeliveryOutcome {
    /// Task reached `Done`.
    Completed,
    /// Task reached `Failed` after exhausting retries.
    Failed,
    /// Delivery requeued for another attempt.
    Requeued,
    /// Duplicate of a delivery another worker already resolved.
    Duplicate,
    /// Message referenced an unknown task and was dropped.
    Dropped,
}

/// A single worker loop pulling deliveries from the queue.
struct Worker {
    id: String,
    ctx: Arc<WorkerContext>,
    shutdown_rx: broadcast::Receiver<()>,
    permits: Arc<Semaphore>,
    prefetch: usize,
}

impl Worker {
    fn new(
        id: String,
        ctx: Arc<WorkerContext>,
        shutdown_rx: broadcast::Receiver<()>,
        prefetch: usize,
    ) -> Self {
        Self {
            id,
            ctx,
            shutdown_rx,
            permits: Arc::new(Semaphore::new(prefetch.max(1))),
            prefetch: prefetch.max(1),
        }
    }

    /// Main worker loop.
    ///
    /// Dequeues while permits are available, spawning each delivery onto
    /// the runtime so up to `prefetch` recognitions run concurrently. On
    /// shutdown, waits for in-flight deliveries to finish.
    async fn run(mut self) {
        info!(worker_id = %self.id, "Worker started");

        loop {
            match self.shutdown_rx.try_recv() {
                Ok(()) | Err(broadcast::error::TryRecvError::Closed) => {
                    info!(worker_id = %self.id, "Worker received shutdown signal");
                    break;
                }
                Err(broadcast::error::TryRecvError::Lagged(_)) => {
                    continue;
                }
                Err(broadcast::error::TryRecvError::Empty) => {}
            }

            let permit = match Arc::clone(&self.permits).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };

            match self.ctx.queue.dequeue(self.ctx.poll_interval).await {
                Ok(Some(delivery)) => {
                    let ctx = Arc::clone(&self.ctx);
                    let worker_id = self.id.clone();

                    tokio::spawn(async move {
                        process_delivery(&ctx, &worker_id, delivery).await;
                        drop(permit);
                    });
                }
                Ok(None) => {
                    // The dequeue already waited poll_interval.
                    drop(permit);
                    debug!(worker_id = %self.id, "No deliveries available");
                }
                Err(e) => {
                    drop(permit);
                    error!(worker_id = %self.id, error = %e, "Failed to dequeue");
                    tokio::time::sleep(self.ctx.poll_interval).await;
                }
            }
        }

        // Drain: reclaiming every permit means no delivery is in flight.
        let _ = self.permits.acquire_many(self.prefetch as u32).await;

        info!(worker_id = %self.id, "Worker stopped");
    }
}

/// Runs the per-delivery protocol and records stats.
async fn process_delivery(ctx: &WorkerContext, worker_id: &str, delivery: Delivery) {
    let task_id = delivery.task_id();
    let started = Instant::now();

    ctx.stats.increment_active();
    let outcome = run_delivery_protocol(ctx, worker_id, &delivery).await;
    let duration = started.elapsed();
    ctx.stats.decrement_active();

    match outcome {
        DeliveryOutcome::Completed => {
            ctx.stats.record_completion(duration);
            info!(
                worker_id = %worker_id,
                task_id = %task_id,
                duration_ms = duration.as_millis() as u64,
                "Task completed"
            );
        }
        DeliveryOutcome::Failed => {
            ctx.stats.record_failure(duration);
            warn!(
                worker_id = %worker_id,
                task_id = %task_id,
                duration_ms = duration.as_millis() as u64,
                "Task failed terminally"
            );
        }
        DeliveryOutcome::Requeued => {
            ctx.stats.record_requeue();
        }
        DeliveryOutcome::Duplicate => {
            ctx.stats.record_duplicate();
        }
        DeliveryOutcome::Dropped => {}
    }
}

/// The per-delivery state machine.
///
/// 1. Claim `Pending -> Processing`; a conflict on a terminal task is the
///    duplicate-delivery dedup point, a conflict on a `Processing` task
///    means this delivery is a retry (or a redelivery after a crash) and
///    processing proceeds.
/// 2. Record the attempt, then call the recognizer under a bounded timeout.
/// 3. Success: `Processing -> Done`; failure below the retry limit:
///    requeue without touching task status; at the limit:
///    `Processing -> Failed`.
///
/// Store conflicts at the terminal transitions mean another worker already
/// resolved the task; the delivery is acknowledged without retrying.
async fn run_delivery_protocol(
    ctx: &WorkerContext,
    worker_id: &str,
    delivery: &Delivery,
) -> DeliveryOutcome {
    let task_id = delivery.task_id();

    match ctx.store.mark_processing(task_id).await {
        Ok(()) => {}
        Err(StoreError::Conflict { actual, .. }) if actual.is_terminal() => {
            debug!(
                worker_id = %worker_id,
                task_id = %task_id,
                status = %actual,
                "Duplicate delivery for finished task"
            );
            ack_delivery(ctx, worker_id, delivery).await;
            return DeliveryOutcome::Duplicate;
        }
        Err(StoreError::Conflict { .. }) => {
            // Already Processing: a requeued retry, or a redelivery after a
            // worker crashed between claim and terminal transition.
            debug!(
                worker_id = %worker_id,
                task_id = %task_id,
                "Resuming in-flight task"
            );
        }
        Err(StoreError::NotFound(_)) => {
            warn!(
                worker_id = %worker_id,
                task_id = %task_id,
                "Delivery references unknown task; dropping"
            );
            ack_delivery(ctx, worker_id, delivery).await;
            return DeliveryOutcome::Dropped;
        }
        Err(e) => {
            error!(
                worker_id = %worker_id,
                task_id = %task_id,
                error = %e,
                "Failed to claim task; requeueing"
            );
            requeue_delivery(ctx, worker_id, delivery).await;
            return DeliveryOutcome::Requeued;
        }
    }

    let attempts = match ctx.store.record_attempt(task_id).await {
        Ok(attempts) => attempts,
        Err(e) => {
            error!(
                worker_id = %worker_id,
                task_id = %task_id,
                error = %e,
                "Failed to record attempt; requeueing"
            );
            requeue_delivery(ctx, worker_id, delivery).await;
            return DeliveryOutcome::Requeued;
        }
    };

    debug!(
        worker_id = %worker_id,
        task_id = %task_id,
        attempt = attempts,
        "Recognizing"
    );

    let recognition = tokio::time::timeout(
        ctx.recognize_timeout,
        ctx.recognizer.recognize(&delivery.message.input_ref),
    )
    .await;

    match recognition {
        Ok(Ok(recognized)) => match ctx.store.complete(task_id, &recognized.text).await {
            Ok(()) => {
                ack_delivery(ctx, worker_id, delivery).await;
                DeliveryOutcome::Completed
            }
            Err(StoreError::Conflict { actual, .. }) => {
                debug!(
                    worker_id = %worker_id,
                    task_id = %task_id,
                    status = %actual,
                    "Another worker finished this task first"
                );
                ack_delivery(ctx, worker_id, delivery).await;
                DeliveryOutcome::Duplicate
            }
            Err(e) => {
                error!(
                    worker_id = %worker_id,
                    task_id = %task_id,
                    error = %e,
                    "Recognition succeeded but result could not be recorded; requeueing"
                );
                requeue_delivery(ctx, worker_id, delivery).await;
                DeliveryOutcome::Requeued
            }
        },
        Ok(Err(e)) => {
            handle_recognition_failure(ctx, worker_id, delivery, attempts, e.to_string()).await
        }
        Err(_) => {
            let error_text = RecognizerError::Timeout(ctx.recognize_timeout).to_string();
            handle_recognition_failure(ctx, worker_id, delivery, attempts, error_text).await
        }
    }
}

/// Routes an adapter failure into retry or terminal failure.
async fn handle_recognition_failure(
    ctx: &WorkerContext,
    worker_id: &str,
    delivery: &Delivery,
    attempts: i32,
    error_text: String,
) -> DeliveryOutcome {
    let task_id = delivery.task_id();

    if (attempts.max(0) as u32) < ctx.retry_limit {
        warn!(
            worker_id = %worker_id,
            task_id = %task_id,
            attempt = attempts,
            retry_limit = ctx.retry_limit,
            error = %error_text,
            "Recognition failed; requeueing for retry"
        );
        requeue_delivery(ctx, worker_id, delivery).await;
        return DeliveryOutcome::Requeued;
    }

    match ctx.store.fail(task_id, &error_text).await {
        Ok(()) => {
            ack_delivery(ctx, worker_id, delivery).await;
            DeliveryOutcome::Failed
        }
        Err(StoreError::Conflict { actual, .. }) => {
            debug!(
                worker_id = %worker_id,
                task_id = %task_id,
                status = %actual,
                "Another worker finished this task first"
            );
            ack_delivery(ctx, worker_id, delivery).await;
            DeliveryOutcome::Duplicate
        }
        Err(e) => {
            error!(
                worker_id = %worker_id,
                task_id = %task_id,
                error = %e,
                "Failed to record terminal failure; requeueing"
            );
            requeue_delivery(ctx, worker_id, delivery).await;
            DeliveryOutcome::Requeued
        }
    }
}

/// Acknowledges a delivery, logging rather than failing the protocol if the
/// transport hiccups; an unacked payload is recovered at the next startup.
async fn ack_delivery(ctx: &WorkerContext, worker_id: &str, delivery: &Delivery) {
    if let Err(e) = ctx.queue.ack(delivery).await {
        error!(
            worker_id = %worker_id,
            task_id = %delivery.task_id(),
            error = %e,
            "Failed to acknowledge delivery"
        );
    }
}

/// Negatively acknowledges a delivery for redelivery.
async fn requeue_delivery(ctx: &WorkerContext, worker_id: &str, delivery: &Delivery) {
    if let Err(e) = ctx.queue.requeue(delivery).await {
        error!(
            worker_id = %worker_id,
            task_id = %delivery.task_id(),
            error = %e,
            "Failed to requeue delivery"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_pool_config_default() {
        let config = WorkerPoolConfig::default();

        assert_eq!(config.num_workers, 3);
        assert_eq!(config.prefetch, 3);
        assert_eq!(config.retry_limit, 3);
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.recognize_timeout, Duration::from_secs(120));
        assert_eq!(config.shutdown_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_worker_pool_config_builder() {
        let config = WorkerPoolConfig::new(8)
            .with_prefetch(5)
            .with_retry_limit(2)
            .with_poll_interval(Duration::from_secs(5))
            .with_recognize_timeout(Duration::from_secs(60))
            .with_shutdown_timeout(Duration::from_secs(120));

        assert_eq!(config.num_workers, 8);
        assert_eq!(config.prefetch, 5);
        assert_eq!(config.retry_limit, 2);
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.recognize_timeout, Duration::from_secs(60));
        assert_eq!(config.shutdown_timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_pool_stats_default() {
        let stats = PoolStats::default();

        assert_eq!(stats.total_terminal(), 0);
        assert!((stats.success_rate() - 0.0).abs() < f64::EPSILON);
        assert_eq!(stats.average_duration, Duration::ZERO);
    }

    #[test]
    fn test_pool_stats_calculations() {
        let stats = PoolStats {
            num_workers: 2,
            active_deliveries: 1,
            tasks_completed: 80,
            tasks_failed: 20,
            deliveries_requeued: 5,
            duplicates_dropped: 2,
            average_duration: Duration::from_millis(250),
        };

        assert_eq!(stats.total_terminal(), 100);
        assert!((stats.success_rate() - 80.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shared_pool_stats() {
        let stats = SharedPoolStats::new();

        stats.record_completion(Duration::from_millis(100));
        stats.record_completion(Duration::from_millis(200));
        stats.record_failure(Duration::from_millis(300));
        stats.record_requeue();
        stats.record_duplicate();

        let pool_stats = stats.to_pool_stats(3);

        assert_eq!(pool_stats.num_workers, 3);
        assert_eq!(pool_stats.tasks_completed, 2);
        assert_eq!(pool_stats.tasks_failed, 1);
        assert_eq!(pool_stats.deliveries_requeued, 1);
        assert_eq!(pool_stats.duplicates_dropped, 1);
        // Average: (100 + 200 + 300) / 3 = 200 ms
        assert_eq!(pool_stats.average_duration, Duration::from_millis(200));
    }

    #[test]
    fn test_shared_pool_stats_active_gauge() {
        let stats = SharedPoolStats::new();

        stats.increment_active();
        stats.increment_active();
        assert_eq!(stats.active_deliveries.load(Ordering::SeqCst), 2);

        stats.decrement_active();
        assert_eq!(stats.active_deliveries.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_pool_error_display() {
        let err = PoolError::AlreadyRunning;
        assert!(err.to_string().contains("already running"));

        let err = PoolError::NotRunning;
        assert!(err.to_string().contains("not running"));

        let err = PoolError::ShutdownTimeout(Duration::from_secs(30));
        assert!(err.to_string().contains("30"));
    }
}
