//! CLI command definitions for fastocr.
//!
//! The command surface maps the pipeline's producer and status contracts:
//! submit images, poll a task, list history, run a worker pool.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{AppConfig, DEFAULT_CONFIG_PATH};
use crate::ocr::VisionOcrClient;
use crate::scheduler::{TaskProducer, TaskQueue, WorkerPool, WorkerPoolConfig};
use crate::status::{StatusService, DEFAULT_HISTORY_LIMIT};
use crate::storage::{NewTask, TaskStatus, TaskStore};
use crate::upload::UploadStore;

/// Queue-backed OCR pipeline.
#[derive(Parser)]
#[command(name = "fastocr")]
#[command(about = "Upload images, recognize text via a remote vision model, poll for results")]
#[command(version)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,

    /// Path to the configuration file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH, global = true)]
    pub config: PathBuf,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Submit one or more images for recognition.
    Submit(SubmitArgs),

    /// Show the status of a task.
    Status(StatusArgs),

    /// List recent tasks, newest first.
    History(HistoryArgs),

    /// Run a worker pool until interrupted.
    Worker(WorkerArgs),

    /// Show queue depth.
    QueueStats,

    /// Show the effective configuration (API key masked).
    ConfigShow,
}

/// Arguments for `fastocr submit`.
#[derive(Parser, Debug)]
pub struct SubmitArgs {
    /// Image files to submit.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

/// Arguments for `fastocr status`.
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Task id returned by submit.
    pub task_id: Uuid,
}

/// Arguments for `fastocr history`.
#[derive(Parser, Debug)]
pub struct HistoryArgs {
    /// Maximum number of entries to list.
    #[arg(short = 'n', long, default_value_t = DEFAULT_HISTORY_LIMIT)]
    pub limit: i64,
}

/// Arguments for `fastocr worker`.
#[derive(Parser, Debug)]
pub struct WorkerArgs {
    /// Number of worker loops (overrides configuration).
    #[arg(short = 'w', long)]
    pub workers: Option<usize>,

    /// In-flight deliveries per worker (overrides configuration).
    #[arg(long)]
    pub prefetch: Option<usize>,
}

/// Parses CLI arguments.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Runs the CLI with pre-parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    let config = AppConfig::load(&cli.config)
        .with_context(|| format!("loading configuration from {:?}", cli.config))?;

    match cli.command {
        Commands::Submit(args) => run_submit(&config, args).await,
        Commands::Status(args) => run_status(&config, args).await,
        Commands::History(args) => run_history(&config, args).await,
        Commands::Worker(args) => run_worker(&config, args).await,
        Commands::QueueStats => run_queue_stats(&config).await,
        Commands::ConfigShow => run_config_show(&config),
    }
}

/// Connects the task store and applies migrations.
async fn connect_store(config: &AppConfig) -> anyhow::Result<Arc<TaskStore>> {
    let store = TaskStore::connect(&config.database_url)
        .await
        .context("connecting to the task store")?;
    store
        .run_migrations()
        .await
        .context("running task store migrations")?;
    Ok(Arc::new(store))
}

/// Connects the queue transport.
async fn connect_queue(config: &AppConfig) -> anyhow::Result<Arc<TaskQueue>> {
    let queue = TaskQueue::connect(&config.redis_url, &config.queue_name)
        .await
        .context("connecting to the task queue")?;
    Ok(Arc::new(queue))
}

async fn run_submit(config: &AppConfig, args: SubmitArgs) -> anyhow::Result<()> {
    let store = connect_store(config).await?;
    let queue = connect_queue(config).await?;
    let uploads = UploadStore::new(&config.upload_dir);
    let producer = TaskProducer::new(store, queue);

    let mut submitted = 0usize;
    let mut failed = 0usize;

    for file in &args.files {
        let stored = match uploads.save_file(file).await {
            Ok(stored) => stored,
            Err(e) => {
                warn!(file = %file.display(), error = %e, "Skipping file");
                failed += 1;
                continue;
            }
        };

        let task = NewTask::new(stored.input_ref())
            .with_original_filename(stored.original_filename.clone());

        match producer.submit(task).await {
            Ok(task_id) => {
                println!("{}  {}", task_id, stored.original_filename);
                submitted += 1;
            }
            Err(e) => {
                warn!(file = %file.display(), error = %e, "Submission failed");
                failed += 1;
            }
        }
    }

    println!("Submitted {} task(s), {} failure(s)", submitted, failed);

    if submitted == 0 && failed > 0 {
        anyhow::bail!("no tasks could be submitted");
    }

    Ok(())
}

async fn run_status(config: &AppConfig, args: StatusArgs) -> anyhow::Result<()> {
    let store = connect_store(config).await?;
    let status = StatusService::new(store);

    let record = status.get_status(args.task_id).await?;
    println!("{}", serde_json::to_string_pretty(&record)?);

    Ok(())
}

async fn run_history(config: &AppConfig, args: HistoryArgs) -> anyhow::Result<()> {
    let store = connect_store(config).await?;
    let status = StatusService::new(store);

    let records = status.get_history(args.limit).await?;

    if records.is_empty() {
        println!("No tasks yet");
        return Ok(());
    }

    for record in records {
        let filename = record.original_filename.as_deref().unwrap_or("-");
        println!(
            "{}  {:<10}  attempts={}  {}  {}",
            record.id,
            record.status.to_string(),
            record.attempts,
            record.created_at.format("%Y-%m-%d %H:%M:%S"),
            filename
        );
    }

    Ok(())
}

async fn run_worker(config: &AppConfig, args: WorkerArgs) -> anyhow::Result<()> {
    if config.api_key.is_empty() {
        anyhow::bail!("api_key is not configured; set FASTOCR_API_KEY or edit the config file");
    }

    let store = connect_store(config).await?;
    let queue = connect_queue(config).await?;
    let recognizer = Arc::new(VisionOcrClient::new(
        &config.api_url,
        &config.api_key,
        &config.model_name,
    )?);

    let pool_config = WorkerPoolConfig::new(args.workers.unwrap_or(config.worker_concurrency))
        .with_prefetch(args.prefetch.unwrap_or(config.worker_prefetch))
        .with_retry_limit(config.retry_limit)
        .with_poll_interval(config.poll_interval())
        .with_recognize_timeout(config.recognize_timeout())
        .with_shutdown_timeout(config.shutdown_timeout());

    let mut pool = WorkerPool::new(pool_config, store, queue, recognizer);
    pool.start().await?;

    info!("Workers running; press Ctrl+C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;

    pool.shutdown().await?;

    let stats = pool.stats();
    println!(
        "Processed {} task(s): {} done, {} failed, {} requeued, {} duplicates",
        stats.total_terminal(),
        stats.tasks_completed,
        stats.tasks_failed,
        stats.deliveries_requeued,
        stats.duplicates_dropped
    );

    Ok(())
}

async fn run_queue_stats(config: &AppConfig) -> anyhow::Result<()> {
    let queue = connect_queue(config).await?;
    let stats = queue.stats().await?;

    println!("queue:      {}", stats.queue_name);
    println!("pending:    {}", stats.pending_messages);
    println!("processing: {}", stats.processing_messages);

    let store = connect_store(config).await?;
    println!("tasks:");
    for status in [
        TaskStatus::Pending,
        TaskStatus::Processing,
        TaskStatus::Done,
        TaskStatus::Failed,
    ] {
        let count = store.count_by_status(status).await?;
        println!("  {:<11} {}", status.to_string(), count);
    }

    Ok(())
}

fn run_config_show(config: &AppConfig) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&config.masked())?);
    Ok(())
}
