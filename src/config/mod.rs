//! Application configuration.
//!
//! Configuration is loaded once at process start from a JSON file merged
//! with environment overrides, validated, and then passed as an immutable
//! value into each component. No component reads a process-wide singleton.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default config file location.
pub const DEFAULT_CONFIG_PATH: &str = "config/app_config.json";

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Configuration validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    /// The config file could not be parsed.
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    /// IO error while reading or writing configuration.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration for the whole pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    // Storage settings
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Redis connection URL.
    pub redis_url: String,
    /// Name of the task queue.
    pub queue_name: String,
    /// Directory uploaded images are stored under.
    pub upload_dir: PathBuf,

    // Recognition settings
    /// API key for the recognition service.
    pub api_key: String,
    /// Base URL of the recognition service.
    pub api_url: String,
    /// Vision model name.
    pub model_name: String,

    // Worker settings
    /// Number of worker loops to run.
    pub worker_concurrency: usize,
    /// In-flight deliveries allowed per worker.
    pub worker_prefetch: usize,
    /// Processing attempts before a task is marked failed.
    pub retry_limit: u32,
    /// Seconds a dequeue blocks waiting for a message.
    pub poll_interval_secs: u64,
    /// Upper bound on a single recognition call, in seconds.
    pub recognize_timeout_secs: u64,
    /// Graceful shutdown timeout, in seconds.
    pub shutdown_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/fastocr".to_string(),
            redis_url: "redis://localhost:6379".to_string(),
            queue_name: "ocr_tasks".to_string(),
            upload_dir: PathBuf::from("persistent_data/uploads"),
            api_key: String::new(),
            api_url: "https://dashscope.aliyuncs.com/compatible-mode/v1".to_string(),
            model_name: "qwen-vl-ocr".to_string(),
            worker_concurrency: 3,
            worker_prefetch: 3,
            retry_limit: 3,
            poll_interval_secs: 1,
            recognize_timeout_secs: 120,
            shutdown_timeout_secs: 30,
        }
    }
}

impl AppConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a JSON file, creating it with defaults if
    /// missing, then applies environment overrides and validates.
    ///
    /// # Environment Variables
    ///
    /// - `DATABASE_URL`: PostgreSQL connection URL
    /// - `REDIS_URL`: Redis connection URL
    /// - `FASTOCR_QUEUE_NAME`: queue name
    /// - `FASTOCR_UPLOAD_DIR`: upload directory
    /// - `FASTOCR_API_KEY`: recognition service API key
    /// - `FASTOCR_API_URL`: recognition service base URL
    /// - `FASTOCR_MODEL_NAME`: vision model name
    /// - `FASTOCR_WORKER_CONCURRENCY`: number of worker loops
    /// - `FASTOCR_WORKER_PREFETCH`: per-worker in-flight deliveries
    /// - `FASTOCR_RETRY_LIMIT`: attempts before terminal failure
    /// - `FASTOCR_POLL_INTERVAL_SECS`: dequeue block time
    /// - `FASTOCR_RECOGNIZE_TIMEOUT_SECS`: recognition call bound
    /// - `FASTOCR_SHUTDOWN_TIMEOUT_SECS`: shutdown drain bound
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            serde_json::from_str(&contents)?
        } else {
            let config = Self::default();
            config.save(path)?;
            config
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Saves the configuration to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(val) = std::env::var("DATABASE_URL") {
            self.database_url = val;
        }
        if let Ok(val) = std::env::var("REDIS_URL") {
            self.redis_url = val;
        }
        if let Ok(val) = std::env::var("FASTOCR_QUEUE_NAME") {
            self.queue_name = val;
        }
        if let Ok(val) = std::env::var("FASTOCR_UPLOAD_DIR") {
            self.upload_dir = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("FASTOCR_API_KEY") {
            self.api_key = val;
        }
        if let Ok(val) = std::env::var("FASTOCR_API_URL") {
            self.api_url = val;
        }
        if let Ok(val) = std::env::var("FASTOCR_MODEL_NAME") {
            self.model_name = val;
        }
        if let Ok(val) = std::env::var("FASTOCR_WORKER_CONCURRENCY") {
            self.worker_concurrency = parse_env_value(&val, "FASTOCR_WORKER_CONCURRENCY")?;
        }
        if let Ok(val) = std::env::var("FASTOCR_WORKER_PREFETCH") {
            self.worker_prefetch = parse_env_value(&val, "FASTOCR_WORKER_PREFETCH")?;
        }
        if let Ok(val) = std::env::var("FASTOCR_RETRY_LIMIT") {
            self.retry_limit = parse_env_value(&val, "FASTOCR_RETRY_LIMIT")?;
        }
        if let Ok(val) = std::env::var("FASTOCR_POLL_INTERVAL_SECS") {
            self.poll_interval_secs = parse_env_value(&val, "FASTOCR_POLL_INTERVAL_SECS")?;
        }
        if let Ok(val) = std::env::var("FASTOCR_RECOGNIZE_TIMEOUT_SECS") {
            self.recognize_timeout_secs = parse_env_value(&val, "FASTOCR_RECOGNIZE_TIMEOUT_SECS")?;
        }
        if let Ok(val) = std::env::var("FASTOCR_SHUTDOWN_TIMEOUT_SECS") {
            self.shutdown_timeout_secs = parse_env_value(&val, "FASTOCR_SHUTDOWN_TIMEOUT_SECS")?;
        }

        Ok(())
    }

    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_url.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "database_url cannot be empty".to_string(),
            ));
        }

        if self.redis_url.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "redis_url cannot be empty".to_string(),
            ));
        }

        if self.queue_name.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "queue_name cannot be empty".to_string(),
            ));
        }

        if self.worker_concurrency == 0 {
            return Err(ConfigError::ValidationFailed(
                "worker_concurrency must be greater than 0".to_string(),
            ));
        }

        if self.worker_prefetch == 0 {
            return Err(ConfigError::ValidationFailed(
                "worker_prefetch must be greater than 0".to_string(),
            ));
        }

        if self.retry_limit == 0 {
            return Err(ConfigError::ValidationFailed(
                "retry_limit must be greater than 0".to_string(),
            ));
        }

        if self.recognize_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "recognize_timeout_secs must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Returns the dequeue poll interval as a duration.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Returns the recognition timeout as a duration.
    pub fn recognize_timeout(&self) -> Duration {
        Duration::from_secs(self.recognize_timeout_secs)
    }

    /// Returns the shutdown timeout as a duration.
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// Returns a copy with the API key masked, for display.
    pub fn masked(&self) -> Self {
        let mut masked = self.clone();
        if !masked.api_key.is_empty() {
            masked.api_key = "********".to_string();
        }
        masked
    }

    /// Builder method to set the database URL.
    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = url.into();
        self
    }

    /// Builder method to set the Redis URL.
    pub fn with_redis_url(mut self, url: impl Into<String>) -> Self {
        self.redis_url = url.into();
        self
    }

    /// Builder method to set the queue name.
    pub fn with_queue_name(mut self, name: impl Into<String>) -> Self {
        self.queue_name = name.into();
        self
    }

    /// Builder method to set the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = key.into();
        self
    }

    /// Builder method to set the worker concurrency.
    pub fn with_worker_concurrency(mut self, n: usize) -> Self {
        self.worker_concurrency = n;
        self
    }

    /// Builder method to set the retry limit.
    pub fn with_retry_limit(mut self, limit: u32) -> Self {
        self.retry_limit = limit;
        self
    }
}

/// Parse an environment variable value into a type.
fn parse_env_value<T: std::str::FromStr>(value: &str, key: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("could not parse '{}'", value),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.queue_name, "ocr_tasks");
        assert_eq!(config.model_name, "qwen-vl-ocr");
        assert_eq!(config.worker_concurrency, 3);
        assert_eq!(config.worker_prefetch, 3);
        assert_eq!(config.retry_limit, 3);
        assert!(config.api_key.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = AppConfig::new()
            .with_database_url("postgres://test/db")
            .with_redis_url("redis://test:6380")
            .with_queue_name("my_queue")
            .with_api_key("secret")
            .with_worker_concurrency(8)
            .with_retry_limit(5);

        assert_eq!(config.database_url, "postgres://test/db");
        assert_eq!(config.redis_url, "redis://test:6380");
        assert_eq!(config.queue_name, "my_queue");
        assert_eq!(config.api_key, "secret");
        assert_eq!(config.worker_concurrency, 8);
        assert_eq!(config.retry_limit, 5);
    }

    #[test]
    fn test_validation_rejects_zero_workers() {
        let config = AppConfig::default().with_worker_concurrency(0);
        let result = config.validate();
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("worker_concurrency"));
    }

    #[test]
    fn test_validation_rejects_zero_retry_limit() {
        let config = AppConfig::default().with_retry_limit(0);
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("retry_limit"));
    }

    #[test]
    fn test_validation_rejects_empty_queue_name() {
        let config = AppConfig::default().with_queue_name("");
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("queue_name"));
    }

    #[test]
    fn test_durations() {
        let config = AppConfig::default();
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.recognize_timeout(), Duration::from_secs(120));
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_masked_hides_api_key() {
        let config = AppConfig::default().with_api_key("sk-very-secret");
        let masked = config.masked();

        assert_eq!(masked.api_key, "********");
        assert_eq!(config.api_key, "sk-very-secret");
    }

    #[test]
    fn test_masked_leaves_empty_key() {
        let masked = AppConfig::default().masked();
        assert!(masked.api_key.is_empty());
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("app_config.json");

        let config = AppConfig::load(&path).expect("load should create defaults");
        assert!(path.exists());
        assert_eq!(config.queue_name, "ocr_tasks");

        // A second load reads the file back.
        let reloaded = AppConfig::load(&path).expect("reload");
        assert_eq!(reloaded.queue_name, config.queue_name);
    }

    #[test]
    fn test_load_merges_missing_fields() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("app_config.json");
        std::fs::write(&path, r#"{"queue_name": "custom_queue"}"#).expect("write");

        let config = AppConfig::load(&path).expect("load");
        assert_eq!(config.queue_name, "custom_queue");
        // Unspecified fields fall back to defaults.
        assert_eq!(config.model_name, "qwen-vl-ocr");
        assert_eq!(config.worker_concurrency, 3);
    }

    #[test]
    fn test_parse_env_value() {
        let parsed: usize = parse_env_value("42", "TEST").expect("parse");
        assert_eq!(parsed, 42);

        let err = parse_env_value::<usize>("not-a-number", "TEST").unwrap_err();
        assert!(err.to_string().contains("TEST"));
    }
}
