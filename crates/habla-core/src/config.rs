//! Configuration structures for the speech service.

use serde::{Deserialize, Serialize};

/// Model loading configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model source: a local directory or an `hf://owner/repo` identifier.
    #[serde(default = "default_model_source")]
    pub source: String,
    /// Compute device preference ("auto", "cpu", "cuda", "metal").
    #[serde(default = "default_device")]
    pub device: String,
}

fn default_model_source() -> String {
    "models/es-css10-vits".to_string()
}

fn default_device() -> String {
    "auto".to_string()
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            source: default_model_source(),
            device: default_device(),
        }
    }
}

/// Scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Maximum number of queued jobs; submissions beyond this fail fast.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Number of worker threads. Each worker needs its own model replica;
    /// the default of 1 serializes all inference.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Default per-job deadline in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,
}

fn default_queue_capacity() -> usize {
    16
}

fn default_workers() -> usize {
    1
}

fn default_timeout_ms() -> u64 {
    60_000
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            workers: default_workers(),
            default_timeout_ms: default_timeout_ms(),
        }
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server bind address.
    #[serde(default = "default_host")]
    pub host: String,
    /// Server port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Graceful shutdown timeout in seconds.
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5055
}

fn default_shutdown_timeout_secs() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format ("text" or "json").
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheduler_config_default() {
        let config = SchedulerConfig::default();
        assert_eq!(config.queue_capacity, 16);
        assert_eq!(config.workers, 1);
        assert_eq!(config.default_timeout_ms, 60_000);
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 5055);
    }

    #[test]
    fn test_config_deserialize_with_defaults() {
        let config: SchedulerConfig = serde_json::from_str(r#"{"workers": 2}"#).unwrap();
        assert_eq!(config.workers, 2);
        assert_eq!(config.queue_capacity, 16);
    }
}
