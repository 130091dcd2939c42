//! Configuration schema definitions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Root configuration for mlfl
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Answer-generation backend
    #[serde(default)]
    pub backend: BackendConfig,
    /// Conversation session settings
    #[serde(default)]
    pub session: SessionConfig,
    /// Transcript export settings
    #[serde(default)]
    pub export: ExportConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Directory for log files
    #[serde(default = "default_log_dir")]
    pub dir: String,
    /// Also write logs to stderr (off by default so the chat stays readable)
    #[serde(default)]
    pub console: bool,
    /// Module-specific overrides
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_log_dir() -> String {
    "~/.mlfl/logs".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            dir: default_log_dir(),
            console: false,
            overrides: HashMap::new(),
        }
    }
}

/// RAG backend connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the backend (`POST {api_base}/chat`)
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Optional bearer token
    #[serde(default)]
    pub api_key: Option<String>,
    /// Seconds to wait for an answer before reporting a failure
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_base() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Conversation session settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Prior messages sent as context with each question
    #[serde(default = "default_history_window")]
    pub history_window: usize,
    /// Metadata entries shown per citation chip
    #[serde(default = "default_metadata_preview")]
    pub metadata_preview: usize,
    /// Maximum characters of a citation excerpt in previews
    #[serde(default = "default_excerpt_chars")]
    pub excerpt_chars: usize,
}

fn default_history_window() -> usize {
    crate::session::manager::DEFAULT_HISTORY_WINDOW
}

fn default_metadata_preview() -> usize {
    3
}

fn default_excerpt_chars() -> usize {
    500
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            history_window: default_history_window(),
            metadata_preview: default_metadata_preview(),
            excerpt_chars: default_excerpt_chars(),
        }
    }
}

/// Transcript export settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Format used when none is given (markdown, plain-text)
    #[serde(default = "default_export_format")]
    pub default_format: String,
    /// Directory for exported transcripts
    #[serde(default = "default_export_dir")]
    pub dir: String,
}

fn default_export_format() -> String {
    "markdown".to_string()
}

fn default_export_dir() -> String {
    ".".to_string()
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            default_format: default_export_format(),
            dir: default_export_dir(),
        }
    }
}
