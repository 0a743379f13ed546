use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs;
use std::path::Path;
use url::Url;

use crate::errors::ConfigurationError;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Source language tag (`ja`, `zh-Hans`, ...)
    pub source_language: String,

    /// Target language tag
    pub target_language: String,

    /// Translator service connection settings
    #[serde(default)]
    pub translator: TranslatorConfig,

    /// Translation pass settings
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Output settings
    #[serde(default)]
    pub output: OutputConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Connection settings for the Azure Translator service
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TranslatorConfig {
    /// Subscription key
    #[serde(default = "String::new")]
    pub api_key: String,

    /// Azure region of the resource (`japaneast`, `global`, ...)
    #[serde(default = "String::new")]
    pub region: String,

    /// Service endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Timeout for a single request, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            region: String::new(),
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// What to do with an element whose translation failed after retries
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Fail the whole run, produce no output
    #[default]
    Abort,
    /// Keep the source text for the failed element and continue
    KeepSource,
}

/// Translation pass settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TranslationConfig {
    /// Maximum number of translation calls in flight
    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,

    /// Retry count for transient failures
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Base backoff for retries, doubled on every attempt (in milliseconds)
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Requests per minute, unlimited when absent
    #[serde(default)]
    pub rate_limit: Option<u32>,

    /// Translate identical strings only once per run
    #[serde(default = "default_true")]
    pub dedupe_identical: bool,

    /// Partial failure policy
    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// Optional glossary file (`source,target` per line)
    #[serde(default)]
    pub glossary_path: Option<String>,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            concurrent_requests: default_concurrent_requests(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            rate_limit: None,
            dedupe_identical: true,
            failure_policy: FailurePolicy::default(),
            glossary_path: None,
        }
    }
}

/// How output files are named
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutputNaming {
    /// Random UUID per run
    #[default]
    Unique,
    /// Hash of the source bytes plus a short random suffix
    ContentHash,
}

/// Output settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct OutputConfig {
    /// Output directory; the source file's directory when absent
    #[serde(default)]
    pub directory: Option<String>,

    /// Output file naming scheme
    #[serde(default)]
    pub naming: OutputNaming,
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Matching `log` filter
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_endpoint() -> String {
    "https://api.cognitive.microsofttranslator.com".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_concurrent_requests() -> usize {
    4
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load a configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let load_error = |reason: String| ConfigurationError::Load {
            path: path.display().to_string(),
            reason,
        };

        let content = fs::read_to_string(path).map_err(|e| load_error(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| load_error(e.to_string()))
    }

    /// Write the configuration as pretty-printed JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigurationError> {
        let path = path.as_ref();
        let save_error = |reason: String| ConfigurationError::Load {
            path: path.display().to_string(),
            reason,
        };

        let json = serde_json::to_string_pretty(self).map_err(|e| save_error(e.to_string()))?;
        fs::write(path, json).map_err(|e| save_error(e.to_string()))
    }

    /// Validate the configuration for consistency and required values.
    ///
    /// Called once before any work starts; a run never begins with an
    /// incomplete translator configuration.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        crate::language_utils::validate_language_code(&self.source_language)?;
        crate::language_utils::validate_language_code(&self.target_language)?;

        if self.translator.api_key.trim().is_empty() {
            return Err(ConfigurationError::MissingSetting("translator.api_key"));
        }
        if self.translator.region.trim().is_empty() {
            return Err(ConfigurationError::MissingSetting("translator.region"));
        }
        if self.translator.endpoint.trim().is_empty() {
            return Err(ConfigurationError::MissingSetting("translator.endpoint"));
        }
        self.translator.endpoint_url()?;

        if self.translation.concurrent_requests == 0 {
            return Err(ConfigurationError::InvalidValue {
                field: "translation.concurrent_requests",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.translation.rate_limit == Some(0) {
            return Err(ConfigurationError::InvalidValue {
                field: "translation.rate_limit",
                reason: "must be at least 1 request per minute".to_string(),
            });
        }
        if self.translator.timeout_secs == 0 {
            return Err(ConfigurationError::InvalidValue {
                field: "translator.timeout_secs",
                reason: "must be at least 1 second".to_string(),
            });
        }

        Ok(())
    }
}

impl TranslatorConfig {
    /// Parsed endpoint URL, which must be http(s)
    pub fn endpoint_url(&self) -> Result<Url, ConfigurationError> {
        let url = Url::parse(self.endpoint.trim()).map_err(|e| ConfigurationError::InvalidValue {
            field: "translator.endpoint",
            reason: e.to_string(),
        })?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ConfigurationError::InvalidValue {
                field: "translator.endpoint",
                reason: format!("unsupported scheme '{}'", other),
            }),
        }
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: "ja".to_string(),
            target_language: "en".to_string(),
            translator: TranslatorConfig::default(),
            translation: TranslationConfig::default(),
            output: OutputConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
