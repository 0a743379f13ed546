/*!
 * Common test utilities for the slideshift test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use slideshift::app_config::{Config, FailurePolicy, TranslationConfig};
use slideshift::providers::mock::MockProvider;
use slideshift::translation::TranslationService;


/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Writes `bytes` to `filename` in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, bytes: &[u8]) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, bytes)?;
    Ok(file_path)
}

/// Lists the files of a directory, sorted by name
pub fn list_files(dir: &Path) -> Result<Vec<String>> {
    let mut names: Vec<String> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    Ok(names)
}

/// Translation settings without retry delays
pub fn fast_settings(retry_count: u32) -> TranslationConfig {
    TranslationConfig {
        retry_count,
        retry_backoff_ms: 1,
        ..TranslationConfig::default()
    }
}

/// A translation service backed by `provider`
pub fn mock_service(provider: &MockProvider, retry_count: u32) -> TranslationService {
    TranslationService::with_provider(Arc::new(provider.clone()), &fast_settings(retry_count))
}

/// A complete, valid configuration that never reaches a real endpoint
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.translator.api_key = "test-key".to_string();
    config.translator.region = "japaneast".to_string();
    config.translator.endpoint = "http://127.0.0.1:9".to_string();
    config.translation.retry_backoff_ms = 1;
    config
}

/// Same as `test_config`, keeping the source text of failed elements
pub fn keep_source_config() -> Config {
    let mut config = test_config();
    config.translation.failure_policy = FailurePolicy::KeepSource;
    config
}
