/*!
 * Mock provider implementations for testing.
 *
 * This module provides a mock provider that simulates different behaviors:
 * - `MockProvider::working()` - Always succeeds, dictionary lookup first
 * - `MockProvider::intermittent(n)` - Every nth request fails with a 503
 * - `MockProvider::failing(status)` - Always fails with the given status
 * - `MockProvider::shuffled(max_ms)` - Succeeds after a random delay
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::Rng;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::errors::ProviderError;
use crate::providers::{Provider, TranslationRequest};

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with a translation
    Working,
    /// Fails intermittently (every Nth request) with a 503
    Intermittent { fail_every: usize },
    /// Fails the first N requests with a 503, then succeeds
    FailFirst { failures: usize },
    /// Always fails with the given HTTP status
    Failing { status_code: u16 },
    /// Returns an empty translation
    Empty,
    /// Succeeds after a fixed delay
    Slow { delay_ms: u64 },
    /// Succeeds after a random delay in `0..=max_delay_ms`
    RandomDelay { max_delay_ms: u64 },
}

/// Mock provider for testing translation behavior
#[derive(Debug)]
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Request counter, shared between clones
    request_count: Arc<AtomicUsize>,
    /// Texts received, in arrival order, shared between clones
    received: Arc<Mutex<Vec<String>>>,
    /// Fixed translations; unknown texts get a tagged echo
    dictionary: Arc<HashMap<String, String>>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            received: Arc::new(Mutex::new(Vec::new())),
            dictionary: Arc::new(HashMap::new()),
        }
    }

    /// Create a working mock provider that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create an intermittently failing mock provider
    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every })
    }

    /// Create a mock that fails its first `failures` requests
    pub fn fail_first(failures: usize) -> Self {
        Self::new(MockBehavior::FailFirst { failures })
    }

    /// Create a failing mock provider that always errors
    pub fn failing(status_code: u16) -> Self {
        Self::new(MockBehavior::Failing { status_code })
    }

    /// Create a mock that returns empty translations
    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    /// Create a mock that answers in random order
    pub fn shuffled(max_delay_ms: u64) -> Self {
        Self::new(MockBehavior::RandomDelay { max_delay_ms })
    }

    /// Use fixed translations for the given source texts
    pub fn with_dictionary<I, K, V>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.dictionary = Arc::new(entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    /// Number of `translate` calls made so far
    pub fn call_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Texts received so far, in arrival order
    pub fn received_texts(&self) -> Vec<String> {
        self.received.lock().clone()
    }

    /// Translation the mock produces for a request when it succeeds
    pub fn expected_translation(&self, request: &TranslationRequest) -> String {
        match self.dictionary.get(&request.text) {
            Some(text) => text.clone(),
            None => format!("[{}] {}", request.target_language, request.text),
        }
    }

    fn unavailable(count: usize) -> ProviderError {
        ProviderError::ApiError {
            message: format!("Simulated service unavailable (request #{})", count + 1),
            status_code: 503,
        }
    }
}

impl Clone for MockProvider {
    fn clone(&self) -> Self {
        Self {
            behavior: self.behavior,
            request_count: Arc::clone(&self.request_count),
            received: Arc::clone(&self.received),
            dictionary: Arc::clone(&self.dictionary),
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn translate(&self, request: TranslationRequest) -> Result<String, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.received.lock().push(request.text.clone());

        match self.behavior {
            MockBehavior::Working => Ok(self.expected_translation(&request)),

            MockBehavior::Intermittent { fail_every } => {
                if fail_every > 0 && count % fail_every == fail_every - 1 {
                    Err(Self::unavailable(count))
                } else {
                    Ok(self.expected_translation(&request))
                }
            }

            MockBehavior::FailFirst { failures } => {
                if count < failures {
                    Err(Self::unavailable(count))
                } else {
                    Ok(self.expected_translation(&request))
                }
            }

            MockBehavior::Failing { status_code } => Err(ProviderError::from_status(
                status_code,
                format!("Simulated provider failure ({})", status_code),
            )),

            MockBehavior::Empty => Ok(String::new()),

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                Ok(self.expected_translation(&request))
            }

            MockBehavior::RandomDelay { max_delay_ms } => {
                let delay_ms = rand::rng().random_range(0..=max_delay_ms);
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                Ok(self.expected_translation(&request))
            }
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
