/*!
 * Core translation service implementation.
 *
 * This module contains the TranslationService struct, which turns one text
 * into its translation through a provider. It owns the call policy around
 * the provider: the whitespace short-circuit, glossary substitution, rate
 * limiting and retries with exponential backoff.
 */

use log::{debug, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use super::glossary::Glossary;
use crate::app_config::{Config, TranslationConfig};
use crate::errors::{ConfigurationError, TranslationServiceError};
use crate::providers::azure::AzureTranslator;
use crate::providers::{Provider, TranslationRequest};

/// Retry settings for transient provider failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub retry_count: u32,
    /// Delay before the first retry; doubled for each further retry
    pub backoff_base_ms: u64,
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1u64.checked_shl(retry.saturating_sub(1)).unwrap_or(u64::MAX);
        Duration::from_millis(self.backoff_base_ms.saturating_mul(factor))
    }
}

/// Spaces provider calls at least `min_interval` apart, across all callers
#[derive(Debug)]
struct RateLimiter {
    min_interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    fn per_minute(requests_per_minute: u32) -> Self {
        Self {
            min_interval: Duration::from_millis(60_000 / requests_per_minute.max(1) as u64),
            next_slot: Mutex::new(None),
        }
    }

    /// Reserve the next free slot and sleep until it
    async fn wait(&self) {
        let wait = {
            let mut next = self.next_slot.lock();
            let now = Instant::now();
            let slot = next.map_or(now, |n| n.max(now));
            *next = Some(slot + self.min_interval);
            slot - now
        };

        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
    }
}

/// Main translation service: one text in, one translation out
#[derive(Debug, Clone)]
pub struct TranslationService {
    /// Provider implementation
    provider: Arc<dyn Provider>,

    /// Retry settings
    pub retry: RetryPolicy,

    /// Glossary applied before every call
    glossary: Arc<Glossary>,

    /// Shared between clones so the limit holds for the whole run
    rate_limiter: Option<Arc<RateLimiter>>,
}

impl TranslationService {
    /// Create the service for the configured Azure Translator resource.
    ///
    /// Fails before any call is made when credentials are missing or the
    /// glossary file cannot be loaded.
    pub fn new(config: &Config) -> Result<Self, ConfigurationError> {
        let provider = AzureTranslator::from_config(&config.translator)?;
        let glossary = match &config.translation.glossary_path {
            Some(path) => Glossary::from_file(path)?,
            None => Glossary::new(),
        };

        Ok(Self::with_provider(Arc::new(provider), &config.translation).with_glossary(glossary))
    }

    /// Create a service around any provider
    pub fn with_provider(provider: Arc<dyn Provider>, settings: &TranslationConfig) -> Self {
        Self {
            provider,
            retry: RetryPolicy {
                retry_count: settings.retry_count,
                backoff_base_ms: settings.retry_backoff_ms,
            },
            glossary: Arc::new(Glossary::new()),
            rate_limiter: settings
                .rate_limit
                .filter(|rpm| *rpm > 0)
                .map(|rpm| Arc::new(RateLimiter::per_minute(rpm))),
        }
    }

    /// Use `glossary` for every following call
    pub fn with_glossary(mut self, glossary: Glossary) -> Self {
        self.glossary = Arc::new(glossary);
        self
    }

    pub fn glossary(&self) -> &Glossary {
        &self.glossary
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Translate a single text string.
    ///
    /// Empty and whitespace-only input is returned unchanged without calling
    /// the provider. Transient failures are retried; the returned error
    /// carries the number of attempts made.
    pub async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String, TranslationServiceError> {
        if text.trim().is_empty() {
            return Ok(text.to_string());
        }

        let request = TranslationRequest::new(self.glossary.apply(text), source_language, target_language);
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            if let Some(limiter) = &self.rate_limiter {
                limiter.wait().await;
            }

            match self.provider.translate(request.clone()).await {
                Ok(translated) => {
                    if attempt > 1 {
                        debug!("Translation succeeded on attempt {}", attempt);
                    }
                    return Ok(translated);
                }
                Err(e) if e.is_transient() && attempt <= self.retry.retry_count => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        "{} request failed (attempt {}/{}): {}. Retrying in {:?}",
                        self.provider.name(),
                        attempt,
                        self.retry.retry_count + 1,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    return Err(TranslationServiceError::from_provider(&e, attempt));
                }
            }
        }
    }
}
