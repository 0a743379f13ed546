/*!
 * Provider implementations for translation services.
 *
 * This module contains the clients the translation service can call:
 * - Azure: Azure Translator v3 REST API
 * - Mock: deterministic in-process provider for tests and benchmarks
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::errors::ProviderError;

/// One text to translate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
    /// The text to translate
    pub text: String,
    /// Source language tag
    pub source_language: String,
    /// Target language tag
    pub target_language: String,
}

impl TranslationRequest {
    pub fn new(text: impl Into<String>, source_language: impl Into<String>, target_language: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_language: source_language.into(),
            target_language: target_language.into(),
        }
    }
}

/// Common trait for all translation providers
///
/// Implementations are opaque text-in/text-out services. They make exactly
/// one upstream call per `translate`; retries and rate limiting belong to
/// the translation service.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Translate one text
    ///
    /// # Arguments
    /// * `request` - The text and language pair
    ///
    /// # Returns
    /// * `Result<String, ProviderError>` - The translated text or a classified error
    async fn translate(&self, request: TranslationRequest) -> Result<String, ProviderError>;

    /// Short provider name for logs
    fn name(&self) -> &str;
}

pub mod azure;
pub mod mock;
