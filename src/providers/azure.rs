use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;
use uuid::Uuid;

use crate::app_config::TranslatorConfig;
use crate::errors::{ConfigurationError, ProviderError};
use crate::providers::{Provider, TranslationRequest};

/// Azure Translator API version used for every call
const API_VERSION: &str = "3.0";

/// Azure Translator v3 client
#[derive(Debug, Clone)]
pub struct AzureTranslator {
    /// HTTP client for API requests
    client: Client,
    /// Subscription key
    api_key: String,
    /// Resource region
    region: String,
    /// `{endpoint}/translate`
    translate_url: Url,
}

/// One item of the request body
#[derive(Debug, Serialize)]
struct RequestItem<'a> {
    #[serde(rename = "Text")]
    text: &'a str,
}

/// One item of the response body
#[derive(Debug, Deserialize)]
pub struct TranslateResult {
    #[serde(default)]
    pub translations: Vec<Translation>,
}

/// A single translation of a response item
#[derive(Debug, Deserialize)]
pub struct Translation {
    pub text: String,
    #[serde(default)]
    pub to: Option<String>,
}

/// Error body returned on non-2xx responses
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<i64>,
    message: String,
}

impl AzureTranslator {
    /// Create a client from the translator settings.
    ///
    /// Fails when the key, region or endpoint is missing or the endpoint is
    /// not an http(s) URL.
    pub fn from_config(config: &TranslatorConfig) -> Result<Self, ConfigurationError> {
        if config.api_key.trim().is_empty() {
            return Err(ConfigurationError::MissingSetting("translator.api_key"));
        }
        if config.region.trim().is_empty() {
            return Err(ConfigurationError::MissingSetting("translator.region"));
        }
        if config.endpoint.trim().is_empty() {
            return Err(ConfigurationError::MissingSetting("translator.endpoint"));
        }

        let endpoint = config.endpoint_url()?;
        let translate_url = Url::parse(&format!("{}/translate", endpoint.as_str().trim_end_matches('/')))
            .map_err(|e| ConfigurationError::InvalidValue {
                field: "translator.endpoint",
                reason: e.to_string(),
            })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| ConfigurationError::InvalidValue {
                field: "translator",
                reason: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_key: config.api_key.trim().to_string(),
            region: config.region.trim().to_string(),
            translate_url,
        })
    }

    /// Full request URL for a language pair
    pub fn request_url(&self, source_language: &str, target_language: &str) -> Url {
        let mut url = self.translate_url.clone();
        url.query_pairs_mut()
            .append_pair("api-version", API_VERSION)
            .append_pair("from", source_language)
            .append_pair("to", target_language);
        url
    }

    /// Extract the first translation from a response body
    pub fn parse_response(body: &str) -> Result<String, ProviderError> {
        let results: Vec<TranslateResult> =
            serde_json::from_str(body).map_err(|e| ProviderError::ParseError(e.to_string()))?;

        results
            .into_iter()
            .next()
            .and_then(|r| r.translations.into_iter().next())
            .map(|t| t.text)
            .ok_or_else(|| ProviderError::ParseError("response has no translations".to_string()))
    }

    /// Best-effort message from an error response body
    fn error_message(body: &str) -> String {
        match serde_json::from_str::<ErrorEnvelope>(body) {
            Ok(envelope) => match envelope.error.code {
                Some(code) => format!("{} (code {})", envelope.error.message, code),
                None => envelope.error.message,
            },
            Err(_) if body.trim().is_empty() => "empty error response".to_string(),
            Err(_) => body.chars().take(200).collect(),
        }
    }
}

fn transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(e.to_string())
    } else if e.is_connect() {
        ProviderError::ConnectionError(e.to_string())
    } else {
        ProviderError::RequestFailed(e.to_string())
    }
}

#[async_trait]
impl Provider for AzureTranslator {
    async fn translate(&self, request: TranslationRequest) -> Result<String, ProviderError> {
        let url = self.request_url(&request.source_language, &request.target_language);
        let trace_id = Uuid::new_v4().to_string();
        let body = [RequestItem { text: &request.text }];

        debug!("Azure translate request {} ({} chars)", trace_id, request.text.chars().count());

        let response = self
            .client
            .post(url)
            .header("Ocp-Apim-Subscription-Key", &self.api_key)
            .header("Ocp-Apim-Subscription-Region", &self.region)
            .header("X-ClientTraceId", &trace_id)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let text = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            let message = Self::error_message(&text);
            error!("Azure Translator error ({}): {}", status, message);
            return Err(ProviderError::from_status(status.as_u16(), message));
        }

        Self::parse_response(&text)
    }

    fn name(&self) -> &str {
        "azure"
    }
}
