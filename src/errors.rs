/*!
 * Error types for the slideshift pipeline.
 *
 * Each pipeline stage has its own error enum, defined with the thiserror
 * crate. `PipelineError` wraps them into the single structured failure that
 * the orchestrator hands back to its caller.
 */

use std::fmt;
use thiserror::Error;

/// Errors that can occur when talking to a translation provider
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The request did not complete in time
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

impl ProviderError {
    /// Whether a retry of the same request is likely to succeed.
    ///
    /// Network failures, timeouts, 429 and 5xx responses are transient.
    /// Every other 4xx, authentication failures and malformed payloads are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RequestFailed(_) | Self::ConnectionError(_) | Self::Timeout(_) => true,
            Self::RateLimitExceeded(_) => true,
            Self::ApiError { status_code, .. } => *status_code == 429 || *status_code >= 500,
            Self::ParseError(_) | Self::AuthenticationError(_) => false,
        }
    }

    /// Upstream HTTP status, when the provider answered with one
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::ApiError { status_code, .. } => Some(*status_code),
            Self::RateLimitExceeded(_) => Some(429),
            Self::AuthenticationError(_) => Some(401),
            _ => None,
        }
    }

    /// Build a provider error from an HTTP status and response body
    pub fn from_status(status_code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status_code {
            401 | 403 => Self::AuthenticationError(message),
            429 => Self::RateLimitExceeded(message),
            _ => Self::ApiError { status_code, message },
        }
    }
}

/// Fatal configuration problems, detected before any work starts
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    /// A required setting is empty or absent
    #[error("Missing required setting: {0}")]
    MissingSetting(&'static str),

    /// A setting has a value that cannot be used
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue {
        /// Name of the offending setting
        field: &'static str,
        /// Why the value was rejected
        reason: String,
    },

    /// A language code is not a known ISO 639 code
    #[error("Invalid language code: {0}")]
    InvalidLanguage(String),

    /// A configuration or glossary file could not be loaded
    #[error("Failed to load {path}: {reason}")]
    Load {
        /// File that failed to load
        path: String,
        /// Underlying cause
        reason: String,
    },
}

/// Errors raised while reading a source deck
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// The source file could not be read
    #[error("Failed to read source deck: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not a ZIP package
    #[error("Not a valid PPTX package: {0}")]
    InvalidPackage(String),

    /// A part the deck requires is missing from the package
    #[error("Missing package part: {0}")]
    MissingPart(String),

    /// An XML part could not be parsed
    #[error("Malformed XML in {part}: {reason}")]
    MalformedXml {
        /// Package part being parsed
        part: String,
        /// Parser message
        reason: String,
    },
}

/// A translation call that failed after its retry budget
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Translation service error{}: {message} (after {attempts} attempt(s))", .status.map(|s| format!(" ({})", s)).unwrap_or_default())]
pub struct TranslationServiceError {
    /// Upstream HTTP status if one was received
    pub status: Option<u16>,
    /// Upstream message or local classification
    pub message: String,
    /// Number of provider calls made for this text
    pub attempts: u32,
    /// Whether the final failure was classified transient
    pub transient: bool,
}

impl TranslationServiceError {
    /// Wrap the last provider error of a call sequence
    pub fn from_provider(error: &ProviderError, attempts: u32) -> Self {
        Self {
            status: error.status_code(),
            message: error.to_string(),
            attempts,
            transient: error.is_transient(),
        }
    }
}

/// Errors raised while writing the translated deck
#[derive(Error, Debug)]
pub enum ReconstructionError {
    /// A non-empty text element has no translation
    #[error("Text element {0} has no translation")]
    MissingTranslation(String),

    /// A slide part does not contain the runs the model describes
    #[error("Slide part {part} has {found} text runs but the model has {expected}")]
    RunCountMismatch {
        /// Slide part name
        part: String,
        /// Runs in the document model
        expected: usize,
        /// Runs found in the package
        found: usize,
    },

    /// The source package could not be re-read
    #[error("Failed to read source package: {0}")]
    Package(String),

    /// XML rewriting failed
    #[error("Failed to rewrite {part}: {reason}")]
    Xml {
        /// Slide part being rewritten
        part: String,
        /// Writer or parser message
        reason: String,
    },

    /// Writing to the output sink failed
    #[error("Failed to write output: {0}")]
    Io(#[from] std::io::Error),
}

/// Taxonomy kind of a pipeline failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Extraction,
    Translation,
    Reconstruction,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Configuration => "configuration",
            Self::Extraction => "extraction",
            Self::Translation => "translation",
            Self::Reconstruction => "reconstruction",
        };
        write!(f, "{}", name)
    }
}

/// The one failure a pipeline run reports to its caller
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Error from configuration checks
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Error from the extractor
    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Error from the translation client
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationServiceError),

    /// Error from the reconstructor
    #[error("Reconstruction error: {0}")]
    Reconstruction(#[from] ReconstructionError),
}

impl PipelineError {
    /// Taxonomy kind of this failure
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Extraction(_) => ErrorKind::Extraction,
            Self::Translation(_) => ErrorKind::Translation,
            Self::Reconstruction(_) => ErrorKind::Reconstruction,
        }
    }

    /// Message suitable for an end user: no part names, element ids or
    /// upstream payloads.
    pub fn user_message(&self) -> String {
        match self {
            Self::Configuration(_) => {
                "The translator is not configured correctly. Check the API key, region and endpoint.".to_string()
            }
            Self::Extraction(_) => {
                "The file could not be read as a PowerPoint presentation.".to_string()
            }
            Self::Translation(e) if e.transient => {
                "The translation service is temporarily unavailable. Please try again later.".to_string()
            }
            Self::Translation(_) => "The translation service rejected the request.".to_string(),
            Self::Reconstruction(_) => "The translated presentation could not be written.".to_string(),
        }
    }
}
