/*!
 * # slideshift - PowerPoint deck translation
 *
 * A Rust library for translating the text of `.pptx` decks while keeping
 * their layout, formatting and images untouched.
 *
 * ## Features
 *
 * - Extract text runs and pictures from a deck, with their layout metadata
 * - Translate text runs with Azure Translator:
 *   - Bounded concurrency and optional rate limiting
 *   - Retries with exponential backoff for transient failures
 *   - Identical texts translated once
 *   - Glossary of fixed terms
 * - Rebuild the deck with the translated text, byte-identical images and
 *   an atomically written, uniquely named output file
 * - BCP-47 / ISO 639 language tag validation
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `deck`: Deck model and the PPTX package codec:
 *   - `deck::model`: Documents, slides, text and image elements
 *   - `deck::extractor`: Reads a `.pptx` into a `Document`
 *   - `deck::reconstructor`: Writes a translated `Document` back out
 * - `translation`: Translation services:
 *   - `translation::core`: Retrying, rate-limited translation client
 *   - `translation::glossary`: Fixed-term substitution
 *   - `translation::pipeline`: Extract, translate and reconstruct state machine
 * - `providers`: Translation backends:
 *   - `providers::azure`: Azure Translator v3 client
 *   - `providers::mock`: Scriptable provider for tests
 * - `app_config`: Configuration management
 * - `app_controller`: Main application controller
 * - `file_utils`: File system operations and output naming
 * - `language_utils`: Language code utilities
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod deck;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod providers;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use deck::{DeckExtractor, DeckReconstructor, Document, ElementId, TextElement};
pub use errors::{
    ConfigurationError, ErrorKind, ExtractionError, PipelineError, ProviderError, ReconstructionError,
    TranslationServiceError,
};
pub use language_utils::{get_language_name, language_codes_match, normalize_to_part2t};
pub use translation::{DeckPipeline, PipelineState, RunReport, TranslationService};
