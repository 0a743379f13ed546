/*!
 * Translation of deck text.
 *
 * - `core`: the translation service (retries, rate limit, glossary)
 * - `glossary`: custom dictionary applied before each call
 * - `pipeline`: extract, translate and reconstruct one deck
 */

// Re-export main types for easier usage
pub use self::core::{RetryPolicy, TranslationService};
pub use self::glossary::Glossary;
pub use self::pipeline::{DeckPipeline, PipelineState, RunReport};

// Submodules
pub mod core;
pub mod glossary;
pub mod pipeline;
