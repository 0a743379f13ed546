/*!
 * Deck translation pipeline.
 *
 * A run goes through three phases:
 * 1. **Extracting**: read the source package into a document model
 * 2. **Translating**: translate every text element concurrently
 * 3. **Reconstructing**: write the translated package atomically
 */

pub mod orchestrator;
pub mod translation_pass;

// Re-export types used externally
pub use orchestrator::{DeckPipeline, PipelineConfig, PipelineProgress, PipelineState, RunReport};
pub use translation_pass::{ElementFailure, TranslationOutcome, TranslationPass, TranslationPassConfig};
