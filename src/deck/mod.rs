/*!
 * Slide deck handling.
 *
 * - `model`: in-memory document model (slides, text runs, images)
 * - `package`: OOXML package access shared by reader and writer
 * - `extractor`: PPTX package -> `Document`
 * - `reconstructor`: translated `Document` -> PPTX package
 */

pub mod extractor;
pub mod model;
pub mod package;
pub mod reconstructor;

pub use self::extractor::DeckExtractor;
pub use self::model::{Document, ElementId, ImageData, ImageElement, Position, Size, Slide, TextElement};
pub use self::reconstructor::DeckReconstructor;
