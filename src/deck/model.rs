/*!
 * In-memory model of a slide deck.
 *
 * A `Document` owns its slides, a slide owns its text and image elements.
 * Text elements carry their layout metadata so it can be checked after a
 * round trip; image elements carry the original image bytes.
 */

use bytes::Bytes;
use serde::Serialize;
use std::fmt;

/// Identity of an element inside one document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ElementId {
    /// Zero-based slide index in presentation order
    pub slide: usize,
    /// Zero-based element index within its slide and kind
    pub index: usize,
}

impl ElementId {
    pub fn new(slide: usize, index: usize) -> Self {
        Self { slide, index }
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slide {} element {}", self.slide + 1, self.index + 1)
    }
}

/// Offset of a shape, in EMU (English Metric Units)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Position {
    pub x: i64,
    pub y: i64,
}

impl Position {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

/// Extent of a shape, in EMU
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Size {
    pub width: i64,
    pub height: i64,
}

impl Size {
    pub fn new(width: i64, height: i64) -> Self {
        Self { width, height }
    }
}

/// One text run of a slide
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextElement {
    /// Identity within the document
    pub id: ElementId,

    /// Text as found in the source deck
    pub source_text: String,

    /// Translated text, absent until translation succeeds
    pub translated_text: Option<String>,

    /// Offset of the owning shape
    pub position: Position,

    /// Extent of the owning shape, if it declares one
    pub size: Option<Size>,

    /// Font size in points; `None` when inherited from the layout
    pub font_size: Option<f32>,

    /// Opaque color value (`FF0000`, `scheme:accent1`, ...)
    pub color: Option<String>,

    /// Latin typeface, if set on the run
    pub font_name: Option<String>,

    pub bold: bool,
    pub italic: bool,

    /// `cNvPr@id` of the owning shape
    pub shape_id: Option<u32>,
}

impl TextElement {
    /// Create a text element with default layout metadata
    pub fn new(id: ElementId, source_text: impl Into<String>) -> Self {
        Self {
            id,
            source_text: source_text.into(),
            translated_text: None,
            position: Position::default(),
            size: None,
            font_size: None,
            color: None,
            font_name: None,
            bold: false,
            italic: false,
            shape_id: None,
        }
    }

    /// Whether this element has anything worth translating
    pub fn is_translatable(&self) -> bool {
        !self.source_text.trim().is_empty()
    }

    /// Text the reconstructor should emit for this element.
    ///
    /// Untranslatable elements always render their source text.
    pub fn output_text(&self) -> Option<&str> {
        if !self.is_translatable() {
            return Some(&self.source_text);
        }
        self.translated_text.as_deref()
    }

    /// Record the translation for this element
    pub fn set_translation(&mut self, text: impl Into<String>) {
        self.translated_text = Some(text.into());
    }
}

/// Image bytes and the package part they came from
#[derive(Debug, Clone, PartialEq)]
pub struct ImageData {
    /// Package part name, e.g. `ppt/media/image1.png`
    pub part_name: String,

    /// Raw bytes, never re-encoded
    pub bytes: Bytes,
}

/// One embedded picture of a slide
#[derive(Debug, Clone, PartialEq)]
pub struct ImageElement {
    pub id: ElementId,

    /// Relationship id used by the slide to reference the image
    pub rel_id: String,

    pub position: Position,
    pub size: Size,
    pub data: ImageData,
}

/// One slide, with its elements in source order
#[derive(Debug, Clone, PartialEq)]
pub struct Slide {
    /// 1-based slide number
    pub number: usize,

    /// Package part holding the slide XML
    pub part_name: String,

    pub texts: Vec<TextElement>,
    pub images: Vec<ImageElement>,
}

impl Slide {
    pub fn new(number: usize, part_name: impl Into<String>) -> Self {
        Self {
            number,
            part_name: part_name.into(),
            texts: Vec::new(),
            images: Vec::new(),
        }
    }
}

/// A whole deck as read from one source file
#[derive(Debug, Clone)]
pub struct Document {
    /// File name of the source deck
    pub source_name: String,

    /// Slides in presentation order
    pub slides: Vec<Slide>,

    /// Non-fatal problems found during extraction
    pub warnings: Vec<String>,

    /// The original package, re-emitted by the reconstructor
    package: Bytes,
}

impl Document {
    /// Create an empty document backed by the given package bytes
    pub fn new(source_name: impl Into<String>, package: Bytes) -> Self {
        Self {
            source_name: source_name.into(),
            slides: Vec::new(),
            warnings: Vec::new(),
            package,
        }
    }

    /// The original package bytes
    pub fn package(&self) -> &Bytes {
        &self.package
    }

    pub fn slide_count(&self) -> usize {
        self.slides.len()
    }

    /// All text elements in source order
    pub fn text_elements(&self) -> impl Iterator<Item = &TextElement> {
        self.slides.iter().flat_map(|s| s.texts.iter())
    }

    /// All text elements in source order, mutably
    pub fn text_elements_mut(&mut self) -> impl Iterator<Item = &mut TextElement> {
        self.slides.iter_mut().flat_map(|s| s.texts.iter_mut())
    }

    /// All image elements in source order
    pub fn image_elements(&self) -> impl Iterator<Item = &ImageElement> {
        self.slides.iter().flat_map(|s| s.images.iter())
    }

    /// Look up a text element by id
    pub fn element(&self, id: ElementId) -> Option<&TextElement> {
        self.slides.get(id.slide).and_then(|s| s.texts.get(id.index))
    }

    /// Look up a text element by id, mutably
    pub fn element_mut(&mut self, id: ElementId) -> Option<&mut TextElement> {
        self.slides.get_mut(id.slide).and_then(|s| s.texts.get_mut(id.index))
    }

    /// Ids of translatable elements that have no translation yet
    pub fn pending_translation(&self) -> Vec<ElementId> {
        self.text_elements()
            .filter(|e| e.is_translatable() && e.translated_text.is_none())
            .map(|e| e.id)
            .collect()
    }
}
