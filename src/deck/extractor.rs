//! PPTX extractor: reads a package into a `Document`.

use bytes::Bytes;
use log::{debug, warn};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::path::Path;

use super::model::{Document, ElementId, ImageData, ImageElement, Position, Size, Slide, TextElement};
use super::package::{self, PackageArchive, Relationship, PRESENTATION_PART};
use crate::errors::ExtractionError;

/// Reads PPTX packages into the document model
#[derive(Debug, Default, Clone, Copy)]
pub struct DeckExtractor;

impl DeckExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Read and extract the deck at `path`
    pub fn extract_path(&self, path: &Path) -> Result<Document, ExtractionError> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "presentation.pptx".to_string());
        self.extract_bytes(&name, bytes)
    }

    /// Extract a deck from in-memory package bytes
    pub fn extract_bytes(&self, name: &str, bytes: impl Into<Bytes>) -> Result<Document, ExtractionError> {
        let bytes = bytes.into();
        let mut archive = package::open(&bytes).map_err(|e| ExtractionError::InvalidPackage(e.to_string()))?;
        let mut document = Document::new(name, bytes);

        let slide_parts = slide_order(&mut archive)?;
        debug!("Found {} slide(s) in {}", slide_parts.len(), name);

        for (index, part_name) in slide_parts.iter().enumerate() {
            let slide = extract_slide(&mut archive, index, part_name, &mut document.warnings)?;
            document.slides.push(slide);
        }

        Ok(document)
    }
}

/// Slide part names in presentation order, from `p:sldIdLst`
fn slide_order(archive: &mut PackageArchive) -> Result<Vec<String>, ExtractionError> {
    let presentation = package::read_xml_part(archive, PRESENTATION_PART)?;
    let rels_part = package::rels_part_for(PRESENTATION_PART);
    let rels_xml = package::read_xml_part(archive, &rels_part)?;
    let relationships = package::parse_relationships(&rels_xml).map_err(|e| ExtractionError::MalformedXml {
        part: rels_part.clone(),
        reason: e.to_string(),
    })?;

    let slide_rels: HashMap<&str, &Relationship> = relationships
        .iter()
        .filter(|r| r.is_slide())
        .map(|r| (r.id.as_str(), r))
        .collect();

    let mut reader = Reader::from_str(&presentation);
    reader.trim_text(true);
    let mut parts = Vec::new();

    loop {
        let event = reader.read_event().map_err(|e| ExtractionError::MalformedXml {
            part: PRESENTATION_PART.to_string(),
            reason: e.to_string(),
        })?;

        match event {
            Event::Empty(ref e) | Event::Start(ref e) if e.local_name().as_ref() == b"sldId" => {
                let rel_id = package::prefixed_attr(e, b"id").ok_or_else(|| ExtractionError::MalformedXml {
                    part: PRESENTATION_PART.to_string(),
                    reason: "slide entry without relationship id".to_string(),
                })?;
                let rel = slide_rels
                    .get(rel_id.as_str())
                    .ok_or_else(|| ExtractionError::MissingPart(format!("{} (relationship {})", rels_part, rel_id)))?;
                parts.push(package::resolve_target(PRESENTATION_PART, &rel.target));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(parts)
}

/// Kind of shape on the frame stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShapeKind {
    Shape,
    Picture,
    Other,
}

/// Layout collected for the innermost enclosing shape
#[derive(Debug)]
struct ShapeFrame {
    kind: ShapeKind,
    shape_id: Option<u32>,
    position: Option<Position>,
    size: Option<Size>,
    embed: Option<String>,
    link: Option<String>,
}

impl ShapeFrame {
    fn new(kind: ShapeKind) -> Self {
        Self {
            kind,
            shape_id: None,
            position: None,
            size: None,
            embed: None,
            link: None,
        }
    }
}

/// A run being collected
#[derive(Debug, Default)]
struct RunState {
    text: String,
    font_size: Option<f32>,
    color: Option<String>,
    font_name: Option<String>,
    bold: bool,
    italic: bool,
}

fn shape_kind(name: &[u8]) -> Option<ShapeKind> {
    match name {
        b"sp" => Some(ShapeKind::Shape),
        b"pic" => Some(ShapeKind::Picture),
        b"grpSp" | b"graphicFrame" | b"cxnSp" => Some(ShapeKind::Other),
        _ => None,
    }
}

fn parse_flag(value: Option<String>) -> bool {
    matches!(value.as_deref(), Some("1") | Some("true"))
}

fn parse_i64(e: &BytesStart<'_>, key: &[u8]) -> Option<i64> {
    package::attr(e, key).and_then(|v| v.parse().ok())
}

/// Color carried by a color element (`srgbClr`, `schemeClr`, ...)
fn color_value(name: &[u8], e: &BytesStart<'_>) -> Option<String> {
    let value = package::attr(e, b"val");
    match name {
        b"srgbClr" => value,
        b"schemeClr" => value.map(|v| format!("scheme:{}", v)),
        b"sysClr" => package::attr(e, b"lastClr").or_else(|| value.map(|v| format!("sys:{}", v))),
        b"prstClr" => value.map(|v| format!("preset:{}", v)),
        _ => None,
    }
}

/// Collects text runs and pictures while walking one slide part
struct SlideWalker<'a> {
    slide_index: usize,
    part_name: &'a str,
    path: Vec<Vec<u8>>,
    frames: Vec<ShapeFrame>,
    run: Option<RunState>,
    texts: Vec<TextElement>,
    pictures: Vec<(String, Position, Size)>,
    /// Relationship ids of pictures that only link to an external file
    linked: Vec<String>,
}

impl<'a> SlideWalker<'a> {
    fn new(slide_index: usize, part_name: &'a str) -> Self {
        Self {
            slide_index,
            part_name,
            path: Vec::new(),
            frames: Vec::new(),
            run: None,
            texts: Vec::new(),
            pictures: Vec::new(),
            linked: Vec::new(),
        }
    }

    fn parent(&self) -> Option<&[u8]> {
        self.path.last().map(|n| n.as_slice())
    }

    fn grandparent(&self) -> Option<&[u8]> {
        self.path.len().checked_sub(2).map(|i| self.path[i].as_slice())
    }

    fn in_run_text(&self) -> bool {
        self.parent()
            .is_some_and(|name| package::is_run_text(name, self.grandparent()))
    }

    /// Handle an opening or self-closing element
    fn open(&mut self, e: &BytesStart<'_>) {
        let local = e.local_name();
        let name = local.as_ref();

        if let Some(kind) = shape_kind(name) {
            self.frames.push(ShapeFrame::new(kind));
            return;
        }

        if package::is_run(name, self.parent()) {
            self.run = Some(RunState::default());
            return;
        }

        let in_run_props = self.parent() == Some(b"rPr".as_slice());
        let in_run_fill = self.parent() == Some(b"solidFill".as_slice()) && self.grandparent() == Some(b"rPr".as_slice());

        if let Some(run) = self.run.as_mut() {
            match name {
                b"rPr" => {
                    run.font_size = package::attr(e, b"sz").and_then(|v| v.parse::<f32>().ok()).map(|v| v / 100.0);
                    run.bold = parse_flag(package::attr(e, b"b"));
                    run.italic = parse_flag(package::attr(e, b"i"));
                }
                b"latin" if in_run_props => run.font_name = package::attr(e, b"typeface"),
                _ if in_run_fill => {
                    if let Some(color) = color_value(name, e) {
                        run.color = Some(color);
                    }
                }
                _ => {}
            }
            return;
        }

        let Some(frame) = self.frames.last_mut() else {
            return;
        };

        match name {
            b"cNvPr" if frame.shape_id.is_none() => {
                frame.shape_id = package::attr(e, b"id").and_then(|v| v.parse().ok());
            }
            b"off" if frame.position.is_none() => {
                if let (Some(x), Some(y)) = (parse_i64(e, b"x"), parse_i64(e, b"y")) {
                    frame.position = Some(Position::new(x, y));
                }
            }
            b"ext" if frame.size.is_none() => {
                // extension-list entries share the name but carry no extent
                if let (Some(cx), Some(cy)) = (parse_i64(e, b"cx"), parse_i64(e, b"cy")) {
                    frame.size = Some(Size::new(cx, cy));
                }
            }
            b"blip" if frame.kind == ShapeKind::Picture => {
                frame.embed = package::prefixed_attr(e, b"embed");
                frame.link = package::prefixed_attr(e, b"link");
            }
            _ => {}
        }
    }

    /// Handle a closing element
    fn close(&mut self, name: &[u8]) {
        if shape_kind(name).is_some() {
            if let Some(frame) = self.frames.pop() {
                if frame.kind == ShapeKind::Picture {
                    self.finish_picture(frame);
                }
            }
            return;
        }

        if package::is_run(name, self.parent()) {
            if let Some(run) = self.run.take() {
                self.finish_run(run);
            }
        }
    }

    fn finish_run(&mut self, run: RunState) {
        let frame = self.frames.last();
        let id = ElementId::new(self.slide_index, self.texts.len());
        let mut element = TextElement::new(id, run.text);
        element.position = frame.and_then(|f| f.position).unwrap_or_default();
        element.size = frame.and_then(|f| f.size);
        element.shape_id = frame.and_then(|f| f.shape_id);
        element.font_size = run.font_size;
        element.color = run.color;
        element.font_name = run.font_name;
        element.bold = run.bold;
        element.italic = run.italic;
        self.texts.push(element);
    }

    fn finish_picture(&mut self, frame: ShapeFrame) {
        let Some(embed) = frame.embed else {
            self.linked.extend(frame.link);
            return;
        };
        self.pictures
            .push((embed, frame.position.unwrap_or_default(), frame.size.unwrap_or_default()));
    }

    fn walk(&mut self, xml: &str) -> Result<(), ExtractionError> {
        let mut reader = Reader::from_str(xml);

        loop {
            let event = reader.read_event().map_err(|e| ExtractionError::MalformedXml {
                part: self.part_name.to_string(),
                reason: e.to_string(),
            })?;

            match event {
                Event::Start(ref e) => {
                    self.open(e);
                    self.path.push(e.local_name().as_ref().to_vec());
                }
                Event::Empty(ref e) => {
                    let local = e.local_name();
                    self.open(e);
                    // a self-closing element is opened and closed at once
                    self.path.push(local.as_ref().to_vec());
                    self.path.pop();
                    self.close(local.as_ref());
                }
                Event::End(ref e) => {
                    self.path.pop();
                    self.close(e.local_name().as_ref());
                }
                Event::Text(ref e) => {
                    if self.in_run_text() {
                        if let Some(run) = self.run.as_mut() {
                            let text = e.unescape().map_err(|err| ExtractionError::MalformedXml {
                                part: self.part_name.to_string(),
                                reason: err.to_string(),
                            })?;
                            run.text.push_str(&text);
                        }
                    }
                }
                Event::CData(ref e) => {
                    if self.in_run_text() {
                        if let Some(run) = self.run.as_mut() {
                            run.text.push_str(&String::from_utf8_lossy(e));
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(())
    }
}

/// Extract one slide part
fn extract_slide(
    archive: &mut PackageArchive,
    index: usize,
    part_name: &str,
    warnings: &mut Vec<String>,
) -> Result<Slide, ExtractionError> {
    let xml = package::read_xml_part(archive, part_name)?;
    let rels = slide_relationships(archive, part_name)?;

    let mut walker = SlideWalker::new(index, part_name);
    walker.walk(&xml)?;

    let mut slide = Slide::new(index + 1, part_name);
    slide.texts = std::mem::take(&mut walker.texts);

    for (rel_id, position, size) in std::mem::take(&mut walker.pictures) {
        match load_image(archive, &rels, part_name, &rel_id)? {
            Ok(data) => {
                let id = ElementId::new(index, slide.images.len());
                slide.images.push(ImageElement {
                    id,
                    rel_id,
                    position,
                    size,
                    data,
                });
            }
            Err(reason) => skip_image(warnings, index, &rel_id, &reason),
        }
    }

    for rel_id in std::mem::take(&mut walker.linked) {
        let target = rels.get(&rel_id).map_or("an unknown target", |r| r.target.as_str());
        skip_image(warnings, index, &rel_id, &format!("linked image {} is not embedded", target));
    }

    debug!(
        "Slide {} ({}): {} text run(s), {} image(s)",
        index + 1,
        part_name,
        slide.texts.len(),
        slide.images.len()
    );

    Ok(slide)
}

/// Relationships of a slide keyed by id; a slide without a `.rels` part has none
fn slide_relationships(
    archive: &mut PackageArchive,
    part_name: &str,
) -> Result<HashMap<String, Relationship>, ExtractionError> {
    let rels_part = package::rels_part_for(part_name);
    let Some(content) = package::read_part(archive, &rels_part)? else {
        return Ok(HashMap::new());
    };

    let xml = String::from_utf8_lossy(&content);
    let relationships = package::parse_relationships(&xml).map_err(|e| ExtractionError::MalformedXml {
        part: rels_part,
        reason: e.to_string(),
    })?;

    Ok(relationships.into_iter().map(|r| (r.id.clone(), r)).collect())
}

fn skip_image(warnings: &mut Vec<String>, index: usize, rel_id: &str, reason: &str) {
    let message = format!("Slide {}: skipped image {}: {}", index + 1, rel_id, reason);
    warn!("{}", message);
    warnings.push(message);
}

/// Load the bytes behind an image relationship.
///
/// The outer error is fatal (broken archive); the inner one is a reason to
/// skip the image.
fn load_image(
    archive: &mut PackageArchive,
    rels: &HashMap<String, Relationship>,
    part_name: &str,
    rel_id: &str,
) -> Result<Result<ImageData, String>, ExtractionError> {
    let Some(rel) = rels.get(rel_id) else {
        return Ok(Err("no such relationship".to_string()));
    };
    if rel.external {
        return Ok(Err(format!("linked image {} is not embedded", rel.target)));
    }

    let target = package::resolve_target(part_name, &rel.target);
    match package::read_part(archive, &target)? {
        Some(bytes) => Ok(Ok(ImageData {
            part_name: target,
            bytes: Bytes::from(bytes),
        })),
        None => Ok(Err(format!("media part {} not found", target))),
    }
}
