//! PPTX reconstructor: writes a translated `Document` back into a package.
//!
//! Every entry of the source package is re-emitted in its original order and
//! with its original compression method. Slide parts get the text of their
//! runs replaced and media parts referenced by image elements are written
//! from the element bytes. Everything else is copied without recompression.

use log::debug;
use quick_xml::events::{BytesText, Event};
use quick_xml::{Reader, Writer};
use std::collections::HashMap;
use std::io::{Cursor, Read, Seek, Write};
use zip::write::FileOptions;
use zip::ZipWriter;

use super::model::{Document, ImageData, Slide};
use super::package;
use crate::errors::ReconstructionError;

/// Writes documents back into PPTX packages
#[derive(Debug, Default, Clone, Copy)]
pub struct DeckReconstructor;

impl DeckReconstructor {
    pub fn new() -> Self {
        Self
    }

    /// Reconstruct `document` into an in-memory package
    pub fn to_bytes(&self, document: &Document) -> Result<Vec<u8>, ReconstructionError> {
        let cursor = self.write_to(document, Cursor::new(Vec::new()))?;
        Ok(cursor.into_inner())
    }

    /// Reconstruct `document` into `sink` and hand the sink back.
    ///
    /// Nothing is written when a translatable element has no translation.
    pub fn write_to<W: Write + Seek>(&self, document: &Document, sink: W) -> Result<W, ReconstructionError> {
        check_translations(document)?;

        let slides: HashMap<&str, &Slide> = document.slides.iter().map(|s| (s.part_name.as_str(), s)).collect();
        let images: HashMap<&str, &ImageData> = document
            .image_elements()
            .map(|i| (i.data.part_name.as_str(), &i.data))
            .collect();

        let mut archive = package::open(document.package()).map_err(|e| ReconstructionError::Package(e.to_string()))?;
        let mut writer = ZipWriter::new(sink);

        for index in 0..archive.len() {
            let mut entry = archive
                .by_index(index)
                .map_err(|e| ReconstructionError::Package(e.to_string()))?;
            let name = entry.name().to_string();

            let options = FileOptions::default()
                .compression_method(entry.compression())
                .last_modified_time(entry.last_modified());

            let data = if let Some(slide) = slides.get(name.as_str()) {
                let mut content = Vec::with_capacity(entry.size() as usize);
                entry
                    .read_to_end(&mut content)
                    .map_err(|e| ReconstructionError::Package(format!("{}: {}", name, e)))?;
                drop(entry);
                rewrite_slide(&name, &content, slide)?
            } else if let Some(image) = images.get(name.as_str()) {
                drop(entry);
                image.bytes.to_vec()
            } else {
                // untouched parts keep their compressed bytes
                writer.raw_copy_file(entry).map_err(write_error)?;
                continue;
            };

            writer.start_file(name, options).map_err(write_error)?;
            writer.write_all(&data)?;
        }

        let sink = writer.finish().map_err(write_error)?;
        debug!("Reconstructed {} with {} slide(s)", document.source_name, document.slide_count());
        Ok(sink)
    }
}

fn write_error(error: zip::result::ZipError) -> ReconstructionError {
    match error {
        zip::result::ZipError::Io(e) => ReconstructionError::Io(e),
        other => ReconstructionError::Io(std::io::Error::other(other)),
    }
}

fn check_translations(document: &Document) -> Result<(), ReconstructionError> {
    match document.text_elements().find(|e| e.output_text().is_none()) {
        Some(missing) => Err(ReconstructionError::MissingTranslation(missing.id.to_string())),
        None => Ok(()),
    }
}

/// Replace the text of every run of a slide part with its output text
fn rewrite_slide(part: &str, content: &[u8], slide: &Slide) -> Result<Vec<u8>, ReconstructionError> {
    let unchanged = slide
        .texts
        .iter()
        .all(|e| e.output_text() == Some(e.source_text.as_str()));
    if unchanged {
        return Ok(content.to_vec());
    }

    let xml_error = |reason: String| ReconstructionError::Xml {
        part: part.to_string(),
        reason,
    };

    let xml = std::str::from_utf8(content).map_err(|e| xml_error(e.to_string()))?;
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::with_capacity(content.len()));

    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut runs_seen = 0usize;
    // replacement for the run currently open, if any
    let mut replacement: Option<&str> = None;
    let mut text_written = false;

    loop {
        let event = reader.read_event().map_err(|e| xml_error(e.to_string()))?;
        let parent = path.last().map(|n| n.as_slice());

        let passthrough = match event {
            Event::Start(ref e) => {
                let name = e.local_name().as_ref().to_vec();
                if package::is_run(&name, parent) {
                    replacement = slide.texts.get(runs_seen).and_then(|t| t.output_text());
                    runs_seen += 1;
                } else if package::is_run_text(&name, parent) {
                    text_written = false;
                }
                path.push(name);
                true
            }
            Event::Empty(ref e) => {
                let local = e.local_name();
                let name = local.as_ref();
                if package::is_run(name, parent) {
                    runs_seen += 1;
                    true
                } else if package::is_run_text(name, parent) && replacement.is_some_and(|t| !t.is_empty()) {
                    let text = replacement.unwrap_or_default();
                    writer
                        .write_event(Event::Start(e.clone()))
                        .and_then(|_| writer.write_event(Event::Text(BytesText::new(text))))
                        .and_then(|_| writer.write_event(Event::End(e.to_end())))
                        .map_err(|err| xml_error(err.to_string()))?;
                    text_written = true;
                    false
                } else {
                    true
                }
            }
            Event::Text(_) | Event::CData(_) if in_run_text(&path) && replacement.is_some() => {
                if !text_written {
                    let text = replacement.unwrap_or_default();
                    writer
                        .write_event(Event::Text(BytesText::new(text)))
                        .map_err(|err| xml_error(err.to_string()))?;
                    text_written = true;
                }
                false
            }
            Event::End(ref e) => {
                path.pop();
                let parent = path.last().map(|n| n.as_slice());
                let local = e.local_name();
                let name = local.as_ref();
                if package::is_run_text(name, parent) && !text_written {
                    if let Some(text) = replacement.filter(|t| !t.is_empty()) {
                        writer
                            .write_event(Event::Text(BytesText::new(text)))
                            .map_err(|err| xml_error(err.to_string()))?;
                    }
                    text_written = true;
                } else if package::is_run(name, parent) {
                    replacement = None;
                }
                true
            }
            Event::Eof => break,
            _ => true,
        };

        if passthrough {
            writer.write_event(event).map_err(|e| xml_error(e.to_string()))?;
        }
    }

    if runs_seen != slide.texts.len() {
        return Err(ReconstructionError::RunCountMismatch {
            part: part.to_string(),
            expected: slide.texts.len(),
            found: runs_seen,
        });
    }

    Ok(writer.into_inner())
}

fn in_run_text(path: &[Vec<u8>]) -> bool {
    match path {
        [.., parent, current] => package::is_run_text(current, Some(parent.as_slice())),
        _ => false,
    }
}
