//! Helpers for reading the OOXML package: part access, relationships and
//! the element-path rules shared by the extractor and the reconstructor.

use bytes::Bytes;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::{Cursor, Read};
use zip::result::ZipError;
use zip::ZipArchive;

use crate::errors::ExtractionError;

/// Main presentation part
pub const PRESENTATION_PART: &str = "ppt/presentation.xml";

/// Relationship type suffix identifying slides
const SLIDE_REL_SUFFIX: &str = "/relationships/slide";

pub type PackageArchive = ZipArchive<Cursor<Bytes>>;

/// Open the package held in `bytes`
pub fn open(bytes: &Bytes) -> Result<PackageArchive, ZipError> {
    ZipArchive::new(Cursor::new(bytes.clone()))
}

/// Read a part as bytes. `Ok(None)` when the part does not exist.
pub fn read_part(archive: &mut PackageArchive, name: &str) -> Result<Option<Vec<u8>>, ExtractionError> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(ExtractionError::InvalidPackage(format!("{}: {}", name, e))),
    };

    let mut content = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut content)?;
    Ok(Some(content))
}

/// Read a part that must exist and must be UTF-8 XML
pub fn read_xml_part(archive: &mut PackageArchive, name: &str) -> Result<String, ExtractionError> {
    let content = read_part(archive, name)?.ok_or_else(|| ExtractionError::MissingPart(name.to_string()))?;
    String::from_utf8(content).map_err(|e| ExtractionError::MalformedXml {
        part: name.to_string(),
        reason: e.to_string(),
    })
}

/// One `<Relationship>` of a `.rels` part
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    pub external: bool,
}

impl Relationship {
    pub fn is_slide(&self) -> bool {
        self.rel_type.ends_with(SLIDE_REL_SUFFIX)
    }
}

/// Parse the content of a `.rels` part
pub fn parse_relationships(xml: &str) -> Result<Vec<Relationship>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut relationships = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Empty(ref e) | Event::Start(ref e) if e.local_name().as_ref() == b"Relationship" => {
                relationships.push(Relationship {
                    id: attr(e, b"Id").unwrap_or_default(),
                    rel_type: attr(e, b"Type").unwrap_or_default(),
                    target: attr(e, b"Target").unwrap_or_default(),
                    external: attr(e, b"TargetMode").is_some_and(|m| m == "External"),
                });
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(relationships)
}

/// Name of the `.rels` part describing `part`
pub fn rels_part_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}

/// Resolve a relationship target relative to the part that owns it
pub fn resolve_target(base_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = match base_part.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').collect(),
        None => Vec::new(),
    };

    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    segments.join("/")
}

/// Unescaped value of the attribute whose raw key is exactly `key`
pub fn attr(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// Unescaped value of a namespace-prefixed attribute (`r:embed`, `r:id`)
/// matched by local name, whatever prefix the document bound
pub fn prefixed_attr(e: &BytesStart<'_>, local: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.prefix().is_some() && a.key.local_name().as_ref() == local)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// Whether an element named `name` whose parent is `parent` opens a text run.
///
/// Only `a:r` directly inside a paragraph counts; field runs and math runs
/// are left alone.
pub fn is_run(name: &[u8], parent: Option<&[u8]>) -> bool {
    name == b"r" && parent == Some(b"p".as_slice())
}

/// Whether an element named `name` under the given path is the text node of a run
pub fn is_run_text(name: &[u8], parent: Option<&[u8]>) -> bool {
    name == b"t" && parent == Some(b"r".as_slice())
}
