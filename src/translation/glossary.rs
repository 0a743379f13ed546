/*!
 * Custom dictionary applied to texts before they are translated.
 *
 * The file format is one `source,target` pair per line. Blank lines and
 * lines starting with `#` are ignored, as is a leading `source,target`
 * header. Fields may be wrapped in double quotes, which lets them hold
 * commas; a doubled quote inside a quoted field stands for one quote.
 */

use std::fs;
use std::path::Path;

use crate::errors::ConfigurationError;

/// Ordered term substitutions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Glossary {
    /// (source, target), longest source first
    terms: Vec<(String, String)>,
}

impl Glossary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a glossary file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigurationError::Load {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        Self::parse(&content).map_err(|reason| ConfigurationError::Load {
            path: path.display().to_string(),
            reason,
        })
    }

    /// Parse glossary content; the error names the first bad line
    pub fn parse(content: &str) -> Result<Self, String> {
        let mut glossary = Self::new();

        for (index, line) in content.lines().enumerate() {
            let line = line.trim_start_matches('\u{feff}').trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((source, target)) = split_pair(line) else {
                return Err(format!("line {}: expected 'source,target'", index + 1));
            };
            let source = unquote(source);
            let target = unquote(target);

            if index == 0 && source.eq_ignore_ascii_case("source") && target.eq_ignore_ascii_case("target") {
                continue;
            }
            if source.is_empty() {
                return Err(format!("line {}: empty source term", index + 1));
            }

            glossary.add_term(source, target);
        }

        Ok(glossary)
    }

    /// Add or replace a term
    pub fn add_term(&mut self, source: impl Into<String>, target: impl Into<String>) {
        let source = source.into();
        let target = target.into();

        match self.terms.iter_mut().find(|(s, _)| *s == source) {
            Some(entry) => entry.1 = target,
            None => self.terms.push((source, target)),
        }
        // longest match wins when terms overlap
        self.terms
            .sort_by(|a, b| b.0.chars().count().cmp(&a.0.chars().count()).then_with(|| a.0.cmp(&b.0)));
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Replace every occurrence of a source term with its target.
    ///
    /// The text is scanned once from the left; at each position the longest
    /// matching term is replaced and scanning resumes after it, so a target
    /// is never rewritten by another term.
    pub fn apply(&self, text: &str) -> String {
        if self.terms.is_empty() {
            return text.to_string();
        }

        let mut result = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(c) = rest.chars().next() {
            match self.terms.iter().find(|(source, _)| rest.starts_with(source.as_str())) {
                Some((source, target)) => {
                    result.push_str(target);
                    rest = &rest[source.len()..];
                }
                None => {
                    result.push(c);
                    rest = &rest[c.len_utf8()..];
                }
            }
        }

        result
    }
}

/// Split a line at the first comma outside double quotes
fn split_pair(line: &str) -> Option<(&str, &str)> {
    let mut in_quotes = false;
    for (pos, c) in line.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => return Some((&line[..pos], &line[pos + 1..])),
            _ => {}
        }
    }
    None
}

fn unquote(field: &str) -> String {
    let field = field.trim();
    match field.strip_prefix('"').and_then(|f| f.strip_suffix('"')) {
        Some(inner) => inner.replace("\"\"", "\""),
        None => field.to_string(),
    }
}
