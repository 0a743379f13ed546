use isolang::Language;

use crate::errors::ConfigurationError;

/// Language utilities for language tag handling
///
/// Translation services take BCP 47 style tags (`ja`, `en`, `zh-Hans`,
/// `pt-PT`). Only the primary subtag is checked against ISO 639; script and
/// region subtags are passed through to the service untouched.
/// Language code type of a primary subtag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageCodeType {
    /// ISO 639-1 (2-letter) code
    Part1,
    /// ISO 639-2/T (3-letter) code
    Part2T,
    /// ISO 639-2/B (3-letter) code
    Part2B,
}

/// ISO 639-2/B codes that differ from their 639-2/T form
const BIBLIOGRAPHIC_CODES: &[(&str, &str)] = &[
    ("fre", "fra"),
    ("ger", "deu"),
    ("dut", "nld"),
    ("gre", "ell"),
    ("chi", "zho"),
    ("cze", "ces"),
    ("ice", "isl"),
    ("alb", "sqi"),
    ("arm", "hye"),
    ("baq", "eus"),
    ("bur", "mya"),
    ("per", "fas"),
    ("geo", "kat"),
    ("may", "msa"),
    ("mac", "mkd"),
    ("rum", "ron"),
    ("slo", "slk"),
    ("wel", "cym"),
];

/// Primary subtag of a language tag, lowercased (`zh-Hans` -> `zh`)
pub fn primary_subtag(tag: &str) -> String {
    tag.trim()
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

/// Validate a language tag by its primary subtag
pub fn validate_language_code(tag: &str) -> Result<LanguageCodeType, ConfigurationError> {
    let primary = primary_subtag(tag);

    match primary.len() {
        2 if Language::from_639_1(&primary).is_some() => Ok(LanguageCodeType::Part1),
        3 if Language::from_639_3(&primary).is_some() => Ok(LanguageCodeType::Part2T),
        3 if BIBLIOGRAPHIC_CODES.iter().any(|(b, _)| *b == primary) => Ok(LanguageCodeType::Part2B),
        _ => Err(ConfigurationError::InvalidLanguage(tag.to_string())),
    }
}

/// Normalize the primary subtag of a language tag to ISO 639-2/T
pub fn normalize_to_part2t(tag: &str) -> Result<String, ConfigurationError> {
    let primary = primary_subtag(tag);

    match validate_language_code(tag)? {
        LanguageCodeType::Part1 => Language::from_639_1(&primary)
            .map(|lang| lang.to_639_3().to_string())
            .ok_or_else(|| ConfigurationError::InvalidLanguage(tag.to_string())),
        LanguageCodeType::Part2T => Ok(primary),
        LanguageCodeType::Part2B => BIBLIOGRAPHIC_CODES
            .iter()
            .find(|(b, _)| *b == primary)
            .map(|(_, t)| t.to_string())
            .ok_or_else(|| ConfigurationError::InvalidLanguage(tag.to_string())),
    }
}

/// Check if two language tags name the same primary language
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    match (normalize_to_part2t(code1), normalize_to_part2t(code2)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Get the English language name for a tag
pub fn get_language_name(tag: &str) -> Result<String, ConfigurationError> {
    let normalized = normalize_to_part2t(tag)?;
    let lang = Language::from_639_3(&normalized).ok_or_else(|| ConfigurationError::InvalidLanguage(tag.to_string()))?;

    Ok(lang.to_name().to_string())
}
