use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use chrono::Local;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::app_config::OutputNaming;

// @module: File and directory utilities

/// Characters kept in output file names
static UNSAFE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\p{L}\p{N}._-]+").expect("valid regex"));

/// Names produced by `output_file_name`
static OUTPUT_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\.[^.]+\.(?:[0-9a-f]{32}|[0-9a-f]{16}-[0-9a-f]{8})\.pptx$").expect("valid regex")
});

/// Longest stem kept in output file names, in characters
const MAX_STEM_CHARS: usize = 80;

/// Extension of the decks the pipeline reads and writes
pub const DECK_EXTENSION: &str = "pptx";

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> io::Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)?;
        }
        Ok(())
    }

    /// Make a file stem safe for any file system
    pub fn sanitize_stem(stem: &str) -> String {
        let cleaned = UNSAFE_CHARS.replace_all(stem.trim(), "_");
        let cleaned: String = cleaned.trim_matches(['_', '.']).chars().take(MAX_STEM_CHARS).collect();

        if cleaned.is_empty() {
            "deck".to_string()
        } else {
            cleaned
        }
    }

    /// First 16 hex digits of the SHA-256 of `bytes`
    pub fn content_digest(bytes: &[u8]) -> String {
        let digest = Sha256::digest(bytes);
        digest.iter().take(8).map(|b| format!("{:02x}", b)).collect()
    }

    // @generates: Unique output file name for a translated deck
    // @params: input_file, target_language, naming, source bytes
    pub fn output_file_name<P: AsRef<Path>>(
        input_file: P,
        target_language: &str,
        naming: OutputNaming,
        source: &[u8],
    ) -> String {
        let stem = input_file.as_ref().file_stem().unwrap_or_default().to_string_lossy();
        let run_id = match naming {
            OutputNaming::Unique => Uuid::new_v4().simple().to_string(),
            OutputNaming::ContentHash => {
                let suffix = Uuid::new_v4().simple().to_string();
                format!("{}-{}", Self::content_digest(source), &suffix[..8])
            }
        };

        format!(
            "{}.{}.{}.{}",
            Self::sanitize_stem(&stem),
            Self::sanitize_stem(target_language),
            run_id,
            DECK_EXTENSION
        )
    }

    // @generates: Output path for a translated deck
    pub fn generate_output_path<P1: AsRef<Path>, P2: AsRef<Path>>(
        input_file: P1,
        output_dir: P2,
        target_language: &str,
        naming: OutputNaming,
        source: &[u8],
    ) -> PathBuf {
        output_dir
            .as_ref()
            .join(Self::output_file_name(input_file, target_language, naming, source))
    }

    /// Append content to a log file with timestamp
    pub fn append_to_log_file<P: AsRef<Path>>(path: P, content: &str) -> io::Result<()> {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(file, "[{}] {}", timestamp, content)
    }

    /// Whether a file name looks like a deck this tool wrote
    pub fn is_translated_output(file_name: &str) -> bool {
        OUTPUT_NAME.is_match(file_name)
    }

    /// Find decks under a directory, sorted by path.
    ///
    /// PowerPoint lock files (`~$name.pptx`), hidden files and previous
    /// outputs are skipped.
    pub fn find_decks<P: AsRef<Path>>(dir: P) -> io::Result<Vec<PathBuf>> {
        let mut result = Vec::new();

        for entry in WalkDir::new(dir.as_ref()).follow_links(true) {
            let entry = entry.map_err(io::Error::from)?;
            let path = entry.path();
            let name = entry.file_name().to_string_lossy();

            if !path.is_file() || name.starts_with("~$") || name.starts_with('.') || Self::is_translated_output(&name) {
                continue;
            }

            if let Some(ext) = path.extension() {
                if ext.to_string_lossy().eq_ignore_ascii_case(DECK_EXTENSION) {
                    result.push(path.to_path_buf());
                }
            }
        }

        result.sort();
        Ok(result)
    }
}
