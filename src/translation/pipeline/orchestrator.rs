/*!
 * Pipeline orchestrator for translating one deck.
 *
 * The orchestrator drives the three phases of a run:
 * 1. Extracting: read the source package into a `Document`
 * 2. Translating: translate every text element through the service
 * 3. Reconstructing: write the translated package next to a temporary
 *    name and persist it under its final name only once complete
 */

use log::{debug, error, info};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use super::translation_pass::{TranslationPass, TranslationPassConfig};
use crate::app_config::{Config, OutputNaming};
use crate::deck::{DeckExtractor, DeckReconstructor, Document, ElementId};
use crate::errors::{PipelineError, ReconstructionError};
use crate::file_utils::FileManager;
use crate::translation::core::TranslationService;

/// Configuration for the deck pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Settings for the translation pass
    pub translation: TranslationPassConfig,

    /// Output directory; the source file's directory when absent
    pub output_dir: Option<PathBuf>,

    /// Output file naming scheme
    pub naming: OutputNaming,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            translation: TranslationPassConfig::default(),
            output_dir: None,
            naming: OutputNaming::Unique,
        }
    }
}

impl PipelineConfig {
    /// Take the pipeline settings from the application configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            translation: TranslationPassConfig::from_config(config),
            output_dir: config.output.directory.as_ref().map(PathBuf::from),
            naming: config.output.naming,
        }
    }

    /// Write outputs into `dir`.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }
}

/// States of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PipelineState {
    Idle,
    Extracting,
    Translating,
    Reconstructing,
    Done,
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Idle => "idle",
            PipelineState::Extracting => "extracting",
            PipelineState::Translating => "translating",
            PipelineState::Reconstructing => "reconstructing",
            PipelineState::Done => "done",
            PipelineState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Progress information during pipeline execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineProgress {
    /// The pipeline entered a new state
    State(PipelineState),
    /// `done` of `total` text elements have a translation result
    Translated { done: usize, total: usize },
}

/// Summary of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Path of the translated deck
    pub output_path: PathBuf,

    /// Number of slides
    pub slides: usize,

    /// Elements that received a translation
    pub translated_elements: usize,

    /// Whitespace-only elements left as is
    pub skipped_elements: usize,

    /// Distinct texts sent to the translation service
    pub unique_requests: usize,

    /// Elements that kept their source text after a failure
    pub failed_elements: Vec<ElementId>,

    /// Non-fatal problems found in the source deck
    pub warnings: Vec<String>,

    /// Wall time of the run
    pub duration: Duration,
}

type ProgressCallback = Box<dyn Fn(PipelineProgress) + Send + Sync>;

/// Translates one deck from a source path to an output path.
pub struct DeckPipeline {
    service: TranslationService,
    config: PipelineConfig,
    pass: TranslationPass,
    extractor: DeckExtractor,
    reconstructor: DeckReconstructor,
    state: PipelineState,
    progress: Option<ProgressCallback>,
}

impl DeckPipeline {
    /// Create a new pipeline.
    pub fn new(service: TranslationService, config: PipelineConfig) -> Self {
        let pass = TranslationPass::new(config.translation.clone());
        Self {
            service,
            config,
            pass,
            extractor: DeckExtractor::new(),
            reconstructor: DeckReconstructor::new(),
            state: PipelineState::Idle,
            progress: None,
        }
    }

    /// Report state changes and translation progress to `callback`.
    pub fn with_progress(mut self, callback: impl Fn(PipelineProgress) + Send + Sync + 'static) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    /// Current state; the final state of the last run once it returned.
    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn transition(&mut self, next: PipelineState) {
        debug!("Pipeline state: {} -> {}", self.state, next);
        self.state = next;
        if let Some(callback) = &self.progress {
            callback(PipelineProgress::State(next));
        }
    }

    /// Translate the deck at `input`.
    ///
    /// On success the translated deck exists at `RunReport::output_path`. On
    /// failure no output file is left behind.
    pub async fn run(&mut self, input: &Path) -> Result<RunReport, PipelineError> {
        let started = Instant::now();
        let result = self.execute(input, started).await;

        match &result {
            Ok(report) => {
                self.transition(PipelineState::Done);
                info!(
                    "Translated {} in {:.1}s: {} element(s), {} request(s) -> {}",
                    input.display(),
                    report.duration.as_secs_f64(),
                    report.translated_elements,
                    report.unique_requests,
                    report.output_path.display()
                );
            }
            Err(e) => {
                self.transition(PipelineState::Failed);
                error!("Failed to translate {} ({}): {}", input.display(), e.kind(), e);
            }
        }

        result
    }

    async fn execute(&mut self, input: &Path, started: Instant) -> Result<RunReport, PipelineError> {
        self.transition(PipelineState::Extracting);
        let mut document = self.extractor.extract_path(input)?;

        self.transition(PipelineState::Translating);
        let outcome = {
            let progress = &self.progress;
            let report_progress: &(dyn Fn(usize, usize) + Send + Sync) = &move |done: usize, total: usize| {
                if let Some(callback) = progress {
                    callback(PipelineProgress::Translated { done, total });
                }
            };
            self.pass
                .run(&self.service, &document, Some(report_progress))
                .await
                .map_err(|failure| PipelineError::Translation(failure.error))?
        };
        let failed_elements = outcome.apply(&mut document);

        self.transition(PipelineState::Reconstructing);
        let output_path = self.reconstruct(input, &document)?;

        Ok(RunReport {
            output_path,
            slides: document.slide_count(),
            translated_elements: outcome.translations.len(),
            skipped_elements: outcome.skipped,
            unique_requests: outcome.unique_requests,
            failed_elements,
            warnings: document.warnings.clone(),
            duration: started.elapsed(),
        })
    }

    /// Write `document` to a temporary file in the output directory and
    /// persist it under its final name.
    fn reconstruct(&self, input: &Path, document: &Document) -> Result<PathBuf, ReconstructionError> {
        let output_dir = match &self.config.output_dir {
            Some(dir) => dir.clone(),
            None => input
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
        };
        FileManager::ensure_dir(&output_dir)?;

        let output_path = FileManager::generate_output_path(
            input,
            &output_dir,
            &self.config.translation.target_language,
            self.config.naming,
            document.package(),
        );

        let temp = tempfile::Builder::new()
            .prefix(".slideshift-")
            .suffix(".partial")
            .tempfile_in(&output_dir)?;
        let temp = self.reconstructor.write_to(document, temp)?;
        temp.as_file().sync_all()?;
        temp.persist_noclobber(&output_path).map_err(|e| ReconstructionError::Io(e.error))?;

        debug!("Wrote {}", output_path.display());
        Ok(output_path)
    }
}
