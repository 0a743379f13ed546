use anyhow::{anyhow, Context, Result};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};

use crate::app_config::Config;
use crate::deck::{DeckExtractor, TextElement};
use crate::errors::PipelineError;
use crate::file_utils::FileManager;
use crate::translation::pipeline::{DeckPipeline, PipelineConfig, PipelineProgress, RunReport};
use crate::translation::TranslationService;

// @module: Application controller for deck processing

/// Name of the issues log written next to translated decks
const ISSUES_LOG: &str = "slideshift.issues.log";

/// Outcome of a folder run
#[derive(Debug, Default)]
pub struct FolderSummary {
    /// Reports of the decks that were translated
    pub reports: Vec<RunReport>,
    /// Decks that failed, with the user-facing reason
    pub failures: Vec<(PathBuf, String)>,
}

/// Main application controller for deck translation
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Translation service shared by every run
    service: TranslationService,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate().context("Configuration validation failed")?;
        let service = TranslationService::new(&config).context("Failed to create translation service")?;

        Ok(Self { config, service })
    }

    /// Create a controller around an existing translation service
    pub fn with_service(config: Config, service: TranslationService) -> Self {
        Self { config, service }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Translate one deck
    pub async fn run(&self, input_file: PathBuf, output_dir: Option<PathBuf>) -> Result<RunReport> {
        let multi_progress = MultiProgress::new();
        self.run_with_progress(&input_file, output_dir, &multi_progress).await
    }

    /// Run the controller with progress reporting
    async fn run_with_progress(
        &self,
        input_file: &Path,
        output_dir: Option<PathBuf>,
        multi_progress: &MultiProgress,
    ) -> Result<RunReport> {
        if !FileManager::file_exists(input_file) {
            return Err(anyhow!("Input file does not exist: {:?}", input_file));
        }

        let mut pipeline_config = PipelineConfig::from_config(&self.config);
        if let Some(dir) = output_dir {
            pipeline_config = pipeline_config.with_output_dir(dir);
        }

        let progress_bar = multi_progress.add(ProgressBar::new(0));
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} elements ({percent}%) {msg}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(style.progress_chars("#>-"));

        let pb = progress_bar.clone();
        let mut pipeline = DeckPipeline::new(self.service.clone(), pipeline_config).with_progress(move |progress| {
            match progress {
                PipelineProgress::State(state) => pb.set_message(state.to_string()),
                PipelineProgress::Translated { done, total } => {
                    pb.set_length(total as u64);
                    pb.set_position(done as u64);
                }
            }
        });

        info!(
            "Translating {} ({} -> {}) with {}",
            input_file.display(),
            self.config.source_language,
            self.config.target_language,
            self.service.provider_name()
        );

        let result = pipeline.run(input_file).await;
        progress_bar.finish_and_clear();

        match result {
            Ok(report) => {
                self.write_issues(&report);
                info!(
                    "Success: {} ({} slide(s) in {})",
                    report.output_path.display(),
                    report.slides,
                    Self::format_duration(report.duration)
                );
                Ok(report)
            }
            Err(e) => {
                let message = e.user_message();
                Err(anyhow::Error::new(e).context(message))
            }
        }
    }

    /// Append warnings and kept-source elements of a run to the issues log
    fn write_issues(&self, report: &RunReport) {
        if report.warnings.is_empty() && report.failed_elements.is_empty() {
            return;
        }

        let log_dir = report.output_path.parent().unwrap_or(Path::new("."));
        let log_path = log_dir.join(ISSUES_LOG);
        let mut lines = vec![format!("Output: {}", report.output_path.display())];
        lines.extend(report.warnings.iter().map(|w| format!("WARN {}", w)));
        lines.extend(
            report
                .failed_elements
                .iter()
                .map(|id| format!("KEPT SOURCE {}", id)),
        );

        if let Err(e) = FileManager::append_to_log_file(&log_path, &lines.join("\n")) {
            warn!("Failed to write issues log: {}", e);
        } else {
            info!("Issues written to {}", log_path.display());
        }
    }

    // Format duration in a human-readable format (HH:MM:SS)
    fn format_duration(duration: std::time::Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }

    /// Run the workflow in folder mode, translating every deck under a directory.
    ///
    /// A failed deck does not stop the others.
    pub async fn run_folder(&self, input_dir: PathBuf, output_dir: Option<PathBuf>) -> Result<FolderSummary> {
        if !FileManager::dir_exists(&input_dir) {
            return Err(anyhow!("Input directory does not exist: {:?}", input_dir));
        }

        let decks = FileManager::find_decks(&input_dir)
            .with_context(|| format!("Failed to scan directory: {:?}", input_dir))?;
        if decks.is_empty() {
            return Err(anyhow!("No .pptx files found in directory: {:?}", input_dir));
        }

        let multi_progress = MultiProgress::new();
        let folder_pb = multi_progress.add(ProgressBar::new(decks.len() as u64));
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files ({percent}%) {msg}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        folder_pb.set_style(style.progress_chars("#>-"));

        let mut summary = FolderSummary::default();

        for deck in &decks {
            let file_name = deck
                .file_name()
                .map(|f| f.to_string_lossy().to_string())
                .unwrap_or_else(|| "unknown".to_string());
            folder_pb.set_message(format!("Processing: {}", file_name));

            match self.run_with_progress(deck, output_dir.clone(), &multi_progress).await {
                Ok(report) => summary.reports.push(report),
                Err(e) => {
                    debug!("{}: {:#}", file_name, e);
                    error!("Error processing file {}: {}", file_name, user_facing_message(&e));
                    summary.failures.push((deck.clone(), e.to_string()));
                }
            }

            folder_pb.inc(1);
        }

        folder_pb.finish_with_message("Folder processing complete");
        info!(
            "Folder processing completed: {} translated, {} failed",
            summary.reports.len(),
            summary.failures.len()
        );

        Ok(summary)
    }
}

/// The message to show a user for an application error.
///
/// Pipeline failures map to their user message; part names, parser output
/// and upstream details stay in the cause chain.
pub fn user_facing_message(error: &anyhow::Error) -> String {
    match error.downcast_ref::<PipelineError>() {
        Some(pipeline_error) => pipeline_error.user_message(),
        None => error.to_string(),
    }
}

/// Extract the text elements of a deck without translating it
pub fn extract_texts(input_file: &Path) -> Result<Vec<TextElement>> {
    let document = DeckExtractor::new()
        .extract_path(input_file)
        .with_context(|| format!("Failed to read {:?}", input_file))?;

    Ok(document.text_elements().cloned().collect())
}
