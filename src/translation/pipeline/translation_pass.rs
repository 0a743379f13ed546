/*!
 * Translation pass: translates every text element of a document.
 *
 * Elements are grouped into units (one per distinct text when de-duplication
 * is on) and units are translated concurrently. Results are keyed by
 * `ElementId`, so completion order never affects attribution.
 */

use futures::stream::{self, StreamExt};
use log::{debug, error, warn};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::app_config::{Config, FailurePolicy};
use crate::deck::{Document, ElementId};
use crate::errors::TranslationServiceError;
use crate::translation::core::TranslationService;

/// Configuration for the translation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationPassConfig {
    /// Source language tag
    pub source_language: String,

    /// Target language tag
    pub target_language: String,

    /// Maximum units in flight
    pub concurrent_requests: usize,

    /// Translate identical texts once
    pub dedupe_identical: bool,

    /// What a failed unit does to the run
    pub failure_policy: FailurePolicy,
}

impl Default for TranslationPassConfig {
    fn default() -> Self {
        Self {
            source_language: "ja".to_string(),
            target_language: "en".to_string(),
            concurrent_requests: 4,
            dedupe_identical: true,
            failure_policy: FailurePolicy::Abort,
        }
    }
}

impl TranslationPassConfig {
    /// Take the pass settings from the application configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            source_language: config.source_language.trim().to_string(),
            target_language: config.target_language.trim().to_string(),
            concurrent_requests: config.translation.concurrent_requests.max(1),
            dedupe_identical: config.translation.dedupe_identical,
            failure_policy: config.translation.failure_policy,
        }
    }
}

/// A text element whose translation failed after retries.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementFailure {
    pub id: ElementId,
    pub error: TranslationServiceError,
}

/// Everything the pass produced for one document.
#[derive(Debug, Clone, Default)]
pub struct TranslationOutcome {
    /// Translation per element, in document order
    pub translations: BTreeMap<ElementId, String>,

    /// Failed elements, in document order (only under `KeepSource`)
    pub failures: Vec<ElementFailure>,

    /// Distinct provider requests issued (or planned, when aborted)
    pub unique_requests: usize,

    /// Whitespace-only elements never sent to translation
    pub skipped: usize,
}

impl TranslationOutcome {
    /// Write the results into the document.
    ///
    /// Failed elements keep their source text. Returns the failed ids.
    pub fn apply(&self, document: &mut Document) -> Vec<ElementId> {
        for (id, text) in &self.translations {
            if let Some(element) = document.element_mut(*id) {
                element.set_translation(text.clone());
            }
        }

        self.failures
            .iter()
            .map(|failure| {
                if let Some(element) = document.element_mut(failure.id) {
                    let source = element.source_text.clone();
                    element.set_translation(source);
                }
                failure.id
            })
            .collect()
    }
}

/// One provider request and the elements it answers for.
#[derive(Debug)]
struct Unit {
    text: String,
    ids: Vec<ElementId>,
}

/// Translation pass for translating document elements.
pub struct TranslationPass {
    config: TranslationPassConfig,
}

impl TranslationPass {
    /// Create a new translation pass with the given configuration.
    pub fn new(config: TranslationPassConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TranslationPassConfig {
        &self.config
    }

    fn plan(&self, document: &Document) -> (Vec<Unit>, usize) {
        let mut units: Vec<Unit> = Vec::new();
        let mut by_text: HashMap<&str, usize> = HashMap::new();
        let mut skipped = 0;

        for element in document.text_elements() {
            if !element.is_translatable() {
                skipped += 1;
                continue;
            }

            if self.config.dedupe_identical {
                if let Some(&index) = by_text.get(element.source_text.as_str()) {
                    units[index].ids.push(element.id);
                    continue;
                }
                by_text.insert(element.source_text.as_str(), units.len());
            }

            units.push(Unit {
                text: element.source_text.clone(),
                ids: vec![element.id],
            });
        }

        (units, skipped)
    }

    /// Translate every pending element of `document`.
    ///
    /// Under `Abort`, the first failure stops units that have not started and
    /// the failure of the earliest element is returned. Under `KeepSource`
    /// failures are collected in the outcome.
    pub async fn run(
        &self,
        service: &TranslationService,
        document: &Document,
        progress: Option<&(dyn Fn(usize, usize) + Send + Sync)>,
    ) -> Result<TranslationOutcome, ElementFailure> {
        let (units, skipped) = self.plan(document);
        let total: usize = units.iter().map(|u| u.ids.len()).sum();

        debug!(
            "Translating {} element(s) of {} in {} request(s), {} skipped",
            total,
            document.source_name,
            units.len(),
            skipped
        );

        let abort_flag = AtomicBool::new(false);
        let completed_count = AtomicUsize::new(0);
        let abort = &abort_flag;
        let completed = &completed_count;
        let abort_on_failure = self.config.failure_policy == FailurePolicy::Abort;
        let source_language = self.config.source_language.as_str();
        let target_language = self.config.target_language.as_str();

        let results: Vec<(usize, Option<Result<String, TranslationServiceError>>)> =
            stream::iter(units.iter().enumerate())
                .map(move |(index, unit)| async move {
                    if abort.load(Ordering::SeqCst) {
                        return (index, None);
                    }

                    let result = service.translate(&unit.text, source_language, target_language).await;
                    if result.is_err() && abort_on_failure {
                        abort.store(true, Ordering::SeqCst);
                    }

                    let done = completed.fetch_add(unit.ids.len(), Ordering::SeqCst) + unit.ids.len();
                    if let Some(callback) = progress {
                        callback(done, total);
                    }

                    (index, Some(result))
                })
                .buffer_unordered(self.config.concurrent_requests.max(1))
                .collect()
                .await;

        let mut outcome = TranslationOutcome {
            unique_requests: units.len(),
            skipped,
            ..TranslationOutcome::default()
        };

        let mut cancelled = 0;
        for (index, result) in results {
            let unit = &units[index];
            match result {
                Some(Ok(text)) => {
                    for id in &unit.ids {
                        outcome.translations.insert(*id, text.clone());
                    }
                }
                Some(Err(error)) => {
                    for id in &unit.ids {
                        outcome.failures.push(ElementFailure {
                            id: *id,
                            error: error.clone(),
                        });
                    }
                }
                None => cancelled += 1,
            }
        }
        outcome.failures.sort_by_key(|f| f.id);

        if abort_on_failure && !outcome.failures.is_empty() {
            if cancelled > 0 {
                debug!("{} request(s) cancelled after failure", cancelled);
            }
            let first = outcome.failures.swap_remove(0);
            error!("Translation of {} failed: {}", first.id, first.error);
            return Err(first);
        }

        for failure in &outcome.failures {
            warn!("Keeping source text for {}: {}", failure.id, failure.error);
        }

        Ok(outcome)
    }
}
