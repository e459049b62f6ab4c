//! Run orchestration.
//!
//! The orchestrator owns every per-run entity and is the only component with
//! knowledge of all stages. It sequences extraction, parsing, indexing,
//! matching and materialization as a small state machine, emits
//! stage-transition events, and assembles the terminal report. Callers get
//! either a complete report or a single terminal error, never a
//! partially-filled report without a status marker.

#[cfg(test)]
mod tests;

use crate::cancel::CancelHandle;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::extract;
use crate::index::{FolderIndexer, IndexError};
use crate::matching::Matcher;
use crate::materialize::{MaterializeError, Materializer};
use crate::progress::{ProgressSender, Stage};
use crate::report::{ProcessingReport, RunStatus, SpecificationDocument};
use crate::requirements::{self, RequirementError};
use chrono::Utc;
use std::path::PathBuf;
use uuid::Uuid;

/// The engine behind the single external entry point.
///
/// One engine may serve many runs; independent runs share no mutable state
/// and may execute concurrently.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Process one specification against the given search roots.
    pub async fn run(
        &self,
        document: SpecificationDocument,
        search_roots: Vec<PathBuf>,
        output_root: PathBuf,
        cancel: CancelHandle,
    ) -> Result<ProcessingReport, EngineError> {
        self.run_with_progress(document, search_roots, output_root, cancel, None)
            .await
    }

    /// Like [`Engine::run`], with stage transitions mirrored into a progress
    /// channel for UI display.
    pub async fn run_with_progress(
        &self,
        document: SpecificationDocument,
        search_roots: Vec<PathBuf>,
        output_root: PathBuf,
        cancel: CancelHandle,
        progress: Option<ProgressSender>,
    ) -> Result<ProcessingReport, EngineError> {
        let run_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();
        let reporter = StageReporter {
            run_id: run_id.clone(),
            progress,
        };

        tracing::info!(
            run_id = %run_id,
            specification = %document.file_name,
            roots = search_roots.len(),
            "starting run"
        );

        let SpecificationDocument {
            bytes,
            media_type,
            file_name,
        } = document;

        // --- ExtractingText ---
        self.begin(&reporter, Stage::ExtractingText, &cancel)?;
        if media_type != "application/pdf" {
            return self.fail(
                &reporter,
                EngineError::UnreadableDocument(format!(
                    "declared media type {media_type} is not application/pdf"
                )),
            );
        }
        if bytes.len() as u64 > self.config.max_document_bytes {
            return self.fail(
                &reporter,
                EngineError::UnreadableDocument(format!(
                    "specification is {} bytes, limit is {}",
                    bytes.len(),
                    self.config.max_document_bytes
                )),
            );
        }

        let pages = match tokio::task::spawn_blocking(move || extract::extract_pages(&bytes)).await
        {
            Ok(Ok(pages)) => pages,
            Ok(Err(error)) => {
                return self.fail(&reporter, EngineError::UnreadableDocument(error.to_string()))
            }
            Err(join_error) => {
                return self.fail(
                    &reporter,
                    EngineError::UnreadableDocument(format!(
                        "extraction task panicked: {join_error}"
                    )),
                )
            }
        };

        // --- ParsingRequirements ---
        self.begin(&reporter, Stage::ParsingRequirements, &cancel)?;
        let categories = match requirements::parse_requirements(&pages, &self.config.synonyms) {
            Ok(categories) => categories,
            Err(RequirementError::NoRequirementsFound) => {
                // degrade to an empty-result report instead of failing
                tracing::warn!(run_id = %run_id, "no document requirements found");
                Vec::new()
            }
        };

        // --- IndexingFolders ---
        self.begin(&reporter, Stage::IndexingFolders, &cancel)?;
        let indexer = FolderIndexer::new(&self.config);
        let catalog = match indexer.index(&search_roots, &cancel).await {
            Ok(catalog) => catalog,
            Err(IndexError::NoSearchRoots(message)) => {
                return self.fail(&reporter, EngineError::NoSearchRoots(message))
            }
            Err(IndexError::Cancelled) => {
                return self.cancelled(&reporter, Stage::IndexingFolders)
            }
        };

        // --- Matching ---
        self.begin(&reporter, Stage::Matching, &cancel)?;
        let matcher = Matcher::new(&self.config);
        let matches = matcher.match_categories(&categories, &catalog.files);

        // --- Materializing ---
        self.begin(&reporter, Stage::Materializing, &cancel)?;
        let materializer = Materializer::new(&self.config);
        let outcome = match materializer
            .materialize(&matches, &categories, &output_root, &cancel)
            .await
        {
            Ok(outcome) => outcome,
            Err(MaterializeError::Cancelled) => {
                return self.cancelled(&reporter, Stage::Materializing)
            }
        };

        // --- Complete ---
        reporter.enter(Stage::Complete);
        let unmatched: Vec<String> = matches
            .iter()
            .filter(|record| record.is_empty())
            .map(|record| record.category.clone())
            .collect();
        let clean = catalog.warnings.is_empty()
            && outcome.failures.is_empty()
            && !categories.is_empty();
        let status = if clean {
            RunStatus::Complete
        } else {
            RunStatus::CompletedWithWarnings
        };

        let report = ProcessingReport {
            run_id,
            status,
            specification: file_name,
            categories,
            matches,
            unmatched,
            copied_count: outcome.copied.len(),
            copied: outcome.copied,
            copy_failures: outcome.failures,
            index_warnings: catalog.warnings,
            started_at,
            finished_at: Utc::now(),
        };

        tracing::info!(
            run_id = %report.run_id,
            categories = report.categories.len(),
            copied = report.copied_count,
            unmatched = report.unmatched.len(),
            "run complete"
        );
        Ok(report)
    }

    /// Enter a working stage, honoring cancellation at the boundary.
    fn begin(
        &self,
        reporter: &StageReporter,
        stage: Stage,
        cancel: &CancelHandle,
    ) -> Result<(), EngineError> {
        reporter.enter(stage);
        if cancel.is_cancelled() {
            reporter.enter(Stage::Cancelled);
            return Err(EngineError::Cancelled { stage });
        }
        Ok(())
    }

    fn fail(
        &self,
        reporter: &StageReporter,
        error: EngineError,
    ) -> Result<ProcessingReport, EngineError> {
        tracing::warn!(error = %error, "run failed");
        reporter.enter(Stage::Failed);
        Err(error)
    }

    fn cancelled(
        &self,
        reporter: &StageReporter,
        stage: Stage,
    ) -> Result<ProcessingReport, EngineError> {
        reporter.enter(Stage::Cancelled);
        Err(EngineError::Cancelled { stage })
    }
}

/// Emits each transition to the log and, when attached, the progress channel.
struct StageReporter {
    run_id: String,
    progress: Option<ProgressSender>,
}

impl StageReporter {
    fn enter(&self, stage: Stage) {
        tracing::info!(run_id = %self.run_id, stage = %stage, "stage transition");
        if let Some(progress) = &self.progress {
            progress.emit(stage);
        }
    }
}
