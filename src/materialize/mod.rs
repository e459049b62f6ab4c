//! Match materialization.
//!
//! Copies matched candidates into per-category subdirectories of the output
//! root. Destination names for the whole plan are resolved before any copy
//! begins, so no two copies ever target the same path; collisions against
//! existing files or other planned copies get a numeric suffix before the
//! extension. Copies run on a bounded blocking pool; a failed copy removes
//! its partial destination and is recorded without aborting the rest.

use crate::cancel::CancelHandle;
use crate::config::{CopyPolicy, EngineConfig};
use crate::report::{CopiedFile, CopyFailure, MatchRecord, RequiredCategory};
use filetime::FileTime;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;

#[derive(Debug, Error)]
pub enum MaterializeError {
    #[error("materialization cancelled")]
    Cancelled,
}

/// Copies performed and failures collected for the report.
#[derive(Debug, Clone, Default)]
pub struct MaterializeOutcome {
    pub copied: Vec<CopiedFile>,
    pub failures: Vec<CopyFailure>,
}

#[derive(Debug, Clone)]
struct PlannedCopy {
    category: String,
    source: PathBuf,
    destination: PathBuf,
}

enum CopyOutcome {
    Copied(CopiedFile),
    Failed(CopyFailure),
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct Materializer {
    workers: usize,
    policy: CopyPolicy,
    cancel_check_interval: usize,
}

impl Materializer {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            workers: config.copy_workers.max(1),
            policy: config.copy_policy,
            cancel_check_interval: config.cancel_check_interval.max(1),
        }
    }

    /// Copy every selected candidate of every non-empty record.
    pub async fn materialize(
        &self,
        matches: &[MatchRecord],
        categories: &[RequiredCategory],
        output_root: &Path,
        cancel: &CancelHandle,
    ) -> Result<MaterializeOutcome, MaterializeError> {
        let mut outcome = MaterializeOutcome::default();
        let planned = self.plan(matches, categories, output_root, &mut outcome);

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut handles = Vec::with_capacity(planned.len());
        let mut cancelled = false;

        for (seq, copy) in planned.into_iter().enumerate() {
            if seq % self.cancel_check_interval == 0 && cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .expect("semaphore is never closed");
            let cancel = cancel.clone();
            let key = (copy.source.clone(), copy.destination.clone());
            handles.push((
                key,
                tokio::task::spawn_blocking(move || {
                    let _permit = permit;
                    if cancel.is_cancelled() {
                        return CopyOutcome::Cancelled;
                    }
                    execute_copy(&copy)
                }),
            ));
        }

        for ((source, destination), handle) in handles {
            match handle.await {
                Ok(CopyOutcome::Copied(copied)) => outcome.copied.push(copied),
                Ok(CopyOutcome::Failed(failure)) => {
                    tracing::warn!(
                        source = %failure.source.display(),
                        error = %failure.error,
                        "copy failed"
                    );
                    outcome.failures.push(failure);
                }
                Ok(CopyOutcome::Cancelled) => cancelled = true,
                Err(join_error) => outcome.failures.push(CopyFailure {
                    source,
                    destination,
                    error: format!("copy task panicked: {join_error}"),
                }),
            }
        }

        if cancelled {
            return Err(MaterializeError::Cancelled);
        }

        tracing::info!(
            copied = outcome.copied.len(),
            failed = outcome.failures.len(),
            "materialized matches"
        );
        Ok(outcome)
    }

    /// Resolve every destination before any copy starts. Names are claimed
    /// per destination directory, against both the filesystem and the other
    /// planned copies.
    fn plan(
        &self,
        matches: &[MatchRecord],
        categories: &[RequiredCategory],
        output_root: &Path,
        outcome: &mut MaterializeOutcome,
    ) -> Vec<PlannedCopy> {
        let mut planned = Vec::new();
        let mut claimed: HashMap<PathBuf, HashSet<String>> = HashMap::new();

        for record in matches {
            if record.is_empty() {
                continue;
            }

            let take = match self.policy {
                CopyPolicy::All => record.files.len(),
                CopyPolicy::TopRanked => categories
                    .iter()
                    .find(|c| c.label == record.category)
                    .map(|c| c.min_expected.max(1))
                    .unwrap_or(1),
            };

            let dir = output_root.join(directory_name(&record.category));
            if let Err(error) = fs::create_dir_all(&dir) {
                for scored in record.files.iter().take(take) {
                    outcome.failures.push(CopyFailure {
                        source: scored.file.path.clone(),
                        destination: dir.clone(),
                        error: format!("failed to create category directory: {error}"),
                    });
                }
                continue;
            }

            let names = claimed.entry(dir.clone()).or_default();
            for scored in record.files.iter().take(take) {
                let destination = reserve_name(&dir, &scored.file.file_name, names);
                planned.push(PlannedCopy {
                    category: record.category.clone(),
                    source: scored.file.path.clone(),
                    destination,
                });
            }
        }

        planned
    }
}

/// All-or-nothing copy of one file; partial destinations are removed.
fn execute_copy(plan: &PlannedCopy) -> CopyOutcome {
    match try_copy(&plan.source, &plan.destination) {
        Ok(()) => {
            tracing::debug!(
                source = %plan.source.display(),
                destination = %plan.destination.display(),
                "copied file"
            );
            CopyOutcome::Copied(CopiedFile {
                category: plan.category.clone(),
                source: plan.source.clone(),
                destination: plan.destination.clone(),
            })
        }
        Err(error) => {
            let _ = fs::remove_file(&plan.destination);
            CopyOutcome::Failed(CopyFailure {
                source: plan.source.clone(),
                destination: plan.destination.clone(),
                error,
            })
        }
    }
}

fn try_copy(source: &Path, destination: &Path) -> Result<(), String> {
    fs::copy(source, destination).map_err(|e| format!("copy failed: {e}"))?;

    // carry the source's modification time over to the copy
    if let Ok(metadata) = fs::metadata(source) {
        if let Ok(modified) = metadata.modified() {
            let _ = filetime::set_file_mtime(destination, FileTime::from_system_time(modified));
        }
    }
    Ok(())
}

/// First free destination name: `name.pdf`, `name(1).pdf`, `name(2).pdf`, ...
fn reserve_name(dir: &Path, file_name: &str, claimed: &mut HashSet<String>) -> PathBuf {
    let (stem, extension) = split_name(file_name);

    let mut attempt = 0usize;
    loop {
        let name = if attempt == 0 {
            file_name.to_string()
        } else if extension.is_empty() {
            format!("{stem}({attempt})")
        } else {
            format!("{stem}({attempt}).{extension}")
        };

        let candidate = dir.join(&name);
        if !claimed.contains(&name) && !candidate.exists() {
            claimed.insert(name);
            return candidate;
        }
        attempt += 1;
    }
}

fn split_name(file_name: &str) -> (&str, &str) {
    match file_name.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() => (stem, extension),
        _ => (file_name, ""),
    }
}

/// Category labels are normalized words; keep them filesystem-safe.
fn directory_name(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}
