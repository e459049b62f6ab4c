//! Per-run data model and the terminal report.
//!
//! All entities live for a single run and are owned by the orchestrator;
//! nothing persists between runs unless the caller stores the report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Immutable input to a run: the uploaded specification.
#[derive(Debug, Clone)]
pub struct SpecificationDocument {
    /// Raw bytes as submitted.
    pub bytes: Vec<u8>,
    /// Declared media type, e.g. `application/pdf`.
    pub media_type: String,
    /// Originating filename, kept for provenance only.
    pub file_name: String,
}

impl SpecificationDocument {
    pub fn new(
        bytes: Vec<u8>,
        media_type: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Self {
        Self {
            bytes,
            media_type: media_type.into(),
            file_name: file_name.into(),
        }
    }

    /// Build a document with the media type guessed from the filename.
    pub fn from_bytes(bytes: Vec<u8>, file_name: impl Into<String>) -> Self {
        let file_name = file_name.into();
        let media_type = mime_guess::from_path(&file_name)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Self {
            bytes,
            media_type,
            file_name,
        }
    }
}

/// A required document category extracted from the specification.
///
/// Unique by normalized label within one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequiredCategory {
    /// Normalized label, e.g. `certificate`.
    pub label: String,

    /// Synonym labels consulted during matching, in table order.
    pub synonyms: Vec<String>,

    /// Minimum number of files expected for this category.
    pub min_expected: usize,
}

/// A filesystem entry discovered during indexing.
///
/// Immutable snapshot taken at index time; staleness beyond the run is not
/// tracked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateFile {
    /// Absolute or root-relative path as discovered.
    pub path: PathBuf,

    /// Basename, as stored on disk.
    pub file_name: String,

    /// Size in bytes.
    pub size: u64,

    /// Normalized filename tokens used for scoring.
    pub tokens: Vec<String>,

    /// Last modification timestamp.
    pub modified_at: Option<DateTime<Utc>>,

    /// SHA-256 content digest, used to collapse identical files discovered
    /// under overlapping roots.
    pub sha256: String,
}

/// One candidate with its match score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredFile {
    pub file: CandidateFile,
    pub score: f64,
}

/// Scored association between one category and its candidates, best first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRecord {
    /// Label of the matched category.
    pub category: String,

    /// Qualifying candidates, sorted by score descending.
    pub files: Vec<ScoredFile>,
}

impl MatchRecord {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Provenance record for one materialized file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopiedFile {
    pub category: String,
    pub source: PathBuf,
    pub destination: PathBuf,
}

/// A copy that failed; recorded without aborting the remaining copies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyFailure {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub error: String,
}

/// An inaccessible path skipped during indexing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexWarning {
    pub path: PathBuf,
    pub message: String,
}

/// Run-level status of a finished report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every stage finished without recoverable incidents.
    Complete,
    /// The run finished but carries warnings, copy failures, or found no
    /// requirements at all.
    CompletedWithWarnings,
}

/// The terminal artifact of a run. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingReport {
    /// Unique id of this run.
    pub run_id: String,

    pub status: RunStatus,

    /// Filename of the specification that drove the run.
    pub specification: String,

    /// Categories extracted from the specification, in first-seen order.
    pub categories: Vec<RequiredCategory>,

    /// One record per category, same order as `categories`.
    pub matches: Vec<MatchRecord>,

    /// Labels of categories with zero qualifying candidates.
    pub unmatched: Vec<String>,

    /// Files actually copied, with provenance.
    pub copied: Vec<CopiedFile>,

    pub copied_count: usize,

    /// Per-file copy failures.
    pub copy_failures: Vec<CopyFailure>,

    /// Inaccessible paths skipped during indexing.
    pub index_warnings: Vec<IndexWarning>,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ProcessingReport {
    /// Persist the report as pretty-printed JSON.
    pub fn write_json(&self, path: &Path) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_type_guessed_from_filename() {
        let doc = SpecificationDocument::from_bytes(vec![1, 2, 3], "tender.pdf");
        assert_eq!(doc.media_type, "application/pdf");

        let doc = SpecificationDocument::from_bytes(vec![1, 2, 3], "notes.txt");
        assert_eq!(doc.media_type, "text/plain");
    }

    #[test]
    fn report_round_trips_through_json() {
        let report = ProcessingReport {
            run_id: "test-run".into(),
            status: RunStatus::Complete,
            specification: "tender.pdf".into(),
            categories: vec![RequiredCategory {
                label: "certificate".into(),
                synonyms: vec!["cert".into()],
                min_expected: 1,
            }],
            matches: vec![MatchRecord {
                category: "certificate".into(),
                files: Vec::new(),
            }],
            unmatched: vec!["certificate".into()],
            copied: Vec::new(),
            copied_count: 0,
            copy_failures: Vec::new(),
            index_warnings: Vec::new(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
        };

        let json = serde_json::to_string(&report).unwrap();
        let back: ProcessingReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.run_id, "test-run");
        assert_eq!(back.status, RunStatus::Complete);
        assert_eq!(back.categories[0].label, "certificate");
    }
}
