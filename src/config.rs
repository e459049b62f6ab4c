//! Engine configuration.
//!
//! Every knob has a working default; callers tune precision/recall and
//! resource bounds without code changes.

use crate::requirements::SynonymTable;
use serde::{Deserialize, Serialize};

/// Default minimum score for a candidate to qualify as a match.
pub const DEFAULT_SCORE_THRESHOLD: f64 = 0.35;

/// Default ceiling on specification size (16 MiB).
pub const DEFAULT_MAX_DOCUMENT_BYTES: u64 = 16 * 1024 * 1024;

/// What to copy when a category has several qualifying candidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CopyPolicy {
    /// Copy every qualifying candidate.
    #[default]
    All,
    /// Copy only the best `min_expected` candidates per category, treating
    /// the rest as alternatives.
    TopRanked,
}

/// Tunables for a run.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Minimum match score for a candidate to be kept.
    pub score_threshold: f64,

    /// Synonym groups consulted while parsing requirements and scoring
    /// candidates.
    pub synonyms: SynonymTable,

    /// Whether directory traversal follows symbolic links. Links are
    /// followed at most once; loops are skipped with a warning.
    pub follow_symlinks: bool,

    /// Bound on concurrent per-root index tasks.
    pub index_workers: usize,

    /// Bound on concurrent file copies.
    pub copy_workers: usize,

    /// Candidate selection when a category has several matches.
    pub copy_policy: CopyPolicy,

    /// Specifications larger than this are rejected as unreadable.
    pub max_document_bytes: u64,

    /// Number of traversal/copy units between cancellation checks.
    pub cancel_check_interval: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            score_threshold: DEFAULT_SCORE_THRESHOLD,
            synonyms: SynonymTable::default(),
            follow_symlinks: true,
            index_workers: num_cpus::get(),
            copy_workers: num_cpus::get(),
            copy_policy: CopyPolicy::default(),
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
            cancel_check_interval: 1,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_score_threshold(mut self, threshold: f64) -> Self {
        self.score_threshold = threshold;
        self
    }

    pub fn with_synonyms(mut self, synonyms: SynonymTable) -> Self {
        self.synonyms = synonyms;
        self
    }

    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    pub fn with_index_workers(mut self, workers: usize) -> Self {
        self.index_workers = workers.max(1);
        self
    }

    pub fn with_copy_workers(mut self, workers: usize) -> Self {
        self.copy_workers = workers.max(1);
        self
    }

    pub fn with_copy_policy(mut self, policy: CopyPolicy) -> Self {
        self.copy_policy = policy;
        self
    }

    pub fn with_max_document_bytes(mut self, bytes: u64) -> Self {
        self.max_document_bytes = bytes;
        self
    }

    pub fn with_cancel_check_interval(mut self, interval: usize) -> Self {
        self.cancel_check_interval = interval.max(1);
        self
    }
}
