//! Run-level error taxonomy.
//!
//! Stage-local recoverable conditions (unreadable subdirectories, per-file
//! copy failures, zero extracted requirements) are captured in the
//! `ProcessingReport` instead of being raised. Only conditions that make the
//! remaining pipeline meaningless abort a run, plus cancellation, which is
//! terminal but distinct from failure.

use crate::progress::Stage;
use thiserror::Error;

/// Terminal outcomes other than a report.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The specification bytes are not a parseable PDF, exceed the size
    /// limit, or carry no extractable text layer.
    #[error("unreadable specification document: {0}")]
    UnreadableDocument(String),

    /// Every supplied search root is missing or unreadable, so there is
    /// nothing to match against.
    #[error("no usable search roots: {0}")]
    NoSearchRoots(String),

    /// The caller's cancellation handle was observed mid-run.
    #[error("run cancelled during {stage}")]
    Cancelled { stage: Stage },
}
