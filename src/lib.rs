//! Requirement-extraction and document-matching engine.
//!
//! Parses a specification PDF to derive required document categories,
//! searches candidate folders for files satisfying each category, ranks the
//! matches, and materializes the winners into a categorized output tree with
//! full provenance. The presentation layer (upload form, progress bar,
//! rendering) lives outside this crate; its single entry point is
//! [`Engine::run`], with live stage transitions available through
//! [`progress_channel`].

pub mod cancel;
pub mod config;
pub mod engine;
pub mod error;
pub mod extract;
pub mod index;
pub mod matching;
pub mod materialize;
pub mod progress;
pub mod report;
pub mod requirements;

#[cfg(test)]
pub(crate) mod testutil;

pub use cancel::CancelHandle;
pub use config::{CopyPolicy, EngineConfig};
pub use engine::Engine;
pub use error::EngineError;
pub use progress::{progress_channel, ProgressEvents, ProgressSender, Stage, StageEvent};
pub use report::{
    CandidateFile, CopiedFile, CopyFailure, IndexWarning, MatchRecord, ProcessingReport,
    RequiredCategory, RunStatus, ScoredFile, SpecificationDocument,
};
pub use requirements::SynonymTable;
