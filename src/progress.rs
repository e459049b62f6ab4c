//! Stage-transition progress events.
//!
//! Each run emits an ordered, finite sequence of stage transitions driven by
//! actual work completion. Events carry status only, never result data; the
//! report is the single source of results.

use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// Pipeline stage, in execution order, plus the three terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    ExtractingText,
    ParsingRequirements,
    IndexingFolders,
    Matching,
    Materializing,
    Complete,
    Failed,
    Cancelled,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::ExtractingText => "extracting_text",
            Stage::ParsingRequirements => "parsing_requirements",
            Stage::IndexingFolders => "indexing_folders",
            Stage::Matching => "matching",
            Stage::Materializing => "materializing",
            Stage::Complete => "complete",
            Stage::Failed => "failed",
            Stage::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// A single stage transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageEvent {
    pub stage: Stage,
    pub at: DateTime<Utc>,
}

/// Sending half of a progress channel, handed to the engine for one run.
#[derive(Debug, Clone)]
pub struct ProgressSender {
    tx: mpsc::UnboundedSender<StageEvent>,
}

impl ProgressSender {
    pub(crate) fn emit(&self, stage: Stage) {
        // a dropped receiver just means nobody is watching
        let _ = self.tx.send(StageEvent {
            stage,
            at: Utc::now(),
        });
    }
}

/// Finite, non-restartable stream of stage events for one run.
///
/// Yields `None` once the run has reached a terminal stage and the engine
/// has dropped its sender.
#[derive(Debug)]
pub struct ProgressEvents {
    rx: mpsc::UnboundedReceiver<StageEvent>,
}

impl ProgressEvents {
    /// Receive the next event, or `None` once the run is over.
    pub async fn next_event(&mut self) -> Option<StageEvent> {
        self.rx.recv().await
    }
}

impl Stream for ProgressEvents {
    type Item = StageEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Create the progress channel for a single run.
pub fn progress_channel() -> (ProgressSender, ProgressEvents) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ProgressSender { tx }, ProgressEvents { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stream_ends_when_sender_drops() {
        let (sender, mut events) = progress_channel();

        sender.emit(Stage::ExtractingText);
        sender.emit(Stage::Complete);
        drop(sender);

        let mut stages = Vec::new();
        while let Some(event) = events.next_event().await {
            stages.push(event.stage);
        }
        assert_eq!(stages, vec![Stage::ExtractingText, Stage::Complete]);
    }

    #[test]
    fn stage_names_are_stable() {
        assert_eq!(Stage::IndexingFolders.to_string(), "indexing_folders");
        assert_eq!(Stage::Cancelled.to_string(), "cancelled");
    }
}
