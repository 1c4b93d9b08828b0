//! Progress reporting from the emission loop

use std::sync::mpsc::Sender;

use tracing::debug;

/// One emitted character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Position of the character in the request, starting at zero.
    pub index: usize,
    /// The character just emitted.
    pub character: char,
    /// Number of characters in the request.
    pub total: usize,
}

impl ProgressEvent {
    /// Characters still to be emitted after this one.
    pub const fn remaining(&self) -> usize {
        self.total.saturating_sub(self.index + 1)
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every character was emitted.
    Completed {
        /// Characters emitted.
        total: usize,
    },
    /// The run was stopped before the end. Emitted keys are not undone.
    Cancelled {
        /// Characters emitted before the stop was observed.
        typed: usize,
        /// Characters in the request.
        total: usize,
    },
}

impl RunOutcome {
    /// Whether the whole text was emitted.
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    /// Characters emitted during the run.
    pub const fn typed(&self) -> usize {
        match *self {
            Self::Completed { total } => total,
            Self::Cancelled { typed, .. } => typed,
        }
    }
}

/// Observer of a typing run.
///
/// Called from the worker thread, in index order.
pub trait ProgressSink: Send + Sync {
    /// A character was emitted (or skipped after an emission failure).
    fn on_progress(&self, event: ProgressEvent);

    /// The run ended. Called exactly once per run.
    fn on_finished(&self, _outcome: RunOutcome) {}
}

/// Everything a run reports, as a single message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypingEvent {
    /// See [`ProgressSink::on_progress`].
    Progress(ProgressEvent),
    /// See [`ProgressSink::on_finished`].
    Finished(RunOutcome),
}

impl ProgressSink for Sender<TypingEvent> {
    fn on_progress(&self, event: ProgressEvent) {
        if self.send(TypingEvent::Progress(event)).is_err() {
            debug!("Progress receiver dropped");
        }
    }

    fn on_finished(&self, outcome: RunOutcome) {
        if self.send(TypingEvent::Finished(outcome)).is_err() {
            debug!("Progress receiver dropped");
        }
    }
}
