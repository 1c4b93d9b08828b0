//! Error types for the typing core

use thiserror::Error;

use super::controller::RunState;

/// Reasons a typing run could not be started.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TypingError {
    /// The request carried no characters to type.
    #[error("invalid request: text is empty")]
    EmptyText,

    /// Another run already owns this controller.
    #[error("invalid request: a run is already active ({0:?})")]
    AlreadyActive(RunState),

    /// The worker thread could not be spawned.
    #[error("failed to spawn typing worker: {0}")]
    Spawn(#[from] std::io::Error),
}

impl TypingError {
    /// Whether this error is a rejected request rather than a system failure.
    pub const fn is_invalid_request(&self) -> bool {
        matches!(self, Self::EmptyText | Self::AlreadyActive(_))
    }
}

/// Failure to emit a single key. Never fatal to a run.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EmitError {
    /// The backend has no way to produce this character.
    #[error("cannot type character {0:?}")]
    Unsupported(char),

    /// The input backend rejected the event.
    #[error("input backend error: {0}")]
    Input(#[from] enigo::InputError),
}
