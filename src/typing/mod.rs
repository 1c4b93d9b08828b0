//! Paced, interruptible keystroke emission.

mod controller;
mod error;
pub mod pacing;
mod preview;
mod progress;

pub use controller::{RunHandle, RunState, TypingController, TypingRequest};
pub use error::{EmitError, TypingError};
pub use preview::Preview;
pub use progress::{ProgressEvent, ProgressSink, RunOutcome, TypingEvent};
