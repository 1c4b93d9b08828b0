//! Keystroke-by-keystroke typing of text into the focused window.
//!
//! [`typing::TypingController`] owns the pacing loop and the run state;
//! [`input`] provides the keystroke backend it drives.

pub mod input;
pub mod typing;
