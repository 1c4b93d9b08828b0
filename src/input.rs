//! Keystroke emission via keyboard simulation

use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use enigo::{Button, Direction, Enigo, Key, Keyboard, Mouse, Settings};
use tracing::debug;

use crate::typing::EmitError;

/// Time given to the target window to take focus after the click.
const FOCUS_SETTLE: Duration = Duration::from_millis(100);

/// Keys sent as dedicated key actions instead of literal text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialKey {
    /// Return / Enter, for `'\n'`
    Enter,
    /// Tab, for `'\t'`
    Tab,
    /// Space bar, for `' '`
    Space,
}

impl SpecialKey {
    /// The special key that stands in for `ch`, if any.
    pub const fn for_char(ch: char) -> Option<Self> {
        match ch {
            '\n' => Some(Self::Enter),
            '\t' => Some(Self::Tab),
            ' ' => Some(Self::Space),
            _ => None,
        }
    }
}

/// Something that can produce synthetic keystrokes.
///
/// Not expected to tolerate concurrent use; the controller only ever drives
/// one emitter from one worker at a time.
pub trait KeyEmitter: Send {
    /// Press and release a dedicated key.
    fn press_special_key(&mut self, key: SpecialKey) -> Result<(), EmitError>;

    /// Type a single printable character.
    fn type_character(&mut self, ch: char) -> Result<(), EmitError>;

    /// Make sure keystrokes land in the intended window. Called once per run,
    /// before the first key.
    fn acquire_focus(&mut self) -> Result<(), EmitError> {
        Ok(())
    }
}

/// Emit one character, routing whitespace through dedicated key actions.
pub fn emit_char<E: KeyEmitter + ?Sized>(emitter: &mut E, ch: char) -> Result<(), EmitError> {
    match SpecialKey::for_char(ch) {
        Some(key) => emitter.press_special_key(key),
        None => emitter.type_character(ch),
    }
}

/// [`KeyEmitter`] backed by the OS input APIs
pub struct EnigoEmitter {
    /// Enigo instance
    enigo: Enigo,
    /// Click at the pointer before typing
    click_to_focus: bool,
}

impl EnigoEmitter {
    /// Connect to the OS input backend
    pub fn new(click_to_focus: bool) -> Result<Self> {
        let enigo = Enigo::new(&Settings::default()).context("Failed to create Enigo instance")?;
        Ok(Self {
            enigo,
            click_to_focus,
        })
    }
}

impl KeyEmitter for EnigoEmitter {
    fn press_special_key(&mut self, key: SpecialKey) -> Result<(), EmitError> {
        let key = match key {
            SpecialKey::Enter => Key::Return,
            SpecialKey::Tab => Key::Tab,
            SpecialKey::Space => Key::Space,
        };
        self.enigo.key(key, Direction::Click)?;
        Ok(())
    }

    fn type_character(&mut self, ch: char) -> Result<(), EmitError> {
        // Control characters have no reliable literal form
        if ch.is_control() {
            return Err(EmitError::Unsupported(ch));
        }

        // text() is more reliable than Key::Unicode for non-ASCII on Windows
        let mut buf = [0u8; 4];
        self.enigo.text(ch.encode_utf8(&mut buf))?;
        Ok(())
    }

    fn acquire_focus(&mut self) -> Result<(), EmitError> {
        if !self.click_to_focus {
            return Ok(());
        }

        let (x, y) = self.enigo.location()?;
        debug!("Clicking at pointer ({}, {}) to focus target", x, y);
        self.enigo.button(Button::Left, Direction::Click)?;
        thread::sleep(FOCUS_SETTLE);

        Ok(())
    }
}
