//! Global hotkeys for start, pause/resume and stop

use std::str::FromStr;

use anyhow::{Context, Result};
use global_hotkey::{
    GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState,
    hotkey::{Code, HotKey, Modifiers},
};
use tracing::info;

/// What a registered hotkey asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyAction {
    /// Start typing the configured text
    Start,
    /// Pause or resume the current run
    TogglePause,
    /// Stop the current run
    Stop,
}

/// Hotkey listener
pub struct HotkeyListener {
    /// Hotkey manager
    _manager: GlobalHotKeyManager,
    /// Registered hotkeys and the action each triggers
    bindings: Vec<(HotKey, HotkeyAction)>,
}

impl HotkeyListener {
    /// Register the start, pause and stop hotkeys under one modifier
    pub fn new(modifier: &str, start: &str, pause: &str, stop: &str) -> Result<Self> {
        let manager = GlobalHotKeyManager::new().context("Failed to create hotkey manager")?;

        let modifiers = if Self::is_unmodified(modifier) {
            None
        } else {
            Some(Self::parse_modifier(modifier)?)
        };

        let mut bindings: Vec<(HotKey, HotkeyAction)> = Vec::with_capacity(3);
        for (key, action) in [
            (start, HotkeyAction::Start),
            (pause, HotkeyAction::TogglePause),
            (stop, HotkeyAction::Stop),
        ] {
            let hotkey = HotKey::new(modifiers, Self::parse_key(key)?);
            if bindings.iter().any(|(bound, _)| bound.id() == hotkey.id()) {
                anyhow::bail!(
                    "Hotkey {} is assigned to more than one action",
                    Self::describe(modifier, key)
                );
            }

            if manager.register(hotkey).is_err() {
                anyhow::bail!(
                    "Failed to register hotkey {}. This combination may be reserved by the OS or \
                    another application. Try a different key in your .env file.",
                    Self::describe(modifier, key)
                );
            }

            info!("Registered {:?} hotkey: {}", action, Self::describe(modifier, key));
            bindings.push((hotkey, action));
        }

        Ok(Self {
            _manager: manager,
            bindings,
        })
    }

    /// Next pending hotkey press, if any
    pub fn poll(&self) -> Option<HotkeyAction> {
        let event = GlobalHotKeyEvent::receiver().try_recv().ok()?;
        if !matches!(event.state, HotKeyState::Pressed) {
            return None;
        }
        self.action_for(event.id)
    }

    /// Action bound to a hotkey id
    fn action_for(&self, id: u32) -> Option<HotkeyAction> {
        self.bindings
            .iter()
            .find(|(hotkey, _)| hotkey.id() == id)
            .map(|&(_, action)| action)
    }

    /// Whether the configured modifier means "no modifier"
    fn is_unmodified(modifier: &str) -> bool {
        modifier.is_empty() || modifier.eq_ignore_ascii_case("NONE")
    }

    /// Human-readable hotkey, e.g. `CTRL + F8`
    fn describe(modifier: &str, key: &str) -> String {
        if Self::is_unmodified(modifier) {
            key.to_owned()
        } else {
            format!("{modifier} + {key}")
        }
    }

    /// Parse modifier string to Modifiers
    fn parse_modifier(modifier: &str) -> Result<Modifiers> {
        match modifier.to_uppercase().as_str() {
            "CTRL" => Ok(Modifiers::CONTROL),
            "ALT" => Ok(Modifiers::ALT),
            "SHIFT" => Ok(Modifiers::SHIFT),
            "WIN" | "SUPER" => Ok(Modifiers::SUPER),
            _ => anyhow::bail!("Invalid modifier: {}", modifier),
        }
    }

    /// Parse key string to Code
    ///
    /// Accepts named keys, single letters and digits, and `F1`-`F24`.
    fn parse_key(key: &str) -> Result<Code> {
        let upper = key.to_uppercase();
        let named = match upper.as_str() {
            "SPACE" => Some(Code::Space),
            "ENTER" | "RETURN" => Some(Code::Enter),
            "TAB" => Some(Code::Tab),
            "BACKSPACE" => Some(Code::Backspace),
            "ESC" | "ESCAPE" => Some(Code::Escape),
            "PAUSE" => Some(Code::Pause),
            "SCROLLLOCK" => Some(Code::ScrollLock),
            "INSERT" => Some(Code::Insert),
            "HOME" => Some(Code::Home),
            "END" => Some(Code::End),
            _ => None,
        };
        if let Some(code) = named {
            return Ok(code);
        }

        let mut chars = upper.chars();
        let name = match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii_uppercase() => format!("Key{c}"),
            (Some(c), None) if c.is_ascii_digit() => format!("Digit{c}"),
            _ if upper
                .strip_prefix('F')
                .and_then(|n| n.parse::<u8>().ok())
                .is_some_and(|n| (1..=24).contains(&n)) =>
            {
                upper.clone()
            }
            _ => anyhow::bail!("Invalid key: {}", key),
        };

        Code::from_str(&name).map_err(|_| anyhow::anyhow!("Invalid key: {}", key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_modifier() {
        assert_eq!(HotkeyListener::parse_modifier("ctrl").ok(), Some(Modifiers::CONTROL));
        assert_eq!(HotkeyListener::parse_modifier("Super").ok(), Some(Modifiers::SUPER));
        assert!(HotkeyListener::parse_modifier("HYPER").is_err());
    }

    #[test]
    fn test_parse_key() {
        assert_eq!(HotkeyListener::parse_key("f9").ok(), Some(Code::F9));
        assert_eq!(HotkeyListener::parse_key("Escape").ok(), Some(Code::Escape));
        assert_eq!(HotkeyListener::parse_key("PAUSE").ok(), Some(Code::Pause));
        assert_eq!(HotkeyListener::parse_key("q").ok(), Some(Code::KeyQ));
        assert_eq!(HotkeyListener::parse_key("7").ok(), Some(Code::Digit7));
        assert_eq!(HotkeyListener::parse_key("F24").ok(), Some(Code::F24));
        assert!(HotkeyListener::parse_key("F25").is_err());
        assert!(HotkeyListener::parse_key("F0").is_err());
        assert!(HotkeyListener::parse_key("CAPS").is_err());
    }

    #[test]
    fn test_describe() {
        assert_eq!(HotkeyListener::describe("NONE", "F8"), "F8");
        assert_eq!(HotkeyListener::describe("", "ESC"), "ESC");
        assert_eq!(HotkeyListener::describe("ALT", "F8"), "ALT + F8");
    }
}
