//! System tray icon, menu and progress tooltip

use anyhow::{Context, Result};
use tracing::info;
use tray_icon::{
    Icon, TrayIcon, TrayIconBuilder,
    menu::{Menu, MenuEvent, MenuItem, PredefinedMenuItem},
};

use typing_bot::typing::{Preview, ProgressEvent, pacing};

/// Tooltip prefix
const APP_NAME: &str = "Typing Bot";

/// System tray icon states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayState {
    /// No run
    Idle,
    /// Typing
    Typing,
    /// Run paused
    Paused,
}

/// Menu actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayCommand {
    /// Start typing the configured text
    Start,
    /// Pause or resume the current run
    TogglePause,
    /// Stop the current run
    Stop,
    /// Exit the application
    Quit,
}

/// System tray manager
pub struct TrayManager {
    /// Tray icon
    tray: TrayIcon,
    /// Start menu item
    start_item: MenuItem,
    /// Pause/resume menu item
    pause_item: MenuItem,
    /// Stop menu item
    stop_item: MenuItem,
    /// Quit menu item
    quit_item: MenuItem,
    /// Idle icon
    idle_icon: Option<Icon>,
    /// Typing icon
    typing_icon: Option<Icon>,
    /// Current state
    state: TrayState,
}

impl TrayManager {
    /// Create new tray manager
    pub fn new() -> Result<Self> {
        let start_item = MenuItem::new("Start typing", true, None);
        let pause_item = MenuItem::new("Pause", false, None);
        let stop_item = MenuItem::new("Stop", false, None);
        let quit_item = MenuItem::new("Quit", true, None);

        let menu = Menu::new();
        menu.append_items(&[
            &start_item,
            &pause_item,
            &stop_item,
            &PredefinedMenuItem::separator(),
            &quit_item,
        ])
        .context("Failed to build tray menu")?;

        // Icons are optional; the platform default is used when missing
        let idle_icon = Self::load_icon("./assets/icons/keyboard.ico");
        let typing_icon = Self::load_icon("./assets/icons/keyboard-active.ico");

        let mut builder = TrayIconBuilder::new()
            .with_tooltip(Self::idle_tooltip())
            .with_menu(Box::new(menu));

        if let Some(ref icon) = idle_icon {
            builder = builder.with_icon(icon.clone());
        }

        let tray = builder.build().context("Failed to create tray icon")?;

        info!("System tray icon created");

        Ok(Self {
            tray,
            start_item,
            pause_item,
            stop_item,
            quit_item,
            idle_icon,
            typing_icon,
            state: TrayState::Idle,
        })
    }

    /// Load icon from file
    fn load_icon(path: &str) -> Option<Icon> {
        match Icon::from_path(path, None) {
            Ok(icon) => {
                info!("Loaded icon: {}", path);
                Some(icon)
            }
            Err(e) => {
                info!("Could not load icon {}: {} (using default)", path, e);
                None
            }
        }
    }

    /// Tooltip shown with no run
    fn idle_tooltip() -> String {
        format!("{APP_NAME} - Idle ({})", pacing::IDLE_ETA)
    }

    /// Update tray icon, tooltip and menu for a new state
    pub fn set_state(&mut self, state: TrayState) -> Result<()> {
        if state == self.state {
            return Ok(());
        }
        self.state = state;

        let tooltip = match state {
            TrayState::Idle => Self::idle_tooltip(),
            TrayState::Typing => format!("{APP_NAME} - Typing"),
            TrayState::Paused => format!("{APP_NAME} - Paused"),
        };
        self.tray
            .set_tooltip(Some(tooltip))
            .context("Failed to set tooltip")?;

        let active = state != TrayState::Idle;
        self.start_item.set_enabled(!active);
        self.pause_item.set_enabled(active);
        self.stop_item.set_enabled(active);
        self.pause_item.set_text(if state == TrayState::Paused {
            "Resume"
        } else {
            "Pause"
        });

        let icon = if active {
            &self.typing_icon
        } else {
            &self.idle_icon
        };
        if let Some(icon) = icon {
            self.tray.set_icon(Some(icon.clone()))?;
        }

        info!("Tray state updated: {:?}", state);

        Ok(())
    }

    /// Show progress, time remaining and the text around the cursor
    pub fn show_progress(&self, text: &[char], event: &ProgressEvent, eta: &str) -> Result<()> {
        if self.state == TrayState::Idle {
            return Ok(());
        }

        self.tray
            .set_tooltip(Some(progress_tooltip(text, event, eta, self.state)))
            .context("Failed to set tooltip")?;

        Ok(())
    }

    /// Next menu click, if any
    pub fn poll(&self) -> Option<TrayCommand> {
        let event = MenuEvent::receiver().try_recv().ok()?;
        [
            (&self.start_item, TrayCommand::Start),
            (&self.pause_item, TrayCommand::TogglePause),
            (&self.stop_item, TrayCommand::Stop),
            (&self.quit_item, TrayCommand::Quit),
        ]
        .into_iter()
        .find(|(item, _)| event.id == *item.id())
        .map(|(_, command)| command)
    }
}

/// Tooltip text for a progress update
fn progress_tooltip(text: &[char], event: &ProgressEvent, eta: &str, state: TrayState) -> String {
    let status = if state == TrayState::Paused {
        "Paused"
    } else {
        "Typing"
    };
    let typed = event.index + 1;
    // Preview the character typed next
    let preview = Preview::around(text, typed)
        .map(|p| format!("\n{p}"))
        .unwrap_or_default();

    format!(
        "{APP_NAME} - {status} {typed}/{} ({eta} left){preview}",
        event.total
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_tooltip() {
        let text: Vec<char> = "hi there".chars().collect();
        let event = ProgressEvent {
            index: 1,
            character: 'i',
            total: 8,
        };

        let tooltip = progress_tooltip(&text, &event, "00m01s", TrayState::Typing);
        assert_eq!(tooltip, "Typing Bot - Typing 2/8 (00m01s left)\ni[␣]the");
    }

    #[test]
    fn test_progress_tooltip_at_end() {
        let text: Vec<char> = "ok".chars().collect();
        let event = ProgressEvent {
            index: 1,
            character: 'k',
            total: 2,
        };

        let tooltip = progress_tooltip(&text, &event, "00m00s", TrayState::Paused);
        assert_eq!(tooltip, "Typing Bot - Paused 2/2 (00m00s left)");
    }
}
