//! Application state and main event loop.
//!
//! Owns the tray, hotkeys and the typing controller. Tray and hotkey commands
//! are forwarded to the controller; progress comes back over a channel and is
//! rendered into the tray tooltip.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};

#[cfg(windows)]
use windows::Win32::UI::WindowsAndMessaging::{
    DispatchMessageW, MSG, PM_REMOVE, PeekMessageW, TranslateMessage,
};

use typing_bot::input::EnigoEmitter;
use typing_bot::typing::{
    RunHandle, RunOutcome, RunState, TypingController, TypingEvent, TypingRequest, pacing,
};

use crate::config::Config;
use crate::feedback::{Cue, FeedbackPlayer};
use crate::hotkey::{HotkeyAction, HotkeyListener};
use crate::tray::{TrayCommand, TrayManager, TrayState};

/// Event loop tick
const TICK: Duration = Duration::from_millis(10);

/// The run currently owned by the controller.
struct ActiveRun {
    /// Worker handle
    handle: RunHandle,
    /// Characters being typed, for the tooltip preview
    text: Vec<char>,
    /// Per-character delay, for the time-remaining estimate
    delay: Duration,
}

/// Holds all runtime components and drives the event loop.
pub struct App {
    /// System tray manager
    tray: TrayManager,
    /// Global hotkey listener
    hotkey: HotkeyListener,
    /// Audio feedback player
    feedback: FeedbackPlayer,
    /// Typing controller driving the keyboard
    controller: TypingController<EnigoEmitter>,
    /// Progress from the typing worker
    events: Receiver<TypingEvent>,
    /// Run in progress
    active: Option<ActiveRun>,
    /// File holding the text to type
    text_file: PathBuf,
    /// Requested typing rate
    rate_wps: f64,
    /// Countdown before the first key
    start_delay: Duration,
}

impl App {
    /// Initialize all components from the provided configuration.
    pub fn new(config: Config) -> Result<Self> {
        let tray = TrayManager::new().context("Failed to create system tray")?;
        let hotkey = HotkeyListener::new(
            &config.hotkey_modifier,
            &config.hotkey_start,
            &config.hotkey_pause,
            &config.hotkey_stop,
        )
        .context("Failed to create hotkey listener")?;
        let feedback = FeedbackPlayer::new(config.enable_sound_feedback);

        let emitter =
            EnigoEmitter::new(config.click_to_focus).context("Failed to set up keyboard input")?;
        let (tx, events) = mpsc::channel();
        let controller =
            TypingController::new(emitter, Arc::new(tx)).with_poll_interval(config.poll_interval);

        info!(
            "Typing Bot ready. {} + {} to start typing {}.",
            config.hotkey_modifier,
            config.hotkey_start,
            config.text_file.display()
        );

        Ok(Self {
            tray,
            hotkey,
            feedback,
            controller,
            events,
            active: None,
            text_file: config.text_file,
            rate_wps: config.typing_rate_wps,
            start_delay: config.start_delay,
        })
    }

    /// Run the event loop until the user requests quit.
    pub fn run(mut self) -> Result<()> {
        self.tray.set_state(TrayState::Idle)?;

        loop {
            Self::pump_messages();

            match self.tray.poll() {
                Some(TrayCommand::Quit) => {
                    info!("Quit requested");
                    break;
                }
                Some(TrayCommand::Start) => self.dispatch(HotkeyAction::Start)?,
                Some(TrayCommand::TogglePause) => self.dispatch(HotkeyAction::TogglePause)?,
                Some(TrayCommand::Stop) => self.dispatch(HotkeyAction::Stop)?,
                None => {}
            }

            if let Some(action) = self.hotkey.poll() {
                self.dispatch(action)?;
            }

            self.drain_events()?;

            std::thread::sleep(TICK);
        }

        self.shutdown();

        Ok(())
    }

    /// Apply a user command.
    fn dispatch(&mut self, action: HotkeyAction) -> Result<()> {
        match action {
            HotkeyAction::Start => self.start_typing(),
            HotkeyAction::TogglePause => self.toggle_pause(),
            HotkeyAction::Stop => {
                self.controller.stop();
                Ok(())
            }
        }
    }

    /// Read the text file and hand it to the controller.
    fn start_typing(&mut self) -> Result<()> {
        if self.active.is_some() {
            debug!("Start ignored: already typing");
            return Ok(());
        }

        let raw = match std::fs::read_to_string(&self.text_file) {
            Ok(raw) => raw,
            Err(e) => {
                error!("Failed to read {}: {}", self.text_file.display(), e);
                return Ok(());
            }
        };
        let text = raw.trim();

        let request = match TypingRequest::new(text, self.rate_wps) {
            Ok(request) => request.with_lead_in(self.start_delay),
            Err(e) => {
                warn!("Nothing to type in {}: {}", self.text_file.display(), e);
                return Ok(());
            }
        };
        let delay = request.delay();

        match self.controller.start_request(request) {
            Ok(handle) => {
                info!(
                    "Starting in {}s - position your cursor",
                    self.start_delay.as_secs()
                );
                self.active = Some(ActiveRun {
                    handle,
                    text: text.chars().collect(),
                    delay,
                });
                self.tray.set_state(TrayState::Typing)?;
                self.feedback.cue(Cue::Started);
            }
            Err(e) if e.is_invalid_request() => warn!("Start rejected: {}", e),
            Err(e) => error!("Failed to start typing: {}", e),
        }

        Ok(())
    }

    /// Pause or resume the active run.
    fn toggle_pause(&mut self) -> Result<()> {
        if self.active.is_none() {
            debug!("Pause ignored: not typing");
            return Ok(());
        }

        if self.controller.toggle_pause() {
            self.tray.set_state(TrayState::Paused)?;
            self.feedback.cue(Cue::Paused);
        } else if self.controller.state() == RunState::Running {
            self.tray.set_state(TrayState::Typing)?;
            self.feedback.cue(Cue::Resumed);
        }

        Ok(())
    }

    /// Render everything the worker reported since the last tick.
    fn drain_events(&mut self) -> Result<()> {
        // The worker reports before exiting, so check this before draining
        let worker_exited = self
            .active
            .as_ref()
            .is_some_and(|run| run.handle.is_finished());

        while let Ok(event) = self.events.try_recv() {
            match event {
                TypingEvent::Progress(progress) => {
                    if let Some(run) = &self.active {
                        let eta = pacing::format_eta(pacing::estimate_remaining(
                            progress.remaining(),
                            run.delay,
                        ));
                        self.tray.show_progress(&run.text, &progress, &eta)?;
                    }
                }
                TypingEvent::Finished(outcome) => self.finish_run(outcome)?,
            }
        }

        if worker_exited && let Some(run) = &self.active {
            let total = run.text.len();
            self.finish_run(RunOutcome::Cancelled { typed: 0, total })?;
        }

        Ok(())
    }

    /// Reset the UI after a run ends.
    fn finish_run(&mut self, outcome: RunOutcome) -> Result<()> {
        let Some(run) = self.active.take() else {
            return Ok(());
        };
        if run.handle.join().is_none() {
            error!("Typing worker panicked");
        }

        self.tray.set_state(TrayState::Idle)?;
        self.feedback.cue(if outcome.is_completed() {
            Cue::Finished
        } else {
            Cue::Stopped
        });

        Ok(())
    }

    /// Stop any run and wait for the worker so no keys are sent after exit.
    fn shutdown(&mut self) {
        self.controller.stop();
        if let Some(run) = self.active.take() {
            run.handle.join();
        }
    }

    /// Pump the Windows message queue so tray and hotkey events are delivered.
    fn pump_messages() {
        #[cfg(windows)]
        // SAFETY: MSG is a plain Windows struct; PeekMessageW, TranslateMessage,
        // and DispatchMessageW are standard message-loop calls with no invariants
        // beyond what the Windows API guarantees.
        unsafe {
            let mut msg = MSG::default();
            while PeekMessageW(&mut msg, None, 0, 0, PM_REMOVE).as_bool() {
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
        }
    }
}
