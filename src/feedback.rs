//! Sound cues for run state changes

use anyhow::{Context, Result};
use rodio::{Decoder, OutputStreamBuilder, Sink};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::thread;
use tracing::{debug, error};

/// Directory holding the cue sounds
const SOUNDS_DIR: &str = "./assets/sounds";

/// Events that have a sound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    /// Typing began
    Started,
    /// Run paused
    Paused,
    /// Run resumed
    Resumed,
    /// Every character was typed
    Finished,
    /// Run stopped early
    Stopped,
}

impl Cue {
    /// Sound file for this cue
    const fn file_name(self) -> &'static str {
        match self {
            Self::Started => "start.mp3",
            Self::Paused => "pause.mp3",
            Self::Resumed => "resume.mp3",
            Self::Finished => "finish.mp3",
            Self::Stopped => "stop.mp3",
        }
    }
}

/// Audio feedback player
pub struct FeedbackPlayer {
    /// Whether sound feedback is enabled
    enabled: bool,
    /// Where cue files are looked up
    sounds_dir: PathBuf,
}

impl FeedbackPlayer {
    /// Create new feedback player
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            sounds_dir: PathBuf::from(SOUNDS_DIR),
        }
    }

    /// Play a cue in the background so the event loop keeps running
    pub fn cue(&self, cue: Cue) {
        if !self.enabled {
            return;
        }

        let path = self.sounds_dir.join(cue.file_name());
        let spawned = thread::Builder::new()
            .name("feedback".to_owned())
            .spawn(move || {
                if let Err(e) = play(&path) {
                    error!("Failed to play {:?} sound: {:#}", cue, e);
                }
            });
        if let Err(e) = spawned {
            error!("Failed to spawn feedback thread: {}", e);
        }
    }
}

/// Play sound file to the end
fn play(path: &Path) -> Result<()> {
    let file = File::open(path).context("Failed to open sound file")?;
    let source = Decoder::new(BufReader::new(file)).context("Failed to decode sound file")?;

    let stream =
        OutputStreamBuilder::open_default_stream().context("Failed to get audio output")?;
    let sink = Sink::connect_new(stream.mixer());

    sink.append(source);
    sink.sleep_until_end();

    debug!("Played sound: {}", path.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cue_files_are_distinct() {
        let cues = [Cue::Started, Cue::Paused, Cue::Resumed, Cue::Finished, Cue::Stopped];
        for (i, a) in cues.iter().enumerate() {
            for b in cues.iter().skip(i + 1) {
                assert_ne!(a.file_name(), b.file_name());
            }
        }
    }

    #[test]
    fn test_disabled_player_is_silent() {
        // Must return without touching the audio device
        FeedbackPlayer::new(false).cue(Cue::Finished);
    }
}
