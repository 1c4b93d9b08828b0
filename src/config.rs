//! Configuration loading from .env file

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tracing::warn;

use typing_bot::typing::pacing;

/// Countdown before typing when `START_DELAY_SECS` is unset
const DEFAULT_START_DELAY_SECS: u64 = 3;

/// Longest accepted `START_DELAY_SECS`
const MAX_START_DELAY_SECS: u64 = 60;

/// Accepted `LOG_LEVEL` values
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Pause/stop poll interval when `POLL_INTERVAL_MS` is unset
const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Application configuration loaded from .env
#[derive(Debug, Clone)]
#[allow(missing_docs)]
pub struct Config {
    pub text_file: PathBuf,
    pub typing_rate_wps: f64,
    pub start_delay: Duration,
    pub click_to_focus: bool,
    pub poll_interval: Duration,
    pub hotkey_modifier: String,
    pub hotkey_start: String,
    pub hotkey_pause: String,
    pub hotkey_stop: String,
    pub enable_sound_feedback: bool,
    pub log_to_file: bool,
    pub log_level: String,
}

impl Config {
    /// Load configuration from .env file
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().context(
            "Missing .env file. Copy .env.example to .env and fill in the required values",
        )?;

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key/value source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);

        let typing_rate_wps: f64 = vars
            .required("TYPING_RATE_WPS")?
            .parse()
            .context("Invalid TYPING_RATE_WPS")?;
        if !typing_rate_wps.is_finite() || typing_rate_wps <= 0.0 {
            bail!("Invalid TYPING_RATE_WPS: must be a positive number");
        }
        if typing_rate_wps < pacing::MIN_WPS {
            warn!(
                "TYPING_RATE_WPS {} is below the minimum, using {}",
                typing_rate_wps,
                pacing::MIN_WPS
            );
        }

        let poll_ms = vars.optional("POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS)?;
        if !(1..=DEFAULT_POLL_INTERVAL_MS).contains(&poll_ms) {
            bail!("Invalid POLL_INTERVAL_MS: must be between 1 and {DEFAULT_POLL_INTERVAL_MS}");
        }

        let start_delay_secs = vars.optional("START_DELAY_SECS", DEFAULT_START_DELAY_SECS)?;
        if start_delay_secs > MAX_START_DELAY_SECS {
            bail!("Invalid START_DELAY_SECS: must be at most {MAX_START_DELAY_SECS}");
        }

        let log_level = vars.required("LOG_LEVEL")?.trim().to_lowercase();
        if !LOG_LEVELS.contains(&log_level.as_str()) {
            bail!(
                "Invalid LOG_LEVEL: {log_level}. Expected one of {}",
                LOG_LEVELS.join(", ")
            );
        }

        Ok(Self {
            text_file: PathBuf::from(vars.required("TEXT_FILE")?),
            typing_rate_wps,
            start_delay: Duration::from_secs(start_delay_secs),
            click_to_focus: vars.optional("CLICK_TO_FOCUS", true)?,
            poll_interval: Duration::from_millis(poll_ms),
            hotkey_modifier: vars.required("HOTKEY_MODIFIER")?,
            hotkey_start: vars.required("HOTKEY_START")?,
            hotkey_pause: vars.required("HOTKEY_PAUSE")?,
            hotkey_stop: vars.required("HOTKEY_STOP")?,
            enable_sound_feedback: vars
                .required("ENABLE_SOUND_FEEDBACK")?
                .parse()
                .context("Invalid ENABLE_SOUND_FEEDBACK")?,
            log_to_file: vars
                .required("LOG_TO_FILE")?
                .parse()
                .context("Invalid LOG_TO_FILE")?,
            log_level,
        })
    }
}

/// Key lookup with the error messages used for every setting
struct Vars<F>(F);

impl<F: Fn(&str) -> Option<String>> Vars<F> {
    /// Get a variable that must be present
    fn required(&self, key: &str) -> Result<String> {
        (self.0)(key).with_context(|| {
            format!("Missing or invalid environment variable: {key}. See .env.example for required configuration")
        })
    }

    /// Get and parse a variable, falling back to `default` when absent or blank
    fn optional<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: std::str::FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match (self.0)(key) {
            Some(raw) if !raw.trim().is_empty() => {
                raw.trim().parse().with_context(|| format!("Invalid {key}"))
            }
            _ => Ok(default),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("TEXT_FILE", "typing.txt"),
            ("TYPING_RATE_WPS", "12.5"),
            ("HOTKEY_MODIFIER", "CTRL"),
            ("HOTKEY_START", "F8"),
            ("HOTKEY_PAUSE", "F9"),
            ("HOTKEY_STOP", "F10"),
            ("ENABLE_SOUND_FEEDBACK", "false"),
            ("LOG_TO_FILE", "false"),
            ("LOG_LEVEL", "info"),
        ])
    }

    fn load(vars: &HashMap<&'static str, &'static str>) -> Result<Config> {
        Config::from_lookup(|key| vars.get(key).map(|v| (*v).to_owned()))
    }

    #[test]
    fn test_defaults_apply() {
        let config = load(&base()).unwrap();
        assert_eq!(config.text_file, PathBuf::from("typing.txt"));
        assert!((config.typing_rate_wps - 12.5).abs() < f64::EPSILON);
        assert_eq!(config.start_delay, Duration::from_secs(3));
        assert!(config.click_to_focus);
        assert_eq!(config.poll_interval, Duration::from_millis(100));
        assert_eq!(config.hotkey_stop, "F10");
    }

    #[test]
    fn test_optional_overrides() {
        let mut vars = base();
        vars.insert("START_DELAY_SECS", "0");
        vars.insert("CLICK_TO_FOCUS", "false");
        vars.insert("POLL_INTERVAL_MS", "25");
        let config = load(&vars).unwrap();
        assert_eq!(config.start_delay, Duration::ZERO);
        assert!(!config.click_to_focus);
        assert_eq!(config.poll_interval, Duration::from_millis(25));
    }

    #[test]
    fn test_missing_required_key() {
        let mut vars = base();
        vars.remove("TEXT_FILE");
        let err = load(&vars).unwrap_err();
        assert!(err.to_string().contains("TEXT_FILE"));
    }

    #[test]
    fn test_rejects_bad_rate() {
        for bad in ["fast", "0", "-3", "NaN"] {
            let mut vars = base();
            vars.insert("TYPING_RATE_WPS", bad);
            assert!(load(&vars).is_err(), "accepted rate {bad}");
        }
    }

    #[test]
    fn test_rejects_loose_poll_interval() {
        let mut vars = base();
        vars.insert("POLL_INTERVAL_MS", "250");
        assert!(load(&vars).is_err());

        vars.insert("POLL_INTERVAL_MS", "0");
        assert!(load(&vars).is_err());
    }

    #[test]
    fn test_start_delay_is_capped() {
        let mut vars = base();
        vars.insert("START_DELAY_SECS", "60");
        assert_eq!(load(&vars).unwrap().start_delay, Duration::from_secs(60));

        for bad in ["61", "86400", "18446744073709551615"] {
            vars.insert("START_DELAY_SECS", bad);
            let err = load(&vars).unwrap_err();
            assert!(err.to_string().contains("START_DELAY_SECS"), "accepted {bad}");
        }
    }

    #[test]
    fn test_log_level_is_normalized() {
        let mut vars = base();
        vars.insert("LOG_LEVEL", " WARN ");
        assert_eq!(load(&vars).unwrap().log_level, "warn");
    }

    #[test]
    fn test_rejects_unknown_log_level() {
        let mut vars = base();
        vars.insert("LOG_LEVEL", "verbose");
        let err = load(&vars).unwrap_err();
        assert!(err.to_string().contains("LOG_LEVEL"));
    }
}
