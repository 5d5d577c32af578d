// Tracker settings, persisted separately from the position map.
//
// Settings file: `~/.revisit/settings.toml`
// Position map:  `~/.revisit/cursor-positions.json` (relative to the base dir)

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Default file name of the persisted position map.
pub const DEFAULT_DB_FILE_NAME: &str = "cursor-positions.json";
/// Default wait after a document opens before restoring.
pub const DEFAULT_OPEN_DELAY_MS: u64 = 100;
/// Largest accepted open delay.
pub const MAX_OPEN_DELAY_MS: u64 = 300;
/// Default period between flushes, also the floor for configured values.
pub const MIN_SAVE_TIMER_MS: u64 = 5_000;

const SETTINGS_FILE_NAME: &str = "settings.toml";

/// Root directory for revisit state: `~/.revisit/`.
pub fn default_base_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".revisit"))
}

/// Resolved locations of the tracker's files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerPaths {
    pub base_dir: PathBuf,
    pub settings_path: PathBuf,
}

impl TrackerPaths {
    /// Paths under `~/.revisit/`.
    pub fn resolve() -> Result<Self, ConfigError> {
        let base_dir = default_base_dir().ok_or_else(|| {
            ConfigError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "could not determine home directory",
            ))
        })?;
        Ok(Self::in_dir(base_dir))
    }

    /// Paths under an explicit plugin-private directory.
    pub fn in_dir(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        Self { settings_path: base_dir.join(SETTINGS_FILE_NAME), base_dir }
    }

    /// Where the position map lives under `config`.
    pub fn db_path(&self, config: &TrackerConfig) -> PathBuf {
        if config.db_file_name.is_absolute() {
            config.db_file_name.clone()
        } else {
            self.base_dir.join(&config.db_file_name)
        }
    }
}

/// User-facing settings of the tracker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TrackerConfig {
    /// Path of the position map, relative to the base dir unless absolute.
    #[serde(alias = "dbFileName")]
    pub db_file_name: PathBuf,
    /// Milliseconds to wait after a document opens before restoring (0–300).
    #[serde(alias = "delayAfterFileOpening")]
    pub delay_after_file_opening: u64,
    /// Milliseconds between periodic flushes (at least 5000).
    #[serde(alias = "saveTimer")]
    pub save_timer: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            db_file_name: PathBuf::from(DEFAULT_DB_FILE_NAME),
            delay_after_file_opening: DEFAULT_OPEN_DELAY_MS,
            save_timer: MIN_SAVE_TIMER_MS,
        }
    }
}

impl TrackerConfig {
    /// Load from `path`. Returns defaults if the file doesn't exist or
    /// can't be parsed.
    pub fn load(path: &Path) -> Self {
        match Self::load_from(path) {
            Ok(config) => config,
            Err(ConfigError::Io(error)) if error.kind() == std::io::ErrorKind::NotFound => {
                Self::default()
            }
            Err(error) => {
                warn!(path = %path.display(), error = %error, "ignoring unreadable settings");
                Self::default()
            }
        }
    }

    /// Load from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        toml::from_str(&contents).map_err(ConfigError::Parse)
    }

    /// Save to a specific path (creates parent directories).
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigError::Io)?;
        }
        let contents = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::write(path, contents).map_err(ConfigError::Io)
    }

    /// Settle delay after an open, clamped to 0–300 ms.
    pub fn open_delay(&self) -> Duration {
        if self.delay_after_file_opening > MAX_OPEN_DELAY_MS {
            warn!(
                configured = self.delay_after_file_opening,
                max = MAX_OPEN_DELAY_MS,
                "delay_after_file_opening out of range, clamping"
            );
        }
        Duration::from_millis(self.delay_after_file_opening.min(MAX_OPEN_DELAY_MS))
    }

    /// Period of the background flush, never below 5 s.
    pub fn save_interval(&self) -> Duration {
        Duration::from_millis(self.save_timer.max(MIN_SAVE_TIMER_MS))
    }
}

// ── Errors ─────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[source] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[source] toml::de::Error),
    #[error("config serialize error: {0}")]
    Serialize(#[source] toml::ser::Error),
}
