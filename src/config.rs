//! Application configuration.
//!
//! Centralizes the default constants used throughout the application and the
//! [`Settings`] loaded from a TOML file, e.g.:
//!
//! ```toml
//! drive = "http://localhost:3000/drive/#/2/drive/edit/4SH+XD5NqierGNeW5S3vHqbx/"
//! websocket = "ws://localhost:3000/cryptpad_websocket"
//!
//! [fetch]
//! poll_interval_ms = 300
//! timeout_ms = 20000
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::core::error::ConfigError;
use crate::core::fetcher::FetchOptions;

// =============================================================================
// Application Metadata
// =============================================================================

/// Application name.
pub const APP_NAME: &str = "drivesh";

/// Help text for `help` command.
pub const HELP_TEXT: &str = "\
Available commands:
  help                Show this help
  pwd                 Print working directory
  ls [path]           List directory
  info <name>         Show info for an item
  cd <path>           Change directory
  cat <name>          Print a document
  clear               Clear the screen
  exit                Exit the shell";

// =============================================================================
// Network Configuration
// =============================================================================

/// Interval of the fallback poll while waiting for content, in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 300;

/// Content read timeout in milliseconds.
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 20_000;

/// Session connect timeout in milliseconds.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 30_000;

// =============================================================================
// Terminal Configuration
// =============================================================================

/// Shell prompt.
pub const DEFAULT_PROMPT: &str = "drive> ";

/// Maximum number of command lines kept in history.
pub const HISTORY_SIZE: usize = 200;

// =============================================================================
// Settings
// =============================================================================

/// Read timing, as written in the config file.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FetchSettings {
    pub poll_interval_ms: u64,
    pub timeout_ms: u64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            timeout_ms: DEFAULT_FETCH_TIMEOUT_MS,
        }
    }
}

/// Runtime settings.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Share link of the home drive
    pub drive: Option<String>,
    /// Realtime transport endpoint
    pub websocket: Option<String>,
    /// Origin used to resolve relative links; derived from `drive` if unset
    pub origin: Option<String>,
    /// JSON snapshot served by the in-process engine
    pub snapshot: Option<String>,
    pub prompt: String,
    pub connect_timeout_ms: u64,
    pub fetch: FetchSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            drive: None,
            websocket: None,
            origin: None,
            snapshot: None,
            prompt: DEFAULT_PROMPT.to_string(),
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            fetch: FetchSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;
        let settings = Self::from_toml(&text).map_err(|source| ConfigError::Parse {
            path: display.clone(),
            source,
        })?;
        settings.validate(&display)?;
        Ok(settings)
    }

    /// Reject durations the shell cannot wait with.
    ///
    /// `origin` names the source of the settings in the error.
    pub fn validate(&self, origin: &str) -> Result<(), ConfigError> {
        let durations = [
            ("fetch.poll_interval_ms", self.fetch.poll_interval_ms),
            ("fetch.timeout_ms", self.fetch.timeout_ms),
            ("connect_timeout_ms", self.connect_timeout_ms),
        ];
        match durations.into_iter().find(|&(_, ms)| ms == 0) {
            Some((key, _)) => Err(ConfigError::Invalid {
                path: origin.to_string(),
                key,
                reason: "must be at least 1",
            }),
            None => Ok(()),
        }
    }

    /// Parse settings from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Timing of document reads.
    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            poll_interval: Duration::from_millis(self.fetch.poll_interval_ms),
            timeout: Duration::from_millis(self.fetch.timeout_ms),
        }
    }

    /// Bound on waiting for a session to become ready.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Origin for relative links: explicit, or `scheme://host` of `drive`.
    pub fn server_origin(&self, drive: &str) -> String {
        if let Some(origin) = &self.origin {
            return origin.trim_end_matches('/').to_string();
        }
        origin_of(drive).unwrap_or_default()
    }
}

/// `scheme://host[:port]` of a URL.
fn origin_of(url: &str) -> Option<String> {
    let (scheme, rest) = url.split_once("://")?;
    let host = rest.split(['/', '#', '?']).next()?;
    if host.is_empty() {
        return None;
    }
    Some(format!("{}://{}", scheme, host))
}
