//! Program configuration.
//!
//! A [`ProgramConfig`] can be built in code, loaded from a JSON file, or
//! both (file first, then command-line overrides). Keys are written by
//! their symbolic names:
//!
//! ```json
//! { "width": 40, "height": 15, "title": "Winter", "kill_key": "escape" }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::keys::Key;

/// Smallest frame interior that still fits a one-line widget.
pub const MIN_WIDTH: u16 = 4;
pub const MIN_HEIGHT: u16 = 3;

/// Geometry, keys and timing of a [`Program`](crate::program::Program).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgramConfig {
    /// Interior width of the frame, in columns.
    pub width: u16,
    /// Interior height of the frame, in rows.
    pub height: u16,
    /// Shown centered in the top border.
    pub title: Option<String>,
    /// Ends the main loop. Never delivered to screens.
    pub kill_key: Key,
    /// Sends a dialog back to the screen it was opened from.
    pub back_key: Key,
    /// How long each iteration waits for input before ticking anyway.
    /// Zero makes the loop spin.
    pub tick_ms: u64,
}

impl Default for ProgramConfig {
    fn default() -> Self {
        ProgramConfig {
            width: 40,
            height: 15,
            title: None,
            kill_key: Key::Escape,
            back_key: Key::Ctrl('z'),
            tick_ms: 0,
        }
    }
}

impl ProgramConfig {
    pub fn new(width: u16, height: u16, title: Option<&str>, kill_key: Key) -> Self {
        ProgramConfig {
            width,
            height,
            title: title.map(str::to_string),
            kill_key,
            ..Default::default()
        }
    }

    /// Read and validate a JSON configuration file. Missing fields take
    /// their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: ProgramConfig = serde_json::from_str(&text)?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.width < MIN_WIDTH || self.height < MIN_HEIGHT {
            return Err(Error::Config(format!(
                "frame {}x{} is smaller than {}x{}",
                self.width, self.height, MIN_WIDTH, MIN_HEIGHT
            )));
        }
        if self.kill_key == self.back_key {
            return Err(Error::Config(format!(
                "kill key and back key are both {}",
                self.kill_key
            )));
        }
        Ok(())
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

// ============================================================================
// TESTS
// ============================================================================
