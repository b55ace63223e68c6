//! Harness configuration.
//!
//! Configurations can be built in code or loaded from RON:
//!
//! ```text
//! (
//!     max_frames: Some(10000),
//!     warn_unfinished: true,
//! )
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{MarbleError, Result};
use crate::time::Frame;

/// Settings for a [`crate::harness::MarbleHarness`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Stop flushing once the next action lies beyond this frame.
    ///
    /// `None` drains the queue completely, which never terminates for a
    /// pipeline that reschedules itself forever.
    pub max_frames: Option<Frame>,
    /// Log a warning when a flush stops with actions still queued.
    pub warn_unfinished: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            max_frames: None,
            warn_unfinished: true,
        }
    }
}

impl HarnessConfig {
    /// Config that stops flushing after `max_frames`.
    #[must_use]
    pub fn bounded(max_frames: Frame) -> Self {
        Self {
            max_frames: Some(max_frames),
            ..Self::default()
        }
    }

    /// Load a config from a RON file.
    ///
    /// # Errors
    ///
    /// Returns [`MarbleError::Io`] if the file cannot be read and
    /// [`MarbleError::ConfigLoad`] if it is not a valid config.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_ron_str(&contents)
    }

    /// Parse a config from a RON string.
    ///
    /// # Errors
    ///
    /// Returns [`MarbleError::ConfigLoad`] if the string is not a valid config.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        ron::from_str(ron).map_err(|e| MarbleError::ConfigLoad(e.to_string()))
    }
}
