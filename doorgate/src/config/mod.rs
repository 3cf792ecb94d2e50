//! Runtime configuration loading.
//!
//! Every field has a default, so an absent file, an empty file, or a file with
//! only some sections are all valid.  The expected YAML structure is:
//! ```yaml
//! door:
//!   auto_close_secs: 5
//! gesture:
//!   finger_tips: [8, 12, 16, 20]
//!   finger_pips: [6, 10, 14, 18]
//!   min_extended_fingers: 4
//! speech:
//!   phrase: "open the door"
//!   sample_rate: 16000
//!   block_size: 8000
//!   queue_capacity: 64
//! camera:
//!   index: 0
//!   width: 640
//!   height: 480
//! ```

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

use crate::door::DEFAULT_AUTO_CLOSE;
use crate::error::DoorgateError;
use crate::gate::DEFAULT_PHRASE;
use crate::gesture::{
    GesturePolicy, DEFAULT_FINGER_PIPS, DEFAULT_FINGER_TIPS, DEFAULT_MIN_EXTENDED,
};

// ── Sections ──────────────────────────────────────────────────────────────────

/// Door actuator settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DoorConfig {
    /// How long the door stays open before closing itself, in seconds.
    pub auto_close_secs: f64,
}

impl Default for DoorConfig {
    fn default() -> Self {
        Self {
            auto_close_secs: DEFAULT_AUTO_CLOSE.as_secs_f64(),
        }
    }
}

impl DoorConfig {
    /// The hold as a [`Duration`].
    ///
    /// # Errors
    /// [`DoorgateError::InvalidConfig`] unless `auto_close_secs` is a
    /// positive number of seconds that fits a `Duration`.
    pub fn auto_close(&self) -> Result<Duration, DoorgateError> {
        let secs = self.auto_close_secs;
        let invalid = || {
            DoorgateError::InvalidConfig(format!(
                "door.auto_close_secs must be a positive number of seconds, got {secs}"
            ))
        };
        if secs <= 0.0 {
            return Err(invalid());
        }
        Duration::try_from_secs_f64(secs).map_err(|_| invalid())
    }
}

/// Gesture classification thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GestureConfig {
    pub finger_tips: Vec<usize>,
    /// Paired positionally with `finger_tips`.
    pub finger_pips: Vec<usize>,
    pub min_extended_fingers: usize,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            finger_tips: DEFAULT_FINGER_TIPS.to_vec(),
            finger_pips: DEFAULT_FINGER_PIPS.to_vec(),
            min_extended_fingers: DEFAULT_MIN_EXTENDED,
        }
    }
}

impl GestureConfig {
    pub fn policy(&self) -> Result<GesturePolicy, DoorgateError> {
        Ok(GesturePolicy::new(
            &self.finger_tips,
            &self.finger_pips,
            self.min_extended_fingers,
        )?)
    }
}

/// Speech capture and gating settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpeechConfig {
    /// Command phrase, matched case-insensitively as a substring.
    pub phrase: String,
    /// Capture rate in Hz (mono, 16-bit).
    pub sample_rate: u32,
    /// Samples per captured chunk.
    pub block_size: usize,
    /// Capacity of the bounded queue between capture and decoding.
    pub queue_capacity: usize,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            phrase: DEFAULT_PHRASE.to_string(),
            sample_rate: 16_000,
            block_size: 8_000,
            queue_capacity: 64,
        }
    }
}

impl SpeechConfig {
    /// Wall-clock length of one chunk.
    ///
    /// # Errors
    /// [`DoorgateError::InvalidConfig`] for a zero sample rate or a chunk
    /// too long to represent.
    pub fn block_duration(&self) -> Result<Duration, DoorgateError> {
        if self.sample_rate == 0 || self.block_size == 0 {
            return Err(DoorgateError::InvalidConfig(
                "speech.sample_rate and speech.block_size must be non-zero".into(),
            ));
        }
        Duration::try_from_secs_f64(self.block_size as f64 / self.sample_rate as f64).map_err(
            |_| {
                DoorgateError::InvalidConfig(format!(
                    "speech.block_size {} at {} Hz is too long",
                    self.block_size, self.sample_rate
                ))
            },
        )
    }
}

/// Camera selection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CameraConfig {
    pub index: u32,
    pub width: u32,
    pub height: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: 0,
            width: 640,
            height: 480,
        }
    }
}

// ── DoorgateConfig ────────────────────────────────────────────────────────────

/// Top-level configuration, one field per YAML section.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DoorgateConfig {
    pub door: DoorConfig,
    pub gesture: GestureConfig,
    pub speech: SpeechConfig,
    pub camera: CameraConfig,
}

impl DoorgateConfig {
    /// Parse and validate the YAML file at `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, is not valid YAML for this
    /// schema, or fails [`validate`](Self::validate).
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading configuration from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open configuration file: {}", path.display()))?;

        let config = Self::from_yaml(&content)
            .with_context(|| format!("Invalid configuration file: {}", path.display()))?;

        debug!(?config, "Configuration loaded");
        Ok(config)
    }

    /// Parse and validate a YAML document.  An empty document yields the
    /// defaults.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let mut config: DoorgateConfig = if content.trim().is_empty() {
            DoorgateConfig::default()
        } else {
            serde_yaml::from_str(content).context("Failed to parse YAML")?
        };
        config.speech.phrase = config.speech.phrase.trim().to_string();
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints serde cannot express.
    pub fn validate(&self) -> Result<(), DoorgateError> {
        self.door.auto_close()?;
        if self.speech.phrase.trim().is_empty() {
            return Err(DoorgateError::InvalidConfig(
                "speech.phrase must not be empty".into(),
            ));
        }
        self.speech.block_duration()?;
        if self.speech.queue_capacity == 0 {
            return Err(DoorgateError::InvalidConfig(
                "speech.queue_capacity must be at least 1".into(),
            ));
        }
        self.gesture.policy()?;
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
