/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Scripted collaborators driven by a YAML scenario file.
//!
//! A scenario stands in for the camera, landmark model, microphone, speech
//! engine and display so the coordinator can run end-to-end without hardware.
//!
//! ```yaml
//! frame_rate: 30        # video pacing, frames per second
//! frame_count: 300      # frames before end of stream
//! speed: 1.0            # >1 runs faster than real time
//! quit_at_frame: 250    # optional: display reports the quit key here
//! hands:                # cue active from `from_frame` until the next cue
//!   - from_frame: 0
//!     pose: open        # open | fist | none
//!   - from_frame: 60
//!     pose: fist
//!   - from_frame: 200
//!     landmarks: [{x: 1, y: 2}, ...]   # explicit points instead of a preset
//! utterances:           # finalized transcripts, keyed by fed audio time
//!   - at_ms: 3000
//!     text: "Open the door"
//! ```

pub mod devices;

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::info;

use crate::config::DoorgateConfig;
use crate::error::DoorgateError;
use crate::gesture::{closed_fist_landmarks, open_hand_landmarks, Landmark};
use crate::supervisor::Collaborators;

pub use devices::{LogDisplay, ScriptedAudio, ScriptedLandmarker, ScriptedSpeech, ScriptedVideo};

// ── File schema ───────────────────────────────────────────────────────────────

/// Synthetic hand shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandPreset {
    Open,
    Fist,
    /// No hand in view.
    None,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HandCue {
    pub from_frame: u64,
    #[serde(default)]
    pub pose: Option<HandPreset>,
    #[serde(default)]
    pub landmarks: Option<Vec<Landmark>>,
}

impl HandCue {
    /// Landmarks this cue produces, `None` for "no hand".
    pub fn landmarks(&self) -> Option<Vec<Landmark>> {
        if let Some(points) = &self.landmarks {
            return Some(points.clone());
        }
        match self.pose {
            Some(HandPreset::Open) => Some(open_hand_landmarks()),
            Some(HandPreset::Fist) => Some(closed_fist_landmarks()),
            Some(HandPreset::None) | None => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UtteranceCue {
    pub at_ms: u64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    #[serde(default = "default_frame_rate")]
    pub frame_rate: f64,
    pub frame_count: u64,
    #[serde(default = "default_speed")]
    pub speed: f64,
    #[serde(default)]
    pub quit_at_frame: Option<u64>,
    #[serde(default)]
    pub hands: Vec<HandCue>,
    #[serde(default)]
    pub utterances: Vec<UtteranceCue>,
}

fn default_frame_rate() -> f64 {
    30.0
}

fn default_speed() -> f64 {
    1.0
}

impl Scenario {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open scenario file: {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Invalid scenario file: {}", path.display()))
    }

    /// Parse, validate, and sort cues into playback order.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let mut scenario: Scenario =
            serde_yaml::from_str(content).context("Failed to parse YAML")?;

        if !(scenario.frame_rate.is_finite() && scenario.frame_rate > 0.0) {
            bail!("frame_rate must be positive, got {}", scenario.frame_rate);
        }
        if !(scenario.speed.is_finite() && scenario.speed > 0.0) {
            bail!("speed must be positive, got {}", scenario.speed);
        }
        // Pacing divides by speed, so its reciprocal must be a valid duration.
        if Duration::try_from_secs_f64(1.0 / scenario.speed).is_err() {
            bail!("speed {} is too slow to pace", scenario.speed);
        }
        scenario.frame_interval()?;
        for cue in &scenario.hands {
            if cue.pose.is_some() && cue.landmarks.is_some() {
                bail!(
                    "hand cue at frame {} sets both `pose` and `landmarks`",
                    cue.from_frame
                );
            }
        }

        scenario.hands.sort_by_key(|c| c.from_frame);
        scenario.utterances.sort_by_key(|u| u.at_ms);
        Ok(scenario)
    }

    /// Wall-clock gap between two video frames.
    pub fn frame_interval(&self) -> Result<Duration> {
        let fps = self.frame_rate * self.speed;
        Duration::try_from_secs_f64(1.0 / fps).with_context(|| {
            format!(
                "frame_rate {} at speed {} cannot be paced",
                self.frame_rate, self.speed
            )
        })
    }

    /// Build the scripted collaborator set.
    ///
    /// # Errors
    /// Fails when the scenario's speed cannot pace the configured audio
    /// chunks or video frames.
    pub fn collaborators(&self, config: &DoorgateConfig) -> Result<Collaborators> {
        Ok(Collaborators {
            video: Box::new(ScriptedVideo::new(self, &config.camera)?),
            landmarker: Box::new(ScriptedLandmarker::new(self.hands.clone())),
            display: Box::new(LogDisplay::new(self.quit_at_frame)),
            audio: Box::new(ScriptedAudio::new(&config.speech, self.speed)?),
            speech: Box::new(ScriptedSpeech::new(
                self.utterances.clone(),
                config.speech.sample_rate,
            )),
        })
    }
}

/// Load `path` and build its collaborators, mapping any failure to the
/// camera being unavailable.
pub fn open_devices(path: &Path, config: &DoorgateConfig) -> Result<Collaborators, DoorgateError> {
    let device = format!("camera {}", config.camera.index);
    let scenario =
        Scenario::load_from_file(path).map_err(|e| DoorgateError::device_unavailable(&device, e))?;

    info!(
        frames = scenario.frame_count,
        frame_rate = scenario.frame_rate,
        speed = scenario.speed,
        hand_cues = scenario.hands.len(),
        utterances = scenario.utterances.len(),
        "Scenario loaded from {}",
        path.display()
    );
    scenario
        .collaborators(config)
        .map_err(|e| DoorgateError::device_unavailable(&device, e))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn parse_minimal_scenario_with_defaults() {
        let s = Scenario::from_yaml("frame_count: 10\n").unwrap();
        assert_eq!(s.frame_rate, 30.0);
        assert_eq!(s.speed, 1.0);
        assert_eq!(s.quit_at_frame, None);
        assert!(s.hands.is_empty());
        assert!(s.utterances.is_empty());
    }

    #[test]
    fn cues_are_sorted() {
        let yaml = r#"
frame_count: 10
hands:
  - from_frame: 5
    pose: fist
  - from_frame: 0
    pose: open
utterances:
  - at_ms: 2000
    text: second
  - at_ms: 500
    text: first
"#;
        let s = Scenario::from_yaml(yaml).unwrap();
        assert_eq!(s.hands[0].pose, Some(HandPreset::Open));
        assert_eq!(s.utterances[0].text, "first");
    }

    #[test]
    fn explicit_landmarks_win_over_presets() {
        let yaml = r#"
frame_count: 1
hands:
  - from_frame: 0
    landmarks: [{x: 1, y: 2}, {x: 3, y: 4}]
"#;
        let s = Scenario::from_yaml(yaml).unwrap();
        assert_eq!(
            s.hands[0].landmarks(),
            Some(vec![Landmark::new(1, 2), Landmark::new(3, 4)])
        );
    }

    #[test]
    fn none_preset_means_no_hand() {
        let cue = HandCue {
            from_frame: 0,
            pose: Some(HandPreset::None),
            landmarks: None,
        };
        assert_eq!(cue.landmarks(), None);
    }

    #[test]
    fn pose_and_landmarks_together_are_rejected() {
        let yaml = r#"
frame_count: 1
hands:
  - from_frame: 0
    pose: open
    landmarks: [{x: 1, y: 2}]
"#;
        assert!(Scenario::from_yaml(yaml).is_err());
    }

    #[test]
    fn zero_frame_rate_is_rejected() {
        assert!(Scenario::from_yaml("frame_count: 1\nframe_rate: 0\n").is_err());
    }

    #[test]
    fn speed_too_slow_to_pace_is_rejected() {
        let err = Scenario::from_yaml("frame_count: 1\nspeed: 1e-300\n").unwrap_err();
        assert!(format!("{err:#}").contains("speed"), "got: {err:#}");
    }

    #[test]
    fn frame_rate_too_low_to_pace_is_rejected() {
        let err = Scenario::from_yaml("frame_count: 1\nframe_rate: 1e-300\n").unwrap_err();
        assert!(format!("{err:#}").contains("frame_rate"), "got: {err:#}");
    }

    #[test]
    fn accepted_scenario_always_builds_collaborators() {
        let s = Scenario::from_yaml("frame_count: 1\nspeed: 0.001\n").unwrap();
        assert!(s.collaborators(&DoorgateConfig::default()).is_ok());
    }

    #[test]
    fn missing_scenario_is_an_unavailable_camera() {
        let err = open_devices(
            Path::new("/nonexistent/scenario.yaml"),
            &DoorgateConfig::default(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, DoorgateError::DeviceUnavailable { .. }));
        assert!(err.to_string().starts_with("camera 0 unavailable"));
    }

    #[test]
    fn open_devices_from_file() {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(b"frame_count: 3\n").unwrap();
        assert!(open_devices(f.path(), &DoorgateConfig::default()).is_ok());
    }
}
