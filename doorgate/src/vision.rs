/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Vision loop: frame → landmarks → pose → shared state → display.
//!
//! Runs on a dedicated blocking thread because frame acquisition and landmark
//! inference are synchronous calls into external libraries.  The loop owns the
//! camera handle, so the device is released as soon as [`VisionLoop::run`]
//! returns, whatever the reason.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::gesture::{GesturePolicy, Landmark};
use crate::overlay::{BoundingBox, HandOverlay, Overlay};
use crate::sensors::{Display, DisplayControl, Frame, HandLandmarker, VideoSource};
use crate::state::SharedPerceptionState;

/// Why the vision loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisionExit {
    /// The camera reported end of stream.
    StreamEnded,
    /// The display reported a quit key.
    QuitRequested,
    /// The supervisor asked all loops to stop.
    Shutdown,
}

pub struct VisionLoop {
    video: Box<dyn VideoSource>,
    landmarker: Box<dyn HandLandmarker>,
    display: Box<dyn Display>,
    policy: GesturePolicy,
    state: Arc<SharedPerceptionState>,
}

impl VisionLoop {
    pub fn new(
        video: Box<dyn VideoSource>,
        landmarker: Box<dyn HandLandmarker>,
        display: Box<dyn Display>,
        policy: GesturePolicy,
        state: Arc<SharedPerceptionState>,
    ) -> Self {
        Self {
            video,
            landmarker,
            display,
            policy,
            state,
        }
    }

    /// Process frames until end of stream, a quit key, or `shutdown` turns
    /// `true`.
    ///
    /// Blocking; call from `spawn_blocking` or a dedicated thread.
    ///
    /// # Errors
    /// Collaborator failures are returned unchanged (with context).
    pub fn run(mut self, shutdown: watch::Receiver<bool>) -> Result<VisionExit> {
        info!("Hand detection started");
        let mut frames: u64 = 0;

        let exit = loop {
            if *shutdown.borrow() {
                break VisionExit::Shutdown;
            }

            let frame = match self.video.next_frame().context("camera read failed")? {
                Some(frame) => frame,
                None => {
                    info!(frames, "Camera stream ended");
                    break VisionExit::StreamEnded;
                }
            };
            frames += 1;

            let control = self.step(&frame)?;
            if control == DisplayControl::Quit {
                info!(frames, "Quit requested from display");
                break VisionExit::QuitRequested;
            }
        };

        Ok(exit)
    }

    /// Handle one frame.
    fn step(&mut self, frame: &Frame) -> Result<DisplayControl> {
        let hand = match self
            .landmarker
            .detect(frame)
            .with_context(|| format!("hand landmark detection failed on frame {}", frame.index))?
        {
            Some(landmarks) => self.classify(frame.index, &landmarks),
            // No hand: keep the last pose.
            None => None,
        };

        let overlay = Overlay::compose(hand, self.state.snapshot());
        self.display
            .present(frame, &overlay)
            .context("display failed")
    }

    fn classify(&self, frame_index: u64, landmarks: &[Landmark]) -> Option<HandOverlay> {
        let pose = match self.policy.classify(landmarks) {
            Ok(pose) => pose,
            Err(e) => {
                warn!(frame = frame_index, "Cannot classify hand: {e}");
                return None;
            }
        };

        let previous = self.state.hand_pose();
        self.state.set_hand_pose(pose);
        if previous != pose {
            info!(frame = frame_index, %previous, %pose, "Hand pose changed");
        } else {
            debug!(frame = frame_index, %pose, "Hand pose");
        }

        BoundingBox::around(landmarks).map(|bbox| HandOverlay { bbox, pose })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
