/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Scripted implementations of the collaborator traits.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::config::{CameraConfig, SpeechConfig};
use crate::gesture::{HandPose, Landmark};
use crate::overlay::Overlay;
use crate::sensors::{
    AudioChunk, AudioSource, AudioStream, ChunkSink, Display, DisplayControl, Frame,
    HandLandmarker, SpeechEngine, VideoSource,
};

use super::{HandCue, Scenario, UtteranceCue};

// ── Video ─────────────────────────────────────────────────────────────────────

/// Yields `frame_count` blank frames paced at `frame_rate × speed`.
#[derive(Debug)]
pub struct ScriptedVideo {
    next: u64,
    count: u64,
    width: u32,
    height: u32,
    interval: Duration,
    last: Option<Instant>,
}

impl ScriptedVideo {
    pub fn new(scenario: &Scenario, camera: &CameraConfig) -> Result<Self> {
        Ok(Self {
            next: 0,
            count: scenario.frame_count,
            width: camera.width,
            height: camera.height,
            interval: scenario.frame_interval()?,
            last: None,
        })
    }
}

impl VideoSource for ScriptedVideo {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.next >= self.count {
            return Ok(None);
        }

        if let Some(last) = self.last {
            let due = last + self.interval;
            let now = Instant::now();
            if due > now {
                thread::sleep(due - now);
            }
        }
        self.last = Some(Instant::now());

        let frame = Frame {
            index: self.next,
            width: self.width,
            height: self.height,
            data: Vec::new(),
        };
        self.next += 1;
        Ok(Some(frame))
    }
}

// ── Landmarks ─────────────────────────────────────────────────────────────────

/// Returns the hand of the cue active at each frame index.
#[derive(Debug, Clone)]
pub struct ScriptedLandmarker {
    /// Sorted by `from_frame`.
    cues: Vec<HandCue>,
}

impl ScriptedLandmarker {
    pub fn new(mut cues: Vec<HandCue>) -> Self {
        cues.sort_by_key(|c| c.from_frame);
        Self { cues }
    }
}

impl HandLandmarker for ScriptedLandmarker {
    fn detect(&mut self, frame: &Frame) -> Result<Option<Vec<Landmark>>> {
        let active = self.cues.partition_point(|c| c.from_frame <= frame.index);
        Ok(match active {
            0 => None,
            n => self.cues[n - 1].landmarks(),
        })
    }
}

// ── Display ───────────────────────────────────────────────────────────────────

/// Logs overlay changes instead of drawing them.
#[derive(Debug, Default)]
pub struct LogDisplay {
    quit_at_frame: Option<u64>,
    last_lines: Option<(String, String)>,
    last_hand: Option<HandPose>,
}

impl LogDisplay {
    pub fn new(quit_at_frame: Option<u64>) -> Self {
        Self {
            quit_at_frame,
            ..Default::default()
        }
    }
}

impl Display for LogDisplay {
    fn present(&mut self, frame: &Frame, overlay: &Overlay) -> Result<DisplayControl> {
        let lines = (overlay.command_line(), overlay.door_line());
        if self.last_lines.as_ref() != Some(&lines) {
            info!(frame = frame.index, "[{}] [{}]", lines.0, lines.1);
            self.last_lines = Some(lines);
        }

        let hand = overlay.hand.as_ref().map(|h| h.pose);
        if hand != self.last_hand {
            match &overlay.hand {
                Some(h) => debug!(
                    frame = frame.index,
                    label = h.pose.label(),
                    bbox = ?h.bbox,
                    "Hand in view"
                ),
                None => debug!(frame = frame.index, "Hand left view"),
            }
            self.last_hand = hand;
        }

        Ok(match self.quit_at_frame {
            Some(q) if frame.index >= q => DisplayControl::Quit,
            _ => DisplayControl::Continue,
        })
    }
}

// ── Audio ─────────────────────────────────────────────────────────────────────

/// Pushes silent chunks from a background thread, one every
/// `block_duration / speed`.
#[derive(Debug, Clone)]
pub struct ScriptedAudio {
    block_size: usize,
    interval: Duration,
}

impl ScriptedAudio {
    /// # Errors
    /// Fails when the chunk length divided by `speed` does not fit a
    /// `Duration`.
    pub fn new(speech: &SpeechConfig, speed: f64) -> Result<Self> {
        let block = speech.block_duration()?;
        let interval = Duration::try_from_secs_f64(block.as_secs_f64() / speed)
            .with_context(|| format!("audio chunk of {block:?} cannot be paced at speed {speed}"))?;
        Ok(Self {
            block_size: speech.block_size,
            interval,
        })
    }
}

impl AudioSource for ScriptedAudio {
    fn start(self: Box<Self>, sink: ChunkSink) -> Result<AudioStream> {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let ScriptedAudio {
            block_size,
            interval,
        } = *self;

        let handle = thread::Builder::new()
            .name("scripted-audio".into())
            .spawn(move || {
                while !thread_stop.load(Ordering::Acquire) {
                    if !sink.push(AudioChunk::silence(block_size)) {
                        break;
                    }
                    let deadline = Instant::now() + interval;
                    loop {
                        if thread_stop.load(Ordering::Acquire) {
                            break;
                        }
                        let now = Instant::now();
                        if now >= deadline {
                            break;
                        }
                        thread::park_timeout(deadline - now);
                    }
                }
                debug!("Scripted audio capture stopped");
            })
            .context("cannot spawn audio capture thread")?;

        Ok(AudioStream::new(move || {
            stop.store(true, Ordering::Release);
            handle.thread().unpark();
            let _ = handle.join();
        }))
    }
}

// ── Speech ────────────────────────────────────────────────────────────────────

/// Emits each scripted utterance once the fed audio reaches its `at_ms`.
///
/// At most one utterance is finalized per chunk.
#[derive(Debug, Clone)]
pub struct ScriptedSpeech {
    /// Sorted by `at_ms`.
    pending: VecDeque<UtteranceCue>,
    sample_rate: u32,
    samples_fed: u64,
}

impl ScriptedSpeech {
    pub fn new(mut utterances: Vec<UtteranceCue>, sample_rate: u32) -> Self {
        utterances.sort_by_key(|u| u.at_ms);
        Self {
            pending: utterances.into(),
            sample_rate,
            samples_fed: 0,
        }
    }

    /// Milliseconds of audio fed so far.
    pub fn elapsed_ms(&self) -> u64 {
        self.samples_fed * 1_000 / u64::from(self.sample_rate.max(1))
    }
}

impl SpeechEngine for ScriptedSpeech {
    fn feed(&mut self, chunk: &AudioChunk) -> Result<Option<String>> {
        self.samples_fed += chunk.samples() as u64;
        let elapsed = self.elapsed_ms();

        match self.pending.front() {
            Some(next) if next.at_ms <= elapsed => {
                Ok(self.pending.pop_front().map(|u| u.text))
            }
            _ => Ok(None),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
