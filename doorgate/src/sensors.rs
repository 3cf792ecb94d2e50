/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Collaborator seams: camera, hand-landmark model, microphone, speech engine
//! and display.
//!
//! The coordinator only talks to these traits.  Real device backends live
//! outside this crate; [`scenario`](crate::scenario) provides scripted
//! implementations.
//!
//! ```text
//! VideoSource ──Frame──► HandLandmarker ──landmarks──► GesturePolicy ──► state.hand_pose
//!      │                                                                     │
//!      └──────────────── Frame + Overlay ──► Display ◄──── snapshot ─────────┘
//!
//! AudioSource ──push──► ChunkSink ══bounded mpsc══► speech loop ──► SpeechEngine::feed
//! ```
//!
//! Collaborator failures are reported as `anyhow::Error`; they end the owning
//! loop and are logged by the supervisor.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::warn;

use crate::gesture::Landmark;
use crate::overlay::Overlay;

// ── Video ─────────────────────────────────────────────────────────────────────

/// One decoded camera frame.  The coordinator never inspects the pixels.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    /// Monotonic frame number, starting at 0.
    pub index: u64,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// Camera handle.  Dropping it releases the device.
pub trait VideoSource: Send {
    /// Next frame, or `Ok(None)` at end of stream.
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}

/// External hand-landmark model.
pub trait HandLandmarker: Send {
    /// Pixel-space landmarks for at most one hand, `Ok(None)` if no hand is
    /// visible.
    fn detect(&mut self, frame: &Frame) -> Result<Option<Vec<Landmark>>>;
}

/// What the display wants the vision loop to do after presenting a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayControl {
    Continue,
    /// The user asked to quit (e.g. ESC key).
    Quit,
}

/// Write-only presentation surface.
pub trait Display: Send {
    fn present(&mut self, frame: &Frame, overlay: &Overlay) -> Result<DisplayControl>;
}

// ── Audio ─────────────────────────────────────────────────────────────────────

/// Raw PCM: signed 16-bit little-endian, mono.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AudioChunk {
    pub bytes: Vec<u8>,
}

impl AudioChunk {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// `samples` zero-valued samples.
    pub fn silence(samples: usize) -> Self {
        Self {
            bytes: vec![0; samples * 2],
        }
    }

    pub fn samples(&self) -> usize {
        self.bytes.len() / 2
    }
}

/// Producer half of the audio queue, handed to the capture callback.
///
/// [`push`](Self::push) never blocks: capture callbacks run on the audio
/// subsystem's thread and must return quickly.  When the queue is full the
/// chunk is dropped and counted.
#[derive(Debug, Clone)]
pub struct ChunkSink {
    tx: mpsc::Sender<AudioChunk>,
    dropped: Arc<AtomicU64>,
}

impl ChunkSink {
    /// Enqueue one chunk.
    ///
    /// Returns `false` once the consumer has gone away; the producer should
    /// stop capturing.  A full queue drops the chunk but still returns `true`.
    pub fn push(&self, chunk: AudioChunk) -> bool {
        match self.tx.try_send(chunk) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(dropped, "Audio queue full, dropping chunk");
                true
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Chunks dropped because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Bounded audio queue between the capture callback and the speech loop.
pub fn audio_queue(capacity: usize) -> (ChunkSink, mpsc::Receiver<AudioChunk>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let sink = ChunkSink {
        tx,
        dropped: Arc::new(AtomicU64::new(0)),
    };
    (sink, rx)
}

/// Live capture guard.  Capture stops when it is dropped.
pub struct AudioStream {
    stop: Option<Box<dyn FnOnce() + Send>>,
}

impl AudioStream {
    /// Guard that runs `stop` exactly once on drop.
    pub fn new(stop: impl FnOnce() + Send + 'static) -> Self {
        Self {
            stop: Some(Box::new(stop)),
        }
    }
}

impl Drop for AudioStream {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            stop();
        }
    }
}

impl std::fmt::Debug for AudioStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioStream")
            .field("active", &self.stop.is_some())
            .finish()
    }
}

/// Microphone.
pub trait AudioSource: Send {
    /// Open the device and start pushing chunks into `sink`.
    ///
    /// # Errors
    /// Any error here is treated as "device unavailable" and is fatal at
    /// startup.
    fn start(self: Box<Self>, sink: ChunkSink) -> Result<AudioStream>;
}

/// Streaming speech-to-text engine.  Stateful across calls.
pub trait SpeechEngine: Send {
    /// Feed one chunk.  Returns a finalized transcript when an utterance has
    /// ended, `Ok(None)` otherwise.  Partial hypotheses are never returned.
    fn feed(&mut self, chunk: &AudioChunk) -> Result<Option<String>>;
}

// ── Tests ─────────────────────────────────────────────────────────────────────
