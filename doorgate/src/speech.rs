/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Speech loop: bounded audio queue → speech engine → utterance gate.
//!
//! The microphone is opened in [`SpeechLoop::start`] so an unavailable device
//! is reported before any task is spawned.  The returned loop owns the capture
//! guard; capture stops when [`SpeechLoop::run`] returns.
//!
//! Decoding is a synchronous call into the engine.  Each chunk is decoded on
//! the blocking pool so a slow decode never stalls a runtime worker, and with
//! it the door's hold timer.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use crate::error::DoorgateError;
use crate::gate::{GateOutcome, UtteranceGate};
use crate::sensors::{audio_queue, AudioChunk, AudioSource, AudioStream, SpeechEngine};
use crate::state::SharedPerceptionState;

pub struct SpeechLoop {
    /// `None` only while a chunk is being decoded on the blocking pool.
    engine: Option<Box<dyn SpeechEngine>>,
    gate: UtteranceGate,
    state: Arc<SharedPerceptionState>,
    chunks: mpsc::Receiver<AudioChunk>,
    _stream: AudioStream,
}

impl std::fmt::Debug for SpeechLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechLoop").finish_non_exhaustive()
    }
}

impl SpeechLoop {
    /// Open the microphone and wire it to a queue of `queue_capacity` chunks.
    ///
    /// # Errors
    /// [`DoorgateError::DeviceUnavailable`] if the audio source fails to start.
    pub fn start(
        source: Box<dyn AudioSource>,
        engine: Box<dyn SpeechEngine>,
        gate: UtteranceGate,
        state: Arc<SharedPerceptionState>,
        queue_capacity: usize,
    ) -> Result<Self, DoorgateError> {
        let (sink, chunks) = audio_queue(queue_capacity);
        let stream = source
            .start(sink)
            .map_err(|e| DoorgateError::device_unavailable("microphone", e))?;
        info!(queue_capacity, "Listening for voice commands...");

        Ok(Self {
            engine: Some(engine),
            gate,
            state,
            chunks,
            _stream: stream,
        })
    }

    /// Decode chunks until shutdown or until the capture side closes the
    /// queue.
    ///
    /// # Errors
    /// Speech engine failures end the loop and are returned with context.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let mut chunks_fed: u64 = 0;

        loop {
            if *shutdown.borrow_and_update() {
                break;
            }

            let chunk = tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        // Supervisor gone: nothing left to report to.
                        break;
                    }
                    continue;
                }
                chunk = self.chunks.recv() => match chunk {
                    Some(chunk) => chunk,
                    None => {
                        info!("Audio stream closed");
                        break;
                    }
                },
            };

            chunks_fed += 1;
            let transcript = self
                .decode(chunk)
                .await
                .with_context(|| format!("speech engine failed on chunk {chunks_fed}"))?;

            if let Some(text) = transcript {
                self.on_transcript(&text);
            }
        }

        debug!(chunks_fed, "Speech loop stopped");
        Ok(())
    }

    /// Feed one chunk to the engine on the blocking pool.
    async fn decode(&mut self, chunk: AudioChunk) -> Result<Option<String>> {
        let mut engine = self
            .engine
            .take()
            .context("speech engine was lost by an earlier decode")?;

        let (engine, transcript) = tokio::task::spawn_blocking(move || {
            let transcript = engine.feed(&chunk);
            (engine, transcript)
        })
        .await
        .context("speech engine panicked")?;

        self.engine = Some(engine);
        transcript
    }

    /// Record and gate one finalized transcript.
    pub fn on_transcript(&self, text: &str) -> Option<GateOutcome> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        self.state.set_last_utterance(text);
        info!("Heard: {text}");
        Some(self.gate.evaluate(text))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::door::DoorActuator;
    use crate::gate::DEFAULT_PHRASE;
    use crate::gesture::HandPose;
    use crate::sensors::ChunkSink;
    use crate::state::DoorState;
    use std::collections::VecDeque;
    use std::time::Duration;

    /// Audio source that hands the sink back to the test.
    struct HandOff(tokio::sync::oneshot::Sender<ChunkSink>);

    impl AudioSource for HandOff {
        fn start(self: Box<Self>, sink: ChunkSink) -> Result<AudioStream> {
            let _ = self.0.send(sink);
            Ok(AudioStream::new(|| {}))
        }
    }

    struct BrokenMic;

    impl AudioSource for BrokenMic {
        fn start(self: Box<Self>, _sink: ChunkSink) -> Result<AudioStream> {
            anyhow::bail!("no input device")
        }
    }

    /// Engine that returns one scripted result per chunk.
    struct Script(VecDeque<Option<String>>);

    impl SpeechEngine for Script {
        fn feed(&mut self, _chunk: &AudioChunk) -> Result<Option<String>> {
            Ok(self.0.pop_front().flatten())
        }
    }

    struct Exploding;

    impl SpeechEngine for Exploding {
        fn feed(&mut self, _chunk: &AudioChunk) -> Result<Option<String>> {
            anyhow::bail!("model corrupted")
        }
    }

    /// Engine that hears the command on the first chunk and then stalls on
    /// every later one.
    struct StallAfterCommand {
        fed: usize,
        stall: Duration,
    }

    impl SpeechEngine for StallAfterCommand {
        fn feed(&mut self, _chunk: &AudioChunk) -> Result<Option<String>> {
            self.fed += 1;
            if self.fed == 1 {
                return Ok(Some("open the door".into()));
            }
            std::thread::sleep(self.stall);
            Ok(None)
        }
    }

    fn gate(state: &Arc<SharedPerceptionState>) -> UtteranceGate {
        let door = DoorActuator::new(Arc::clone(state), Duration::from_secs(5));
        UtteranceGate::new(DEFAULT_PHRASE, Arc::clone(state), door)
    }

    fn start(
        engine: Box<dyn SpeechEngine>,
    ) -> (SpeechLoop, ChunkSink, Arc<SharedPerceptionState>) {
        let state = Arc::new(SharedPerceptionState::new());
        let (tx, mut rx) = tokio::sync::oneshot::channel();
        let speech = SpeechLoop::start(Box::new(HandOff(tx)), engine, gate(&state), Arc::clone(&state), 8)
            .unwrap();
        let sink = rx.try_recv().unwrap();
        (speech, sink, state)
    }

    fn script(items: &[Option<&str>]) -> Box<dyn SpeechEngine> {
        Box::new(Script(
            items.iter().map(|s| s.map(str::to_string)).collect(),
        ))
    }

    #[test]
    fn unavailable_microphone_is_a_device_error() {
        let state = Arc::new(SharedPerceptionState::new());
        let err = SpeechLoop::start(
            Box::new(BrokenMic),
            script(&[]),
            gate(&state),
            Arc::clone(&state),
            8,
        )
        .unwrap_err();
        assert!(matches!(err, DoorgateError::DeviceUnavailable { .. }));
        assert!(err.to_string().contains("no input device"));
    }

    #[tokio::test(start_paused = true)]
    async fn finalized_text_updates_state_and_gates() {
        let (speech, sink, state) = start(script(&[None, Some("Open The Door"), None]));
        state.set_hand_pose(HandPose::ClosedFist);

        for _ in 0..3 {
            sink.push(AudioChunk::silence(8000));
        }
        drop(sink);

        let (_tx, rx) = watch::channel(false);
        speech.run(rx).await.unwrap();

        assert_eq!(state.last_utterance(), "Open The Door");
        assert_eq!(state.door_state(), DoorState::Open);
        assert_eq!(state.open_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_results_do_not_touch_state() {
        let (speech, sink, state) = start(script(&[None, Some("   "), None]));
        state.set_last_utterance("earlier");

        for _ in 0..3 {
            sink.push(AudioChunk::silence(10));
        }
        drop(sink);

        let (_tx, rx) = watch::channel(false);
        speech.run(rx).await.unwrap();
        assert_eq!(state.last_utterance(), "earlier");
    }

    #[tokio::test(start_paused = true)]
    async fn last_utterance_persists_until_replaced() {
        let (speech, sink, state) = start(script(&[Some("hello"), None, None]));
        for _ in 0..3 {
            sink.push(AudioChunk::silence(10));
        }
        drop(sink);

        let (_tx, rx) = watch::channel(false);
        speech.run(rx).await.unwrap();
        assert_eq!(state.last_utterance(), "hello");
        assert_eq!(state.door_state(), DoorState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn open_hand_command_is_recorded_but_denied() {
        let (speech, sink, state) = start(script(&[Some("open the door")]));
        state.set_hand_pose(HandPose::OpenHand);
        sink.push(AudioChunk::silence(10));
        drop(sink);

        let (_tx, rx) = watch::channel(false);
        speech.run(rx).await.unwrap();
        assert_eq!(state.last_utterance(), "open the door");
        assert_eq!(state.door_state(), DoorState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_a_waiting_loop() {
        let (speech, _sink, _state) = start(script(&[]));
        let (tx, rx) = watch::channel(false);

        let task = tokio::spawn(speech.run(rx));
        tokio::task::yield_now().await;
        tx.send_replace(true);

        task.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn engine_failure_ends_the_loop_with_error() {
        let (speech, sink, _state) = start(Box::new(Exploding));
        sink.push(AudioChunk::silence(10));

        let (_tx, rx) = watch::channel(false);
        let err = speech.run(rx).await.unwrap_err();
        assert!(format!("{err:#}").contains("model corrupted"));
    }

    #[tokio::test(start_paused = true)]
    async fn back_to_back_commands_open_once() {
        let (speech, sink, state) =
            start(script(&[Some("open the door"), Some("OPEN THE DOOR please")]));
        state.set_hand_pose(HandPose::ClosedFist);
        sink.push(AudioChunk::silence(10));
        sink.push(AudioChunk::silence(10));
        drop(sink);

        let (_tx, rx) = watch::channel(false);
        speech.run(rx).await.unwrap();
        assert_eq!(state.open_count(), 1);
        assert_eq!(state.last_utterance(), "OPEN THE DOOR please");
    }

    #[tokio::test]
    async fn slow_decode_does_not_stretch_the_door_hold() {
        let state = Arc::new(SharedPerceptionState::new());
        state.set_hand_pose(HandPose::ClosedFist);
        let door = DoorActuator::new(Arc::clone(&state), Duration::from_millis(100));
        let gate = UtteranceGate::new(DEFAULT_PHRASE, Arc::clone(&state), door);
        let engine = StallAfterCommand {
            fed: 0,
            stall: Duration::from_millis(800),
        };

        let (tx, mut rx) = tokio::sync::oneshot::channel();
        let speech = SpeechLoop::start(
            Box::new(HandOff(tx)),
            Box::new(engine),
            gate,
            Arc::clone(&state),
            8,
        )
        .unwrap();
        let sink = rx.try_recv().unwrap();
        sink.push(AudioChunk::silence(10));
        sink.push(AudioChunk::silence(10));
        drop(sink);

        let mut door = state.subscribe_door();
        let (_tx, shutdown) = watch::channel(false);
        let start = std::time::Instant::now();
        let run = tokio::spawn(speech.run(shutdown));

        while !(state.open_count() == 1 && state.door_state() == DoorState::Closed) {
            door.changed().await.unwrap();
        }
        let held = start.elapsed();
        assert!(held >= Duration::from_millis(100), "closed early: {held:?}");
        assert!(held < Duration::from_millis(500), "hold stretched: {held:?}");

        run.await.unwrap().unwrap();
    }
}
