/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Session supervision: builds the shared state, starts both sensing loops,
//! and coordinates shutdown.
//!
//! ```text
//!                 ┌──────────── watch<bool> shutdown ────────────┐
//!                 ▼                                              ▼
//!   spawn_blocking(VisionLoop::run)                 spawn(SpeechLoop::run)
//!                 │                                              │
//!                 └── ends (EOS / quit / error) ─► shutdown ◄── signal (Ctrl-C / SIGTERM)
//! ```
//!
//! * The vision loop is the driving loop: when it ends for any reason the
//!   session shuts down.
//! * A speech-loop failure is logged; the vision loop keeps running.
//! * An in-flight door hold is not awaited.

use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::watch;
use tokio::task::JoinError;
use tracing::{error, info, warn};

use crate::config::DoorgateConfig;
use crate::door::DoorActuator;
use crate::gate::UtteranceGate;
use crate::sensors::{AudioSource, Display, HandLandmarker, SpeechEngine, VideoSource};
use crate::speech::SpeechLoop;
use crate::state::{PerceptionSnapshot, SharedPerceptionState};
use crate::vision::{VisionExit, VisionLoop};

/// Every external collaborator a session needs.
pub struct Collaborators {
    pub video: Box<dyn VideoSource>,
    pub landmarker: Box<dyn HandLandmarker>,
    pub display: Box<dyn Display>,
    pub audio: Box<dyn AudioSource>,
    pub speech: Box<dyn SpeechEngine>,
}

/// How a supervised task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEnd<T> {
    Completed(T),
    /// The task returned an error (rendered with its context chain).
    Failed(String),
    /// The task panicked or was cancelled.
    Aborted(String),
}

impl<T> TaskEnd<T> {
    fn from_join(joined: Result<Result<T>, JoinError>) -> Self {
        match joined {
            Ok(Ok(value)) => TaskEnd::Completed(value),
            Ok(Err(e)) => TaskEnd::Failed(format!("{e:#}")),
            Err(e) => TaskEnd::Aborted(e.to_string()),
        }
    }
}

/// Summary returned once both loops have stopped.
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub vision: TaskEnd<VisionExit>,
    pub speech: TaskEnd<()>,
    /// Door openings during the session.
    pub openings: u64,
    pub final_state: PerceptionSnapshot,
}

pub struct Session {
    config: DoorgateConfig,
    state: Arc<SharedPerceptionState>,
}

impl Session {
    pub fn new(config: DoorgateConfig) -> Self {
        Self {
            config,
            state: Arc::new(SharedPerceptionState::new()),
        }
    }

    /// Handle to the session's shared state.
    pub fn state(&self) -> Arc<SharedPerceptionState> {
        Arc::clone(&self.state)
    }

    /// Run until the vision loop ends or `quit` resolves, then stop both
    /// loops and wait for them.
    ///
    /// # Errors
    /// Only startup failures are returned: an invalid gesture policy or door
    /// hold, or an unavailable microphone.  Failures of the running loops are reported
    /// in the [`SessionReport`].
    pub async fn run(
        self,
        collaborators: Collaborators,
        quit: impl Future<Output = ()>,
    ) -> Result<SessionReport> {
        let Collaborators {
            video,
            landmarker,
            display,
            audio,
            speech,
        } = collaborators;

        let policy = self.config.gesture.policy()?;
        let door = DoorActuator::new(Arc::clone(&self.state), self.config.door.auto_close()?);
        let gate = UtteranceGate::new(&self.config.speech.phrase, Arc::clone(&self.state), door);

        let speech_loop = SpeechLoop::start(
            audio,
            speech,
            gate,
            Arc::clone(&self.state),
            self.config.speech.queue_capacity,
        )?;
        let vision_loop = VisionLoop::new(video, landmarker, display, policy, Arc::clone(&self.state));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let vision_rx = shutdown_rx.clone();
        let mut vision = tokio::task::spawn_blocking(move || vision_loop.run(vision_rx));
        let mut speech = tokio::spawn(speech_loop.run(shutdown_rx));

        tokio::pin!(quit);
        let mut quit_seen = false;
        let mut vision_end = None;
        let mut speech_end = None;

        while vision_end.is_none() || speech_end.is_none() {
            tokio::select! {
                _ = &mut quit, if !quit_seen => {
                    quit_seen = true;
                    info!("Quit signal received, stopping all loops");
                    shutdown_tx.send_replace(true);
                }
                joined = &mut vision, if vision_end.is_none() => {
                    let end = TaskEnd::from_join(joined);
                    match &end {
                        TaskEnd::Completed(exit) => info!(?exit, "Vision loop finished"),
                        TaskEnd::Failed(e) => error!("Vision loop failed: {e}"),
                        TaskEnd::Aborted(e) => error!("Vision loop aborted: {e}"),
                    }
                    vision_end = Some(end);
                    shutdown_tx.send_replace(true);
                }
                joined = &mut speech, if speech_end.is_none() => {
                    let end = TaskEnd::from_join(joined);
                    match &end {
                        TaskEnd::Completed(()) => info!("Speech loop finished"),
                        TaskEnd::Failed(e) => {
                            error!("Speech loop failed: {e}");
                            warn!("Continuing without voice commands");
                        }
                        TaskEnd::Aborted(e) => error!("Speech loop aborted: {e}"),
                    }
                    speech_end = Some(end);
                }
            }
        }

        let report = SessionReport {
            vision: vision_end.unwrap_or(TaskEnd::Aborted("not joined".into())),
            speech: speech_end.unwrap_or(TaskEnd::Aborted("not joined".into())),
            openings: self.state.open_count(),
            final_state: self.state.snapshot(),
        };
        info!(
            openings = report.openings,
            door = %report.final_state.door,
            last_command = %report.final_state.last_utterance,
            "Session ended"
        );
        Ok(report)
    }
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
pub async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        info!("Shutdown signal received (SIGINT/Ctrl+C)");
                    }
                    _ = sigterm.recv() => {
                        info!("Shutdown signal received (SIGTERM)");
                    }
                }
                return;
            }
            Err(e) => warn!("Cannot register SIGTERM handler, Ctrl+C only: {e}"),
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Cannot listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received (SIGINT/Ctrl+C)");
}
