/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Utterance gating: decides whether a finalized transcript opens the door.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::door::DoorActuator;
use crate::error::DenialReason;
use crate::gesture::HandPose;
use crate::state::SharedPerceptionState;

/// Default command phrase.
pub const DEFAULT_PHRASE: &str = "open the door";

/// Result of evaluating one transcript.
#[derive(Debug)]
pub enum GateOutcome {
    /// The transcript does not contain the command phrase.
    NoCommand,
    /// An actuation task was started.
    Opened(JoinHandle<()>),
    /// The phrase was heard but the request was refused.
    Denied(DenialReason),
}

pub struct UtteranceGate {
    /// Trimmed, lower-cased command phrase.
    phrase: String,
    state: Arc<SharedPerceptionState>,
    door: DoorActuator,
}

impl UtteranceGate {
    pub fn new(phrase: &str, state: Arc<SharedPerceptionState>, door: DoorActuator) -> Self {
        Self {
            phrase: phrase.trim().to_lowercase(),
            state,
            door,
        }
    }

    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    /// Case-insensitive substring match against the command phrase.
    pub fn matches(&self, transcript: &str) -> bool {
        transcript.to_lowercase().contains(&self.phrase)
    }

    /// Gate one finalized transcript.
    ///
    /// The hand pose is read once, after the phrase matched.  The pose can
    /// change between the utterance and this read (or between the read and the
    /// door opening); that window is accepted.  This is a demo interlock, not
    /// an access-control boundary.
    pub fn evaluate(&self, transcript: &str) -> GateOutcome {
        if !self.matches(transcript) {
            debug!(transcript, "No command phrase in transcript");
            return GateOutcome::NoCommand;
        }

        let pose = self.state.hand_pose();
        if pose != HandPose::ClosedFist {
            let reason = DenialReason::HandNotClosed { pose };
            warn!("{reason}");
            return GateOutcome::Denied(reason);
        }

        info!(%pose, "Command phrase heard with closed fist");
        match self.door.request_open() {
            Ok(task) => GateOutcome::Opened(task),
            Err(reason) => GateOutcome::Denied(reason),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
