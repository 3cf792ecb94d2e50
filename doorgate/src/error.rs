/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured error types for the doorgate coordinator.
//!
//! Two types model the two failure layers:
//!
//! * [`DenialReason`]: why an "open the door" request was refused.  A denial
//!   is an expected outcome: it is logged, never propagated, and never changes
//!   state.
//! * [`DoorgateError`]: failures that stop a session from starting (device
//!   or configuration problems).
//!
//! Recognition misses ("no finalized text yet") and end-of-stream are not
//! errors at all; they are modelled as `Option::None` on the collaborator
//! traits in [`sensors`](crate::sensors).

use thiserror::Error;

use crate::gesture::{GestureError, HandPose};

// ── Access denial ─────────────────────────────────────────────────────────────

/// Reason why a qualifying voice command did not open the door.
///
/// Returned inside [`GateOutcome::Denied`](crate::gate::GateOutcome::Denied)
/// and from [`DoorActuator::request_open`](crate::door::DoorActuator::request_open).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    /// The phrase was heard but the last classified pose was not a closed
    /// fist.
    HandNotClosed { pose: HandPose },

    /// An open→close cycle is already in flight.  The request is dropped;
    /// the running hold timer is not extended.
    DoorAlreadyOpen,
}

impl std::fmt::Display for DenialReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DenialReason::HandNotClosed { pose } => {
                write!(f, "hand not closed (last pose: {}), access denied", pose)
            }
            DenialReason::DoorAlreadyOpen => {
                write!(f, "door is already open, request dropped")
            }
        }
    }
}

// ── Session errors ────────────────────────────────────────────────────────────

/// Fatal errors raised while bringing a session up.
///
/// `main` logs these with `{:#}` and exits with status 1.
#[derive(Debug, Error)]
pub enum DoorgateError {
    /// A capture device (camera or microphone) could not be opened.
    #[error("{device} unavailable: {reason}")]
    DeviceUnavailable { device: String, reason: String },

    /// The configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The configured gesture policy cannot be built.
    #[error("invalid gesture policy: {0}")]
    Gesture(#[from] GestureError),
}

impl DoorgateError {
    /// Build a [`DoorgateError::DeviceUnavailable`] from any displayable cause.
    ///
    /// The alternate (`{:#}`) form is used so `anyhow` context chains are kept.
    pub fn device_unavailable(device: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        DoorgateError::DeviceUnavailable {
            device: device.into(),
            reason: format!("{:#}", reason),
        }
    }
}
