/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Simulated door actuator.
//!
//! ```text
//! Closed ──request_open()──► Open ──(hold elapses)──► Closed
//!            │
//!            └── already Open → DenialReason::DoorAlreadyOpen (dropped, not queued)
//! ```
//!
//! Each successful request spawns one Tokio task that sleeps for the hold
//! duration and then closes the door.  Because the `Closed → Open` step is the
//! mutex compare-and-set in [`SharedPerceptionState::try_begin_open`], at most
//! one such task is alive at any time.  The hold cannot be cancelled or
//! extended once it has started.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::DenialReason;
use crate::state::SharedPerceptionState;

/// Default time the door stays open before closing itself.
pub const DEFAULT_AUTO_CLOSE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct DoorActuator {
    state: Arc<SharedPerceptionState>,
    hold: Duration,
}

impl DoorActuator {
    pub fn new(state: Arc<SharedPerceptionState>, hold: Duration) -> Self {
        Self { state, hold }
    }

    pub fn hold(&self) -> Duration {
        self.hold
    }

    /// Start one open→close cycle if the door is closed.
    ///
    /// Returns the handle of the actuation task; awaiting it completes once the
    /// door has closed again.  Must be called from within a Tokio runtime.
    ///
    /// # Errors
    /// [`DenialReason::DoorAlreadyOpen`] when a cycle is already in flight.
    /// The request is logged and dropped.
    pub fn request_open(&self) -> Result<JoinHandle<()>, DenialReason> {
        if !self.state.try_begin_open() {
            warn!("{}", DenialReason::DoorAlreadyOpen);
            return Err(DenialReason::DoorAlreadyOpen);
        }

        info!(hold_secs = self.hold.as_secs_f64(), "Opening door");
        info!("Door will close in {:.1} seconds...", self.hold.as_secs_f64());

        let state = Arc::clone(&self.state);
        let hold = self.hold;
        Ok(tokio::spawn(async move {
            tokio::time::sleep(hold).await;
            state.end_open();
            info!("Closing door");
        }))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
