/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Shared perception state: the single point of truth read by the door
//! actuator and written by the sensing loops.
//!
//! # Synchronisation policy (per field)
//!
//! | Field | Writer | Mechanism |
//! |---|---|---|
//! | `hand_pose` | vision loop only | `AtomicU8`, `Release` store / `Acquire` load |
//! | `last_utterance` | speech loop only | `RwLock<String>`, overwrite under a short write lock |
//! | `door` | actuator only | `Mutex<DoorState>` compare-and-set ([`try_begin_open`](SharedPerceptionState::try_begin_open)) |
//!
//! The door mutex is the only real mutual-exclusion point: two near-simultaneous
//! qualifying voice events must not both see `Closed`.  Every door transition
//! is also published on a `tokio::sync::watch` channel so observers can await
//! a transition instead of polling.
//!
//! The state is created once per session and shared as
//! `Arc<SharedPerceptionState>`; there are no globals.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};

use tokio::sync::watch;

use crate::gesture::HandPose;

// ── DoorState ─────────────────────────────────────────────────────────────────

/// Current actuator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DoorState {
    #[default]
    Closed,
    Open,
}

impl DoorState {
    pub fn as_str(self) -> &'static str {
        match self {
            DoorState::Closed => "CLOSED",
            DoorState::Open => "OPEN",
        }
    }
}

impl std::fmt::Display for DoorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Snapshot ──────────────────────────────────────────────────────────────────

/// Point-in-time copy of the three shared fields.
///
/// Fields are read one after another, not under a common lock, so a snapshot
/// taken during a transition may mix old and new values.  That is fine for
/// display purposes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PerceptionSnapshot {
    pub hand_pose: HandPose,
    pub last_utterance: String,
    pub door: DoorState,
}

// ── SharedPerceptionState ─────────────────────────────────────────────────────

#[derive(Debug)]
pub struct SharedPerceptionState {
    hand_pose: AtomicU8,
    last_utterance: RwLock<String>,
    door: Mutex<DoorState>,
    door_tx: watch::Sender<DoorState>,
    /// Successful `Closed → Open` transitions since creation.
    open_count: AtomicU64,
}

impl SharedPerceptionState {
    /// Fresh state: `(Unknown, "", Closed)`.
    pub fn new() -> Self {
        let (door_tx, _) = watch::channel(DoorState::Closed);
        Self {
            hand_pose: AtomicU8::new(HandPose::Unknown.to_u8()),
            last_utterance: RwLock::new(String::new()),
            door: Mutex::new(DoorState::Closed),
            door_tx,
            open_count: AtomicU64::new(0),
        }
    }

    // ── Hand pose (vision loop) ───────────────────────────────────────────────

    pub fn set_hand_pose(&self, pose: HandPose) {
        self.hand_pose.store(pose.to_u8(), Ordering::Release);
    }

    pub fn hand_pose(&self) -> HandPose {
        HandPose::from_u8(self.hand_pose.load(Ordering::Acquire))
    }

    // ── Last utterance (speech loop) ──────────────────────────────────────────

    pub fn set_last_utterance(&self, text: impl Into<String>) {
        let text = text.into();
        let mut slot = self
            .last_utterance
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *slot = text;
    }

    pub fn last_utterance(&self) -> String {
        self.last_utterance
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    // ── Door (actuator) ───────────────────────────────────────────────────────

    /// Atomically move `Closed → Open`.
    ///
    /// Returns `true` if this call performed the transition, `false` (with no
    /// mutation) if the door was already open.
    pub fn try_begin_open(&self) -> bool {
        let mut door = self.door.lock().unwrap_or_else(PoisonError::into_inner);
        if *door == DoorState::Open {
            return false;
        }
        *door = DoorState::Open;
        self.open_count.fetch_add(1, Ordering::Relaxed);
        self.door_tx.send_replace(DoorState::Open);
        true
    }

    /// Unconditionally return the door to `Closed`.
    ///
    /// Must only be called by the actuation task whose `try_begin_open`
    /// returned `true`.
    pub fn end_open(&self) {
        let mut door = self.door.lock().unwrap_or_else(PoisonError::into_inner);
        *door = DoorState::Closed;
        self.door_tx.send_replace(DoorState::Closed);
    }

    pub fn door_state(&self) -> DoorState {
        *self.door.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Receiver that observes every door transition.
    pub fn subscribe_door(&self) -> watch::Receiver<DoorState> {
        self.door_tx.subscribe()
    }

    pub fn open_count(&self) -> u64 {
        self.open_count.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> PerceptionSnapshot {
        PerceptionSnapshot {
            hand_pose: self.hand_pose(),
            last_utterance: self.last_utterance(),
            door: self.door_state(),
        }
    }
}

impl Default for SharedPerceptionState {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
