/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! doorgate – gesture + voice gated door coordinator
//!
//! A simulated door opens when the last finalized voice command contains the
//! command phrase *and* the last classified hand pose is a closed fist.
//!
//! Module layout:
//!
//! ```text
//! lib.rs
//! ├── config/       – YAML configuration (door, gesture, speech, camera)
//! ├── error         – denial reasons and session errors
//! ├── state         – SharedPerceptionState (pose, utterance, door)
//! ├── door          – timed, non-overlapping door actuation
//! ├── gesture       – landmarks and the open / fist policy
//! ├── gate          – command phrase gating
//! ├── sensors       – collaborator traits, frames, audio queue
//! ├── overlay       – what the display draws
//! ├── vision        – camera → pose loop (blocking thread)
//! ├── speech        – audio → transcript loop (async task)
//! ├── supervisor    – session lifetime and shutdown
//! └── scenario/     – scripted collaborators for hardware-free runs
//! ```

pub mod config;
pub mod door;
pub mod error;
pub mod gate;
pub mod gesture;
pub mod overlay;
pub mod scenario;
pub mod sensors;
pub mod speech;
pub mod state;
pub mod supervisor;
pub mod vision;
