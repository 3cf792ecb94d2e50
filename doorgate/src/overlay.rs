/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Overlay model handed to the [`Display`](crate::sensors::Display) with each
//! frame: an optional hand annotation plus two status lines.

use crate::gesture::{HandPose, Landmark};
use crate::state::{DoorState, PerceptionSnapshot};

/// Padding added around the landmark extent, in pixels.
pub const HAND_BOX_PADDING: i32 = 10;

/// Vertical offset of the pose label above the box's top edge.
const LABEL_OFFSET: i32 = 20;

/// Axis-aligned box in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x_min: i32,
    pub y_min: i32,
    pub x_max: i32,
    pub y_max: i32,
}

impl BoundingBox {
    /// Extent of `landmarks` grown by [`HAND_BOX_PADDING`] on every side.
    /// `None` for an empty slice.
    pub fn around(landmarks: &[Landmark]) -> Option<Self> {
        let first = landmarks.first()?;
        let init = BoundingBox {
            x_min: first.x,
            y_min: first.y,
            x_max: first.x,
            y_max: first.y,
        };
        let tight = landmarks.iter().fold(init, |b, p| BoundingBox {
            x_min: b.x_min.min(p.x),
            y_min: b.y_min.min(p.y),
            x_max: b.x_max.max(p.x),
            y_max: b.y_max.max(p.y),
        });
        Some(BoundingBox {
            x_min: tight.x_min - HAND_BOX_PADDING,
            y_min: tight.y_min - HAND_BOX_PADDING,
            x_max: tight.x_max + HAND_BOX_PADDING,
            y_max: tight.y_max + HAND_BOX_PADDING,
        })
    }
}

/// Annotation for the hand detected in this frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandOverlay {
    pub bbox: BoundingBox,
    pub pose: HandPose,
}

impl HandOverlay {
    /// Anchor of the pose label: left edge of the unpadded extent, 20 px above
    /// its top.
    pub fn label_anchor(&self) -> (i32, i32) {
        (
            self.bbox.x_min + HAND_BOX_PADDING,
            self.bbox.y_min + HAND_BOX_PADDING - LABEL_OFFSET,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Overlay {
    /// Present only on frames where a hand was detected and classified.
    pub hand: Option<HandOverlay>,
    pub last_command: String,
    pub door: DoorState,
}

impl Overlay {
    pub fn compose(hand: Option<HandOverlay>, snapshot: PerceptionSnapshot) -> Self {
        Self {
            hand,
            last_command: snapshot.last_utterance,
            door: snapshot.door,
        }
    }

    pub fn command_line(&self) -> String {
        format!("Last Command: {}", self.last_command)
    }

    pub fn door_line(&self) -> String {
        format!("Door State: {}", self.door)
    }
}
