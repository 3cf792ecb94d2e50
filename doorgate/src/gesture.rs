/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Hand landmarks and the open-hand / closed-fist classification policy.
//!
//! The landmark model is an external collaborator; this module only sees its
//! output: pixel-space keypoints for at most one hand, indexed the way the
//! 21-point hand model numbers them (0 = wrist, 4/8/12/16/20 = finger tips).
//!
//! The rule is a heuristic for an upright hand in a non-rotated camera view:
//! a finger is *extended* when its tip lies above its proximal (PIP) joint in
//! image space, i.e. `tip.y < pip.y`.  With enough extended fingers the hand is
//! open, otherwise it is a fist.

use serde::{Deserialize, Serialize};

// ── Constants ─────────────────────────────────────────────────────────────────

/// Default finger-tip landmark indices (index, middle, ring, pinky).
pub const DEFAULT_FINGER_TIPS: [usize; 4] = [8, 12, 16, 20];

/// Default PIP-joint landmark indices, paired positionally with
/// [`DEFAULT_FINGER_TIPS`].
pub const DEFAULT_FINGER_PIPS: [usize; 4] = [6, 10, 14, 18];

/// Default number of extended fingers required for [`HandPose::OpenHand`].
pub const DEFAULT_MIN_EXTENDED: usize = 4;

// ── HandPose ──────────────────────────────────────────────────────────────────

/// Last classified hand pose.
///
/// `Unknown` only exists before the first hand is seen; frames without a hand
/// never reset the pose back to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HandPose {
    #[default]
    Unknown,
    OpenHand,
    ClosedFist,
}

impl HandPose {
    /// Compact encoding used by the lock-free slot in
    /// [`SharedPerceptionState`](crate::state::SharedPerceptionState).
    pub fn to_u8(self) -> u8 {
        match self {
            HandPose::Unknown => 0,
            HandPose::OpenHand => 1,
            HandPose::ClosedFist => 2,
        }
    }

    /// Inverse of [`to_u8`](Self::to_u8).  Unrecognised values decode to
    /// `Unknown`.
    pub fn from_u8(v: u8) -> Self {
        match v {
            1 => HandPose::OpenHand,
            2 => HandPose::ClosedFist,
            _ => HandPose::Unknown,
        }
    }

    /// Label drawn next to the hand on the display.
    pub fn label(self) -> &'static str {
        match self {
            HandPose::Unknown => "UNKNOWN",
            HandPose::OpenHand => "OPEN HAND",
            HandPose::ClosedFist => "CLOSED FIST",
        }
    }
}

impl std::fmt::Display for HandPose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ── Landmark ──────────────────────────────────────────────────────────────────

/// A single hand keypoint in image pixel coordinates (origin top-left, `y`
/// grows downwards).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: i32,
    pub y: i32,
}

impl Landmark {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

// ── Error type ────────────────────────────────────────────────────────────────

/// Errors raised while building a [`GesturePolicy`] or classifying a hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GestureError {
    /// The policy was given no (tip, pip) pairs.
    NoFingerPairs,

    /// Tip and PIP index lists have different lengths.
    PairLengthMismatch { tips: usize, pips: usize },

    /// `min_extended` is zero or larger than the number of fingers checked.
    MinExtendedOutOfRange { min_extended: usize, fingers: usize },

    /// The landmark list is too short for an index the policy reads.
    MissingLandmark { index: usize, len: usize },
}

impl std::fmt::Display for GestureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GestureError::NoFingerPairs => write!(f, "no finger (tip, pip) pairs configured"),
            GestureError::PairLengthMismatch { tips, pips } => write!(
                f,
                "{tips} finger tip indices but {pips} pip indices; lists must pair up"
            ),
            GestureError::MinExtendedOutOfRange {
                min_extended,
                fingers,
            } => write!(
                f,
                "min_extended = {min_extended} must be between 1 and {fingers}"
            ),
            GestureError::MissingLandmark { index, len } => {
                write!(f, "landmark {index} requested but hand has only {len} points")
            }
        }
    }
}

impl std::error::Error for GestureError {}

// ── GesturePolicy ─────────────────────────────────────────────────────────────

/// One finger checked by the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FingerPair {
    pub tip: usize,
    pub pip: usize,
}

/// Tip-above-joint classifier.
///
/// Construction validates the thresholds; [`classify`](Self::classify) is a
/// pure function of its input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GesturePolicy {
    fingers: Vec<FingerPair>,
    min_extended: usize,
}

impl GesturePolicy {
    /// Build a policy from positional tip / pip index lists.
    ///
    /// # Errors
    /// * [`GestureError::PairLengthMismatch`] – `tips.len() != pips.len()`.
    /// * [`GestureError::NoFingerPairs`] – both lists are empty.
    /// * [`GestureError::MinExtendedOutOfRange`] – `min_extended` is `0` or
    ///   exceeds the number of fingers.
    pub fn new(tips: &[usize], pips: &[usize], min_extended: usize) -> Result<Self, GestureError> {
        if tips.len() != pips.len() {
            return Err(GestureError::PairLengthMismatch {
                tips: tips.len(),
                pips: pips.len(),
            });
        }
        if tips.is_empty() {
            return Err(GestureError::NoFingerPairs);
        }
        if min_extended == 0 || min_extended > tips.len() {
            return Err(GestureError::MinExtendedOutOfRange {
                min_extended,
                fingers: tips.len(),
            });
        }

        let fingers = tips
            .iter()
            .zip(pips)
            .map(|(&tip, &pip)| FingerPair { tip, pip })
            .collect();

        Ok(Self {
            fingers,
            min_extended,
        })
    }

    pub fn fingers(&self) -> &[FingerPair] {
        &self.fingers
    }

    pub fn min_extended(&self) -> usize {
        self.min_extended
    }

    /// Number of checked fingers whose tip is above its PIP joint.
    pub fn extended_count(&self, landmarks: &[Landmark]) -> Result<usize, GestureError> {
        let point = |index: usize| {
            landmarks.get(index).ok_or(GestureError::MissingLandmark {
                index,
                len: landmarks.len(),
            })
        };

        let mut extended = 0;
        for finger in &self.fingers {
            if point(finger.tip)?.y < point(finger.pip)?.y {
                extended += 1;
            }
        }
        Ok(extended)
    }

    /// Classify one detected hand.
    ///
    /// Never returns [`HandPose::Unknown`]: "no hand" is the caller's concern
    /// and leaves the shared pose untouched.
    pub fn classify(&self, landmarks: &[Landmark]) -> Result<HandPose, GestureError> {
        let extended = self.extended_count(landmarks)?;
        Ok(if extended >= self.min_extended {
            HandPose::OpenHand
        } else {
            HandPose::ClosedFist
        })
    }
}

impl Default for GesturePolicy {
    fn default() -> Self {
        Self {
            fingers: DEFAULT_FINGER_TIPS
                .iter()
                .zip(DEFAULT_FINGER_PIPS.iter())
                .map(|(&tip, &pip)| FingerPair { tip, pip })
                .collect(),
            min_extended: DEFAULT_MIN_EXTENDED,
        }
    }
}

// ── Synthetic hands ───────────────────────────────────────────────────────────

/// Number of keypoints produced by the 21-point hand model.
pub const HAND_LANDMARK_COUNT: usize = 21;

/// Synthetic upright hand, all four fingers extended.
///
/// Used by the scripted landmark source and by tests.
pub fn open_hand_landmarks() -> Vec<Landmark> {
    synthetic_hand(|joint| 300 - joint * 35)
}

/// Synthetic upright hand with every finger curled: tips sit below their PIP
/// joints.
pub fn closed_fist_landmarks() -> Vec<Landmark> {
    synthetic_hand(|joint| match joint {
        0 => 300, // MCP
        1 => 270, // PIP
        2 => 290, // DIP
        _ => 310, // tip
    })
}

/// Lay out wrist + 5 fingers × 4 joints.  `joint_y` maps joint number
/// (0 = MCP … 3 = tip) to a y coordinate.
fn synthetic_hand(joint_y: impl Fn(i32) -> i32) -> Vec<Landmark> {
    let mut points = Vec::with_capacity(HAND_LANDMARK_COUNT);
    points.push(Landmark::new(320, 400)); // wrist
    for finger in 0..5 {
        let x = 250 + finger * 35;
        for joint in 0..4 {
            points.push(Landmark::new(x, joint_y(joint)));
        }
    }
    points
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn with_extended(n: usize) -> Vec<Landmark> {
        // Start from a fist and lift the first `n` checked fingers.
        let mut lm = closed_fist_landmarks();
        for (&tip, &pip) in DEFAULT_FINGER_TIPS.iter().zip(&DEFAULT_FINGER_PIPS).take(n) {
            lm[tip].y = lm[pip].y - 10;
        }
        lm
    }

    // ── HandPose ──────────────────────────────────────────────────────────────

    #[test]
    fn hand_pose_u8_encoding_round_trips() {
        for pose in [HandPose::Unknown, HandPose::OpenHand, HandPose::ClosedFist] {
            assert_eq!(HandPose::from_u8(pose.to_u8()), pose);
        }
        assert_eq!(HandPose::from_u8(200), HandPose::Unknown);
    }

    #[test]
    fn default_pose_is_unknown() {
        assert_eq!(HandPose::default(), HandPose::Unknown);
    }

    // ── Classification ────────────────────────────────────────────────────────

    #[test]
    fn all_tips_above_pips_is_open_hand() {
        let policy = GesturePolicy::default();
        assert_eq!(policy.extended_count(&open_hand_landmarks()), Ok(4));
        assert_eq!(policy.classify(&open_hand_landmarks()), Ok(HandPose::OpenHand));
    }

    #[test]
    fn no_tips_above_pips_is_closed_fist() {
        let policy = GesturePolicy::default();
        assert_eq!(policy.extended_count(&closed_fist_landmarks()), Ok(0));
        assert_eq!(
            policy.classify(&closed_fist_landmarks()),
            Ok(HandPose::ClosedFist)
        );
    }

    #[test]
    fn three_of_four_extended_is_still_a_fist_by_default() {
        let policy = GesturePolicy::default();
        assert_eq!(policy.classify(&with_extended(3)), Ok(HandPose::ClosedFist));
    }

    #[test]
    fn lower_threshold_changes_the_verdict() {
        let policy =
            GesturePolicy::new(&DEFAULT_FINGER_TIPS, &DEFAULT_FINGER_PIPS, 3).unwrap();
        assert_eq!(policy.classify(&with_extended(3)), Ok(HandPose::OpenHand));
        assert_eq!(policy.classify(&with_extended(2)), Ok(HandPose::ClosedFist));
    }

    #[test]
    fn tip_level_with_pip_is_not_extended() {
        let policy = GesturePolicy::default();
        let mut lm = open_hand_landmarks();
        lm[8].y = lm[6].y; // strict comparison
        assert_eq!(policy.extended_count(&lm), Ok(3));
    }

    #[test]
    fn short_landmark_list_is_an_error() {
        let policy = GesturePolicy::default();
        let lm = &open_hand_landmarks()[..10];
        assert_eq!(
            policy.classify(lm),
            Err(GestureError::MissingLandmark { index: 12, len: 10 })
        );
    }

    // ── Construction ──────────────────────────────────────────────────────────

    #[test]
    fn mismatched_lists_are_rejected() {
        assert_eq!(
            GesturePolicy::new(&[8, 12], &[6], 1),
            Err(GestureError::PairLengthMismatch { tips: 2, pips: 1 })
        );
    }

    #[test]
    fn empty_lists_are_rejected() {
        assert_eq!(
            GesturePolicy::new(&[], &[], 1),
            Err(GestureError::NoFingerPairs)
        );
    }

    #[test]
    fn min_extended_must_be_in_range() {
        assert!(matches!(
            GesturePolicy::new(&[8], &[6], 0),
            Err(GestureError::MinExtendedOutOfRange { .. })
        ));
        assert!(matches!(
            GesturePolicy::new(&[8], &[6], 2),
            Err(GestureError::MinExtendedOutOfRange { .. })
        ));
    }

    #[test]
    fn default_policy_matches_explicit_construction() {
        let explicit = GesturePolicy::new(
            &DEFAULT_FINGER_TIPS,
            &DEFAULT_FINGER_PIPS,
            DEFAULT_MIN_EXTENDED,
        )
        .unwrap();
        assert_eq!(explicit, GesturePolicy::default());
    }

    // ── Properties ────────────────────────────────────────────────────────────

    proptest! {
        #[test]
        fn classify_is_deterministic(
            ys in proptest::collection::vec(0i32..480, HAND_LANDMARK_COUNT)
        ) {
            let lm: Vec<Landmark> = ys.iter().enumerate()
                .map(|(i, &y)| Landmark::new(i as i32 * 10, y))
                .collect();
            let policy = GesturePolicy::default();
            let first = policy.classify(&lm).unwrap();
            prop_assert_eq!(policy.classify(&lm).unwrap(), first);
            prop_assert_ne!(first, HandPose::Unknown);
        }

        #[test]
        fn verdict_follows_extended_count(
            ys in proptest::collection::vec(0i32..480, HAND_LANDMARK_COUNT)
        ) {
            let lm: Vec<Landmark> = ys.iter().map(|&y| Landmark::new(0, y)).collect();
            let policy = GesturePolicy::default();
            let n = policy.extended_count(&lm).unwrap();
            let expected = if n >= 4 { HandPose::OpenHand } else { HandPose::ClosedFist };
            prop_assert_eq!(policy.classify(&lm).unwrap(), expected);
        }
    }
}
