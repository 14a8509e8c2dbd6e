//! Fixed-size keypoint encoding of a frame's hand detections.

use std::ops::Deref;

use serde::{Deserialize, Serialize};

use crate::hand::{DetectionResult, MAX_HANDS, NUM_LANDMARKS};
use crate::iter::zip_exact;

/// Number of values contributed by one hand (21 landmarks × 3 coordinates).
pub const HAND_LEN: usize = NUM_LANDMARKS * 3;

/// Total length of a [`KeypointVector`].
pub const KEYPOINTS_LEN: usize = MAX_HANDS * HAND_LEN;

/// Flattened landmark coordinates of up to two hands.
///
/// Layout: `[hand A x0, y0, z0, x1, y1, z1, ..., hand B x0, y0, z0, ...]`. Slots of hands that were
/// not detected are zero. The length is always [`KEYPOINTS_LEN`].
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f32>", into = "Vec<f32>")]
pub struct KeypointVector(Box<[f32; KEYPOINTS_LEN]>);

impl KeypointVector {
    /// Returns an all-zero vector, the encoding of a frame without hands.
    pub fn zeros() -> Self {
        Self(Box::new([0.0; KEYPOINTS_LEN]))
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0[..]
    }

    /// Returns the 63 values belonging to hand `index` (0 or 1).
    ///
    /// # Panics
    ///
    /// Panics if `index` is not less than [`MAX_HANDS`].
    pub fn hand(&self, index: usize) -> &[f32] {
        &self.0[index * HAND_LEN..(index + 1) * HAND_LEN]
    }
}

impl Deref for KeypointVector {
    type Target = [f32];

    #[inline]
    fn deref(&self) -> &[f32] {
        self.as_slice()
    }
}

impl std::fmt::Debug for KeypointVector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeypointVector")
            .field("hand_a", &self.hand(0))
            .field("hand_b", &self.hand(1))
            .finish()
    }
}

impl TryFrom<Vec<f32>> for KeypointVector {
    type Error = String;

    fn try_from(values: Vec<f32>) -> Result<Self, Self::Error> {
        let len = values.len();
        let values: Box<[f32; KEYPOINTS_LEN]> = values
            .into_boxed_slice()
            .try_into()
            .map_err(|_| format!("expected {KEYPOINTS_LEN} keypoint values, got {len}"))?;
        Ok(Self(values))
    }
}

impl From<KeypointVector> for Vec<f32> {
    fn from(kp: KeypointVector) -> Self {
        kp.0.to_vec()
    }
}

/// Flattens the hands of `detection` into a [`KeypointVector`].
///
/// The first [`MAX_HANDS`] hands are encoded in detector order, each as the x, y and z coordinates
/// of its 21 landmarks. Missing hands are zero-filled. Coordinates are copied as-is.
///
/// This is a pure function and does not log, so it can be called from any thread. Callers that
/// want to report dropped hands do so themselves (see [`HandSession`]).
///
/// [`HandSession`]: crate::session::HandSession
pub fn normalize(detection: &DetectionResult) -> KeypointVector {
    let mut keypoints = KeypointVector::zeros();
    let slots = keypoints.0.chunks_exact_mut(HAND_LEN);
    for (hand, slot) in detection.hands().iter().zip(slots) {
        for (lm, out) in zip_exact(hand.iter(), slot.chunks_exact_mut(3)) {
            out.copy_from_slice(&lm.position());
        }
    }

    keypoints
}
