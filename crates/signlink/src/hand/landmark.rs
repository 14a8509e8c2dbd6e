//! The 21-landmark hand skeleton.

use std::ops::Index;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::landmark::Landmark;

/// Number of landmarks making up one hand.
pub const NUM_LANDMARKS: usize = 21;

/// Names for the hand pose landmarks.
///
/// # Terminology
///
/// - **CMC**: [Carpometacarpal joint], the lowest joint of the thumb, located near the wrist.
/// - **MCP**: [Metacarpophalangeal joint], the lower joint forming the knuckles near the palm of
///   the hand.
/// - **PIP**: Proximal Interphalangeal joint, the joint between the MCP and DIP.
/// - **DIP**: Distal Interphalangeal joint, the highest joint of a finger.
/// - **Tip**: This landmark is just placed on the tip of the finger, above the DIP.
///
/// [Carpometacarpal joint]: https://en.wikipedia.org/wiki/Carpometacarpal_joint
/// [Metacarpophalangeal joint]: https://en.wikipedia.org/wiki/Metacarpophalangeal_joint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LandmarkIdx {
    Wrist,
    ThumbCmc,
    ThumbMcp,
    ThumbIp,
    ThumbTip,
    IndexFingerMcp,
    IndexFingerPip,
    IndexFingerDip,
    IndexFingerTip,
    MiddleFingerMcp,
    MiddleFingerPip,
    MiddleFingerDip,
    MiddleFingerTip,
    RingFingerMcp,
    RingFingerPip,
    RingFingerDip,
    RingFingerTip,
    PinkyMcp,
    PinkyPip,
    PinkyDip,
    PinkyTip,
}

/// Error returned when constructing [`HandLandmarks`] from the wrong number of landmarks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("hand landmark set has {found} landmarks, expected {NUM_LANDMARKS}")]
pub struct WrongLandmarkCount {
    pub found: usize,
}

/// The landmarks of a single detected hand, in [`LandmarkIdx`] order.
///
/// A [`HandLandmarks`] value always holds exactly [`NUM_LANDMARKS`] landmarks. Input with a
/// different count is rejected when converting from a [`Vec`] or deserializing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Landmark>", into = "Vec<Landmark>")]
pub struct HandLandmarks {
    landmarks: [Landmark; NUM_LANDMARKS],
}

impl HandLandmarks {
    pub fn new(landmarks: [Landmark; NUM_LANDMARKS]) -> Self {
        Self { landmarks }
    }

    pub fn landmarks(&self) -> &[Landmark; NUM_LANDMARKS] {
        &self.landmarks
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &Landmark> + '_ {
        self.landmarks.iter()
    }
}

impl Index<LandmarkIdx> for HandLandmarks {
    type Output = Landmark;

    #[inline]
    fn index(&self, index: LandmarkIdx) -> &Landmark {
        &self.landmarks[index as usize]
    }
}

impl TryFrom<Vec<Landmark>> for HandLandmarks {
    type Error = WrongLandmarkCount;

    fn try_from(landmarks: Vec<Landmark>) -> Result<Self, Self::Error> {
        let found = landmarks.len();
        let landmarks = landmarks
            .try_into()
            .map_err(|_| WrongLandmarkCount { found })?;
        Ok(Self { landmarks })
    }
}

impl From<HandLandmarks> for Vec<Landmark> {
    fn from(hand: HandLandmarks) -> Self {
        hand.landmarks.to_vec()
    }
}
