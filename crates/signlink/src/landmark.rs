//! Landmark types shared by the detector boundary and the keypoint encoder.

use serde::{Deserialize, Serialize};

/// A landmark in 3D space.
///
/// X and Y are normalized to the frame dimensions, Z is the depth relative to the wrist. No range
/// checks are performed: detectors can place landmarks slightly outside the frame.
#[derive(Debug, Default, PartialEq, PartialOrd, Clone, Copy, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    #[inline]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub fn position(&self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

impl From<[f32; 3]> for Landmark {
    #[inline]
    fn from([x, y, z]: [f32; 3]) -> Self {
        Self { x, y, z }
    }
}

impl From<Landmark> for [f32; 3] {
    #[inline]
    fn from(lm: Landmark) -> Self {
        lm.position()
    }
}
