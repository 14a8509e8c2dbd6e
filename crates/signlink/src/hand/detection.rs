//! Per-frame detector output.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::landmark::Landmark;

use super::landmark::{HandLandmarks, WrongLandmarkCount};

/// Maximum number of hands encoded per frame.
pub const MAX_HANDS: usize = 2;

/// A frame was rejected because one of its hands did not have the expected number of landmarks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("malformed detection: hand #{hand}: {source}")]
pub struct MalformedDetection {
    /// Index of the offending hand, in detector order.
    pub hand: usize,
    pub source: WrongLandmarkCount,
}

/// The hands found by the detector in one video frame, in the order the detector reported them.
///
/// Detectors configured for at most [`MAX_HANDS`] hands never return more. Should one do so
/// anyway, the extra hands are kept here but ignored by [`normalize`][crate::keypoints::normalize].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DetectionResult {
    hands: Vec<HandLandmarks>,
}

impl DetectionResult {
    /// A frame in which no hands were detected.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(hands: Vec<HandLandmarks>) -> Self {
        Self { hands }
    }

    /// Validates raw per-hand landmark lists coming from a detector.
    ///
    /// Fails if any hand does not have exactly 21 landmarks. The whole frame is rejected in that
    /// case, since a partial hand would shift every following keypoint.
    pub fn from_raw(raw: Vec<Vec<Landmark>>) -> Result<Self, MalformedDetection> {
        let hands = raw
            .into_iter()
            .enumerate()
            .map(|(hand, landmarks)| {
                HandLandmarks::try_from(landmarks)
                    .map_err(|source| MalformedDetection { hand, source })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { hands })
    }

    pub fn hands(&self) -> &[HandLandmarks] {
        &self.hands
    }

    pub fn len(&self) -> usize {
        self.hands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hands.is_empty()
    }
}

impl FromIterator<HandLandmarks> for DetectionResult {
    fn from_iter<I: IntoIterator<Item = HandLandmarks>>(iter: I) -> Self {
        Self {
            hands: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::hand::NUM_LANDMARKS;

    use super::*;

    #[test]
    fn from_raw_reports_offending_hand() {
        let good = vec![Landmark::default(); NUM_LANDMARKS];
        let bad = vec![Landmark::default(); 17];
        let err = DetectionResult::from_raw(vec![good.clone(), bad]).unwrap_err();
        assert_eq!(
            err,
            MalformedDetection {
                hand: 1,
                source: WrongLandmarkCount { found: 17 },
            }
        );

        let ok = DetectionResult::from_raw(vec![good]).unwrap();
        assert_eq!(ok.len(), 1);
    }

    #[test]
    fn empty_frame() {
        let det: DetectionResult = serde_json::from_str("[]").unwrap();
        assert!(det.is_empty());
        assert_eq!(det, DetectionResult::empty());
    }
}
