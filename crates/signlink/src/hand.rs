//! Hand landmark sets and per-frame detection results.
//!
//! The hand topology follows MediaPipe Hands: 21 landmarks per hand, at most 2 hands per frame.

pub mod detection;
pub mod landmark;

pub use detection::{DetectionResult, MalformedDetection, MAX_HANDS};
pub use landmark::{HandLandmarks, LandmarkIdx, WrongLandmarkCount, NUM_LANDMARKS};
