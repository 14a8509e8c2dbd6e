//! Hand landmark keypoint extraction for sign recognition.
//!
//! `signlink` sits between a camera, an external hand landmark detector, and a remote sign
//! classifier. Each video frame's detections are flattened into a fixed-size
//! [`KeypointVector`][keypoints::KeypointVector] by [`keypoints::normalize`], delivered to the
//! consumer subscribed to a [`HandSession`][session::HandSession], and can then be sent to the
//! prediction service with a [`PredictionClient`][predict::PredictionClient].
//!
//! # Coordinates
//!
//! Landmarks use the detector's normalized image coordinates: X points to the right and Y points
//! *down*, both in range 0.0 to 1.0 relative to the frame. Z is the depth relative to the wrist and
//! may have either sign.
//!
//! # Environment Variables
//!
//! * `SIGNLINK_API_BASE_URL`: Base URL of the prediction service. Defaults to
//!   `http://127.0.0.1:5000`.
//! * `SIGNLINK_API_TIMEOUT_MS`: Timeout for requests to the prediction service, in milliseconds.
//!   Defaults to 10 seconds.

use std::process;

use log::LevelFilter;

pub mod config;
pub mod hand;
pub mod iter;
pub mod keypoints;
pub mod landmark;
pub mod predict;
pub mod replay;
pub mod session;
pub mod timer;

pub use signlink_macros::main;

/// macro-use only, not part of public API.
#[doc(hidden)]
pub fn init_logger(calling_crate: &'static str) {
    let log_level = if cfg!(debug_assertions) {
        LevelFilter::Trace
    } else {
        LevelFilter::Debug
    };
    env_logger::Builder::new()
        .filter(Some(calling_crate), log_level)
        .filter(Some(env!("CARGO_CRATE_NAME")), log_level)
        .filter(Some("reqwest"), LevelFilter::Warn)
        .parse_default_env()
        .try_init()
        .ok();
}

/// Initializes logging to *stderr*.
///
/// If `cfg!(debug_assertions)` is enabled, the calling crate and signlink will log at *trace*
/// level. Otherwise, they will log at *debug* level.
///
/// `reqwest` will always log at *warn* level.
///
/// If a global logger is already registered, this macro will do nothing.
#[macro_export]
macro_rules! init_logger {
    () => {
        $crate::init_logger(env!("CARGO_CRATE_NAME"))
    };
}

/// macro-use only, not part of public API.
///
/// Runs the user's `main` function. If it fails, the error and its causes are logged and the
/// process exits with status 1.
#[doc(hidden)]
pub fn run(main: fn() -> anyhow::Result<()>) {
    if let Err(e) = main() {
        log::error!("{e:?}");
        process::exit(1);
    }
}
