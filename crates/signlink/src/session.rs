//! Camera sessions delivering keypoint vectors to a subscriber.
//!
//! A [`HandSession`] owns the camera stream and the hand detector for the duration of one video
//! session. Frames are pulled from the [`VideoStream`], passed through the [`HandDetector`], and
//! the resulting detections are flattened with [`normalize`] and handed to the subscribed
//! callback.
//!
//! The camera stream is released when [`HandSession::stop`] is called or when the session is
//! dropped, whichever happens first.

use thiserror::Error;

use crate::{
    config::{CaptureOptions, DetectorOptions},
    hand::{DetectionResult, MAX_HANDS},
    keypoints::{normalize, KeypointVector},
    timer::{FrameCounter, Timer},
};

/// A source of video streams.
pub trait Camera {
    type Stream: VideoStream;

    /// Returns whether a video input device is present.
    fn is_available(&self) -> bool;

    /// Acquires the camera and starts streaming frames.
    fn open(&mut self, options: &CaptureOptions) -> anyhow::Result<Self::Stream>;
}

/// An open camera stream.
pub trait VideoStream {
    type Frame;

    /// Returns the next frame, or [`None`] if the stream has ended.
    fn next_frame(&mut self) -> anyhow::Result<Option<Self::Frame>>;

    /// Stops all tracks of the stream and releases the device.
    ///
    /// Called exactly once by [`HandSession`].
    fn stop(&mut self);
}

/// An external hand landmark detector.
pub trait HandDetector {
    type Frame;

    /// Applies `options`. Called once, before any frame is processed.
    fn set_options(&mut self, options: &DetectorOptions) -> anyhow::Result<()>;

    /// Detects the hands in `frame`.
    ///
    /// Hands whose landmark count is not 21 must be rejected with an error (for example by
    /// building the result with [`DetectionResult::from_raw`]).
    fn detect(&mut self, frame: &Self::Frame) -> anyhow::Result<DetectionResult>;
}

/// Errors returned by [`HandSession`] operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no camera available")]
    CameraUnavailable,
    #[error("session is already running")]
    AlreadyRunning,
    #[error("session is not running")]
    NotRunning,
    #[error("invalid detector options")]
    Options(#[source] anyhow::Error),
    #[error("camera error")]
    Camera(#[source] anyhow::Error),
    #[error("detector error")]
    Detector(#[source] anyhow::Error),
}

/// Token identifying a callback registered with [`HandSession::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

type Callback = Box<dyn FnMut(&KeypointVector) + Send>;

/// What happened to a frame processed by [`HandSession::process_frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// A keypoint vector was delivered to the subscriber.
    Delivered,
    /// The frame was processed, but nothing was delivered (no subscriber, or no hands).
    Skipped,
    /// The camera stream has ended. No frame was processed.
    StreamEnded,
}

/// Options for [`HandSession::new`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionOptions {
    detector: DetectorOptions,
    capture: CaptureOptions,
    deliver_empty_frames: bool,
}

impl SessionOptions {
    pub fn detector(self, detector: DetectorOptions) -> Self {
        Self { detector, ..self }
    }

    pub fn capture(self, capture: CaptureOptions) -> Self {
        Self { capture, ..self }
    }

    /// Sets whether frames without any hands are delivered as all-zero vectors.
    ///
    /// By default, only frames with at least one detected hand reach the subscriber.
    pub fn deliver_empty_frames(self, deliver_empty_frames: bool) -> Self {
        Self {
            deliver_empty_frames,
            ..self
        }
    }
}

/// A video session turning camera frames into keypoint vectors.
pub struct HandSession<C: Camera, D: HandDetector> {
    camera: C,
    detector: D,
    options: SessionOptions,
    stream: Option<C::Stream>,
    subscriber: Option<(Subscription, Callback)>,
    next_subscription: u64,
    t_detect: Timer,
    frame_counter: FrameCounter,
}

impl<C, D> HandSession<C, D>
where
    C: Camera,
    D: HandDetector<Frame = <C::Stream as VideoStream>::Frame>,
{
    /// Creates a session and configures `detector` with the detector options in `options`.
    ///
    /// The camera is not acquired until [`HandSession::start`] is called.
    pub fn new(camera: C, mut detector: D, options: SessionOptions) -> Result<Self, SessionError> {
        options.detector.validate().map_err(SessionError::Options)?;
        detector
            .set_options(&options.detector)
            .map_err(SessionError::Detector)?;

        Ok(Self {
            camera,
            detector,
            options,
            stream: None,
            subscriber: None,
            next_subscription: 0,
            t_detect: Timer::new("detect"),
            frame_counter: FrameCounter::new("hand session"),
        })
    }

    /// Returns whether the camera reports a video input device.
    pub fn is_camera_available(&self) -> bool {
        self.camera.is_available()
    }

    pub fn is_running(&self) -> bool {
        self.stream.is_some()
    }

    /// Returns profiling timers for detection.
    pub fn timers(&self) -> impl Iterator<Item = &Timer> + '_ {
        [&self.t_detect].into_iter()
    }

    /// Acquires the camera stream.
    pub fn start(&mut self) -> Result<(), SessionError> {
        if self.stream.is_some() {
            return Err(SessionError::AlreadyRunning);
        }
        if !self.camera.is_available() {
            return Err(SessionError::CameraUnavailable);
        }

        let stream = self
            .camera
            .open(&self.options.capture)
            .map_err(SessionError::Camera)?;
        self.stream = Some(stream);
        log::debug!(
            "hand session started ({:?})",
            self.options.capture.get_resolution()
        );
        Ok(())
    }

    /// Stops the session: releases the camera stream and clears the subscriber.
    ///
    /// Does nothing if the session is not running. Also called when the session is dropped.
    pub fn stop(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
            log::debug!("hand session stopped");
        }
        self.subscriber = None;
    }

    /// Registers `callback` to receive the keypoint vector of every delivered frame.
    ///
    /// There is a single subscriber slot: registering a new callback replaces the previous one,
    /// whose [`Subscription`] becomes stale.
    pub fn subscribe<F>(&mut self, callback: F) -> Subscription
    where
        F: FnMut(&KeypointVector) + Send + 'static,
    {
        let sub = Subscription(self.next_subscription);
        self.next_subscription += 1;
        if let Some((old, _)) = self.subscriber.replace((sub, Box::new(callback))) {
            log::debug!("subscriber {old:?} replaced by {sub:?}");
        }
        sub
    }

    /// Removes the callback registered as `sub`.
    ///
    /// Returns `false` if `sub` is stale, in which case the current subscriber is left untouched.
    pub fn unsubscribe(&mut self, sub: Subscription) -> bool {
        match &self.subscriber {
            Some((current, _)) if *current == sub => {
                self.subscriber = None;
                true
            }
            _ => false,
        }
    }

    /// Returns the current subscription, if any.
    pub fn subscription(&self) -> Option<Subscription> {
        self.subscriber.as_ref().map(|(sub, _)| *sub)
    }

    /// Handles the detections of one frame.
    ///
    /// If the session is running and has a subscriber, the detections are normalized and delivered.
    /// Frames without hands are only delivered if enabled with
    /// [`SessionOptions::deliver_empty_frames`].
    pub fn on_results(&mut self, detection: &DetectionResult) -> FrameStatus {
        if self.stream.is_none() {
            log::trace!("discarding detections, session not running");
            return FrameStatus::Skipped;
        }
        let Some((_, callback)) = &mut self.subscriber else {
            return FrameStatus::Skipped;
        };
        if detection.is_empty() && !self.options.deliver_empty_frames {
            return FrameStatus::Skipped;
        }
        if detection.len() > MAX_HANDS {
            log::trace!(
                "ignoring {} hands beyond the first {MAX_HANDS}",
                detection.len() - MAX_HANDS
            );
        }

        let keypoints = normalize(detection);
        callback(&keypoints);
        FrameStatus::Delivered
    }

    /// Pulls one frame from the camera, runs the detector on it, and delivers the result.
    ///
    /// Errors are terminal for the current frame only; the next call continues with the next
    /// frame.
    pub fn process_frame(&mut self) -> Result<FrameStatus, SessionError> {
        let stream = self.stream.as_mut().ok_or(SessionError::NotRunning)?;
        let Some(frame) = stream.next_frame().map_err(SessionError::Camera)? else {
            log::debug!("camera stream ended");
            return Ok(FrameStatus::StreamEnded);
        };

        let detection = self
            .t_detect
            .time(|| self.detector.detect(&frame))
            .map_err(SessionError::Detector)?;
        log::trace!("detected {} hands", detection.len());

        Ok(self.on_results(&detection))
    }

    /// Processes frames until the camera stream ends.
    ///
    /// Frames the detector fails on are logged and skipped. Camera errors end the run.
    pub fn run(&mut self) -> Result<(), SessionError> {
        loop {
            let delivered = match self.process_frame() {
                Ok(FrameStatus::StreamEnded) => return Ok(()),
                Ok(status) => status == FrameStatus::Delivered,
                Err(SessionError::Detector(e)) => {
                    log::warn!("skipping frame: {e:#}");
                    false
                }
                Err(e) => return Err(e),
            };
            self.frame_counter.tick(delivered, [&self.t_detect]);
        }
    }
}

impl<C: Camera, D: HandDetector> Drop for HandSession<C, D> {
    fn drop(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
            log::debug!("hand session stopped on drop");
        }
    }
}
