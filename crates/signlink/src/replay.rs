//! Replays recorded hand detections as a camera.
//!
//! A recording is a JSON lines file with one frame per line. Each frame is a JSON array of hands,
//! and each hand is an array of landmark objects:
//!
//! ```text
//! []
//! [[{"x": 0.51, "y": 0.62, "z": 0.0}, {"x": 0.49, "y": 0.58, "z": -0.01}, ...]]
//! ```
//!
//! [`ReplayCamera`] streams the frames and [`RecordedDetector`] turns them into
//! [`DetectionResult`]s, which allows running a [`HandSession`][crate::session::HandSession]
//! without a webcam or a vision model.

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use anyhow::Context;

use crate::{
    config::{CaptureOptions, DetectorOptions},
    hand::DetectionResult,
    landmark::Landmark,
    session::{Camera, HandDetector, VideoStream},
};

/// One recorded frame: the landmarks of each hand, as reported by the detector.
pub type RawFrame = Vec<Vec<Landmark>>;

enum Source {
    File(PathBuf),
    Memory(Vec<RawFrame>),
}

/// A [`Camera`] that plays back recorded frames.
pub struct ReplayCamera {
    source: Source,
}

impl ReplayCamera {
    /// Creates a camera replaying the JSON lines recording at `path`.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Self {
        Self {
            source: Source::File(path.as_ref().to_path_buf()),
        }
    }

    /// Creates a camera replaying `frames`.
    pub fn from_frames(frames: Vec<RawFrame>) -> Self {
        Self {
            source: Source::Memory(frames),
        }
    }
}

impl Camera for ReplayCamera {
    type Stream = ReplayStream;

    fn is_available(&self) -> bool {
        match &self.source {
            Source::File(path) => path.is_file(),
            Source::Memory(_) => true,
        }
    }

    fn open(&mut self, _options: &CaptureOptions) -> anyhow::Result<ReplayStream> {
        let frames: Box<dyn Iterator<Item = anyhow::Result<RawFrame>> + Send> = match &self.source
        {
            Source::File(path) => {
                let file = File::open(path)
                    .with_context(|| format!("failed to open recording {}", path.display()))?;
                log::debug!("replaying {}", path.display());
                Box::new(parse_lines(BufReader::new(file)))
            }
            Source::Memory(frames) => Box::new(frames.clone().into_iter().map(anyhow::Ok)),
        };

        Ok(ReplayStream {
            frames: Some(frames),
        })
    }
}

fn parse_lines<R: BufRead>(reader: R) -> impl Iterator<Item = anyhow::Result<RawFrame>> {
    reader
        .lines()
        .enumerate()
        .filter(|(_, line)| !matches!(line, Ok(l) if l.trim().is_empty()))
        .map(|(index, line)| {
            let line = line?;
            serde_json::from_str(&line)
                .with_context(|| format!("malformed frame on line {}", index + 1))
        })
}

/// Frame stream returned by [`ReplayCamera::open`].
pub struct ReplayStream {
    frames: Option<Box<dyn Iterator<Item = anyhow::Result<RawFrame>> + Send>>,
}

impl VideoStream for ReplayStream {
    type Frame = RawFrame;

    fn next_frame(&mut self) -> anyhow::Result<Option<RawFrame>> {
        match &mut self.frames {
            Some(frames) => frames.next().transpose(),
            None => Ok(None),
        }
    }

    fn stop(&mut self) {
        self.frames = None;
    }
}

/// A [`HandDetector`] for recorded frames.
///
/// Validates each hand's landmark count and keeps at most `max_num_hands` hands, like a live
/// detector configured with the same options would.
#[derive(Debug)]
pub struct RecordedDetector {
    max_num_hands: usize,
}

/// Keeps as many hands as [`DetectorOptions::default`] allows.
impl Default for RecordedDetector {
    fn default() -> Self {
        Self {
            max_num_hands: DetectorOptions::default().get_max_num_hands(),
        }
    }
}

impl HandDetector for RecordedDetector {
    type Frame = RawFrame;

    fn set_options(&mut self, options: &DetectorOptions) -> anyhow::Result<()> {
        self.max_num_hands = options.get_max_num_hands();
        Ok(())
    }

    fn detect(&mut self, frame: &RawFrame) -> anyhow::Result<DetectionResult> {
        let hands = frame.iter().take(self.max_num_hands).cloned().collect();
        Ok(DetectionResult::from_raw(hands)?)
    }
}
