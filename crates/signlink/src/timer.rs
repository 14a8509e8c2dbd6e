//! Latency and throughput measurement.

use std::{
    fmt, mem,
    sync::Mutex,
    time::{Duration, Instant},
};

const EMA_ALPHA: f32 = 0.3;

/// A timer that can measure and average the time an operation takes.
///
/// Timings are smoothed with an exponential moving average. The average is reset when the timer
/// is displayed using `{}` ([`std::fmt::Display`]).
pub struct Timer {
    name: &'static str,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    /// The current average time in seconds.
    avg: Option<f32>,
    /// The number of time measurements that contributed to the current `avg`.
    count: usize,
}

impl Timer {
    /// Creates a new timer.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: Mutex::new(State::default()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Invokes a closure, measuring and recording the time it takes.
    pub fn time<T>(&self, timee: impl FnOnce() -> T) -> T {
        let _guard = self.start();
        timee()
    }

    /// Starts timing an operation using a drop guard.
    ///
    /// When the returned [`TimerGuard`] is dropped, the time between the call to `start` and the
    /// drop is measured and recorded.
    pub fn start(&self) -> TimerGuard<'_> {
        TimerGuard {
            start: Instant::now(),
            timer: self,
        }
    }

    /// Returns the number of measurements recorded since the last reset.
    pub fn count(&self) -> usize {
        self.lock().count
    }

    fn record(&self, duration: Duration) {
        let secs = duration.as_secs_f32();
        let mut state = self.lock();
        state.avg = Some(match state.avg {
            Some(avg) => avg + EMA_ALPHA * (secs - avg),
            None => secs,
        });
        state.count += 1;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // A panic while holding the lock cannot leave `State` inconsistent.
        self.state.lock().unwrap_or_else(|poison| poison.into_inner())
    }
}

/// Displays the average recorded time and resets it.
impl fmt::Display for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let State { avg, count } = mem::take(&mut *self.lock());
        let avg_ms = avg.unwrap_or(0.0) * 1000.0;

        write!(f, "{}: {count}x{avg_ms:.01}ms", self.name)
    }
}

/// Cloning a timer resets its collected timings.
impl Clone for Timer {
    fn clone(&self) -> Self {
        Self::new(self.name)
    }
}

/// Guard returned by [`Timer::start`]. Stops timing the operation when dropped.
pub struct TimerGuard<'a> {
    start: Instant,
    timer: &'a Timer,
}

impl Drop for TimerGuard<'_> {
    fn drop(&mut self) {
        self.timer.record(self.start.elapsed());
    }
}

/// Logs processed frames per second, along with the number of delivered keypoint vectors.
pub struct FrameCounter {
    name: String,
    frames: u32,
    delivered: u32,
    start: Instant,
}

impl FrameCounter {
    pub fn new<N: Into<String>>(name: N) -> Self {
        Self {
            name: name.into(),
            frames: 0,
            delivered: 0,
            start: Instant::now(),
        }
    }

    /// Counts one processed frame and logs statistics if one second has passed.
    ///
    /// `delivered` indicates whether the frame produced a keypoint vector for the subscriber.
    /// `timers` are appended to the log line (which also resets them).
    pub fn tick<'a>(&mut self, delivered: bool, timers: impl IntoIterator<Item = &'a Timer>) {
        self.frames += 1;
        self.delivered += u32::from(delivered);
        if self.start.elapsed() > Duration::from_secs(1) {
            let timers = timers
                .into_iter()
                .map(|t| t.to_string())
                .collect::<Vec<_>>();
            if timers.is_empty() {
                log::debug!(
                    "{}: {} FPS, {} delivered",
                    self.name,
                    self.frames,
                    self.delivered
                );
            } else {
                log::debug!(
                    "{}: {} FPS, {} delivered ({})",
                    self.name,
                    self.frames,
                    self.delivered,
                    timers.join(", ")
                );
            }

            self.frames = 0;
            self.delivered = 0;
            self.start = Instant::now();
        }
    }
}
