//! Configuration for the prediction client, the hand detector, and video capture.

use std::{env, time::Duration};

use anyhow::{bail, Context};

use crate::hand::MAX_HANDS;

/// Prediction service settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    base_url: String,
    timeout: Duration,
}

impl ClientConfig {
    pub const DEFAULT_BASE_URL: &'static str = "http://127.0.0.1:5000";

    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Reads the configuration from the `SIGNLINK_API_BASE_URL` and `SIGNLINK_API_TIMEOUT_MS`
    /// environment variables, falling back to the defaults for unset variables.
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::default();
        if let Ok(url) = env::var("SIGNLINK_API_BASE_URL") {
            config = config.base_url(url);
        }
        if let Ok(ms) = env::var("SIGNLINK_API_TIMEOUT_MS") {
            let ms = ms
                .trim()
                .parse::<u64>()
                .with_context(|| format!("invalid SIGNLINK_API_TIMEOUT_MS value '{ms}'"))?;
            config = config.timeout(Duration::from_millis(ms));
        }
        Ok(config)
    }

    /// Sets the base URL of the prediction service.
    ///
    /// Trailing slashes are removed, so that endpoint paths can be appended directly.
    pub fn base_url(self, url: impl Into<String>) -> Self {
        let mut base_url = url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url, ..self }
    }

    pub fn timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }

    pub fn get_timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the full URL of the endpoint at `path`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }
}

/// Options passed to the external hand landmark detector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorOptions {
    max_num_hands: usize,
    model_complexity: u8,
    min_detection_confidence: f32,
    min_tracking_confidence: f32,
}

impl Default for DetectorOptions {
    fn default() -> Self {
        Self {
            max_num_hands: MAX_HANDS,
            model_complexity: 1,
            min_detection_confidence: 0.5,
            min_tracking_confidence: 0.5,
        }
    }
}

impl DetectorOptions {
    /// Sets the maximum number of hands to detect.
    ///
    /// Clamped to `1..=2`, since the keypoint encoding has room for two hands.
    pub fn max_num_hands(self, max_num_hands: usize) -> Self {
        Self {
            max_num_hands: max_num_hands.clamp(1, MAX_HANDS),
            ..self
        }
    }

    /// Selects the landmark model variant. `0` is the lite model, `1` the full model.
    pub fn model_complexity(self, model_complexity: u8) -> Self {
        Self {
            model_complexity,
            ..self
        }
    }

    pub fn min_detection_confidence(self, confidence: f32) -> Self {
        Self {
            min_detection_confidence: confidence,
            ..self
        }
    }

    pub fn min_tracking_confidence(self, confidence: f32) -> Self {
        Self {
            min_tracking_confidence: confidence,
            ..self
        }
    }

    pub fn get_max_num_hands(&self) -> usize {
        self.max_num_hands
    }

    pub fn get_model_complexity(&self) -> u8 {
        self.model_complexity
    }

    pub fn get_min_detection_confidence(&self) -> f32 {
        self.min_detection_confidence
    }

    pub fn get_min_tracking_confidence(&self) -> f32 {
        self.min_tracking_confidence
    }

    /// Checks that the options are within the ranges accepted by the detector.
    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, value) in [
            ("min_detection_confidence", self.min_detection_confidence),
            ("min_tracking_confidence", self.min_tracking_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                bail!("{name} must be in range 0.0 to 1.0, got {value}");
            }
        }
        if self.model_complexity > 1 {
            bail!(
                "model_complexity must be 0 or 1, got {}",
                self.model_complexity
            );
        }
        Ok(())
    }
}

/// Which camera to request on devices with more than one.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum FacingMode {
    /// The camera facing the user (selfie camera).
    #[default]
    User,
    /// The camera facing away from the user.
    Environment,
}

/// Video capture preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureOptions {
    width: u32,
    height: u32,
    facing: FacingMode,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            facing: FacingMode::User,
        }
    }
}

impl CaptureOptions {
    /// Sets the desired frame size in pixels.
    ///
    /// The camera may deliver a different size if it does not support this one.
    pub fn resolution(self, width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..self
        }
    }

    pub fn facing(self, facing: FacingMode) -> Self {
        Self { facing, ..self }
    }

    pub fn get_resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn get_facing(&self) -> FacingMode {
        self.facing
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Serializes tests that modify the process environment.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn with_env<R>(url: Option<&str>, timeout_ms: Option<&str>, f: impl FnOnce() -> R) -> R {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        for (name, value) in [
            ("SIGNLINK_API_BASE_URL", url),
            ("SIGNLINK_API_TIMEOUT_MS", timeout_ms),
        ] {
            match value {
                Some(value) => env::set_var(name, value),
                None => env::remove_var(name),
            }
        }
        let result = f();
        env::remove_var("SIGNLINK_API_BASE_URL");
        env::remove_var("SIGNLINK_API_TIMEOUT_MS");
        result
    }

    #[test]
    fn from_env_defaults() {
        let config = with_env(None, None, ClientConfig::from_env).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.get_base_url(), "http://127.0.0.1:5000");
        assert_eq!(config.get_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn from_env_overrides() {
        let config = with_env(
            Some("https://signs.example.com/api/"),
            Some(" 250 "),
            ClientConfig::from_env,
        )
        .unwrap();
        assert_eq!(config.get_base_url(), "https://signs.example.com/api");
        assert_eq!(config.get_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn from_env_rejects_bad_timeout() {
        let err = with_env(None, Some("soon"), ClientConfig::from_env).unwrap_err();
        assert!(err.to_string().contains("'soon'"), "{err}");

        let err = with_env(None, Some("-5"), ClientConfig::from_env).unwrap_err();
        assert!(err.to_string().contains("SIGNLINK_API_TIMEOUT_MS"), "{err}");
    }

    #[test]
    fn endpoint_joining() {
        let config = ClientConfig::default().base_url("http://example.com:8080//");
        assert_eq!(config.get_base_url(), "http://example.com:8080");
        assert_eq!(config.endpoint("/predict"), "http://example.com:8080/predict");
        assert_eq!(config.endpoint("health"), "http://example.com:8080/health");
    }

    #[test]
    fn detector_defaults() {
        let opts = DetectorOptions::default();
        assert_eq!(opts.get_max_num_hands(), 2);
        assert_eq!(opts.get_model_complexity(), 1);
        assert_eq!(opts.get_min_detection_confidence(), 0.5);
        assert_eq!(opts.get_min_tracking_confidence(), 0.5);
        opts.validate().unwrap();
    }

    #[test]
    fn detector_validation() {
        assert_eq!(DetectorOptions::default().max_num_hands(5).get_max_num_hands(), 2);
        assert_eq!(DetectorOptions::default().max_num_hands(0).get_max_num_hands(), 1);
        DetectorOptions::default()
            .min_detection_confidence(1.5)
            .validate()
            .unwrap_err();
        DetectorOptions::default()
            .min_tracking_confidence(f32::NAN)
            .validate()
            .unwrap_err();
        DetectorOptions::default()
            .model_complexity(2)
            .validate()
            .unwrap_err();
    }

    #[test]
    fn capture_defaults() {
        let opts = CaptureOptions::default();
        assert_eq!(opts.get_resolution(), (640, 480));
        assert_eq!(opts.get_facing(), FacingMode::User);
    }
}
