//! HTTP client for the remote sign classifier.
//!
//! The service exposes two endpoints:
//!
//! * `GET /health` reports whether the model is loaded.
//! * `POST /predict` takes `{"keypoints": [...]}` with the 126 values of a [`KeypointVector`] and
//!   returns the predicted label, its confidence, and the class index.
//!
//! Requests are not retried. Every failure is logged and returned to the caller, who decides
//! whether to report it or to move on to the next frame.
//!
//! [`PredictionWorker`] moves requests off the frame processing thread.

use std::io;

use pawawwewism::Worker;
use reqwest::{
    blocking::{Client, Response},
    header::{self, HeaderMap, HeaderValue},
    StatusCode,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

use crate::{config::ClientConfig, keypoints::KeypointVector, timer::Timer};

/// Classification returned by `POST /predict`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Human-readable label of the predicted sign, or `"Unknown"` if the class has no label.
    #[serde(rename = "prediction")]
    pub label: String,
    pub confidence: f32,
    pub class_index: u32,
}

/// Status returned by `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    #[serde(default)]
    pub message: String,
}

impl Health {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// Errors returned by [`PredictionClient`] requests.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The request could not be sent or no response was received.
    #[error("request to {url} failed")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// The service responded with a non-2xx status.
    #[error("{url} responded with {status}: {message}")]
    Status {
        url: String,
        status: StatusCode,
        message: String,
    },
    /// The response body did not have the expected shape.
    #[error("malformed response from {url}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl RequestError {
    /// Returns the HTTP status code, if the service responded with an error status.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Serialize)]
struct PredictRequest<'a> {
    keypoints: &'a KeypointVector,
}

/// Error body sent by the service alongside non-2xx statuses.
#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

/// Blocking client for the prediction service.
pub struct PredictionClient {
    client: Client,
    config: ClientConfig,
    t_request: Timer,
}

impl PredictionClient {
    /// Creates a client sending JSON requests to the service configured in `config`.
    pub fn new(config: &ClientConfig) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.get_timeout())
            .build()?;
        log::debug!("prediction service at {}", config.get_base_url());

        Ok(Self {
            client,
            config: config.clone(),
            t_request: Timer::new("request"),
        })
    }

    /// Creates a client configured from the environment (see [`ClientConfig::from_env`]).
    pub fn from_env() -> anyhow::Result<Self> {
        Self::new(&ClientConfig::from_env()?)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns profiling timers for requests made by this client.
    pub fn timers(&self) -> impl Iterator<Item = &Timer> + '_ {
        [&self.t_request].into_iter()
    }

    /// Checks whether the service is up and has its model loaded.
    ///
    /// A service without a loaded model answers with an error status, which is returned as
    /// [`RequestError::Status`].
    pub fn health_check(&self) -> Result<Health, RequestError> {
        let url = self.config.endpoint("/health");
        let result = self
            .t_request
            .time(|| self.client.get(&url).send())
            .map_err(|source| RequestError::Transport {
                url: url.clone(),
                source,
            })
            .and_then(|resp| decode(&url, resp));
        if let Err(e) = &result {
            log::error!("health check failed: {e}");
        }
        result
    }

    /// Sends `keypoints` to the classifier and returns its prediction.
    pub fn predict(&self, keypoints: &KeypointVector) -> Result<Prediction, RequestError> {
        let url = self.config.endpoint("/predict");
        let result = self
            .t_request
            .time(|| {
                self.client
                    .post(&url)
                    .json(&PredictRequest { keypoints })
                    .send()
            })
            .map_err(|source| RequestError::Transport {
                url: url.clone(),
                source,
            })
            .and_then(|resp| decode::<Prediction>(&url, resp));
        match &result {
            Ok(prediction) => log::trace!(
                "prediction: {} (class {}, confidence {:.3})",
                prediction.label,
                prediction.class_index,
                prediction.confidence,
            ),
            Err(e) => log::error!("prediction request failed: {e}"),
        }
        result
    }
}

fn decode<T: DeserializeOwned>(url: &str, resp: Response) -> Result<T, RequestError> {
    let status = resp.status();
    if !status.is_success() {
        let text = resp.text().unwrap_or_default();
        let message = match serde_json::from_str::<ErrorBody>(&text) {
            Ok(ErrorBody {
                error: Some(msg), ..
            })
            | Ok(ErrorBody {
                message: Some(msg),
                ..
            }) => msg,
            _ => text,
        };
        return Err(RequestError::Status {
            url: url.to_string(),
            status,
            message,
        });
    }

    resp.json().map_err(|source| RequestError::Decode {
        url: url.to_string(),
        source,
    })
}

/// Number of keypoint vectors that can wait for a [`PredictionWorker`] before
/// [`PredictionWorker::send`] blocks.
pub const QUEUE_CAPACITY: usize = 8;

/// Runs [`PredictionClient::predict`] on a background thread.
///
/// Up to [`QUEUE_CAPACITY`] vectors are queued while a request is in flight, so the sender only
/// waits on the network once the queue is full. Dropping the worker processes the queued vectors
/// and then joins the thread.
pub struct PredictionWorker {
    worker: Worker<KeypointVector>,
}

impl PredictionWorker {
    /// Spawns the worker thread. `on_result` is invoked on that thread with the outcome of every
    /// request, in the order the vectors were sent.
    pub fn spawn<F>(client: PredictionClient, mut on_result: F) -> io::Result<Self>
    where
        F: FnMut(Result<Prediction, RequestError>) + Send + 'static,
    {
        let mut requests = 0u64;
        let mut failures = 0u64;

        let worker = Worker::builder()
            .name("predictor")
            .capacity(QUEUE_CAPACITY)
            .spawn(move |keypoints: KeypointVector| {
                requests += 1;
                let result = client.predict(&keypoints);
                failures += u64::from(result.is_err());
                on_result(result);

                if requests % 100 == 0 {
                    let timers = client
                        .timers()
                        .map(|t| t.to_string())
                        .collect::<Vec<_>>()
                        .join(", ");
                    log::debug!("{requests} requests, {failures} failed ({timers})");
                }
            })?;

        Ok(Self { worker })
    }

    /// Queues `keypoints` for classification.
    pub fn send(&mut self, keypoints: KeypointVector) {
        self.worker.send(keypoints);
    }
}
