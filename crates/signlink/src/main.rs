//! Replays a recording of hand detections and classifies every frame with the prediction service.
//!
//! Usage: `signlink <recording.jsonl>`
//!
//! The service location is taken from `SIGNLINK_API_BASE_URL` (see the library docs).

use std::env;

use anyhow::bail;
use signlink::{
    predict::{PredictionClient, PredictionWorker},
    replay::{RecordedDetector, ReplayCamera},
    session::{HandSession, SessionOptions},
};

#[signlink::main]
fn main() -> anyhow::Result<()> {
    let Some(path) = env::args().nth(1) else {
        bail!("usage: signlink <recording.jsonl>");
    };

    let client = PredictionClient::from_env()?;
    match client.health_check() {
        Ok(health) if health.is_ok() => log::info!("prediction service: {}", health.message),
        Ok(health) => log::warn!("prediction service reports '{}'", health.status),
        // Already logged by the client. Requests may still succeed once the service is up.
        Err(_) => {}
    }

    let mut frame = 0u64;
    let mut predictor = PredictionWorker::spawn(client, move |result| {
        frame += 1;
        // Failures are logged by the client.
        if let Ok(prediction) = result {
            log::info!(
                "#{frame}: {} ({:.1}%)",
                prediction.label,
                prediction.confidence * 100.0
            );
        }
    })?;

    let mut session = HandSession::new(
        ReplayCamera::from_file(&path),
        RecordedDetector::default(),
        SessionOptions::default(),
    )?;
    if !session.is_camera_available() {
        bail!("recording '{path}' not found");
    }
    session.start()?;
    session.subscribe(move |keypoints| predictor.send(keypoints.clone()));
    session.run()?;

    // Dropping the subscriber shuts down the worker after it has processed queued requests.
    session.stop();
    Ok(())
}
