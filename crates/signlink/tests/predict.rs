use std::{
    io::{prelude::*, BufReader},
    net::TcpListener,
    sync::mpsc,
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use reqwest::StatusCode;
use signlink::{
    config::ClientConfig,
    hand::{DetectionResult, HandLandmarks, NUM_LANDMARKS},
    keypoints::{normalize, KeypointVector},
    landmark::Landmark,
    predict::{PredictionClient, PredictionWorker, RequestError},
};

struct Request {
    request_line: String,
    body: String,
}

/// Serves `count` HTTP requests one after another, waiting `delay` before answering each with
/// `status` and the JSON `response`.
fn serve(
    count: usize,
    delay: Duration,
    status: &'static str,
    response: &'static str,
) -> (ClientConfig, JoinHandle<Vec<Request>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = thread::spawn(move || {
        (0..count)
            .map(|_| {
                let (stream, _) = listener.accept().unwrap();
                let mut reader = BufReader::new(stream);

                let mut request_line = String::new();
                reader.read_line(&mut request_line).unwrap();

                let mut content_length = 0;
                let mut line = String::new();
                loop {
                    line.clear();
                    reader.read_line(&mut line).unwrap();
                    if line == "\r\n" || line.is_empty() {
                        break;
                    }
                    if let Some((name, value)) = line.split_once(':') {
                        if name.eq_ignore_ascii_case("Content-Length") {
                            content_length = value.trim().parse().unwrap();
                        }
                    }
                }
                let mut body = vec![0; content_length];
                reader.read_exact(&mut body).unwrap();

                thread::sleep(delay);
                let mut stream = reader.into_inner();
                write!(
                    stream,
                    "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{response}",
                    response.len(),
                )
                .unwrap();
                stream.flush().unwrap();

                Request {
                    request_line: request_line.trim().to_string(),
                    body: String::from_utf8(body).unwrap(),
                }
            })
            .collect()
    });

    let config = ClientConfig::default()
        .base_url(format!("http://{addr}/"))
        .timeout(Duration::from_secs(5));
    (config, handle)
}

/// Serves a single HTTP request, answering with `status` and the JSON `response`.
fn serve_once(status: &'static str, response: &'static str) -> (ClientConfig, JoinHandle<Request>) {
    let (config, handle) = serve(1, Duration::ZERO, status, response);
    let handle = thread::spawn(move || handle.join().unwrap().remove(0));
    (config, handle)
}

fn one_hand() -> KeypointVector {
    let lms = (0..NUM_LANDMARKS)
        .map(|i| Landmark::new(0.5, i as f32 / 20.0, 0.0))
        .collect::<Vec<_>>();
    normalize(&DetectionResult::new(vec![
        HandLandmarks::try_from(lms).unwrap()
    ]))
}

#[test]
fn predict_posts_keypoints() {
    let (config, server) = serve_once(
        "200 OK",
        r#"{"prediction": "hello", "confidence": 0.93, "class_index": 4}"#,
    );
    let client = PredictionClient::new(&config).unwrap();

    let keypoints = one_hand();
    let prediction = client.predict(&keypoints).unwrap();
    assert_eq!(prediction.label, "hello");
    assert_eq!(prediction.class_index, 4);
    assert!((prediction.confidence - 0.93).abs() < 1e-6);

    let request = server.join().unwrap();
    assert_eq!(request.request_line, "POST /predict HTTP/1.1");
    let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
    let sent = body["keypoints"].as_array().unwrap();
    assert_eq!(sent.len(), 126);
    assert_eq!(sent[3].as_f64(), Some(0.5));
    assert_eq!(sent[63].as_f64(), Some(0.0));
    assert_eq!(
        serde_json::from_value::<KeypointVector>(body["keypoints"].clone()).unwrap(),
        keypoints
    );
    assert_eq!(client.timers().next().unwrap().count(), 1);
}

#[test]
fn predict_surfaces_error_status() {
    let (config, server) = serve_once(
        "400 BAD REQUEST",
        r#"{"error": "Invalid keypoints shape. Expected 126 values"}"#,
    );
    let client = PredictionClient::new(&config).unwrap();

    let err = client.predict(&KeypointVector::zeros()).unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
    match &err {
        RequestError::Status { message, .. } => {
            assert_eq!(message, "Invalid keypoints shape. Expected 126 values")
        }
        other => panic!("unexpected error: {other:?}"),
    }
    server.join().unwrap();
}

#[test]
fn predict_rejects_malformed_response() {
    let (config, server) = serve_once("200 OK", r#"{"label": "hello"}"#);
    let client = PredictionClient::new(&config).unwrap();

    let err = client.predict(&one_hand()).unwrap_err();
    assert!(matches!(err, RequestError::Decode { .. }), "{err:?}");
    server.join().unwrap();
}

#[test]
fn health_check() {
    let (config, server) = serve_once("200 OK", r#"{"status": "ok", "message": "Server is running"}"#);
    let client = PredictionClient::new(&config).unwrap();

    let health = client.health_check().unwrap();
    assert!(health.is_ok());
    assert_eq!(health.message, "Server is running");
    assert_eq!(server.join().unwrap().request_line, "GET /health HTTP/1.1");
}

#[test]
fn health_check_model_not_loaded() {
    let (config, server) = serve_once(
        "500 INTERNAL SERVER ERROR",
        r#"{"status": "error", "message": "Model not loaded"}"#,
    );
    let client = PredictionClient::new(&config).unwrap();

    let err = client.health_check().unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    assert!(err.to_string().ends_with("Model not loaded"), "{err}");
    server.join().unwrap();
}

#[test]
fn unreachable_service_is_transport_error() {
    // Bind and immediately drop a listener to get a port nothing listens on.
    let addr = TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();
    let config = ClientConfig::default().base_url(format!("http://{addr}"));
    let client = PredictionClient::new(&config).unwrap();

    let err = client.predict(&KeypointVector::zeros()).unwrap_err();
    assert!(matches!(err, RequestError::Transport { .. }), "{err:?}");
    assert_eq!(err.status(), None);
}

#[test]
fn worker_does_not_wait_for_slow_service() {
    let (config, server) = serve(
        2,
        Duration::from_millis(800),
        "200 OK",
        r#"{"prediction": "hello", "confidence": 0.5, "class_index": 1}"#,
    );
    let client = PredictionClient::new(&config).unwrap();
    let (results, recv) = mpsc::channel();
    let mut worker = PredictionWorker::spawn(client, move |result| {
        results.send(result.map(|p| p.label)).unwrap();
    })
    .unwrap();

    let start = Instant::now();
    worker.send(one_hand());
    worker.send(KeypointVector::zeros());
    let elapsed = start.elapsed();
    assert!(elapsed < Duration::from_millis(200), "send blocked for {elapsed:?}");

    // Dropping the worker finishes the queued requests first.
    drop(worker);
    let labels = recv
        .try_iter()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(labels, ["hello", "hello"]);
    let requests = server.join().unwrap();
    assert!(requests.iter().all(|r| r.request_line == "POST /predict HTTP/1.1"));
}
