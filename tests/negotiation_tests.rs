// Integration tests for session negotiation against a local fake API
//
// An axum server stands in for the live endpoint so we can check the
// request we send and how each kind of response is surfaced.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use live_resume::audio::AudioFormat;
use live_resume::{
    stream_file, Config, InitiateRequest, NegotiationError, PipelineError, SessionNegotiator,
    StreamingConfig,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

#[derive(Clone)]
struct FakeApi {
    status: StatusCode,
    body: String,
    requests: Arc<Mutex<Vec<(HeaderMap, Value)>>>,
}

async fn live_handler(
    State(api): State<FakeApi>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    api.requests.lock().unwrap().push((headers, body));
    (api.status, api.body.clone()).into_response()
}

/// Start the fake API and return its base URL
async fn serve(api: FakeApi) -> String {
    let app = Router::new()
        .route("/v2/live", post(live_handler))
        .with_state(api);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn fake_api(status: StatusCode, body: &str) -> FakeApi {
    FakeApi {
        status,
        body: body.to_string(),
        requests: Arc::new(Mutex::new(Vec::new())),
    }
}

fn request() -> InitiateRequest {
    InitiateRequest {
        format: AudioFormat {
            encoding: "wav/pcm".to_string(),
            sample_rate: 16000,
            bit_depth: 16,
            channels: 1,
        },
        streaming: StreamingConfig::default(),
    }
}

#[tokio::test]
async fn test_successful_negotiation() {
    let api = fake_api(
        StatusCode::CREATED,
        r#"{"id":"session-1","url":"wss://live.test/v2/live?token=xyz"}"#,
    );
    let requests = Arc::clone(&api.requests);
    let base = serve(api).await;

    let negotiator = SessionNegotiator::new(format!("{}/", base), "secret-key");
    let response = negotiator.negotiate(&request()).await.unwrap();

    assert_eq!(response.url, "wss://live.test/v2/live?token=xyz");
    assert_eq!(response.id.as_deref(), Some("session-1"));

    let requests = requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    let (headers, body) = &requests[0];
    assert_eq!(headers["x-gladia-key"], "secret-key");
    assert_eq!(headers["content-type"], "application/json");
    assert_eq!(
        body,
        &json!({
            "encoding": "wav/pcm",
            "sample_rate": 16000,
            "bit_depth": 16,
            "channels": 1,
            "language_config": {
                "languages": ["es", "ru", "en", "fr"],
                "code_switching": true
            }
        })
    );
}

#[tokio::test]
async fn test_rejection_surfaces_status_and_body() {
    let base = serve(fake_api(StatusCode::UNAUTHORIZED, "Invalid API key")).await;

    let negotiator = SessionNegotiator::new(base, "wrong-key");
    let err = negotiator.negotiate(&request()).await.unwrap_err();

    match &err {
        NegotiationError::Rejected { status, body } => {
            assert_eq!(*status, 401);
            assert_eq!(body, "Invalid API key");
        }
        other => panic!("expected rejection, got {:?}", other),
    }
    assert_eq!(err.exit_code(), 401);
}

#[tokio::test]
async fn test_empty_rejection_body_uses_reason_phrase() {
    let base = serve(fake_api(StatusCode::UNPROCESSABLE_ENTITY, "")).await;

    let err = SessionNegotiator::new(base, "key")
        .negotiate(&request())
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Error 422: Unprocessable Entity");
}

#[tokio::test]
async fn test_success_without_url_is_invalid() {
    let base = serve(fake_api(StatusCode::OK, r#"{"id":"session-2"}"#)).await;

    let err = SessionNegotiator::new(base, "key")
        .negotiate(&request())
        .await
        .unwrap_err();

    assert!(matches!(err, NegotiationError::InvalidResponse(_)));
    assert_eq!(err.exit_code(), 1);
}

#[tokio::test]
async fn test_unreachable_server_is_request_error() {
    // Bind then drop to get a port nobody listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = SessionNegotiator::new(format!("http://{}", addr), "key")
        .negotiate(&request())
        .await
        .unwrap_err();

    assert!(matches!(err, NegotiationError::Request(_)));
    assert_eq!(err.exit_code(), 1);
}

#[tokio::test]
async fn test_unauthorized_run_exits_with_status_before_streaming() {
    let api = fake_api(StatusCode::UNAUTHORIZED, "Invalid API key");
    let requests = Arc::clone(&api.requests);
    let base = serve(api).await;

    let dir = tempfile::tempdir().unwrap();
    let wav_path = dir.path().join("input.wav");
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&wav_path, spec).unwrap();
    for i in 0..1600 {
        writer.write_sample((i % 100) as i16).unwrap();
    }
    writer.finalize().unwrap();

    let mut cfg = Config::default();
    cfg.service.api_url = base;
    cfg.input.file_path = wav_path;

    let err = stream_file(&cfg, "wrong-key").await.unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Negotiation(NegotiationError::Rejected { status: 401, .. })
    ));
    assert_eq!(err.exit_code(), 401);
    assert_eq!(requests.lock().unwrap().len(), 1);
}
