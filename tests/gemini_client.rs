use serde_json::json;
use signaturize::ai::client::GeminiClient;
use signaturize::config::ModelConfig;
use signaturize::{FieldShapeInferrer, PromptInterpreter, SignatureError};
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MODEL_PATH: &str = "/v1beta/models/gemini-test:generateContent";

const SIGNATURE_JSON: &str = r#"{
    "signature_name": "Summarize",
    "task_description": "Summarize a document.",
    "signature_fields": [
        { "name": "document", "type": "str", "role": "input", "description": "" },
        { "name": "summary", "type": "str", "role": "output", "description": "" }
    ]
}"#;

fn config_for(server: &MockServer) -> ModelConfig {
    let mut config = ModelConfig::new("test-key");
    config.api_base = format!("{}/v1beta", server.uri());
    config.model = "gemini-test".into();
    config
}

fn candidate(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "candidates": [{ "content": { "parts": [{ "text": text }] } }]
    }))
}

#[tokio::test]
async fn retried_call_fits_in_the_call_budget() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .and(query_param("key", "test-key"))
        .respond_with(ResponseTemplate::new(503).set_delay(Duration::from_millis(300)))
        .with_priority(1)
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(candidate(SIGNATURE_JSON).set_delay(Duration::from_millis(300)))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = config_for(&server);
    config.timeout = Duration::from_millis(500);
    config.max_attempts = 3;
    config.backoff_base = Duration::from_millis(100);

    // Two slow attempts plus the wait between them exceed one attempt's timeout.
    let budget = config.call_budget();
    assert!(budget > Duration::from_millis(300 + 200 + 300));

    let interpreter =
        PromptInterpreter::new(GeminiClient::new(config).unwrap()).with_timeout(budget);
    let sig = interpreter
        .from_prompt("Summarize documents", "signature")
        .await
        .unwrap()
        .into_signature()
        .unwrap();
    assert_eq!(sig.name(), "Summarize");
    assert_eq!(sig.input_names(), vec!["document"]);
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = config_for(&server);
    config.backoff_base = Duration::from_millis(10);
    let client = GeminiClient::new(config).unwrap();

    let err = client.infer("meta", "task").await.unwrap_err();
    match err {
        SignatureError::ApiStatus { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "bad request");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn slow_response_is_a_model_timeout() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(candidate(SIGNATURE_JSON).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let mut config = config_for(&server);
    config.timeout = Duration::from_millis(100);
    config.backoff_base = Duration::from_millis(10);
    let client = GeminiClient::new(config).unwrap();

    let err = client.infer("meta", "task").await.unwrap_err();
    assert!(
        matches!(err, SignatureError::ModelTimeout(d) if d == Duration::from_millis(100)),
        "unexpected error: {err}"
    );
}
