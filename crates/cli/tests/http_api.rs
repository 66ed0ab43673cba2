use pretty_assertions::assert_eq;
use rethink_tutor::{ProviderError, ResponseMode, StubProvider, TutorConfig, TutorService};
use serde_json::{json, Value};
use std::sync::Arc;

const MATH_ERROR: &str = r#"{"hasError": true, "internalError": "arithmetic mistake", "location": "On the most recent step."}"#;

struct Server {
    base_url: String,
    stub: Arc<StubProvider>,
    http: reqwest::Client,
}

impl Server {
    async fn start() -> Self {
        let stub = Arc::new(StubProvider::new(ResponseMode::Native));
        let service = Arc::new(TutorService::new(stub.clone(), TutorConfig::default()));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, rethink_cli::app(service))
                .await
                .unwrap();
        });
        Self {
            base_url: format!("http://{addr}"),
            stub,
            http: reqwest::Client::new(),
        }
    }

    async fn post(&self, path: &str, body: Value) -> (u16, Value) {
        let resp = self
            .http
            .post(format!("{}{path}", self.base_url))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }
}

#[tokio::test]
async fn health_reports_ok_with_timestamp() {
    let server = Server::start().await;
    let resp = reqwest::get(format!("{}/health", server.base_url))
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    let timestamp = body["timestamp"].as_str().unwrap();
    assert!(chrono_like(timestamp), "{timestamp}");
}

#[tokio::test]
async fn analyze_then_chat_round_trip() {
    let server = Server::start().await;
    server.stub.push_reply(MATH_ERROR);

    let (status, body) = server
        .post(
            "/analyze",
            json!({"subject": "math", "fullText": "2+2=5", "newContent": "2+2=5"}),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["hasError"], true);
    assert_eq!(body["location"], "On the most recent step.");
    assert_eq!(body["hasActiveError"], true);
    let session_id = body["sessionId"].as_str().unwrap().to_string();
    assert_eq!(session_id.len(), 36);

    server.stub.push_reply("What is 2 plus 2?");
    let (status, body) = server
        .post("/chat", json!({"sessionId": session_id, "message": "where is it?"}))
        .await;
    assert_eq!(status, 200);
    assert_eq!(
        body,
        json!({"reply": "What is 2 plus 2?", "hasActiveError": true})
    );

    // A clean analysis closes the gate.
    server.stub.push_reply(r#"{"hasError": false}"#);
    let (status, body) = server
        .post(
            "/analyze",
            json!({"sessionId": session_id, "subject": "math", "fullText": "2+2=4", "newContent": "2+2=4"}),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(
        body,
        json!({"sessionId": session_id, "hasError": false, "hasActiveError": false})
    );

    let (status, body) = server
        .post("/chat", json!({"sessionId": session_id, "message": "and now?"}))
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "NO_ACTIVE_ERROR");
}

#[tokio::test]
async fn validation_errors_use_envelope() {
    let server = Server::start().await;

    let (status, body) = server
        .post("/analyze", json!({"subject": "math", "fullText": "2+2=5"}))
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "MISSING_FIELD");
    assert!(body["error"].as_str().unwrap().contains("newContent"));

    let (status, body) = server
        .post(
            "/analyze",
            json!({"subject": "history", "fullText": "x", "newContent": "x"}),
        )
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "INVALID_SUBJECT");

    let (status, body) = server.post("/chat", json!({"sessionId": "abc"})).await;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "MISSING_FIELD");

    let (status, body) = server
        .post("/chat", json!({"sessionId": "unknown", "message": "hi"}))
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "INVALID_SESSION");

    assert_eq!(server.stub.call_count(), 0);
}

#[tokio::test]
async fn malformed_body_is_invalid_request() {
    let server = Server::start().await;
    let resp = server
        .http
        .post(format!("{}/analyze", server.base_url))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn provider_failure_is_generic_llm_error() {
    let server = Server::start().await;
    server
        .stub
        .push_failure(ProviderError::Auth("key sk-live-123 revoked".to_string()));

    let (status, body) = server
        .post(
            "/analyze",
            json!({"subject": "writing", "fullText": "Their going home.", "newContent": "Their going home."}),
        )
        .await;
    assert_eq!(status, 500);
    assert_eq!(
        body,
        json!({"error": "LLM service unavailable", "code": "LLM_ERROR"})
    );
}

#[tokio::test]
async fn foreign_origins_are_rejected() {
    let server = Server::start().await;
    let resp = server
        .http
        .post(format!("{}/analyze", server.base_url))
        .header("origin", "https://evil.example")
        .json(&json!({"subject": "math", "fullText": "1", "newContent": "1"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "ORIGIN_REJECTED");
    assert_eq!(server.stub.call_count(), 0);
}

#[tokio::test]
async fn extension_origin_gets_cors_headers_and_preflight() {
    let server = Server::start().await;
    let origin = "chrome-extension://abcdefghijklmnop";

    let resp = server
        .http
        .request(
            reqwest::Method::OPTIONS,
            format!("{}/analyze", server.base_url),
        )
        .header("origin", origin)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 204);
    assert_eq!(
        resp.headers()["access-control-allow-origin"].to_str().unwrap(),
        origin
    );

    let resp = server
        .http
        .get(format!("{}/health", server.base_url))
        .header("origin", origin)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(
        resp.headers()["access-control-allow-origin"].to_str().unwrap(),
        origin
    );
}

fn chrono_like(ts: &str) -> bool {
    // e.g. 2024-01-01T12:00:00.000Z
    ts.len() == 24 && ts.ends_with('Z') && ts.as_bytes()[10] == b'T'
}
