//! Gemini client tests against a local mock of the `generateContent` endpoint.

mod common;

use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use common::*;
use serde_json::{json, Value};
use story_studio::gemini::{GeminiClient, GenerationError, GenerationRequest, ImageGenerator};

#[derive(Debug, Clone)]
struct Received {
    call: String,
    api_key: Option<String>,
    body: Value,
}

#[derive(Clone)]
struct MockGemini {
    status: StatusCode,
    reply: Value,
    received: Arc<Mutex<Vec<Received>>>,
}

impl MockGemini {
    fn received(&self) -> Vec<Received> {
        self.received.lock().unwrap().clone()
    }
}

async fn generate_content(
    State(mock): State<MockGemini>,
    Path(call): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    mock.received.lock().unwrap().push(Received {
        call,
        api_key: headers
            .get("x-goog-api-key")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body,
    });
    (mock.status, Json(mock.reply.clone()))
}

/// Serve `reply` with `status` on an ephemeral port and point a client at it.
async fn spawn(status: StatusCode, reply: Value) -> (GeminiClient, MockGemini) {
    let mock = MockGemini {
        status,
        reply,
        received: Arc::new(Mutex::new(Vec::new())),
    };
    let app = Router::new()
        .route("/v1beta/models/{call}", post(generate_content))
        .with_state(mock.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock server");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = GeminiClient::new(format!("http://{}/v1beta", addr), "test-key", "test-model");
    (client, mock)
}

fn request(prompt: &str) -> GenerationRequest {
    let characters = vec![character_with_image(1), character_with_image(3)];
    GenerationRequest::new(prompt, &characters).unwrap()
}

fn image_reply(data: &str) -> Value {
    json!({
        "candidates": [{
            "content": {
                "role": "model",
                "parts": [
                    { "text": "Here you go" },
                    { "inlineData": { "mimeType": "image/png", "data": data } }
                ]
            },
            "finishReason": "STOP"
        }]
    })
}

mod success {
    use super::*;

    #[tokio::test]
    async fn returns_the_first_inline_image() {
        let (client, _mock) = spawn(StatusCode::OK, image_reply("iVBORw0KGgo=")).await;

        let image = client.generate(&request("a cat on a roof")).await.unwrap();

        assert_eq!(image, "iVBORw0KGgo=");
    }

    #[tokio::test]
    async fn sends_key_model_and_references() {
        let (client, mock) = spawn(StatusCode::OK, image_reply("QUJD")).await;
        let request = request("a cat on a roof");

        client.generate(&request).await.unwrap();

        let received = mock.received();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].call, "test-model:generateContent");
        assert_eq!(received[0].api_key.as_deref(), Some("test-key"));

        let body = &received[0].body;
        assert_eq!(body["generationConfig"]["responseModalities"], json!(["IMAGE"]));

        let parts = body["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/png");
        assert_eq!(
            parts[0]["inlineData"]["data"],
            story_studio::archive::encode_file(&png_bytes()).as_str()
        );
        assert!(parts[1]["inlineData"].is_object());
        assert_eq!(parts[2]["text"], request.instruction().as_str());
    }
}

mod missing_image {
    use super::*;

    #[tokio::test]
    async fn text_only_reply_is_no_image() {
        let reply = json!({
            "candidates": [{ "content": { "parts": [{ "text": "I can't draw that" }] } }]
        });
        let (client, _mock) = spawn(StatusCode::OK, reply).await;

        let result = client.generate(&request("a cat")).await;

        assert!(matches!(result, Err(GenerationError::NoImage)));
    }

    #[tokio::test]
    async fn blocked_prompt_is_no_image() {
        let reply = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        let (client, _mock) = spawn(StatusCode::OK, reply).await;

        let result = client.generate(&request("a cat")).await;

        assert!(matches!(result, Err(GenerationError::NoImage)));
    }
}

mod errors {
    use super::*;

    fn envelope(code: u16, message: &str, status: &str) -> Value {
        json!({ "error": { "code": code, "message": message, "status": status } })
    }

    #[tokio::test]
    async fn bad_request_carries_the_service_message() {
        let reply = envelope(400, "Request contains an invalid argument.", "INVALID_ARGUMENT");
        let (client, _mock) = spawn(StatusCode::BAD_REQUEST, reply).await;

        let result = client.generate(&request("a cat")).await;

        match result {
            Err(GenerationError::BadRequest(message)) => {
                assert_eq!(message, "Request contains an invalid argument.")
            }
            other => panic!("expected BadRequest, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn rejected_key_is_unauthorized() {
        let reply = envelope(403, "API key not valid.", "PERMISSION_DENIED");
        let (client, _mock) = spawn(StatusCode::FORBIDDEN, reply).await;

        let result = client.generate(&request("a cat")).await;

        assert!(matches!(result, Err(GenerationError::Unauthorized)));
    }

    #[tokio::test]
    async fn other_statuses_are_service_errors() {
        let reply = envelope(503, "The model is overloaded.", "UNAVAILABLE");
        let (client, _mock) = spawn(StatusCode::SERVICE_UNAVAILABLE, reply).await;

        let result = client.generate(&request("a cat")).await;

        let error = result.unwrap_err();
        assert!(matches!(error, GenerationError::Service(_)));
        let message = error.to_string();
        assert!(message.contains("503"));
        assert!(message.contains("The model is overloaded."));
    }

    #[tokio::test]
    async fn unreachable_service_is_an_http_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let client = GeminiClient::new(format!("http://{}/v1beta", addr), "key", "model");

        let result = client.generate(&request("a cat")).await;

        assert!(matches!(result, Err(GenerationError::Http(_))));
    }
}
