//! Cecy API Contract Tests
//!
//! These tests pin the exact HTTP format the chat and transcription services
//! expect. Focus: request bodies, the bearer header, response parsing and
//! error mapping.

use std::sync::Arc;

use cecy_core::auth::StaticToken;
use cecy_core::backend::{
    ApiConfig, AudioClip, BackendError, CecyApiClient, ChatBackend, ChatRequest, Transcriber,
};
use cecy_core::messages::SessionId;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

/// Matches requests sent without credentials
struct NoAuthorization;

impl Match for NoAuthorization {
    fn matches(&self, request: &Request) -> bool {
        !request.headers.contains_key("authorization")
    }
}

fn client(server: &MockServer) -> CecyApiClient {
    CecyApiClient::new(ApiConfig::default().with_base_url(server.uri())).unwrap()
}

fn authed_client(server: &MockServer, token: &str) -> CecyApiClient {
    let config = ApiConfig::default()
        .with_base_url(server.uri())
        .with_token_provider(Arc::new(StaticToken::new(token)));
    CecyApiClient::new(config).unwrap()
}

fn request(chat_id: &str, message: &str) -> ChatRequest {
    ChatRequest {
        chat_id: SessionId(chat_id.to_string()),
        message: message.to_string(),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Chat
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_chat_request_format() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/app"))
        .and(body_partial_json(json!({
            "chat_id": "chat-1",
            "mensaje": "Hola"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "respuesta": "¡Hola! ¿Cómo estás?"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let reply = client(&server)
        .respond(&request("chat-1", "Hola"))
        .await
        .unwrap();

    assert_eq!(reply.text, "¡Hola! ¿Cómo estás?");
}

#[tokio::test]
async fn test_bearer_token_attached_when_signed_in() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/app"))
        .and(header("authorization", "Bearer jwt-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"respuesta": "ok"})))
        .expect(1)
        .mount(&server)
        .await;

    let result = authed_client(&server, "jwt-123")
        .respond(&request("chat-1", "Hola"))
        .await;

    assert!(result.is_ok(), "Authenticated request should succeed");
}

#[tokio::test]
async fn test_no_authorization_header_without_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/app"))
        .and(NoAuthorization)
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"respuesta": "ok"})))
        .expect(1)
        .mount(&server)
        .await;

    let result = client(&server).respond(&request("chat-1", "Hola")).await;
    assert!(result.is_ok(), "Anonymous request should not carry a header");
}

#[tokio::test]
async fn test_reset_request_format() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/app"))
        .and(body_partial_json(json!({
            "chat_id": "chat-9",
            "reset": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "mensaje": "Conversación reiniciada"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let notice = client(&server)
        .reset(&SessionId("chat-9".to_string()))
        .await
        .unwrap();

    assert_eq!(notice, "Conversación reiniciada");
}

// ────────────────────────────────────────────────────────────────────────────
// Transcription
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_transcription_uploads_file_part() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/transcribe/"))
        .and(body_string_contains("name=\"file\""))
        .and(body_string_contains("filename=\"audio.mp3\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "transcription": "quiero hablar con alguien"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let clip = AudioClip::new(b"ID3fake".to_vec(), "mp3");
    let text = client(&server).transcribe(clip).await.unwrap();

    assert_eq!(text, "quiero hablar con alguien");
}

// ────────────────────────────────────────────────────────────────────────────
// Error Mapping
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_server_error_maps_to_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/app"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = client(&server)
        .respond(&request("chat-1", "Hola"))
        .await
        .unwrap_err();

    match err {
        BackendError::Status { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "boom");
        }
        other => panic!("Expected Status, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unauthorized_maps_to_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/app"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = authed_client(&server, "expired")
        .respond(&request("chat-1", "Hola"))
        .await
        .unwrap_err();

    assert!(matches!(err, BackendError::Status { status: 401, .. }));
}

#[tokio::test]
async fn test_missing_field_maps_to_decode() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/app"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"reply": "wrong key"})))
        .mount(&server)
        .await;

    let err = client(&server)
        .respond(&request("chat-1", "Hola"))
        .await
        .unwrap_err();

    assert!(matches!(err, BackendError::Decode(_)), "got {err:?}");
}

#[tokio::test]
async fn test_invalid_json_maps_to_decode() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/transcribe/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = client(&server)
        .transcribe(AudioClip::new(vec![1, 2, 3], "m4a"))
        .await
        .unwrap_err();

    assert!(matches!(err, BackendError::Decode(_)), "got {err:?}");
}
