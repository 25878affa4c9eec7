//! Cecy API Backend Implementation
//!
//! HTTP client for the hosted chat and transcription services.
//!
//! # Cecy API
//!
//! - `POST {chat}/app` with `{chat_id, mensaje}` - reply to a message
//! - `POST {chat}/app` with `{chat_id, reset: true}` - reset the context
//! - `POST {transcribe}/transcribe/` multipart `file` - speech to text
//!
//! Every request carries `Authorization: Bearer <token>` when the token
//! provider has one.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use super::traits::{AudioClip, BackendError, ChatBackend, ChatReply, ChatRequest, Transcriber};
use crate::auth::{NoToken, TokenProvider};
use crate::messages::SessionId;

/// Default chat service
pub const DEFAULT_CHAT_API_URL: &str = "https://cecyapi-2h4u.onrender.com";

/// Default transcription service
pub const DEFAULT_TRANSCRIBE_API_URL: &str = "https://82407.pythonanywhere.com";

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Client configuration
#[derive(Clone)]
pub struct ApiConfig {
    /// Chat service base URL
    pub chat_base_url: String,
    /// Transcription service base URL
    pub transcribe_base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Source of the bearer token
    pub token_provider: Arc<dyn TokenProvider>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            chat_base_url: DEFAULT_CHAT_API_URL.to_string(),
            transcribe_base_url: DEFAULT_TRANSCRIBE_API_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            token_provider: Arc::new(NoToken),
        }
    }
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("chat_base_url", &self.chat_base_url)
            .field("transcribe_base_url", &self.transcribe_base_url)
            .field("timeout", &self.timeout)
            .field("has_token", &self.token_provider.token().is_some())
            .finish()
    }
}

impl ApiConfig {
    /// Point both services at `base_url` (tests, self-hosting)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        self.chat_base_url.clone_from(&base_url);
        self.transcribe_base_url = base_url;
        self
    }

    /// Set the token provider
    pub fn with_token_provider(mut self, provider: Arc<dyn TokenProvider>) -> Self {
        self.token_provider = provider;
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Deserialize)]
struct ChatResponseBody {
    respuesta: String,
}

#[derive(Deserialize)]
struct ResetResponseBody {
    mensaje: String,
}

#[derive(Deserialize)]
struct TranscriptionBody {
    transcription: String,
}

/// Cecy API client
#[derive(Clone, Debug)]
pub struct CecyApiClient {
    config: ApiConfig,
    http_client: reqwest::Client,
}

impl CecyApiClient {
    /// Create a client
    pub fn new(config: ApiConfig) -> Result<Self, BackendError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            config,
            http_client,
        })
    }

    /// Client configuration
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    fn endpoint(base: &str, path: &str) -> String {
        format!("{}/{}", base.trim_end_matches('/'), path)
    }

    fn chat_url(&self) -> String {
        Self::endpoint(&self.config.chat_base_url, "app")
    }

    fn transcribe_url(&self) -> String {
        Self::endpoint(&self.config.transcribe_base_url, "transcribe/")
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.config.token_provider.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, BackendError> {
        let response = self.authorize(request).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| BackendError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ChatBackend for CecyApiClient {
    fn name(&self) -> &'static str {
        "CecyAPI"
    }

    async fn respond(&self, request: &ChatRequest) -> Result<ChatReply, BackendError> {
        tracing::debug!(chat_id = %request.chat_id, "Sending chat message");

        let body = json!({
            "chat_id": request.chat_id.0,
            "mensaje": request.message,
        });
        let reply: ChatResponseBody = self
            .execute(self.http_client.post(self.chat_url()).json(&body))
            .await?;

        Ok(ChatReply {
            text: reply.respuesta,
        })
    }

    async fn reset(&self, chat_id: &SessionId) -> Result<String, BackendError> {
        tracing::debug!(chat_id = %chat_id, "Resetting chat context");

        let body = json!({
            "chat_id": chat_id.0,
            "reset": true,
        });
        let reply: ResetResponseBody = self
            .execute(self.http_client.post(self.chat_url()).json(&body))
            .await?;

        Ok(reply.mensaje)
    }
}

#[async_trait]
impl Transcriber for CecyApiClient {
    async fn transcribe(&self, clip: AudioClip) -> Result<String, BackendError> {
        tracing::debug!(bytes = clip.bytes.len(), mime = %clip.mime_type, "Uploading audio clip");

        let part = reqwest::multipart::Part::bytes(clip.bytes)
            .file_name(clip.file_name)
            .mime_str(&clip.mime_type)?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let reply: TranscriptionBody = self
            .execute(self.http_client.post(self.transcribe_url()).multipart(form))
            .await?;

        Ok(reply.transcription)
    }
}
