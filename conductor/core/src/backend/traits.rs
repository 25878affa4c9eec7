//! Chat Backend Traits
//!
//! Trait definitions for the remote services the conversation depends on.
//! The Conductor only ever talks to these traits, so tests can swap the
//! HTTP client for a scripted mock.
//!
//! # Design Philosophy
//!
//! The remote service is the whole brain of the assistant; this crate only
//! needs three calls from it:
//! - Reply to one user message within a chat context
//! - Reset that chat context
//! - Turn a recorded audio clip into text

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

use crate::messages::SessionId;

/// Fallback content type for audio uploads
pub const DEFAULT_AUDIO_MIME: &str = "audio/mpeg";

/// One user message for the chat service
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatRequest {
    /// Session the remote context is keyed on
    pub chat_id: SessionId,
    /// The user's text, as typed
    pub message: String,
}

/// The chat service's answer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatReply {
    /// Reply text
    pub text: String,
}

/// A recorded clip ready for upload
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioClip {
    /// Raw encoded audio
    pub bytes: Vec<u8>,
    /// Upload file name (`audio.<ext>`)
    pub file_name: String,
    /// Content type of the upload
    pub mime_type: String,
}

impl AudioClip {
    /// Wrap encoded audio whose container is given by `extension`
    pub fn new(bytes: Vec<u8>, extension: &str) -> Self {
        let extension = extension.trim_start_matches('.').to_lowercase();
        let mime_type = mime_guess::from_ext(&extension)
            .first()
            .map(|m| m.essence_str().to_string())
            .unwrap_or_else(|| DEFAULT_AUDIO_MIME.to_string());
        let file_name = if extension.is_empty() {
            "audio".to_string()
        } else {
            format!("audio.{extension}")
        };

        Self {
            bytes,
            file_name,
            mime_type,
        }
    }

    /// Read a clip from disk
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        Ok(Self::new(bytes, extension))
    }

    /// Whether the clip holds no audio at all
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Failure talking to a remote service
#[derive(Debug, Error)]
pub enum BackendError {
    /// Connection-level failure
    #[error("network error: {0}")]
    Network(String),

    /// Non-2xx answer
    #[error("service returned {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, for logging
        body: String,
    },

    /// Answer did not have the expected shape
    #[error("unexpected response: {0}")]
    Decode(String),

    /// No answer within the configured timeout
    #[error("request timed out")]
    Timeout,
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_decode() {
            Self::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            Self::Status {
                status: status.as_u16(),
                body: e.to_string(),
            }
        } else {
            Self::Network(e.to_string())
        }
    }
}

/// Chat service
///
/// Implement this trait to point the Conductor at a different service.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &str;

    /// Get the reply to one user message
    async fn respond(&self, request: &ChatRequest) -> Result<ChatReply, BackendError>;

    /// Reset the remote context of `chat_id`, returning the service's notice
    async fn reset(&self, chat_id: &SessionId) -> Result<String, BackendError>;
}

/// Speech-to-text service
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe a recorded clip
    async fn transcribe(&self, clip: AudioClip) -> Result<String, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_clip_mime_from_extension() {
        let clip = AudioClip::new(vec![1, 2, 3], "m4a");
        assert_eq!(clip.file_name, "audio.m4a");
        assert!(clip.mime_type.starts_with("audio/"));

        let clip = AudioClip::new(vec![1], ".WAV");
        assert_eq!(clip.file_name, "audio.wav");
    }

    #[test]
    fn test_clip_unknown_extension_falls_back() {
        let clip = AudioClip::new(vec![1], "zzq");
        assert_eq!(clip.mime_type, DEFAULT_AUDIO_MIME);

        let clip = AudioClip::new(vec![1], "");
        assert_eq!(clip.file_name, "audio");
        assert_eq!(clip.mime_type, DEFAULT_AUDIO_MIME);
    }

    #[tokio::test]
    async fn test_clip_from_path() {
        let mut file = tempfile::Builder::new().suffix(".mp3").tempfile().unwrap();
        file.write_all(b"ID3").unwrap();

        let clip = AudioClip::from_path(file.path()).await.unwrap();
        assert_eq!(clip.bytes, b"ID3");
        assert_eq!(clip.file_name, "audio.mp3");
        assert_eq!(clip.mime_type, "audio/mpeg");
        assert!(!clip.is_empty());
    }
}
