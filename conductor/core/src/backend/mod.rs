//! Remote Service Integration
//!
//! This module provides abstracted access to the chat and transcription
//! services through a common trait interface.
//!
//! # Available Backends
//!
//! - **CecyAPI**: the hosted chat + transcription services (default)
//!
//! # Usage
//!
//! ```ignore
//! use cecy_core::backend::{ApiConfig, CecyApiClient, ChatBackend, ChatRequest};
//!
//! let client = CecyApiClient::new(ApiConfig::default())?;
//! let reply = client.respond(&ChatRequest { chat_id, message: "Hola".into() }).await?;
//! ```

mod cecy_api;
mod traits;

pub use cecy_api::{
    ApiConfig, CecyApiClient, DEFAULT_CHAT_API_URL, DEFAULT_TIMEOUT, DEFAULT_TRANSCRIBE_API_URL,
};
pub use traits::{
    AudioClip, BackendError, ChatBackend, ChatReply, ChatRequest, Transcriber, DEFAULT_AUDIO_MIME,
};
