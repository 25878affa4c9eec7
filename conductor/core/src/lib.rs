//! Cecy Core - Headless Conversation Core for the Cecy companion
//!
//! This crate provides everything behind the chat screen of Cecy, a
//! conversational orientation companion for students, completely independent
//! of any UI framework. It can drive a mobile shell, a terminal, or run
//! headless for testing.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        UI Surfaces                               │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────┐ │
//! │  │  Mobile shell  │  │ Terminal (cli) │  │  Headless / tests  │ │
//! │  └───────┬────────┘  └───────┬────────┘  └─────────┬──────────┘ │
//! │          └───────────────────┼──────────────────────┘            │
//! │                    SurfaceEvent (up)                            │
//! │                  ConductorMessage (down)                        │
//! └──────────────────────────────┼───────────────────────────────────┘
//!                                │
//! ┌──────────────────────────────┼───────────────────────────────────┐
//! │                    CECY CORE │                                   │
//! │  ┌───────────────────────────┴─────────────────────────────────┐ │
//! │  │                      Conductor                               │ │
//! │  │  ┌──────────┐  ┌──────────┐  ┌──────────┐  ┌──────────────┐ │ │
//! │  │  │ Session  │  │  Reveal  │  │  Speech  │  │   Backend    │ │ │
//! │  │  │          │  │ + Avatar │  │ + Voice  │  │  (CecyAPI)   │ │ │
//! │  │  └──────────┘  └──────────┘  └──────────┘  └──────────────┘ │ │
//! │  └─────────────────────────────────────────────────────────────┘ │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`Conductor`]: The orchestration struct that owns a mounted chat screen
//! - [`ConductorMessage`]: Messages sent from Conductor to UI surfaces
//! - [`SurfaceEvent`]: Events sent from UI surfaces to Conductor
//! - [`ChatSession`]: Ordered transcript plus the pending-response flag
//! - [`AvatarMood`]: Mood derived from the session and speech state
//!
//! # Quick Start
//!
//! ```ignore
//! use cecy_core::{
//!     backend::{ApiConfig, CecyApiClient},
//!     speech::TimedUtterancePlayer,
//!     Conductor, ConductorConfig, SurfaceEvent,
//! };
//! use std::sync::Arc;
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let (tx, mut rx) = mpsc::channel(100);
//!
//!     let backend = CecyApiClient::new(ApiConfig::default())?;
//!     let player = Arc::new(TimedUtterancePlayer::default());
//!     let mut conductor = Conductor::new(backend, player, ConductorConfig::default(), tx);
//!
//!     conductor.handle_event(SurfaceEvent::Mounted).await?;
//!     conductor
//!         .handle_event(SurfaceEvent::Submit { text: "Hola".into() })
//!         .await?;
//!
//!     // Apply replies, reveal steps and speech callbacks as they arrive
//!     while conductor.step().await {
//!         while let Ok(msg) = rx.try_recv() {
//!             // Render message to UI
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`animation`]: Reveal timing, the reveal animator and its coordinator
//! - [`auth`]: Session token storage and the sign-in callback
//! - [`avatar`]: Avatar moods, captions and the brand palette
//! - [`backend`]: Chat and transcription service abstraction (CecyAPI)
//! - [`conductor`]: Main Conductor struct
//! - [`config`]: Layered configuration (TOML file, environment, flags)
//! - [`events`]: Events from UI surfaces to Conductor
//! - [`history`]: Optional mirror of the conversation into a store
//! - [`messages`]: Messages from Conductor to UI surfaces
//! - [`resources`]: Help line directory and discover topics
//! - [`session`]: Conversation session
//! - [`speech`]: Speech output channel
//! - [`voice`]: Microphone capture and transcription
//!
//! # No UI Dependencies
//!
//! This crate has **zero** dependencies on any UI framework. It's pure
//! business logic that can be used anywhere.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod animation;
pub mod auth;
pub mod avatar;
pub mod backend;
pub mod conductor;
pub mod config;
pub mod events;
pub mod history;
pub mod messages;
pub mod resources;
pub mod session;
pub mod speech;
pub mod voice;

// Re-exports for convenience
pub use avatar::{select_mood, AvatarMood, Color, MoodInputs, UserTypingPolicy};
pub use backend::{
    ApiConfig, AudioClip, BackendError, CecyApiClient, ChatBackend, ChatReply, ChatRequest,
    Transcriber,
};
pub use conductor::{Activity, Conductor, ConductorConfig, ConductorError};
pub use events::SurfaceEvent;
pub use messages::{CaptureState, ChatMode, ConductorMessage, MessageId, NotifyLevel, SessionId};
pub use session::{ChatSession, Message, DEFAULT_GREETING, FALLBACK_REPLY};

// Animation exports
pub use animation::{RevealAnimator, RevealCoordinator, RevealEvent, RevealPhase};

// Speech and voice exports
pub use speech::{Speaker, TimedUtterancePlayer, UtteranceEvent, UtterancePlayer};
pub use voice::{CaptureError, FileMicrophone, Microphone, VoiceCapture};

// Auth exports
pub use auth::{AuthCallback, AuthError, SessionTokens, TokenProvider, TokenStore};

// History exports
pub use history::{HistoryMirror, HistoryStore, JsonFileHistoryStore, MemoryHistoryStore};

// Config exports
pub use config::{
    default_config_path, load_config, load_config_from_path, CecyConfig, CecyToml, ConfigError,
    ConfigOverrides, ConfigSource,
};
