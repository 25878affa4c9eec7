//! Surface Events
//!
//! Events sent from the chat surface to the Conductor. They report what the
//! user did or what happened to the screen; the Conductor decides what it
//! means.

use serde::{Deserialize, Serialize};

use crate::messages::{ChatMode, MessageId};

/// Events from UI Surface to Conductor
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum SurfaceEvent {
    // ============================================
    // Screen lifecycle
    // ============================================
    /// The chat screen was mounted and is ready to render
    Mounted,

    /// The chat screen regained focus
    FocusGained,

    /// The chat screen lost focus (navigation, backgrounding)
    FocusLost,

    // ============================================
    // User input
    // ============================================
    /// The text input changed
    InputChanged {
        /// Current input content
        text: String,
    },

    /// User pressed send
    Submit {
        /// The message content
        text: String,
    },

    // ============================================
    // Speech and presentation
    // ============================================
    /// User toggled sound output
    SoundToggled,

    /// User switched between plain chat and the avatar view
    ModeChanged {
        /// Requested mode
        mode: ChatMode,
    },

    /// User pressed play on a bot message
    SpeakRequested {
        /// Message to read aloud
        message_id: MessageId,
    },

    /// User pressed stop
    StopSpeaking,

    // ============================================
    // Voice input
    // ============================================
    /// Microphone button pressed while idle
    VoiceCaptureStart,

    /// Microphone button pressed while recording
    VoiceCaptureStop,

    // ============================================
    // Conversation
    // ============================================
    /// User asked to reset the remote conversation context
    ResetRequested,
}

impl SurfaceEvent {
    /// Short name for logging
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Mounted => "mounted",
            Self::FocusGained => "focus_gained",
            Self::FocusLost => "focus_lost",
            Self::InputChanged { .. } => "input_changed",
            Self::Submit { .. } => "submit",
            Self::SoundToggled => "sound_toggled",
            Self::ModeChanged { .. } => "mode_changed",
            Self::SpeakRequested { .. } => "speak_requested",
            Self::StopSpeaking => "stop_speaking",
            Self::VoiceCaptureStart => "voice_capture_start",
            Self::VoiceCaptureStop => "voice_capture_stop",
            Self::ResetRequested => "reset_requested",
        }
    }
}
