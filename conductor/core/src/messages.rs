//! Conductor Messages
//!
//! Messages sent from the Conductor to the surface that renders the chat
//! screen (mobile shell, terminal, test harness).
//!
//! # Design Philosophy
//!
//! The Conductor owns the conversation, the reveal animation and the speech
//! state. Surfaces are pure renderers: they draw what these messages tell
//! them to and report user actions back as [`SurfaceEvent`]s.
//!
//! [`SurfaceEvent`]: crate::events::SurfaceEvent

use serde::{Deserialize, Serialize};

use crate::avatar::AvatarMood;
use crate::session::Message;

/// Messages from Conductor to UI Surface
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum ConductorMessage {
    // ============================================
    // Conversation Messages
    // ============================================
    /// A message was appended to the conversation
    MessageAppended {
        /// The full message (text is always complete; `written` says
        /// whether the surface may show it all yet)
        message: Message,
    },

    /// The visible prefix of a bot message grew by one character
    RevealProgress {
        /// Message being revealed
        message_id: MessageId,
        /// Text revealed so far
        text: String,
    },

    /// A message is fully revealed and should be shown in full
    MessageWritten {
        /// Message that finished
        message_id: MessageId,
    },

    /// A remote reply started or stopped being awaited
    PendingChanged {
        /// Whether a reply is pending
        pending: bool,
    },

    /// The input buffer content changed (cleared on submit, filled by
    /// voice transcription)
    InputBuffer {
        /// New buffer content
        text: String,
    },

    // ============================================
    // Speech and Avatar
    // ============================================
    /// The message currently being spoken changed
    SpeakingChanged {
        /// Message being spoken, if any
        message_id: Option<MessageId>,
    },

    /// The avatar mood changed
    AvatarMood {
        /// The mood to display
        mood: AvatarMood,
        /// Caption shown under the avatar
        label: String,
        /// Caption color (hex)
        color: String,
    },

    /// Voice capture state changed
    VoiceCapture {
        /// New capture state
        state: CaptureState,
    },

    // ============================================
    // Screen settings
    // ============================================
    /// Sound output was enabled or disabled
    SoundChanged {
        /// Whether sound is on
        enabled: bool,
    },

    /// Chat presentation mode changed
    ModeChanged {
        /// The new mode
        mode: ChatMode,
    },

    // ============================================
    // System Messages
    // ============================================
    /// Blocking, user-dismissable alert
    Alert {
        /// Alert title
        title: String,
        /// Alert body
        message: String,
    },

    /// Non-blocking notification
    Notify {
        /// Notification level
        level: NotifyLevel,
        /// Message content
        message: String,
    },

    /// Session information, sent when the screen mounts
    SessionInfo {
        /// Session ID sent with every chat request
        session_id: SessionId,
        /// Presentation mode
        mode: ChatMode,
        /// Whether sound output is enabled
        sound: bool,
    },
}

/// Message identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    /// Generate a new random message ID
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Session identifier (the `chat_id` the remote service keys context on)
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    /// Generate a new random session ID
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// How bot replies are presented
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatMode {
    /// Plain chat bubbles, replies shown immediately
    #[default]
    Chat,
    /// Animated avatar, replies revealed character by character
    Avatar,
}

impl ChatMode {
    /// Whether replies go through the reveal animation
    #[must_use]
    pub fn reveals(self) -> bool {
        matches!(self, Self::Avatar)
    }
}

impl std::str::FromStr for ChatMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "chat" | "plain" => Ok(Self::Chat),
            "avatar" | "visual" => Ok(Self::Avatar),
            other => Err(format!("unknown chat mode: {other}")),
        }
    }
}

/// Voice capture state as shown by the microphone button
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureState {
    /// Not recording
    #[default]
    Idle,
    /// Microphone is recording
    Recording,
    /// Clip is being transcribed
    Transcribing,
}

/// Notification levels
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotifyLevel {
    /// Informational
    Info,
    /// Warning
    Warning,
    /// Error
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_id_unique() {
        let id1 = MessageId::new();
        let id2 = MessageId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_session_id_is_uuid() {
        let id = SessionId::new();
        assert!(uuid::Uuid::parse_str(&id.0).is_ok());
    }

    #[test]
    fn test_chat_mode_parse() {
        assert_eq!("avatar".parse::<ChatMode>(), Ok(ChatMode::Avatar));
        assert_eq!("Chat".parse::<ChatMode>(), Ok(ChatMode::Chat));
        assert!("holo".parse::<ChatMode>().is_err());
        assert!(ChatMode::Avatar.reveals());
        assert!(!ChatMode::Chat.reveals());
    }
}
