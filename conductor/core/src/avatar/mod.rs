//! Avatar Mood
//!
//! The avatar shown in the visual chat mode has three coarse moods. The mood
//! is never stored: it is derived from the session and playback flags every
//! time one of them changes.
//!
//! Rendering (floating, pulsing, the thought bubble) is entirely up to the
//! surface; this module only decides *which* mood applies and the caption
//! that goes with it.

mod color;

pub use color::{Color, ColorParseError, PRINCIPAL_COLORS};

use serde::{Deserialize, Serialize};

/// Avatar moods
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AvatarMood {
    /// Idle, waiting for the user
    #[default]
    Waiting,
    /// A reply is on its way
    Thinking,
    /// A message is being read aloud
    Speaking,
}

impl AvatarMood {
    /// Caption shown under the avatar
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Thinking => "Pensando...",
            Self::Speaking => "Hablando contigo",
            Self::Waiting => "Esperando tu mensaje",
        }
    }

    /// Caption color
    #[must_use]
    pub fn color(self) -> Color {
        match self {
            Self::Thinking => Color::rgb(0xF5, 0x9E, 0x0B),
            Self::Speaking => Color::rgb(0x53, 0xAB, 0x32),
            Self::Waiting => Color::rgb(0x94, 0xA3, 0xB8),
        }
    }
}

/// What the user typing does to the mood
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserTypingPolicy {
    /// Typing has no effect on the mood
    #[default]
    Ignore,
    /// Typing holds the avatar in `Waiting` even while a message is spoken
    HoldWaiting,
}

/// Inputs the mood is derived from
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MoodInputs {
    /// A remote reply is pending
    pub pending_response: bool,
    /// Some message is being spoken
    pub speaking: bool,
    /// The user has unsent text
    pub user_typing: bool,
}

/// Select the avatar mood.
///
/// Priority is `pending > speaking > typing > waiting`: a pending reply
/// always shows `Thinking`, whatever else is going on.
#[must_use]
pub fn select_mood(inputs: MoodInputs, policy: UserTypingPolicy) -> AvatarMood {
    if inputs.pending_response {
        return AvatarMood::Thinking;
    }
    if inputs.user_typing && policy == UserTypingPolicy::HoldWaiting {
        return AvatarMood::Waiting;
    }
    if inputs.speaking {
        return AvatarMood::Speaking;
    }
    AvatarMood::Waiting
}
