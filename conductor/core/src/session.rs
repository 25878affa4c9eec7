//! Session Management
//!
//! A session is one chat screen's worth of conversation: the ordered message
//! list, the input buffer and the "reply pending" / "user typing" flags. It is
//! created when the screen mounts and lives only in memory.
//!
//! The session never talks to the network itself. [`ChatSession::submit`]
//! hands back the request the owner must dispatch, and
//! [`ChatSession::resolve`] folds the outcome back in, so every state
//! transition here is synchronous and easy to test.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::backend::{BackendError, ChatReply, ChatRequest};
use crate::messages::{ChatMode, MessageId, SessionId};

/// Reply shown when the chat service cannot be reached
pub const FALLBACK_REPLY: &str = "Lo siento 😢, ocurrió un error al procesar tu mensaje.";

/// First bot message of every session
pub const DEFAULT_GREETING: &str = "¡Hola! Estoy aquí para escucharte y apoyarte. Ya sea que \
estés lidiando con el acoso escolar, te sientas abrumado o simplemente necesites hablar con \
alguien, estoy aquí para ti. ¿Qué tienes en mente hoy?";

/// A message in the conversation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: MessageId,
    /// Message text (always complete, even while being revealed)
    pub text: String,
    /// Whether the user wrote it
    pub is_user: bool,
    /// When the message was created
    pub timestamp: DateTime<Utc>,
    /// Whether the text is fully shown (reveal finished or never needed)
    pub written: bool,
}

impl Message {
    /// Create a user message; user messages never need a reveal
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            text: text.into(),
            is_user: true,
            timestamp: Utc::now(),
            written: true,
        }
    }

    /// Create a bot message
    pub fn bot(text: impl Into<String>, written: bool) -> Self {
        Self {
            id: MessageId::new(),
            text: text.into(),
            is_user: false,
            timestamp: Utc::now(),
            written,
        }
    }
}

/// A chat screen's conversation state
#[derive(Clone, Debug)]
pub struct ChatSession {
    id: SessionId,
    messages: Vec<Message>,
    pending_response: bool,
    user_typing: bool,
    input: String,
    fallback_reply: String,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatSession {
    /// Create a new session with a fresh ID
    pub fn new() -> Self {
        Self::with_id(SessionId::new())
    }

    /// Create a session with a specific ID
    pub fn with_id(id: SessionId) -> Self {
        Self {
            id,
            messages: Vec::new(),
            pending_response: false,
            user_typing: false,
            input: String::new(),
            fallback_reply: FALLBACK_REPLY.to_string(),
        }
    }

    /// Override the apology text used when a request fails
    #[must_use]
    pub fn with_fallback_reply(mut self, text: impl Into<String>) -> Self {
        self.fallback_reply = text.into();
        self
    }

    /// Session ID
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// All messages in insertion order
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Get message by ID
    pub fn get_message(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| &m.id == id)
    }

    /// Whether a message with this ID exists
    pub fn contains(&self, id: &MessageId) -> bool {
        self.get_message(id).is_some()
    }

    /// Whether a remote reply is being awaited
    pub fn pending_response(&self) -> bool {
        self.pending_response
    }

    /// Whether the user has unsent text in the input
    pub fn user_is_typing(&self) -> bool {
        self.user_typing
    }

    /// Current input buffer
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Replace the input buffer
    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
        self.user_typing = !self.input.trim().is_empty();
    }

    /// Submit user text.
    ///
    /// Returns `None` (and changes nothing) when the text is blank. Otherwise
    /// appends the user message, clears the input, marks a reply as pending
    /// and returns the request to send.
    pub fn submit(&mut self, text: &str) -> Option<ChatRequest> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }

        self.messages.push(Message::user(trimmed));
        self.input.clear();
        self.user_typing = false;
        self.pending_response = true;

        Some(ChatRequest {
            chat_id: self.id.clone(),
            message: text.to_string(),
        })
    }

    /// Fold a request outcome back into the session.
    ///
    /// Failures become the fallback reply, so exactly one bot message is
    /// appended per resolution. The reply is unwritten only when `mode`
    /// reveals replies.
    pub fn resolve(&mut self, outcome: Result<ChatReply, BackendError>, mode: ChatMode) -> &Message {
        let text = match outcome {
            Ok(reply) => reply.text,
            Err(e) => {
                tracing::warn!(session = %self.id, error = %e, "Chat request failed, using fallback reply");
                self.fallback_reply.clone()
            }
        };
        self.pending_response = false;
        self.push_bot_message(text, !mode.reveals())
    }

    /// Append a bot message that did not come from a request (greeting)
    pub fn push_bot_message(&mut self, text: impl Into<String>, written: bool) -> &Message {
        let index = self.messages.len();
        self.messages.push(Message::bot(text, written));
        &self.messages[index]
    }

    /// Mark a message as fully written.
    ///
    /// Returns `true` only when the flag actually flipped. Unknown IDs are
    /// ignored so a late completion callback cannot fail.
    pub fn mark_written(&mut self, id: &MessageId) -> bool {
        match self.messages.iter_mut().find(|m| &m.id == id) {
            Some(msg) if !msg.written => {
                msg.written = true;
                true
            }
            _ => false,
        }
    }
}
