//! Turns conductor messages into terminal output

use std::collections::HashMap;

use cecy_core::messages::{CaptureState, ChatMode, ConductorMessage, MessageId, NotifyLevel};
use cecy_core::resources::{self, Resource, Topic};

/// A reply being revealed on the current line
struct OpenReveal {
    text: String,
    printed: usize,
}

/// Stateful printer for one session
#[derive(Default)]
pub struct Renderer {
    mode: ChatMode,
    reveals: HashMap<MessageId, OpenReveal>,
}

impl Renderer {
    /// Create a renderer
    pub fn new() -> Self {
        Self::default()
    }

    fn line_open(&self) -> bool {
        !self.reveals.is_empty()
    }

    /// Output for `msg`; may be empty or a partial line
    pub fn render(&mut self, msg: &ConductorMessage) -> String {
        match msg {
            ConductorMessage::SessionInfo {
                session_id,
                mode,
                sound,
            } => {
                self.mode = *mode;
                format!(
                    "Sesión {session_id} · modo {} · sonido {}\n",
                    mode_name(*mode),
                    on_off(*sound)
                )
            }

            ConductorMessage::MessageAppended { message } if message.is_user => String::new(),
            ConductorMessage::MessageAppended { message } if message.written => {
                format!("Cecy: {}\n", message.text)
            }
            ConductorMessage::MessageAppended { message } => {
                self.reveals.insert(
                    message.id.clone(),
                    OpenReveal {
                        text: message.text.clone(),
                        printed: 0,
                    },
                );
                "Cecy: ".to_string()
            }

            ConductorMessage::RevealProgress { message_id, text } => {
                let Some(open) = self.reveals.get_mut(message_id) else {
                    return String::new();
                };
                let shown = text.chars().count();
                let delta: String = text.chars().skip(open.printed).collect();
                open.printed = open.printed.max(shown);
                delta
            }

            ConductorMessage::MessageWritten { message_id } => {
                let Some(open) = self.reveals.remove(message_id) else {
                    return String::new();
                };
                let rest: String = open.text.chars().skip(open.printed).collect();
                format!("{rest}\n")
            }

            ConductorMessage::AvatarMood { label, .. } => {
                if self.mode.reveals() && !self.line_open() {
                    format!("  ({label})\n")
                } else {
                    String::new()
                }
            }

            ConductorMessage::PendingChanged { .. } | ConductorMessage::SpeakingChanged { .. } => {
                String::new()
            }

            ConductorMessage::InputBuffer { text } if text.is_empty() => String::new(),
            ConductorMessage::InputBuffer { text } => {
                format!("Transcripción: {text}\n  (escribe /send para enviarla)\n")
            }

            ConductorMessage::VoiceCapture { state } => match state {
                CaptureState::Recording => "  [micrófono: grabando]\n".to_string(),
                CaptureState::Transcribing => "  [micrófono: transcribiendo...]\n".to_string(),
                CaptureState::Idle => String::new(),
            },

            ConductorMessage::SoundChanged { enabled } => format!("Sonido {}\n", on_off(*enabled)),

            ConductorMessage::ModeChanged { mode } => {
                self.mode = *mode;
                format!("Modo {}\n", mode_name(*mode))
            }

            ConductorMessage::Alert { title, message } => format!("[{title}] {message}\n"),

            ConductorMessage::Notify { level, message } => {
                let tag = match level {
                    NotifyLevel::Info => "info",
                    NotifyLevel::Warning => "aviso",
                    NotifyLevel::Error => "error",
                };
                format!("({tag}) {message}\n")
            }
        }
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "activado"
    } else {
        "desactivado"
    }
}

fn mode_name(mode: ChatMode) -> &'static str {
    match mode {
        ChatMode::Chat => "chat",
        ChatMode::Avatar => "avatar",
    }
}

/// Directory listing for `/resources`
pub fn resource_listing(category: Option<&str>) -> String {
    let catalog = resources::catalog();
    let category = category.unwrap_or(resources::ALL_CATEGORIES);
    let matches: Vec<&Resource> = resources::filter(&catalog, category);

    let mut out = String::new();
    if matches.is_empty() {
        out.push_str(&format!(
            "Sin recursos en \"{category}\". Categorías: {}\n",
            resources::categories(&catalog).join(", ")
        ));
        return out;
    }
    for resource in matches {
        out.push_str(&format!(
            "• {} [{}]\n  {}\n  {}\n",
            resource.title,
            resource.category,
            resource.description,
            resource.contact_uri()
        ));
    }
    out.push_str(&format!("Emergencias: {}\n", resources::EMERGENCY_URI));
    out
}

/// Topic listing for `/topics`
pub fn topic_listing() -> String {
    Topic::ALL
        .iter()
        .map(|t| format!("• {} ({}): {}\n", t.title(), t.color().to_hex(), t.description()))
        .collect()
}
