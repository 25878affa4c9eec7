//! Conductor - The Orchestration Core
//!
//! The Conductor owns everything a chat screen needs while it is mounted:
//! - The conversation session and its outbound requests
//! - The speech output channel
//! - The reveal of the newest bot reply
//! - The avatar mood derived from all of the above
//! - Voice capture and the optional history mirror
//!
//! # Design Philosophy
//!
//! The Conductor is UI-agnostic. It doesn't know or care whether it's talking to
//! a mobile shell, a terminal or a test harness. It communicates through:
//! - `ConductorMessage`: Commands sent TO the UI surface
//! - `SurfaceEvent`: Events received FROM the UI surface
//!
//! # Driving the Conductor
//!
//! Nothing here runs on its own. Network replies, utterance callbacks and
//! reveal increments are queued internally; the owner awaits
//! [`Conductor::next_activity`] and hands the result to
//! [`Conductor::apply`] (or calls [`Conductor::step`] for both), alongside
//! feeding it surface events. All state is mutated on the owner's task, so
//! ordering is exactly the order activities are applied.
//!
//! After [`Conductor::dispose`], queued and late work is discarded.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::animation::{Activation, RevealCoordinator, RevealEvent, RevealPhase, DEFAULT_REVEAL_DURATION};
use crate::avatar::{select_mood, AvatarMood, MoodInputs, UserTypingPolicy};
use crate::backend::{BackendError, ChatBackend, ChatReply, Transcriber};
use crate::events::SurfaceEvent;
use crate::history::{HistoryMirror, HistoryStore};
use crate::messages::{CaptureState, ChatMode, ConductorMessage, MessageId, NotifyLevel, SessionId};
use crate::session::{ChatSession, Message, FALLBACK_REPLY};
use crate::speech::{Speaker, UtteranceEvent, UtterancePlayer};
use crate::voice::{CaptureError, Microphone, VoiceCapture};

/// Shown when voice input is requested without a microphone
const VOICE_UNAVAILABLE: &str = "La entrada de voz no está disponible";

/// Shown when the remote context could not be reset
const RESET_FAILED: &str = "No se pudo reiniciar la conversación";

/// Conductor configuration
#[derive(Clone, Debug)]
pub struct ConductorConfig {
    /// Initial presentation mode
    pub mode: ChatMode,
    /// Whether replies are read aloud
    pub sound_enabled: bool,
    /// Total duration of a reply reveal
    pub reveal_duration: Duration,
    /// First bot message, if any
    pub greeting: Option<String>,
    /// Apology used when a request fails
    pub fallback_reply: String,
    /// Effect of typing on the avatar mood
    pub typing_policy: UserTypingPolicy,
}

impl Default for ConductorConfig {
    fn default() -> Self {
        Self {
            mode: ChatMode::default(),
            sound_enabled: true,
            reveal_duration: DEFAULT_REVEAL_DURATION,
            greeting: None,
            fallback_reply: FALLBACK_REPLY.to_string(),
            typing_policy: UserTypingPolicy::default(),
        }
    }
}

/// Conductor failures
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConductorError {
    /// The screen was torn down
    #[error("conductor has been disposed")]
    Disposed,
}

/// Result of a spawned request
#[derive(Debug)]
enum Completion {
    Reply(Result<ChatReply, BackendError>),
    Reset(Result<String, BackendError>),
    Transcript(Result<String, BackendError>),
}

#[derive(Debug)]
enum ActivityKind {
    Completion(Completion),
    Utterance(UtteranceEvent),
    Reveal(RevealEvent),
}

/// One unit of asynchronous work, ready to be applied
#[derive(Debug)]
pub struct Activity(ActivityKind);

/// The Conductor - headless orchestration core
pub struct Conductor<B: ChatBackend> {
    /// Configuration
    config: ConductorConfig,
    /// Chat service
    backend: Arc<B>,
    /// Current session
    session: ChatSession,
    /// Command point over the audio output
    speaker: Speaker,
    /// Presentation mode
    mode: ChatMode,
    /// Sound output toggle
    sound_enabled: bool,
    /// Whether the screen has focus
    focused: bool,
    /// `start` has run
    started: bool,
    /// `dispose` has run
    disposed: bool,
    /// Message being spoken
    speaking: Option<MessageId>,
    /// Last mood sent to the surface
    mood: Option<AvatarMood>,
    /// Reveal of the newest bot message
    reveal: Option<RevealCoordinator>,
    /// Microphone adapter, when the surface has one
    voice: Option<VoiceCapture>,
    /// History mirror, when enabled
    history: Option<HistoryMirror>,
    /// Channel to send messages to UI surface
    tx: mpsc::Sender<ConductorMessage>,
    utterance_rx: mpsc::UnboundedReceiver<UtteranceEvent>,
    reveal_tx: mpsc::UnboundedSender<RevealEvent>,
    reveal_rx: mpsc::UnboundedReceiver<RevealEvent>,
    completion_tx: mpsc::UnboundedSender<Completion>,
    completion_rx: mpsc::UnboundedReceiver<Completion>,
}

impl<B: ChatBackend + 'static> Conductor<B> {
    /// Create a new Conductor with the given backend and speech engine
    pub fn new(
        backend: B,
        player: Arc<dyn UtterancePlayer>,
        config: ConductorConfig,
        tx: mpsc::Sender<ConductorMessage>,
    ) -> Self {
        let (utterance_tx, utterance_rx) = mpsc::unbounded_channel();
        let (reveal_tx, reveal_rx) = mpsc::unbounded_channel();
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();

        let session =
            ChatSession::new().with_fallback_reply(config.fallback_reply.clone());

        Self {
            mode: config.mode,
            sound_enabled: config.sound_enabled,
            config,
            backend: Arc::new(backend),
            session,
            speaker: Speaker::new(player, utterance_tx),
            focused: true,
            started: false,
            disposed: false,
            speaking: None,
            mood: None,
            reveal: None,
            voice: None,
            history: None,
            tx,
            utterance_rx,
            reveal_tx,
            reveal_rx,
            completion_tx,
            completion_rx,
        }
    }

    /// Enable voice input
    #[must_use]
    pub fn with_voice(mut self, microphone: Arc<dyn Microphone>, transcriber: Arc<dyn Transcriber>) -> Self {
        self.voice = Some(VoiceCapture::new(microphone, transcriber, self.speaker.clone()));
        self
    }

    /// Mirror the conversation into `store`
    #[must_use]
    pub fn with_history(mut self, store: Arc<dyn HistoryStore>) -> Self {
        self.history = Some(HistoryMirror::spawn(store));
        self
    }

    /// Get the session ID
    pub fn session_id(&self) -> &SessionId {
        self.session.id()
    }

    /// Get the session
    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    /// Presentation mode
    pub fn mode(&self) -> ChatMode {
        self.mode
    }

    /// Whether sound output is on
    pub fn sound_enabled(&self) -> bool {
        self.sound_enabled
    }

    /// Message being spoken
    pub fn speaking(&self) -> Option<&MessageId> {
        self.speaking.as_ref()
    }

    /// Current avatar mood
    pub fn mood(&self) -> AvatarMood {
        self.current_mood()
    }

    /// Phase of the newest reveal, if one was started
    pub fn reveal_phase(&self) -> Option<RevealPhase> {
        self.reveal.as_ref().map(RevealCoordinator::phase)
    }

    /// Voice capture state
    pub fn capture_state(&self) -> CaptureState {
        self.voice
            .as_ref()
            .map_or(CaptureState::Idle, VoiceCapture::state)
    }

    /// Whether `dispose` was called
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Start the Conductor: announce the session and greet
    pub async fn start(&mut self) -> Result<(), ConductorError> {
        if self.disposed {
            return Err(ConductorError::Disposed);
        }
        if self.started {
            return Ok(());
        }
        self.started = true;

        tracing::info!(session = %self.session.id(), mode = ?self.mode, "Chat screen mounted");

        self.send(ConductorMessage::SessionInfo {
            session_id: self.session.id().clone(),
            mode: self.mode,
            sound: self.sound_enabled,
        })
        .await;

        if let Some(ref history) = self.history {
            history.chat_started(self.session.id());
        }

        self.refresh_mood().await;

        if let Some(greeting) = self.config.greeting.clone() {
            let written = !self.mode.reveals();
            let message = self.session.push_bot_message(greeting, written).clone();
            self.present_bot_message(message).await;
        }

        self.drain_utterances().await;
        Ok(())
    }

    /// Handle an event from the UI surface
    pub async fn handle_event(&mut self, event: SurfaceEvent) -> Result<(), ConductorError> {
        if self.disposed {
            return Err(ConductorError::Disposed);
        }

        tracing::trace!(event = event.kind(), "Surface event");

        match event {
            SurfaceEvent::Mounted => {
                self.start().await?;
            }

            SurfaceEvent::FocusGained => {
                self.focused = true;
            }

            SurfaceEvent::FocusLost => {
                self.focused = false;
                self.speaker.silence();
                self.force_complete_reveal().await;
            }

            SurfaceEvent::InputChanged { text } => {
                self.session.set_input(text);
                self.refresh_mood().await;
            }

            SurfaceEvent::Submit { text } => {
                self.submit(&text).await;
            }

            SurfaceEvent::SoundToggled => {
                self.sound_enabled = !self.sound_enabled;
                if !self.sound_enabled {
                    self.speaker.silence();
                }
                self.send(ConductorMessage::SoundChanged {
                    enabled: self.sound_enabled,
                })
                .await;
            }

            SurfaceEvent::ModeChanged { mode } => {
                if mode != self.mode {
                    self.speaker.silence();
                    self.force_complete_reveal().await;
                    self.mode = mode;
                    self.send(ConductorMessage::ModeChanged { mode }).await;
                }
            }

            SurfaceEvent::SpeakRequested { message_id } => {
                self.speak_message(&message_id);
            }

            SurfaceEvent::StopSpeaking => {
                self.speaker.silence();
            }

            SurfaceEvent::VoiceCaptureStart => {
                self.start_voice_capture().await;
            }

            SurfaceEvent::VoiceCaptureStop => {
                self.stop_voice_capture().await;
            }

            SurfaceEvent::ResetRequested => {
                self.speaker.silence();
                self.force_complete_reveal().await;

                let backend = Arc::clone(&self.backend);
                let chat_id = self.session.id().clone();
                let completions = self.completion_tx.clone();
                tokio::spawn(async move {
                    let outcome = backend.reset(&chat_id).await;
                    let _ = completions.send(Completion::Reset(outcome));
                });
            }
        }

        self.drain_utterances().await;
        Ok(())
    }

    /// Wait for the next unit of asynchronous work
    ///
    /// Returns `None` once the Conductor is disposed.
    pub async fn next_activity(&mut self) -> Option<Activity> {
        if self.disposed {
            return None;
        }

        let kind = tokio::select! {
            biased;
            Some(event) = self.utterance_rx.recv() => ActivityKind::Utterance(event),
            Some(event) = self.reveal_rx.recv() => ActivityKind::Reveal(event),
            Some(done) = self.completion_rx.recv() => ActivityKind::Completion(done),
            else => return None,
        };
        Some(Activity(kind))
    }

    /// Apply one unit of asynchronous work
    pub async fn apply(&mut self, activity: Activity) {
        if self.disposed {
            tracing::debug!(activity = ?activity, "Dropping activity after dispose");
            return;
        }

        match activity.0 {
            ActivityKind::Completion(done) => self.on_completion(done).await,
            ActivityKind::Utterance(event) => self.on_utterance(event).await,
            ActivityKind::Reveal(event) => self.on_reveal(event).await,
        }
        self.drain_utterances().await;
    }

    /// Wait for and apply one unit of work; `false` once disposed
    pub async fn step(&mut self) -> bool {
        match self.next_activity().await {
            Some(activity) => {
                self.apply(activity).await;
                true
            }
            None => false,
        }
    }

    /// Apply everything that is ready without waiting
    ///
    /// Returns the number of activities applied.
    pub async fn poll(&mut self) -> usize {
        let mut applied = 0;
        loop {
            if self.disposed {
                return applied;
            }
            let kind = if let Ok(event) = self.utterance_rx.try_recv() {
                ActivityKind::Utterance(event)
            } else if let Ok(event) = self.reveal_rx.try_recv() {
                ActivityKind::Reveal(event)
            } else if let Ok(done) = self.completion_rx.try_recv() {
                ActivityKind::Completion(done)
            } else {
                return applied;
            };
            self.apply(Activity(kind)).await;
            applied += 1;
        }
    }

    /// Tear down: stop speech, cancel the reveal and drop all late work
    pub async fn dispose(&mut self) {
        if self.disposed {
            return;
        }

        self.speaker.silence();
        if let Some(mut reveal) = self.reveal.take() {
            reveal.force_complete();
        }
        if let Some(ref history) = self.history {
            history.archive(self.session.id());
        }

        self.disposed = true;
        tracing::info!(session = %self.session.id(), "Chat screen disposed");
    }

    /// Wait for the history mirror to apply queued writes
    pub async fn flush_history(&self) {
        if let Some(ref history) = self.history {
            history.flush().await;
        }
    }

    // ============================================
    // Conversation
    // ============================================

    async fn submit(&mut self, text: &str) {
        let Some(request) = self.session.submit(text) else {
            return;
        };

        if let Some(message) = self.session.messages().last().cloned() {
            self.record(&message);
            self.send(ConductorMessage::MessageAppended { message }).await;
        }
        self.send(ConductorMessage::InputBuffer {
            text: String::new(),
        })
        .await;
        self.send(ConductorMessage::PendingChanged { pending: true })
            .await;
        self.refresh_mood().await;

        tracing::debug!(session = %request.chat_id, backend = self.backend.name(), "Dispatching chat request");

        let backend = Arc::clone(&self.backend);
        let completions = self.completion_tx.clone();
        tokio::spawn(async move {
            let outcome = backend.respond(&request).await;
            let _ = completions.send(Completion::Reply(outcome));
        });
    }

    async fn on_completion(&mut self, done: Completion) {
        match done {
            Completion::Reply(outcome) => {
                self.force_complete_reveal().await;

                let message = self.session.resolve(outcome, self.mode).clone();
                self.send(ConductorMessage::PendingChanged { pending: false })
                    .await;
                self.present_bot_message(message).await;
            }

            Completion::Reset(outcome) => match outcome {
                Ok(notice) => {
                    tracing::info!(session = %self.session.id(), "Remote context reset");
                    self.notify(NotifyLevel::Info, &notice).await;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Chat reset failed");
                    self.notify(NotifyLevel::Warning, RESET_FAILED).await;
                }
            },

            Completion::Transcript(outcome) => {
                let Some(ref voice) = self.voice else {
                    return;
                };
                match voice.finish_transcription(outcome) {
                    Ok(text) if !text.is_empty() => {
                        self.session.set_input(text.clone());
                        self.send(ConductorMessage::InputBuffer { text }).await;
                    }
                    Ok(_) => {
                        tracing::debug!("Empty transcript, input left unchanged");
                    }
                    Err(e) => self.alert_capture_error(&e).await,
                }
                self.send(ConductorMessage::VoiceCapture {
                    state: CaptureState::Idle,
                })
                .await;
            }
        }
        self.refresh_mood().await;
    }

    /// Show a freshly appended bot message, revealing it if needed
    async fn present_bot_message(&mut self, mut message: Message) {
        if !message.written && !self.focused {
            // Nobody is watching: skip the reveal and the speech
            self.session.mark_written(&message.id);
            message.written = true;
        }

        self.record(&message);
        self.send(ConductorMessage::MessageAppended {
            message: message.clone(),
        })
        .await;

        if !message.written {
            self.activate_reveal(&message).await;
            self.drain_utterances().await;
        }
    }

    // ============================================
    // Reveal
    // ============================================

    async fn activate_reveal(&mut self, message: &Message) {
        let mut coordinator = RevealCoordinator::new(message);
        let speaker = self.sound_enabled.then_some(&self.speaker);
        let activation = coordinator.activate(
            message.written,
            speaker,
            self.config.reveal_duration,
            &self.reveal_tx,
        );
        tracing::debug!(message = %message.id, activation = ?activation, "Reveal activated");

        if activation == Activation::AlreadyWritten {
            self.mark_written(&message.id).await;
        }
        self.reveal = Some(coordinator);
    }

    async fn on_reveal(&mut self, event: RevealEvent) {
        let Some(ref mut coordinator) = self.reveal else {
            return;
        };
        if !coordinator.on_event(&event) {
            tracing::trace!(message = %event.message_id(), "Ignoring stale reveal event");
            return;
        }

        match event {
            RevealEvent::Progress { message_id, .. } => {
                let text = coordinator.displayed_text().to_string();
                self.send(ConductorMessage::RevealProgress { message_id, text })
                    .await;
            }
            RevealEvent::Complete { message_id } => {
                self.mark_written(&message_id).await;
            }
        }
    }

    /// Jump the active reveal to its full text
    async fn force_complete_reveal(&mut self) {
        let Some(mut coordinator) = self.reveal.take() else {
            return;
        };
        if coordinator.force_complete() {
            let id = coordinator.message_id().clone();
            self.mark_written(&id).await;
        }
    }

    async fn mark_written(&mut self, id: &MessageId) {
        if self.session.mark_written(id) {
            self.send(ConductorMessage::MessageWritten {
                message_id: id.clone(),
            })
            .await;
        }
    }

    // ============================================
    // Speech
    // ============================================

    fn speak_message(&self, id: &MessageId) {
        if !self.sound_enabled {
            tracing::debug!(message = %id, "Sound is off, not speaking");
            return;
        }
        let Some(message) = self.session.get_message(id) else {
            tracing::debug!(message = %id, "Speak requested for unknown message");
            return;
        };
        if self.speaking.as_ref() == Some(id) {
            self.speaker.silence();
        } else {
            self.speaker.say(&message.id, &message.text);
        }
    }

    async fn on_utterance(&mut self, event: UtteranceEvent) {
        match event {
            UtteranceEvent::Started(id) => {
                if !self.session.contains(&id) {
                    return;
                }
                self.speaking = Some(id.clone());
                self.send(ConductorMessage::SpeakingChanged {
                    message_id: Some(id),
                })
                .await;
            }
            UtteranceEvent::Done(id) | UtteranceEvent::Stopped(id) => {
                if self.speaking.as_ref() != Some(&id) {
                    return;
                }
                self.speaking = None;
                self.send(ConductorMessage::SpeakingChanged { message_id: None })
                    .await;
            }
        }
        self.refresh_mood().await;
    }

    async fn drain_utterances(&mut self) {
        while let Ok(event) = self.utterance_rx.try_recv() {
            self.on_utterance(event).await;
        }
    }

    // ============================================
    // Voice
    // ============================================

    async fn start_voice_capture(&mut self) {
        let Some(ref voice) = self.voice else {
            self.notify(NotifyLevel::Warning, VOICE_UNAVAILABLE).await;
            return;
        };

        match voice.start_capture().await {
            Ok(()) => {
                self.send(ConductorMessage::VoiceCapture {
                    state: CaptureState::Recording,
                })
                .await;
            }
            Err(e) => self.alert_capture_error(&e).await,
        }
    }

    async fn stop_voice_capture(&mut self) {
        let Some(ref voice) = self.voice else {
            self.notify(NotifyLevel::Warning, VOICE_UNAVAILABLE).await;
            return;
        };

        match voice.stop_recording().await {
            Ok(clip) => {
                let transcriber = voice.transcriber();
                let completions = self.completion_tx.clone();
                tokio::spawn(async move {
                    let outcome = transcriber.transcribe(clip).await;
                    let _ = completions.send(Completion::Transcript(outcome));
                });
                self.send(ConductorMessage::VoiceCapture {
                    state: CaptureState::Transcribing,
                })
                .await;
            }
            Err(e) => {
                let state = voice.state();
                self.alert_capture_error(&e).await;
                self.send(ConductorMessage::VoiceCapture { state }).await;
            }
        }
    }

    async fn alert_capture_error(&self, error: &CaptureError) {
        match error.alert() {
            Some((title, message)) => {
                self.send(ConductorMessage::Alert {
                    title: title.to_string(),
                    message: message.to_string(),
                })
                .await;
            }
            None => tracing::debug!(error = %error, "Ignoring voice toggle"),
        }
    }

    // ============================================
    // Avatar
    // ============================================

    fn current_mood(&self) -> AvatarMood {
        select_mood(
            MoodInputs {
                pending_response: self.session.pending_response(),
                speaking: self.speaking.is_some(),
                user_typing: self.session.user_is_typing(),
            },
            self.config.typing_policy,
        )
    }

    /// Recompute the mood and send it if it changed
    async fn refresh_mood(&mut self) {
        let mood = self.current_mood();
        if self.mood == Some(mood) {
            return;
        }
        self.mood = Some(mood);
        self.send(ConductorMessage::AvatarMood {
            mood,
            label: mood.label().to_string(),
            color: mood.color().to_hex(),
        })
        .await;
    }

    // ============================================
    // Plumbing
    // ============================================

    fn record(&self, message: &Message) {
        if let Some(ref history) = self.history {
            history.message(self.session.id(), message);
        }
    }

    /// Send notification
    async fn notify(&self, level: NotifyLevel, message: &str) {
        self.send(ConductorMessage::Notify {
            level,
            message: message.to_string(),
        })
        .await;
    }

    /// Send a message to the UI surface
    async fn send(&self, msg: ConductorMessage) {
        if let Err(e) = self.tx.send(msg).await {
            tracing::warn!("Failed to send message to surface: {}", e);
        }
    }
}
