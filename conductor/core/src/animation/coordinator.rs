//! Speech-gated reveal of a single bot message.
//!
//! The coordinator starts speech and the reveal animation together and
//! tracks a small state machine:
//!
//! ```text
//! Idle ──activate──▶ Revealing ──complete / force──▶ Complete
//!   └──activate (already written)──────────────────────▲
//! ```
//!
//! Speech and reveal are independent: the coordinator never waits on one
//! for the other, and forcing completion does not stop speech. Stopping
//! speech on focus loss belongs to the owner.

use std::time::Duration;

use tokio::sync::mpsc;

use super::reveal::{RevealAnimator, RevealEvent};
use crate::messages::MessageId;
use crate::session::Message;
use crate::speech::Speaker;

/// Coordinator phase
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RevealPhase {
    /// Not yet activated
    Idle,
    /// Reveal in progress
    Revealing,
    /// Full text shown (terminal)
    Complete,
}

/// Result of [`RevealCoordinator::activate`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Activation {
    /// Reveal started
    Started {
        /// Whether speech was started alongside it
        speaking: bool,
    },
    /// Message was already written; full text shown, nothing started
    AlreadyWritten,
    /// Coordinator was already activated; nothing rescheduled
    AlreadyActive,
}

/// Drives the reveal of one message
#[derive(Debug)]
pub struct RevealCoordinator {
    message_id: MessageId,
    text: String,
    displayed: String,
    phase: RevealPhase,
    animator: Option<RevealAnimator>,
}

impl RevealCoordinator {
    /// Coordinator for `message`, idle
    pub fn new(message: &Message) -> Self {
        Self {
            message_id: message.id.clone(),
            text: message.text.clone(),
            displayed: String::new(),
            phase: RevealPhase::Idle,
            animator: None,
        }
    }

    /// Activate the coordinator.
    ///
    /// `speaker` is `None` when sound output is off; the reveal then runs
    /// alone. Only the first activation does anything.
    pub fn activate(
        &mut self,
        written: bool,
        speaker: Option<&Speaker>,
        duration: Duration,
        reveal_events: &mpsc::UnboundedSender<RevealEvent>,
    ) -> Activation {
        if self.phase != RevealPhase::Idle {
            return Activation::AlreadyActive;
        }

        if written {
            self.displayed = self.text.clone();
            self.phase = RevealPhase::Complete;
            return Activation::AlreadyWritten;
        }

        self.phase = RevealPhase::Revealing;
        if let Some(speaker) = speaker {
            speaker.say(&self.message_id, &self.text);
        }
        self.animator = Some(RevealAnimator::start(
            self.message_id.clone(),
            &self.text,
            duration,
            reveal_events.clone(),
        ));

        Activation::Started {
            speaking: speaker.is_some(),
        }
    }

    /// Apply a reveal event.
    ///
    /// Returns `true` if the event belonged to this coordinator and was
    /// applied. Late events (after completion) are rejected.
    pub fn on_event(&mut self, event: &RevealEvent) -> bool {
        if event.message_id() != &self.message_id || self.phase != RevealPhase::Revealing {
            return false;
        }

        match event {
            RevealEvent::Progress { shown, .. } => {
                let end = self
                    .text
                    .char_indices()
                    .nth(*shown)
                    .map_or(self.text.len(), |(i, _)| i);
                self.displayed.clear();
                self.displayed.push_str(&self.text[..end]);
            }
            RevealEvent::Complete { .. } => {
                self.displayed = self.text.clone();
                self.phase = RevealPhase::Complete;
                self.animator = None;
            }
        }
        true
    }

    /// Jump to the full text, cancelling the pending reveal.
    ///
    /// Returns `true` if a reveal was in progress.
    pub fn force_complete(&mut self) -> bool {
        if self.phase != RevealPhase::Revealing {
            return false;
        }
        if let Some(mut animator) = self.animator.take() {
            animator.cancel();
        }
        self.displayed = self.text.clone();
        self.phase = RevealPhase::Complete;
        tracing::debug!(message = %self.message_id, "Reveal forced to completion");
        true
    }

    /// Current phase
    pub fn phase(&self) -> RevealPhase {
        self.phase
    }

    /// Message this coordinator drives
    pub fn message_id(&self) -> &MessageId {
        &self.message_id
    }

    /// Text currently shown
    pub fn displayed_text(&self) -> &str {
        &self.displayed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::{TimedUtterancePlayer, UtteranceEvent};
    use std::sync::Arc;

    fn setup(text: &str) -> (RevealCoordinator, Message) {
        let message = Message::bot(text, false);
        (RevealCoordinator::new(&message), message)
    }

    #[tokio::test(start_paused = true)]
    async fn test_activate_with_sound_speaks_and_reveals() {
        let (reveal_tx, mut reveal_rx) = mpsc::unbounded_channel();
        let (speech_tx, mut speech_rx) = mpsc::unbounded_channel();
        let speaker = Speaker::new(Arc::new(TimedUtterancePlayer::default()), speech_tx);
        let (mut coordinator, message) = setup("hola");

        let activation =
            coordinator.activate(false, Some(&speaker), Duration::from_millis(400), &reveal_tx);
        assert_eq!(activation, Activation::Started { speaking: true });
        assert_eq!(coordinator.phase(), RevealPhase::Revealing);
        assert_eq!(speech_rx.try_recv().unwrap(), UtteranceEvent::Started(message.id.clone()));

        while let Some(event) = reveal_rx.recv().await {
            coordinator.on_event(&event);
            if coordinator.phase() == RevealPhase::Complete {
                break;
            }
        }
        assert_eq!(coordinator.displayed_text(), "hola");
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_activation_does_not_reschedule() {
        let (reveal_tx, mut reveal_rx) = mpsc::unbounded_channel();
        let (mut coordinator, _) = setup("ab");

        coordinator.activate(false, None, Duration::from_millis(200), &reveal_tx);
        assert_eq!(
            coordinator.activate(false, None, Duration::from_millis(200), &reveal_tx),
            Activation::AlreadyActive
        );

        tokio::time::sleep(Duration::from_secs(1)).await;
        let mut progress = 0;
        while let Ok(event) = reveal_rx.try_recv() {
            if matches!(event, RevealEvent::Progress { .. }) {
                progress += 1;
            }
        }
        assert_eq!(progress, 2);
    }

    #[test]
    fn test_written_message_shows_full_text() {
        let (reveal_tx, mut reveal_rx) = mpsc::unbounded_channel();
        let (mut coordinator, _) = setup("listo");

        let activation = coordinator.activate(true, None, Duration::from_millis(200), &reveal_tx);
        assert_eq!(activation, Activation::AlreadyWritten);
        assert_eq!(coordinator.phase(), RevealPhase::Complete);
        assert_eq!(coordinator.displayed_text(), "listo");
        assert!(reveal_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_force_complete_cancels_timer() {
        let (reveal_tx, mut reveal_rx) = mpsc::unbounded_channel();
        let (mut coordinator, _) = setup("abcd");

        coordinator.activate(false, None, Duration::from_millis(400), &reveal_tx);
        let first = reveal_rx.recv().await.unwrap();
        assert!(coordinator.on_event(&first));
        assert_eq!(coordinator.displayed_text(), "a");

        assert!(coordinator.force_complete());
        assert!(!coordinator.force_complete());
        assert_eq!(coordinator.displayed_text(), "abcd");

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(reveal_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_slices_on_char_boundaries() {
        let (reveal_tx, _reveal_rx) = mpsc::unbounded_channel();
        let (mut coordinator, message) = setup("¿Sí?");
        coordinator.activate(false, None, Duration::from_millis(400), &reveal_tx);

        let mut shown_texts = Vec::new();
        for shown in 1..=4 {
            coordinator.on_event(&RevealEvent::Progress {
                message_id: message.id.clone(),
                shown,
            });
            shown_texts.push(coordinator.displayed_text().to_string());
        }
        assert_eq!(shown_texts, vec!["¿", "¿S", "¿Sí", "¿Sí?"]);
    }

    #[test]
    fn test_foreign_events_are_ignored() {
        let (mut coordinator, _) = setup("abc");
        let foreign = RevealEvent::Complete {
            message_id: MessageId::new(),
        };
        assert!(!coordinator.on_event(&foreign));
        assert_eq!(coordinator.phase(), RevealPhase::Idle);
    }
}
