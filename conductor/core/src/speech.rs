//! Utterance Playback
//!
//! Text-to-speech is a single shared output channel. [`Speaker`] is the one
//! command point over it: every `say` stops whatever is playing before
//! starting the new utterance, so at most one message is ever spoken.
//!
//! Players report their lifecycle as [`UtteranceEvent`]s on the channel
//! handed to [`UtterancePlayer::speak`]. A platform engine would forward its
//! native callbacks there; [`TimedUtterancePlayer`] simulates playback with a
//! timer for headless surfaces and tests.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::animation::ScheduledTask;
use crate::messages::MessageId;

/// Default simulated speaking rate
pub const DEFAULT_MS_PER_CHAR: u64 = 60;

/// Shortest simulated utterance
pub const MIN_UTTERANCE: Duration = Duration::from_millis(400);

/// One text-to-speech request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Utterance {
    /// Message being read
    pub message_id: MessageId,
    /// Full text to read
    pub text: String,
}

/// Player lifecycle callbacks
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UtteranceEvent {
    /// Audio started
    Started(MessageId),
    /// Audio finished on its own
    Done(MessageId),
    /// Audio was interrupted
    Stopped(MessageId),
}

impl UtteranceEvent {
    /// Message the event belongs to
    pub fn message_id(&self) -> &MessageId {
        match self {
            Self::Started(id) | Self::Done(id) | Self::Stopped(id) => id,
        }
    }
}

/// Where players deliver lifecycle callbacks
pub type UtteranceSink = mpsc::UnboundedSender<UtteranceEvent>;

/// Text-to-speech engine
///
/// Implementations must report `Stopped` at most once per actual stop;
/// `stop` on an idle player does nothing.
pub trait UtterancePlayer: Send + Sync {
    /// Engine name for logging
    fn name(&self) -> &str;

    /// Start reading `utterance`
    fn speak(&self, utterance: Utterance, events: UtteranceSink);

    /// Stop the current utterance, if any
    fn stop(&self);
}

/// The single command point over the audio output
#[derive(Clone)]
pub struct Speaker {
    player: Arc<dyn UtterancePlayer>,
    events: UtteranceSink,
}

impl std::fmt::Debug for Speaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Speaker")
            .field("player", &self.player.name())
            .finish()
    }
}

impl Speaker {
    /// Wrap `player`, delivering callbacks to `events`
    pub fn new(player: Arc<dyn UtterancePlayer>, events: UtteranceSink) -> Self {
        Self { player, events }
    }

    /// Read a message aloud, preempting anything already playing
    pub fn say(&self, message_id: &MessageId, text: &str) {
        tracing::debug!(player = self.player.name(), message = %message_id, "Speaking");
        self.player.stop();
        self.player.speak(
            Utterance {
                message_id: message_id.clone(),
                text: text.to_string(),
            },
            self.events.clone(),
        );
    }

    /// Stop any playback
    pub fn silence(&self) {
        self.player.stop();
    }
}

struct ActiveUtterance {
    message_id: MessageId,
    events: UtteranceSink,
    task: ScheduledTask,
}

/// Headless player that "speaks" for a duration proportional to the text
pub struct TimedUtterancePlayer {
    ms_per_char: u64,
    min_duration: Duration,
    active: Mutex<Option<ActiveUtterance>>,
}

impl Default for TimedUtterancePlayer {
    fn default() -> Self {
        Self::new(DEFAULT_MS_PER_CHAR)
    }
}

impl TimedUtterancePlayer {
    /// Create a player speaking at `ms_per_char`
    pub fn new(ms_per_char: u64) -> Self {
        Self {
            ms_per_char,
            min_duration: MIN_UTTERANCE,
            active: Mutex::new(None),
        }
    }

    /// Override the minimum utterance length
    #[must_use]
    pub fn with_min_duration(mut self, min: Duration) -> Self {
        self.min_duration = min;
        self
    }

    /// Simulated length of `text`
    pub fn duration_for(&self, text: &str) -> Duration {
        let chars = text.chars().count() as u64;
        Duration::from_millis(chars.saturating_mul(self.ms_per_char)).max(self.min_duration)
    }

    fn interrupt(active: &mut Option<ActiveUtterance>) {
        if let Some(mut current) = active.take() {
            if current.task.cancel() {
                tracing::debug!(message = %current.message_id, "Utterance stopped");
                let _ = current.events.send(UtteranceEvent::Stopped(current.message_id));
            }
        }
    }
}

impl UtterancePlayer for TimedUtterancePlayer {
    fn name(&self) -> &str {
        "timed"
    }

    fn speak(&self, utterance: Utterance, events: UtteranceSink) {
        let mut active = self.active.lock();
        Self::interrupt(&mut active);

        let length = self.duration_for(&utterance.text);
        let id = utterance.message_id.clone();
        let _ = events.send(UtteranceEvent::Started(id.clone()));

        let done_events = events.clone();
        let done_id = id.clone();
        let task = ScheduledTask::spawn(move |guard| async move {
            tokio::time::sleep(length).await;
            guard.finish(|| done_events.send(UtteranceEvent::Done(done_id)));
        });

        *active = Some(ActiveUtterance {
            message_id: id,
            events,
            task,
        });
    }

    fn stop(&self) {
        Self::interrupt(&mut self.active.lock());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn drain(rx: &mut mpsc::UnboundedReceiver<UtteranceEvent>) -> Vec<UtteranceEvent> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            out.push(event);
        }
        out
    }

    #[test]
    fn test_duration_has_floor() {
        let player = TimedUtterancePlayer::new(60);
        assert_eq!(player.duration_for("hi"), MIN_UTTERANCE);
        assert_eq!(player.duration_for(&"a".repeat(100)), Duration::from_millis(6000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_utterance_runs_to_done() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let player = TimedUtterancePlayer::new(60);
        let id = MessageId::new();

        player.speak(
            Utterance {
                message_id: id.clone(),
                text: "Hola".to_string(),
            },
            tx,
        );

        assert_eq!(rx.recv().await, Some(UtteranceEvent::Started(id.clone())));
        assert_eq!(rx.recv().await, Some(UtteranceEvent::Done(id)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_idempotent() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let player = TimedUtterancePlayer::default();
        player.stop();

        let id = MessageId::new();
        player.speak(
            Utterance {
                message_id: id.clone(),
                text: "Hola".to_string(),
            },
            tx,
        );
        player.stop();
        player.stop();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(
            drain(&mut rx),
            vec![UtteranceEvent::Started(id.clone()), UtteranceEvent::Stopped(id)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_speaks_stop_first_before_second_starts() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let speaker = Speaker::new(Arc::new(TimedUtterancePlayer::default()), tx);
        let first = MessageId::new();
        let second = MessageId::new();

        speaker.say(&first, "primero");
        speaker.say(&second, "segundo");

        assert_eq!(
            drain(&mut rx),
            vec![
                UtteranceEvent::Started(first.clone()),
                UtteranceEvent::Stopped(first),
                UtteranceEvent::Started(second.clone()),
            ]
        );

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(drain(&mut rx), vec![UtteranceEvent::Done(second)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_after_done_emits_nothing() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let speaker = Speaker::new(Arc::new(TimedUtterancePlayer::default()), tx);
        let id = MessageId::new();

        speaker.say(&id, "hola");
        tokio::time::sleep(Duration::from_secs(1)).await;
        speaker.silence();

        assert_eq!(
            drain(&mut rx),
            vec![UtteranceEvent::Started(id.clone()), UtteranceEvent::Done(id)]
        );
    }
}
