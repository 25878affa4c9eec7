//! Reveal Animator
//!
//! Reveals a message character by character over a fixed total duration.
//! Each increment is emitted as a [`RevealEvent::Progress`] carrying the
//! number of characters shown so far; a final [`RevealEvent::Complete`] follows the last
//! character. Increments are scheduled against absolute deadlines so the
//! whole reveal takes `total` regardless of wake-up jitter.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

use super::timing::ScheduledTask;
use crate::messages::MessageId;

/// Default total reveal duration
pub const DEFAULT_REVEAL_DURATION: Duration = Duration::from_millis(3000);

/// Reveal output
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RevealEvent {
    /// One more character is visible
    Progress {
        /// Message being revealed
        message_id: MessageId,
        /// Characters revealed so far
        shown: usize,
    },
    /// The whole text is visible
    Complete {
        /// Message that finished
        message_id: MessageId,
    },
}

impl RevealEvent {
    /// Message this event belongs to
    pub fn message_id(&self) -> &MessageId {
        match self {
            Self::Progress { message_id, .. } | Self::Complete { message_id } => message_id,
        }
    }
}

/// Delay between two increments
#[must_use]
pub fn per_char_delay(total: Duration, chars: usize) -> Duration {
    if chars == 0 {
        return Duration::ZERO;
    }
    total / u32::try_from(chars).unwrap_or(u32::MAX)
}

/// A running reveal
#[derive(Debug)]
pub struct RevealAnimator {
    message_id: MessageId,
    total_chars: usize,
    task: ScheduledTask,
}

impl RevealAnimator {
    /// Start revealing `text`.
    ///
    /// Empty text completes immediately: `Complete` is sent before this
    /// returns and nothing is scheduled.
    pub fn start(
        message_id: MessageId,
        text: &str,
        total: Duration,
        events: mpsc::UnboundedSender<RevealEvent>,
    ) -> Self {
        let total_chars = text.chars().count();

        if total_chars == 0 {
            let _ = events.send(RevealEvent::Complete {
                message_id: message_id.clone(),
            });
            return Self {
                message_id,
                total_chars,
                task: ScheduledTask::completed(),
            };
        }

        let delay = per_char_delay(total, total_chars);
        let id = message_id.clone();

        tracing::trace!(message = %id, chars = total_chars, delay_ms = delay.as_millis() as u64, "Starting reveal");

        let task = ScheduledTask::spawn(move |guard| async move {
            let mut deadline = Instant::now();

            for shown in 1..=total_chars {
                deadline += delay;
                tokio::time::sleep_until(deadline).await;

                let sent = guard.run(|| {
                    events
                        .send(RevealEvent::Progress {
                            message_id: id.clone(),
                            shown,
                        })
                        .is_ok()
                });
                if sent != Some(true) {
                    return;
                }
            }

            guard.finish(|| events.send(RevealEvent::Complete { message_id: id }));
        });

        Self {
            message_id,
            total_chars,
            task,
        }
    }

    /// Stop revealing; already revealed text stays revealed.
    ///
    /// Returns `true` if the reveal was still running.
    pub fn cancel(&mut self) -> bool {
        self.task.cancel()
    }

    /// Whether increments may still arrive
    pub fn is_running(&self) -> bool {
        self.task.is_active()
    }

    /// Message being revealed
    pub fn message_id(&self) -> &MessageId {
        &self.message_id
    }

    /// Number of characters in the full text
    pub fn total_chars(&self) -> usize {
        self.total_chars
    }
}
