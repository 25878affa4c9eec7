//! Reveal Animation - Timer-Driven Message Disclosure
//!
//! Bot replies in the avatar view are "typed out" one character at a time
//! while the avatar reads them aloud. This module holds the pieces:
//!
//! - [`ScheduledTask`]: cancellable timers whose side effects cannot fire
//!   after `cancel()` returns
//! - [`RevealAnimator`]: one reveal, evenly spread over a fixed duration
//! - [`RevealCoordinator`]: starts speech and reveal together for one
//!   message and tracks `Idle → Revealing → Complete`
//!
//! # Architecture
//!
//! ```text
//! Conductor
//!     │ activate / force_complete
//!     ▼
//! RevealCoordinator ──say──▶ Speaker (utterance events ─┐)
//!     │                                                 │
//!     └─start──▶ RevealAnimator ── RevealEvent ─────────┴─▶ Conductor
//! ```
//!
//! Surfaces never run timers themselves; they render the `RevealProgress`
//! messages they receive.

mod coordinator;
mod reveal;
mod timing;

pub use coordinator::{Activation, RevealCoordinator, RevealPhase};
pub use reveal::{per_char_delay, RevealAnimator, RevealEvent, DEFAULT_REVEAL_DURATION};
pub use timing::{ScheduledTask, TaskGuard};
