//! Session state machine
//!
//! One dictation attempt is a session: Idle → Recording → Processing →
//! Delivering → Idle. Cancel and failure collapse the machine back to
//! Idle; the outcome is reported separately so the control loop can
//! notify without holding terminal states.
//!
//! The state is the single source of truth for what the daemon is doing.
//! Every transition happens in the control loop; background tasks never
//! mutate it directly.

use crate::audio::AudioBuffer;
use crate::mode::{Language, ModeSnapshot};
use std::time::Instant;

/// A single dictation attempt
#[derive(Debug)]
pub struct Session {
    /// Monotonic identifier, unique for the lifetime of the daemon
    pub id: u64,
    /// Mode and model settings frozen at session start.
    /// Config changes mid-session do not affect this session.
    pub snapshot: ModeSnapshot,
    /// Captured audio, owned exclusively by this session
    pub buffer: AudioBuffer,
    /// When recording started
    pub started_at: Instant,
}

impl Session {
    /// Create a session with a fresh buffer sized from the snapshot
    pub fn new(id: u64, snapshot: ModeSnapshot, max_duration_secs: u32) -> Self {
        let buffer = AudioBuffer::new(snapshot.sample_rate, max_duration_secs);
        Self {
            id,
            snapshot,
            buffer,
            started_at: Instant::now(),
        }
    }

    /// True once the buffer holds enough audio to be worth processing
    pub fn has_enough_audio(&self) -> bool {
        self.buffer.len() >= self.snapshot.min_samples
    }
}

/// Daemon state
#[derive(Debug)]
pub enum SessionState {
    /// Waiting for hotkey press
    Idle,

    /// Hotkey engaged, capturing audio into the session buffer
    Recording(Session),

    /// Buffer handed to the gateways; a background task owns the work
    Processing {
        /// Session being processed
        id: u64,
        /// When processing started
        started_at: Instant,
    },

    /// Gateway output in hand, handing text to the delivery sink
    Delivering {
        /// Session being delivered
        id: u64,
    },
}

/// How a session ended, for logging and notification
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    /// Text reached the clipboard
    Delivered { language: Language },
    /// User cancelled; nothing was delivered
    Cancelled,
    /// Too short or silent; quietly discarded
    Discarded,
    /// A gateway or delivery step failed
    Failed { reason: String },
}

impl SessionState {
    /// Create a new idle state
    pub fn new() -> Self {
        SessionState::Idle
    }

    /// Check if in idle state
    pub fn is_idle(&self) -> bool {
        matches!(self, SessionState::Idle)
    }

    /// Check if in recording state
    pub fn is_recording(&self) -> bool {
        matches!(self, SessionState::Recording(_))
    }

    /// Check if in processing state
    pub fn is_processing(&self) -> bool {
        matches!(self, SessionState::Processing { .. })
    }

    /// Id of the session currently in flight, if any
    pub fn session_id(&self) -> Option<u64> {
        match self {
            SessionState::Idle => None,
            SessionState::Recording(session) => Some(session.id),
            SessionState::Processing { id, .. } => Some(*id),
            SessionState::Delivering { id } => Some(*id),
        }
    }

    /// Get recording duration if currently recording
    pub fn recording_duration(&self) -> Option<std::time::Duration> {
        match self {
            SessionState::Recording(session) => Some(session.started_at.elapsed()),
            _ => None,
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "Idle"),
            SessionState::Recording(session) => {
                write!(
                    f,
                    "Recording #{} ({:.1}s)",
                    session.id,
                    session.started_at.elapsed().as_secs_f32()
                )
            }
            SessionState::Processing { id, started_at } => {
                write!(
                    f,
                    "Processing #{} ({:.1}s)",
                    id,
                    started_at.elapsed().as_secs_f32()
                )
            }
            SessionState::Delivering { id } => write!(f, "Delivering #{}", id),
        }
    }
}
