//! Structured session events.
//!
//! Each session component is handed an [`EventSink`] at construction time
//! and reports what it does through it. The default [`LogSink`] forwards to
//! the `log` facade; tests and outer runners can supply their own sink to
//! capture a per-device transcript.

use std::sync::{Arc, Mutex};

use log::{debug, info, warn};

use crate::channel::ErrorKind;
use crate::driver::SessionState;

/// Something that happened on a device session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A command line was written to the transport.
    CommandSent { command: String },

    /// A scripted answer was sent in reply to a secondary prompt.
    /// The answer itself is never recorded.
    AnswerSent { prompt: String },

    /// Output ended in a settled prompt.
    PromptSettled { prompt: String },

    /// The device flagged a command as failed.
    CommandFailed {
        command: String,
        kind: ErrorKind,
        message: String,
    },

    /// A transaction line was recorded as control and not dispatched.
    CommandSkipped { command: String },

    /// The session moved between privilege states.
    StateChanged {
        from: SessionState,
        to: SessionState,
    },
}

/// Receiver for session events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: SessionEvent);
}

/// Forwards events to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: SessionEvent) {
        match event {
            SessionEvent::CommandSent { command } => debug!("sent: {:?}", command),
            SessionEvent::AnswerSent { prompt } => debug!("answered prompt {:?}", prompt),
            SessionEvent::PromptSettled { prompt } => debug!("prompt: {:?}", prompt),
            SessionEvent::CommandFailed {
                command,
                kind,
                message,
            } => warn!("command {:?} failed ({}): {}", command, kind, message),
            SessionEvent::CommandSkipped { command } => debug!("skipped: {:?}", command),
            SessionEvent::StateChanged { from, to } => info!("state: {} -> {}", from, to),
        }
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: SessionEvent) {}
}

/// Keeps every event in memory, in order.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<SessionEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events recorded so far.
    pub fn events(&self) -> Vec<SessionEvent> {
        self.events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: SessionEvent) {
        self.events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(event);
    }
}
