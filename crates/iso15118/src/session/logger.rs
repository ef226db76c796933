//! Session scoped logging

use tracing::{debug, info, info_span, warn, Span};

use crate::message::{MessageType, SessionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    FromEv,
    ToEv,
}

/// Structured log sink carrying the session id on every line
#[derive(Debug, Clone)]
pub struct SessionLogger {
    span: Span,
}

impl SessionLogger {
    pub fn new(session_id: &SessionId) -> Self {
        Self {
            span: info_span!("d20_session", session_id = %hex::encode_upper(session_id)),
        }
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn enter_state(&self, state: &str) {
        info!(parent: &self.span, state, "Entered state");
    }

    pub fn exi(&self, direction: Direction, msg_type: MessageType, size: usize) {
        debug!(parent: &self.span, ?direction, %msg_type, size, "V2G message");
    }

    pub fn log(&self, message: &str) {
        info!(parent: &self.span, "{}", message);
    }

    pub fn warn(&self, message: &str) {
        warn!(parent: &self.span, "{}", message);
    }
}
