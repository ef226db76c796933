//! Session controller
//!
//! Turns the three wake-up sources of a session (a request installed in the
//! [`MessageExchange`], a control event, an expired deadline) into FSM
//! events and escalates whatever the active state leaves unhandled:
//!
//! - unhandled request: answered with `FAILED_SequenceError`, then `Failed`
//! - unhandled control event: logged and dropped
//! - unhandled state timeout or sequence timeout: `Failed`
//!
//! The controller is single threaded. The transport task drives it, see
//! [`crate::io::serve_session`].

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use super::config::SessionConfig;
use super::context::{Context, TimerRequest};
use super::control_event::{ControlEvent, ControlEventQueue};
use super::fsm::Fsm;
use super::message_exchange::{ExchangeError, MessageExchange};
use super::state::{Event, StateId, SupportedAppProtocol};
use crate::message::{Request, Response, ResponseCode, SessionId};
use crate::session::{Callbacks, Direction};

/// Why the controller woke up
#[derive(Debug, Clone, PartialEq)]
pub enum Wake {
    ControlEvent(ControlEvent),
    /// The state timer expired
    StateTimeout,
    /// No request within the sequence timeout
    SequenceTimeout,
    /// Every control event producer is gone
    QueueClosed,
}

pub struct SessionController {
    ctx: Context,
    fsm: Fsm,
    control_events: ControlEventQueue,
    queue_open: bool,
    state_deadline: Option<Instant>,
    sequence_deadline: Instant,
    sequence_timeout: Duration,
    last_error: Option<ExchangeError>,
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("session_id", &self.ctx.session.id_hex())
            .field("state", &self.fsm.state_id())
            .field("session_stopped", &self.ctx.session_stopped)
            .finish_non_exhaustive()
    }
}

impl SessionController {
    /// Start a new session in SupportedAppProtocol
    pub fn new(
        message_exchange: Arc<MessageExchange>,
        session_config: Arc<SessionConfig>,
        callbacks: Callbacks,
        control_events: ControlEventQueue,
    ) -> Self {
        let sequence_timeout = Duration::from_millis(session_config.timeouts.sequence_timeout_ms);
        let mut ctx = Context::new(message_exchange, session_config, callbacks);
        let fsm = Fsm::new(SupportedAppProtocol.into(), &mut ctx);

        let mut controller = Self {
            ctx,
            fsm,
            control_events,
            queue_open: true,
            state_deadline: None,
            sequence_deadline: Instant::now() + sequence_timeout,
            sequence_timeout,
            last_error: None,
        };
        controller.after_feed();
        controller
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn session_id(&self) -> SessionId {
        self.ctx.session.id()
    }

    pub fn state_id(&self) -> StateId {
        self.fsm.state_id()
    }

    pub fn is_stopped(&self) -> bool {
        self.ctx.session_stopped
    }

    pub fn message_exchange(&self) -> &Arc<MessageExchange> {
        self.ctx.message_exchange()
    }

    /// First error raised while composing a response, if any
    pub fn take_error(&mut self) -> Option<ExchangeError> {
        self.last_error.take()
    }

    /// Install a decoded request and feed it to the active state
    pub fn handle_request(&mut self, request: Request, payload_size: usize) -> Result<(), ExchangeError> {
        let msg_type = request.message_type();
        self.ctx.log.exi(Direction::FromEv, msg_type, payload_size);
        self.ctx.feedback.v2g_message(msg_type);

        self.ctx.message_exchange().set_request(request)?;
        self.sequence_deadline = Instant::now() + self.sequence_timeout;
        self.feed_request();
        Ok(())
    }

    /// Feed the request already installed in the message exchange
    pub fn feed_request(&mut self) {
        if self.ctx.session_stopped {
            return;
        }

        if self.fsm.feed(&mut self.ctx, Event::V2gtpMessage) {
            self.after_feed();
            return;
        }

        // Nobody took the request: sequence error
        let request = self.ctx.pull_request();
        if let Some(request) = request {
            let msg_type = request.message_type();
            warn!(
                parent: self.ctx.log.span(),
                state = %self.fsm.state_id(),
                %msg_type,
                "Unexpected request"
            );
            let header = self.ctx.response_header();
            if let Some(res) = Response::with_code(msg_type, header, ResponseCode::FailedSequenceError) {
                self.ctx.respond(res);
            }
        }
        self.fsm.feed(&mut self.ctx, Event::Failed);
        self.after_feed();
    }

    /// Deliver one control event to the active state
    pub fn feed_control_event(&mut self, event: ControlEvent) {
        if self.ctx.session_stopped {
            debug!(parent: self.ctx.log.span(), event = event.name(), "Session stopped, dropping control event");
            return;
        }

        let name = event.name();
        self.ctx.set_control_event(Some(event));
        let handled = self.fsm.feed(&mut self.ctx, Event::ControlMessage);
        self.ctx.set_control_event(None);

        if !handled {
            debug!(
                parent: self.ctx.log.span(),
                event = name,
                state = %self.fsm.state_id(),
                "Control event not applicable, dropped"
            );
        }
        self.after_feed();
    }

    /// Pop and deliver at most one queued control event
    pub fn poll_control_event(&mut self) -> bool {
        match self.control_events.pop() {
            Some(event) => {
                self.feed_control_event(event);
                true
            }
            None => false,
        }
    }

    /// Feed the state timer expiry
    pub fn feed_timeout(&mut self) {
        self.state_deadline = None;
        if self.ctx.session_stopped {
            return;
        }

        if !self.fsm.feed(&mut self.ctx, Event::Timeout) {
            warn!(parent: self.ctx.log.span(), state = %self.fsm.state_id(), "State timeout");
            self.fsm.feed(&mut self.ctx, Event::Failed);
        }
        self.after_feed();
    }

    /// No request arrived within the sequence timeout
    pub fn feed_sequence_timeout(&mut self) {
        if self.ctx.session_stopped {
            return;
        }
        warn!(
            parent: self.ctx.log.span(),
            state = %self.fsm.state_id(),
            timeout_ms = self.sequence_timeout.as_millis() as u64,
            "Sequence timeout"
        );
        self.fsm.feed(&mut self.ctx, Event::Failed);
        self.after_feed();
    }

    /// Earliest pending deadline
    pub fn next_deadline(&self) -> Instant {
        match self.state_deadline {
            Some(deadline) => deadline.min(self.sequence_deadline),
            None => self.sequence_deadline,
        }
    }

    /// Wait for a control event or an expired deadline
    ///
    /// Cancel safe; the transport selects on it together with the socket.
    pub async fn wait(&mut self) -> Wake {
        let state_deadline = self.state_deadline;
        let sequence_deadline = self.sequence_deadline;
        let queue_open = self.queue_open;

        tokio::select! {
            event = self.control_events.recv(), if queue_open => match event {
                Some(event) => Wake::ControlEvent(event),
                None => Wake::QueueClosed,
            },
            _ = tokio::time::sleep_until(state_deadline.unwrap_or(sequence_deadline)), if state_deadline.is_some() => {
                Wake::StateTimeout
            }
            _ = tokio::time::sleep_until(sequence_deadline) => Wake::SequenceTimeout,
        }
    }

    pub fn handle(&mut self, wake: Wake) {
        match wake {
            Wake::ControlEvent(event) => self.feed_control_event(event),
            Wake::StateTimeout => self.feed_timeout(),
            Wake::SequenceTimeout => self.feed_sequence_timeout(),
            Wake::QueueClosed => {
                debug!(parent: self.ctx.log.span(), "Control event queue closed");
                self.queue_open = false;
            }
        }
    }

    /// Apply the timer request and collect response errors of the last feed
    fn after_feed(&mut self) {
        match self.ctx.take_timer_request() {
            Some(TimerRequest::Arm(timeout)) => self.state_deadline = Some(Instant::now() + timeout),
            Some(TimerRequest::Cancel) => self.state_deadline = None,
            None => {}
        }

        if let Some(e) = self.ctx.take_respond_error() {
            warn!(parent: self.ctx.log.span(), error = %e, "Failed to compose response");
            self.last_error.get_or_insert(e);
        }
    }
}
