//! State context
//!
//! Everything a state may touch while handling one event: the session, the
//! message exchange, the control event being delivered, configuration,
//! feedback and logging.

use std::sync::Arc;
use std::time::Duration;

use super::config::{DcTransferLimits, SessionConfig};
use super::control_event::{ControlEvent, ControlEventKind, UpdateDynamicModeParameters};
use super::message_exchange::{ExchangeError, MessageExchange};
use super::session::Session;
use crate::message::{Header, MessageType, Request, Response};
use crate::session::feedback::{Callbacks, EvInformation, Feedback};
use crate::session::{Direction, SessionLogger};

/// Timer command issued by a state, applied by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerRequest {
    Arm(Duration),
    Cancel,
}

#[derive(Debug)]
pub struct Context {
    pub session: Session,
    pub session_config: Arc<SessionConfig>,
    pub feedback: Feedback,
    pub log: SessionLogger,

    /// Once set, the controller stops feeding events
    pub session_stopped: bool,

    /// EVSE limits, initialised from the config and updated at runtime
    pub dc_limits: DcTransferLimits,
    pub dynamic_mode_parameters: Option<UpdateDynamicModeParameters>,
    pub ev_information: EvInformation,

    message_exchange: Arc<MessageExchange>,
    current_control_event: Option<ControlEvent>,
    timer_request: Option<TimerRequest>,
    respond_error: Option<ExchangeError>,
}

impl Context {
    pub fn new(
        message_exchange: Arc<MessageExchange>,
        session_config: Arc<SessionConfig>,
        callbacks: Callbacks,
    ) -> Self {
        let session = Session::new();
        let log = SessionLogger::new(&session.id());
        Self {
            dc_limits: session_config.dc_limits,
            session,
            session_config,
            feedback: Feedback::new(callbacks),
            log,
            session_stopped: false,
            dynamic_mode_parameters: None,
            ev_information: EvInformation::default(),
            message_exchange,
            current_control_event: None,
            timer_request: None,
            respond_error: None,
        }
    }

    pub fn message_exchange(&self) -> &Arc<MessageExchange> {
        &self.message_exchange
    }

    pub fn pull_request(&self) -> Option<Request> {
        self.message_exchange.pull_request()
    }

    pub fn peek_request_type(&self) -> Option<MessageType> {
        self.message_exchange.peek_request_type()
    }

    /// Hand a composed response to the transport.
    ///
    /// The response code is reported through feedback; a `FAILED*` code
    /// stops the session.
    pub fn respond<M: Into<Response>>(&mut self, msg: M) {
        let response = msg.into();
        let msg_type = response.message_type();
        let code = response.response_code();

        match self.message_exchange.set_response(response) {
            Ok(pending) => self.log.exi(Direction::ToEv, msg_type, pending.size),
            Err(e) => {
                self.log.warn(&format!("Failed to set {} response: {}", msg_type, e));
                self.respond_error = Some(e);
                self.session_stopped = true;
            }
        }

        if let Some(code) = code {
            self.feedback.response_code(code);
            if code.is_failed() {
                self.session_stopped = true;
            }
        }
    }

    /// Typed access to the control event being delivered
    pub fn get_control_event<T: ControlEventKind>(&self) -> Option<&T> {
        self.current_control_event.as_ref().and_then(T::from_event)
    }

    pub(crate) fn set_control_event(&mut self, event: Option<ControlEvent>) {
        self.current_control_event = event;
    }

    /// Arm the state timer; the controller feeds `Timeout` when it expires
    pub fn arm_timer(&mut self, timeout: Duration) {
        self.timer_request = Some(TimerRequest::Arm(timeout));
    }

    pub fn cancel_timer(&mut self) {
        self.timer_request = Some(TimerRequest::Cancel);
    }

    pub(crate) fn take_timer_request(&mut self) -> Option<TimerRequest> {
        self.timer_request.take()
    }

    pub(crate) fn take_respond_error(&mut self) -> Option<ExchangeError> {
        self.respond_error.take()
    }

    /// Header for an outgoing message of this session
    pub fn response_header(&self) -> Header {
        Header {
            session_id: self.session.id(),
            timestamp: now(),
        }
    }
}

/// Seconds since epoch
pub fn now() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::d20::control_event::{CableCheckFinished, StopCharging};
    use crate::message::{ResponseCode, SessionStopResponse};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_failed_response_stops_session() {
        let mut ctx = context();
        ctx.respond(SessionStopResponse {
            header: ctx.response_header(),
            response_code: ResponseCode::FailedSequenceError,
        });

        assert!(ctx.session_stopped);
        let res = take_response(&ctx).unwrap();
        assert_eq!(res.response_code(), Some(ResponseCode::FailedSequenceError));
    }

    #[test]
    fn test_ok_response_keeps_session() {
        let mut ctx = context();
        ctx.respond(SessionStopResponse::default());
        assert!(!ctx.session_stopped);
        assert!(ctx.take_respond_error().is_none());
    }

    #[test]
    fn test_second_response_is_an_error() {
        let mut ctx = context();
        ctx.respond(SessionStopResponse::default());
        ctx.respond(SessionStopResponse::default());

        assert!(ctx.session_stopped);
        assert!(matches!(
            ctx.take_respond_error(),
            Some(ExchangeError::ResponseAlreadyPending)
        ));
    }

    #[test]
    fn test_typed_control_event_access() {
        let mut ctx = context();
        assert!(ctx.get_control_event::<CableCheckFinished>().is_none());

        ctx.set_control_event(Some(CableCheckFinished(true).into()));
        assert_eq!(
            ctx.get_control_event::<CableCheckFinished>(),
            Some(&CableCheckFinished(true))
        );
        assert!(ctx.get_control_event::<StopCharging>().is_none());

        ctx.set_control_event(None);
        assert!(ctx.get_control_event::<CableCheckFinished>().is_none());
    }

    #[test]
    fn test_response_header_carries_session_id() {
        let ctx = context();
        let header = ctx.response_header();
        assert_eq!(header.session_id, ctx.session.id());
        assert!(header.timestamp > 0);
    }
}
