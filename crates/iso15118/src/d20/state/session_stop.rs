use super::{validate_and_setup_header, Event, StateHandler, StateId, StateResult};
use crate::d20::{Context, Session};
use crate::message::{
    response_with_code, ChargingSession, Request, Response, ResponseCode, SessionStopRequest,
    SessionStopResponse,
};
use crate::session::Signal;

pub fn handle_request(req: &SessionStopRequest, session: &Session) -> SessionStopResponse {
    let mut res = SessionStopResponse::default();

    if !validate_and_setup_header(&mut res.header, session, &req.header) {
        return response_with_code(res, ResponseCode::FailedUnknownSession);
    }

    if req.charging_session == ChargingSession::ServiceRenegotiation
        && !session.service_renegotiation_supported
    {
        return response_with_code(res, ResponseCode::FailedNoServiceRenegotiationSupported);
    }

    response_with_code(res, ResponseCode::Ok)
}

/// Terminal state; every request is answered and the session stays stopped
#[derive(Debug, Default)]
pub struct SessionStop;

impl StateHandler for SessionStop {
    const ID: StateId = StateId::SessionStop;

    fn feed(&mut self, ctx: &mut Context, ev: Event) -> StateResult {
        if ev != Event::V2gtpMessage {
            return StateResult::unhandled();
        }

        let Some(request) = ctx.pull_request() else {
            return StateResult::unhandled();
        };
        ctx.session_stopped = true;

        match request {
            Request::SessionStop(req) => {
                let res = handle_request(&req, &ctx.session);
                let code = res.response_code;
                ctx.respond(res);

                if code == ResponseCode::Ok {
                    match req.charging_session {
                        ChargingSession::Pause => ctx.feedback.signal(Signal::DlinkPause),
                        ChargingSession::Terminate | ChargingSession::ServiceRenegotiation => {
                            ctx.feedback.signal(Signal::DlinkTerminate)
                        }
                    }
                }
            }
            other => {
                let msg_type = other.message_type();
                ctx.log.warn(&format!("Received {} after the session was stopped", msg_type));
                let header = ctx.response_header();
                if let Some(res) = Response::with_code(msg_type, header, ResponseCode::Failed) {
                    ctx.respond(res);
                }
            }
        }

        StateResult::handled()
    }
}
