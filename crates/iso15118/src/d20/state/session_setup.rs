use super::{pull_expected, AuthorizationSetup, Event, StateHandler, StateId, StateResult};
use crate::d20::context::now;
use crate::d20::{Context, Session};
use crate::message::{
    Header, MessageType, Request, ResponseCode, SessionSetupRequest, SessionSetupResponse,
};

pub fn handle_request(req: &SessionSetupRequest, session: &Session, evse_id: &str) -> SessionSetupResponse {
    let response_code = if req.header.session_id == session.id() {
        ResponseCode::OkOldSessionJoined
    } else {
        ResponseCode::OkNewSessionEstablished
    };

    SessionSetupResponse {
        header: Header {
            session_id: session.id(),
            timestamp: now(),
        },
        response_code,
        evseid: evse_id.to_string(),
    }
}

#[derive(Debug, Default)]
pub struct SessionSetup;

impl StateHandler for SessionSetup {
    const ID: StateId = StateId::SessionSetup;

    fn feed(&mut self, ctx: &mut Context, ev: Event) -> StateResult {
        if ev != Event::V2gtpMessage {
            return StateResult::unhandled();
        }

        let Some(Request::SessionSetup(req)) = pull_expected(ctx, &[MessageType::SessionSetupReq]) else {
            return StateResult::unhandled();
        };

        ctx.feedback.evcc_id(&req.evccid);
        ctx.ev_information.evcc_id = req.evccid.clone();

        let res = handle_request(&req, &ctx.session, &ctx.session_config.evse_id);
        ctx.respond(res);

        StateResult::transition(AuthorizationSetup::default())
    }
}
