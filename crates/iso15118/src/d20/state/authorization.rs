use std::time::Duration;

use super::{
    pull_expected, validate_and_setup_header, Event, ServiceDiscovery, SessionStop, StateHandler,
    StateId, StateResult,
};
use crate::d20::control_event;
use crate::d20::{Context, Session};
use crate::message::{
    self, response_with_code, AuthorizationRequest, AuthorizationResponse, MessageType,
    Processing, Request, ResponseCode, GEN_CHALLENGE_LENGTH,
};
use crate::session::Signal;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthorizationStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

pub fn handle_request(
    req: &AuthorizationRequest,
    session: &Session,
    status: AuthorizationStatus,
    gen_challenge: Option<&[u8; GEN_CHALLENGE_LENGTH]>,
) -> AuthorizationResponse {
    let mut res = AuthorizationResponse::default();

    if !validate_and_setup_header(&mut res.header, session, &req.header) {
        return response_with_code(res, ResponseCode::FailedUnknownSession);
    }

    if !session
        .offered_services
        .auth_services
        .contains(&req.selected_authorization_service)
    {
        return response_with_code(res, ResponseCode::WarningAuthorizationSelectionInvalid);
    }

    if req.selected_authorization_service == message::Authorization::Pnc {
        let challenge_matches = match (&req.pnc_params, gen_challenge) {
            (Some(params), Some(expected)) => &params.gen_challenge == expected,
            _ => false,
        };
        if !challenge_matches {
            return response_with_code(res, ResponseCode::WarningChallengeInvalid);
        }
    }

    res.evse_processing = match status {
        AuthorizationStatus::Accepted => Processing::Finished,
        AuthorizationStatus::Pending | AuthorizationStatus::Rejected => Processing::Ongoing,
    };

    response_with_code(res, ResponseCode::Ok)
}

#[derive(Debug, Default)]
pub struct Authorization {
    status: AuthorizationStatus,
    gen_challenge: Option<[u8; GEN_CHALLENGE_LENGTH]>,
    auth_requested: bool,
    retries: u32,
}

impl Authorization {
    pub fn new(gen_challenge: Option<[u8; GEN_CHALLENGE_LENGTH]>) -> Self {
        Self {
            gen_challenge,
            ..Default::default()
        }
    }

    pub fn status(&self) -> AuthorizationStatus {
        self.status
    }

    fn request_authorization(&mut self, ctx: &mut Context) {
        ctx.feedback.signal(Signal::RequireAuthEim);
        self.auth_requested = true;
    }

    fn stop(ctx: &mut Context) -> StateResult {
        ctx.session_stopped = true;
        StateResult::transition(SessionStop::default())
    }
}

impl StateHandler for Authorization {
    const ID: StateId = StateId::Authorization;

    fn enter(&mut self, ctx: &mut Context) {
        ctx.log.enter_state(Self::ID.name());
        ctx.arm_timer(Duration::from_millis(ctx.session_config.timeouts.authorization_timeout_ms));
    }

    fn feed(&mut self, ctx: &mut Context, ev: Event) -> StateResult {
        match ev {
            Event::ControlMessage => {
                if let Some(control_event::AuthorizationResponse(authorized)) =
                    ctx.get_control_event::<control_event::AuthorizationResponse>().copied()
                {
                    if authorized {
                        self.status = AuthorizationStatus::Accepted;
                        ctx.cancel_timer();
                        return StateResult::handled();
                    }
                    self.status = AuthorizationStatus::Rejected;
                    ctx.log.log("Authorization rejected");
                    return Self::stop(ctx);
                }
                StateResult::unhandled()
            }
            Event::Timeout => {
                if self.status != AuthorizationStatus::Pending {
                    return StateResult::handled();
                }
                self.retries += 1;
                let max_retries = ctx.session_config.timeouts.authorization_retries;
                if self.retries > max_retries {
                    ctx.log.warn(&format!("Authorization timed out after {} retries", max_retries));
                    return Self::stop(ctx);
                }
                if self.auth_requested {
                    self.request_authorization(ctx);
                }
                ctx.arm_timer(Duration::from_millis(
                    ctx.session_config.timeouts.authorization_timeout_ms,
                ));
                StateResult::handled()
            }
            Event::V2gtpMessage => {
                let Some(Request::Authorization(req)) =
                    pull_expected(ctx, &[MessageType::AuthorizationReq])
                else {
                    return StateResult::unhandled();
                };

                if req.selected_authorization_service == message::Authorization::Eim
                    && !self.auth_requested
                {
                    self.request_authorization(ctx);
                }

                let res = handle_request(&req, &ctx.session, self.status, self.gen_challenge.as_ref());
                let code = res.response_code;
                let processing = res.evse_processing;
                ctx.respond(res);

                if code.is_failed() {
                    return StateResult::handled();
                }
                if code == ResponseCode::WarningAuthorizationSelectionInvalid
                    || code == ResponseCode::WarningChallengeInvalid
                {
                    return Self::stop(ctx);
                }
                if processing == Processing::Finished {
                    return StateResult::transition(ServiceDiscovery::default());
                }
                StateResult::handled()
            }
            Event::Reset | Event::Failed => StateResult::unhandled(),
        }
    }

    fn leave(&mut self, ctx: &mut Context) {
        ctx.cancel_timer();
    }
}
