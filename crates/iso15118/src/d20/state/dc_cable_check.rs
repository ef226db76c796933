use std::time::Duration;

use super::{
    pull_expected, validate_and_setup_header, DcPreCharge, Event, SessionStop, StateHandler,
    StateId, StateResult,
};
use crate::d20::control_event::CableCheckFinished;
use crate::d20::{Context, Session};
use crate::message::{
    response_with_code, DcCableCheckRequest, DcCableCheckResponse, MessageType, Processing,
    Request, ResponseCode,
};
use crate::session::Signal;

/// Outcome of the isolation check as seen by the state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum CableCheckResult {
    #[default]
    Pending,
    Done,
    Failed,
}

pub fn handle_request(
    req: &DcCableCheckRequest,
    session: &Session,
    cable_check_done: bool,
) -> DcCableCheckResponse {
    let mut res = DcCableCheckResponse::default();

    if !validate_and_setup_header(&mut res.header, session, &req.header) {
        return response_with_code(res, ResponseCode::FailedUnknownSession);
    }

    res.processing = if cable_check_done {
        Processing::Finished
    } else {
        Processing::Ongoing
    };

    response_with_code(res, ResponseCode::Ok)
}

#[derive(Debug, Default)]
pub struct DcCableCheck {
    cable_check_initiated: bool,
    result: CableCheckResult,
}

impl DcCableCheck {
    pub fn cable_check_initiated(&self) -> bool {
        self.cable_check_initiated
    }

    pub fn cable_check_done(&self) -> bool {
        self.result == CableCheckResult::Done
    }
}

impl StateHandler for DcCableCheck {
    const ID: StateId = StateId::DcCableCheck;

    fn enter(&mut self, ctx: &mut Context) {
        ctx.log.enter_state(Self::ID.name());
        ctx.arm_timer(Duration::from_millis(ctx.session_config.timeouts.cable_check_timeout_ms));
    }

    fn feed(&mut self, ctx: &mut Context, ev: Event) -> StateResult {
        match ev {
            Event::ControlMessage => {
                let Some(CableCheckFinished(success)) = ctx.get_control_event::<CableCheckFinished>().copied()
                else {
                    return StateResult::unhandled();
                };
                self.result = if success {
                    ctx.cancel_timer();
                    CableCheckResult::Done
                } else {
                    ctx.log.warn("Cable check failed");
                    CableCheckResult::Failed
                };
                StateResult::handled()
            }
            Event::Timeout => {
                ctx.log.warn("Cable check timed out");
                ctx.session_stopped = true;
                StateResult::transition(SessionStop::default())
            }
            Event::V2gtpMessage => {
                let Some(Request::DcCableCheck(req)) =
                    pull_expected(ctx, &[MessageType::DcCableCheckReq])
                else {
                    return StateResult::unhandled();
                };

                if !self.cable_check_initiated {
                    ctx.feedback.signal(Signal::StartCableCheck);
                    self.cable_check_initiated = true;
                }

                let mut res = handle_request(&req, &ctx.session, self.cable_check_done());
                if self.result == CableCheckResult::Failed && !res.response_code.is_failed() {
                    res = response_with_code(res, ResponseCode::Failed);
                }
                let code = res.response_code;
                let processing = res.processing;
                ctx.respond(res);

                if code.is_failed() {
                    return StateResult::handled();
                }
                if processing == Processing::Finished {
                    return StateResult::transition(DcPreCharge::default());
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
