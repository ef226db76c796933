use std::time::Duration;

use super::{
    pull_expected, validate_and_setup_header, Event, PowerDelivery, SessionStop, StateHandler,
    StateId, StateResult,
};
use crate::d20::control_event::PresentVoltageCurrent;
use crate::d20::{Context, Session};
use crate::message::{
    response_with_code, DcPreChargeRequest, DcPreChargeResponse, MessageType, Request,
    ResponseCode,
};
use crate::session::Signal;

pub fn handle_request(req: &DcPreChargeRequest, session: &Session, present_voltage: f32) -> DcPreChargeResponse {
    let mut res = DcPreChargeResponse::default();

    if !validate_and_setup_header(&mut res.header, session, &req.header) {
        return response_with_code(res, ResponseCode::FailedUnknownSession);
    }

    res.present_voltage = present_voltage.into();
    response_with_code(res, ResponseCode::Ok)
}

#[derive(Debug, Default)]
pub struct DcPreCharge {
    pre_charge_started: bool,
    present: PresentVoltageCurrent,
    target_voltage: Option<f32>,
}

impl DcPreCharge {
    fn target_reached(&self, tolerance: f32) -> bool {
        self.target_voltage
            .is_some_and(|target| (self.present.voltage - target).abs() <= tolerance)
    }

    fn next_state(&self) -> PowerDelivery {
        PowerDelivery::new(self.present)
    }
}

impl StateHandler for DcPreCharge {
    const ID: StateId = StateId::DcPreCharge;

    fn enter(&mut self, ctx: &mut Context) {
        ctx.log.enter_state(Self::ID.name());
        ctx.arm_timer(Duration::from_millis(ctx.session_config.timeouts.pre_charge_timeout_ms));
    }

    fn feed(&mut self, ctx: &mut Context, ev: Event) -> StateResult {
        let tolerance = ctx.session_config.pre_charge_tolerance_v;

        match ev {
            Event::ControlMessage => {
                let Some(present) = ctx.get_control_event::<PresentVoltageCurrent>().copied() else {
                    return StateResult::unhandled();
                };
                self.present = present;
                if self.target_reached(tolerance) {
                    return StateResult::transition(self.next_state());
                }
                StateResult::handled()
            }
            Event::Timeout => {
                ctx.log.warn("Pre-charge timed out");
                ctx.session_stopped = true;
                StateResult::transition(SessionStop::default())
            }
            Event::V2gtpMessage => {
                let Some(Request::DcPreCharge(req)) =
                    pull_expected(ctx, &[MessageType::DcPreChargeReq])
                else {
                    return StateResult::unhandled();
                };

                if !self.pre_charge_started {
                    ctx.feedback.signal(Signal::PreChargeStarted);
                    self.pre_charge_started = true;
                }

                let target_voltage = req.target_voltage.to_float();
                self.target_voltage = Some(target_voltage);
                ctx.feedback.dc_pre_charge_target_voltage(target_voltage);

                let res = handle_request(&req, &ctx.session, self.present.voltage);
                let failed = res.response_code.is_failed();
                ctx.respond(res);

                if failed {
                    return StateResult::handled();
                }
                if self.target_reached(tolerance) {
                    return StateResult::transition(self.next_state());
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::d20::context::test_support::{context, take_response};
    use crate::d20::control_event::ControlEvent;
    use crate::d20::state::test_support::{header, set_request};
    use crate::message::{Processing, RationalNumber, Response};
    use crate::session::{Callbacks, Feedback};
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn pre_charge_request(ctx: &Context, target: i16) {
        set_request(
            ctx,
            DcPreChargeRequest {
                header: header(ctx),
                processing: Processing::Ongoing,
                present_voltage: RationalNumber::new(0, 0),
                target_voltage: RationalNumber::new(target, 0),
            },
        );
    }

    fn present_voltage(ctx: &mut Context, voltage: f32) {
        ctx.set_control_event(Some(ControlEvent::from(PresentVoltageCurrent {
            voltage,
            current: 0.0,
        })));
    }

    #[test]
    fn test_answers_present_voltage() {
        let session = Session::new();
        let req = DcPreChargeRequest {
            header: crate::message::Header {
                session_id: session.id(),
                timestamp: 1691411798,
            },
            ..Default::default()
        };

        let res = handle_request(&req, &session, 398.5);
        assert_eq!(res.response_code, ResponseCode::Ok);
        assert_eq!(res.present_voltage.to_float(), 398.5);
    }

    #[test]
    fn test_waits_for_target_voltage() {
        let targets = Arc::new(Mutex::new(Vec::new()));
        let mut ctx = context();
        ctx.feedback = Feedback::new(Callbacks {
            dc_pre_charge_target_voltage: Some(Box::new({
                let targets = targets.clone();
                move |v| targets.lock().push(v)
            })),
            ..Default::default()
        });
        let mut state = DcPreCharge::default();

        pre_charge_request(&ctx, 400);
        assert!(state.feed(&mut ctx, Event::V2gtpMessage).new_state.is_none());
        assert!(matches!(take_response(&ctx), Some(Response::DcPreCharge(res)) if res.present_voltage.to_float() == 0.0));

        present_voltage(&mut ctx, 250.0);
        assert!(state.feed(&mut ctx, Event::ControlMessage).new_state.is_none());

        present_voltage(&mut ctx, 395.0);
        let result = state.feed(&mut ctx, Event::ControlMessage);
        assert_eq!(result.new_state_id(), Some(StateId::PowerDelivery));
        assert_eq!(*targets.lock(), vec![400.0]);
    }

    #[test]
    fn test_transition_after_request_within_tolerance() {
        let mut ctx = context();
        let mut state = DcPreCharge::default();
        present_voltage(&mut ctx, 405.0);
        state.feed(&mut ctx, Event::ControlMessage);

        pre_charge_request(&ctx, 400);
        let result = state.feed(&mut ctx, Event::V2gtpMessage);

        assert_eq!(result.new_state_id(), Some(StateId::PowerDelivery));
        assert!(matches!(take_response(&ctx), Some(Response::DcPreCharge(res)) if res.present_voltage.to_float() == 405.0));
    }

    #[test]
    fn test_timeout_stops_session() {
        let mut ctx = context();
        let mut state = DcPreCharge::default();
        let result = state.feed(&mut ctx, Event::Timeout);
        assert!(ctx.session_stopped);
        assert_eq!(result.new_state_id(), Some(StateId::SessionStop));
    }
}
