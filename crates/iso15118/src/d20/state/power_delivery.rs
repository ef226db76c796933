use super::{
    dc_pre_charge, pull_expected, validate_and_setup_header, DcChargeLoop, DcWeldingDetection,
    Event, StateHandler, StateId, StateResult,
};
use crate::d20::control_event::{PauseCharging, PresentVoltageCurrent, StopCharging};
use crate::d20::{Context, Session};
use crate::message::{
    response_with_code, EvseNotification, EvseStatus, MessageType, PowerDeliveryRequest,
    PowerDeliveryResponse, Progress, Request, ResponseCode,
};
use crate::session::Signal;

/// Answer a PowerDeliveryReq; shared with the charge loop
pub fn handle_request(req: &PowerDeliveryRequest, session: &Session, stop: bool) -> PowerDeliveryResponse {
    let mut res = PowerDeliveryResponse::default();

    if !validate_and_setup_header(&mut res.header, session, &req.header) {
        return response_with_code(res, ResponseCode::FailedUnknownSession);
    }

    if stop {
        res.status = Some(EvseStatus {
            notification_max_delay: 0,
            evse_notification: EvseNotification::Terminate,
        });
    }

    match req.charge_progress {
        Progress::Start | Progress::Stop => response_with_code(res, ResponseCode::Ok),
        Progress::Standby => response_with_code(res, ResponseCode::WarningStandbyNotAllowed),
        Progress::ScheduleRenegotiation => {
            response_with_code(res, ResponseCode::FailedScheduleRenegotiation)
        }
    }
}

/// Charge flags the EVSE side set before the loop started
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct ChargeFlags {
    pub present: PresentVoltageCurrent,
    pub stop: bool,
    pub pause: bool,
}

impl ChargeFlags {
    /// Apply a runtime control event; false if it does not concern charging
    pub(crate) fn apply(&mut self, ctx: &Context) -> bool {
        if let Some(present) = ctx.get_control_event::<PresentVoltageCurrent>() {
            self.present = *present;
        } else if let Some(StopCharging(stop)) = ctx.get_control_event::<StopCharging>() {
            self.stop = *stop;
        } else if let Some(PauseCharging(pause)) = ctx.get_control_event::<PauseCharging>() {
            self.pause = *pause;
        } else {
            return false;
        }
        true
    }
}

#[derive(Debug, Default)]
pub struct PowerDelivery {
    flags: ChargeFlags,
}

impl PowerDelivery {
    pub fn new(present: PresentVoltageCurrent) -> Self {
        Self {
            flags: ChargeFlags {
                present,
                ..Default::default()
            },
        }
    }
}

impl StateHandler for PowerDelivery {
    const ID: StateId = StateId::PowerDelivery;

    fn feed(&mut self, ctx: &mut Context, ev: Event) -> StateResult {
        if ev == Event::ControlMessage {
            if self.flags.apply(ctx) {
                return StateResult::handled();
            }
            return StateResult::unhandled();
        }

        if ev != Event::V2gtpMessage {
            return StateResult::unhandled();
        }

        let Some(request) = pull_expected(ctx, &[MessageType::DcPreChargeReq, MessageType::PowerDeliveryReq])
        else {
            return StateResult::unhandled();
        };

        match request {
            Request::DcPreCharge(req) => {
                ctx.feedback
                    .dc_pre_charge_target_voltage(req.target_voltage.to_float());
                let res = dc_pre_charge::handle_request(&req, &ctx.session, self.flags.present.voltage);
                ctx.respond(res);
                StateResult::handled()
            }
            Request::PowerDelivery(req) => {
                let res = handle_request(&req, &ctx.session, self.flags.stop);
                let code = res.response_code;
                ctx.respond(res);

                if code != ResponseCode::Ok {
                    return StateResult::handled();
                }

                match req.charge_progress {
                    Progress::Start => StateResult::transition(DcChargeLoop::new(self.flags)),
                    Progress::Stop => {
                        ctx.feedback.signal(Signal::DcOpenContactor);
                        StateResult::transition(DcWeldingDetection::new(self.flags.present))
                    }
                    Progress::Standby | Progress::ScheduleRenegotiation => StateResult::handled(),
                }
            }
            _ => StateResult::unhandled(),
        }
    }
}
