use super::power_delivery::{self, ChargeFlags};
use super::schedule_exchange::relative_departure_time;
use super::{
    pull_expected, validate_and_setup_header, DcWeldingDetection, Event, StateHandler, StateId,
    StateResult,
};
use crate::d20::config::DcTransferLimits;
use crate::d20::control_event::UpdateDynamicModeParameters;
use crate::d20::session::SelectedServiceParameters;
use crate::d20::{Context, Session};
use crate::message::{
    response_with_code, BptDynamicDcClRes, BptScheduledDcClRes, ControlMode,
    DcChargeLoopReqControlMode, DcChargeLoopRequest, DcChargeLoopResControlMode,
    DcChargeLoopResponse, DynamicDcClRes, EvseNotification, EvseStatus, MessageType,
    MobilityNeedsMode, Progress, RationalNumber, Request, ResponseCode, ScheduledDcClRes,
};
use crate::session::Signal;

/// Seconds the EV may take to acknowledge dynamic mode targets
const ACK_MAX_DELAY_S: u16 = 30;

/// Pause notification delay in dynamic mode
const DYNAMIC_PAUSE_MAX_DELAY_S: u16 = 60;

fn scheduled_limits(limits: &DcTransferLimits) -> ScheduledDcClRes {
    ScheduledDcClRes {
        max_charge_power: Some(limits.charge_limits.power.max.into()),
        min_charge_power: Some(limits.charge_limits.power.min.into()),
        max_charge_current: Some(limits.charge_limits.current.max.into()),
        max_voltage: Some(limits.voltage.max.into()),
    }
}

fn dynamic_limits(limits: &DcTransferLimits) -> DynamicDcClRes {
    DynamicDcClRes {
        max_charge_power: limits.charge_limits.power.max.into(),
        min_charge_power: limits.charge_limits.power.min.into(),
        max_charge_current: limits.charge_limits.current.max.into(),
        max_voltage: limits.voltage.max.into(),
        ..Default::default()
    }
}

fn set_dynamic_parameters(
    mode: &mut DynamicDcClRes,
    parameters: &UpdateDynamicModeParameters,
    header_timestamp: u64,
) {
    mode.departure_time = relative_departure_time(parameters.departure_time, header_timestamp);
    mode.target_soc = parameters.target_soc;
    mode.minimum_soc = parameters.min_soc;
    mode.ack_max_delay = Some(ACK_MAX_DELAY_S);
}

/// Does the request's control mode match what was negotiated
fn control_mode_matches(mode: &DcChargeLoopReqControlMode, selected: &SelectedServiceParameters) -> bool {
    let service = selected.selected_energy_service;
    match mode {
        DcChargeLoopReqControlMode::Scheduled(_) => {
            selected.selected_control_mode == ControlMode::Scheduled && service.is_dc()
        }
        DcChargeLoopReqControlMode::BptScheduled(_) => {
            selected.selected_control_mode == ControlMode::Scheduled && service.is_dc_bpt()
        }
        DcChargeLoopReqControlMode::Dynamic(_) => {
            selected.selected_control_mode == ControlMode::Dynamic && service.is_dc()
        }
        DcChargeLoopReqControlMode::BptDynamic(_) => {
            selected.selected_control_mode == ControlMode::Dynamic && service.is_dc_bpt()
        }
    }
}

pub fn handle_request(
    req: &DcChargeLoopRequest,
    session: &Session,
    flags: ChargeFlagsView,
    dc_limits: &DcTransferLimits,
    dynamic_parameters: &UpdateDynamicModeParameters,
) -> DcChargeLoopResponse {
    let mut res = DcChargeLoopResponse::default();

    if !validate_and_setup_header(&mut res.header, session, &req.header) {
        return response_with_code(res, ResponseCode::FailedUnknownSession);
    }

    let Some(selected) = session.selected_services() else {
        return response_with_code(res, ResponseCode::Failed);
    };

    if !control_mode_matches(&req.control_mode, selected) {
        return response_with_code(res, ResponseCode::Failed);
    }

    let provided_by_secc = selected.selected_mobility_needs_mode == MobilityNeedsMode::ProvidedBySecc;
    let discharge = dc_limits.discharge_limits;
    let is_bpt = matches!(
        req.control_mode,
        DcChargeLoopReqControlMode::BptScheduled(_) | DcChargeLoopReqControlMode::BptDynamic(_)
    );
    if is_bpt && discharge.is_none() {
        tracing::error!("BPT control mode requested but no discharge limits are configured");
        return response_with_code(res, ResponseCode::Failed);
    }

    res.control_mode = match req.control_mode {
        DcChargeLoopReqControlMode::Scheduled(_) => {
            DcChargeLoopResControlMode::Scheduled(scheduled_limits(dc_limits))
        }
        DcChargeLoopReqControlMode::BptScheduled(_) => {
            let discharge = discharge.unwrap_or_default();
            DcChargeLoopResControlMode::BptScheduled(BptScheduledDcClRes {
                scheduled: scheduled_limits(dc_limits),
                min_voltage: Some(dc_limits.voltage.min.into()),
                max_discharge_power: Some(discharge.power.max.into()),
                min_discharge_power: Some(discharge.power.min.into()),
                max_discharge_current: Some(discharge.current.max.into()),
            })
        }
        DcChargeLoopReqControlMode::Dynamic(_) => {
            let mut mode = dynamic_limits(dc_limits);
            if provided_by_secc {
                set_dynamic_parameters(&mut mode, dynamic_parameters, res.header.timestamp);
            }
            DcChargeLoopResControlMode::Dynamic(mode)
        }
        DcChargeLoopReqControlMode::BptDynamic(_) => {
            let discharge = discharge.unwrap_or_default();
            let mut dynamic = dynamic_limits(dc_limits);
            if provided_by_secc {
                set_dynamic_parameters(&mut dynamic, dynamic_parameters, res.header.timestamp);
            }
            DcChargeLoopResControlMode::BptDynamic(BptDynamicDcClRes {
                dynamic,
                min_voltage: dc_limits.voltage.min.into(),
                max_discharge_power: discharge.power.max.into(),
                min_discharge_power: discharge.power.min.into(),
                max_discharge_current: discharge.current.max.into(),
            })
        }
    };

    res.present_voltage = RationalNumber::from_float(flags.present_voltage);
    res.present_current = RationalNumber::from_float(flags.present_current);

    if flags.stop {
        res.status = Some(EvseStatus {
            notification_max_delay: 0,
            evse_notification: EvseNotification::Terminate,
        });
    } else if flags.pause {
        let notification_max_delay = if selected.selected_control_mode == ControlMode::Dynamic {
            DYNAMIC_PAUSE_MAX_DELAY_S
        } else {
            0
        };
        res.status = Some(EvseStatus {
            notification_max_delay,
            evse_notification: EvseNotification::Pause,
        });
    }

    response_with_code(res, ResponseCode::Ok)
}

/// EVSE side inputs of one charge loop response
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChargeFlagsView {
    pub present_voltage: f32,
    pub present_current: f32,
    pub stop: bool,
    pub pause: bool,
}

impl From<ChargeFlags> for ChargeFlagsView {
    fn from(flags: ChargeFlags) -> Self {
        Self {
            present_voltage: flags.present.voltage,
            present_current: flags.present.current,
            stop: flags.stop,
            pause: flags.pause,
        }
    }
}

#[derive(Debug)]
pub struct DcChargeLoop {
    flags: ChargeFlags,
    first_entry_in_charge_loop: bool,
}

impl Default for DcChargeLoop {
    fn default() -> Self {
        Self::new(ChargeFlags::default())
    }
}

impl DcChargeLoop {
    pub(crate) fn new(flags: ChargeFlags) -> Self {
        Self {
            flags,
            first_entry_in_charge_loop: true,
        }
    }
}

impl StateHandler for DcChargeLoop {
    const ID: StateId = StateId::DcChargeLoop;

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

        let Some(request) =
            pull_expected(ctx, &[MessageType::PowerDeliveryReq, MessageType::DcChargeLoopReq])
        else {
            return StateResult::unhandled();
        };

        match request {
            Request::PowerDelivery(req) => {
                let res = power_delivery::handle_request(&req, &ctx.session, self.flags.stop);
                let failed = res.response_code.is_failed();
                ctx.respond(res);

                if failed {
                    return StateResult::handled();
                }

                self.first_entry_in_charge_loop = true;

                if req.charge_progress == Progress::Stop {
                    ctx.feedback.signal(Signal::ChargeLoopFinished);
                    ctx.feedback.signal(Signal::DcOpenContactor);
                    return StateResult::transition(DcWeldingDetection::new(self.flags.present));
                }
                StateResult::handled()
            }
            Request::DcChargeLoop(req) => {
                if self.first_entry_in_charge_loop {
                    ctx.feedback.signal(Signal::ChargeLoopStarted);
                    self.first_entry_in_charge_loop = false;
                }

                let dynamic_parameters = ctx.dynamic_mode_parameters.unwrap_or_default();
                let res = handle_request(
                    &req,
                    &ctx.session,
                    self.flags.into(),
                    &ctx.dc_limits,
                    &dynamic_parameters,
                );
                let failed = res.response_code.is_failed();
                ctx.respond(res);

                if failed {
                    return StateResult::handled();
                }

                ctx.feedback.dc_charge_loop_req(req.control_mode);
                ctx.feedback.dc_charge_loop_req(req.present_voltage);
                ctx.feedback.dc_charge_loop_req(req.meter_info_requested);
                if let Some(display_parameters) = req.display_parameters {
                    ctx.feedback.dc_charge_loop_req(display_parameters);
                }
                StateResult::handled()
            }
            _ => StateResult::unhandled(),
        }
    }
}
