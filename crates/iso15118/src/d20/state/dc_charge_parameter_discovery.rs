use super::{
    pull_expected, validate_and_setup_header, Event, ScheduleExchange, StateHandler, StateId,
    StateResult,
};
use crate::d20::config::DcTransferLimits;
use crate::d20::{Context, Session};
use crate::message::{
    response_with_code, BptDcCpdResEnergyTransferMode, DcChargeParameterDiscoveryRequest,
    DcChargeParameterDiscoveryResponse, DcCpdReqTransferMode, DcCpdResEnergyTransferMode,
    DcCpdResTransferMode, MessageType, RationalNumber, Request, ResponseCode,
};
use crate::session::feedback::DcMaximumLimits;

fn charge_limits(limits: &DcTransferLimits) -> DcCpdResEnergyTransferMode {
    DcCpdResEnergyTransferMode {
        max_charge_power: limits.charge_limits.power.max.into(),
        min_charge_power: limits.charge_limits.power.min.into(),
        max_charge_current: limits.charge_limits.current.max.into(),
        min_charge_current: limits.charge_limits.current.min.into(),
        max_voltage: limits.voltage.max.into(),
        min_voltage: limits.voltage.min.into(),
        power_ramp_limit: limits.power_ramp_limit.map(RationalNumber::from_float),
    }
}

/// Answer with the EVSE limits for the transfer mode matching the selected service
pub fn handle_request(
    req: &DcChargeParameterDiscoveryRequest,
    session: &Session,
    dc_limits: &DcTransferLimits,
) -> DcChargeParameterDiscoveryResponse {
    let mut res = DcChargeParameterDiscoveryResponse::default();

    if !validate_and_setup_header(&mut res.header, session, &req.header) {
        return response_with_code(res, ResponseCode::FailedUnknownSession);
    }

    let Some(selected) = session.selected_services() else {
        return response_with_code(res, ResponseCode::FailedWrongChargeParameter);
    };
    let service = selected.selected_energy_service;

    res.transfer_mode = match &req.transfer_mode {
        DcCpdReqTransferMode::Dc(_) if service.is_dc() => {
            DcCpdResTransferMode::Dc(charge_limits(dc_limits))
        }
        DcCpdReqTransferMode::BptDc(_) if service.is_dc_bpt() => {
            let Some(discharge) = dc_limits.discharge_limits else {
                tracing::error!("BPT transfer mode requested but no discharge limits are configured");
                return response_with_code(res, ResponseCode::FailedWrongChargeParameter);
            };
            DcCpdResTransferMode::BptDc(BptDcCpdResEnergyTransferMode {
                charge: charge_limits(dc_limits),
                max_discharge_power: discharge.power.max.into(),
                min_discharge_power: discharge.power.min.into(),
                max_discharge_current: discharge.current.max.into(),
                min_discharge_current: discharge.current.min.into(),
            })
        }
        _ => return response_with_code(res, ResponseCode::FailedWrongChargeParameter),
    };

    response_with_code(res, ResponseCode::Ok)
}

#[derive(Debug, Default)]
pub struct DcChargeParameterDiscovery;

impl StateHandler for DcChargeParameterDiscovery {
    const ID: StateId = StateId::DcChargeParameterDiscovery;

    fn feed(&mut self, ctx: &mut Context, ev: Event) -> StateResult {
        if ev != Event::V2gtpMessage {
            return StateResult::unhandled();
        }

        let Some(Request::DcChargeParameterDiscovery(req)) =
            pull_expected(ctx, &[MessageType::DcChargeParameterDiscoveryReq])
        else {
            return StateResult::unhandled();
        };

        let res = handle_request(&req, &ctx.session, &ctx.dc_limits);
        let failed = res.response_code.is_failed();
        ctx.respond(res);

        if failed {
            return StateResult::handled();
        }

        let ev_limits = req.transfer_mode.charge_limits();
        ctx.feedback.dc_max_limits(DcMaximumLimits {
            voltage: ev_limits.max_voltage.to_float(),
            current: ev_limits.max_charge_current.to_float(),
            power: ev_limits.max_charge_power.to_float(),
        });

        StateResult::transition(ScheduleExchange::default())
    }
}
