use super::{
    pull_expected, validate_and_setup_header, DcCableCheck, Event, StateHandler, StateId,
    StateResult,
};
use crate::d20::config::DcTransferLimits;
use crate::d20::control_event::UpdateDynamicModeParameters;
use crate::d20::{Context, Session};
use crate::message::{
    response_with_code, ControlMode, DynamicScheduleExchangeRes, MessageType, MobilityNeedsMode,
    PowerSchedule, PowerScheduleEntry, Processing, Request, ResponseCode,
    ScheduleExchangeReqControlMode, ScheduleExchangeRequest, ScheduleExchangeResControlMode,
    ScheduleExchangeResponse, ScheduleTuple, ScheduledScheduleExchangeRes,
};

/// One day, the longest single entry of a charging schedule
const SCHEDULE_DURATION_S: u32 = 86_400;

/// Departure time relative to `now`; `None` when it already passed
pub(crate) fn relative_departure_time(departure_time: Option<u64>, now: u64) -> Option<u32> {
    departure_time
        .filter(|departure| *departure > now)
        .map(|departure| u32::try_from(departure - now).unwrap_or(u32::MAX))
}

pub fn handle_request(
    req: &ScheduleExchangeRequest,
    session: &Session,
    dc_limits: &DcTransferLimits,
    dynamic_parameters: Option<&UpdateDynamicModeParameters>,
) -> ScheduleExchangeResponse {
    let mut res = ScheduleExchangeResponse::default();

    if !validate_and_setup_header(&mut res.header, session, &req.header) {
        return response_with_code(res, ResponseCode::FailedUnknownSession);
    }

    let Some(selected) = session.selected_services() else {
        return response_with_code(res, ResponseCode::Failed);
    };

    res.processing = Processing::Finished;
    res.control_mode = match (&req.control_mode, selected.selected_control_mode) {
        (ScheduleExchangeReqControlMode::Scheduled(_), ControlMode::Scheduled) => {
            let charging_schedule = PowerSchedule {
                time_anchor: res.header.timestamp,
                available_energy: None,
                power_tolerance: None,
                entries: vec![PowerScheduleEntry {
                    duration: SCHEDULE_DURATION_S,
                    power: dc_limits.charge_limits.power.max.into(),
                }],
            };
            ScheduleExchangeResControlMode::Scheduled(ScheduledScheduleExchangeRes {
                schedule_tuple: vec![ScheduleTuple {
                    schedule_tuple_id: 1,
                    charging_schedule,
                    discharging_schedule: None,
                }],
            })
        }
        (ScheduleExchangeReqControlMode::Dynamic(_), ControlMode::Dynamic) => {
            let mut mode = DynamicScheduleExchangeRes::default();
            if selected.selected_mobility_needs_mode == MobilityNeedsMode::ProvidedBySecc {
                if let Some(parameters) = dynamic_parameters {
                    mode.departure_time =
                        relative_departure_time(parameters.departure_time, res.header.timestamp);
                    mode.minimum_soc = parameters.min_soc;
                    mode.target_soc = parameters.target_soc;
                }
            }
            ScheduleExchangeResControlMode::Dynamic(mode)
        }
        _ => return response_with_code(res, ResponseCode::Failed),
    };

    response_with_code(res, ResponseCode::Ok)
}

#[derive(Debug, Default)]
pub struct ScheduleExchange;

impl StateHandler for ScheduleExchange {
    const ID: StateId = StateId::ScheduleExchange;

    fn feed(&mut self, ctx: &mut Context, ev: Event) -> StateResult {
        if ev != Event::V2gtpMessage {
            return StateResult::unhandled();
        }

        let Some(Request::ScheduleExchange(req)) =
            pull_expected(ctx, &[MessageType::ScheduleExchangeReq])
        else {
            return StateResult::unhandled();
        };

        let res = handle_request(
            &req,
            &ctx.session,
            &ctx.dc_limits,
            ctx.dynamic_mode_parameters.as_ref(),
        );
        let failed = res.response_code.is_failed();
        ctx.respond(res);

        if failed {
            return StateResult::handled();
        }
        StateResult::transition(DcCableCheck::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::d20::config::{DcParameterList, MinMax};
    use crate::d20::context::test_support::{context, take_response};
    use crate::d20::state::test_support::{header, set_request};
    use crate::message::{
        DynamicScheduleExchangeReq, Header, Response, ServiceCategory, ScheduledScheduleExchangeReq,
    };
    use pretty_assertions::assert_eq;

    fn session_with(control_mode: ControlMode, mobility_needs_mode: MobilityNeedsMode) -> Session {
        let mut session = Session::new();
        session.offered_services.dc_parameter_list.insert(
            0,
            DcParameterList {
                control_mode,
                mobility_needs_mode,
                ..Default::default()
            },
        );
        session
            .select_service_parameters(ServiceCategory::Dc, 0)
            .unwrap();
        session
    }

    fn request(session: &Session, control_mode: ScheduleExchangeReqControlMode) -> ScheduleExchangeRequest {
        ScheduleExchangeRequest {
            header: Header {
                session_id: session.id(),
                timestamp: 1691411798,
            },
            max_supporting_points: 1024,
            control_mode,
        }
    }

    fn limits() -> DcTransferLimits {
        let mut limits = DcTransferLimits::default();
        limits.charge_limits.power = MinMax::new(0.0, 22_000.0);
        limits
    }

    #[test]
    fn test_relative_departure_time() {
        assert_eq!(relative_departure_time(Some(1_000), 400), Some(600));
        assert_eq!(relative_departure_time(Some(400), 1_000), None);
        assert_eq!(relative_departure_time(None, 1_000), None);
    }

    #[test]
    fn test_scheduled_mode_builds_one_tuple() {
        let session = session_with(ControlMode::Scheduled, MobilityNeedsMode::ProvidedByEvcc);
        let req = request(
            &session,
            ScheduleExchangeReqControlMode::Scheduled(ScheduledScheduleExchangeReq::default()),
        );

        let res = handle_request(&req, &session, &limits(), None);

        assert_eq!(res.response_code, ResponseCode::Ok);
        assert_eq!(res.processing, Processing::Finished);
        match res.control_mode {
            ScheduleExchangeResControlMode::Scheduled(mode) => {
                assert_eq!(mode.schedule_tuple.len(), 1);
                let tuple = &mode.schedule_tuple[0];
                assert_eq!(tuple.schedule_tuple_id, 1);
                assert_eq!(tuple.charging_schedule.time_anchor, res.header.timestamp);
                assert_eq!(tuple.charging_schedule.entries[0].duration, SCHEDULE_DURATION_S);
                assert_eq!(tuple.charging_schedule.entries[0].power.to_float(), 22_000.0);
            }
            other => panic!("unexpected control mode {:?}", other),
        }
    }

    #[test]
    fn test_control_mode_mismatch_fails() {
        let session = session_with(ControlMode::Scheduled, MobilityNeedsMode::ProvidedByEvcc);
        let req = request(
            &session,
            ScheduleExchangeReqControlMode::Dynamic(DynamicScheduleExchangeReq::default()),
        );

        let res = handle_request(&req, &session, &limits(), None);
        assert_eq!(res.response_code, ResponseCode::Failed);
    }

    #[test]
    fn test_dynamic_mode_with_secc_targets() {
        let session = session_with(ControlMode::Dynamic, MobilityNeedsMode::ProvidedBySecc);
        let req = request(
            &session,
            ScheduleExchangeReqControlMode::Dynamic(DynamicScheduleExchangeReq::default()),
        );
        let parameters = UpdateDynamicModeParameters {
            departure_time: Some(crate::d20::context::now() + 7_200),
            target_soc: Some(80),
            min_soc: Some(20),
        };

        let res = handle_request(&req, &session, &limits(), Some(&parameters));

        match res.control_mode {
            ScheduleExchangeResControlMode::Dynamic(mode) => {
                let departure = mode.departure_time.unwrap();
                assert!(departure > 7_000 && departure <= 7_200);
                assert_eq!(mode.target_soc, Some(80));
                assert_eq!(mode.minimum_soc, Some(20));
            }
            other => panic!("unexpected control mode {:?}", other),
        }
    }

    #[test]
    fn test_feed_transitions_to_cable_check() {
        let mut ctx = context();
        ctx.session = session_with(ControlMode::Scheduled, MobilityNeedsMode::ProvidedByEvcc);
        set_request(
            &ctx,
            ScheduleExchangeRequest {
                header: header(&ctx),
                ..Default::default()
            },
        );

        let result = ScheduleExchange.feed(&mut ctx, Event::V2gtpMessage);

        assert_eq!(result.new_state_id(), Some(StateId::DcCableCheck));
        assert!(matches!(take_response(&ctx), Some(Response::ScheduleExchange(_))));
    }
}
