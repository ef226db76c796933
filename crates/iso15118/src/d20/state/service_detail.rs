use super::{
    pull_expected, validate_and_setup_header, Event, ServiceSelection, StateHandler, StateId,
    StateResult,
};
use crate::d20::config::SessionConfig;
use crate::d20::{Context, Session};
use crate::message::{
    response_with_code, MessageType, Request, ResponseCode, ServiceCategory, ServiceDetailRequest,
    ServiceDetailResponse, ServiceParameterList,
};
use crate::session::Feedback;

fn index_id(index: usize) -> u16 {
    u16::try_from(index).unwrap_or(u16::MAX)
}

/// Parameter sets of one offered service; ids are positions in the configured list
fn parameter_sets(
    service_id: u16,
    session: &mut Session,
    config: &SessionConfig,
    feedback: &Feedback,
) -> Option<ServiceParameterList> {
    let offered = &mut session.offered_services;
    match ServiceCategory::from_id(service_id) {
        Some(ServiceCategory::Dc) => Some(
            config
                .dc_parameter_list
                .iter()
                .enumerate()
                .map(|(index, list)| {
                    let id = index_id(index);
                    offered.dc_parameter_list.insert(id, *list);
                    list.to_parameter_set(id)
                })
                .collect(),
        ),
        Some(ServiceCategory::DcBpt) => Some(
            config
                .dc_bpt_parameter_list
                .iter()
                .enumerate()
                .map(|(index, list)| {
                    let id = index_id(index);
                    offered.dc_bpt_parameter_list.insert(id, *list);
                    list.to_parameter_set(id)
                })
                .collect(),
        ),
        Some(ServiceCategory::Internet) => Some(
            config
                .internet_parameter_list
                .iter()
                .enumerate()
                .map(|(index, list)| {
                    let id = index_id(index);
                    offered.internet_parameter_list.insert(id, *list);
                    list.to_parameter_set(id)
                })
                .collect(),
        ),
        Some(ServiceCategory::ParkingStatus) => Some(
            config
                .parking_parameter_list
                .iter()
                .enumerate()
                .map(|(index, list)| {
                    let id = index_id(index);
                    offered.parking_parameter_list.insert(id, *list);
                    list.to_parameter_set(id)
                })
                .collect(),
        ),
        Some(_) => None,
        None => feedback.get_vas_parameters(service_id),
    }
}

/// Describe the parameter sets of a service offered during discovery
pub fn handle_request(
    req: &ServiceDetailRequest,
    session: &mut Session,
    config: &SessionConfig,
    feedback: &Feedback,
) -> ServiceDetailResponse {
    let mut res = ServiceDetailResponse {
        service: req.service,
        ..Default::default()
    };

    if !validate_and_setup_header(&mut res.header, session, &req.header) {
        return response_with_code(res, ResponseCode::FailedUnknownSession);
    }

    let offered = &session.offered_services;
    let is_offered = offered
        .energy_services
        .iter()
        .any(|service| service.id() == req.service)
        || offered.vas_services.contains(&req.service);
    if !is_offered {
        return response_with_code(res, ResponseCode::FailedServiceIdInvalid);
    }

    match parameter_sets(req.service, session, config, feedback) {
        Some(list) if !list.is_empty() => {
            res.service_parameter_list = list;
            response_with_code(res, ResponseCode::Ok)
        }
        _ => response_with_code(res, ResponseCode::FailedServiceIdInvalid),
    }
}

#[derive(Debug, Default)]
pub struct ServiceDetail;

impl StateHandler for ServiceDetail {
    const ID: StateId = StateId::ServiceDetail;

    fn feed(&mut self, ctx: &mut Context, ev: Event) -> StateResult {
        if ev != Event::V2gtpMessage {
            return StateResult::unhandled();
        }

        // The EV may skip further details and go straight to selection
        if ctx.peek_request_type() == Some(MessageType::ServiceSelectionReq) {
            return StateResult::transition(ServiceSelection::default());
        }

        let Some(Request::ServiceDetail(req)) =
            pull_expected(ctx, &[MessageType::ServiceDetailReq])
        else {
            return StateResult::unhandled();
        };

        let config = ctx.session_config.clone();
        let res = handle_request(&req, &mut ctx.session, &config, &ctx.feedback);
        ctx.respond(res);

        StateResult::handled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::d20::config::EvseSetupConfig;
    use crate::d20::context::test_support::{context, take_response};
    use crate::d20::state::test_support::{header, set_request};
    use crate::message::{
        Header, Parameter, ParameterSet, ParameterValue, Response, ServiceSelectionRequest,
    };
    use crate::session::Callbacks;
    use pretty_assertions::assert_eq;

    fn discovered_session(vas: Vec<u16>) -> Session {
        let mut session = Session::new();
        session.offered_services.energy_services = vec![ServiceCategory::Dc];
        session.offered_services.vas_services = vas;
        session
    }

    fn request(session: &Session, service: u16) -> ServiceDetailRequest {
        ServiceDetailRequest {
            header: Header {
                session_id: session.id(),
                timestamp: 1691411798,
            },
            service,
        }
    }

    #[test]
    fn test_dc_parameter_sets_are_recorded() {
        let mut session = discovered_session(vec![]);
        let config = SessionConfig::default();
        let req = request(&session, ServiceCategory::Dc.id());

        let res = handle_request(&req, &mut session, &config, &Feedback::default());

        assert_eq!(res.response_code, ResponseCode::Ok);
        assert_eq!(res.service, 2);
        assert_eq!(res.service_parameter_list.len(), 1);
        assert_eq!(res.service_parameter_list[0].id, 0);
        assert_eq!(
            res.service_parameter_list[0].parameter[0],
            Parameter::int("Connector", 2)
        );
        assert!(session.find_parameter_set_id(ServiceCategory::Dc, 0));
    }

    #[test]
    fn test_service_not_discovered() {
        let mut session = discovered_session(vec![]);
        let req = request(&session, ServiceCategory::DcBpt.id());

        let res = handle_request(&req, &mut session, &SessionConfig::default(), &Feedback::default());
        assert_eq!(res.response_code, ResponseCode::FailedServiceIdInvalid);
        assert!(session.offered_services.dc_bpt_parameter_list.is_empty());
    }

    #[test]
    fn test_internet_vas() {
        let mut session = discovered_session(vec![65]);
        let req = request(&session, 65);

        let res = handle_request(&req, &mut session, &SessionConfig::default(), &Feedback::default());
        assert_eq!(res.response_code, ResponseCode::Ok);
        assert_eq!(
            res.service_parameter_list[0].parameter[0].value,
            ParameterValue::FiniteString("http".into())
        );
        assert!(session.find_parameter_set_id(ServiceCategory::Internet, 0));
    }

    #[test]
    fn test_custom_vas_from_callback() {
        let mut session = discovered_session(vec![0x1234]);
        let feedback = Feedback::new(Callbacks {
            get_vas_parameters: Some(Box::new(|id| {
                (id == 0x1234).then(|| {
                    vec![ParameterSet {
                        id: 7,
                        parameter: vec![Parameter::int("Level", 3)],
                    }]
                })
            })),
            ..Default::default()
        });
        let req = request(&session, 0x1234);

        let res = handle_request(&req, &mut session, &SessionConfig::default(), &feedback);
        assert_eq!(res.response_code, ResponseCode::Ok);
        assert_eq!(res.service_parameter_list[0].id, 7);

        let res = handle_request(&req, &mut session, &SessionConfig::default(), &Feedback::default());
        assert_eq!(res.response_code, ResponseCode::FailedServiceIdInvalid);
    }

    #[test]
    fn test_bpt_lists_follow_config() {
        let config = SessionConfig::new(EvseSetupConfig {
            supported_energy_services: vec![ServiceCategory::Dc, ServiceCategory::DcBpt],
            ..Default::default()
        });
        let mut session = discovered_session(vec![]);
        session.offered_services.energy_services.push(ServiceCategory::DcBpt);
        let req = request(&session, ServiceCategory::DcBpt.id());

        let res = handle_request(&req, &mut session, &config, &Feedback::default());
        assert_eq!(res.response_code, ResponseCode::Ok);
        assert_eq!(res.service_parameter_list[0].parameter.len(), 6);
    }

    #[test]
    fn test_feed_stays_until_selection() {
        let mut ctx = context();
        ctx.session.offered_services.energy_services = vec![ServiceCategory::Dc];
        let mut state = ServiceDetail;

        set_request(
            &ctx,
            ServiceDetailRequest {
                header: header(&ctx),
                service: ServiceCategory::Dc.id(),
            },
        );
        let result = state.feed(&mut ctx, Event::V2gtpMessage);
        assert!(!result.unhandled);
        assert!(result.new_state.is_none());
        assert!(matches!(take_response(&ctx), Some(Response::ServiceDetail(_))));

        set_request(
            &ctx,
            ServiceSelectionRequest {
                header: header(&ctx),
                ..Default::default()
            },
        );
        let result = state.feed(&mut ctx, Event::V2gtpMessage);
        assert_eq!(result.new_state_id(), Some(StateId::ServiceSelection));
        assert_eq!(ctx.peek_request_type(), Some(MessageType::ServiceSelectionReq));
    }
}
