use super::{
    pull_expected, validate_and_setup_header, Event, ServiceDetail, StateHandler, StateId,
    StateResult,
};
use crate::d20::{Context, Session};
use crate::message::{
    response_with_code, MessageType, Request, ResponseCode, Service, ServiceCategory,
    ServiceDiscoveryRequest, ServiceDiscoveryResponse,
};

/// Offer the configured services, narrowed to the ids the EV supports
pub fn handle_request(
    req: &ServiceDiscoveryRequest,
    session: &mut Session,
    energy_services: &[ServiceCategory],
    vas_services: &[u16],
) -> ServiceDiscoveryResponse {
    let mut res = ServiceDiscoveryResponse::default();

    if !validate_and_setup_header(&mut res.header, session, &req.header) {
        return response_with_code(res, ResponseCode::FailedUnknownSession);
    }

    let ev_supports = |id: u16| {
        req.supported_service_ids
            .as_ref()
            .map_or(true, |ids| ids.contains(&id))
    };

    let offered_energy: Vec<ServiceCategory> = energy_services
        .iter()
        .copied()
        .filter(|service| ev_supports(service.id()))
        .collect();
    let offered_vas: Vec<u16> = vas_services
        .iter()
        .copied()
        .filter(|id| ev_supports(*id))
        .collect();

    if offered_energy.is_empty() {
        return response_with_code(res, ResponseCode::Failed);
    }

    res.service_renegotiation_supported = session.service_renegotiation_supported;
    res.energy_transfer_service_list = offered_energy
        .iter()
        .map(|service| Service {
            service_id: service.id(),
            free_service: false,
        })
        .collect();
    if !offered_vas.is_empty() {
        res.vas_list = Some(
            offered_vas
                .iter()
                .map(|id| Service {
                    service_id: *id,
                    free_service: true,
                })
                .collect(),
        );
    }

    session.offered_services.energy_services = offered_energy;
    session.offered_services.vas_services = offered_vas;

    response_with_code(res, ResponseCode::Ok)
}

#[derive(Debug, Default)]
pub struct ServiceDiscovery;

impl StateHandler for ServiceDiscovery {
    const ID: StateId = StateId::ServiceDiscovery;

    fn feed(&mut self, ctx: &mut Context, ev: Event) -> StateResult {
        if ev != Event::V2gtpMessage {
            return StateResult::unhandled();
        }

        let Some(Request::ServiceDiscovery(req)) =
            pull_expected(ctx, &[MessageType::ServiceDiscoveryReq])
        else {
            return StateResult::unhandled();
        };

        let config = ctx.session_config.clone();
        let res = handle_request(
            &req,
            &mut ctx.session,
            &config.supported_energy_transfer_services,
            &config.supported_vas_services,
        );
        let failed = res.response_code.is_failed();
        ctx.respond(res);

        if failed {
            return StateResult::handled();
        }
        StateResult::transition(ServiceDetail::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::d20::context::test_support::{context, take_response};
    use crate::d20::state::test_support::{header, set_request};
    use crate::message::{Header, Response};
    use pretty_assertions::assert_eq;

    fn request(session: &Session, supported: Option<Vec<u16>>) -> ServiceDiscoveryRequest {
        ServiceDiscoveryRequest {
            header: Header {
                session_id: session.id(),
                timestamp: 1691411798,
            },
            supported_service_ids: supported,
        }
    }

    #[test]
    fn test_offers_all_configured_services() {
        let mut session = Session::new();
        let req = request(&session, None);

        let res = handle_request(
            &req,
            &mut session,
            &[ServiceCategory::Dc, ServiceCategory::DcBpt],
            &[65],
        );

        assert_eq!(res.response_code, ResponseCode::Ok);
        let ids: Vec<u16> = res.energy_transfer_service_list.iter().map(|s| s.service_id).collect();
        assert_eq!(ids, vec![2, 6]);
        assert_eq!(
            res.vas_list,
            Some(vec![Service {
                service_id: 65,
                free_service: true
            }])
        );
        assert_eq!(
            session.offered_services.energy_services,
            vec![ServiceCategory::Dc, ServiceCategory::DcBpt]
        );
        assert_eq!(session.offered_services.vas_services, vec![65]);
    }

    #[test]
    fn test_filters_by_ev_supported_ids() {
        let mut session = Session::new();
        let req = request(&session, Some(vec![6]));

        let res = handle_request(
            &req,
            &mut session,
            &[ServiceCategory::Dc, ServiceCategory::DcBpt],
            &[65, 66],
        );

        assert_eq!(res.energy_transfer_service_list.len(), 1);
        assert_eq!(res.energy_transfer_service_list[0].service_id, 6);
        assert!(res.vas_list.is_none());
        assert!(session.offered_services.vas_services.is_empty());
    }

    #[test]
    fn test_no_common_energy_service_fails() {
        let mut session = Session::new();
        let req = request(&session, Some(vec![1]));

        let res = handle_request(&req, &mut session, &[ServiceCategory::Dc], &[]);
        assert_eq!(res.response_code, ResponseCode::Failed);
        assert!(session.offered_services.energy_services.is_empty());
    }

    #[test]
    fn test_feed_transitions_to_service_detail() {
        let mut ctx = context();
        set_request(
            &ctx,
            ServiceDiscoveryRequest {
                header: header(&ctx),
                supported_service_ids: None,
            },
        );

        let result = ServiceDiscovery.feed(&mut ctx, Event::V2gtpMessage);

        assert_eq!(result.new_state_id(), Some(StateId::ServiceDetail));
        assert!(matches!(take_response(&ctx), Some(Response::ServiceDiscovery(res)) if res.response_code == ResponseCode::Ok));
    }
}
