use super::{
    pull_expected, validate_and_setup_header, DcChargeParameterDiscovery, Event, StateHandler,
    StateId, StateResult,
};
use crate::d20::{Context, Session};
use crate::message::{
    response_with_code, MessageType, Request, ResponseCode, ServiceCategory,
    ServiceSelectionRequest, ServiceSelectionResponse,
};

fn vas_selection_valid(req: &ServiceSelectionRequest, session: &Session) -> bool {
    req.vas_list().iter().all(|vas| {
        if !session.offered_services.vas_services.contains(&vas.service_id) {
            return false;
        }
        match ServiceCategory::from_id(vas.service_id) {
            Some(service) => session.find_parameter_set_id(service, vas.parameter_set_id),
            // Custom VAS parameter sets are owned by the integrator
            None => true,
        }
    })
}

/// Commit the EV's energy service and VAS choice
pub fn handle_request(req: &ServiceSelectionRequest, session: &mut Session) -> ServiceSelectionResponse {
    let mut res = ServiceSelectionResponse::default();

    if !validate_and_setup_header(&mut res.header, session, &req.header) {
        return response_with_code(res, ResponseCode::FailedUnknownSession);
    }

    let selected = req.selected_energy_transfer_service;
    if !session
        .offered_services
        .energy_services
        .contains(&selected.service_id)
        || !session.find_parameter_set_id(selected.service_id, selected.parameter_set_id)
    {
        return response_with_code(res, ResponseCode::FailedNoEnergyTransferServiceSelected);
    }

    if !vas_selection_valid(req, session) {
        return response_with_code(res, ResponseCode::FailedServiceSelectionInvalid);
    }

    if session
        .select_service_parameters(selected.service_id, selected.parameter_set_id)
        .is_err()
    {
        return response_with_code(res, ResponseCode::FailedNoEnergyTransferServiceSelected);
    }
    session.select_vas_services(req.vas_list().to_vec());

    response_with_code(res, ResponseCode::Ok)
}

#[derive(Debug, Default)]
pub struct ServiceSelection;

impl StateHandler for ServiceSelection {
    const ID: StateId = StateId::ServiceSelection;

    fn feed(&mut self, ctx: &mut Context, ev: Event) -> StateResult {
        if ev != Event::V2gtpMessage {
            return StateResult::unhandled();
        }

        let Some(Request::ServiceSelection(req)) =
            pull_expected(ctx, &[MessageType::ServiceSelectionReq])
        else {
            return StateResult::unhandled();
        };

        let res = handle_request(&req, &mut ctx.session);
        let failed = res.response_code.is_failed();
        ctx.respond(res);

        if failed {
            return StateResult::handled();
        }

        if !req.vas_list().is_empty() {
            ctx.feedback
                .selected_vas_services(ctx.session.selected_vas_services().to_vec());
        }
        ctx.ev_information.selected_energy_service = Some(req.selected_energy_transfer_service.service_id);
        ctx.feedback.ev_information(ctx.ev_information.clone());

        StateResult::transition(DcChargeParameterDiscovery::default())
    }
}
