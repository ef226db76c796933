use rand::RngCore;

use super::{
    pull_expected, validate_and_setup_header, Authorization, Event, StateHandler, StateId,
    StateResult,
};
use crate::d20::{Context, Session};
use crate::message::{
    self, response_with_code, AuthorizationMode, AuthorizationSetupRequest,
    AuthorizationSetupResponse, MessageType, Request, ResponseCode, GEN_CHALLENGE_LENGTH,
};

/// Advertise the authorization services; PnC carries a fresh challenge
pub fn handle_request(
    req: &AuthorizationSetupRequest,
    session: &mut Session,
    authorization_services: &[message::Authorization],
    cert_install_service: bool,
) -> AuthorizationSetupResponse {
    let mut res = AuthorizationSetupResponse::default();

    if !validate_and_setup_header(&mut res.header, session, &req.header) {
        return response_with_code(res, ResponseCode::FailedUnknownSession);
    }

    session.offered_services.auth_services = authorization_services.to_vec();

    res.authorization_services = authorization_services.to_vec();
    res.certificate_installation_service = cert_install_service;

    if authorization_services.contains(&message::Authorization::Pnc) {
        let mut gen_challenge = [0u8; GEN_CHALLENGE_LENGTH];
        rand::thread_rng().fill_bytes(&mut gen_challenge);
        res.authorization_mode = AuthorizationMode::Pnc {
            gen_challenge,
            supported_providers: None,
        };
    }

    response_with_code(res, ResponseCode::Ok)
}

#[derive(Debug, Default)]
pub struct AuthorizationSetup;

impl StateHandler for AuthorizationSetup {
    const ID: StateId = StateId::AuthorizationSetup;

    fn feed(&mut self, ctx: &mut Context, ev: Event) -> StateResult {
        if ev != Event::V2gtpMessage {
            return StateResult::unhandled();
        }

        let Some(Request::AuthorizationSetup(req)) =
            pull_expected(ctx, &[MessageType::AuthorizationSetupReq])
        else {
            return StateResult::unhandled();
        };

        let config = ctx.session_config.clone();
        let res = handle_request(
            &req,
            &mut ctx.session,
            &config.authorization_services,
            config.cert_install_service,
        );

        let failed = res.response_code.is_failed();
        let gen_challenge = match res.authorization_mode {
            AuthorizationMode::Pnc { gen_challenge, .. } => Some(gen_challenge),
            AuthorizationMode::Eim => None,
        };
        ctx.respond(res);

        if failed {
            return StateResult::handled();
        }
        StateResult::transition(Authorization::new(gen_challenge))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::d20::context::test_support::{context, take_response};
    use crate::d20::state::test_support::{header, set_request};
    use crate::message::{Header, Response};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_eim_only() {
        let mut session = Session::new();
        let req = AuthorizationSetupRequest {
            header: Header {
                session_id: session.id(),
                timestamp: 1691411798,
            },
        };

        let res = handle_request(&req, &mut session, &[message::Authorization::Eim], false);

        assert_eq!(res.response_code, ResponseCode::Ok);
        assert_eq!(res.authorization_services, vec![message::Authorization::Eim]);
        assert!(!res.certificate_installation_service);
        assert_eq!(res.authorization_mode, AuthorizationMode::Eim);
        assert_eq!(
            session.offered_services.auth_services,
            vec![message::Authorization::Eim]
        );
    }

    #[test]
    fn test_pnc_carries_challenge() {
        let mut session = Session::new();
        let req = AuthorizationSetupRequest {
            header: Header {
                session_id: session.id(),
                timestamp: 1691411798,
            },
        };

        let services = [message::Authorization::Eim, message::Authorization::Pnc];
        let res = handle_request(&req, &mut session, &services, true);

        assert!(res.certificate_installation_service);
        assert!(matches!(res.authorization_mode, AuthorizationMode::Pnc { .. }));
    }

    #[test]
    fn test_unknown_session() {
        let mut session = Session::new();
        let req = AuthorizationSetupRequest {
            header: Header::default(),
        };

        let res = handle_request(&req, &mut session, &[message::Authorization::Eim], false);
        assert_eq!(res.response_code, ResponseCode::FailedUnknownSession);
        assert!(session.offered_services.auth_services.is_empty());
    }

    #[test]
    fn test_feed_transitions_to_authorization() {
        let mut ctx = context();
        set_request(&ctx, AuthorizationSetupRequest { header: header(&ctx) });

        let result = AuthorizationSetup.feed(&mut ctx, Event::V2gtpMessage);

        assert_eq!(result.new_state_id(), Some(StateId::Authorization));
        assert!(matches!(take_response(&ctx), Some(Response::AuthorizationSetup(_))));
    }

    #[test]
    fn test_feed_unknown_session_stops() {
        let mut ctx = context();
        set_request(&ctx, AuthorizationSetupRequest::default());

        let result = AuthorizationSetup.feed(&mut ctx, Event::V2gtpMessage);

        assert!(result.new_state.is_none());
        assert!(ctx.session_stopped);
    }
}
