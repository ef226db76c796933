use super::{pull_expected, Event, SessionSetup, StateHandler, StateId, StateResult};
use crate::d20::Context;
use crate::message::{
    AppProtocolResponseCode, MessageType, Request, SupportedAppProtocolRequest,
    SupportedAppProtocolResponse, ISO15118_20_DC_NAMESPACE,
};

const SUPPORTED_MAJOR_VERSION: u32 = 1;

/// Pick the highest priority (lowest value) DC protocol the EV offers
pub fn handle_request(
    req: &SupportedAppProtocolRequest,
) -> (SupportedAppProtocolResponse, Option<&str>) {
    let selected = req
        .app_protocol
        .iter()
        .filter(|p| {
            p.protocol_namespace == ISO15118_20_DC_NAMESPACE
                && p.version_number_major == SUPPORTED_MAJOR_VERSION
        })
        .min_by_key(|p| p.priority);

    match selected {
        Some(protocol) => {
            let response_code = if protocol.version_number_minor == 0 {
                AppProtocolResponseCode::OkSuccessfulNegotiation
            } else {
                AppProtocolResponseCode::OkSuccessfulNegotiationWithMinorDeviation
            };
            (
                SupportedAppProtocolResponse {
                    response_code,
                    schema_id: Some(protocol.schema_id),
                },
                Some(protocol.protocol_namespace.as_str()),
            )
        }
        None => (
            SupportedAppProtocolResponse {
                response_code: AppProtocolResponseCode::FailedNoNegotiation,
                schema_id: None,
            },
            None,
        ),
    }
}

#[derive(Debug, Default)]
pub struct SupportedAppProtocol;

impl StateHandler for SupportedAppProtocol {
    const ID: StateId = StateId::SupportedAppProtocol;

    fn feed(&mut self, ctx: &mut Context, ev: Event) -> StateResult {
        if ev != Event::V2gtpMessage {
            return StateResult::unhandled();
        }

        let Some(Request::SupportedAppProtocol(req)) =
            pull_expected(ctx, &[MessageType::SupportedAppProtocolReq])
        else {
            return StateResult::unhandled();
        };

        let (res, selected) = handle_request(&req);
        let selected = selected.map(str::to_string);
        ctx.respond(res);

        match selected {
            Some(protocol) => {
                ctx.log.log(&format!("Negotiated {}", protocol));
                ctx.feedback.selected_protocol(&protocol);
                ctx.ev_information.selected_protocol = protocol;
                StateResult::transition(SessionSetup::default())
            }
            None => {
                ctx.log.warn("No supported application protocol offered");
                ctx.session_stopped = true;
                StateResult::handled()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::d20::context::test_support::{context, take_response};
    use crate::d20::state::test_support::set_request;
    use crate::message::{AppProtocol, Response};
    use pretty_assertions::assert_eq;

    fn protocol(namespace: &str, minor: u32, schema_id: u8, priority: u8) -> AppProtocol {
        AppProtocol {
            protocol_namespace: namespace.to_string(),
            version_number_major: 1,
            version_number_minor: minor,
            schema_id,
            priority,
        }
    }

    #[test]
    fn test_selects_highest_priority_dc_protocol() {
        let req = SupportedAppProtocolRequest {
            app_protocol: vec![
                protocol("urn:iso:15118:2:2013:MsgDef", 0, 1, 1),
                protocol(ISO15118_20_DC_NAMESPACE, 0, 2, 3),
                protocol(ISO15118_20_DC_NAMESPACE, 1, 3, 2),
            ],
        };

        let (res, selected) = handle_request(&req);
        assert_eq!(
            res.response_code,
            AppProtocolResponseCode::OkSuccessfulNegotiationWithMinorDeviation
        );
        assert_eq!(res.schema_id, Some(3));
        assert_eq!(selected, Some(ISO15118_20_DC_NAMESPACE));
    }

    #[test]
    fn test_no_matching_protocol() {
        let req = SupportedAppProtocolRequest {
            app_protocol: vec![protocol("urn:din:70121:2012:MsgDef", 0, 1, 1)],
        };
        let (res, selected) = handle_request(&req);
        assert_eq!(res.response_code, AppProtocolResponseCode::FailedNoNegotiation);
        assert_eq!(res.schema_id, None);
        assert!(selected.is_none());
    }

    #[test]
    fn test_handshake_moves_to_session_setup() {
        let mut ctx = context();
        let mut state = SupportedAppProtocol;
        set_request(
            &ctx,
            SupportedAppProtocolRequest {
                app_protocol: vec![protocol(ISO15118_20_DC_NAMESPACE, 0, 1, 1)],
            },
        );

        let result = state.feed(&mut ctx, Event::V2gtpMessage);

        assert_eq!(result.new_state_id(), Some(StateId::SessionSetup));
        assert_eq!(ctx.ev_information.selected_protocol, ISO15118_20_DC_NAMESPACE);
        match take_response(&ctx) {
            Some(Response::SupportedAppProtocol(res)) => {
                assert_eq!(res.response_code, AppProtocolResponseCode::OkSuccessfulNegotiation);
                assert_eq!(res.schema_id, Some(1));
            }
            other => panic!("unexpected response {:?}", other),
        }
    }

    #[test]
    fn test_failed_negotiation_stops_session() {
        let mut ctx = context();
        let mut state = SupportedAppProtocol;
        set_request(&ctx, SupportedAppProtocolRequest::default());

        let result = state.feed(&mut ctx, Event::V2gtpMessage);

        assert!(result.new_state.is_none());
        assert!(ctx.session_stopped);
        assert!(take_response(&ctx).is_some());
    }
}
