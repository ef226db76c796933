use super::{pull_expected, validate_and_setup_header, Event, StateHandler, StateId, StateResult};
use crate::d20::control_event::PresentVoltageCurrent;
use crate::d20::{Context, Session};
use crate::message::{
    response_with_code, DcWeldingDetectionRequest, DcWeldingDetectionResponse, MessageType,
    Request, ResponseCode,
};

pub fn handle_request(
    req: &DcWeldingDetectionRequest,
    session: &Session,
    present_voltage: f32,
) -> DcWeldingDetectionResponse {
    let mut res = DcWeldingDetectionResponse::default();

    if !validate_and_setup_header(&mut res.header, session, &req.header) {
        return response_with_code(res, ResponseCode::FailedUnknownSession);
    }

    res.present_voltage = present_voltage.into();
    response_with_code(res, ResponseCode::Ok)
}

#[derive(Debug, Default)]
pub struct DcWeldingDetection {
    present: PresentVoltageCurrent,
}

impl DcWeldingDetection {
    pub fn new(present: PresentVoltageCurrent) -> Self {
        Self { present }
    }
}

impl StateHandler for DcWeldingDetection {
    const ID: StateId = StateId::DcWeldingDetection;

    fn feed(&mut self, ctx: &mut Context, ev: Event) -> StateResult {
        match ev {
            Event::ControlMessage => match ctx.get_control_event::<PresentVoltageCurrent>() {
                Some(present) => {
                    self.present = *present;
                    StateResult::handled()
                }
                None => StateResult::unhandled(),
            },
            Event::V2gtpMessage => {
                let Some(Request::DcWeldingDetection(req)) =
                    pull_expected(ctx, &[MessageType::DcWeldingDetectionReq])
                else {
                    return StateResult::unhandled();
                };

                let res = handle_request(&req, &ctx.session, self.present.voltage);
                ctx.respond(res);
                StateResult::handled()
            }
            _ => StateResult::unhandled(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::d20::context::test_support::{context, take_response};
    use crate::d20::control_event::ControlEvent;
    use crate::d20::state::test_support::{header, set_request};
    use crate::message::{Processing, Response};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_answers_tracked_voltage() {
        let mut ctx = context();
        let mut state = DcWeldingDetection::new(PresentVoltageCurrent {
            voltage: 400.0,
            current: 0.0,
        });

        ctx.set_control_event(Some(ControlEvent::from(PresentVoltageCurrent {
            voltage: 12.5,
            current: 0.0,
        })));
        assert!(!state.feed(&mut ctx, Event::ControlMessage).unhandled);
        ctx.set_control_event(None);

        for _ in 0..2 {
            set_request(
                &ctx,
                DcWeldingDetectionRequest {
                    header: header(&ctx),
                    processing: Processing::Ongoing,
                },
            );
            let result = state.feed(&mut ctx, Event::V2gtpMessage);
            assert!(result.new_state.is_none());
            match take_response(&ctx) {
                Some(Response::DcWeldingDetection(res)) => {
                    assert_eq!(res.response_code, ResponseCode::Ok);
                    assert_eq!(res.present_voltage.to_float(), 12.5);
                }
                other => panic!("unexpected response {:?}", other),
            }
        }
    }

    #[test]
    fn test_unknown_session() {
        let session = Session::new();
        let res = handle_request(&DcWeldingDetectionRequest::default(), &session, 0.0);
        assert_eq!(res.response_code, ResponseCode::FailedUnknownSession);
    }
}
