//! Session states
//!
//! One state per protocol phase. Each state implements [`StateHandler`];
//! [`State`] is the closed set the FSM switches between. Rules that hold in
//! every phase (FAILED handling, runtime limit updates, StopCharging before
//! the charge loop, SessionStopReq hand-over) live in [`State::feed`].

mod authorization;
mod authorization_setup;
mod dc_cable_check;
mod dc_charge_loop;
mod dc_charge_parameter_discovery;
mod dc_pre_charge;
mod dc_welding_detection;
mod power_delivery;
mod schedule_exchange;
mod service_detail;
mod service_discovery;
mod service_selection;
mod session_setup;
mod session_stop;
mod supported_app_protocol;

pub use authorization::{Authorization, AuthorizationStatus};
pub use authorization_setup::AuthorizationSetup;
pub use dc_cable_check::DcCableCheck;
pub use dc_charge_loop::DcChargeLoop;
pub use dc_charge_parameter_discovery::DcChargeParameterDiscovery;
pub use dc_pre_charge::DcPreCharge;
pub use dc_welding_detection::DcWeldingDetection;
pub use power_delivery::PowerDelivery;
pub use schedule_exchange::ScheduleExchange;
pub use service_detail::ServiceDetail;
pub use service_discovery::ServiceDiscovery;
pub use service_selection::ServiceSelection;
pub use session_setup::SessionSetup;
pub use session_stop::SessionStop;
pub use supported_app_protocol::SupportedAppProtocol;

use super::context::{now, Context};
use super::control_event::{DcTransferLimits, StopCharging, UpdateDynamicModeParameters};
use super::session::Session;
use crate::message::{Header, MessageType, Request};

/// Event fed into the active state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Reset,
    V2gtpMessage,
    ControlMessage,
    Timeout,
    Failed,
}

/// Protocol phase identifiers, in DC phase order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StateId {
    SupportedAppProtocol,
    SessionSetup,
    AuthorizationSetup,
    Authorization,
    ServiceDiscovery,
    ServiceDetail,
    ServiceSelection,
    DcChargeParameterDiscovery,
    ScheduleExchange,
    DcCableCheck,
    DcPreCharge,
    PowerDelivery,
    DcChargeLoop,
    DcWeldingDetection,
    SessionStop,
}

impl StateId {
    pub fn name(self) -> &'static str {
        match self {
            Self::SupportedAppProtocol => "SupportedAppProtocol",
            Self::SessionSetup => "SessionSetup",
            Self::AuthorizationSetup => "AuthorizationSetup",
            Self::Authorization => "Authorization",
            Self::ServiceDiscovery => "ServiceDiscovery",
            Self::ServiceDetail => "ServiceDetail",
            Self::ServiceSelection => "ServiceSelection",
            Self::DcChargeParameterDiscovery => "DC_ChargeParameterDiscovery",
            Self::ScheduleExchange => "ScheduleExchange",
            Self::DcCableCheck => "DC_CableCheck",
            Self::DcPreCharge => "DC_PreCharge",
            Self::PowerDelivery => "PowerDelivery",
            Self::DcChargeLoop => "DC_ChargeLoop",
            Self::DcWeldingDetection => "DC_WeldingDetection",
            Self::SessionStop => "SessionStop",
        }
    }

    /// SessionStopReq is a valid request from Authorization onwards
    fn accepts_session_stop(self) -> bool {
        self >= Self::Authorization && self < Self::SessionStop
    }

    /// Phases before power delivery end the session on StopCharging(true)
    fn stops_on_stop_charging(self) -> bool {
        self < Self::PowerDelivery
    }
}

impl std::fmt::Display for StateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of feeding one event
#[derive(Debug, Default)]
pub struct StateResult {
    pub unhandled: bool,
    pub new_state: Option<State>,
}

impl StateResult {
    pub fn handled() -> Self {
        Self::default()
    }

    pub fn unhandled() -> Self {
        Self {
            unhandled: true,
            new_state: None,
        }
    }

    pub fn transition(state: impl Into<State>) -> Self {
        Self {
            unhandled: false,
            new_state: Some(state.into()),
        }
    }

    pub fn new_state_id(&self) -> Option<StateId> {
        self.new_state.as_ref().map(State::id)
    }
}

/// Behaviour of a single phase
pub trait StateHandler {
    const ID: StateId;

    /// Called once when the state becomes active
    fn enter(&mut self, ctx: &mut Context) {
        ctx.log.enter_state(Self::ID.name());
    }

    fn feed(&mut self, ctx: &mut Context, ev: Event) -> StateResult;

    fn leave(&mut self, _ctx: &mut Context) {}
}

macro_rules! states {
    ($($variant:ident),* $(,)?) => {
        #[derive(Debug)]
        pub enum State {
            $($variant($variant)),*
        }

        impl State {
            pub fn id(&self) -> StateId {
                match self {
                    $(Self::$variant(_) => StateId::$variant),*
                }
            }

            pub fn enter(&mut self, ctx: &mut Context) {
                match self {
                    $(Self::$variant(state) => state.enter(ctx)),*
                }
            }

            pub fn leave(&mut self, ctx: &mut Context) {
                match self {
                    $(Self::$variant(state) => state.leave(ctx)),*
                }
            }

            fn feed_phase(&mut self, ctx: &mut Context, ev: Event) -> StateResult {
                match self {
                    $(Self::$variant(state) => state.feed(ctx, ev)),*
                }
            }
        }

        $(
            impl From<$variant> for State {
                fn from(state: $variant) -> Self {
                    Self::$variant(state)
                }
            }
        )*
    };
}

states!(
    SupportedAppProtocol,
    SessionSetup,
    AuthorizationSetup,
    Authorization,
    ServiceDiscovery,
    ServiceDetail,
    ServiceSelection,
    DcChargeParameterDiscovery,
    ScheduleExchange,
    DcCableCheck,
    DcPreCharge,
    PowerDelivery,
    DcChargeLoop,
    DcWeldingDetection,
    SessionStop,
);

impl State {
    pub fn feed(&mut self, ctx: &mut Context, ev: Event) -> StateResult {
        let id = self.id();

        match ev {
            Event::Failed => {
                ctx.session_stopped = true;
                if id == StateId::SessionStop {
                    return StateResult::handled();
                }
                return StateResult::transition(SessionStop::default());
            }
            Event::ControlMessage => {
                if let Some(limits) = ctx.get_control_event::<DcTransferLimits>() {
                    ctx.dc_limits = *limits;
                    return StateResult::handled();
                }
                if let Some(parameters) = ctx.get_control_event::<UpdateDynamicModeParameters>() {
                    ctx.dynamic_mode_parameters = Some(*parameters);
                    return StateResult::handled();
                }
                if ctx.get_control_event::<StopCharging>() == Some(&StopCharging(true))
                    && id.stops_on_stop_charging()
                {
                    ctx.log.log(&format!("Charging stopped by the EVSE in {}", id));
                    ctx.session_stopped = true;
                    return StateResult::transition(SessionStop::default());
                }
            }
            Event::V2gtpMessage => {
                if ctx.peek_request_type() == Some(MessageType::SessionStopReq)
                    && id.accepts_session_stop()
                {
                    return StateResult::transition(SessionStop::default());
                }
            }
            Event::Reset | Event::Timeout => {}
        }

        self.feed_phase(ctx, ev)
    }
}

/// Take the pending request only if its type is one of `expected`
pub(crate) fn pull_expected(ctx: &Context, expected: &[MessageType]) -> Option<Request> {
    let msg_type = ctx.peek_request_type()?;
    if !expected.contains(&msg_type) {
        return None;
    }
    ctx.pull_request()
}

/// Fill the response header and check the request belongs to this session
pub(crate) fn validate_and_setup_header(header: &mut Header, session: &Session, request: &Header) -> bool {
    header.session_id = session.id();
    header.timestamp = now();
    request.session_id == session.id()
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::d20::context::test_support::{context, take_response};
    use crate::d20::control_event::{ControlEvent, PresentVoltageCurrent};
    use crate::message::{ResponseCode, SessionSetupRequest, SessionStopRequest};
    use rstest::rstest;

    fn all_states() -> Vec<State> {
        vec![
            SupportedAppProtocol::default().into(),
            SessionSetup::default().into(),
            AuthorizationSetup::default().into(),
            Authorization::default().into(),
            ServiceDiscovery::default().into(),
            ServiceDetail::default().into(),
            ServiceSelection::default().into(),
            DcChargeParameterDiscovery::default().into(),
            ScheduleExchange::default().into(),
            DcCableCheck::default().into(),
            DcPreCharge::default().into(),
            PowerDelivery::default().into(),
            DcChargeLoop::default().into(),
            DcWeldingDetection::default().into(),
            SessionStop::default().into(),
        ]
    }

    #[test]
    fn test_state_ids_are_distinct_and_ordered() {
        let ids: Vec<_> = all_states().iter().map(State::id).collect();
        assert_eq!(ids.len(), 15);
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_failed_event_moves_to_session_stop() {
        for mut state in all_states() {
            let mut ctx = context();
            let id = state.id();
            let result = state.feed(&mut ctx, Event::Failed);

            assert!(ctx.session_stopped, "{} did not stop the session", id);
            if id == StateId::SessionStop {
                assert!(result.new_state.is_none());
            } else {
                assert_eq!(result.new_state_id(), Some(StateId::SessionStop));
            }
        }
    }

    #[test]
    fn test_foreign_request_is_unhandled_and_not_consumed() {
        // SessionSetupReq only belongs to SessionSetup
        for mut state in all_states() {
            if state.id() == StateId::SessionSetup {
                continue;
            }
            let mut ctx = context();
            let session_before = ctx.session.id();
            set_request(
                &ctx,
                SessionSetupRequest {
                    header: header(&ctx),
                    evccid: "WMIV1234567890ABCDEX".into(),
                },
            );

            let result = state.feed(&mut ctx, Event::V2gtpMessage);
            let id = state.id();

            if id == StateId::SessionStop {
                // SessionStop answers every request with FAILED
                assert!(!result.unhandled);
                assert!(ctx.session_stopped);
                continue;
            }
            assert!(result.unhandled, "{} consumed a SessionSetupReq", id);
            assert!(result.new_state.is_none());
            assert_eq!(ctx.peek_request_type(), Some(MessageType::SessionSetupReq));
            assert!(take_response(&ctx).is_none());
            assert_eq!(ctx.session.id(), session_before);
            assert!(ctx.session.selected_services().is_none());
        }
    }

    #[rstest]
    #[case(StateId::SupportedAppProtocol, false)]
    #[case(StateId::SessionSetup, false)]
    #[case(StateId::AuthorizationSetup, false)]
    #[case(StateId::Authorization, true)]
    #[case(StateId::DcCableCheck, true)]
    #[case(StateId::DcChargeLoop, true)]
    #[case(StateId::DcWeldingDetection, true)]
    fn test_session_stop_request_hand_over(#[case] id: StateId, #[case] accepted: bool) {
        let mut state = all_states().into_iter().find(|s| s.id() == id).unwrap();
        let mut ctx = context();
        set_request(
            &ctx,
            SessionStopRequest {
                header: header(&ctx),
                ..Default::default()
            },
        );

        let result = state.feed(&mut ctx, Event::V2gtpMessage);

        if accepted {
            assert_eq!(result.new_state_id(), Some(StateId::SessionStop));
            assert_eq!(ctx.peek_request_type(), Some(MessageType::SessionStopReq));
        } else {
            assert!(result.unhandled);
        }
    }

    #[test]
    fn test_stop_charging_before_power_delivery() {
        for mut state in all_states() {
            let id = state.id();
            let mut ctx = context();
            ctx.set_control_event(Some(ControlEvent::from(StopCharging(true))));
            let result = state.feed(&mut ctx, Event::ControlMessage);

            if id < StateId::PowerDelivery {
                assert_eq!(result.new_state_id(), Some(StateId::SessionStop), "{}", id);
                assert!(ctx.session_stopped);
            } else {
                assert_ne!(result.new_state_id(), Some(StateId::SessionStop), "{}", id);
            }
            assert!(take_response(&ctx).is_none());
        }
    }

    #[test]
    fn test_limits_update_applies_in_any_phase() {
        let mut state = State::from(ServiceDiscovery::default());
        let mut ctx = context();
        let mut limits = ctx.dc_limits;
        limits.voltage.max = 500.0;
        ctx.set_control_event(Some(ControlEvent::from(limits)));

        let result = state.feed(&mut ctx, Event::ControlMessage);
        assert!(!result.unhandled);
        assert_eq!(ctx.dc_limits.voltage.max, 500.0);
    }

    #[test]
    fn test_stale_control_event_is_unhandled() {
        let mut state = State::from(ServiceDiscovery::default());
        let mut ctx = context();
        ctx.set_control_event(Some(ControlEvent::from(PresentVoltageCurrent {
            voltage: 400.0,
            current: 0.0,
        })));

        let result = state.feed(&mut ctx, Event::ControlMessage);
        assert!(result.unhandled);
        assert!(!ctx.session_stopped);
    }

    #[test]
    fn test_unknown_session_response() {
        let mut ctx = context();
        let mut res_header = Header::default();
        let foreign = Header {
            session_id: [0xAA; 8],
            timestamp: 0,
        };
        assert!(!validate_and_setup_header(&mut res_header, &ctx.session, &foreign));
        assert_eq!(res_header.session_id, ctx.session.id());

        ctx.respond(crate::message::response_with_code(
            crate::message::SessionStopResponse {
                header: res_header,
                ..Default::default()
            },
            ResponseCode::FailedUnknownSession,
        ));
        assert!(ctx.session_stopped);
    }
}
