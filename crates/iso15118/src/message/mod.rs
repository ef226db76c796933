//! ISO 15118-20 message model
//!
//! Every request and response of the DC charging flow is a plain struct.
//! [`Request`] and [`Response`] are the closed sum types handed across the
//! message exchange; [`MessageType`] is the tag that travels with them and
//! maps onto the V2GTP payload type.

pub mod app_protocol;
mod codec;
pub mod common;
pub mod datatypes;
pub mod dc;

pub use app_protocol::*;
pub use codec::{CodecError, JsonCodec, MessageCodec};
pub use common::*;
pub use datatypes::*;
pub use dc::*;

use serde::{Deserialize, Serialize};

use crate::io::PayloadType;

/// Tag identifying a concrete message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    SupportedAppProtocolReq,
    SupportedAppProtocolRes,
    SessionSetupReq,
    SessionSetupRes,
    AuthorizationSetupReq,
    AuthorizationSetupRes,
    AuthorizationReq,
    AuthorizationRes,
    ServiceDiscoveryReq,
    ServiceDiscoveryRes,
    ServiceDetailReq,
    ServiceDetailRes,
    ServiceSelectionReq,
    ServiceSelectionRes,
    DcChargeParameterDiscoveryReq,
    DcChargeParameterDiscoveryRes,
    ScheduleExchangeReq,
    ScheduleExchangeRes,
    DcCableCheckReq,
    DcCableCheckRes,
    DcPreChargeReq,
    DcPreChargeRes,
    PowerDeliveryReq,
    PowerDeliveryRes,
    DcChargeLoopReq,
    DcChargeLoopRes,
    DcWeldingDetectionReq,
    DcWeldingDetectionRes,
    SessionStopReq,
    SessionStopRes,
}

impl MessageType {
    /// V2GTP payload type the message is framed with
    pub fn payload_type(self) -> PayloadType {
        use MessageType::*;
        match self {
            SupportedAppProtocolReq | SupportedAppProtocolRes => PayloadType::Sap,
            DcChargeParameterDiscoveryReq
            | DcChargeParameterDiscoveryRes
            | DcCableCheckReq
            | DcCableCheckRes
            | DcPreChargeReq
            | DcPreChargeRes
            | DcChargeLoopReq
            | DcChargeLoopRes
            | DcWeldingDetectionReq
            | DcWeldingDetectionRes => PayloadType::Part20Dc,
            _ => PayloadType::Part20Main,
        }
    }

    /// Response type answering this request type
    pub fn response_type(self) -> Option<MessageType> {
        use MessageType::*;
        let res = match self {
            SupportedAppProtocolReq => SupportedAppProtocolRes,
            SessionSetupReq => SessionSetupRes,
            AuthorizationSetupReq => AuthorizationSetupRes,
            AuthorizationReq => AuthorizationRes,
            ServiceDiscoveryReq => ServiceDiscoveryRes,
            ServiceDetailReq => ServiceDetailRes,
            ServiceSelectionReq => ServiceSelectionRes,
            DcChargeParameterDiscoveryReq => DcChargeParameterDiscoveryRes,
            ScheduleExchangeReq => ScheduleExchangeRes,
            DcCableCheckReq => DcCableCheckRes,
            DcPreChargeReq => DcPreChargeRes,
            PowerDeliveryReq => PowerDeliveryRes,
            DcChargeLoopReq => DcChargeLoopRes,
            DcWeldingDetectionReq => DcWeldingDetectionRes,
            SessionStopReq => SessionStopRes,
            _ => return None,
        };
        Some(res)
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

macro_rules! message_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident($ty:ty) => $tag:ident),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        #[serde(tag = "type", content = "body")]
        pub enum $name {
            $($variant($ty)),*
        }

        impl $name {
            pub fn message_type(&self) -> MessageType {
                match self {
                    $(Self::$variant(_) => MessageType::$tag),*
                }
            }

            pub fn payload_type(&self) -> PayloadType {
                self.message_type().payload_type()
            }
        }

        $(
            impl From<$ty> for $name {
                fn from(msg: $ty) -> Self {
                    Self::$variant(msg)
                }
            }
        )*
    };
}

message_enum! {
    /// Decoded inbound (EV to EVSE) message
    Request {
        SupportedAppProtocol(SupportedAppProtocolRequest) => SupportedAppProtocolReq,
        SessionSetup(SessionSetupRequest) => SessionSetupReq,
        AuthorizationSetup(AuthorizationSetupRequest) => AuthorizationSetupReq,
        Authorization(AuthorizationRequest) => AuthorizationReq,
        ServiceDiscovery(ServiceDiscoveryRequest) => ServiceDiscoveryReq,
        ServiceDetail(ServiceDetailRequest) => ServiceDetailReq,
        ServiceSelection(ServiceSelectionRequest) => ServiceSelectionReq,
        DcChargeParameterDiscovery(DcChargeParameterDiscoveryRequest) => DcChargeParameterDiscoveryReq,
        ScheduleExchange(ScheduleExchangeRequest) => ScheduleExchangeReq,
        DcCableCheck(DcCableCheckRequest) => DcCableCheckReq,
        DcPreCharge(DcPreChargeRequest) => DcPreChargeReq,
        PowerDelivery(PowerDeliveryRequest) => PowerDeliveryReq,
        DcChargeLoop(DcChargeLoopRequest) => DcChargeLoopReq,
        DcWeldingDetection(DcWeldingDetectionRequest) => DcWeldingDetectionReq,
        SessionStop(SessionStopRequest) => SessionStopReq,
    }
}

message_enum! {
    /// Outbound (EVSE to EV) message
    Response {
        SupportedAppProtocol(SupportedAppProtocolResponse) => SupportedAppProtocolRes,
        SessionSetup(SessionSetupResponse) => SessionSetupRes,
        AuthorizationSetup(AuthorizationSetupResponse) => AuthorizationSetupRes,
        Authorization(AuthorizationResponse) => AuthorizationRes,
        ServiceDiscovery(ServiceDiscoveryResponse) => ServiceDiscoveryRes,
        ServiceDetail(ServiceDetailResponse) => ServiceDetailRes,
        ServiceSelection(ServiceSelectionResponse) => ServiceSelectionRes,
        DcChargeParameterDiscovery(DcChargeParameterDiscoveryResponse) => DcChargeParameterDiscoveryRes,
        ScheduleExchange(ScheduleExchangeResponse) => ScheduleExchangeRes,
        DcCableCheck(DcCableCheckResponse) => DcCableCheckRes,
        DcPreCharge(DcPreChargeResponse) => DcPreChargeRes,
        PowerDelivery(PowerDeliveryResponse) => PowerDeliveryRes,
        DcChargeLoop(DcChargeLoopResponse) => DcChargeLoopRes,
        DcWeldingDetection(DcWeldingDetectionResponse) => DcWeldingDetectionRes,
        SessionStop(SessionStopResponse) => SessionStopRes,
    }
}

/// Part 20 response carrying a header and a response code
pub trait ResponseMessage: Default + Into<Response> {
    fn header_mut(&mut self) -> &mut Header;
    fn response_code(&self) -> ResponseCode;
    fn set_response_code(&mut self, code: ResponseCode);
}

macro_rules! response_message {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ResponseMessage for $ty {
                fn header_mut(&mut self) -> &mut Header {
                    &mut self.header
                }

                fn response_code(&self) -> ResponseCode {
                    self.response_code
                }

                fn set_response_code(&mut self, code: ResponseCode) {
                    self.response_code = code;
                }
            }
        )*
    };
}

response_message!(
    SessionSetupResponse,
    AuthorizationSetupResponse,
    AuthorizationResponse,
    ServiceDiscoveryResponse,
    ServiceDetailResponse,
    ServiceSelectionResponse,
    DcChargeParameterDiscoveryResponse,
    ScheduleExchangeResponse,
    DcCableCheckResponse,
    DcPreChargeResponse,
    PowerDeliveryResponse,
    DcChargeLoopResponse,
    DcWeldingDetectionResponse,
    SessionStopResponse,
);

/// Set the response code and return the message
pub fn response_with_code<T: ResponseMessage>(mut res: T, code: ResponseCode) -> T {
    res.set_response_code(code);
    res
}

impl Request {
    /// Message header; the app protocol handshake carries none
    pub fn header(&self) -> Option<&Header> {
        let header = match self {
            Self::SupportedAppProtocol(_) => return None,
            Self::SessionSetup(m) => &m.header,
            Self::AuthorizationSetup(m) => &m.header,
            Self::Authorization(m) => &m.header,
            Self::ServiceDiscovery(m) => &m.header,
            Self::ServiceDetail(m) => &m.header,
            Self::ServiceSelection(m) => &m.header,
            Self::DcChargeParameterDiscovery(m) => &m.header,
            Self::ScheduleExchange(m) => &m.header,
            Self::DcCableCheck(m) => &m.header,
            Self::DcPreCharge(m) => &m.header,
            Self::PowerDelivery(m) => &m.header,
            Self::DcChargeLoop(m) => &m.header,
            Self::DcWeldingDetection(m) => &m.header,
            Self::SessionStop(m) => &m.header,
        };
        Some(header)
    }
}

impl Response {
    /// Response code; `None` for the app protocol handshake
    pub fn response_code(&self) -> Option<ResponseCode> {
        let code = match self {
            Self::SupportedAppProtocol(_) => return None,
            Self::SessionSetup(m) => m.response_code,
            Self::AuthorizationSetup(m) => m.response_code,
            Self::Authorization(m) => m.response_code,
            Self::ServiceDiscovery(m) => m.response_code,
            Self::ServiceDetail(m) => m.response_code,
            Self::ServiceSelection(m) => m.response_code,
            Self::DcChargeParameterDiscovery(m) => m.response_code,
            Self::ScheduleExchange(m) => m.response_code,
            Self::DcCableCheck(m) => m.response_code,
            Self::DcPreCharge(m) => m.response_code,
            Self::PowerDelivery(m) => m.response_code,
            Self::DcChargeLoop(m) => m.response_code,
            Self::DcWeldingDetection(m) => m.response_code,
            Self::SessionStop(m) => m.response_code,
        };
        Some(code)
    }

    /// Build the response answering `request_type` with only the header and
    /// response code filled in (mandatory fields keep their defaults).
    ///
    /// Used for sequence errors, where the request never reached a state
    /// able to compose a full answer.
    pub fn with_code(request_type: MessageType, header: Header, code: ResponseCode) -> Option<Self> {
        fn coded<T: ResponseMessage>(header: Header, code: ResponseCode) -> Response {
            let mut res = T::default();
            *res.header_mut() = header;
            response_with_code(res, code).into()
        }

        use MessageType::*;
        let response = match request_type.response_type()? {
            SupportedAppProtocolRes => Response::from(SupportedAppProtocolResponse::default()),
            SessionSetupRes => coded::<SessionSetupResponse>(header, code),
            AuthorizationSetupRes => coded::<AuthorizationSetupResponse>(header, code),
            AuthorizationRes => coded::<AuthorizationResponse>(header, code),
            ServiceDiscoveryRes => coded::<ServiceDiscoveryResponse>(header, code),
            ServiceDetailRes => coded::<ServiceDetailResponse>(header, code),
            ServiceSelectionRes => coded::<ServiceSelectionResponse>(header, code),
            DcChargeParameterDiscoveryRes => coded::<DcChargeParameterDiscoveryResponse>(header, code),
            ScheduleExchangeRes => coded::<ScheduleExchangeResponse>(header, code),
            DcCableCheckRes => coded::<DcCableCheckResponse>(header, code),
            DcPreChargeRes => coded::<DcPreChargeResponse>(header, code),
            PowerDeliveryRes => coded::<PowerDeliveryResponse>(header, code),
            DcChargeLoopRes => coded::<DcChargeLoopResponse>(header, code),
            DcWeldingDetectionRes => coded::<DcWeldingDetectionResponse>(header, code),
            SessionStopRes => coded::<SessionStopResponse>(header, code),
            _ => return None,
        };
        Some(response)
    }
}
