//! SupportedAppProtocol handshake messages
//!
//! The handshake runs before any ISO 15118-20 message and is framed with
//! the SAP payload type.

use serde::{Deserialize, Serialize};

use super::datatypes::AppProtocol;

/// Namespace of the ISO 15118-20 DC schema
pub const ISO15118_20_DC_NAMESPACE: &str = "urn:iso:std:iso:15118:-20:DC";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SupportedAppProtocolRequest {
    pub app_protocol: Vec<AppProtocol>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppProtocolResponseCode {
    OkSuccessfulNegotiation,
    OkSuccessfulNegotiationWithMinorDeviation,
    #[default]
    FailedNoNegotiation,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SupportedAppProtocolResponse {
    pub response_code: AppProtocolResponseCode,
    pub schema_id: Option<u8>,
}
