//! V2GTP framing
//!
//! Every message between EV and EVSE is prefixed with an 8 byte header:
//! protocol version, its bitwise inverse, the payload type and the payload
//! length (both big endian).

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const V2GTP_HEADER_LENGTH: usize = 8;
pub const V2GTP_VERSION: u8 = 0x01;
pub const V2GTP_INVERSE_VERSION: u8 = 0xFE;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum V2gtpError {
    #[error("Incomplete header: {0} bytes")]
    IncompleteHeader(usize),

    #[error("Invalid protocol version {version:#04x}/{inverse:#04x}")]
    InvalidVersion { version: u8, inverse: u8 },

    #[error("Unknown payload type {0:#06x}")]
    UnknownPayloadType(u16),

    #[error("Payload too large: {length} bytes (max {max})")]
    PayloadTooLarge { length: u32, max: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PayloadType {
    Sap,
    Part20Main,
    Part20Ac,
    Part20Dc,
    Part20Acdp,
    Part20Wpt,
    Part20ScheduleRenegotiation,
    Part20MeteringConfirmation,
    Part20AcdpSystemStatus,
    Part20ParkingStatus,
    SdpRequest,
    SdpResponse,
}

impl PayloadType {
    pub fn as_u16(self) -> u16 {
        match self {
            Self::Sap => 0x8001,
            Self::Part20Main => 0x8002,
            Self::Part20Ac => 0x8003,
            Self::Part20Dc => 0x8004,
            Self::Part20Acdp => 0x8005,
            Self::Part20Wpt => 0x8006,
            Self::Part20ScheduleRenegotiation => 0x8100,
            Self::Part20MeteringConfirmation => 0x8101,
            Self::Part20AcdpSystemStatus => 0x8102,
            Self::Part20ParkingStatus => 0x8103,
            Self::SdpRequest => 0x9000,
            Self::SdpResponse => 0x9001,
        }
    }
}

impl TryFrom<u16> for PayloadType {
    type Error = V2gtpError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        let payload_type = match value {
            0x8001 => Self::Sap,
            0x8002 => Self::Part20Main,
            0x8003 => Self::Part20Ac,
            0x8004 => Self::Part20Dc,
            0x8005 => Self::Part20Acdp,
            0x8006 => Self::Part20Wpt,
            0x8100 => Self::Part20ScheduleRenegotiation,
            0x8101 => Self::Part20MeteringConfirmation,
            0x8102 => Self::Part20AcdpSystemStatus,
            0x8103 => Self::Part20ParkingStatus,
            0x9000 => Self::SdpRequest,
            0x9001 => Self::SdpResponse,
            other => return Err(V2gtpError::UnknownPayloadType(other)),
        };
        Ok(payload_type)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct V2gtpHeader {
    pub payload_type: PayloadType,
    pub payload_length: u32,
}

impl V2gtpHeader {
    pub fn new(payload_type: PayloadType, payload_length: u32) -> Self {
        Self {
            payload_type,
            payload_length,
        }
    }

    pub fn encode(&self) -> [u8; V2GTP_HEADER_LENGTH] {
        let mut header = [0u8; V2GTP_HEADER_LENGTH];
        let mut out = &mut header[..];
        out.put_u8(V2GTP_VERSION);
        out.put_u8(V2GTP_INVERSE_VERSION);
        out.put_u16(self.payload_type.as_u16());
        out.put_u32(self.payload_length);
        header
    }

    /// Parse a header, rejecting payloads above `max_payload_length`
    pub fn decode(mut data: &[u8], max_payload_length: u32) -> Result<Self, V2gtpError> {
        if data.len() < V2GTP_HEADER_LENGTH {
            return Err(V2gtpError::IncompleteHeader(data.len()));
        }

        let version = data.get_u8();
        let inverse = data.get_u8();
        if version != V2GTP_VERSION || inverse != V2GTP_INVERSE_VERSION {
            return Err(V2gtpError::InvalidVersion { version, inverse });
        }

        let payload_type = PayloadType::try_from(data.get_u16())?;
        let payload_length = data.get_u32();
        if payload_length > max_payload_length {
            return Err(V2gtpError::PayloadTooLarge {
                length: payload_length,
                max: max_payload_length,
            });
        }

        Ok(Self {
            payload_type,
            payload_length,
        })
    }
}

/// Frame a payload (header + body)
pub fn frame(payload_type: PayloadType, payload: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(V2GTP_HEADER_LENGTH + payload.len());
    buf.put_slice(&V2gtpHeader::new(payload_type, payload.len() as u32).encode());
    buf.put_slice(payload);
    buf.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_header_layout() {
        let header = V2gtpHeader::new(PayloadType::Part20Dc, 0x0102);
        assert_eq!(
            header.encode(),
            [0x01, 0xFE, 0x80, 0x04, 0x00, 0x00, 0x01, 0x02]
        );
    }

    #[test]
    fn test_header_decode() {
        let data = [0x01, 0xFE, 0x80, 0x01, 0x00, 0x00, 0x00, 0x2A, 0xFF];
        let header = V2gtpHeader::decode(&data, 1024).unwrap();
        assert_eq!(header.payload_type, PayloadType::Sap);
        assert_eq!(header.payload_length, 42);
    }

    #[rstest]
    #[case(&[0x01, 0xFE, 0x80], V2gtpError::IncompleteHeader(3))]
    #[case(&[0x02, 0xFD, 0x80, 0x02, 0, 0, 0, 0], V2gtpError::InvalidVersion { version: 0x02, inverse: 0xFD })]
    #[case(&[0x01, 0xFE, 0x12, 0x34, 0, 0, 0, 0], V2gtpError::UnknownPayloadType(0x1234))]
    #[case(&[0x01, 0xFE, 0x80, 0x02, 0, 0, 0x10, 0], V2gtpError::PayloadTooLarge { length: 4096, max: 1024 })]
    fn test_header_decode_errors(#[case] data: &[u8], #[case] expected: V2gtpError) {
        assert_eq!(V2gtpHeader::decode(data, 1024).unwrap_err(), expected);
    }

    #[test]
    fn test_payload_type_values() {
        for value in [0x8001, 0x8002, 0x8004, 0x8100, 0x8103, 0x9000, 0x9001] {
            assert_eq!(PayloadType::try_from(value).unwrap().as_u16(), value);
        }
    }

    #[test]
    fn test_frame() {
        let framed = frame(PayloadType::Part20Main, b"abc");
        assert_eq!(framed.len(), V2GTP_HEADER_LENGTH + 3);
        assert_eq!(&framed[..4], &[0x01, 0xFE, 0x80, 0x02]);
        assert_eq!(&framed[8..], b"abc");
    }
}
