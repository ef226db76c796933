//! Message body codec
//!
//! The wire encoding of ISO 15118-20 is EXI. The session controller only needs
//! a codec that turns a [`Request`]/[`Response`] into a payload and back, so
//! the encoding sits behind [`MessageCodec`]. [`JsonCodec`] encodes message
//! bodies as JSON; it is what the simulator and the tests run on.

use thiserror::Error;

use super::{Request, Response};
use crate::io::PayloadType;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Output buffer too small: need {required} bytes, {available} available")]
    BufferTooSmall { required: usize, available: usize },

    #[error("Payload type mismatch: framed as {framed:?}, message is {actual:?}")]
    PayloadTypeMismatch {
        framed: PayloadType,
        actual: PayloadType,
    },

    #[error("Malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Encoder/decoder for message bodies
pub trait MessageCodec: Send + Sync + std::fmt::Debug {
    /// Decode an inbound request framed with `payload_type`
    fn decode_request(&self, payload_type: PayloadType, payload: &[u8]) -> Result<Request, CodecError>;

    /// Encode a response into `out`, returning the number of bytes written
    fn encode_response(&self, response: &Response, out: &mut [u8]) -> Result<usize, CodecError>;

    /// Encode a request (EV side)
    fn encode_request(&self, request: &Request) -> Result<Vec<u8>, CodecError>;

    /// Decode a response (EV side)
    fn decode_response(
        &self,
        payload_type: PayloadType,
        payload: &[u8],
    ) -> Result<Response, CodecError>;
}

/// JSON body codec
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

fn check_payload_type(framed: PayloadType, actual: PayloadType) -> Result<(), CodecError> {
    if framed != actual {
        return Err(CodecError::PayloadTypeMismatch { framed, actual });
    }
    Ok(())
}

impl MessageCodec for JsonCodec {
    fn decode_request(&self, payload_type: PayloadType, payload: &[u8]) -> Result<Request, CodecError> {
        let request: Request = serde_json::from_slice(payload)?;
        check_payload_type(payload_type, request.payload_type())?;
        Ok(request)
    }

    fn encode_response(&self, response: &Response, out: &mut [u8]) -> Result<usize, CodecError> {
        let encoded = serde_json::to_vec(response)?;
        if encoded.len() > out.len() {
            return Err(CodecError::BufferTooSmall {
                required: encoded.len(),
                available: out.len(),
            });
        }
        out[..encoded.len()].copy_from_slice(&encoded);
        Ok(encoded.len())
    }

    fn encode_request(&self, request: &Request) -> Result<Vec<u8>, CodecError> {
        Ok(serde_json::to_vec(request)?)
    }

    fn decode_response(
        &self,
        payload_type: PayloadType,
        payload: &[u8],
    ) -> Result<Response, CodecError> {
        let response: Response = serde_json::from_slice(payload)?;
        check_payload_type(payload_type, response.payload_type())?;
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{
        DcCableCheckResponse, Processing, ResponseCode, SessionSetupRequest, SessionStopRequest,
    };
    use pretty_assertions::assert_eq;

    #[test]
    fn test_encode_response_into_buffer() {
        let codec = JsonCodec;
        let response = Response::from(DcCableCheckResponse {
            response_code: ResponseCode::Ok,
            processing: Processing::Ongoing,
            ..Default::default()
        });

        let mut buffer = [0u8; 512];
        let size = codec.encode_response(&response, &mut buffer).unwrap();

        let decoded = codec
            .decode_response(PayloadType::Part20Dc, &buffer[..size])
            .unwrap();
        assert_eq!(decoded, response);
    }

    #[test]
    fn test_encode_response_buffer_too_small() {
        let codec = JsonCodec;
        let response = Response::from(DcCableCheckResponse::default());

        let mut buffer = [0u8; 8];
        let err = codec.encode_response(&response, &mut buffer).unwrap_err();
        assert!(matches!(err, CodecError::BufferTooSmall { available: 8, .. }));
        assert_eq!(buffer, [0u8; 8]);
    }

    #[test]
    fn test_decode_request_checks_payload_type() {
        let codec = JsonCodec;
        let payload = codec
            .encode_request(&SessionSetupRequest::default().into())
            .unwrap();

        assert!(codec.decode_request(PayloadType::Part20Main, &payload).is_ok());
        let err = codec
            .decode_request(PayloadType::Part20Dc, &payload)
            .unwrap_err();
        assert!(matches!(err, CodecError::PayloadTypeMismatch { .. }));
    }

    #[test]
    fn test_decode_request_malformed() {
        let codec = JsonCodec;
        let err = codec
            .decode_request(PayloadType::Part20Main, b"{\"type\":\"Unknown\"}")
            .unwrap_err();
        assert!(matches!(err, CodecError::Malformed(_)));

        let request: Request = SessionStopRequest::default().into();
        let payload = codec.encode_request(&request).unwrap();
        assert_eq!(
            codec.decode_request(PayloadType::Part20Main, &payload).unwrap(),
            request
        );
    }
}
