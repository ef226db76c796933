//! Request/response hand-over between transport and session controller
//!
//! One round trip at a time: the transport installs a decoded request, the
//! active state pulls it and composes a response, the transport takes the
//! response exactly once.

use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tracing::debug;

use crate::io::{PayloadType, StreamOutputView};
use crate::message::{CodecError, JsonCodec, MessageCodec, MessageType, Request, Response};

#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("Previous response has not been consumed")]
    ResponseNotConsumed,

    #[error("A response is already pending")]
    ResponseAlreadyPending,

    #[error("Failed to encode response: {0}")]
    Codec(#[from] CodecError),
}

/// Response ready to be framed and sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingResponse {
    pub size: usize,
    pub payload_type: PayloadType,
    pub message_type: MessageType,
}

#[derive(Debug)]
pub struct MessageExchange {
    output: StreamOutputView,
    codec: Arc<dyn MessageCodec>,
    request: Mutex<Option<Request>>,
    response: Mutex<Option<PendingResponse>>,
}

impl MessageExchange {
    /// Exchange writing JSON encoded bodies into `output`
    pub fn new(output: StreamOutputView) -> Self {
        Self::with_codec(output, Arc::new(JsonCodec))
    }

    pub fn with_codec(output: StreamOutputView, codec: Arc<dyn MessageCodec>) -> Self {
        Self {
            output,
            codec,
            request: Mutex::new(None),
            response: Mutex::new(None),
        }
    }

    pub fn output(&self) -> &StreamOutputView {
        &self.output
    }

    pub fn codec(&self) -> &Arc<dyn MessageCodec> {
        &self.codec
    }

    /// Install a decoded request, superseding any unconsumed one
    pub fn set_request(&self, request: Request) -> Result<(), ExchangeError> {
        if self.response.lock().is_some() {
            return Err(ExchangeError::ResponseNotConsumed);
        }

        let mut slot = self.request.lock();
        if let Some(stale) = slot.replace(request) {
            debug!(msg_type = %stale.message_type(), "Superseded unconsumed request");
        }
        Ok(())
    }

    /// Take ownership of the pending request
    pub fn pull_request(&self) -> Option<Request> {
        self.request.lock().take()
    }

    pub fn peek_request_type(&self) -> Option<MessageType> {
        self.request.lock().as_ref().map(Request::message_type)
    }

    pub fn has_request(&self) -> bool {
        self.request.lock().is_some()
    }

    /// Serialize `response` into the output view and mark it available
    pub fn set_response<M: Into<Response>>(&self, response: M) -> Result<PendingResponse, ExchangeError> {
        let response = response.into();

        let mut slot = self.response.lock();
        if slot.is_some() {
            return Err(ExchangeError::ResponseAlreadyPending);
        }

        let size = self
            .output
            .write_payload(|out| self.codec.encode_response(&response, out))?;

        let pending = PendingResponse {
            size,
            payload_type: response.payload_type(),
            message_type: response.message_type(),
        };
        *slot = Some(pending);
        Ok(pending)
    }

    /// Read and clear the available flag in one step
    pub fn check_and_clear_response(&self) -> Option<PendingResponse> {
        self.response.lock().take()
    }
}
