//! Transport-owned output buffer
//!
//! The transport allocates one buffer per connection. The message exchange
//! serializes responses into the payload area behind the V2GTP header space,
//! the transport then writes the header in place and sends the frame.

use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;

use super::v2gtp::{PayloadType, V2gtpHeader, V2GTP_HEADER_LENGTH};

#[derive(Debug, Clone)]
pub struct StreamOutputView {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl StreamOutputView {
    /// Create a view able to hold `payload_capacity` payload bytes
    pub fn new(payload_capacity: usize) -> Self {
        Self {
            buffer: Arc::new(Mutex::new(vec![0u8; V2GTP_HEADER_LENGTH + payload_capacity])),
        }
    }

    pub fn payload_capacity(&self) -> usize {
        self.buffer.lock().len() - V2GTP_HEADER_LENGTH
    }

    /// Hand the payload area to `write`, which returns the number of bytes used
    pub fn write_payload<F, E>(&self, write: F) -> Result<usize, E>
    where
        F: FnOnce(&mut [u8]) -> Result<usize, E>,
    {
        let mut buffer = self.buffer.lock();
        write(&mut buffer[V2GTP_HEADER_LENGTH..])
    }

    /// Copy of the first `size` payload bytes
    pub fn payload(&self, size: usize) -> Bytes {
        let buffer = self.buffer.lock();
        let end = (V2GTP_HEADER_LENGTH + size).min(buffer.len());
        Bytes::copy_from_slice(&buffer[V2GTP_HEADER_LENGTH..end])
    }

    /// Write the V2GTP header in front of the payload and return the frame
    pub fn frame(&self, payload_type: PayloadType, size: usize) -> Bytes {
        let mut buffer = self.buffer.lock();
        let end = (V2GTP_HEADER_LENGTH + size).min(buffer.len());
        let header = V2gtpHeader::new(payload_type, (end - V2GTP_HEADER_LENGTH) as u32);
        buffer[..V2GTP_HEADER_LENGTH].copy_from_slice(&header.encode());
        Bytes::copy_from_slice(&buffer[..end])
    }
}
