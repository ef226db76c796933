//! Crate level error type

use thiserror::Error;

use crate::d20::{ConfigError, ControlEventError, ExchangeError, SessionError};
use crate::io::V2gtpError;
use crate::message::CodecError;

/// Result type for transport level operations
pub type Iso15118Result<T> = Result<T, Iso15118Error>;

/// Everything that can end a session from outside the state machine
#[derive(Debug, Error)]
pub enum Iso15118Error {
    /// Malformed or oversized V2GTP frame
    #[error("V2GTP error: {0}")]
    V2gtp(#[from] V2gtpError),

    /// Payload could not be decoded or encoded
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// Request/response hand-over violated
    #[error("Message exchange error: {0}")]
    Exchange(#[from] ExchangeError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Control event error: {0}")]
    ControlEvent(#[from] ControlEventError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Socket failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
