//! Transport boundary: V2GTP framing, the response buffer and the
//! per-connection session task

mod connection;
mod output_view;
pub mod v2gtp;

pub use connection::{serve_session, ConnectionConfig, SessionSummary};
pub use output_view::StreamOutputView;
pub use v2gtp::{PayloadType, V2gtpError, V2gtpHeader, V2GTP_HEADER_LENGTH};
