//! iso15118 - ISO 15118-20 EVSE session controller
//!
//! This crate implements the charger side of an ISO 15118-20 DC charging
//! session (the "d20" state machine): protocol negotiation, session setup,
//! authorization, service discovery and selection, charge parameter
//! discovery, scheduling, cable check, pre-charge, power delivery, the
//! charge loop, welding detection and session stop.
//!
//! The pieces, from the wire inwards:
//!
//! - [`io`]: V2GTP framing and the per-connection transport task
//! - [`message`]: typed requests/responses and the body codec seam
//! - [`d20`]: message exchange, control events, context, states and the
//!   session controller
//! - [`session`]: feedback callbacks and session scoped logging

pub mod d20;
pub mod error;
pub mod io;
pub mod message;
pub mod session;

pub use d20::{
    ControlEvent, ControlEventQueue, ControlEventSender, EvseSetupConfig, MessageExchange,
    SessionConfig, SessionController,
};
pub use error::{Iso15118Error, Iso15118Result};
pub use io::{serve_session, ConnectionConfig, SessionSummary};
