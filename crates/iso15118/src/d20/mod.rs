//! ISO 15118-20 session (d20)
//!
//! A session is driven by three inputs: decoded requests installed in the
//! [`MessageExchange`], control events from the charger hardware and timer
//! expiries. [`SessionController`] turns them into [`state::Event`]s for the
//! active state held by the [`Fsm`].

mod config;
mod context;
pub mod control_event;
mod controller;
mod fsm;
mod message_exchange;
pub mod session;
pub mod state;

pub use config::{
    ConfigError, ControlMobilityNeedsModes, DcBptParameterList, DcParameterList, DcTransferLimits,
    EvseSetupConfig, InternetParameterList, MinMax, ParkingParameterList, PowerCurrentLimits,
    SessionConfig, TimeoutConfig,
};
pub use context::{now, Context, TimerRequest};
pub use control_event::{
    channel, ControlEvent, ControlEventError, ControlEventQueue, ControlEventSender,
};
pub use controller::{SessionController, Wake};
pub use fsm::Fsm;
pub use message_exchange::{ExchangeError, MessageExchange, PendingResponse};
pub use session::{Session, SessionError};
