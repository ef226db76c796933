//! example-evse - EVSE simulator library
//!
//! # Modules
//!
//! - [`config`] - Server, charger setup and simulator configuration
//! - [`simulator`] - Simulated power electronics answering session signals

pub mod config;
pub mod simulator;

pub use config::{EvseConfig, ServerConfig, SimulatorConfig};
pub use simulator::{HardwareSimulator, OutputState};
