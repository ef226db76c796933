//! Integration surface of a charging session (feedback and logging)

pub mod feedback;
mod logger;

pub use feedback::{Callbacks, Feedback, Signal};
pub use logger::{Direction, SessionLogger};
