//! Control events
//!
//! Out-of-band signals from hardware and energy management into the session
//! controller. Producers hold a cloneable [`ControlEventSender`]; the
//! controller owns the single [`ControlEventQueue`].

use thiserror::Error;
use tokio::sync::mpsc;

pub use super::config::DcTransferLimits;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ControlEventError {
    #[error("Control event queue closed")]
    QueueClosed,
}

/// Result of the isolation monitoring started with `START_CABLE_CHECK`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CableCheckFinished(pub bool);

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PresentVoltageCurrent {
    pub voltage: f32,
    pub current: f32,
}

/// Decision on an EIM/PnC authorization request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthorizationResponse(pub bool);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopCharging(pub bool);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PauseCharging(pub bool);

/// Dynamic mode targets. `departure_time` is absolute (seconds since epoch).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateDynamicModeParameters {
    pub departure_time: Option<u64>,
    pub target_soc: Option<i8>,
    pub min_soc: Option<i8>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ControlEvent {
    CableCheckFinished(CableCheckFinished),
    PresentVoltageCurrent(PresentVoltageCurrent),
    AuthorizationResponse(AuthorizationResponse),
    StopCharging(StopCharging),
    PauseCharging(PauseCharging),
    DcTransferLimits(DcTransferLimits),
    UpdateDynamicModeParameters(UpdateDynamicModeParameters),
}

/// Typed, fallible view into a [`ControlEvent`]
pub trait ControlEventKind: Sized {
    fn from_event(event: &ControlEvent) -> Option<&Self>;
}

macro_rules! control_event_kind {
    ($($variant:ident),* $(,)?) => {
        $(
            impl ControlEventKind for $variant {
                fn from_event(event: &ControlEvent) -> Option<&Self> {
                    match event {
                        ControlEvent::$variant(inner) => Some(inner),
                        _ => None,
                    }
                }
            }

            impl From<$variant> for ControlEvent {
                fn from(inner: $variant) -> Self {
                    ControlEvent::$variant(inner)
                }
            }
        )*
    };
}

control_event_kind!(
    CableCheckFinished,
    PresentVoltageCurrent,
    AuthorizationResponse,
    StopCharging,
    PauseCharging,
    DcTransferLimits,
    UpdateDynamicModeParameters,
);

impl ControlEvent {
    pub fn get<T: ControlEventKind>(&self) -> Option<&T> {
        T::from_event(self)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::CableCheckFinished(_) => "CableCheckFinished",
            Self::PresentVoltageCurrent(_) => "PresentVoltageCurrent",
            Self::AuthorizationResponse(_) => "AuthorizationResponse",
            Self::StopCharging(_) => "StopCharging",
            Self::PauseCharging(_) => "PauseCharging",
            Self::DcTransferLimits(_) => "DcTransferLimits",
            Self::UpdateDynamicModeParameters(_) => "UpdateDynamicModeParameters",
        }
    }
}

/// Create a connected sender/queue pair
pub fn channel() -> (ControlEventSender, ControlEventQueue) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ControlEventSender { tx }, ControlEventQueue { rx })
}

/// Producer handle, cloned per producer
#[derive(Debug, Clone)]
pub struct ControlEventSender {
    tx: mpsc::UnboundedSender<ControlEvent>,
}

impl ControlEventSender {
    /// Append an event at the tail of the queue
    pub fn push(&self, event: impl Into<ControlEvent>) -> Result<(), ControlEventError> {
        self.tx
            .send(event.into())
            .map_err(|_| ControlEventError::QueueClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer side, owned by the session controller
#[derive(Debug)]
pub struct ControlEventQueue {
    rx: mpsc::UnboundedReceiver<ControlEvent>,
}

impl ControlEventQueue {
    /// Remove and return the head without blocking
    pub fn pop(&mut self) -> Option<ControlEvent> {
        self.rx.try_recv().ok()
    }

    /// Wait for the next event; `None` once every sender is gone
    pub async fn recv(&mut self) -> Option<ControlEvent> {
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_fifo_per_producer() {
        let (tx, mut queue) = channel();
        tx.push(CableCheckFinished(true)).unwrap();
        tx.push(PresentVoltageCurrent {
            voltage: 400.0,
            current: 1.0,
        })
        .unwrap();
        tx.push(StopCharging(true)).unwrap();

        assert_eq!(queue.pop(), Some(ControlEvent::CableCheckFinished(CableCheckFinished(true))));
        assert_eq!(
            queue.pop().unwrap().name(),
            "PresentVoltageCurrent"
        );
        assert_eq!(queue.pop(), Some(ControlEvent::StopCharging(StopCharging(true))));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn test_push_after_queue_dropped() {
        let (tx, queue) = channel();
        drop(queue);
        assert!(tx.is_closed());
        assert_eq!(
            tx.push(AuthorizationResponse(true)),
            Err(ControlEventError::QueueClosed)
        );
    }

    #[test]
    fn test_typed_access() {
        let event = ControlEvent::from(PresentVoltageCurrent {
            voltage: 330.0,
            current: 2.5,
        });
        assert_eq!(event.get::<PresentVoltageCurrent>().map(|p| p.voltage), Some(330.0));
        assert!(event.get::<CableCheckFinished>().is_none());
        assert!(event.get::<StopCharging>().is_none());
    }

    #[tokio::test]
    async fn test_recv_from_cloned_senders() {
        let (tx, mut queue) = channel();
        let other = tx.clone();

        let handle = tokio::spawn(async move {
            other.push(PauseCharging(true)).unwrap();
        });
        handle.await.unwrap();

        assert_eq!(
            queue.recv().await,
            Some(ControlEvent::PauseCharging(PauseCharging(true)))
        );
        drop(tx);
        assert_eq!(queue.recv().await, None);
    }
}
