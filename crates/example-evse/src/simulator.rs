//! Simulated charger hardware
//!
//! Answers the signals of one session with control events, the way power
//! electronics and an authorization backend would: authorization after a
//! delay, isolation monitoring after a delay, a voltage ramp towards the
//! requested pre-charge target and down again when the contactors open.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use iso15118::d20::control_event::{
    AuthorizationResponse, CableCheckFinished, PresentVoltageCurrent, StopCharging,
};
use iso15118::d20::ControlEventSender;
use iso15118::session::{Callbacks, Signal};

use crate::config::SimulatorConfig;

/// Power electronics state shared with the ramp task
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct OutputState {
    pub present_voltage: f32,
    pub target_voltage: f32,
    pub ramping: bool,
}

impl OutputState {
    /// Move one step towards the target; true once it is reached
    fn step(&mut self, step: f32) -> bool {
        let diff = self.target_voltage - self.present_voltage;
        if diff.abs() <= step {
            self.present_voltage = self.target_voltage;
            return true;
        }
        self.present_voltage += step.copysign(diff);
        false
    }
}

#[derive(Debug, Clone)]
pub struct HardwareSimulator {
    config: SimulatorConfig,
    tx: ControlEventSender,
    output: Arc<Mutex<OutputState>>,
    runtime: Handle,
}

impl HardwareSimulator {
    /// Must be created inside a tokio runtime
    pub fn new(config: SimulatorConfig, tx: ControlEventSender) -> Self {
        Self {
            config,
            tx,
            output: Arc::new(Mutex::new(OutputState::default())),
            runtime: Handle::current(),
        }
    }

    pub fn output(&self) -> OutputState {
        *self.output.lock()
    }

    /// Feedback callbacks wired to this simulator
    pub fn callbacks(&self) -> Callbacks {
        let on_signal = self.clone();
        let on_target = self.clone();

        Callbacks {
            signal: Some(Box::new(move |signal| on_signal.handle_signal(signal))),
            dc_pre_charge_target_voltage: Some(Box::new(move |voltage| on_target.set_target(voltage))),
            evccid: Some(Box::new(|evccid| info!(%evccid, "EV connected"))),
            selected_protocol: Some(Box::new(|protocol| info!(%protocol, "Protocol negotiated"))),
            dc_max_limits: Some(Box::new(|limits| {
                info!(
                    voltage = limits.voltage,
                    current = limits.current,
                    power = limits.power,
                    "EV maximum limits"
                )
            })),
            dc_charge_loop_req: Some(Box::new(|req| debug!(?req, "Charge loop request"))),
            v2g_message: Some(Box::new(|msg_type| debug!(%msg_type, "V2G message"))),
            response_code: Some(Box::new(|code| {
                if code.is_failed() {
                    warn!(?code, "Failed response");
                }
            })),
            ..Default::default()
        }
    }

    fn handle_signal(&self, signal: Signal) {
        debug!(?signal, "Signal");
        match signal {
            Signal::RequireAuthEim => {
                let decision = AuthorizationResponse(self.config.authorize);
                self.push_after(self.config.authorization_delay_ms, decision);
            }
            Signal::StartCableCheck => {
                self.push_after(self.config.cable_check_delay_ms, CableCheckFinished(true));
            }
            Signal::PreChargeStarted => self.start_ramp(),
            Signal::ChargeLoopStarted => {
                if let Some(duration_ms) = self.config.charge_duration_ms {
                    self.push_after(duration_ms, StopCharging(true));
                }
            }
            Signal::DcOpenContactor => {
                info!("Contactors open");
                self.set_target(0.0);
                self.start_ramp();
            }
            Signal::DlinkTerminate | Signal::DlinkPause | Signal::DlinkError => {
                info!(?signal, "Data link released");
            }
            Signal::SetupFinished | Signal::ChargeLoopFinished => {}
        }
    }

    fn set_target(&self, voltage: f32) {
        self.output.lock().target_voltage = voltage;
    }

    fn push_after<E>(&self, delay_ms: u64, event: E)
    where
        E: Into<iso15118::ControlEvent> + Send + 'static,
    {
        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            if let Err(e) = tx.push(event) {
                debug!(%e, "Session gone, event dropped");
            }
        });
    }

    fn start_ramp(&self) {
        {
            let mut output = self.output.lock();
            if output.ramping {
                return;
            }
            output.ramping = true;
        }

        let output = self.output.clone();
        let tx = self.tx.clone();
        let step = self.config.voltage_ramp_step_v;
        let interval = Duration::from_millis(self.config.ramp_interval_ms);

        self.runtime.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let (voltage, reached) = {
                    let mut output = output.lock();
                    let reached = output.step(step);
                    if reached {
                        output.ramping = false;
                    }
                    (output.present_voltage, reached)
                };

                if tx
                    .push(PresentVoltageCurrent {
                        voltage,
                        current: 0.0,
                    })
                    .is_err()
                {
                    output.lock().ramping = false;
                    break;
                }
                if reached {
                    debug!(voltage, "Ramp finished");
                    break;
                }
            }
        });
    }
}
