//! Feedback surface
//!
//! States report externally observable progress through [`Feedback`]. The
//! integrator wires the callbacks it cares about; unset callbacks are no-ops.

use crate::message::{
    BptDynamicDcClReq, BptScheduledDcClReq, DcChargeLoopReqControlMode, DisplayParameters,
    DynamicDcClReq, MessageType, RationalNumber, ResponseCode, ScheduledDcClReq, ServiceCategory,
    ServiceParameterList, VasSelectedServiceList,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    RequireAuthEim,
    StartCableCheck,
    SetupFinished,
    PreChargeStarted,
    ChargeLoopStarted,
    ChargeLoopFinished,
    DcOpenContactor,
    DlinkTerminate,
    DlinkError,
    DlinkPause,
}

/// Values reported from every DC_ChargeLoopReq
#[derive(Debug, Clone, PartialEq)]
pub enum DcChargeLoopReq {
    ControlMode(DcChargeLoopReqControlMode),
    PresentVoltage(f32),
    MeterInfoRequested(bool),
    DisplayParameters(DisplayParameters),
}

impl From<DcChargeLoopReqControlMode> for DcChargeLoopReq {
    fn from(mode: DcChargeLoopReqControlMode) -> Self {
        Self::ControlMode(mode)
    }
}

impl From<ScheduledDcClReq> for DcChargeLoopReq {
    fn from(mode: ScheduledDcClReq) -> Self {
        Self::ControlMode(DcChargeLoopReqControlMode::Scheduled(mode))
    }
}

impl From<BptScheduledDcClReq> for DcChargeLoopReq {
    fn from(mode: BptScheduledDcClReq) -> Self {
        Self::ControlMode(DcChargeLoopReqControlMode::BptScheduled(mode))
    }
}

impl From<DynamicDcClReq> for DcChargeLoopReq {
    fn from(mode: DynamicDcClReq) -> Self {
        Self::ControlMode(DcChargeLoopReqControlMode::Dynamic(mode))
    }
}

impl From<BptDynamicDcClReq> for DcChargeLoopReq {
    fn from(mode: BptDynamicDcClReq) -> Self {
        Self::ControlMode(DcChargeLoopReqControlMode::BptDynamic(mode))
    }
}

impl From<RationalNumber> for DcChargeLoopReq {
    fn from(voltage: RationalNumber) -> Self {
        Self::PresentVoltage(voltage.to_float())
    }
}

impl From<bool> for DcChargeLoopReq {
    fn from(requested: bool) -> Self {
        Self::MeterInfoRequested(requested)
    }
}

impl From<DisplayParameters> for DcChargeLoopReq {
    fn from(parameters: DisplayParameters) -> Self {
        Self::DisplayParameters(parameters)
    }
}

/// EV maximum limits from ChargeParameterDiscovery
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DcMaximumLimits {
    pub voltage: f32,
    pub current: f32,
    pub power: f32,
}

/// What is known about the EV once service selection is done
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvInformation {
    pub evcc_id: String,
    pub selected_protocol: String,
    pub selected_energy_service: Option<ServiceCategory>,
}

type Callback<T> = Option<Box<dyn Fn(T) + Send + Sync>>;

#[derive(Default)]
pub struct Callbacks {
    pub signal: Callback<Signal>,
    pub dc_pre_charge_target_voltage: Callback<f32>,
    pub dc_charge_loop_req: Callback<DcChargeLoopReq>,
    pub dc_max_limits: Callback<DcMaximumLimits>,
    pub v2g_message: Callback<MessageType>,
    pub evccid: Callback<String>,
    pub selected_protocol: Callback<String>,
    pub response_code: Callback<ResponseCode>,
    pub selected_vas_services: Callback<VasSelectedServiceList>,
    pub ev_information: Callback<EvInformation>,
    pub get_vas_parameters: Option<Box<dyn Fn(u16) -> Option<ServiceParameterList> + Send + Sync>>,
}

impl std::fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callbacks")
            .field("signal", &self.signal.is_some())
            .field("v2g_message", &self.v2g_message.is_some())
            .field("response_code", &self.response_code.is_some())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
pub struct Feedback {
    callbacks: Callbacks,
}

fn call<T>(callback: &Callback<T>, value: T) {
    if let Some(callback) = callback {
        callback(value);
    }
}

impl Feedback {
    pub fn new(callbacks: Callbacks) -> Self {
        Self { callbacks }
    }

    pub fn signal(&self, signal: Signal) {
        call(&self.callbacks.signal, signal);
    }

    pub fn dc_pre_charge_target_voltage(&self, voltage: f32) {
        call(&self.callbacks.dc_pre_charge_target_voltage, voltage);
    }

    pub fn dc_charge_loop_req(&self, req: impl Into<DcChargeLoopReq>) {
        call(&self.callbacks.dc_charge_loop_req, req.into());
    }

    pub fn dc_max_limits(&self, limits: DcMaximumLimits) {
        call(&self.callbacks.dc_max_limits, limits);
    }

    pub fn v2g_message(&self, msg_type: MessageType) {
        call(&self.callbacks.v2g_message, msg_type);
    }

    pub fn evcc_id(&self, id: &str) {
        call(&self.callbacks.evccid, id.to_string());
    }

    pub fn selected_protocol(&self, protocol: &str) {
        call(&self.callbacks.selected_protocol, protocol.to_string());
    }

    pub fn response_code(&self, code: ResponseCode) {
        call(&self.callbacks.response_code, code);
    }

    pub fn selected_vas_services(&self, services: VasSelectedServiceList) {
        call(&self.callbacks.selected_vas_services, services);
    }

    pub fn ev_information(&self, info: EvInformation) {
        call(&self.callbacks.ev_information, info);
    }

    /// Parameters of a custom value added service
    pub fn get_vas_parameters(&self, service_id: u16) -> Option<ServiceParameterList> {
        self.callbacks
            .get_vas_parameters
            .as_ref()
            .and_then(|callback| callback(service_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Parameter, ParameterSet, ParameterValue, SelectedService};
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    #[test]
    fn test_unset_callbacks_are_noops() {
        let feedback = Feedback::default();
        feedback.signal(Signal::RequireAuthEim);
        feedback.dc_pre_charge_target_voltage(400.0);
        assert_eq!(feedback.get_vas_parameters(1234), None);
    }

    #[test]
    fn test_callbacks_receive_values() {
        let signals = Arc::new(Mutex::new(Vec::new()));
        let voltage = Arc::new(Mutex::new(0.0f32));
        let loop_req = Arc::new(Mutex::new(None));
        let vas = Arc::new(Mutex::new(Vec::new()));

        let callbacks = Callbacks {
            signal: Some(Box::new({
                let signals = signals.clone();
                move |s| signals.lock().push(s)
            })),
            dc_pre_charge_target_voltage: Some(Box::new({
                let voltage = voltage.clone();
                move |v| *voltage.lock() = v
            })),
            dc_charge_loop_req: Some(Box::new({
                let loop_req = loop_req.clone();
                move |r| *loop_req.lock() = Some(r)
            })),
            selected_vas_services: Some(Box::new({
                let vas = vas.clone();
                move |list| *vas.lock() = list
            })),
            get_vas_parameters: Some(Box::new(|id| {
                (id == 1234).then(|| {
                    vec![ParameterSet {
                        id: 0,
                        parameter: vec![
                            Parameter::int("Service1", 40),
                            Parameter::new("Service2", ParameterValue::FiniteString("house".into())),
                        ],
                    }]
                })
            })),
            ..Default::default()
        };
        let feedback = Feedback::new(callbacks);

        feedback.signal(Signal::RequireAuthEim);
        feedback.signal(Signal::StartCableCheck);
        feedback.dc_pre_charge_target_voltage(421.4);
        feedback.dc_charge_loop_req(RationalNumber::new(4402, -1));
        feedback.selected_vas_services(vec![SelectedService {
            service_id: 66,
            parameter_set_id: 0,
        }]);

        assert_eq!(
            *signals.lock(),
            vec![Signal::RequireAuthEim, Signal::StartCableCheck]
        );
        assert_eq!(*voltage.lock(), 421.4);
        assert_eq!(*loop_req.lock(), Some(DcChargeLoopReq::PresentVoltage(440.2)));
        assert_eq!(vas.lock()[0].service_id, 66);

        let params = feedback.get_vas_parameters(1234).unwrap();
        assert_eq!(params[0].parameter.len(), 2);
        assert_eq!(params[0].parameter[1].name, "Service2");
        assert_eq!(feedback.get_vas_parameters(4321), None);
    }

    #[test]
    fn test_charge_loop_control_mode_conversion() {
        let mode = BptScheduledDcClReq {
            scheduled: ScheduledDcClReq {
                target_current: RationalNumber::new(30, 0),
                target_voltage: RationalNumber::new(4402, -1),
                min_charge_power: Some(RationalNumber::new(34, 0)),
                ..Default::default()
            },
            max_discharge_power: Some(RationalNumber::new(11, 3)),
            min_discharge_power: Some(RationalNumber::new(32, 1)),
            max_discharge_current: None,
        };

        match DcChargeLoopReq::from(mode) {
            DcChargeLoopReq::ControlMode(DcChargeLoopReqControlMode::BptScheduled(m)) => {
                assert_eq!(m.max_discharge_power, Some(RationalNumber::new(11, 3)));
                assert!(m.scheduled.max_charge_power.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
