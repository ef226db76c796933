//! DC (and DC BPT) ISO 15118-20 messages

use serde::{Deserialize, Serialize};

use super::datatypes::{
    DisplayParameters, EvseStatus, Header, MeterInfo, Processing, RationalNumber, ResponseCode,
};

// =============================================================================
// DC_ChargeParameterDiscovery
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DcCpdReqEnergyTransferMode {
    pub max_charge_power: RationalNumber,
    pub min_charge_power: RationalNumber,
    pub max_charge_current: RationalNumber,
    pub min_charge_current: RationalNumber,
    pub max_voltage: RationalNumber,
    pub min_voltage: RationalNumber,
    pub target_soc: Option<i8>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BptDcCpdReqEnergyTransferMode {
    #[serde(flatten)]
    pub charge: DcCpdReqEnergyTransferMode,
    pub max_discharge_power: RationalNumber,
    pub min_discharge_power: RationalNumber,
    pub max_discharge_current: RationalNumber,
    pub min_discharge_current: RationalNumber,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DcCpdReqTransferMode {
    Dc(DcCpdReqEnergyTransferMode),
    BptDc(BptDcCpdReqEnergyTransferMode),
}

impl Default for DcCpdReqTransferMode {
    fn default() -> Self {
        Self::Dc(DcCpdReqEnergyTransferMode::default())
    }
}

impl DcCpdReqTransferMode {
    /// Charge side limits, common to both transfer modes
    pub fn charge_limits(&self) -> &DcCpdReqEnergyTransferMode {
        match self {
            Self::Dc(mode) => mode,
            Self::BptDc(mode) => &mode.charge,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DcChargeParameterDiscoveryRequest {
    pub header: Header,
    pub transfer_mode: DcCpdReqTransferMode,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DcCpdResEnergyTransferMode {
    pub max_charge_power: RationalNumber,
    pub min_charge_power: RationalNumber,
    pub max_charge_current: RationalNumber,
    pub min_charge_current: RationalNumber,
    pub max_voltage: RationalNumber,
    pub min_voltage: RationalNumber,
    pub power_ramp_limit: Option<RationalNumber>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BptDcCpdResEnergyTransferMode {
    #[serde(flatten)]
    pub charge: DcCpdResEnergyTransferMode,
    pub max_discharge_power: RationalNumber,
    pub min_discharge_power: RationalNumber,
    pub max_discharge_current: RationalNumber,
    pub min_discharge_current: RationalNumber,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DcCpdResTransferMode {
    Dc(DcCpdResEnergyTransferMode),
    BptDc(BptDcCpdResEnergyTransferMode),
}

impl Default for DcCpdResTransferMode {
    fn default() -> Self {
        Self::Dc(DcCpdResEnergyTransferMode::default())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DcChargeParameterDiscoveryResponse {
    pub header: Header,
    pub response_code: ResponseCode,
    pub transfer_mode: DcCpdResTransferMode,
}

// =============================================================================
// DC_CableCheck
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DcCableCheckRequest {
    pub header: Header,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DcCableCheckResponse {
    pub header: Header,
    pub response_code: ResponseCode,
    pub processing: Processing,
}

// =============================================================================
// DC_PreCharge
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DcPreChargeRequest {
    pub header: Header,
    pub processing: Processing,
    pub present_voltage: RationalNumber,
    pub target_voltage: RationalNumber,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DcPreChargeResponse {
    pub header: Header,
    pub response_code: ResponseCode,
    pub present_voltage: RationalNumber,
}

// =============================================================================
// DC_ChargeLoop
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledDcClReq {
    pub target_energy_request: Option<RationalNumber>,
    pub max_energy_request: Option<RationalNumber>,
    pub min_energy_request: Option<RationalNumber>,
    pub target_current: RationalNumber,
    pub target_voltage: RationalNumber,
    pub max_charge_power: Option<RationalNumber>,
    pub min_charge_power: Option<RationalNumber>,
    pub max_charge_current: Option<RationalNumber>,
    pub max_voltage: Option<RationalNumber>,
    pub min_voltage: Option<RationalNumber>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BptScheduledDcClReq {
    #[serde(flatten)]
    pub scheduled: ScheduledDcClReq,
    pub max_discharge_power: Option<RationalNumber>,
    pub min_discharge_power: Option<RationalNumber>,
    pub max_discharge_current: Option<RationalNumber>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicDcClReq {
    pub departure_time: Option<u32>,
    pub target_energy_request: RationalNumber,
    pub max_energy_request: RationalNumber,
    pub min_energy_request: RationalNumber,
    pub max_charge_power: RationalNumber,
    pub min_charge_power: RationalNumber,
    pub max_charge_current: RationalNumber,
    pub max_voltage: RationalNumber,
    pub min_voltage: RationalNumber,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BptDynamicDcClReq {
    #[serde(flatten)]
    pub dynamic: DynamicDcClReq,
    pub max_discharge_power: RationalNumber,
    pub min_discharge_power: RationalNumber,
    pub max_discharge_current: RationalNumber,
    pub max_v2x_energy_request: Option<RationalNumber>,
    pub min_v2x_energy_request: Option<RationalNumber>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DcChargeLoopReqControlMode {
    Scheduled(ScheduledDcClReq),
    BptScheduled(BptScheduledDcClReq),
    Dynamic(DynamicDcClReq),
    BptDynamic(BptDynamicDcClReq),
}

impl Default for DcChargeLoopReqControlMode {
    fn default() -> Self {
        Self::Scheduled(ScheduledDcClReq::default())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DcChargeLoopRequest {
    pub header: Header,
    pub display_parameters: Option<DisplayParameters>,
    pub meter_info_requested: bool,
    pub present_voltage: RationalNumber,
    pub control_mode: DcChargeLoopReqControlMode,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledDcClRes {
    pub max_charge_power: Option<RationalNumber>,
    pub min_charge_power: Option<RationalNumber>,
    pub max_charge_current: Option<RationalNumber>,
    pub max_voltage: Option<RationalNumber>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BptScheduledDcClRes {
    #[serde(flatten)]
    pub scheduled: ScheduledDcClRes,
    pub min_voltage: Option<RationalNumber>,
    pub max_discharge_power: Option<RationalNumber>,
    pub min_discharge_power: Option<RationalNumber>,
    pub max_discharge_current: Option<RationalNumber>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicDcClRes {
    pub departure_time: Option<u32>,
    pub minimum_soc: Option<i8>,
    pub target_soc: Option<i8>,
    pub ack_max_delay: Option<u16>,
    pub max_charge_power: RationalNumber,
    pub min_charge_power: RationalNumber,
    pub max_charge_current: RationalNumber,
    pub max_voltage: RationalNumber,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BptDynamicDcClRes {
    #[serde(flatten)]
    pub dynamic: DynamicDcClRes,
    pub min_voltage: RationalNumber,
    pub max_discharge_power: RationalNumber,
    pub min_discharge_power: RationalNumber,
    pub max_discharge_current: RationalNumber,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DcChargeLoopResControlMode {
    Scheduled(ScheduledDcClRes),
    BptScheduled(BptScheduledDcClRes),
    Dynamic(DynamicDcClRes),
    BptDynamic(BptDynamicDcClRes),
}

impl Default for DcChargeLoopResControlMode {
    fn default() -> Self {
        Self::Scheduled(ScheduledDcClRes::default())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DcChargeLoopResponse {
    pub header: Header,
    pub response_code: ResponseCode,
    pub status: Option<EvseStatus>,
    pub meter_info: Option<MeterInfo>,
    pub present_current: RationalNumber,
    pub present_voltage: RationalNumber,
    pub power_limit_achieved: bool,
    pub current_limit_achieved: bool,
    pub voltage_limit_achieved: bool,
    pub control_mode: DcChargeLoopResControlMode,
}

// =============================================================================
// DC_WeldingDetection
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DcWeldingDetectionRequest {
    pub header: Header,
    pub processing: Processing,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DcWeldingDetectionResponse {
    pub header: Header,
    pub response_code: ResponseCode,
    pub present_voltage: RationalNumber,
}
