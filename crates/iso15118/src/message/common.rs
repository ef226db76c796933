//! Common (energy transfer independent) ISO 15118-20 messages

use serde::{Deserialize, Serialize};

use super::datatypes::{
    Authorization, BptChannel, ChargingSession, EvseStatus, Header, Processing, Progress,
    RationalNumber, ResponseCode, SelectedService, Service, ServiceCategory, ServiceParameterList,
    VasSelectedServiceList,
};

/// Length of the PnC authorization challenge
pub const GEN_CHALLENGE_LENGTH: usize = 16;

// =============================================================================
// SessionSetup
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSetupRequest {
    pub header: Header,
    pub evccid: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSetupResponse {
    pub header: Header,
    pub response_code: ResponseCode,
    pub evseid: String,
}

// =============================================================================
// AuthorizationSetup / Authorization
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationSetupRequest {
    pub header: Header,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum AuthorizationMode {
    #[default]
    Eim,
    Pnc {
        gen_challenge: [u8; GEN_CHALLENGE_LENGTH],
        supported_providers: Option<Vec<String>>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationSetupResponse {
    pub header: Header,
    pub response_code: ResponseCode,
    pub authorization_services: Vec<Authorization>,
    pub certificate_installation_service: bool,
    pub authorization_mode: AuthorizationMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PncAuthorization {
    pub id: String,
    pub gen_challenge: [u8; GEN_CHALLENGE_LENGTH],
    pub contract_certificate: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationRequest {
    pub header: Header,
    pub selected_authorization_service: Authorization,
    pub pnc_params: Option<PncAuthorization>,
}

impl Default for AuthorizationRequest {
    fn default() -> Self {
        Self {
            header: Header::default(),
            selected_authorization_service: Authorization::Eim,
            pnc_params: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationResponse {
    pub header: Header,
    pub response_code: ResponseCode,
    pub evse_processing: Processing,
}

// =============================================================================
// ServiceDiscovery / ServiceDetail / ServiceSelection
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceDiscoveryRequest {
    pub header: Header,
    pub supported_service_ids: Option<Vec<u16>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceDiscoveryResponse {
    pub header: Header,
    pub response_code: ResponseCode,
    pub service_renegotiation_supported: bool,
    pub energy_transfer_service_list: Vec<Service>,
    pub vas_list: Option<Vec<Service>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceDetailRequest {
    pub header: Header,
    pub service: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDetailResponse {
    pub header: Header,
    pub response_code: ResponseCode,
    pub service: u16,
    pub service_parameter_list: ServiceParameterList,
}

impl Default for ServiceDetailResponse {
    fn default() -> Self {
        Self {
            header: Header::default(),
            response_code: ResponseCode::Ok,
            service: ServiceCategory::Dc.id(),
            service_parameter_list: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedEnergyService {
    pub service_id: ServiceCategory,
    pub parameter_set_id: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSelectionRequest {
    pub header: Header,
    pub selected_energy_transfer_service: SelectedEnergyService,
    pub selected_vas_list: Option<VasSelectedServiceList>,
}

impl Default for ServiceSelectionRequest {
    fn default() -> Self {
        Self {
            header: Header::default(),
            selected_energy_transfer_service: SelectedEnergyService {
                service_id: ServiceCategory::Dc,
                parameter_set_id: 0,
            },
            selected_vas_list: None,
        }
    }
}

impl ServiceSelectionRequest {
    pub fn vas_list(&self) -> &[SelectedService] {
        self.selected_vas_list.as_deref().unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceSelectionResponse {
    pub header: Header,
    pub response_code: ResponseCode,
}

// =============================================================================
// ScheduleExchange
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduledScheduleExchangeReq {
    pub departure_time: Option<u32>,
    pub target_energy_request: Option<RationalNumber>,
    pub max_energy_request: Option<RationalNumber>,
    pub min_energy_request: Option<RationalNumber>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DynamicScheduleExchangeReq {
    pub departure_time: u32,
    pub min_soc: Option<i8>,
    pub target_soc: Option<i8>,
    pub target_energy_request: RationalNumber,
    pub max_energy_request: RationalNumber,
    pub min_energy_request: RationalNumber,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScheduleExchangeReqControlMode {
    Scheduled(ScheduledScheduleExchangeReq),
    Dynamic(DynamicScheduleExchangeReq),
}

impl Default for ScheduleExchangeReqControlMode {
    fn default() -> Self {
        Self::Scheduled(ScheduledScheduleExchangeReq::default())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleExchangeRequest {
    pub header: Header,
    pub max_supporting_points: u16,
    pub control_mode: ScheduleExchangeReqControlMode,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerScheduleEntry {
    pub duration: u32,
    pub power: RationalNumber,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerSchedule {
    pub time_anchor: u64,
    pub available_energy: Option<RationalNumber>,
    pub power_tolerance: Option<RationalNumber>,
    pub entries: Vec<PowerScheduleEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleTuple {
    pub schedule_tuple_id: u32,
    pub charging_schedule: PowerSchedule,
    pub discharging_schedule: Option<PowerSchedule>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledScheduleExchangeRes {
    pub schedule_tuple: Vec<ScheduleTuple>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicScheduleExchangeRes {
    pub departure_time: Option<u32>,
    pub minimum_soc: Option<i8>,
    pub target_soc: Option<i8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduleExchangeResControlMode {
    Scheduled(ScheduledScheduleExchangeRes),
    Dynamic(DynamicScheduleExchangeRes),
}

impl Default for ScheduleExchangeResControlMode {
    fn default() -> Self {
        Self::Scheduled(ScheduledScheduleExchangeRes::default())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleExchangeResponse {
    pub header: Header,
    pub response_code: ResponseCode,
    pub processing: Processing,
    pub go_to_pause: Option<bool>,
    pub control_mode: ScheduleExchangeResControlMode,
}

// =============================================================================
// PowerDelivery
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PowerDeliveryRequest {
    pub header: Header,
    pub processing: Processing,
    pub charge_progress: Progress,
    pub bpt_channel_selection: Option<BptChannel>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PowerDeliveryResponse {
    pub header: Header,
    pub response_code: ResponseCode,
    pub status: Option<EvseStatus>,
}

// =============================================================================
// SessionStop
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStopRequest {
    pub header: Header,
    pub charging_session: ChargingSession,
    pub ev_termination_code: Option<String>,
    pub ev_termination_explanation: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStopResponse {
    pub header: Header,
    pub response_code: ResponseCode,
}
