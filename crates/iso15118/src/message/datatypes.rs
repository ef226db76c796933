//! ISO 15118-20 common datatypes
//!
//! Enumerations and value types shared by the request/response messages
//! and by the session configuration.

use serde::{Deserialize, Serialize};

/// Length of the session identifier in bytes
pub const SESSION_ID_LENGTH: usize = 8;

/// Session identifier as carried in every message header
pub type SessionId = [u8; SESSION_ID_LENGTH];

/// Message header (session id + timestamp in seconds since epoch)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub session_id: SessionId,
    pub timestamp: u64,
}

/// Fixed point number: `value * 10^exponent`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RationalNumber {
    pub value: i16,
    pub exponent: i8,
}

impl RationalNumber {
    pub const fn new(value: i16, exponent: i8) -> Self {
        Self { value, exponent }
    }

    /// Convert a float, keeping up to three decimals where the mantissa allows
    pub fn from_float(input: f32) -> Self {
        if !input.is_finite() {
            return Self::default();
        }

        let mut value = input as f64;
        let mut exponent: i8 = 0;

        while value.abs() > i16::MAX as f64 {
            value /= 10.0;
            exponent += 1;
        }

        while exponent > -3 && value.fract().abs() > 1e-6 && (value * 10.0).abs() <= i16::MAX as f64
        {
            value *= 10.0;
            exponent -= 1;
        }

        Self {
            value: value.round() as i16,
            exponent,
        }
    }

    pub fn to_float(self) -> f32 {
        (self.value as f64 * 10f64.powi(self.exponent as i32)) as f32
    }
}

impl From<f32> for RationalNumber {
    fn from(value: f32) -> Self {
        Self::from_float(value)
    }
}

/// Response codes, ordered so that every `FAILED*` code compares `>= Failed`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResponseCode {
    #[default]
    Ok,
    OkCertificateExpiresSoon,
    OkNewSessionEstablished,
    OkOldSessionJoined,
    OkPowerToleranceConfirmed,
    WarningAuthorizationSelectionInvalid,
    WarningCertificateExpired,
    WarningCertificateNotYetValid,
    WarningCertificateRevoked,
    WarningCertificateValidationError,
    WarningChallengeInvalid,
    WarningEimAuthorizationFailure,
    WarningEmspUnknown,
    WarningEvPowerProfileViolation,
    WarningGeneralPncAuthorizationError,
    WarningNoCertificateAvailable,
    WarningNoContractMatchingPcidFound,
    WarningPowerToleranceNotConfirmed,
    WarningScheduleRenegotiationFailed,
    WarningStandbyNotAllowed,
    WarningWpt,
    Failed,
    FailedAssociationError,
    FailedContactorError,
    FailedEvPowerProfileInvalid,
    FailedEvPowerProfileViolation,
    FailedMeteringSignatureNotValid,
    FailedNoEnergyTransferServiceSelected,
    FailedNoServiceRenegotiationSupported,
    FailedPauseNotAllowed,
    FailedPowerDeliveryNotApplied,
    FailedPowerToleranceNotConfirmed,
    FailedScheduleRenegotiation,
    FailedScheduleSelectionInvalid,
    FailedSequenceError,
    FailedServiceIdInvalid,
    FailedServiceSelectionInvalid,
    FailedSignatureError,
    FailedUnknownSession,
    FailedWrongChargeParameter,
}

impl ResponseCode {
    pub fn is_failed(self) -> bool {
        self >= ResponseCode::Failed
    }
}

/// Service categories (energy transfer services and value added services)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceCategory {
    #[serde(rename = "AC")]
    Ac,
    #[serde(rename = "DC")]
    Dc,
    #[serde(rename = "WPT")]
    Wpt,
    #[serde(rename = "DC_ACDP")]
    DcAcdp,
    #[serde(rename = "AC_BPT")]
    AcBpt,
    #[serde(rename = "DC_BPT")]
    DcBpt,
    #[serde(rename = "DC_ACDP_BPT")]
    DcAcdpBpt,
    #[serde(rename = "MCS")]
    Mcs,
    #[serde(rename = "MCS_BPT")]
    McsBpt,
    Internet,
    ParkingStatus,
}

impl ServiceCategory {
    /// Numeric service id used on the wire
    pub fn id(self) -> u16 {
        match self {
            Self::Ac => 1,
            Self::Dc => 2,
            Self::Wpt => 3,
            Self::DcAcdp => 4,
            Self::AcBpt => 5,
            Self::DcBpt => 6,
            Self::DcAcdpBpt => 7,
            Self::Mcs => 8,
            Self::McsBpt => 9,
            Self::Internet => 65,
            Self::ParkingStatus => 66,
        }
    }

    pub fn from_id(id: u16) -> Option<Self> {
        let service = match id {
            1 => Self::Ac,
            2 => Self::Dc,
            3 => Self::Wpt,
            4 => Self::DcAcdp,
            5 => Self::AcBpt,
            6 => Self::DcBpt,
            7 => Self::DcAcdpBpt,
            8 => Self::Mcs,
            9 => Self::McsBpt,
            65 => Self::Internet,
            66 => Self::ParkingStatus,
            _ => return None,
        };
        Some(service)
    }

    /// Energy transfer services (as opposed to value added services)
    pub fn is_energy_service(self) -> bool {
        !matches!(self, Self::Internet | Self::ParkingStatus)
    }

    pub fn is_bpt(self) -> bool {
        matches!(
            self,
            Self::AcBpt | Self::DcBpt | Self::DcAcdpBpt | Self::McsBpt
        )
    }

    /// Services served by the DC states
    pub fn is_dc(self) -> bool {
        self == Self::Dc
    }

    pub fn is_dc_bpt(self) -> bool {
        self == Self::DcBpt
    }
}

impl std::fmt::Display for ServiceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Ac => "AC",
            Self::Dc => "DC",
            Self::Wpt => "WPT",
            Self::DcAcdp => "DC_ACDP",
            Self::AcBpt => "AC_BPT",
            Self::DcBpt => "DC_BPT",
            Self::DcAcdpBpt => "DC_ACDP_BPT",
            Self::Mcs => "MCS",
            Self::McsBpt => "MCS_BPT",
            Self::Internet => "Internet",
            Self::ParkingStatus => "ParkingStatus",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Authorization {
    #[serde(rename = "EIM")]
    Eim,
    #[serde(rename = "PnC")]
    Pnc,
}

/// EVSE processing status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Processing {
    #[default]
    Finished,
    Ongoing,
    OngoingWaitingForCustomerInteraction,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AcConnector {
    #[default]
    SinglePhase = 1,
    ThreePhase = 3,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DcConnector {
    #[default]
    Core = 1,
    Extended = 2,
    Dual2 = 3,
    Dual4 = 4,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlMode {
    #[default]
    Scheduled = 1,
    Dynamic = 2,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MobilityNeedsMode {
    #[default]
    ProvidedByEvcc = 1,
    ProvidedBySecc = 2,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pricing {
    #[default]
    NoPricing = 0,
    AbsolutePricing = 1,
    PriceLevels = 2,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BptChannel {
    #[default]
    Unified = 1,
    Separated = 2,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeneratorMode {
    #[default]
    GridFollowing = 1,
    GridForming = 2,
}

/// Internet VAS protocol
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Protocol {
    Ftp = 1,
    #[default]
    Http = 2,
    Https = 3,
}

/// Internet VAS port
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Port {
    Port20 = 20,
    Port21 = 21,
    #[default]
    Port80 = 80,
    Port443 = 443,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntendedService {
    #[default]
    VehicleCheckIn = 1,
    VehicleCheckOut = 2,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParkingStatus {
    AutoInternal = 1,
    AutoExternal = 2,
    ManualInternal = 3,
    #[default]
    ManualExternal = 4,
}

/// EV charge progress in PowerDeliveryReq
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Progress {
    #[default]
    Start,
    Stop,
    Standby,
    ScheduleRenegotiation,
}

/// EV intention in SessionStopReq
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChargingSession {
    Pause,
    #[default]
    Terminate,
    ServiceRenegotiation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvseNotification {
    Pause,
    ExitStandby,
    Terminate,
    ScheduleRenegotiation,
    ServiceRenegotiation,
    MeteringConfirmation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvseStatus {
    pub notification_max_delay: u16,
    pub evse_notification: EvseNotification,
}

/// Service entry in ServiceDiscoveryRes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub service_id: u16,
    pub free_service: bool,
}

/// Value of a single service parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterValue {
    Bool(bool),
    Byte(i8),
    Short(i16),
    Int(i32),
    Rational(RationalNumber),
    FiniteString(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub value: ParameterValue,
}

impl Parameter {
    pub fn new(name: &str, value: ParameterValue) -> Self {
        Self {
            name: name.to_string(),
            value,
        }
    }

    pub fn int(name: &str, value: i32) -> Self {
        Self::new(name, ParameterValue::Int(value))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    pub id: u16,
    pub parameter: Vec<Parameter>,
}

pub type ServiceParameterList = Vec<ParameterSet>;

/// Selected (service id, parameter set id) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedService {
    pub service_id: u16,
    pub parameter_set_id: u16,
}

pub type VasSelectedServiceList = Vec<SelectedService>;

/// Supported application protocol offered by the EV
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppProtocol {
    pub protocol_namespace: String,
    pub version_number_major: u32,
    pub version_number_minor: u32,
    pub schema_id: u8,
    pub priority: u8,
}

/// Display parameters optionally sent by the EV during the charge loop
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplayParameters {
    pub present_soc: Option<i8>,
    pub min_soc: Option<i8>,
    pub target_soc: Option<i8>,
    pub max_soc: Option<i8>,
    pub remaining_time_to_target_soc: Option<u32>,
    pub charging_complete: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeterInfo {
    pub meter_id: String,
    pub charged_energy_reading_wh: u64,
    pub bpt_discharged_energy_reading_wh: Option<u64>,
    pub meter_timestamp: Option<u64>,
}
