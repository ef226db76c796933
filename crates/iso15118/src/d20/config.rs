//! Session configuration
//!
//! [`EvseSetupConfig`] is what an operator writes (TOML or YAML). It is
//! expanded once into the read-only [`SessionConfig`] that every session of
//! the charger shares.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::message::{
    Authorization, BptChannel, ControlMode, DcConnector, GeneratorMode, IntendedService,
    MobilityNeedsMode, Parameter, ParameterSet, ParameterValue, ParkingStatus, Port, Pricing,
    Protocol, ServiceCategory,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// =============================================================================
// Transfer limits
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MinMax {
    #[serde(default)]
    pub min: f32,
    #[serde(default)]
    pub max: f32,
}

impl MinMax {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PowerCurrentLimits {
    /// Watts
    pub power: MinMax,
    /// Amperes
    pub current: MinMax,
}

/// EVSE DC limits advertised in ChargeParameterDiscovery and the charge loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DcTransferLimits {
    pub charge_limits: PowerCurrentLimits,
    /// Required when a BPT service is offered
    #[serde(default)]
    pub discharge_limits: Option<PowerCurrentLimits>,
    /// Volts
    pub voltage: MinMax,
    #[serde(default)]
    pub power_ramp_limit: Option<f32>,
}

// =============================================================================
// Parameter lists
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlMobilityNeedsModes {
    pub control_mode: ControlMode,
    pub mobility_mode: MobilityNeedsMode,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DcParameterList {
    pub connector: DcConnector,
    pub control_mode: ControlMode,
    pub mobility_needs_mode: MobilityNeedsMode,
    pub pricing: Pricing,
}

impl DcParameterList {
    fn parameters(&self) -> Vec<Parameter> {
        vec![
            Parameter::int("Connector", self.connector as i32),
            Parameter::int("ControlMode", self.control_mode as i32),
            Parameter::int("MobilityNeedsMode", self.mobility_needs_mode as i32),
            Parameter::int("Pricing", self.pricing as i32),
        ]
    }

    pub fn to_parameter_set(&self, id: u16) -> ParameterSet {
        ParameterSet {
            id,
            parameter: self.parameters(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DcBptParameterList {
    pub dc: DcParameterList,
    pub bpt_channel: BptChannel,
    pub generator_mode: GeneratorMode,
}

impl DcBptParameterList {
    pub fn to_parameter_set(&self, id: u16) -> ParameterSet {
        let mut parameter = self.dc.parameters();
        parameter.push(Parameter::int("BPTChannel", self.bpt_channel as i32));
        parameter.push(Parameter::int("GeneratorMode", self.generator_mode as i32));
        ParameterSet { id, parameter }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InternetParameterList {
    pub protocol: Protocol,
    pub port: Port,
}

impl InternetParameterList {
    pub fn to_parameter_set(&self, id: u16) -> ParameterSet {
        let protocol = match self.protocol {
            Protocol::Ftp => "ftp",
            Protocol::Http => "http",
            Protocol::Https => "https",
        };
        ParameterSet {
            id,
            parameter: vec![
                Parameter::new("Protocol", ParameterValue::FiniteString(protocol.to_string())),
                Parameter::int("Port", self.port as i32),
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParkingParameterList {
    pub intended_service: IntendedService,
    pub parking_status: ParkingStatus,
}

impl ParkingParameterList {
    pub fn to_parameter_set(&self, id: u16) -> ParameterSet {
        ParameterSet {
            id,
            parameter: vec![
                Parameter::int("IntendedService", self.intended_service as i32),
                Parameter::int("ParkingStatus", self.parking_status as i32),
            ],
        }
    }
}

// =============================================================================
// Timeouts
// =============================================================================

/// Phase time bounds (milliseconds)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Maximum time between two requests
    #[serde(default = "default_sequence_timeout")]
    pub sequence_timeout_ms: u64,
    /// Time between two authorization re-signals
    #[serde(default = "default_authorization_timeout")]
    pub authorization_timeout_ms: u64,
    /// Re-signals before the session is stopped
    #[serde(default = "default_authorization_retries")]
    pub authorization_retries: u32,
    #[serde(default = "default_cable_check_timeout")]
    pub cable_check_timeout_ms: u64,
    #[serde(default = "default_pre_charge_timeout")]
    pub pre_charge_timeout_ms: u64,
}

fn default_sequence_timeout() -> u64 {
    60_000
}

fn default_authorization_timeout() -> u64 {
    10_000
}

fn default_authorization_retries() -> u32 {
    6
}

fn default_cable_check_timeout() -> u64 {
    40_000
}

fn default_pre_charge_timeout() -> u64 {
    7_000
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            sequence_timeout_ms: default_sequence_timeout(),
            authorization_timeout_ms: default_authorization_timeout(),
            authorization_retries: default_authorization_retries(),
            cable_check_timeout_ms: default_cable_check_timeout(),
            pre_charge_timeout_ms: default_pre_charge_timeout(),
        }
    }
}

// =============================================================================
// EVSE setup
// =============================================================================

/// Operator facing charger setup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvseSetupConfig {
    /// EVSE identity advertised in SessionSetupRes
    #[serde(default = "default_evse_id")]
    pub evse_id: String,

    #[serde(default = "default_energy_services")]
    pub supported_energy_services: Vec<ServiceCategory>,

    /// Ordered by preference
    #[serde(default = "default_authorization_services")]
    pub authorization_services: Vec<Authorization>,

    /// Value added service ids (Internet = 65, ParkingStatus = 66, or custom)
    #[serde(default)]
    pub supported_vas_services: Vec<u16>,

    #[serde(default)]
    pub enable_certificate_install_service: bool,

    #[serde(default)]
    pub dc_limits: DcTransferLimits,

    #[serde(default = "default_control_mobility_modes")]
    pub control_mobility_modes: Vec<ControlMobilityNeedsModes>,

    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// Accepted |present - target| voltage difference to finish pre-charge
    #[serde(default = "default_pre_charge_tolerance")]
    pub pre_charge_tolerance_v: f32,
}

fn default_evse_id() -> String {
    "DE*PNX*E12345*1".to_string()
}

fn default_energy_services() -> Vec<ServiceCategory> {
    vec![ServiceCategory::Dc]
}

fn default_authorization_services() -> Vec<Authorization> {
    vec![Authorization::Eim]
}

fn default_control_mobility_modes() -> Vec<ControlMobilityNeedsModes> {
    vec![ControlMobilityNeedsModes {
        control_mode: ControlMode::Scheduled,
        mobility_mode: MobilityNeedsMode::ProvidedByEvcc,
    }]
}

fn default_pre_charge_tolerance() -> f32 {
    20.0
}

impl Default for EvseSetupConfig {
    fn default() -> Self {
        Self {
            evse_id: default_evse_id(),
            supported_energy_services: default_energy_services(),
            authorization_services: default_authorization_services(),
            supported_vas_services: Vec::new(),
            enable_certificate_install_service: false,
            dc_limits: DcTransferLimits::default(),
            control_mobility_modes: default_control_mobility_modes(),
            timeouts: TimeoutConfig::default(),
            pre_charge_tolerance_v: default_pre_charge_tolerance(),
        }
    }
}

impl EvseSetupConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from a YAML file
    pub fn load_yaml(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.authorization_services.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one authorization service is required".into(),
            ));
        }
        if self.supported_energy_services.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one energy transfer service is required".into(),
            ));
        }
        if let Some(service) = self
            .supported_energy_services
            .iter()
            .find(|s| !s.is_energy_service())
        {
            return Err(ConfigError::Invalid(format!(
                "{} is not an energy transfer service",
                service
            )));
        }
        if let Some(service) = self
            .supported_energy_services
            .iter()
            .find(|s| !(s.is_dc() || s.is_dc_bpt()))
        {
            return Err(ConfigError::Invalid(format!(
                "{} is not supported by the DC charger",
                service
            )));
        }
        if self.control_mobility_modes.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one control mode is required".into(),
            ));
        }
        if self.supported_energy_services.iter().any(|s| s.is_bpt())
            && self.dc_limits.discharge_limits.is_none()
        {
            return Err(ConfigError::Invalid(
                "BPT service offered without discharge limits".into(),
            ));
        }
        if !(self.pre_charge_tolerance_v >= 0.0 && self.pre_charge_tolerance_v.is_finite()) {
            return Err(ConfigError::Invalid(
                "pre_charge_tolerance_v must be a finite, non-negative voltage".into(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Session configuration
// =============================================================================

/// Read-only configuration shared by all sessions
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub evse_id: String,
    pub cert_install_service: bool,
    pub authorization_services: Vec<Authorization>,
    pub supported_energy_transfer_services: Vec<ServiceCategory>,
    pub supported_vas_services: Vec<u16>,
    pub dc_parameter_list: Vec<DcParameterList>,
    pub dc_bpt_parameter_list: Vec<DcBptParameterList>,
    pub internet_parameter_list: Vec<InternetParameterList>,
    pub parking_parameter_list: Vec<ParkingParameterList>,
    pub dc_limits: DcTransferLimits,
    pub timeouts: TimeoutConfig,
    pub pre_charge_tolerance_v: f32,
}

impl SessionConfig {
    pub fn new(setup: EvseSetupConfig) -> Self {
        let modes: Vec<_> = setup
            .control_mobility_modes
            .iter()
            .filter(|mode| {
                let allowed = !(mode.control_mode == ControlMode::Scheduled
                    && mode.mobility_mode == MobilityNeedsMode::ProvidedBySecc);
                if !allowed {
                    warn!(?mode, "Scheduled mode requires mobility needs provided by the EVCC, skipping");
                }
                allowed
            })
            .copied()
            .collect();

        let dc_parameter_list: Vec<_> = modes
            .iter()
            .map(|mode| DcParameterList {
                connector: DcConnector::Extended,
                control_mode: mode.control_mode,
                mobility_needs_mode: mode.mobility_mode,
                pricing: Pricing::NoPricing,
            })
            .collect();

        let dc_bpt_parameter_list = if setup
            .supported_energy_services
            .contains(&ServiceCategory::DcBpt)
        {
            dc_parameter_list
                .iter()
                .map(|dc| DcBptParameterList {
                    dc: *dc,
                    bpt_channel: BptChannel::Unified,
                    generator_mode: GeneratorMode::GridFollowing,
                })
                .collect()
        } else {
            Vec::new()
        };

        Self {
            evse_id: setup.evse_id,
            cert_install_service: setup.enable_certificate_install_service,
            authorization_services: setup.authorization_services,
            supported_energy_transfer_services: setup.supported_energy_services,
            supported_vas_services: setup.supported_vas_services,
            dc_parameter_list,
            dc_bpt_parameter_list,
            internet_parameter_list: vec![InternetParameterList {
                protocol: Protocol::Http,
                port: Port::Port80,
            }],
            parking_parameter_list: vec![ParkingParameterList {
                intended_service: IntendedService::VehicleCheckIn,
                parking_status: ParkingStatus::ManualExternal,
            }],
            dc_limits: setup.dc_limits,
            timeouts: setup.timeouts,
            pre_charge_tolerance_v: setup.pre_charge_tolerance_v,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new(EvseSetupConfig::default())
    }
}

impl From<EvseSetupConfig> for SessionConfig {
    fn from(setup: EvseSetupConfig) -> Self {
        Self::new(setup)
    }
}
