//! Example EVSE configuration
//!
//! One file describes the listening socket, the charger setup handed to every
//! session and the behaviour of the simulated power electronics.

use serde::{Deserialize, Serialize};

use iso15118::d20::ConfigError;
use iso15118::{ConnectionConfig, EvseSetupConfig};

/// Complete example EVSE configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvseConfig {
    #[serde(default)]
    pub server: ServerConfig,

    /// Charger setup shared by all sessions
    #[serde(default)]
    pub evse: EvseSetupConfig,

    #[serde(default)]
    pub simulator: SimulatorConfig,
}

impl EvseConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.evse.validate()?;
        config.simulator.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file
    pub fn load_yaml(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.evse.validate()?;
        config.simulator.validate()?;
        Ok(config)
    }
}

// =============================================================================
// Server Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address for V2GTP connections
    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default)]
    pub connection: ConnectionConfig,
}

fn default_bind() -> String {
    "0.0.0.0:15118".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            connection: ConnectionConfig::default(),
        }
    }
}

// =============================================================================
// Simulator Configuration
// =============================================================================

/// Timing of the simulated hardware
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Answer EIM authorization requests with accept (true) or reject
    #[serde(default = "default_authorize")]
    pub authorize: bool,

    #[serde(default = "default_authorization_delay")]
    pub authorization_delay_ms: u64,

    /// Isolation monitoring duration
    #[serde(default = "default_cable_check_delay")]
    pub cable_check_delay_ms: u64,

    /// Voltage change per ramp tick (V)
    #[serde(default = "default_ramp_step")]
    pub voltage_ramp_step_v: f32,

    #[serde(default = "default_ramp_interval")]
    pub ramp_interval_ms: u64,

    /// Stop charging this long after the charge loop started
    #[serde(default)]
    pub charge_duration_ms: Option<u64>,
}

fn default_authorize() -> bool {
    true
}

fn default_authorization_delay() -> u64 {
    500
}

fn default_cable_check_delay() -> u64 {
    2_000
}

fn default_ramp_step() -> f32 {
    50.0
}

fn default_ramp_interval() -> u64 {
    100
}

impl SimulatorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ramp_interval_ms == 0 {
            return Err(ConfigError::Invalid("ramp_interval_ms must be positive".into()));
        }
        if !(self.voltage_ramp_step_v > 0.0 && self.voltage_ramp_step_v.is_finite()) {
            return Err(ConfigError::Invalid(
                "voltage_ramp_step_v must be a finite, positive voltage".into(),
            ));
        }
        Ok(())
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            authorize: default_authorize(),
            authorization_delay_ms: default_authorization_delay(),
            cable_check_delay_ms: default_cable_check_delay(),
            voltage_ramp_step_v: default_ramp_step(),
            ramp_interval_ms: default_ramp_interval(),
            charge_duration_ms: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EvseConfig::default();
        assert_eq!(config.server.bind, "0.0.0.0:15118");
        assert!(config.simulator.authorize);
        assert_eq!(config.simulator.charge_duration_ms, None);
        assert_eq!(config.evse.evse_id, "DE*PNX*E12345*1");
    }

    #[test]
    fn test_load_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[server]
bind = "127.0.0.1:15119"

[server.connection]
max_payload_length = 4096

[evse]
evse_id = "DE*SIM*E00001*1"

[simulator]
authorize = false
charge_duration_ms = 30000
"#
        )
        .unwrap();

        let config = EvseConfig::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:15119");
        assert_eq!(config.server.connection.max_payload_length, 4096);
        assert_eq!(config.server.connection.output_capacity, 8192);
        assert_eq!(config.evse.evse_id, "DE*SIM*E00001*1");
        assert!(!config.simulator.authorize);
        assert_eq!(config.simulator.charge_duration_ms, Some(30_000));
        assert_eq!(config.simulator.cable_check_delay_ms, 2_000);
    }

    #[test]
    fn test_load_rejects_invalid_setup() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[evse]\nauthorization_services = []").unwrap();

        let err = EvseConfig::load(file.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_load_rejects_stalled_ramp() {
        for simulator in ["ramp_interval_ms = 0", "voltage_ramp_step_v = 0.0", "voltage_ramp_step_v = nan"] {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            writeln!(file, "[simulator]\n{}", simulator).unwrap();

            let err = EvseConfig::load(file.path().to_str().unwrap()).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)), "{simulator} accepted");
        }
    }

    #[test]
    fn test_load_rejects_nan_pre_charge_tolerance() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[evse]\npre_charge_tolerance_v = nan").unwrap();

        let err = EvseConfig::load(file.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
