// Loop timing, wiring, speed limits and remote topics
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::motor::protocol::{MAX_CAN_ID, OpcodeTable};
use crate::motor::transport::TransportMode;

// Control loop frequency (100 ms tick)
pub const LOOP_HZ: u64 = 10;

// CAN bus
pub const DEFAULT_INTERFACE: &str = "can0";
pub const CAN_WRITE_TIMEOUT: Duration = Duration::from_millis(100);

// Motor wiring (CAN ids), front to back on each side
pub const LEFT_MOTOR_IDS: [u32; 2] = [145, 143];
pub const RIGHT_MOTOR_IDS: [u32; 2] = [142, 146];

// Motion
pub const SPEED_LIMIT_MPS: f32 = 1.0;
pub const CRUISE_SPEED_MPS: f32 = 0.5;
pub const TARGET_DISTANCE_M: f32 = 40.0;

// Zenoh topics
pub const TOPIC_CMD_DRIVE: &str = "rover/cmd/drive"; // commands
pub const TOPIC_STATUS: &str = "rover/state/status"; // status

/// Errors loading or validating a rover configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Runtime configuration, defaults to the rover's stock wiring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RoverConfig {
    pub interface: String,
    pub transport: TransportMode,
    pub left_motor_ids: Vec<u32>,
    pub right_motor_ids: Vec<u32>,
    pub speed_limit_mps: f32,
    pub cruise_speed_mps: f32,
    pub target_distance_m: f32,
    pub opcodes: OpcodeTable,
    /// Accept drive commands and publish status over zenoh
    pub remote: bool,
}

impl Default for RoverConfig {
    fn default() -> Self {
        Self {
            interface: DEFAULT_INTERFACE.to_string(),
            transport: TransportMode::Live,
            left_motor_ids: LEFT_MOTOR_IDS.to_vec(),
            right_motor_ids: RIGHT_MOTOR_IDS.to_vec(),
            speed_limit_mps: SPEED_LIMIT_MPS,
            cruise_speed_mps: CRUISE_SPEED_MPS,
            target_distance_m: TARGET_DISTANCE_M,
            opcodes: OpcodeTable::default(),
            remote: false,
        }
    }
}

impl RoverConfig {
    /// Read a JSON config file. Missing fields keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interface.is_empty() {
            return Err(invalid("interface name is empty"));
        }
        if self.left_motor_ids.is_empty() || self.right_motor_ids.is_empty() {
            return Err(invalid("both sides need at least one motor"));
        }

        let mut seen = HashSet::new();
        for &id in self.left_motor_ids.iter().chain(&self.right_motor_ids) {
            if id > MAX_CAN_ID {
                return Err(invalid(format!("motor id 0x{:X} is not a CAN id", id)));
            }
            if !seen.insert(id) {
                return Err(invalid(format!("motor id {} is used twice", id)));
            }
        }

        if !(self.speed_limit_mps.is_finite() && self.speed_limit_mps > 0.0) {
            return Err(invalid(format!(
                "speed limit must be positive, got {}",
                self.speed_limit_mps
            )));
        }
        if !(self.cruise_speed_mps > 0.0 && self.cruise_speed_mps <= self.speed_limit_mps) {
            return Err(invalid(format!(
                "cruise speed {} must be in (0, {}]",
                self.cruise_speed_mps, self.speed_limit_mps
            )));
        }
        if !(self.target_distance_m.is_finite() && self.target_distance_m > 0.0) {
            return Err(invalid(format!(
                "target distance must be positive, got {}",
                self.target_distance_m
            )));
        }
        Ok(())
    }
}

fn invalid(reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(reason.into())
}
