// Message types exchanged with operators (keyboard or remote)

use serde::{Deserialize, Serialize};

// Operator command -> runtime
// Tagged by "cmd", eg. {"cmd":"forward","speed_mps":0.3} or {"cmd":"stop"}
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum DriveCommand {
    /// Release brakes and drive forward; cruise speed when no speed is given
    Forward {
        #[serde(default)]
        speed_mps: Option<f32>,
    },
    /// Halt and engage brakes
    Stop,
}

/// Health status published by runtime
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RoverHealth {
    Ok,
    MotorFault,
}

// Status snapshot runtime -> remote observers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoverStatus {
    pub moving: bool,
    pub speed_mps: f32,
    pub distance_m: f32,
    pub brakes_engaged: bool,
    pub health: RoverHealth,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_drive_commands() {
        let cmd: DriveCommand = serde_json::from_str(r#"{"cmd":"forward","speed_mps":0.3}"#).unwrap();
        assert_eq!(cmd, DriveCommand::Forward { speed_mps: Some(0.3) });

        let cmd: DriveCommand = serde_json::from_str(r#"{"cmd":"forward"}"#).unwrap();
        assert_eq!(cmd, DriveCommand::Forward { speed_mps: None });

        let cmd: DriveCommand = serde_json::from_str(r#"{"cmd":"stop"}"#).unwrap();
        assert_eq!(cmd, DriveCommand::Stop);

        assert!(serde_json::from_str::<DriveCommand>(r#"{"cmd":"reverse"}"#).is_err());
    }

    #[test]
    fn test_status_json() {
        let status = RoverStatus {
            moving: false,
            speed_mps: 0.0,
            distance_m: 0.0,
            brakes_engaged: true,
            health: RoverHealth::MotorFault,
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["health"], "motor_fault");
        assert_eq!(json["brakes_engaged"], true);
    }
}
