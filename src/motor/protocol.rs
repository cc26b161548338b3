// RMD motor controller command protocol
//
// Every command is a single CAN frame with exactly 8 data bytes:
// [opcode, 0x00, 0x00, 0x00, arg0, arg1, arg2, arg3]
// Only the velocity command carries an argument; all other bytes are zero.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of data bytes in every command frame
pub const FRAME_LEN: usize = 8;

/// Payload of one command frame
pub type Payload = [u8; FRAME_LEN];

/// Converts linear m/s into the controller's 0.01 dps velocity units
/// (wheel circumference and gearbox folded into one constant).
pub const VELOCITY_SCALE: f64 = 1091.0 * 36.0;

/// Largest identifier a CAN frame can carry (29-bit extended)
pub const MAX_CAN_ID: u32 = 0x1FFF_FFFF;

/// Opcode assignment of the motor firmware
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpcodeTable {
    pub set_velocity: u8,
    pub release_brake: u8,
    pub engage_brake: u8,
    pub shutdown: u8,
    pub stop: u8,
}

impl OpcodeTable {
    /// RMD series firmware
    pub const RMD: Self = Self {
        set_velocity: 0xA2,
        release_brake: 0x77,
        engage_brake: 0x78,
        shutdown: 0x80,
        stop: 0x81,
    };
}

impl Default for OpcodeTable {
    fn default() -> Self {
        Self::RMD
    }
}

/// Commands understood by a single motor controller
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotorCommand {
    /// Closed loop velocity in m/s (positive = controller's forward direction)
    Spin { speed_mps: f32 },
    ReleaseBrake,
    EngageBrake,
    Shutdown,
    Stop,
}

impl MotorCommand {
    /// Encode into the 8-byte frame payload using the given opcode table
    pub fn encode(&self, opcodes: &OpcodeTable) -> Payload {
        match *self {
            MotorCommand::Spin { speed_mps } => {
                let code = velocity_code(speed_mps).to_le_bytes();
                [
                    opcodes.set_velocity,
                    0x00,
                    0x00,
                    0x00,
                    code[0],
                    code[1],
                    code[2],
                    code[3],
                ]
            }
            MotorCommand::ReleaseBrake => bare(opcodes.release_brake),
            MotorCommand::EngageBrake => bare(opcodes.engage_brake),
            MotorCommand::Shutdown => bare(opcodes.shutdown),
            MotorCommand::Stop => bare(opcodes.stop),
        }
    }
}

/// Opcode followed by seven zero bytes
fn bare(opcode: u8) -> Payload {
    let mut payload = [0u8; FRAME_LEN];
    payload[0] = opcode;
    payload
}

/// Convert m/s to the signed velocity code sent on the wire
///
/// Rounds to the nearest code. Out of range values saturate at the i32 limits
/// and NaN maps to zero (float-to-int `as` semantics).
pub fn velocity_code(speed_mps: f32) -> i32 {
    (f64::from(speed_mps) * VELOCITY_SCALE).round() as i32
}

/// One frame ready for the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub id: u32,
    pub data: Payload,
}

impl Frame {
    pub fn new(id: u32, data: Payload) -> Self {
        Self { id, data }
    }

    /// First data byte
    pub fn opcode(&self) -> u8 {
        self.data[0]
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ID=0x{:x} Data=", self.id)?;
        for (i, byte) in self.data.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}
