// Single motor controller on the CAN bus

use std::fmt;

use tracing::debug;

use super::error::{MotorError, Result};
use super::protocol::{Frame, MAX_CAN_ID, MotorCommand, OpcodeTable};
use super::transport::{FrameTransport, TransportMode};

/// One physical motor and the bus handle it talks through
///
/// Brakes start engaged: the motor refuses to spin until `brakes_off()` has been sent.
pub struct Motor {
    id: u32,
    transport: Box<dyn FrameTransport>,
    opcodes: OpcodeTable,
    brake_engaged: bool,
}

impl Motor {
    /// Open a transport on `interface` and bind it to the motor with CAN id `id`
    pub fn open(id: u32, interface: &str, mode: TransportMode) -> Result<Self> {
        if id > MAX_CAN_ID {
            return Err(MotorError::InvalidId(id));
        }
        debug!("Opening motor 0x{:03X} on {} ({:?})", id, interface, mode);
        let transport = mode
            .open(interface)
            .map_err(|source| MotorError::TransportOpen { id, source })?;
        Ok(Self::new(id, transport))
    }

    /// Wrap an already opened transport
    pub fn new(id: u32, transport: Box<dyn FrameTransport>) -> Self {
        Self {
            id,
            transport,
            opcodes: OpcodeTable::default(),
            brake_engaged: true,
        }
    }

    /// Use a different firmware opcode table
    pub fn with_opcodes(mut self, opcodes: OpcodeTable) -> Self {
        self.opcodes = opcodes;
        self
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn brake_engaged(&self) -> bool {
        self.brake_engaged
    }

    /// Spin at `speed_mps` (closed loop velocity)
    pub fn spin(&mut self, speed_mps: f32) -> Result<()> {
        if self.brake_engaged {
            return Err(MotorError::BrakeEngaged);
        }
        self.send(MotorCommand::Spin { speed_mps })
    }

    /// Engage the holding brake
    ///
    /// The flag follows the command even if the frame could not be sent.
    pub fn brakes_on(&mut self) -> Result<()> {
        let result = self.send(MotorCommand::EngageBrake);
        self.brake_engaged = true;
        result
    }

    /// Release the holding brake
    pub fn brakes_off(&mut self) -> Result<()> {
        let result = self.send(MotorCommand::ReleaseBrake);
        self.brake_engaged = false;
        result
    }

    /// Stop motion without braking (the wheel can free-wheel)
    pub fn stop(&mut self) -> Result<()> {
        self.send(MotorCommand::Stop)
    }

    /// Turn the motor off. It keeps answering but will not move until re-enabled.
    pub fn shutdown(&mut self) -> Result<()> {
        self.send(MotorCommand::Shutdown)
    }

    fn send(&mut self, command: MotorCommand) -> Result<()> {
        let frame = Frame::new(self.id, command.encode(&self.opcodes));
        debug!("Motor 0x{:03X}: {:?} -> {}", self.id, command, frame);
        self.transport.send(&frame)?;
        Ok(())
    }
}

impl fmt::Debug for Motor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Motor")
            .field("id", &self.id)
            .field("opcodes", &self.opcodes)
            .field("brake_engaged", &self.brake_engaged)
            .finish_non_exhaustive()
    }
}
