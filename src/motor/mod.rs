// Motor control for the rover's CAN drive train
//
// Provides:
// - RMD command frame encoding (opcode table, velocity scale)
// - Frame transports (SocketCAN, dry-run logging)
// - Motor, MotorGroup and RoverMotors layered on top of each other
// - MotorBank, the owner the groups borrow their motors from

mod bank;
mod channel;
pub mod error;
mod group;
pub mod protocol;
mod rover;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use bank::MotorBank;
pub use channel::Motor;
pub use error::{FailureSource, Failures, MemberFailure, MotorError, Side, TransportError};
pub use group::MotorGroup;
pub use protocol::{Frame, MotorCommand, OpcodeTable, Payload, VELOCITY_SCALE, velocity_code};
pub use rover::RoverMotors;
pub use transport::{DryRunTransport, FrameTransport, TransportMode};
