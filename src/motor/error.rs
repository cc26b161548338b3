// Error types for the motor stack

use std::fmt;
use std::ops::Deref;

/// Errors raised by a frame transport
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Failed to open CAN interface {interface}: {source}")]
    Open {
        interface: String,
        source: std::io::Error,
    },

    #[error("Failed to send frame to 0x{id:03X}: {source}")]
    Send { id: u32, source: std::io::Error },

    #[error("0x{0:X} is not a valid CAN identifier")]
    InvalidId(u32),

    #[error("Live CAN transport is only available on Linux")]
    Unsupported,
}

/// Errors raised by motors, motor groups and the rover
#[derive(Debug, thiserror::Error)]
pub enum MotorError {
    #[error("Motor 0x{id:03X} could not open its transport: {source}")]
    TransportOpen { id: u32, source: TransportError },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Brakes are engaged, release them with brakes_off() first")]
    BrakeEngaged,

    #[error("Requested speed {requested} m/s exceeds the limit of {limit} m/s")]
    SpeedLimitExceeded { requested: f32, limit: f32 },

    #[error("Speed limit must be positive and finite, got {0}")]
    InvalidSpeedLimit(f32),

    #[error("0x{0:X} is not a valid CAN identifier")]
    InvalidId(u32),

    #[error("Motor id {0} is used more than once")]
    DuplicateId(u32),

    #[error("{0}")]
    Fanout(Failures),
}

pub type Result<T> = std::result::Result<T, MotorError>;

/// Drive side of the rover
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Velocity sign applied to this side for forward motion
    ///
    /// The two sides are mounted mirrored, so forward needs opposite rotation.
    pub fn sign(self) -> f32 {
        match self {
            Side::Left => 1.0,
            Side::Right => -1.0,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => f.write_str("left"),
            Side::Right => f.write_str("right"),
        }
    }
}

/// Where inside a fan-out a failure came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureSource {
    /// Member at `index` (declaration order) with CAN id `id`
    Motor { index: usize, id: u32 },
    /// The group refused the command before reaching any member
    Group,
}

/// One failed command inside a fan-out
#[derive(Debug)]
pub struct MemberFailure {
    /// Set once the failure has been reported through the rover
    pub side: Option<Side>,
    pub source: FailureSource,
    pub error: MotorError,
}

impl MemberFailure {
    pub fn motor(index: usize, id: u32, error: MotorError) -> Self {
        Self {
            side: None,
            source: FailureSource::Motor { index, id },
            error,
        }
    }

    pub fn group(error: MotorError) -> Self {
        Self {
            side: None,
            source: FailureSource::Group,
            error,
        }
    }

    /// CAN id of the failing motor, if the failure came from a motor
    pub fn motor_id(&self) -> Option<u32> {
        match self.source {
            FailureSource::Motor { id, .. } => Some(id),
            FailureSource::Group => None,
        }
    }
}

impl fmt::Display for MemberFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(side) = self.side {
            write!(f, "{} ", side)?;
        }
        match self.source {
            FailureSource::Motor { index, id } => {
                write!(f, "motor #{} (0x{:03X}): {}", index, id, self.error)
            }
            FailureSource::Group => write!(f, "group: {}", self.error),
        }
    }
}

/// Non-empty list of fan-out failures, in the order they occurred
#[derive(Debug)]
pub struct Failures(Vec<MemberFailure>);

impl Failures {
    /// Wraps the list, `None` when nothing failed
    pub fn from_vec(failures: Vec<MemberFailure>) -> Option<Self> {
        if failures.is_empty() {
            None
        } else {
            Some(Self(failures))
        }
    }

    pub fn into_vec(self) -> Vec<MemberFailure> {
        self.0
    }
}

impl Deref for Failures {
    type Target = [MemberFailure];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for Failures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} motor command(s) failed: ", self.0.len())?;
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", failure)?;
        }
        Ok(())
    }
}

/// Turn collected fan-out failures into a result
pub(crate) fn collect(failures: Vec<MemberFailure>) -> Result<()> {
    match Failures::from_vec(failures) {
        None => Ok(()),
        Some(failures) => Err(MotorError::Fanout(failures)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_sign() {
        assert_eq!(Side::Left.sign(), 1.0);
        assert_eq!(Side::Right.sign(), -1.0);
    }

    #[test]
    fn test_empty_failures_is_ok() {
        assert!(collect(Vec::new()).is_ok());
    }

    #[test]
    fn test_failure_display() {
        let mut failure = MemberFailure::motor(1, 0x8F, MotorError::BrakeEngaged);
        failure.side = Some(Side::Left);
        let err = collect(vec![failure, MemberFailure::group(MotorError::BrakeEngaged)])
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "2 motor command(s) failed: left motor #1 (0x08F): Brakes are engaged, \
             release them with brakes_off() first; group: Brakes are engaged, \
             release them with brakes_off() first"
        );
    }
}
