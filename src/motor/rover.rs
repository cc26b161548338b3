// Differential drive: two motor groups steered as one vehicle

use tracing::{debug, info};

use super::error::{self, MemberFailure, MotorError, Result, Side};
use super::group::MotorGroup;

/// Rover level actuator over a left and a right motor group
///
/// Positive speed drives the rover forward. Because the two sides are mounted
/// mirrored, the right group always receives the negated speed.
///
/// Brakes start engaged and only change through `brakes_on()` / `brakes_off()`.
/// `stop()` halts the wheels but leaves them free to roll.
#[derive(Debug)]
pub struct RoverMotors<'g, 'm> {
    left: &'g mut MotorGroup<'m>,
    right: &'g mut MotorGroup<'m>,
    speed_limit: f32,
    brake_engaged: bool,
}

impl<'g, 'm> RoverMotors<'g, 'm> {
    /// `speed_limit` is the largest accepted speed magnitude in m/s
    pub fn new(
        left: &'g mut MotorGroup<'m>,
        right: &'g mut MotorGroup<'m>,
        speed_limit: f32,
    ) -> Result<Self> {
        if !(speed_limit.is_finite() && speed_limit > 0.0) {
            return Err(MotorError::InvalidSpeedLimit(speed_limit));
        }
        Ok(Self {
            left,
            right,
            speed_limit,
            brake_engaged: true,
        })
    }

    pub fn speed_limit(&self) -> f32 {
        self.speed_limit
    }

    pub fn brake_engaged(&self) -> bool {
        self.brake_engaged
    }

    pub fn left(&self) -> &MotorGroup<'m> {
        &*self.left
    }

    pub fn right(&self) -> &MotorGroup<'m> {
        &*self.right
    }

    /// Drive straight at `speed_mps` (negative = reverse)
    pub fn set_speed(&mut self, speed_mps: f32) -> Result<()> {
        if self.brake_engaged {
            return Err(MotorError::BrakeEngaged);
        }
        // NaN fails this comparison and is refused as well
        if !(speed_mps.abs() <= self.speed_limit) {
            return Err(MotorError::SpeedLimitExceeded {
                requested: speed_mps,
                limit: self.speed_limit,
            });
        }
        debug!("Rover speed {} m/s", speed_mps);
        self.both(|side, group| group.set_speeds(speed_mps * side.sign()))
    }

    pub fn brakes_on(&mut self) -> Result<()> {
        info!("Engaging brakes");
        let result = self.both(|_, group| group.brakes_on());
        self.brake_engaged = true;
        result
    }

    pub fn brakes_off(&mut self) -> Result<()> {
        info!("Releasing brakes");
        let result = self.both(|_, group| group.brakes_off());
        self.brake_engaged = false;
        result
    }

    pub fn stop(&mut self) -> Result<()> {
        self.both(|_, group| group.stop())
    }

    pub fn shutdown(&mut self) -> Result<()> {
        info!("Shutting down motors");
        self.both(|_, group| group.shutdown())
    }

    /// Apply `op` to the left group, then the right group, keeping every failure
    fn both(&mut self, mut op: impl FnMut(Side, &mut MotorGroup<'m>) -> Result<()>) -> Result<()> {
        let mut failures = Vec::new();
        for (side, group) in [(Side::Left, &mut *self.left), (Side::Right, &mut *self.right)] {
            if let Err(e) = op(side, group) {
                failures.extend(tag_side(side, e));
            }
        }
        error::collect(failures)
    }
}

/// Flatten a group error into per-member failures tagged with their side
fn tag_side(side: Side, error: MotorError) -> Vec<MemberFailure> {
    let mut failures = match error {
        MotorError::Fanout(failures) => failures.into_vec(),
        other => vec![MemberFailure::group(other)],
    };
    for failure in &mut failures {
        failure.side = Some(side);
    }
    failures
}
