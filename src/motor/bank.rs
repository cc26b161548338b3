// Owner of every motor on the rover
//
// Motors are opened here and lent out to the two motor groups. Groups and the
// rover only ever borrow them, so the bank must outlive both.

use std::collections::HashSet;

use tracing::{info, warn};

use super::channel::Motor;
use super::error::{MotorError, Result};
use super::group::MotorGroup;
use crate::config::RoverConfig;

/// All motors of the rover, split by side
#[derive(Debug)]
pub struct MotorBank {
    left: Vec<Motor>,
    right: Vec<Motor>,
}

impl MotorBank {
    /// Open one transport per configured motor
    ///
    /// Fails on the first motor that cannot be opened. Motors opened before it
    /// are dropped on the way out, which closes their sockets. An id wired to
    /// more than one motor is refused before anything is opened.
    pub fn open(config: &RoverConfig) -> Result<Self> {
        ensure_unique(
            config
                .left_motor_ids
                .iter()
                .chain(&config.right_motor_ids)
                .copied(),
        )?;

        info!(
            "Opening motors on {} ({:?}): left {:?}, right {:?}",
            config.interface, config.transport, config.left_motor_ids, config.right_motor_ids
        );
        let open_side = |ids: &[u32]| -> Result<Vec<Motor>> {
            ids.iter()
                .map(|&id| {
                    Motor::open(id, &config.interface, config.transport)
                        .map(|motor| motor.with_opcodes(config.opcodes))
                })
                .collect()
        };

        let left = open_side(&config.left_motor_ids)?;
        let right = open_side(&config.right_motor_ids)?;
        Ok(Self { left, right })
    }

    /// Build a bank from motors that are already open
    pub fn from_motors(left: Vec<Motor>, right: Vec<Motor>) -> Result<Self> {
        ensure_unique(left.iter().chain(&right).map(Motor::id))?;
        Ok(Self { left, right })
    }

    /// Borrow the motors as (left, right) groups
    pub fn groups(&mut self) -> (MotorGroup<'_>, MotorGroup<'_>) {
        (
            MotorGroup::new(self.left.iter_mut().collect()),
            MotorGroup::new(self.right.iter_mut().collect()),
        )
    }

    pub fn len(&self) -> usize {
        self.left.len() + self.right.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// Two motors sharing an id would both act on every frame meant for either
fn ensure_unique(ids: impl IntoIterator<Item = u32>) -> Result<()> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(MotorError::DuplicateId(id));
        }
    }
    Ok(())
}

impl Drop for MotorBank {
    fn drop(&mut self) {
        // Try to stop motors when the bank goes away (safety measure)
        for motor in self.left.iter_mut().chain(self.right.iter_mut()) {
            if let Err(e) = motor.stop() {
                warn!("Failed to stop motor 0x{:03X} on drop: {}", motor.id(), e);
            }
        }
    }
}
