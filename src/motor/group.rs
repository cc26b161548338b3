// Motors that are always commanded together (one side of the rover)

use tracing::{debug, warn};

use super::channel::Motor;
use super::error::{self, MemberFailure, MotorError, Result};

/// Ordered set of motors driven by identical commands
///
/// The group borrows its members; whoever opened the motors keeps owning them.
/// Once grouped, members must only be driven through the group, otherwise the
/// group's brake flag no longer matches what was sent to them.
#[derive(Debug)]
pub struct MotorGroup<'m> {
    members: Vec<&'m mut Motor>,
    brake_engaged: bool,
}

impl<'m> MotorGroup<'m> {
    pub fn new(members: Vec<&'m mut Motor>) -> Self {
        Self {
            members,
            brake_engaged: true,
        }
    }

    /// Last commanded brake state of the group
    pub fn brake_engaged(&self) -> bool {
        self.brake_engaged
    }

    /// CAN ids of the members, in command order
    pub fn motor_ids(&self) -> Vec<u32> {
        self.members.iter().map(|motor| motor.id()).collect()
    }

    /// Spin every member at `speed_mps`
    pub fn set_speeds(&mut self, speed_mps: f32) -> Result<()> {
        if self.brake_engaged {
            return Err(MotorError::BrakeEngaged);
        }
        debug!("Group {:?}: speed {} m/s", self.motor_ids(), speed_mps);
        self.fan_out(|motor| motor.spin(speed_mps))
    }

    pub fn brakes_on(&mut self) -> Result<()> {
        let result = self.fan_out(Motor::brakes_on);
        self.brake_engaged = true;
        result
    }

    pub fn brakes_off(&mut self) -> Result<()> {
        let result = self.fan_out(Motor::brakes_off);
        self.brake_engaged = false;
        result
    }

    pub fn stop(&mut self) -> Result<()> {
        self.fan_out(Motor::stop)
    }

    pub fn shutdown(&mut self) -> Result<()> {
        self.fan_out(Motor::shutdown)
    }

    /// Run `op` on every member in order, carrying on past failures
    fn fan_out(&mut self, mut op: impl FnMut(&mut Motor) -> Result<()>) -> Result<()> {
        let mut failures = Vec::new();
        for (index, motor) in self.members.iter_mut().enumerate() {
            if let Err(e) = op(&mut **motor) {
                warn!("Motor 0x{:03X} command failed: {}", motor.id(), e);
                failures.push(MemberFailure::motor(index, motor.id(), e));
            }
        }
        error::collect(failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motor::error::FailureSource;
    use crate::motor::protocol::velocity_code;
    use crate::motor::testing::RecordingBus;

    #[test]
    fn test_set_speeds_refused_while_braked() {
        let bus = RecordingBus::new();
        let mut a = bus.motor(1);
        let mut b = bus.motor(2);
        let mut group = MotorGroup::new(vec![&mut a, &mut b]);

        assert!(matches!(group.set_speeds(0.3), Err(MotorError::BrakeEngaged)));
        assert!(bus.frames().is_empty());
    }

    #[test]
    fn test_fan_out_in_declaration_order() {
        let bus = RecordingBus::new();
        let mut a = bus.motor(0x91);
        let mut b = bus.motor(0x8F);
        let mut c = bus.motor(0x90);
        let mut group = MotorGroup::new(vec![&mut a, &mut b, &mut c]);

        group.brakes_off().unwrap();
        group.set_speeds(0.4).unwrap();

        let ids: Vec<u32> = bus.frames().iter().map(|frame| frame.id).collect();
        assert_eq!(ids, vec![0x91, 0x8F, 0x90, 0x91, 0x8F, 0x90]);
        let code = velocity_code(0.4);
        assert_eq!(
            bus.velocity_codes(),
            vec![(0x91, code), (0x8F, code), (0x90, code)]
        );
    }

    #[test]
    fn test_failing_member_does_not_strand_others() {
        let bus = RecordingBus::new();
        let mut a = bus.motor(1);
        let mut b = bus.motor(2);
        let mut c = bus.motor(3);
        let mut group = MotorGroup::new(vec![&mut a, &mut b, &mut c]);
        group.brakes_off().unwrap();
        bus.clear();
        bus.fail(2);

        let err = group.set_speeds(0.5).unwrap_err();

        let sent: Vec<u32> = bus.frames().iter().map(|frame| frame.id).collect();
        assert_eq!(sent, vec![1, 3]);
        match err {
            MotorError::Fanout(failures) => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].source, FailureSource::Motor { index: 1, id: 2 });
                assert_eq!(failures[0].motor_id(), Some(2));
                assert!(failures[0].side.is_none());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_brake_flag_tracks_intent_after_failure() {
        let bus = RecordingBus::new();
        let mut a = bus.motor(1);
        let mut b = bus.motor(2);
        let mut group = MotorGroup::new(vec![&mut a, &mut b]);
        bus.fail(1);

        assert!(group.brakes_off().is_err());
        assert!(!group.brake_engaged());
        // Motor 2 still got the release
        assert_eq!(bus.opcodes(), vec![0x77]);

        assert!(group.brakes_on().is_err());
        assert!(group.brake_engaged());
    }

    #[test]
    fn test_stop_and_shutdown_reach_every_member() {
        let bus = RecordingBus::new();
        let mut a = bus.motor(1);
        let mut b = bus.motor(2);
        let mut group = MotorGroup::new(vec![&mut a, &mut b]);
        group.brakes_off().unwrap();
        bus.clear();

        group.stop().unwrap();
        group.shutdown().unwrap();

        assert!(!group.brake_engaged());
        assert_eq!(bus.opcodes(), vec![0x81, 0x81, 0x80, 0x80]);
        assert_eq!(group.motor_ids(), vec![1, 2]);
    }

    #[test]
    fn test_all_failures_collected() {
        let bus = RecordingBus::new();
        let mut a = bus.motor(1);
        let mut b = bus.motor(2);
        let mut group = MotorGroup::new(vec![&mut a, &mut b]);
        bus.fail(1);
        bus.fail(2);

        match group.stop() {
            Err(MotorError::Fanout(failures)) => {
                let ids: Vec<_> = failures.iter().filter_map(|f| f.motor_id()).collect();
                assert_eq!(ids, vec![1, 2]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
