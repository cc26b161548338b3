// Test bus: records frames from every attached motor in send order

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use super::channel::Motor;
use super::error::TransportError;
use super::protocol::Frame;
use super::transport::FrameTransport;

#[derive(Default)]
struct BusLog {
    frames: Vec<Frame>,
    failing: HashSet<u32>,
}

/// Shared log that all motors created from it write into
#[derive(Clone, Default)]
pub struct RecordingBus {
    log: Arc<Mutex<BusLog>>,
}

impl RecordingBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Motor with its own transport handle on this bus
    pub fn motor(&self, id: u32) -> Motor {
        Motor::new(id, Box::new(self.clone()))
    }

    /// Make every send to `id` fail from now on
    pub fn fail(&self, id: u32) {
        self.log.lock().unwrap().failing.insert(id);
    }

    pub fn frames(&self) -> Vec<Frame> {
        self.log.lock().unwrap().frames.clone()
    }

    pub fn opcodes(&self) -> Vec<u8> {
        self.frames().iter().map(Frame::opcode).collect()
    }

    /// (id, velocity code) for every velocity frame
    pub fn velocity_codes(&self) -> Vec<(u32, i32)> {
        self.frames()
            .iter()
            .filter(|frame| frame.opcode() == 0xA2)
            .map(|frame| {
                let code = [frame.data[4], frame.data[5], frame.data[6], frame.data[7]];
                (frame.id, i32::from_le_bytes(code))
            })
            .collect()
    }

    pub fn clear(&self) {
        self.log.lock().unwrap().frames.clear();
    }
}

impl FrameTransport for RecordingBus {
    fn send(&mut self, frame: &Frame) -> Result<(), TransportError> {
        let mut log = self.log.lock().unwrap();
        if log.failing.contains(&frame.id) {
            return Err(TransportError::Send {
                id: frame.id,
                source: std::io::Error::other("injected failure"),
            });
        }
        log.frames.push(*frame);
        Ok(())
    }
}
