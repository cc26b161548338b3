// Frame transports
//
// A transport is the bus handle owned by exactly one motor. Opening happens
// through `TransportMode::open`, closing happens when the transport is dropped.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::error::TransportError;
use super::protocol::Frame;

/// Sends single command frames onto the bus
pub trait FrameTransport {
    fn send(&mut self, frame: &Frame) -> Result<(), TransportError>;
}

/// Which transport a motor gets at construction time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    /// Raw SocketCAN socket bound to the interface
    #[default]
    Live,
    /// Log frames instead of transmitting them
    DryRun,
}

impl TransportMode {
    /// Open a transport on the named interface
    pub fn open(self, interface: &str) -> Result<Box<dyn FrameTransport>, TransportError> {
        match self {
            TransportMode::Live => open_live(interface),
            TransportMode::DryRun => Ok(Box::new(DryRunTransport::new(interface))),
        }
    }
}

#[cfg(target_os = "linux")]
fn open_live(interface: &str) -> Result<Box<dyn FrameTransport>, TransportError> {
    Ok(Box::new(socket_can::SocketCanTransport::open(interface)?))
}

#[cfg(not(target_os = "linux"))]
fn open_live(_interface: &str) -> Result<Box<dyn FrameTransport>, TransportError> {
    Err(TransportError::Unsupported)
}

/// Logs every frame it is given and never fails
#[derive(Debug)]
pub struct DryRunTransport {
    interface: String,
}

impl DryRunTransport {
    pub fn new(interface: &str) -> Self {
        debug!("Dry-run transport for {}", interface);
        Self {
            interface: interface.to_string(),
        }
    }
}

impl FrameTransport for DryRunTransport {
    fn send(&mut self, frame: &Frame) -> Result<(), TransportError> {
        info!("[{}] Sending CAN frame: {}", self.interface, frame);
        Ok(())
    }
}

#[cfg(target_os = "linux")]
pub use socket_can::SocketCanTransport;

#[cfg(target_os = "linux")]
mod socket_can {
    use socketcan::{CanFrame, CanSocket, EmbeddedFrame, ExtendedId, Id, Socket, StandardId};
    use tracing::debug;

    use super::FrameTransport;
    use crate::config::CAN_WRITE_TIMEOUT;
    use crate::motor::error::TransportError;
    use crate::motor::protocol::Frame;

    /// Raw CAN socket bound to one interface
    #[derive(Debug)]
    pub struct SocketCanTransport {
        socket: CanSocket,
    }

    impl SocketCanTransport {
        pub fn open(interface: &str) -> Result<Self, TransportError> {
            let open_err = |source| TransportError::Open {
                interface: interface.to_string(),
                source,
            };

            let socket = CanSocket::open(interface).map_err(open_err)?;
            socket
                .set_write_timeout(CAN_WRITE_TIMEOUT)
                .map_err(open_err)?;

            debug!("Bound CAN socket on {}", interface);
            Ok(Self { socket })
        }
    }

    impl FrameTransport for SocketCanTransport {
        fn send(&mut self, frame: &Frame) -> Result<(), TransportError> {
            let id = can_id(frame.id)?;
            let can_frame =
                CanFrame::new(id, &frame.data).ok_or(TransportError::InvalidId(frame.id))?;
            self.socket
                .write_frame(&can_frame)
                .map_err(|source| TransportError::Send {
                    id: frame.id,
                    source,
                })
        }
    }

    /// Standard id when it fits in 11 bits, extended otherwise
    fn can_id(raw: u32) -> Result<Id, TransportError> {
        if let Some(id) = u16::try_from(raw).ok().and_then(StandardId::new) {
            return Ok(Id::Standard(id));
        }
        ExtendedId::new(raw)
            .map(Id::Extended)
            .ok_or(TransportError::InvalidId(raw))
    }

}
