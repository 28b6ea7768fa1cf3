//! Command transport towards the lighting hardware
//!
//! Commands are fire-and-forget: the caller never waits for delivery and
//! never sees a delivery failure. Only the order in which commands are
//! issued is guaranteed, not the order in which they complete.

use plejd_core::DeviceId;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{trace, warn};

/// Options for a turn-on command
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnOnOptions {
    /// Target brightness, only meaningful for dimmable devices
    pub brightness: Option<u8>,
}

/// A single device command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    TurnOn {
        device: DeviceId,
        brightness: Option<u8>,
    },
    TurnOff {
        device: DeviceId,
    },
}

impl Command {
    /// Device this command targets
    pub fn device(&self) -> &DeviceId {
        match self {
            Self::TurnOn { device, .. } | Self::TurnOff { device } => device,
        }
    }

    /// Hand this command to a transport
    pub fn dispatch(self, transport: &dyn Transport) {
        match self {
            Self::TurnOn { device, brightness } => {
                transport.turn_on(&device, TurnOnOptions { brightness })
            }
            Self::TurnOff { device } => transport.turn_off(&device),
        }
    }
}

/// Anything that can deliver on/off commands to devices.
///
/// Implementations must not block; the scene engine calls them while
/// walking a scene and moves on immediately.
pub trait Transport: Send + Sync {
    fn turn_on(&self, device: &DeviceId, options: TurnOnOptions);

    fn turn_off(&self, device: &DeviceId);
}

/// Transport that queues commands on a channel for a hardware worker
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<Command>,
}

impl ChannelTransport {
    /// Create a transport and the receiving end the hardware worker drains
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Command>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, command: Command) {
        trace!(command = ?command, "Queueing device command");
        if let Err(e) = self.tx.send(command) {
            warn!(device = %e.0.device(), "Command receiver closed, dropping command");
        }
    }
}

impl Transport for ChannelTransport {
    fn turn_on(&self, device: &DeviceId, options: TurnOnOptions) {
        self.send(Command::TurnOn {
            device: device.clone(),
            brightness: options.brightness,
        });
    }

    fn turn_off(&self, device: &DeviceId) {
        self.send(Command::TurnOff {
            device: device.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_transport_keeps_issue_order() {
        let (transport, mut rx) = ChannelTransport::new();
        transport.turn_on(&DeviceId::from("1"), TurnOnOptions { brightness: Some(10) });
        transport.turn_off(&DeviceId::from("2"));
        drop(transport);

        assert_eq!(
            rx.recv().await,
            Some(Command::TurnOn {
                device: DeviceId::from("1"),
                brightness: Some(10)
            })
        );
        assert_eq!(
            rx.recv().await,
            Some(Command::TurnOff {
                device: DeviceId::from("2")
            })
        );
        assert_eq!(rx.recv().await, None);
    }

    #[test]
    fn test_closed_receiver_is_ignored() {
        let (transport, rx) = ChannelTransport::new();
        drop(rx);
        transport.turn_off(&DeviceId::from("1"));
    }

    #[test]
    fn test_dispatch() {
        let (transport, mut rx) = ChannelTransport::new();
        Command::TurnOn {
            device: DeviceId::from("3"),
            brightness: None,
        }
        .dispatch(&transport);

        assert_eq!(
            rx.try_recv().unwrap(),
            Command::TurnOn {
                device: DeviceId::from("3"),
                brightness: None
            }
        );
    }
}
