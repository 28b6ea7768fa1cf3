//! Device types for tracking lighting hardware and its state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a device, as addressed on the mesh
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Create a DeviceId from a numeric mesh address
    pub fn from_address(address: u32) -> Self {
        Self(address.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Hardware serial number, the secondary key of a device
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SerialNumber(pub String);

impl SerialNumber {
    pub fn new(serial: impl Into<String>) -> Self {
        Self(serial.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SerialNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SerialNumber {
    fn from(serial: &str) -> Self {
        Self::new(serial)
    }
}

/// Room identifier; rooms only exist as a grouping of device ids
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RoomId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Snapshot of a device's output state
///
/// `Dimmable` is only produced for devices carrying the dimmable capability,
/// so a brightness is never reported for a plain switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DeviceState {
    /// On/off only
    Switch { state: Option<bool> },
    /// On/off with brightness
    Dimmable { state: Option<bool>, dim: Option<u8> },
}

impl DeviceState {
    /// Whether the device is known to be on
    pub fn is_on(&self) -> bool {
        match self {
            Self::Switch { state } | Self::Dimmable { state, .. } => state.unwrap_or(false),
        }
    }

    /// Brightness, only ever present for dimmable devices
    pub fn dim(&self) -> Option<u8> {
        match self {
            Self::Switch { .. } => None,
            Self::Dimmable { dim, .. } => *dim,
        }
    }
}

impl Default for DeviceState {
    fn default() -> Self {
        Self::Switch { state: None }
    }
}

/// A controllable lighting endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    /// Stable device identifier
    pub id: DeviceId,
    /// Hardware serial number
    pub serial_number: Option<SerialNumber>,
    /// Human-readable name
    pub name: Option<String>,
    /// Room this device belongs to
    pub room_id: Option<RoomId>,
    /// Product type label reported by the site
    pub type_name: Option<String>,
    /// Output channel on multi-output hardware
    pub output_index: Option<u8>,
    /// Last known on/off state
    pub state: Option<bool>,
    /// When the state was last written
    pub state_changed_at: Option<DateTime<Utc>>,
    dimmable: bool,
    dim: Option<u8>,
}

impl Device {
    /// Create a bare device carrying only its id
    pub fn new(id: DeviceId) -> Self {
        Self {
            id,
            serial_number: None,
            name: None,
            room_id: None,
            type_name: None,
            output_index: None,
            state: None,
            state_changed_at: None,
            dimmable: false,
            dim: None,
        }
    }

    pub fn is_dimmable(&self) -> bool {
        self.dimmable
    }

    /// Brightness level, `None` unless the device is dimmable
    pub fn dim(&self) -> Option<u8> {
        if self.dimmable {
            self.dim
        } else {
            None
        }
    }

    /// Current state, shaped by the device's capability
    pub fn current_state(&self) -> DeviceState {
        if self.dimmable {
            DeviceState::Dimmable {
                state: self.state,
                dim: self.dim,
            }
        } else {
            DeviceState::Switch { state: self.state }
        }
    }

    /// Merge a partial update onto this device.
    ///
    /// Fields set in `patch` win; fields left as `None` keep their current
    /// value. The capability flag is applied before `dim`, and `dim` is
    /// dropped whenever the merged device is not dimmable.
    pub fn merge(&mut self, patch: DevicePatch) {
        let DevicePatch {
            id: _,
            serial_number,
            name,
            room_id,
            type_name,
            output_index,
            dimmable,
            state,
            dim,
        } = patch;

        if let Some(serial_number) = serial_number {
            self.serial_number = Some(serial_number);
        }
        if let Some(name) = name {
            self.name = Some(name);
        }
        if let Some(room_id) = room_id {
            self.room_id = Some(room_id);
        }
        if let Some(type_name) = type_name {
            self.type_name = Some(type_name);
        }
        if let Some(output_index) = output_index {
            self.output_index = Some(output_index);
        }
        if let Some(dimmable) = dimmable {
            self.dimmable = dimmable;
        }
        if let Some(state) = state {
            self.state = Some(state);
        }
        if self.dimmable {
            if let Some(dim) = dim {
                self.dim = Some(dim);
            }
        } else {
            self.dim = None;
        }
    }

    /// Write an output state. A brightness is only kept for dimmable devices.
    pub(crate) fn apply_state(&mut self, state: bool, dim: Option<u8>) {
        self.state = Some(state);
        if let (Some(dim), true) = (dim, self.dimmable) {
            self.dim = Some(dim);
        }
        self.state_changed_at = Some(Utc::now());
    }
}

/// Partial device record used for upserts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DevicePatch {
    pub id: DeviceId,
    #[serde(default)]
    pub serial_number: Option<SerialNumber>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub room_id: Option<RoomId>,
    #[serde(default)]
    pub type_name: Option<String>,
    #[serde(default)]
    pub output_index: Option<u8>,
    #[serde(default)]
    pub dimmable: Option<bool>,
    #[serde(default)]
    pub state: Option<bool>,
    #[serde(default)]
    pub dim: Option<u8>,
}

impl DevicePatch {
    /// A patch that only names the device it applies to
    pub fn new(id: impl Into<DeviceId>) -> Self {
        Self {
            id: id.into(),
            serial_number: None,
            name: None,
            room_id: None,
            type_name: None,
            output_index: None,
            dimmable: None,
            state: None,
            dim: None,
        }
    }

    pub fn serial_number(mut self, serial: impl Into<SerialNumber>) -> Self {
        self.serial_number = Some(serial.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn room_id(mut self, room_id: impl Into<RoomId>) -> Self {
        self.room_id = Some(room_id.into());
        self
    }

    pub fn type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn output_index(mut self, output_index: u8) -> Self {
        self.output_index = Some(output_index);
        self
    }

    pub fn dimmable(mut self, dimmable: bool) -> Self {
        self.dimmable = Some(dimmable);
        self
    }

    pub fn state(mut self, state: bool) -> Self {
        self.state = Some(state);
        self
    }

    pub fn dim(mut self, dim: u8) -> Self {
        self.dim = Some(dim);
        self
    }
}

impl From<String> for DeviceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<String> for SerialNumber {
    fn from(serial: String) -> Self {
        Self(serial)
    }
}

impl From<String> for RoomId {
    fn from(id: String) -> Self {
        Self(id)
    }
}
