//! Plejd Core - Device, room and scene state for the Plejd bridge
//!
//! This crate provides the foundational types for the bridge:
//! - Device types with capability-gated brightness
//! - Scene types and the site topology they are built from
//! - The device registry, indexed by id, serial number and room

pub mod device;
pub mod registry;
pub mod scene;
pub mod site;

pub use device::{Device, DeviceId, DevicePatch, DeviceState, RoomId, SerialNumber};
pub use registry::{DeviceRegistry, RegistryEntry};
pub use scene::{Scene, SceneEntry, SceneId, SceneIndex, ScenePatch, SceneStep};
pub use site::{ApiSite, PlejdMesh, SiteDevice, SiteError, SiteRoom, SiteScene, SiteSceneStep};
