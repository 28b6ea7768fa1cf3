//! Device registry: the in-memory view of devices, rooms and scenes
//!
//! Three namespaces are kept apart:
//! - physical devices, indexed by id, serial number and room
//! - room devices, virtual devices addressing a whole room
//! - scenes, keyed by their site index
//!
//! Records are only ever created or merged; a namespace is emptied as a whole
//! with its `clear_*` operation. Lookups never fail, they return `None`.

use std::collections::HashMap;
use std::hash::Hash;
use tracing::{debug, trace};

use crate::device::{Device, DeviceId, DevicePatch, DeviceState, RoomId, SerialNumber};
use crate::scene::{SceneEntry, SceneIndex, ScenePatch};
use crate::site::ApiSite;

/// Map that remembers insertion order
#[derive(Debug, Clone)]
struct Namespace<K, V> {
    entries: HashMap<K, V>,
    order: Vec<K>,
}

impl<K: Clone + Eq + Hash, V> Namespace<K, V> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            order: Vec::new(),
        }
    }

    fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Get the entry for `key`, inserting `make()` at the end if missing
    fn get_or_insert_with(&mut self, key: &K, make: impl FnOnce() -> V) -> &mut V {
        if !self.entries.contains_key(key) {
            self.order.push(key.clone());
        }
        self.entries.entry(key.clone()).or_insert_with(make)
    }

    fn values(&self) -> impl Iterator<Item = &V> {
        self.order.iter().filter_map(|k| self.entries.get(k))
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

impl<K: Clone + Eq + Hash, V> Default for Namespace<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Borrowed view of any registry record, see [`DeviceRegistry::all_devices`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RegistryEntry<'a> {
    Device(&'a Device),
    RoomDevice(&'a Device),
    Scene(&'a SceneEntry),
}

/// Authoritative store for device, room and scene state
#[derive(Debug, Clone, Default)]
pub struct DeviceRegistry {
    api_site: Option<ApiSite>,
    crypto_key: Option<Vec<u8>>,

    devices: Namespace<DeviceId, Device>,
    room_devices: Namespace<DeviceId, Device>,
    scenes: Namespace<SceneIndex, SceneEntry>,

    device_ids_by_room: HashMap<RoomId, Vec<DeviceId>>,
    device_ids_by_serial: HashMap<SerialNumber, DeviceId>,
}

impl DeviceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Every record: devices, then room devices, then scenes, each in
    /// insertion order
    pub fn all_devices(&self) -> Vec<RegistryEntry<'_>> {
        self.devices
            .values()
            .map(RegistryEntry::Device)
            .chain(self.room_devices.values().map(RegistryEntry::RoomDevice))
            .chain(self.scenes.values().map(RegistryEntry::Scene))
            .collect()
    }

    /// Insert or merge a physical device and update the serial and room indexes.
    /// A device whose serial number changes loses its old serial mapping, and
    /// a device whose room changes is removed from its previous room's list.
    pub fn upsert_device(&mut self, patch: DevicePatch) -> Device {
        let id = patch.id.clone();
        let device = self
            .devices
            .get_or_insert_with(&id, || Device::new(id.clone()));
        let previous_serial = device.serial_number.clone();
        let previous_room = device.room_id.clone();
        device.merge(patch);
        let merged = device.clone();

        if let Some(serial) = &merged.serial_number {
            if previous_serial.as_ref() != Some(serial) {
                // Another device may have claimed the old serial since
                if let Some(old) = previous_serial {
                    if self.device_ids_by_serial.get(&old) == Some(&id) {
                        self.device_ids_by_serial.remove(&old);
                    }
                }
            }
            if let Some(other) = self.device_ids_by_serial.insert(serial.clone(), id.clone()) {
                if other != id {
                    debug!(serial = %serial, from = %other, to = %id, "Serial number reassigned");
                }
            }
        }

        trace!(
            device = ?merged,
            total = self.devices.len(),
            "Added/updated device"
        );

        if let Some(room_id) = &merged.room_id {
            if let Some(old_room) = previous_room.filter(|r| r != room_id) {
                if let Some(ids) = self.device_ids_by_room.get_mut(&old_room) {
                    ids.retain(|d| d != &id);
                }
            }
            let ids = self.device_ids_by_room.entry(room_id.clone()).or_default();
            if !ids.contains(&id) {
                ids.push(id.clone());
            }
            trace!(room = %room_id, devices = ?ids, "Added device to room");
        }

        merged
    }

    /// Insert or merge a room-wide virtual device
    pub fn upsert_room_device(&mut self, patch: DevicePatch) -> Device {
        let id = patch.id.clone();
        let device = self
            .room_devices
            .get_or_insert_with(&id, || Device::new(id.clone()));
        device.merge(patch);
        let merged = device.clone();

        trace!(
            device = ?merged,
            total = self.room_devices.len(),
            "Added/updated room device"
        );
        merged
    }

    /// Insert or merge a scene record
    pub fn upsert_scene(&mut self, patch: ScenePatch) -> SceneEntry {
        let id = patch.id;
        let scene = self.scenes.get_or_insert_with(&id, || SceneEntry::new(id));
        scene.merge(patch);
        let merged = scene.clone();

        trace!(
            scene = ?merged,
            total = self.scenes.len(),
            "Added/updated scene"
        );
        merged
    }

    /// Drop all physical devices together with the room and serial indexes
    pub fn clear_devices(&mut self) {
        self.devices.clear();
        self.device_ids_by_room.clear();
        self.device_ids_by_serial.clear();
    }

    pub fn clear_room_devices(&mut self) {
        self.room_devices.clear();
    }

    pub fn clear_scenes(&mut self) {
        self.scenes.clear();
    }

    /// Look up a device by id, physical devices first, then room devices
    pub fn get_device(&self, id: &DeviceId) -> Option<&Device> {
        self.devices.get(id).or_else(|| self.room_devices.get(id))
    }

    pub fn get_device_by_serial_number(&self, serial: &SerialNumber) -> Option<&Device> {
        self.device_ids_by_serial
            .get(serial)
            .and_then(|id| self.get_device(id))
    }

    /// Device ids in a room, in the order they joined it
    pub fn get_device_ids_by_room(&self, room_id: &RoomId) -> &[DeviceId] {
        self.device_ids_by_room
            .get(room_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Name of a physical device
    pub fn get_device_name(&self, id: &DeviceId) -> Option<&str> {
        self.devices.get(id).and_then(|d| d.name.as_deref())
    }

    pub fn get_scene(&self, id: SceneIndex) -> Option<&SceneEntry> {
        self.scenes.get(&id)
    }

    pub fn get_scene_name(&self, id: SceneIndex) -> Option<&str> {
        self.scenes.get(&id).and_then(|s| s.name.as_deref())
    }

    /// Current state of a device. Unknown devices report an empty switch
    /// state rather than an error.
    pub fn get_state(&self, id: &DeviceId) -> DeviceState {
        self.get_device(id)
            .map(Device::current_state)
            .unwrap_or_default()
    }

    /// Find a device by id, creating a bare physical device when none exists
    pub fn find_or_create_device(&mut self, id: &DeviceId) -> &mut Device {
        if !self.devices.contains(id) {
            if self.room_devices.contains(id) {
                return self
                    .room_devices
                    .get_or_insert_with(id, || Device::new(id.clone()));
            }
            self.upsert_device(DevicePatch::new(id.clone()));
        }
        self.devices
            .get_or_insert_with(id, || Device::new(id.clone()))
    }

    /// Record a device's output state.
    ///
    /// Unknown ids get a bare device first. A brightness supplied for a
    /// device that is not dimmable is silently discarded.
    pub fn set_state(&mut self, id: &DeviceId, state: bool, dim: Option<u8>) {
        let device = self.find_or_create_device(id);
        device.apply_state(state, dim);
        trace!(device = ?device, "Updated state");
    }

    pub fn set_api_site(&mut self, site: ApiSite) {
        self.api_site = Some(site);
    }

    /// Site topology the scene catalog is built from
    pub fn api_site(&self) -> Option<&ApiSite> {
        self.api_site.as_ref()
    }

    pub fn set_crypto_key(&mut self, key: Vec<u8>) {
        self.crypto_key = Some(key);
    }

    pub fn crypto_key(&self) -> Option<&[u8]> {
        self.crypto_key.as_deref()
    }

    pub fn clear_crypto_key(&mut self) {
        self.crypto_key = None;
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub fn room_device_count(&self) -> usize {
        self.room_devices.len()
    }

    pub fn scene_count(&self) -> usize {
        self.scenes.len()
    }
}
