//! Bridge state: registry, scene engine and the site they are built from

use anyhow::{Context, Result};
use plejd_core::{
    ApiSite, DeviceId, DevicePatch, DeviceRegistry, DeviceState, SceneIndex, ScenePatch,
};
use plejd_scene::{ExecutionReport, SceneManager, SceneOptions, SharedRegistry, Transport};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::Config;

/// Shared bridge state
pub struct Bridge {
    /// Device, room and scene registry
    registry: SharedRegistry,
    /// Scene catalog and executor
    scenes: RwLock<SceneManager>,
    /// Configuration
    config: Config,
}

impl Bridge {
    /// Create a bridge with an empty registry
    pub fn new(config: Config, transport: Arc<dyn Transport>) -> Self {
        let registry: SharedRegistry = Arc::new(RwLock::new(DeviceRegistry::new()));
        let scenes = SceneManager::with_options(
            registry.clone(),
            transport,
            config.scenes.to_scene_options(),
        );

        Self {
            registry,
            scenes: RwLock::new(scenes),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Handle to the registry, for whoever reports device state
    pub fn registry(&self) -> SharedRegistry {
        self.registry.clone()
    }

    /// Load the site document named in the configuration.
    /// Returns the number of activatable scenes.
    pub async fn load_site_file(&self) -> Result<usize> {
        let path = Path::new(&self.config.site.path);
        let site = ApiSite::from_file(path)
            .with_context(|| format!("loading site from {}", path.display()))?;
        info!(path = %path.display(), "Loaded site document");
        Ok(self.load_site(site).await)
    }

    /// Replace all registry contents with the given site and rebuild the
    /// scene catalog. Returns the number of activatable scenes.
    pub async fn load_site(&self, site: ApiSite) -> usize {
        {
            let mut registry = self.registry.write().await;
            apply_site(&mut registry, site, self.config.scenes.to_scene_options());
        }
        self.scenes.write().await.init().await
    }

    pub async fn execute_scene(&self, index: SceneIndex) -> ExecutionReport {
        self.scenes.read().await.execute_scene(index).await
    }

    /// Record a state reported by a device
    pub async fn set_state(&self, id: &DeviceId, state: bool, dim: Option<u8>) {
        self.registry.write().await.set_state(id, state, dim);
    }

    pub async fn get_state(&self, id: &DeviceId) -> DeviceState {
        self.registry.read().await.get_state(id)
    }
}

/// Populate the registry from a site document, clearing what was there
fn apply_site(registry: &mut DeviceRegistry, site: ApiSite, options: SceneOptions) {
    registry.clear_devices();
    registry.clear_room_devices();
    registry.clear_scenes();

    match site.crypto_key() {
        Ok(Some(key)) => registry.set_crypto_key(key),
        Ok(None) => {
            debug!("Site has no crypto key");
            registry.clear_crypto_key();
        }
        Err(e) => {
            warn!(error = %e, "Ignoring invalid crypto key");
            registry.clear_crypto_key();
        }
    }

    for device in &site.devices {
        let Some(&address) = site.device_address.get(&device.device_id) else {
            warn!(serial = %device.device_id, "Device has no mesh address, skipping");
            continue;
        };

        let mut patch = DevicePatch::new(DeviceId::from_address(address))
            .serial_number(device.device_id.clone())
            .name(&device.title)
            .dimmable(device.dimmable);
        if let Some(room_id) = &device.room_id {
            patch = patch.room_id(room_id.clone());
        }
        if let Some(type_name) = &device.type_name {
            patch = patch.type_name(type_name.clone());
        }
        if let Some(output_index) = device.output_index {
            patch = patch.output_index(output_index);
        }
        registry.upsert_device(patch);
    }

    for room in &site.rooms {
        let Some(&address) = site.room_address.get(&room.room_id) else {
            debug!(room = %room.room_id, "Room has no mesh address, skipping");
            continue;
        };

        // A room dims when any of its devices does
        let dimmable = site
            .devices
            .iter()
            .any(|d| d.dimmable && d.room_id.as_ref() == Some(&room.room_id));

        registry.upsert_room_device(
            DevicePatch::new(DeviceId::from_address(address))
                .name(&room.title)
                .room_id(room.room_id.clone())
                .dimmable(dimmable),
        );
    }

    for (index, scene) in site.indexed_scenes(options.include_hidden) {
        registry.upsert_scene(
            ScenePatch::new(index)
                .scene_id(scene.scene_id.clone())
                .name(&scene.title),
        );
    }

    info!(
        devices = registry.device_count(),
        rooms = registry.room_device_count(),
        scenes = registry.scene_count(),
        "Registry populated from site"
    );
    registry.set_api_site(site);
}

#[cfg(test)]
mod tests {
    use super::*;
    use plejd_core::{RoomId, SerialNumber};
    use plejd_scene::{ChannelTransport, Command};

    const SITE: &str = r#"{
        "devices": [
            { "deviceId": "AAA", "title": "Ceiling", "roomId": "living", "dimmable": true, "typeName": "DIM-01" },
            { "deviceId": "BBB", "title": "Socket", "roomId": "living" },
            { "deviceId": "CCC", "title": "Garden", "roomId": "outside", "dimmable": true },
            { "deviceId": "ZZZ", "title": "Unpaired" }
        ],
        "deviceAddress": { "AAA": 11, "BBB": 12, "CCC": 13 },
        "rooms": [
            { "roomId": "living", "title": "Living room" },
            { "roomId": "outside", "title": "Outside" }
        ],
        "roomAddress": { "living": 100 },
        "scenes": [
            { "sceneId": "s-home", "title": "Home", "hiddenFromSceneList": false },
            { "sceneId": "s-away", "title": "Away", "hiddenFromSceneList": false },
            { "sceneId": "s-service", "title": "Service", "hiddenFromSceneList": true },
            { "sceneId": "s-legacy", "title": "Legacy" }
        ],
        "sceneIndex": { "s-home": 0, "s-away": 1, "s-service": 2, "s-legacy": 3 },
        "sceneSteps": [
            { "sceneId": "s-home", "deviceId": "AAA", "state": "On", "value": 80 },
            { "sceneId": "s-home", "deviceId": "BBB", "state": "On", "value": 200 },
            { "sceneId": "s-home", "deviceId": "ZZZ", "state": "On" },
            { "sceneId": "s-home", "deviceId": "CCC", "state": "Off" },
            { "sceneId": "s-away", "deviceId": "AAA", "state": "Off" }
        ],
        "plejdMesh": { "cryptoKey": "a1b2c3d4" }
    }"#;

    fn bridge(config: Config) -> (Bridge, tokio::sync::mpsc::UnboundedReceiver<Command>) {
        let (transport, rx) = ChannelTransport::new();
        (Bridge::new(config, Arc::new(transport)), rx)
    }

    #[tokio::test]
    async fn test_load_site_populates_registry() {
        let (bridge, _rx) = bridge(Config::default());
        let scenes = bridge.load_site(ApiSite::from_json(SITE).unwrap()).await;
        assert_eq!(scenes, 2);

        let registry = bridge.registry();
        let registry = registry.read().await;
        assert_eq!(registry.device_count(), 3);
        assert_eq!(registry.room_device_count(), 1);
        assert_eq!(registry.scene_count(), 2);
        assert_eq!(registry.crypto_key(), Some(&[0xa1u8, 0xb2, 0xc3, 0xd4][..]));

        let ceiling = registry
            .get_device_by_serial_number(&SerialNumber::from("AAA"))
            .unwrap();
        assert_eq!(ceiling.id, DeviceId::from("11"));
        assert_eq!(ceiling.type_name.as_deref(), Some("DIM-01"));
        assert!(ceiling.is_dimmable());

        assert_eq!(
            registry.get_device_ids_by_room(&RoomId::from("living")),
            &[DeviceId::from("11"), DeviceId::from("12")]
        );
        let room = registry.get_device(&DeviceId::from("100")).unwrap();
        assert_eq!(room.name.as_deref(), Some("Living room"));
        assert!(room.is_dimmable());
        assert_eq!(registry.get_scene_name(SceneIndex(1)), Some("Away"));
        // No hiddenFromSceneList flag means the scene is not listed
        assert!(registry.get_scene(SceneIndex(3)).is_none());
    }

    #[tokio::test]
    async fn test_execute_scene_through_bridge() {
        let (bridge, mut rx) = bridge(Config::default());
        bridge.load_site(ApiSite::from_json(SITE).unwrap()).await;

        let report = bridge.execute_scene(SceneIndex(0)).await;
        assert_eq!(report, ExecutionReport { issued: 3, skipped: 1 });

        let mut commands = Vec::new();
        while let Ok(command) = rx.try_recv() {
            commands.push(command);
        }
        assert_eq!(
            commands,
            vec![
                Command::TurnOn {
                    device: DeviceId::from("11"),
                    brightness: Some(80)
                },
                Command::TurnOn {
                    device: DeviceId::from("12"),
                    brightness: None
                },
                Command::TurnOff {
                    device: DeviceId::from("13")
                },
            ]
        );

        assert_eq!(bridge.execute_scene(SceneIndex(2)).await, ExecutionReport::default());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_reload_replaces_everything() {
        let (bridge, _rx) = bridge(Config::default());
        bridge.load_site(ApiSite::from_json(SITE).unwrap()).await;
        bridge.set_state(&DeviceId::from("11"), true, Some(60)).await;
        assert_eq!(bridge.get_state(&DeviceId::from("11")).await.dim(), Some(60));

        assert_eq!(bridge.load_site(ApiSite::default()).await, 0);
        let registry = bridge.registry();
        let registry = registry.read().await;
        assert!(registry.all_devices().is_empty());
        assert!(registry.crypto_key().is_none());
    }

    #[tokio::test]
    async fn test_load_site_file_with_hidden_scenes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site.json");
        std::fs::write(&path, SITE).unwrap();

        let mut config = Config::default();
        config.site.path = path.display().to_string();
        config.scenes.include_hidden = true;

        let (bridge, _rx) = bridge(config);
        assert_eq!(bridge.load_site_file().await.unwrap(), 4);
        assert_eq!(bridge.execute_scene(SceneIndex(2)).await.issued, 0);
        let registry = bridge.registry();
        assert_eq!(registry.read().await.get_scene_name(SceneIndex(3)), Some("Legacy"));
    }

    #[tokio::test]
    async fn test_missing_site_file() {
        let mut config = Config::default();
        config.site.path = "/nonexistent/site.json".to_string();
        let (bridge, _rx) = bridge(config);
        assert!(bridge.load_site_file().await.is_err());
    }
}
