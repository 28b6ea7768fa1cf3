//! Scene catalog and scene execution

use plejd_core::{DeviceRegistry, Scene, SceneIndex, SceneStep};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::transport::{Command, Transport};
use crate::SharedRegistry;

/// Catalog building options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneOptions {
    /// Keep scenes the site hides from its scene list
    #[serde(default)]
    pub include_hidden: bool,
}

/// Outcome of a scene execution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionReport {
    /// Commands handed to the transport
    pub issued: usize,
    /// Steps whose device could not be resolved
    pub skipped: usize,
}

/// Builds the scene catalog from the registry's site and runs scenes
pub struct SceneManager {
    registry: SharedRegistry,
    transport: Arc<dyn Transport>,
    options: SceneOptions,
    /// `None` until the first `init`
    scenes: Option<HashMap<SceneIndex, Scene>>,
}

impl SceneManager {
    pub fn new(registry: SharedRegistry, transport: Arc<dyn Transport>) -> Self {
        Self::with_options(registry, transport, SceneOptions::default())
    }

    pub fn with_options(
        registry: SharedRegistry,
        transport: Arc<dyn Transport>,
        options: SceneOptions,
    ) -> Self {
        Self {
            registry,
            transport,
            options,
            scenes: None,
        }
    }

    /// Whether `init` has run
    pub fn is_ready(&self) -> bool {
        self.scenes.is_some()
    }

    /// (Re)build the scene catalog from the registry's site topology.
    ///
    /// The previous catalog is replaced, never merged. Returns the number of
    /// scenes in the new catalog.
    pub async fn init(&mut self) -> usize {
        let registry = self.registry.read().await;
        let scenes = build_catalog(&registry, self.options);
        drop(registry);

        let count = scenes.len();
        self.scenes = Some(scenes);
        info!(scenes = count, "Scene catalog built");
        count
    }

    pub fn scene(&self, index: SceneIndex) -> Option<&Scene> {
        self.scenes.as_ref().and_then(|s| s.get(&index))
    }

    /// All catalog scenes ordered by index
    pub fn scenes(&self) -> Vec<&Scene> {
        let mut scenes: Vec<&Scene> = self
            .scenes
            .iter()
            .flat_map(|s| s.values())
            .collect();
        scenes.sort_by_key(|s| s.index);
        scenes
    }

    /// Run a scene by its site index.
    ///
    /// Unknown indexes are logged and ignored. Steps are resolved in order
    /// against one registry snapshot, then issued to the transport without
    /// waiting on delivery. Steps whose device is unknown are skipped.
    pub async fn execute_scene(&self, index: SceneIndex) -> ExecutionReport {
        let Some(scene) = self.scene(index) else {
            info!(scene = %index, "Scene not found");
            debug!(
                scenes = ?self.scenes().iter().map(|s| s.index).collect::<Vec<_>>(),
                "Known scenes"
            );
            return ExecutionReport::default();
        };

        let commands: Vec<Option<Command>> = {
            let registry = self.registry.read().await;
            scene
                .steps
                .iter()
                .map(|step| resolve_step(&registry, step))
                .collect()
        };

        let mut report = ExecutionReport::default();
        for command in commands {
            match command {
                Some(command) => {
                    command.dispatch(self.transport.as_ref());
                    report.issued += 1;
                }
                None => report.skipped += 1,
            }
        }

        debug!(
            scene = %index,
            name = %scene.name,
            issued = report.issued,
            skipped = report.skipped,
            "Executed scene"
        );
        report
    }
}

/// Build a catalog keyed by site scene index
fn build_catalog(registry: &DeviceRegistry, options: SceneOptions) -> HashMap<SceneIndex, Scene> {
    let mut catalog = HashMap::new();

    let Some(site) = registry.api_site() else {
        warn!("No site loaded, scene catalog is empty");
        return catalog;
    };

    for (index, site_scene) in site.indexed_scenes(options.include_hidden) {
        let scene = Scene::from_site(index, site_scene, site.steps_for(&site_scene.scene_id));
        if let Some(previous) = catalog.insert(index, scene) {
            warn!(
                scene = %index,
                replaced = %previous.scene_id,
                "Duplicate scene index"
            );
        }
    }

    catalog
}

/// Translate one step into a device command, `None` when the serial number
/// does not resolve to a known device
fn resolve_step(registry: &DeviceRegistry, step: &SceneStep) -> Option<Command> {
    let device = registry.get_device_by_serial_number(&step.device_id)?;

    let command = match (device.is_dimmable(), step.state) {
        (true, true) => Command::TurnOn {
            device: device.id.clone(),
            brightness: step.brightness,
        },
        (false, true) => Command::TurnOn {
            device: device.id.clone(),
            brightness: None,
        },
        (_, false) => Command::TurnOff {
            device: device.id.clone(),
        },
    };
    Some(command)
}
