//! Site topology as delivered by the cloud API
//!
//! The bridge never talks to the API itself; it consumes a site document
//! (usually a cached snapshot on disk) and hands it to the registry. Only the
//! parts the registry and scene engine read are modelled, unknown keys are
//! ignored.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

use crate::device::{RoomId, SerialNumber};
use crate::scene::{SceneId, SceneIndex};

#[derive(Error, Debug)]
pub enum SiteError {
    #[error("Failed to read site document: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse site document: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("Invalid crypto key: {0}")]
    CryptoKey(#[from] hex::FromHexError),
}

/// A scene as listed by the site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteScene {
    pub scene_id: SceneId,
    #[serde(default)]
    pub title: String,
    /// Scenes hidden from the scene list are not activatable. A scene
    /// without the flag is not listed either.
    #[serde(default)]
    pub hidden_from_scene_list: Option<bool>,
}

impl SiteScene {
    /// Whether the site explicitly lists this scene
    pub fn is_listed(&self) -> bool {
        self.hidden_from_scene_list == Some(false)
    }
}

/// One step of a scene, stored flat across all scenes of the site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteSceneStep {
    pub scene_id: SceneId,
    /// Serial number of the targeted device
    pub device_id: SerialNumber,
    #[serde(deserialize_with = "deserialize_step_state")]
    pub state: bool,
    /// Brightness for dimmable outputs
    #[serde(default)]
    pub value: Option<u8>,
}

/// A physical device as listed by the site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteDevice {
    /// Serial number of the device
    pub device_id: SerialNumber,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub room_id: Option<RoomId>,
    #[serde(default)]
    pub dimmable: bool,
    #[serde(default)]
    pub type_name: Option<String>,
    #[serde(default)]
    pub output_index: Option<u8>,
}

/// A room as listed by the site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteRoom {
    pub room_id: RoomId,
    #[serde(default)]
    pub title: String,
}

/// Mesh settings shared by all devices of the site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlejdMesh {
    /// Hex-encoded mesh crypto key
    pub crypto_key: String,
}

/// The full site document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSite {
    #[serde(default)]
    pub scenes: Vec<SiteScene>,
    /// Site-assigned sequential index per scene
    #[serde(default)]
    pub scene_index: HashMap<SceneId, SceneIndex>,
    #[serde(default)]
    pub scene_steps: Vec<SiteSceneStep>,
    #[serde(default)]
    pub devices: Vec<SiteDevice>,
    #[serde(default)]
    pub rooms: Vec<SiteRoom>,
    /// Mesh address per device serial number
    #[serde(default)]
    pub device_address: HashMap<SerialNumber, u32>,
    /// Mesh address per room, used for room-wide virtual devices
    #[serde(default)]
    pub room_address: HashMap<RoomId, u32>,
    #[serde(default)]
    pub plejd_mesh: Option<PlejdMesh>,
}

impl ApiSite {
    /// Parse a site document from a JSON string
    pub fn from_json(content: &str) -> Result<Self, SiteError> {
        let site: ApiSite = serde_json::from_str(content)?;
        Ok(site)
    }

    /// Load a site document from a JSON file
    pub fn from_file(path: &Path) -> Result<Self, SiteError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Save the site document as pretty-printed JSON
    pub fn to_file(&self, path: &Path) -> Result<(), SiteError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Scenes to catalog, paired with their site index. Unlisted scenes are
    /// dropped unless `include_hidden` is set; scenes without an index are
    /// skipped.
    pub fn indexed_scenes(
        &self,
        include_hidden: bool,
    ) -> impl Iterator<Item = (SceneIndex, &SiteScene)> {
        self.scenes
            .iter()
            .filter(move |s| include_hidden || s.is_listed())
            .filter_map(|s| match self.scene_index.get(&s.scene_id) {
                Some(&index) => Some((index, s)),
                None => {
                    warn!(scene_id = %s.scene_id, "Scene has no index, skipping");
                    None
                }
            })
    }

    /// Steps belonging to one scene, in site order
    pub fn steps_for<'a>(&'a self, scene_id: &'a SceneId) -> impl Iterator<Item = &'a SiteSceneStep> {
        self.scene_steps.iter().filter(move |s| &s.scene_id == scene_id)
    }

    /// Decoded mesh crypto key, if the site carries one
    pub fn crypto_key(&self) -> Result<Option<Vec<u8>>, SiteError> {
        match &self.plejd_mesh {
            Some(mesh) => {
                let key = mesh.crypto_key.replace('-', "");
                Ok(Some(hex::decode(key)?))
            }
            None => Ok(None),
        }
    }
}

/// Step states arrive as "On"/"Off", as booleans or as 0/1
fn deserialize_step_state<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawState {
        Bool(bool),
        Number(i64),
        Text(String),
    }

    match RawState::deserialize(deserializer)? {
        RawState::Bool(b) => Ok(b),
        RawState::Number(n) => Ok(n != 0),
        RawState::Text(s) => match s.to_ascii_lowercase().as_str() {
            "on" | "true" | "1" => Ok(true),
            "off" | "false" | "0" => Ok(false),
            other => Err(serde::de::Error::custom(format!(
                "unknown scene step state '{}'",
                other
            ))),
        },
    }
}
