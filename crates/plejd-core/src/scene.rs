//! Scene types

use serde::{Deserialize, Serialize};

use crate::device::SerialNumber;
use crate::site::{SiteScene, SiteSceneStep};

/// Scene identifier assigned by the cloud
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SceneId(pub String);

impl SceneId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SceneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SceneId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Sequential scene number assigned by the site; this is what triggers
/// (wall buttons, automations) refer to when activating a scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SceneIndex(pub u32);

impl std::fmt::Display for SceneIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registry record for an activatable scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneEntry {
    pub id: SceneIndex,
    pub scene_id: Option<SceneId>,
    pub name: Option<String>,
}

impl SceneEntry {
    pub fn new(id: SceneIndex) -> Self {
        Self {
            id,
            scene_id: None,
            name: None,
        }
    }

    /// Merge a partial update; `None` fields never override
    pub fn merge(&mut self, patch: ScenePatch) {
        if let Some(scene_id) = patch.scene_id {
            self.scene_id = Some(scene_id);
        }
        if let Some(name) = patch.name {
            self.name = Some(name);
        }
    }
}

/// Partial scene record used for upserts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenePatch {
    pub id: SceneIndex,
    #[serde(default)]
    pub scene_id: Option<SceneId>,
    #[serde(default)]
    pub name: Option<String>,
}

impl ScenePatch {
    pub fn new(id: SceneIndex) -> Self {
        Self {
            id,
            scene_id: None,
            name: None,
        }
    }

    pub fn scene_id(mut self, scene_id: SceneId) -> Self {
        self.scene_id = Some(scene_id);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// One scene instruction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneStep {
    /// Serial number of the targeted device
    pub device_id: SerialNumber,
    /// Desired on/off state
    pub state: bool,
    /// Brightness, only applied to dimmable devices being turned on
    pub brightness: Option<u8>,
}

impl From<&SiteSceneStep> for SceneStep {
    fn from(step: &SiteSceneStep) -> Self {
        Self {
            device_id: step.device_id.clone(),
            state: step.state,
            brightness: step.value,
        }
    }
}

/// An executable scene: a named, ordered list of steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub index: SceneIndex,
    pub scene_id: SceneId,
    pub name: String,
    pub steps: Vec<SceneStep>,
}

impl Scene {
    /// Build a scene from its site listing and its steps, in the order given
    pub fn from_site<'a>(
        index: SceneIndex,
        scene: &SiteScene,
        steps: impl IntoIterator<Item = &'a SiteSceneStep>,
    ) -> Self {
        Self {
            index,
            scene_id: scene.scene_id.clone(),
            name: scene.title.clone(),
            steps: steps.into_iter().map(SceneStep::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::site::ApiSite;

    fn step(scene: &str, serial: &str, state: bool, value: Option<u8>) -> SiteSceneStep {
        SiteSceneStep {
            scene_id: SceneId::from(scene),
            device_id: SerialNumber::from(serial),
            state,
            value,
        }
    }

    #[test]
    fn test_scene_from_site_groups_steps() {
        let site = ApiSite {
            scenes: vec![SiteScene {
                scene_id: SceneId::from("s1"),
                title: "Movie".to_string(),
                hidden_from_scene_list: Some(false),
            }],
            scene_steps: vec![
                step("s1", "A", true, Some(30)),
                step("s2", "B", true, None),
                step("s1", "C", false, None),
            ],
            ..Default::default()
        };

        let site_scene = &site.scenes[0];
        let scene = Scene::from_site(SceneIndex(4), site_scene, site.steps_for(&site_scene.scene_id));
        assert_eq!(scene.index, SceneIndex(4));
        assert_eq!(scene.name, "Movie");
        assert_eq!(scene.steps.len(), 2);
        assert_eq!(scene.steps[0].device_id.as_str(), "A");
        assert_eq!(scene.steps[0].brightness, Some(30));
        assert_eq!(scene.steps[1].device_id.as_str(), "C");
        assert!(!scene.steps[1].state);
    }

    #[test]
    fn test_scene_entry_merge() {
        let mut entry = SceneEntry::new(SceneIndex(1));
        entry.merge(ScenePatch::new(SceneIndex(1)).name("Morning").scene_id(SceneId::from("s1")));
        entry.merge(ScenePatch::new(SceneIndex(1)).name("Early morning"));
        assert_eq!(entry.name.as_deref(), Some("Early morning"));
        assert_eq!(entry.scene_id, Some(SceneId::from("s1")));
    }
}
