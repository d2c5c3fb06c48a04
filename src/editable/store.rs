//! Persisted editor overrides and the stores that keep them.
//!
//! The state is a JSON document keyed by editable name:
//!
//! ```json
//! { "editables": { "Box1": { "transform": { "position": [0, 1, 0] } } } }
//! ```
//!
//! Missing transform fields default to the identity.

use std::{
    collections::{BTreeMap, HashMap},
    path::PathBuf,
    sync::{Arc, Mutex},
};

use cgmath::{Quaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::{data_structures::instance::Instance, error::SceneResult};

/// Initial overrides shipped with the demo scene.
pub const INITIAL_STATE: &str = include_str!("../../assets/editable_state.json");

/// An override transform. `rotation` is stored as `[x, y, z, w]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformOverride {
    #[serde(default = "zero")]
    pub position: [f32; 3],
    #[serde(default = "identity_rotation")]
    pub rotation: [f32; 4],
    #[serde(default = "one")]
    pub scale: [f32; 3],
}

fn zero() -> [f32; 3] {
    [0.0; 3]
}

fn one() -> [f32; 3] {
    [1.0; 3]
}

fn identity_rotation() -> [f32; 4] {
    [0.0, 0.0, 0.0, 1.0]
}

impl Default for TransformOverride {
    fn default() -> Self {
        Self {
            position: zero(),
            rotation: identity_rotation(),
            scale: one(),
        }
    }
}

impl From<&TransformOverride> for Instance {
    fn from(value: &TransformOverride) -> Self {
        let [x, y, z, w] = value.rotation;
        Instance::from(Vector3::from(value.position))
            .with_rotation(Quaternion::new(w, x, y, z))
            .with_scale(Vector3::from(value.scale))
    }
}

impl From<&Instance> for TransformOverride {
    fn from(value: &Instance) -> Self {
        let q = value.rotation;
        Self {
            position: value.position.into(),
            rotation: [q.v.x, q.v.y, q.v.z, q.s],
            scale: value.scale.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditableEntry {
    #[serde(default)]
    pub transform: TransformOverride,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditableState {
    #[serde(default)]
    pub editables: BTreeMap<String, EditableEntry>,
}

impl EditableState {
    pub fn from_json(content: &str) -> SceneResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn to_json(&self) -> SceneResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// The snapshot bundled in `assets/editable_state.json`.
    pub fn initial() -> SceneResult<Self> {
        Self::from_json(INITIAL_STATE)
    }

    pub fn transform(&self, name: &str) -> Option<Instance> {
        self.editables
            .get(name)
            .map(|entry| Instance::from(&entry.transform))
    }

    pub fn set(&mut self, name: &str, transform: &Instance) {
        self.editables.insert(
            name.to_string(),
            EditableEntry {
                transform: transform.into(),
            },
        );
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.editables.remove(name).is_some()
    }

    /// Entries of `other` replace entries of `self` with the same name.
    pub fn merge(&mut self, other: EditableState) {
        self.editables.extend(other.editables);
    }
}

/// Persistence backend for the editable state of one namespace.
pub trait StateStore {
    /// `Ok(None)` if nothing was stored under `namespace` yet.
    fn load(&self, namespace: &str) -> SceneResult<Option<EditableState>>;

    fn save(&mut self, namespace: &str, state: &EditableState) -> SceneResult<()>;
}

/// Stores each namespace as `<dir>/<namespace>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self, namespace: &str) -> PathBuf {
        self.dir.join(format!("{}.json", namespace))
    }
}

impl StateStore for FileStore {
    fn load(&self, namespace: &str) -> SceneResult<Option<EditableState>> {
        let path = self.path(namespace);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)?;
        log::debug!("Loaded editable state from {}", path.display());
        Ok(Some(EditableState::from_json(&content)?))
    }

    fn save(&mut self, namespace: &str, state: &EditableState) -> SceneResult<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path(namespace);
        std::fs::write(&path, state.to_json()?)?;
        log::debug!("Saved editable state to {}", path.display());
        Ok(())
    }
}

/// In-memory store. Clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    states: Arc<Mutex<HashMap<String, EditableState>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, namespace: &str) -> Option<EditableState> {
        self.lock().get(namespace).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, EditableState>> {
        // a poisoned map still holds complete states
        self.states.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl StateStore for MemoryStore {
    fn load(&self, namespace: &str) -> SceneResult<Option<EditableState>> {
        Ok(self.get(namespace))
    }

    fn save(&mut self, namespace: &str, state: &EditableState) -> SceneResult<()> {
        self.lock().insert(namespace.to_string(), state.clone());
        Ok(())
    }
}

/// Browser `localStorage`, keyed by namespace.
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Clone)]
pub struct LocalStorage {
    storage: web_sys::Storage,
}

#[cfg(target_arch = "wasm32")]
impl LocalStorage {
    pub fn new() -> SceneResult<Self> {
        let storage = web_sys::window()
            .and_then(|window| window.local_storage().ok().flatten())
            .ok_or_else(|| js_error("localStorage is not available"))?;
        Ok(Self { storage })
    }
}

#[cfg(target_arch = "wasm32")]
fn js_error(reason: impl std::fmt::Debug) -> crate::error::SceneError {
    std::io::Error::other(format!("{:?}", reason)).into()
}

#[cfg(target_arch = "wasm32")]
impl StateStore for LocalStorage {
    fn load(&self, namespace: &str) -> SceneResult<Option<EditableState>> {
        match self.storage.get_item(namespace).map_err(js_error)? {
            Some(content) => Ok(Some(EditableState::from_json(&content)?)),
            None => Ok(None),
        }
    }

    fn save(&mut self, namespace: &str, state: &EditableState) -> SceneResult<()> {
        self.storage
            .set_item(namespace, &state.to_json()?)
            .map_err(js_error)
    }
}
