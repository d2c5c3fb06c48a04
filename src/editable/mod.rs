//! Editable nodes.
//!
//! An [`EditableRegistry`] tracks the nodes of one scene instance that an
//! external editor may move. Each node has a scene-unique name and a base
//! transform set by code. The editor layers an override on top; the rendered
//! transform is `base * override`. Overrides are persisted through a
//! [`StateStore`] under a storage namespace and restored on the next start.
//!
//! The editor talks to the registry by message passing: it receives
//! [`EditorEvent`]s from the channel returned by
//! [`EditableRegistry::connect_editor`] and sends [`EditorCommand`]s back into
//! the host loop, which hands them to [`EditableRegistry::apply`].

use std::collections::BTreeMap;

use futures::channel::mpsc::{UnboundedReceiver, UnboundedSender, unbounded};

use crate::{
    data_structures::instance::Instance,
    error::{SceneError, SceneResult},
};

pub mod store;

pub use store::{EditableState, FileStore, MemoryStore, StateStore, TransformOverride};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditableKind {
    PerspectiveCamera,
    SpotLight,
    PointLight,
    Group,
    Mesh,
}

#[derive(Clone, Debug, PartialEq)]
pub enum EditorCommand {
    SetOverride { name: String, transform: Instance },
    ClearOverride { name: String },
}

impl EditorCommand {
    pub fn name(&self) -> &str {
        match self {
            EditorCommand::SetOverride { name, .. } | EditorCommand::ClearOverride { name } => name,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum EditorEvent {
    Registered {
        name: String,
        kind: EditableKind,
        base: Instance,
        rendered: Instance,
    },
    Deregistered {
        name: String,
    },
    OverrideChanged {
        name: String,
        rendered: Instance,
    },
}

#[derive(Clone, Debug)]
struct Registration {
    kind: EditableKind,
    base: Instance,
}

pub struct EditableRegistry {
    namespace: String,
    store: Box<dyn StateStore>,
    state: EditableState,
    nodes: BTreeMap<String, Registration>,
    editor: Option<UnboundedSender<EditorEvent>>,
}

impl std::fmt::Debug for EditableRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditableRegistry")
            .field("namespace", &self.namespace)
            .field("nodes", &self.nodes.keys().collect::<Vec<_>>())
            .field("state", &self.state)
            .finish()
    }
}

fn validate_namespace(namespace: &str) -> SceneResult<()> {
    let valid = !namespace.is_empty()
        && namespace
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if !valid {
        return Err(SceneError::InvalidNamespace(namespace.to_string()));
    }
    Ok(())
}

impl EditableRegistry {
    /// Create the registry of one scene instance.
    ///
    /// Entries persisted under `namespace` replace the ones of `initial`.
    pub fn new(
        namespace: impl Into<String>,
        initial: EditableState,
        store: Box<dyn StateStore>,
    ) -> SceneResult<Self> {
        let namespace = namespace.into();
        validate_namespace(&namespace)?;
        let mut state = initial;
        if let Some(persisted) = store.load(&namespace)? {
            log::info!(
                "Restored {} editable overrides from namespace `{}`",
                persisted.editables.len(),
                namespace
            );
            state.merge(persisted);
        }
        Ok(Self {
            namespace,
            store,
            state,
            nodes: BTreeMap::new(),
            editor: None,
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn state(&self) -> &EditableState {
        &self.state
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    /// Register a node and return its rendered transform.
    pub fn register(
        &mut self,
        name: &str,
        kind: EditableKind,
        base: Instance,
    ) -> SceneResult<Instance> {
        if name.is_empty() {
            return Err(SceneError::InvalidName);
        }
        if self.nodes.contains_key(name) {
            log::error!("Editable name `{}` registered twice", name);
            return Err(SceneError::DuplicateName(name.to_string()));
        }
        let rendered = self.compose(name, &base);
        self.nodes.insert(
            name.to_string(),
            Registration {
                kind,
                base: base.clone(),
            },
        );
        log::debug!("Registered editable `{}` as {:?}", name, kind);
        self.emit(EditorEvent::Registered {
            name: name.to_string(),
            kind,
            base,
            rendered: rendered.clone(),
        });
        Ok(rendered)
    }

    /// Remove a node. Its persisted override stays for the next registration.
    pub fn deregister(&mut self, name: &str) -> bool {
        if self.nodes.remove(name).is_none() {
            return false;
        }
        log::debug!("Deregistered editable `{}`", name);
        self.emit(EditorEvent::Deregistered {
            name: name.to_string(),
        });
        true
    }

    pub fn override_of(&self, name: &str) -> Option<Instance> {
        self.state.transform(name)
    }

    /// `base * override` of a registered node.
    pub fn rendered_transform(&self, name: &str) -> Option<Instance> {
        let registration = self.nodes.get(name)?;
        Some(self.compose(name, &registration.base))
    }

    fn compose(&self, name: &str, base: &Instance) -> Instance {
        match self.state.transform(name) {
            Some(overridden) => base * &overridden,
            None => base.clone(),
        }
    }

    /// Apply an editor command and persist the resulting state.
    ///
    /// The in-memory override is updated even if saving fails.
    pub fn apply(&mut self, command: EditorCommand) -> SceneResult<Instance> {
        let name = command.name().to_string();
        if !self.nodes.contains_key(&name) {
            return Err(SceneError::UnknownName(name));
        }
        match &command {
            EditorCommand::SetOverride { transform, .. } => self.state.set(&name, transform),
            EditorCommand::ClearOverride { .. } => {
                self.state.remove(&name);
            }
        }
        let rendered = self
            .rendered_transform(&name)
            .ok_or_else(|| SceneError::UnknownName(name.clone()))?;
        self.emit(EditorEvent::OverrideChanged {
            name,
            rendered: rendered.clone(),
        });
        self.store.save(&self.namespace, &self.state)?;
        Ok(rendered)
    }

    /// Attach an editor, replacing any previous one.
    ///
    /// Every currently registered node is replayed as [`EditorEvent::Registered`].
    pub fn connect_editor(&mut self) -> UnboundedReceiver<EditorEvent> {
        let (tx, rx) = unbounded();
        self.editor = Some(tx);
        let replay: Vec<_> = self
            .nodes
            .iter()
            .map(|(name, registration)| EditorEvent::Registered {
                name: name.clone(),
                kind: registration.kind,
                base: registration.base.clone(),
                rendered: self.compose(name, &registration.base),
            })
            .collect();
        for event in replay {
            self.emit(event);
        }
        rx
    }

    fn emit(&mut self, event: EditorEvent) {
        if let Some(editor) = &self.editor {
            if editor.unbounded_send(event).is_err() {
                log::info!("Editor disconnected");
                self.editor = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespaces_must_be_plain_identifiers() {
        assert!(validate_namespace("cubes-demo").is_ok());
        assert!(validate_namespace("v1.state_2").is_ok());
        assert!(validate_namespace("").is_err());
        assert!(validate_namespace("../escape").is_err());
    }
}
