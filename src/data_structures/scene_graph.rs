//! Scene graph and hierarchical scene organization.
//!
//! A scene is a tree of [`SceneNode`]s. Each node has a kind (camera, light,
//! group, mesh or suspension boundary), an optional editable name, a local
//! transform and children. Trees are plain values: composing the same state
//! twice yields trees that compare equal.

use crate::{
    data_structures::{geometry::Geometry, instance::Instance, material::{Colour, Material}},
    error::{SceneError, SceneResult},
};

#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    Group,
    PerspectiveCamera {
        fov: f32,
        near: f32,
        far: f32,
        is_default: bool,
    },
    AmbientLight {
        intensity: f32,
        colour: Colour,
    },
    SpotLight {
        intensity: f32,
        angle: f32,
        penumbra: f32,
        colour: Colour,
    },
    PointLight {
        intensity: f32,
        colour: Colour,
    },
    Mesh {
        /// Pick id; only meshes with an id receive pointer events.
        id: Option<u32>,
        geometry: Geometry,
        material: Material,
    },
    /// Renders its children only once the resource it waits for resolved.
    Suspense { resolved: bool },
}

#[derive(Clone, Debug, PartialEq)]
pub struct SceneNode {
    pub kind: NodeKind,
    pub name: Option<String>,
    pub transform: Instance,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            name: None,
            transform: Instance::default(),
            children: Vec::new(),
        }
    }

    pub fn group() -> Self {
        Self::new(NodeKind::Group)
    }

    pub fn mesh(id: Option<u32>, geometry: Geometry, material: Material) -> Self {
        Self::new(NodeKind::Mesh {
            id,
            geometry,
            material,
        })
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_transform(mut self, transform: Instance) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_child(mut self, child: SceneNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = SceneNode>) -> Self {
        self.children.extend(children);
        self
    }

    /// Depth-first, pre-order traversal.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a SceneNode)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }

    pub fn find(&self, name: &str) -> Option<&SceneNode> {
        if self.name.as_deref() == Some(name) {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(name))
    }

    pub fn count(&self, predicate: &dyn Fn(&NodeKind) -> bool) -> usize {
        let mut n = 0;
        self.walk(&mut |node| {
            if predicate(&node.kind) {
                n += 1;
            }
        });
        n
    }

    pub fn default_camera_count(&self) -> usize {
        self.count(&|kind| {
            matches!(
                kind,
                NodeKind::PerspectiveCamera {
                    is_default: true,
                    ..
                }
            )
        })
    }
}

/// Fails unless exactly one camera across `roots` is marked as default.
pub fn validate_default_camera<'a>(roots: impl IntoIterator<Item = &'a SceneNode>) -> SceneResult<()> {
    let found: usize = roots.into_iter().map(SceneNode::default_camera_count).sum();
    if found != 1 {
        log::error!("Scene has {} default cameras, expected exactly one.", found);
        return Err(SceneError::DefaultCamera { found });
    }
    Ok(())
}
