//! Frame composition.
//!
//! Flows describe their part of the scene as a [`SceneNode`] tree. Each tick the
//! host flattens all trees into one [`Frame`]: a single resolved default camera,
//! the lights and a flat list of meshes with world transforms. A [`Presenter`]
//! then takes the frame to its destination.
//!
//! # Key types
//!
//! - [`Frame`] is the flattened, render-ready scene
//! - [`Instanced`] is one mesh together with its world transform and owning flow
//! - [`Presenter`] is the seam to whatever displays frames

use crate::{
    data_structures::{
        geometry::Geometry,
        instance::Instance,
        material::{Colour, Material},
        scene_graph::{NodeKind, SceneNode, validate_default_camera},
    },
    error::{SceneError, SceneResult},
};

#[derive(Clone, Debug, PartialEq)]
pub struct ActiveCamera {
    pub name: Option<String>,
    pub world: Instance,
    pub fov: f32,
    pub near: f32,
    pub far: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub enum LightKind {
    Ambient,
    Spot { angle: f32, penumbra: f32 },
    Point,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LightItem {
    pub name: Option<String>,
    pub kind: LightKind,
    pub intensity: f32,
    pub colour: Colour,
    pub world: Instance,
}

/// A mesh ready to be drawn.
#[derive(Clone, Debug, PartialEq)]
pub struct Instanced {
    /// Pick id, if the mesh receives pointer events.
    pub id: Option<u32>,
    /// Index of the flow that rendered the mesh.
    pub flow: usize,
    pub geometry: Geometry,
    pub material: Material,
    pub world: Instance,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub camera: ActiveCamera,
    pub lights: Vec<LightItem>,
    pub meshes: Vec<Instanced>,
    /// Number of suspension boundaries still waiting for their resource.
    pub suspended: usize,
}

impl Frame {
    /// Flatten the trees of all flows. `trees` pairs each tree with the index of its flow.
    pub fn compose(trees: &[(usize, SceneNode)]) -> SceneResult<Frame> {
        validate_default_camera(trees.iter().map(|(_, tree)| tree))?;
        let mut builder = FrameBuilder::default();
        for (flow, tree) in trees {
            builder.visit(*flow, tree, &Instance::new());
        }
        let camera = builder
            .camera
            .ok_or(SceneError::DefaultCamera { found: 0 })?;
        Ok(Frame {
            camera,
            lights: builder.lights,
            meshes: builder.meshes,
            suspended: builder.suspended,
        })
    }

    pub fn mesh(&self, id: u32) -> Option<&Instanced> {
        self.meshes.iter().find(|mesh| mesh.id == Some(id))
    }

    pub fn triangle_count(&self) -> usize {
        self.meshes
            .iter()
            .map(|mesh| mesh.geometry.triangle_count())
            .sum()
    }
}

#[derive(Default)]
struct FrameBuilder {
    camera: Option<ActiveCamera>,
    lights: Vec<LightItem>,
    meshes: Vec<Instanced>,
    suspended: usize,
}

impl FrameBuilder {
    fn visit(&mut self, flow: usize, node: &SceneNode, parent: &Instance) {
        let world = parent * &node.transform;
        match &node.kind {
            NodeKind::Group => (),
            NodeKind::PerspectiveCamera {
                fov,
                near,
                far,
                is_default,
            } => {
                if *is_default {
                    self.camera = Some(ActiveCamera {
                        name: node.name.clone(),
                        world: world.clone(),
                        fov: *fov,
                        near: *near,
                        far: *far,
                    });
                }
            }
            NodeKind::AmbientLight { intensity, colour } => {
                self.light(node, LightKind::Ambient, *intensity, *colour, &world)
            }
            NodeKind::SpotLight {
                intensity,
                angle,
                penumbra,
                colour,
            } => self.light(
                node,
                LightKind::Spot {
                    angle: *angle,
                    penumbra: *penumbra,
                },
                *intensity,
                *colour,
                &world,
            ),
            NodeKind::PointLight { intensity, colour } => {
                self.light(node, LightKind::Point, *intensity, *colour, &world)
            }
            NodeKind::Mesh {
                id,
                geometry,
                material,
            } => self.meshes.push(Instanced {
                id: *id,
                flow,
                geometry: *geometry,
                material: material.clone(),
                world: world.clone(),
            }),
            NodeKind::Suspense { resolved: false } => {
                self.suspended += 1;
                return;
            }
            NodeKind::Suspense { resolved: true } => (),
        }
        for child in &node.children {
            self.visit(flow, child, &world);
        }
    }

    fn light(&mut self, node: &SceneNode, kind: LightKind, intensity: f32, colour: Colour, world: &Instance) {
        self.lights.push(LightItem {
            name: node.name.clone(),
            kind,
            intensity,
            colour,
            world: world.clone(),
        });
    }
}

/// Destination of composed frames.
pub trait Presenter {
    fn present(&mut self, frame: &Frame) -> anyhow::Result<()>;
}

/// Logs a summary whenever the presented frame differs from the previous one.
#[derive(Debug, Default)]
pub struct LogPresenter {
    last: Option<Frame>,
    presented: u64,
}

impl LogPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn presented(&self) -> u64 {
        self.presented
    }
}

impl Presenter for LogPresenter {
    fn present(&mut self, frame: &Frame) -> anyhow::Result<()> {
        self.presented += 1;
        let changed_meshes = match &self.last {
            Some(last) => last.meshes != frame.meshes || last.suspended != frame.suspended,
            None => true,
        };
        if changed_meshes {
            log::info!(
                "Frame {}: {} meshes ({} triangles), {} lights, {} suspended",
                self.presented,
                frame.meshes.len(),
                frame.triangle_count(),
                frame.lights.len(),
                frame.suspended
            );
        } else {
            log::trace!("Frame {}: camera at {:?}", self.presented, frame.camera.world.position);
        }
        self.last = Some(frame.clone());
        Ok(())
    }
}
