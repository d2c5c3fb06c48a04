//! Background dome.
//!
//! The dome is a large inward-facing sphere around the scene, mapped with a
//! texture fetched from a URL. The fetch runs asynchronously; until it resolves
//! the dome renders as an empty suspension node. Every mount starts a new load
//! generation, and a result that arrives for an older generation, or after the
//! dome was unmounted, is dropped.

use crate::{
    config::DomeConfig,
    data_structures::{
        geometry::Geometry,
        material::{Colour, Material, Side},
        scene_graph::{NodeKind, SceneNode},
        texture::{LoadState, Texture, TextureResource},
    },
    error::SceneResult,
};

/// Colour of the dome when its texture could not be loaded.
pub const FALLBACK_COLOUR: Colour = Colour::SLATE_GREY;

#[derive(Clone, Debug)]
pub struct Dome {
    geometry: Geometry,
    texture: TextureResource,
    mounted: Option<u64>,
    generation: u64,
}

impl Dome {
    pub fn new(config: &DomeConfig) -> Self {
        Self {
            geometry: Geometry::Sphere {
                radius: config.radius,
                width_segments: config.width_segments,
                height_segments: config.height_segments,
            },
            texture: TextureResource::new(config.texture_url.clone()),
            mounted: None,
            generation: 0,
        }
    }

    pub fn url(&self) -> &str {
        self.texture.url()
    }

    pub fn texture(&self) -> &TextureResource {
        &self.texture
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.is_some()
    }

    /// Start a new load generation. The caller fetches the texture and hands
    /// the result to [`Dome::resolve`] together with the returned generation.
    pub fn mount(&mut self) -> u64 {
        self.generation += 1;
        self.mounted = Some(self.generation);
        self.texture = TextureResource::new(self.texture.url().to_string());
        log::debug!("Dome mounted, loading {} (generation {})", self.url(), self.generation);
        self.generation
    }

    pub fn unmount(&mut self) {
        if self.mounted.take().is_some() {
            log::debug!("Dome unmounted");
        }
    }

    /// Apply a finished load. Returns `false` if the result was stale and dropped.
    pub fn resolve(&mut self, generation: u64, result: SceneResult<Texture>) -> bool {
        if self.mounted != Some(generation) {
            log::debug!(
                "Dropping dome texture of generation {} (mounted: {:?})",
                generation,
                self.mounted
            );
            return false;
        }
        match result {
            Ok(texture) => {
                log::info!(
                    "Dome texture {} loaded ({}x{})",
                    self.url(),
                    texture.dimensions.0,
                    texture.dimensions.1
                );
                self.texture.set_loaded(texture);
            }
            Err(e) => {
                log::warn!("Dome fell back to a solid colour: {}", e);
                self.texture.set_failed(e.to_string());
            }
        }
        true
    }

    /// The dome subtree. `None` while unmounted.
    pub fn render(&self) -> Option<SceneNode> {
        self.mounted?;
        let material = match self.texture.state() {
            LoadState::Pending => {
                return Some(SceneNode::new(NodeKind::Suspense { resolved: false }));
            }
            LoadState::Loaded(texture) => Material::Basic {
                colour: Colour::WHITE,
                map: Some(texture.to_ref()),
                side: Side::Back,
            },
            LoadState::Failed(_) => Material::Basic {
                colour: FALLBACK_COLOUR,
                map: None,
                side: Side::Back,
            },
        };
        Some(
            SceneNode::new(NodeKind::Suspense { resolved: true })
                .with_child(SceneNode::mesh(None, self.geometry, material)),
        )
    }
}
