//! Pointer interaction state of a clickable, hoverable object.

use cgmath::Vector3;

use crate::data_structures::{
    geometry::Geometry,
    instance::Instance,
    material::{Colour, Material},
    scene_graph::SceneNode,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerEvent {
    Enter,
    Leave,
    Click,
}

/// Hover and active flags of one object. Both start `false`.
#[derive(Clone, Debug, PartialEq)]
pub struct Interactive {
    pub hovered: bool,
    pub active: bool,
    pub position: Vector3<f32>,
}

impl Interactive {
    pub fn new(position: Vector3<f32>) -> Self {
        Self {
            hovered: false,
            active: false,
            position,
        }
    }

    pub fn on_pointer_enter(&mut self) {
        self.hovered = true;
    }

    pub fn on_pointer_leave(&mut self) {
        self.hovered = false;
    }

    pub fn on_click(&mut self) {
        self.active = !self.active;
    }

    pub fn handle(&mut self, event: PointerEvent) {
        match event {
            PointerEvent::Enter => self.on_pointer_enter(),
            PointerEvent::Leave => self.on_pointer_leave(),
            PointerEvent::Click => self.on_click(),
        }
    }

    pub fn scale(&self) -> Vector3<f32> {
        if self.active {
            Vector3::new(1.5, 1.5, 1.5)
        } else {
            Vector3::new(1.0, 1.0, 1.0)
        }
    }

    pub fn colour(&self) -> Colour {
        if self.hovered {
            Colour::HOTPINK
        } else {
            Colour::ORANGE
        }
    }

    /// The object as a unit box mesh with pick id `id`.
    pub fn render(&self, id: u32) -> SceneNode {
        SceneNode::mesh(
            Some(id),
            Geometry::unit_box(),
            Material::Standard {
                colour: self.colour(),
            },
        )
        .with_transform(Instance::from(self.position).with_scale(self.scale()))
    }
}

impl Default for Interactive {
    fn default() -> Self {
        Self::new(Vector3::new(0.0, 0.0, 0.0))
    }
}
