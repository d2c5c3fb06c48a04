use cgmath::{Deg, Point3};
use winit::dpi::{PhysicalPosition, PhysicalSize};

use crate::{
    camera::{Camera, Projection, Ray},
    controls::{ControlsConfig, OrbitControls},
};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MouseState {
    pub coords: PhysicalPosition<f64>,
    /// `false` once the pointer left the window.
    pub inside: bool,
}

#[derive(Clone, Debug)]
pub struct CameraResources {
    pub camera: Camera,
    pub controls: OrbitControls,
}

/// Everything flows may read or configure besides their own state.
#[derive(Clone, Debug)]
pub struct Context {
    pub size: PhysicalSize<u32>,
    pub camera: CameraResources,
    pub projection: Projection,
    pub mouse: MouseState,
}

impl Context {
    pub fn new(width: u32, height: u32, controls: ControlsConfig) -> Self {
        let controls = OrbitControls::new(controls);
        let camera = Camera::new(Point3::new(0.0, 0.0, 5.0), controls.target());
        let projection = Projection::new(width, height, Deg(75.0), 0.1, 1000.0);
        Self {
            size: PhysicalSize::new(width, height),
            camera: CameraResources { camera, controls },
            projection,
            mouse: MouseState::default(),
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.size = PhysicalSize::new(width, height);
            self.projection.resize(width, height);
        }
    }

    /// Ray through the current mouse position, if the pointer is inside the window.
    pub fn mouse_ray(&self) -> Option<Ray> {
        if !self.mouse.inside {
            return None;
        }
        self.camera.camera.cast_ray_from_mouse(
            self.mouse.coords,
            self.size.width as f32,
            self.size.height as f32,
            &self.projection,
        )
    }
}
