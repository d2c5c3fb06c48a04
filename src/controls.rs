//! Orbit controls.
//!
//! [`OrbitControls`] rotates, zooms and pans a [`Camera`] around a fixed target.
//! Pointer input only accumulates deltas; the camera moves when
//! [`OrbitControls::update`] runs, which the host loop does once per frame.
//! With damping enabled each update applies a fraction of the pending delta and
//! keeps the rest for later frames, so a frame without an update leaves the
//! camera where it is.

use std::f32::consts::PI;

use cgmath::{EuclideanSpace, InnerSpace, Point3, Rad, Vector3};
use instant::Duration;
use serde::{Deserialize, Serialize};
use winit::{dpi::PhysicalPosition, event::MouseScrollDelta};

use crate::camera::Camera;

const EPS: f32 = 1e-6;
const PIXELS_PER_LINE: f32 = 100.0;
/// Squared displacement below which an update does not count as movement.
const MOVE_EPS: f32 = 1e-10;

/// Wheel steps of a scroll event; pixel deltas are converted at 100 px per line.
pub fn wheel_steps(delta: &MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => *y,
        MouseScrollDelta::PixelDelta(p) => p.y as f32 / PIXELS_PER_LINE,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlsConfig {
    pub enable_zoom: bool,
    pub enable_pan: bool,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub auto_rotate: bool,
    /// Scales pointer rotation and the auto-rotation. Negative values reverse the direction.
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub min_distance: f32,
    pub max_distance: Option<f32>,
    pub target: [f32; 3],
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            enable_zoom: true,
            enable_pan: false,
            enable_damping: true,
            damping_factor: 0.2,
            auto_rotate: true,
            rotate_speed: -0.5,
            zoom_speed: 1.0,
            pan_speed: 1.0,
            min_distance: 0.0,
            max_distance: None,
            target: [0.0, 0.0, 0.0],
        }
    }
}

/// Polar coordinates around the target: `theta` is the azimuth around +y, `phi` the angle from +y.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Spherical {
    radius: f32,
    theta: f32,
    phi: f32,
}

impl Spherical {
    fn from_offset(offset: Vector3<f32>) -> Self {
        let radius = offset.magnitude();
        if radius < EPS {
            return Self::default();
        }
        Self {
            radius,
            theta: offset.x.atan2(offset.z),
            phi: (offset.y / radius).clamp(-1.0, 1.0).acos(),
        }
    }

    fn to_offset(self) -> Vector3<f32> {
        let sin_phi = self.phi.sin();
        Vector3::new(
            self.radius * sin_phi * self.theta.sin(),
            self.radius * self.phi.cos(),
            self.radius * sin_phi * self.theta.cos(),
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Drag {
    None,
    Rotate(PhysicalPosition<f64>),
    Pan(PhysicalPosition<f64>),
}

#[derive(Clone, Debug)]
pub struct OrbitControls {
    config: ControlsConfig,
    target: Point3<f32>,
    delta: Spherical,
    scale: f32,
    pan_offset: Vector3<f32>,
    drag: Drag,
}

impl OrbitControls {
    pub fn new(config: ControlsConfig) -> Self {
        let target = Point3::from(config.target);
        Self {
            config,
            target,
            delta: Spherical::default(),
            scale: 1.0,
            pan_offset: Vector3::new(0.0, 0.0, 0.0),
            drag: Drag::None,
        }
    }

    pub fn config(&self) -> &ControlsConfig {
        &self.config
    }

    pub fn target(&self) -> Point3<f32> {
        self.target
    }

    pub fn is_dragging(&self) -> bool {
        self.drag != Drag::None
    }

    /// Azimuth increment of the auto-rotation for a frame of length `dt`.
    ///
    /// At speed 1.0 a full turn takes 60 seconds.
    pub fn auto_rotation_angle(&self, dt: Duration) -> f32 {
        2.0 * PI / 60.0 * self.config.rotate_speed * dt.as_secs_f32()
    }

    pub fn rotate_start(&mut self, position: PhysicalPosition<f64>) {
        self.drag = Drag::Rotate(position);
    }

    pub fn pan_start(&mut self, position: PhysicalPosition<f64>) {
        if self.config.enable_pan {
            self.drag = Drag::Pan(position);
        }
    }

    pub fn drag_end(&mut self) {
        self.drag = Drag::None;
    }

    /// Feed a pointer position. Only has an effect while dragging.
    ///
    /// `fovy` is the vertical field of view of the projection the viewport is drawn with.
    pub fn pointer_moved(
        &mut self,
        position: PhysicalPosition<f64>,
        viewport_height: u32,
        fovy: Rad<f32>,
        camera: &Camera,
    ) {
        let height = viewport_height.max(1) as f32;
        match self.drag {
            Drag::None => (),
            Drag::Rotate(last) => {
                let dx = (position.x - last.x) as f32;
                let dy = (position.y - last.y) as f32;
                self.rotate_left(2.0 * PI * dx / height * self.config.rotate_speed);
                self.rotate_up(2.0 * PI * dy / height * self.config.rotate_speed);
                self.drag = Drag::Rotate(position);
            }
            Drag::Pan(last) => {
                let dx = (position.x - last.x) as f32;
                let dy = (position.y - last.y) as f32;
                self.pan(dx, dy, height, fovy, camera);
                self.drag = Drag::Pan(position);
            }
        }
    }

    /// Zoom by wheel `steps`; positive steps move the camera closer.
    pub fn zoom(&mut self, steps: f32) {
        if !self.config.enable_zoom || steps == 0.0 {
            return;
        }
        let factor = 0.95_f32.powf(self.config.zoom_speed * steps.abs());
        if steps > 0.0 {
            self.scale *= factor;
        } else {
            self.scale /= factor;
        }
    }

    pub fn rotate_left(&mut self, angle: f32) {
        self.delta.theta -= angle;
    }

    pub fn rotate_up(&mut self, angle: f32) {
        self.delta.phi -= angle;
    }

    fn pan(&mut self, dx: f32, dy: f32, height: f32, fovy: Rad<f32>, camera: &Camera) {
        if !self.config.enable_pan {
            return;
        }
        let offset = camera.position - self.target;
        // world units covered by one pixel at the target distance
        let per_pixel = 2.0 * offset.magnitude() * (fovy.0 / 2.0).tan() / height;
        let forward = -offset;
        let right = forward.cross(camera.up);
        if right.magnitude2() < EPS {
            return;
        }
        let right = right.normalize();
        let up = right.cross(forward).normalize();
        self.pan_offset += (-right * dx + up * dy) * per_pixel * self.config.pan_speed;
    }

    /// Advance the controller by one frame and move `camera` accordingly.
    ///
    /// Returns `true` if the camera moved.
    pub fn update(&mut self, camera: &mut Camera, dt: Duration) -> bool {
        if self.config.auto_rotate && !self.is_dragging() {
            self.rotate_left(self.auto_rotation_angle(dt));
        }

        let mut spherical = Spherical::from_offset(camera.position - self.target);
        let damping = if self.config.enable_damping {
            self.config.damping_factor.clamp(0.0, 1.0)
        } else {
            1.0
        };
        spherical.theta += self.delta.theta * damping;
        spherical.phi = (spherical.phi + self.delta.phi * damping).clamp(EPS, PI - EPS);

        let max_distance = self.config.max_distance.unwrap_or(f32::INFINITY);
        spherical.radius = (spherical.radius * self.scale).clamp(self.config.min_distance, max_distance);

        self.target += self.pan_offset * damping;

        let position = self.target + spherical.to_offset();
        let moved = (position - camera.position).magnitude2() > MOVE_EPS
            || camera.target != self.target;
        camera.position = position;
        camera.target = self.target;

        if self.config.enable_damping {
            self.delta.theta *= 1.0 - damping;
            self.delta.phi *= 1.0 - damping;
            self.pan_offset *= 1.0 - damping;
        } else {
            self.delta = Spherical::default();
            self.pan_offset = Vector3::new(0.0, 0.0, 0.0);
        }
        self.scale = 1.0;
        moved
    }

    /// Reset the target to the configured one, dropping pending motion.
    pub fn reset(&mut self, camera: &mut Camera) {
        self.target = Point3::from(self.config.target);
        self.delta = Spherical::default();
        self.scale = 1.0;
        self.pan_offset = Vector3::new(0.0, 0.0, 0.0);
        self.drag = Drag::None;
        camera.target = self.target;
    }
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self::new(ControlsConfig::default())
    }
}
