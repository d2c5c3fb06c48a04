//! Camera pose, projection and mouse ray casting.

use cgmath::{
    EuclideanSpace, InnerSpace, Matrix3, Matrix4, One, Point3, Quaternion, Rad, SquareMatrix,
    Vector3, Vector4,
};
use winit::dpi::PhysicalPosition;

use crate::data_structures::{geometry::Aabb, instance::Instance};

/// A camera that looks from `position` at `target`.
#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
}

impl Camera {
    pub fn new(position: Point3<f32>, target: Point3<f32>) -> Self {
        Self {
            position,
            target,
            up: Vector3::unit_y(),
        }
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn distance(&self) -> f32 {
        (self.position - self.target).magnitude()
    }

    /// World rotation of the camera. The camera looks down its local -z axis.
    pub fn orientation(&self) -> Quaternion<f32> {
        let forward = self.target - self.position;
        let right = forward.cross(self.up);
        if forward.magnitude2() < f32::EPSILON || right.magnitude2() < f32::EPSILON {
            return Quaternion::one();
        }
        let forward = forward.normalize();
        let right = right.normalize();
        let up = right.cross(forward);
        Quaternion::from(Matrix3::from_cols(right, up, -forward))
    }

    /// The camera's pose as a scene transform.
    pub fn to_instance(&self) -> Instance {
        Instance {
            position: self.position.to_vec(),
            rotation: self.orientation(),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }

    /// Move the camera to the position of `transform`, keeping the target.
    pub fn seed(&mut self, transform: &Instance) {
        self.position = Point3::from_vec(transform.position);
    }

    /// Cast a ray from the eye through the pixel under the mouse.
    ///
    /// Returns `None` for degenerate viewports or projections.
    pub fn cast_ray_from_mouse(
        &self,
        coords: PhysicalPosition<f64>,
        width: f32,
        height: f32,
        projection: &Projection,
    ) -> Option<Ray> {
        if width <= 0.0 || height <= 0.0 {
            return None;
        }
        let x = 2.0 * coords.x as f32 / width - 1.0;
        let y = 1.0 - 2.0 * coords.y as f32 / height;
        let inverse = (projection.calc_matrix() * self.calc_matrix()).invert()?;
        let unproject = |z: f32| {
            let p = inverse * Vector4::new(x, y, z, 1.0);
            Point3::new(p.x / p.w, p.y / p.w, p.z / p.w)
        };
        let near = unproject(-1.0);
        let far = unproject(1.0);
        let direction = far - near;
        if direction.magnitude2() < f32::EPSILON {
            return None;
        }
        Some(Ray {
            origin: near,
            direction: direction.normalize(),
        })
    }

    /// Project a world point to pixel coordinates. `None` if it is behind the camera.
    pub fn world_to_screen(
        &self,
        point: Point3<f32>,
        width: f32,
        height: f32,
        projection: &Projection,
    ) -> Option<PhysicalPosition<f64>> {
        let clip = projection.calc_matrix() * self.calc_matrix() * point.to_homogeneous();
        if clip.w <= 0.0 {
            return None;
        }
        let (x, y) = (clip.x / clip.w, clip.y / clip.w);
        Some(PhysicalPosition::new(
            ((x + 1.0) / 2.0 * width) as f64,
            ((1.0 - y) / 2.0 * height) as f64,
        ))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Projection {
    aspect: f32,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width.max(1) as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
    }

    pub fn fovy(&self) -> Rad<f32> {
        self.fovy
    }

    pub fn set_fovy<F: Into<Rad<f32>>>(&mut self, fovy: F) {
        self.fovy = fovy.into();
    }

    pub fn set_clipping(&mut self, znear: f32, zfar: f32) {
        self.znear = znear;
        self.zfar = zfar;
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        cgmath::perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Point3<f32>,
    pub direction: Vector3<f32>,
}

impl Ray {
    pub fn at(&self, t: f32) -> Point3<f32> {
        self.origin + self.direction * t
    }

    /// Slab test. Returns the smallest non-negative `t` at which the ray is inside `aabb`.
    ///
    /// `t` is in units of `direction`, so callers may pass unnormalized directions.
    pub fn intersect_aabb(&self, aabb: &Aabb) -> Option<f32> {
        let mut t_min = 0.0_f32;
        let mut t_max = f32::INFINITY;
        for axis in 0..3 {
            let origin = self.origin[axis];
            let direction = self.direction[axis];
            if direction.abs() < f32::EPSILON {
                if origin < aabb.min[axis] || origin > aabb.max[axis] {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / direction;
            let mut t0 = (aabb.min[axis] - origin) * inv;
            let mut t1 = (aabb.max[axis] - origin) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return None;
            }
        }
        Some(t_min)
    }
}

#[cfg(test)]
mod tests {
    use cgmath::Deg;

    use super::*;

    fn setup() -> (Camera, Projection) {
        (
            Camera::new(Point3::new(0.0, 0.0, 5.0), Point3::origin()),
            Projection::new(800, 600, Deg(75.0), 0.1, 1000.0),
        )
    }

    #[test]
    fn center_ray_points_at_target() {
        let (camera, projection) = setup();
        let ray = camera
            .cast_ray_from_mouse(PhysicalPosition::new(400.0, 300.0), 800.0, 600.0, &projection)
            .unwrap();
        assert!((ray.direction - Vector3::new(0.0, 0.0, -1.0)).magnitude() < 1e-4);
    }

    #[test]
    fn projected_point_casts_back_onto_itself() {
        let (camera, projection) = setup();
        let point = Point3::new(-1.2, 0.3, 0.0);
        let screen = camera.world_to_screen(point, 800.0, 600.0, &projection).unwrap();
        let ray = camera.cast_ray_from_mouse(screen, 800.0, 600.0, &projection).unwrap();
        let to_point = (point - ray.origin).normalize();
        assert!((to_point - ray.direction).magnitude() < 1e-3);
    }

    #[test]
    fn orientation_looks_down_negative_z() {
        let (camera, _) = setup();
        let forward = camera.orientation() * Vector3::new(0.0, 0.0, -1.0);
        assert!((forward - Vector3::new(0.0, 0.0, -1.0)).magnitude() < 1e-5);
    }

    #[test]
    fn ray_misses_box_beside_it() {
        let aabb = Aabb {
            min: Point3::new(-0.5, -0.5, -0.5),
            max: Point3::new(0.5, 0.5, 0.5),
        };
        let hit = Ray {
            origin: Point3::new(0.0, 0.0, 5.0),
            direction: Vector3::new(0.0, 0.0, -1.0),
        };
        let miss = Ray {
            origin: Point3::new(2.0, 0.0, 5.0),
            direction: Vector3::new(0.0, 0.0, -1.0),
        };
        assert_eq!(hit.intersect_aabb(&aabb), Some(4.5));
        assert_eq!(miss.intersect_aabb(&aabb), None);
    }
}
