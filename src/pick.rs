//! Object picking.
//!
//! Picking casts a ray from the mouse into the last composed [`Frame`] and
//! returns the nearest mesh with a pick id. Each mesh is tested in its local
//! space: the ray is transformed by the inverse world matrix and intersected
//! with the bounds of the mesh geometry. Meshes without an id, such as the
//! dome, never block a pick.

use cgmath::{InnerSpace, SquareMatrix, Transform};

use crate::{camera::Ray, render::Frame};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hit {
    pub id: u32,
    /// Index of the flow that owns the hit mesh.
    pub flow: usize,
    pub distance: f32,
}

pub fn pick(frame: &Frame, ray: &Ray) -> Option<Hit> {
    let mut nearest: Option<Hit> = None;
    for mesh in &frame.meshes {
        let Some(id) = mesh.id else {
            continue;
        };
        let world = mesh.world.to_matrix();
        let Some(inverse) = world.invert() else {
            log::warn!("Mesh {} has a degenerate transform and cannot be picked", id);
            continue;
        };
        // the direction is left unnormalized so `t` stays a world-space parameter
        let local = Ray {
            origin: inverse.transform_point(ray.origin),
            direction: inverse.transform_vector(ray.direction),
        };
        let Some(t) = local.intersect_aabb(&mesh.geometry.bounds()) else {
            continue;
        };
        let distance = (ray.at(t) - ray.origin).magnitude();
        if nearest.is_none_or(|best| distance < best.distance) {
            nearest = Some(Hit {
                id,
                flow: mesh.flow,
                distance,
            });
        }
    }
    nearest
}

#[cfg(test)]
mod tests {
    use cgmath::{Point3, Vector3};

    use super::*;
    use crate::{
        data_structures::{
            geometry::Geometry,
            instance::Instance,
            material::{Colour, Material},
        },
        render::{ActiveCamera, Instanced},
    };

    fn frame(meshes: Vec<Instanced>) -> Frame {
        Frame {
            camera: ActiveCamera {
                name: None,
                world: Instance::new(),
                fov: 75.0,
                near: 0.1,
                far: 1000.0,
            },
            lights: Vec::new(),
            meshes,
            suspended: 0,
        }
    }

    fn cube(id: Option<u32>, world: Instance) -> Instanced {
        Instanced {
            id,
            flow: 0,
            geometry: Geometry::unit_box(),
            material: Material::Standard {
                colour: Colour::ORANGE,
            },
            world,
        }
    }

    fn forward_ray(x: f32) -> Ray {
        Ray {
            origin: Point3::new(x, 0.0, 5.0),
            direction: Vector3::new(0.0, 0.0, -1.0),
        }
    }

    #[test]
    fn nearest_of_two_cubes_wins() {
        let frame = frame(vec![
            cube(Some(1), Instance::at(0.0, 0.0, -3.0)),
            cube(Some(2), Instance::at(0.0, 0.0, 0.0)),
        ]);
        let hit = pick(&frame, &forward_ray(0.0)).unwrap();
        assert_eq!(hit.id, 2);
        assert!((hit.distance - 4.5).abs() < 1e-4);
    }

    #[test]
    fn scaled_cube_is_larger_target() {
        let small = frame(vec![cube(Some(1), Instance::new())]);
        let large = frame(vec![cube(
            Some(1),
            Instance::new().with_scale(Vector3::new(1.5, 1.5, 1.5)),
        )]);
        assert_eq!(pick(&small, &forward_ray(0.6)), None);
        assert!(pick(&large, &forward_ray(0.6)).is_some());
    }

    #[test]
    fn meshes_without_id_are_ignored() {
        let frame = frame(vec![cube(None, Instance::new())]);
        assert_eq!(pick(&frame, &forward_ray(0.0)), None);
    }
}
