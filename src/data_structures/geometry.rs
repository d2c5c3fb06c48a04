//! Parametric mesh geometry.
//!
//! Mesh nodes only carry the parameters of their geometry. [`Geometry::build`]
//! tessellates them into vertex/index data for a presenter, and
//! [`Geometry::bounds`] gives the local-space box used for picking.

use std::f32::consts::PI;

use cgmath::{InnerSpace, Vector3};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Geometry {
    Box {
        width: f32,
        height: f32,
        depth: f32,
    },
    Sphere {
        radius: f32,
        width_segments: u32,
        height_segments: u32,
    },
}

/// Axis aligned bounding box in the local space of a mesh.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: cgmath::Point3<f32>,
    pub max: cgmath::Point3<f32>,
}

#[derive(Clone, Debug, Default)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

impl Geometry {
    pub fn unit_box() -> Self {
        Geometry::Box {
            width: 1.0,
            height: 1.0,
            depth: 1.0,
        }
    }

    pub fn bounds(&self) -> Aabb {
        let half = match *self {
            Geometry::Box {
                width,
                height,
                depth,
            } => Vector3::new(width, height, depth) / 2.0,
            Geometry::Sphere { radius, .. } => Vector3::new(radius, radius, radius),
        };
        Aabb {
            min: cgmath::Point3::new(-half.x, -half.y, -half.z),
            max: cgmath::Point3::new(half.x, half.y, half.z),
        }
    }

    /// Number of triangles [`build`](Self::build) produces, without tessellating.
    pub fn triangle_count(&self) -> usize {
        match *self {
            Geometry::Box { .. } => 12,
            Geometry::Sphere {
                width_segments,
                height_segments,
                ..
            } => {
                let (w, h) = (width_segments.max(3) as usize, height_segments.max(2) as usize);
                // the top and bottom rings collapse into fans
                w * (h - 1) * 2
            }
        }
    }

    pub fn build(&self) -> MeshData {
        match *self {
            Geometry::Box {
                width,
                height,
                depth,
            } => build_box(width, height, depth),
            Geometry::Sphere {
                radius,
                width_segments,
                height_segments,
            } => build_sphere(radius, width_segments.max(3), height_segments.max(2)),
        }
    }
}

fn build_sphere(radius: f32, width_segments: u32, height_segments: u32) -> MeshData {
    let mut mesh = MeshData::default();
    let mut grid = Vec::with_capacity(height_segments as usize + 1);
    let mut index = 0;

    for iy in 0..=height_segments {
        let v = iy as f32 / height_segments as f32;
        let mut row = Vec::with_capacity(width_segments as usize + 1);
        for ix in 0..=width_segments {
            let u = ix as f32 / width_segments as f32;
            let position = Vector3::new(
                -radius * (u * 2.0 * PI).cos() * (v * PI).sin(),
                radius * (v * PI).cos(),
                radius * (u * 2.0 * PI).sin() * (v * PI).sin(),
            );
            let normal = if position.magnitude2() > 0.0 {
                position.normalize()
            } else {
                Vector3::unit_y()
            };
            mesh.positions.push(position.into());
            mesh.normals.push(normal.into());
            mesh.uvs.push([u, 1.0 - v]);
            row.push(index);
            index += 1;
        }
        grid.push(row);
    }

    for iy in 0..height_segments as usize {
        for ix in 0..width_segments as usize {
            let a = grid[iy][ix + 1];
            let b = grid[iy][ix];
            let c = grid[iy + 1][ix];
            let d = grid[iy + 1][ix + 1];
            if iy != 0 {
                mesh.indices.extend_from_slice(&[a, b, d]);
            }
            if iy != height_segments as usize - 1 {
                mesh.indices.extend_from_slice(&[b, c, d]);
            }
        }
    }
    mesh
}

fn build_box(width: f32, height: f32, depth: f32) -> MeshData {
    let (hw, hh, hd) = (width / 2.0, height / 2.0, depth / 2.0);
    // (normal, up, right) per face; corners are spanned by up and right
    let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, -1.0]),
        ([-1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]),
        ([0.0, 1.0, 0.0], [0.0, 0.0, -1.0], [1.0, 0.0, 0.0]),
        ([0.0, -1.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0, 0.0]),
        ([0.0, 0.0, 1.0], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0]),
        ([0.0, 0.0, -1.0], [0.0, 1.0, 0.0], [-1.0, 0.0, 0.0]),
    ];
    let half = Vector3::new(hw, hh, hd);
    let mut mesh = MeshData::default();
    for (normal, up, right) in faces {
        let (n, u, r) = (Vector3::from(normal), Vector3::from(up), Vector3::from(right));
        let base = mesh.positions.len() as u32;
        for (su, sr, uv) in [
            (1.0, -1.0, [0.0, 0.0]),
            (1.0, 1.0, [1.0, 0.0]),
            (-1.0, -1.0, [0.0, 1.0]),
            (-1.0, 1.0, [1.0, 1.0]),
        ] {
            let corner = n + u * su + r * sr;
            let position = Vector3::new(corner.x * half.x, corner.y * half.y, corner.z * half.z);
            mesh.positions.push(position.into());
            mesh.normals.push(normal);
            mesh.uvs.push(uv);
        }
        mesh.indices
            .extend_from_slice(&[base, base + 2, base + 1, base + 2, base + 3, base + 1]);
    }
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dome_sphere_tessellation() {
        let dome = Geometry::Sphere {
            radius: 500.0,
            width_segments: 60,
            height_segments: 40,
        };
        let mesh = dome.build();
        assert_eq!(mesh.positions.len(), 61 * 41);
        assert_eq!(mesh.triangle_count(), dome.triangle_count());
        for p in &mesh.positions {
            let len = Vector3::from(*p).magnitude();
            assert!((len - 500.0).abs() < 1e-2, "vertex off the sphere: {len}");
        }
    }

    #[test]
    fn box_has_twelve_triangles_inside_its_bounds() {
        let cube = Geometry::unit_box();
        let mesh = cube.build();
        assert_eq!(mesh.positions.len(), 24);
        assert_eq!(mesh.triangle_count(), cube.triangle_count());
        let bounds = cube.bounds();
        for p in &mesh.positions {
            for axis in 0..3 {
                assert!(p[axis] >= bounds.min[axis] - 1e-6);
                assert!(p[axis] <= bounds.max[axis] + 1e-6);
            }
        }
    }
}
