//! Engine data structures: scene graphs, transforms, geometry and textures.
//!
//! This module contains the core data types for scene representation:
//!
//! - `instance` holds per-node transformation data
//! - `scene_graph` enables hierarchical scene organization
//! - `geometry` contains parametric meshes and their tessellation
//! - `material` describes colours and surfaces
//! - `texture` holds decoded textures and their load state

pub mod geometry;
pub mod instance;
pub mod material;
pub mod scene_graph;
pub mod texture;
