//! cubes-demo
//!
//! A small interactive 3D scene: a textured background dome, an orbiting
//! camera, a few lights and one cube that reacts to hover and click. Scene
//! nodes can be registered with an external editor that overrides their
//! transforms at runtime; overrides are persisted between sessions.
//!
//! High-level modules
//! - `camera`: camera pose, projection and mouse rays
//! - `config`: TOML configuration with defaults for every section
//! - `context`: window size, camera, controls and mouse state shared with flows
//! - `controls`: damped orbit controls with auto-rotation
//! - `data_structures`: scene graph, transforms, geometry, materials and textures
//! - `dome`: the background dome and its async texture
//! - `editable`: the editable-node registry, its editor channel and stores
//! - `flow`: the flow trait, the host loop and the winit application
//! - `interaction`: hover and click state of interactive objects
//! - `pick`: CPU ray picking against a composed frame
//! - `render`: flattening scene trees into frames and presenting them
//! - `resources`: fetching and decoding textures
//! - `scene`: the demo scene itself
//!
pub mod camera;
pub mod config;
pub mod context;
pub mod controls;
pub mod data_structures;
pub mod dome;
pub mod editable;
pub mod error;
pub mod flow;
pub mod interaction;
pub mod pick;
pub mod render;
pub mod resources;
pub mod scene;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath::*;
pub use winit::dpi::PhysicalPosition;
pub use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
