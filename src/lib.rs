//! vale-ngin
//!
//! A small forward-rendering engine built around a scene graph. Games build a
//! [`scene::Scene`] of transform groups, imported models, height-field
//! terrain with water, particle systems and lights, then drive it through a
//! fixed per-frame sequence of logic, world update and render traversal.
//!
//! High-level modules
//! - `config`: engine-wide settings
//! - `context`: GPU device, surface, layouts, pipelines and uniform buffers
//! - `data_structures`: transforms, scene graph nodes and their GPU data
//! - `flow`: the [`flow::Game`] trait, frame limiter and event loop
//! - `pipelines`: render pipelines, WGSL programs and frame submission
//! - `render`: the contract between scene traversal and the GPU
//! - `resources`: asynchronous loading of models, textures and height maps
//! - `scene`: the world: camera, lights, top-level nodes, skybox, day cycle
//!

pub mod config;
pub mod context;
pub mod data_structures;
pub mod flow;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod scene;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath;
pub use wgpu;
pub use winit::event::WindowEvent;
pub use winit::keyboard::{KeyCode, PhysicalKey};
