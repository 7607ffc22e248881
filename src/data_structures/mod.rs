//! Engine data structures: the scene graph and everything that hangs in it.
//!
//! - `transform` is the position/orientation value every node embeds
//! - `scene_graph` holds the node trait, owning groups and move groups
//! - `camera`, `light` are the non-geometric scene members
//! - `mesh`, `material`, `texture` are the drawable building blocks
//! - `pose`, `animation`, `model` make up imported, animated objects
//! - `terrain`, `particle_system`, `skybox` generate their own geometry
//! - `day_cycle` drives the ambient light

pub mod animation;
pub mod camera;
pub mod day_cycle;
pub mod light;
pub mod material;
pub mod mesh;
pub mod model;
pub mod particle_system;
pub mod pose;
pub mod scene_graph;
pub mod skybox;
pub mod terrain;
pub mod texture;
pub mod transform;
