//! Engine-wide settings.

use cgmath::Deg;

use crate::data_structures::{
    light::{DEFAULT_HALF_LIGHT_DISTANCE, MAX_NUM_LIGHTS},
    particle_system::MAX_NUM_PARTICLES,
};

/// Settings handed to [`crate::flow::run`] and kept on the
/// [`Context`](crate::context::Context).
#[derive(Clone, Debug, PartialEq)]
pub struct EngineSettings {
    /// Frames per second the loop is capped at. 0 disables the cap.
    pub reference_fps: u32,
    pub window_title: String,
    pub window_size: (u32, u32),
    pub fovy: Deg<f32>,
    pub znear: f32,
    pub zfar: f32,
    /// Distance at which point light intensity has dropped to a half.
    pub half_light_distance: f32,
    /// Lights beyond this count are ignored, at most [`MAX_NUM_LIGHTS`].
    pub max_lights: usize,
    pub max_particles: usize,
    pub clear_colour: wgpu::Color,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            reference_fps: 30,
            window_title: "vale-ngin".to_string(),
            window_size: (1280, 720),
            fovy: Deg(60.0),
            znear: 0.1,
            zfar: 1000.0,
            half_light_distance: DEFAULT_HALF_LIGHT_DISTANCE,
            max_lights: MAX_NUM_LIGHTS,
            max_particles: MAX_NUM_PARTICLES,
            clear_colour: wgpu::Color::BLACK,
        }
    }
}
