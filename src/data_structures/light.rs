//! Light sources and the lights block uploaded once per frame.

use cgmath::Vector3;

use crate::data_structures::{
    model::RenderObject,
    transform::{Spatial, Transform},
};

/// Lights beyond this count are dropped from the per-frame upload.
pub const MAX_NUM_LIGHTS: usize = 4;
pub const DEFAULT_HALF_LIGHT_DISTANCE: f32 = 10.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LightType {
    /// Position is a direction, no attenuation.
    Directional,
    Point,
}

/// One light as the shader sees it.
///
/// `position.w` is 0 for directional and 1 for point lights, which toggles
/// attenuation. `intensity.w` carries the light's attenuation factor.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ShaderLight {
    pub intensity: [f32; 4],
    pub position: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightsUniform {
    pub num_lights: u32,
    pub attenuation: f32,
    pub _padding: [f32; 2],
    pub ambient_intensity: [f32; 4],
    pub lights: [ShaderLight; MAX_NUM_LIGHTS],
}

impl Default for LightsUniform {
    fn default() -> Self {
        Self::new(&[], Vector3::new(0.0, 0.0, 0.0), attenuation_for(DEFAULT_HALF_LIGHT_DISTANCE))
    }
}

impl LightsUniform {
    /// Pack up to [`MAX_NUM_LIGHTS`] lights. Extra lights are dropped with a
    /// warning.
    pub fn new(lights: &[ShaderLight], ambient: Vector3<f32>, attenuation: f32) -> Self {
        if lights.len() > MAX_NUM_LIGHTS {
            log::warn!(
                "{} lights registered but only {} are supported, ignoring the rest.",
                lights.len(),
                MAX_NUM_LIGHTS
            );
        }
        let count = lights.len().min(MAX_NUM_LIGHTS);
        let mut packed = [ShaderLight::default(); MAX_NUM_LIGHTS];
        packed[..count].copy_from_slice(&lights[..count]);
        Self {
            num_lights: count as u32,
            attenuation,
            _padding: [0.0; 2],
            ambient_intensity: ambient.extend(1.0).into(),
            lights: packed,
        }
    }

    pub fn active(&self) -> &[ShaderLight] {
        &self.lights[..self.num_lights as usize]
    }
}

/// Attenuation factor at which light intensity halves after `half_distance`.
pub fn attenuation_for(half_distance: f32) -> f32 {
    1.0 / (half_distance * half_distance)
}

#[derive(Clone, Debug)]
pub struct Light {
    transform: Transform,
    pub intensity: Vector3<f32>,
    pub light_type: LightType,
    half_light_distance: f32,
}

impl Light {
    pub fn new(intensity: Vector3<f32>, light_type: LightType) -> Self {
        Self {
            transform: Transform::new(),
            intensity,
            light_type,
            half_light_distance: DEFAULT_HALF_LIGHT_DISTANCE,
        }
    }

    pub fn point(intensity: Vector3<f32>) -> Self {
        Self::new(intensity, LightType::Point)
    }

    pub fn directional(intensity: Vector3<f32>, direction: Vector3<f32>) -> Self {
        let mut light = Self::new(intensity, LightType::Directional);
        light.transform.set_position(direction);
        light
    }

    pub fn half_light_distance(&self) -> f32 {
        self.half_light_distance
    }

    pub fn set_half_light_distance(&mut self, distance: f32) {
        self.half_light_distance = distance;
    }

    pub fn attenuation(&self) -> f32 {
        attenuation_for(self.half_light_distance)
    }

    pub fn shader_light(&self) -> ShaderLight {
        let position = self.transform.position();
        let w = match self.light_type {
            LightType::Directional => 0.0,
            LightType::Point => 1.0,
        };
        ShaderLight {
            intensity: self.intensity.extend(self.attenuation()).into(),
            position: position.extend(w).into(),
        }
    }

    /// Mark every material of `object` as the visual marker of light `id`,
    /// optionally painting it in the light's colour.
    pub fn tag_render_object(&self, object: &mut RenderObject, id: u32, set_colors: bool) {
        let colour: [f32; 4] = self.intensity.extend(1.0).into();
        for material in object.materials_mut() {
            if set_colors {
                material.attributes.diffuse = colour;
                material.attributes.ambient = colour;
                material.attributes.specular = colour;
                material.attributes.emission = colour;
            }
            material.attributes.extra = id + 1;
        }
    }
}

impl Spatial for Light {
    fn transform(&self) -> &Transform {
        &self.transform
    }

    fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }
}
