//! Bind group layouts, render pipelines and the GPU replay of a recorded
//! frame.
//!
//! Every pipeline shares the same three bind groups:
//! - group 0: frame globals (projection-view, camera) and the lights block
//! - group 1: the per-draw [`ObjectUniform`], addressed by dynamic offset
//! - group 2: the material textures (a cube map for the skybox)

use std::num::NonZeroU64;

use crate::{
    data_structures::{
        light::LightsUniform,
        mesh::{ModelVertex, Vertex},
        particle_system::ParticleVertex,
        texture::Texture,
    },
    render::{GlobalsUniform, ObjectUniform, ShaderProgram},
    resources::texture::{cube_texture_layout, diffuse_normal_layout},
};

pub mod basic;
pub mod frame;

pub use basic::mk_render_pipeline;

/// Stride between two object uniforms in the dynamic uniform buffer.
pub const OBJECT_UNIFORM_STRIDE: wgpu::BufferAddress = 256;

fn uniform_entry(binding: u32, dynamic: bool, size: usize) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: dynamic,
            min_binding_size: NonZeroU64::new(size as u64),
        },
        count: None,
    }
}

pub struct Layouts {
    pub globals: wgpu::BindGroupLayout,
    pub object: wgpu::BindGroupLayout,
    pub material: wgpu::BindGroupLayout,
    pub cube: wgpu::BindGroupLayout,
}

impl Layouts {
    pub fn new(device: &wgpu::Device) -> Self {
        let globals = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[
                uniform_entry(0, false, std::mem::size_of::<GlobalsUniform>()),
                uniform_entry(1, false, std::mem::size_of::<LightsUniform>()),
            ],
            label: Some("globals_bind_group_layout"),
        });
        let object = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[uniform_entry(0, true, std::mem::size_of::<ObjectUniform>())],
            label: Some("object_bind_group_layout"),
        });
        Self {
            globals,
            object,
            material: diffuse_normal_layout(device),
            cube: cube_texture_layout(device),
        }
    }
}

/// One pipeline per [`ShaderProgram`], plus an unculled variant of the
/// normal program for two-sided materials.
pub struct Pipelines {
    pub normal: wgpu::RenderPipeline,
    pub normal_two_sided: wgpu::RenderPipeline,
    pub terrain: wgpu::RenderPipeline,
    pub water: wgpu::RenderPipeline,
    pub particles: wgpu::RenderPipeline,
    pub skybox: wgpu::RenderPipeline,
}

impl Pipelines {
    pub fn new(device: &wgpu::Device, color_format: wgpu::TextureFormat, layouts: &Layouts) -> Self {
        let layout = |label: &str, material: &wgpu::BindGroupLayout| {
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(label),
                bind_group_layouts: &[&layouts.globals, &layouts.object, material],
                push_constant_ranges: &[],
            })
        };
        let textured = layout("Textured Pipeline Layout", &layouts.material);
        let sky = layout("Skybox Pipeline Layout", &layouts.cube);

        let shader = |label: &'static str, source: &'static str| wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        };
        let normal_source = concat!(include_str!("common.wgsl"), include_str!("normal.wgsl"));
        let opaque = Some(wgpu::BlendState::REPLACE);
        let alpha = Some(wgpu::BlendState::ALPHA_BLENDING);
        let depth = Some(Texture::DEPTH_FORMAT);

        Self {
            normal: mk_render_pipeline(
                device,
                &textured,
                color_format,
                opaque,
                depth,
                &[ModelVertex::desc()],
                shader("Normal Shader", normal_source),
                Some(wgpu::Face::Back),
                true,
            ),
            normal_two_sided: mk_render_pipeline(
                device,
                &textured,
                color_format,
                opaque,
                depth,
                &[ModelVertex::desc()],
                shader("Normal Two Sided Shader", normal_source),
                None,
                true,
            ),
            terrain: mk_render_pipeline(
                device,
                &textured,
                color_format,
                opaque,
                depth,
                &[ModelVertex::desc()],
                shader(
                    "Terrain Shader",
                    concat!(include_str!("common.wgsl"), include_str!("terrain.wgsl")),
                ),
                Some(wgpu::Face::Back),
                true,
            ),
            water: mk_render_pipeline(
                device,
                &textured,
                color_format,
                alpha,
                depth,
                &[ModelVertex::desc()],
                shader(
                    "Water Shader",
                    concat!(include_str!("common.wgsl"), include_str!("water.wgsl")),
                ),
                None,
                true,
            ),
            // depth test stays on so particles hide behind terrain
            particles: mk_render_pipeline(
                device,
                &textured,
                color_format,
                alpha,
                depth,
                &[ParticleVertex::desc()],
                shader(
                    "Particle Shader",
                    concat!(include_str!("common.wgsl"), include_str!("particles.wgsl")),
                ),
                None,
                false,
            ),
            skybox: mk_render_pipeline(
                device,
                &sky,
                color_format,
                opaque,
                depth,
                &[ModelVertex::desc()],
                shader(
                    "Skybox Shader",
                    concat!(include_str!("common.wgsl"), include_str!("skybox.wgsl")),
                ),
                None,
                false,
            ),
        }
    }

    pub fn for_program(&self, program: ShaderProgram, two_sided: bool) -> &wgpu::RenderPipeline {
        match program {
            ShaderProgram::Normal if two_sided => &self.normal_two_sided,
            ShaderProgram::Normal => &self.normal,
            ShaderProgram::Terrain => &self.terrain,
            ShaderProgram::Water => &self.water,
            ShaderProgram::Particles => &self.particles,
            ShaderProgram::Skybox => &self.skybox,
        }
    }
}
