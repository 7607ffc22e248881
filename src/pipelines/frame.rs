//! Replays a recorded [`DrawList`] onto a wgpu render pass.

use std::{iter, num::NonZeroU64};

use anyhow::Context as _;
use cgmath::{Matrix4, SquareMatrix};
use wgpu::util::DeviceExt;

use crate::{
    context::Context,
    data_structures::{
        light::LightsUniform,
        material::{Material, MaterialUniform},
        mesh::GpuMesh,
        particle_system::ParticleVertex,
        texture::Texture,
    },
    pipelines::{Layouts, OBJECT_UNIFORM_STRIDE},
    render::{DrawCommand, DrawList, GlobalsUniform, ObjectUniform, ShaderProgram},
};

const INITIAL_OBJECT_CAPACITY: usize = 64;

/// Uniform buffers and bind groups reused across frames.
pub struct FrameResources {
    globals_buffer: wgpu::Buffer,
    lights_buffer: wgpu::Buffer,
    globals_bind_group: wgpu::BindGroup,
    object_buffer: wgpu::Buffer,
    object_bind_group: wgpu::BindGroup,
    object_capacity: usize,
    /// White diffuse and flat normal map for materials without textures.
    default_material: wgpu::BindGroup,
}

impl FrameResources {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, layouts: &Layouts) -> anyhow::Result<Self> {
        let globals_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Globals Buffer"),
            contents: bytemuck::bytes_of(&GlobalsUniform {
                projection_view: Matrix4::identity().into(),
                camera_position: [0.0, 0.0, 0.0, 1.0],
            }),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let lights_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Lights Buffer"),
            contents: bytemuck::bytes_of(&LightsUniform::default()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let globals_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &layouts.globals,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: globals_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: lights_buffer.as_entire_binding(),
                },
            ],
            label: Some("globals_bind_group"),
        });
        let (object_buffer, object_bind_group) = create_object_buffer(device, layouts, INITIAL_OBJECT_CAPACITY);

        let diffuse = Texture::create_default_diffuse(device, queue);
        let normal = Texture::create_default_normal_map(1, 1, device, queue);
        let mut default_material = Material::new("default");
        default_material.bind_textures(device, &layouts.material, &diffuse, &normal)?;
        let default_material = default_material
            .bind_group
            .context("default material was not bound")?;

        Ok(Self {
            globals_buffer,
            lights_buffer,
            globals_bind_group,
            object_buffer,
            object_bind_group,
            object_capacity: INITIAL_OBJECT_CAPACITY,
            default_material,
        })
    }

    pub fn object_capacity(&self) -> usize {
        self.object_capacity
    }

    /// Grow the object buffer so `count` draws fit.
    fn reserve(&mut self, device: &wgpu::Device, layouts: &Layouts, count: usize) {
        if count <= self.object_capacity {
            return;
        }
        let capacity = count.next_power_of_two();
        log::debug!("Growing object uniform buffer from {} to {capacity} draws", self.object_capacity);
        let (buffer, bind_group) = create_object_buffer(device, layouts, capacity);
        self.object_buffer = buffer;
        self.object_bind_group = bind_group;
        self.object_capacity = capacity;
    }
}

fn create_object_buffer(
    device: &wgpu::Device,
    layouts: &Layouts,
    capacity: usize,
) -> (wgpu::Buffer, wgpu::BindGroup) {
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Object Uniform Buffer"),
        size: capacity as wgpu::BufferAddress * OBJECT_UNIFORM_STRIDE,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout: &layouts.object,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer: &buffer,
                offset: 0,
                size: NonZeroU64::new(std::mem::size_of::<ObjectUniform>() as u64),
            }),
        }],
        label: Some("object_bind_group"),
    });
    (buffer, bind_group)
}

/// Draw order within a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Phase {
    Sky,
    Opaque,
    Particles,
}

struct PreparedDraw<'a> {
    phase: Phase,
    program: ShaderProgram,
    two_sided: bool,
    object: usize,
    gpu: &'a GpuMesh,
    elements: u32,
    bind_group: Option<&'a wgpu::BindGroup>,
    particle_vertices: Option<&'a [ParticleVertex]>,
}

/// Flatten the recorded commands into one object uniform per draw.
fn prepare(commands: &[DrawCommand]) -> (Vec<ObjectUniform>, Vec<PreparedDraw<'_>>) {
    let mut uniforms = Vec::new();
    let mut draws = Vec::new();

    let mut current = ObjectUniform::default();
    let mut two_sided = false;
    let mut bind_group: Option<&wgpu::BindGroup> = None;

    for command in commands {
        match command {
            DrawCommand::ModelMatrices { model, normal } => {
                current.model = (*model).into();
                current.normal = (*normal).into();
                current.params = [0.0; 4];
            }
            DrawCommand::Material {
                uniform,
                two_sided: material_two_sided,
                bind_group: material_bind_group,
                ..
            } => {
                current.material = *uniform;
                two_sided = *material_two_sided;
                bind_group = material_bind_group.as_ref();
            }
            DrawCommand::ShaderParams(params) => current.params = *params,
            DrawCommand::Mesh {
                name,
                program,
                elements,
                gpu,
            } => {
                let Some(gpu) = gpu else {
                    log::warn!("Mesh {name} was never uploaded, skipping draw.");
                    continue;
                };
                if *program == ShaderProgram::Skybox && bind_group.is_none() {
                    log::debug!("Skybox has no cube map bound, skipping draw.");
                    continue;
                }
                let phase = match program {
                    ShaderProgram::Skybox => Phase::Sky,
                    ShaderProgram::Particles => Phase::Particles,
                    _ => Phase::Opaque,
                };
                draws.push(PreparedDraw {
                    phase,
                    program: *program,
                    two_sided,
                    object: uniforms.len(),
                    gpu,
                    elements: (*elements).min(gpu.num_elements),
                    bind_group,
                    particle_vertices: None,
                });
                uniforms.push(current);
            }
            DrawCommand::Particles {
                vertices,
                index_count,
                gpu,
                texture,
            } => {
                let Some(gpu) = gpu else {
                    log::warn!("Particle system was never uploaded, skipping draw.");
                    continue;
                };
                // the vertex buffer was sized for the cap at upload time
                let capacity = (gpu.vertex_buffer.size() / std::mem::size_of::<ParticleVertex>() as u64) as usize;
                let vertices = &vertices[..vertices.len().min(capacity)];
                let elements = (*index_count).min(vertices.len() as u32 / 4 * 6).min(gpu.num_elements);
                draws.push(PreparedDraw {
                    phase: Phase::Particles,
                    program: ShaderProgram::Particles,
                    two_sided: true,
                    object: uniforms.len(),
                    gpu,
                    elements,
                    bind_group: texture.as_ref(),
                    particle_vertices: Some(vertices),
                });
                uniforms.push(ObjectUniform {
                    material: MaterialUniform::default(),
                    ..current
                });
            }
        }
    }
    draws.sort_by_key(|draw| draw.phase);
    (uniforms, draws)
}

impl DrawList {
    /// Upload this frame's uniforms and encode one forward pass into `view`:
    /// skybox, then meshes, terrain and water, then particles.
    pub fn submit(&self, ctx: &mut Context, view: &wgpu::TextureView) -> anyhow::Result<()> {
        let globals = self
            .globals
            .as_ref()
            .context("frame was recorded without begin_frame")?;
        let (uniforms, draws) = prepare(&self.commands);

        let frame = &mut ctx.frame;
        ctx.queue
            .write_buffer(&frame.globals_buffer, 0, bytemuck::bytes_of(&GlobalsUniform::from(globals)));
        ctx.queue
            .write_buffer(&frame.lights_buffer, 0, bytemuck::bytes_of(&globals.lights));

        frame.reserve(&ctx.device, &ctx.layouts, uniforms.len());
        if !uniforms.is_empty() {
            let stride = OBJECT_UNIFORM_STRIDE as usize;
            let mut bytes = vec![0u8; uniforms.len() * stride];
            for (chunk, uniform) in bytes.chunks_exact_mut(stride).zip(&uniforms) {
                chunk[..std::mem::size_of::<ObjectUniform>()].copy_from_slice(bytemuck::bytes_of(uniform));
            }
            ctx.queue.write_buffer(&frame.object_buffer, 0, &bytes);
        }
        for draw in &draws {
            if let Some(vertices) = draw.particle_vertices {
                ctx.queue
                    .write_buffer(&draw.gpu.vertex_buffer, 0, bytemuck::cast_slice(vertices));
            }
        }

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Forward Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(ctx.settings.clear_colour),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &ctx.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_bind_group(0, &frame.globals_bind_group, &[]);
            for draw in &draws {
                if draw.elements == 0 {
                    continue;
                }
                let offset = (draw.object as wgpu::BufferAddress * OBJECT_UNIFORM_STRIDE) as wgpu::DynamicOffset;
                render_pass.set_pipeline(ctx.pipelines.for_program(draw.program, draw.two_sided));
                render_pass.set_bind_group(1, &frame.object_bind_group, &[offset]);
                render_pass.set_bind_group(2, draw.bind_group.unwrap_or(&frame.default_material), &[]);
                render_pass.set_vertex_buffer(0, draw.gpu.vertex_buffer.slice(..));
                render_pass.set_index_buffer(draw.gpu.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..draw.elements, 0, 0..1);
            }
        }
        ctx.queue.submit(iter::once(encoder.finish()));
        Ok(())
    }
}
