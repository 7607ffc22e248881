//! The contract between the scene graph and the GPU pipeline.
//!
//! Scene nodes never talk to wgpu directly. During traversal they call into a
//! [`RenderBackend`] in a fixed order: frame globals once, then for each node
//! the model matrix, then per mesh the material followed by the draw. The
//! engine's backend is [`DrawList`], which records these calls so they can be
//! replayed onto a render pass (see [`DrawList::submit`]) or inspected.
//!
//! # Key types
//!
//! - [`RenderBackend`] is what `render` implementations issue calls against
//! - [`ShaderProgram`] selects the pipeline a mesh is drawn with
//! - [`DrawList`] / [`DrawCommand`] are the recorded frame
//! - [`GlobalsUniform`] / [`ObjectUniform`] are the uniform block layouts
//!

use cgmath::{Matrix, Matrix4, SquareMatrix, Vector3};

use crate::data_structures::{
    light::LightsUniform,
    material::{Material, MaterialUniform},
    mesh::{GpuMesh, Mesh},
    particle_system::ParticleVertex,
};

/// Shader program a mesh is drawn with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderProgram {
    Normal,
    Terrain,
    Water,
    Particles,
    Skybox,
}

/// Everything uploaded once per frame before the first object.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameGlobals {
    pub projection_view: Matrix4<f32>,
    pub camera_position: Vector3<f32>,
    pub lights: LightsUniform,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GlobalsUniform {
    pub projection_view: [[f32; 4]; 4],
    pub camera_position: [f32; 4],
}

impl From<&FrameGlobals> for GlobalsUniform {
    fn from(globals: &FrameGlobals) -> Self {
        Self {
            projection_view: globals.projection_view.into(),
            camera_position: globals.camera_position.extend(1.0).into(),
        }
    }
}

/// Per-draw uniform block: transforms, material and program parameters.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ObjectUniform {
    pub model: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 4],
    pub material: MaterialUniform,
    pub params: [f32; 4],
}

impl Default for ObjectUniform {
    fn default() -> Self {
        let identity: [[f32; 4]; 4] = Matrix4::identity().into();
        Self {
            model: identity,
            normal: identity,
            material: MaterialUniform::default(),
            params: [0.0; 4],
        }
    }
}

/// Inverse-transpose of the model matrix, used to transform normals.
/// Singular matrices fall back to identity.
pub fn normal_matrix(model: &Matrix4<f32>) -> Matrix4<f32> {
    model
        .invert()
        .map(|inverse| inverse.transpose())
        .unwrap_or_else(Matrix4::identity)
}

/// The live part of one particle system, ready to stream.
pub struct ParticleBatch<'a> {
    pub vertices: &'a [ParticleVertex],
    pub index_count: u32,
    pub buffers: Option<&'a GpuMesh>,
    pub texture: Option<&'a wgpu::BindGroup>,
}

/// Receives uploads and draw calls during scene traversal.
pub trait RenderBackend {
    /// Projection-view matrix, camera and the lights block. Called once per
    /// frame before any object is drawn.
    fn begin_frame(&mut self, globals: &FrameGlobals);

    /// Model matrix (and its derived normal matrix) for the following draws.
    fn upload_model_matrices(&mut self, model: &Matrix4<f32>);

    /// Material attributes, culling mode and textures for the following draws.
    fn upload_material(&mut self, material: &Material);

    /// Program specific parameters, e.g. water level and wave time.
    fn upload_shader_params(&mut self, params: [f32; 4]);

    fn draw_mesh(&mut self, mesh: &Mesh, program: ShaderProgram);

    fn draw_particles(&mut self, batch: &ParticleBatch<'_>);
}

#[derive(Clone, Debug)]
pub enum DrawCommand {
    ModelMatrices {
        model: Matrix4<f32>,
        normal: Matrix4<f32>,
    },
    Material {
        name: String,
        uniform: MaterialUniform,
        two_sided: bool,
        bind_group: Option<wgpu::BindGroup>,
    },
    ShaderParams([f32; 4]),
    Mesh {
        name: String,
        program: ShaderProgram,
        elements: u32,
        gpu: Option<GpuMesh>,
    },
    Particles {
        vertices: Vec<ParticleVertex>,
        index_count: u32,
        gpu: Option<GpuMesh>,
        texture: Option<wgpu::BindGroup>,
    },
}

/// A recorded frame.
#[derive(Debug, Default)]
pub struct DrawList {
    pub(crate) globals: Option<FrameGlobals>,
    pub(crate) commands: Vec<DrawCommand>,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn globals(&self) -> Option<&FrameGlobals> {
        self.globals.as_ref()
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Names of the drawn meshes in draw order.
    pub fn drawn_meshes(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                DrawCommand::Mesh { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    /// The model matrix in effect for each mesh draw, in draw order.
    pub fn mesh_transforms(&self) -> Vec<(String, Matrix4<f32>)> {
        let mut current = Matrix4::identity();
        let mut transforms = Vec::new();
        for command in &self.commands {
            match command {
                DrawCommand::ModelMatrices { model, .. } => current = *model,
                DrawCommand::Mesh { name, .. } => transforms.push((name.clone(), current)),
                _ => (),
            }
        }
        transforms
    }

    pub fn clear(&mut self) {
        self.globals = None;
        self.commands.clear();
    }
}

impl RenderBackend for DrawList {
    fn begin_frame(&mut self, globals: &FrameGlobals) {
        self.clear();
        self.globals = Some(*globals);
    }

    fn upload_model_matrices(&mut self, model: &Matrix4<f32>) {
        self.commands.push(DrawCommand::ModelMatrices {
            model: *model,
            normal: normal_matrix(model),
        });
    }

    fn upload_material(&mut self, material: &Material) {
        self.commands.push(DrawCommand::Material {
            name: material.name.clone(),
            uniform: material.attributes,
            two_sided: material.two_sided,
            bind_group: material.bind_group.clone(),
        });
    }

    fn upload_shader_params(&mut self, params: [f32; 4]) {
        self.commands.push(DrawCommand::ShaderParams(params));
    }

    fn draw_mesh(&mut self, mesh: &Mesh, program: ShaderProgram) {
        self.commands.push(DrawCommand::Mesh {
            name: mesh.name.clone(),
            program,
            elements: mesh.indices().len() as u32,
            gpu: mesh.gpu().cloned(),
        });
    }

    fn draw_particles(&mut self, batch: &ParticleBatch<'_>) {
        self.commands.push(DrawCommand::Particles {
            vertices: batch.vertices.to_vec(),
            index_count: batch.index_count,
            gpu: batch.buffers.cloned(),
            texture: batch.texture.cloned(),
        });
    }
}
