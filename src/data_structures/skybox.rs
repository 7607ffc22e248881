//! A cube-mapped sky that follows the camera.

use cgmath::{Matrix4, Vector2, Vector3};

use crate::{
    data_structures::{
        material::Material,
        mesh::{Mesh, ModelVertex},
        texture::Texture,
    },
    render::{RenderBackend, ShaderProgram},
    resources,
};

/// Fraction of the far plane the cube is scaled to; keeps the corners inside
/// the view frustum.
const FAR_PLANE_FRACTION: f32 = 0.5;

#[rustfmt::skip]
const CUBE_CORNERS: [[f32; 3]; 8] = [
    [-0.5, -0.5, -0.5], [0.5, -0.5, -0.5], [-0.5, 0.5, -0.5], [0.5, 0.5, -0.5],
    [-0.5, -0.5,  0.5], [0.5, -0.5,  0.5], [-0.5, 0.5,  0.5], [0.5, 0.5,  0.5],
];

/// Two triangles per face, wound to face inwards.
#[rustfmt::skip]
const CUBE_TRIANGLES: [usize; 36] = [
    0, 1, 2, 1, 3, 2, // back
    4, 6, 5, 5, 6, 7, // front
    0, 2, 4, 4, 2, 6, // left
    1, 5, 3, 5, 7, 3, // right
    2, 3, 6, 3, 7, 6, // top
    0, 4, 1, 1, 4, 5, // bottom
];

pub struct Skybox {
    mesh: Mesh,
    material: Material,
}

impl Skybox {
    /// An untextured skybox; bind a cube map with [`Skybox::bind_cube_map`].
    pub fn new() -> anyhow::Result<Self> {
        let vertices = CUBE_TRIANGLES
            .iter()
            .map(|&corner| ModelVertex::new(Vector3::from(CUBE_CORNERS[corner]), Vector2::new(0.0, 0.0)))
            .collect();
        let indices = (0..CUBE_TRIANGLES.len() as u32).collect();
        let mut material = Material::new("skybox");
        material.two_sided = true;
        Ok(Self {
            mesh: Mesh::new("skybox", vertices, indices, 0)?,
            material,
        })
    }

    /// Load the six faces from `folder` and upload everything.
    pub async fn load(
        folder: &str,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
    ) -> anyhow::Result<Self> {
        let mut skybox = Self::new()?;
        let cube_map = resources::load_cube_texture(folder, device, queue).await?;
        skybox.mesh.upload(device);
        skybox.bind_cube_map(device, layout, &cube_map)?;
        Ok(skybox)
    }

    pub fn bind_cube_map(
        &mut self,
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        cube_map: &Texture,
    ) -> anyhow::Result<()> {
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&cube_map.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(cube_map.sampler()?),
                },
            ],
            label: Some("skybox_bind_group"),
        });
        self.material.bind_group = Some(bind_group);
        Ok(())
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    /// Model matrix for this frame: centered on the camera, scaled to the far
    /// plane.
    pub fn matrix(camera_position: Vector3<f32>, zfar: f32) -> Matrix4<f32> {
        Matrix4::from_translation(camera_position) * Matrix4::from_scale(zfar * FAR_PLANE_FRACTION)
    }

    pub fn render(&self, camera_position: Vector3<f32>, zfar: f32, backend: &mut dyn RenderBackend) {
        backend.upload_model_matrices(&Self::matrix(camera_position, zfar));
        backend.upload_material(&self.material);
        backend.draw_mesh(&self.mesh, ShaderProgram::Skybox);
    }
}
