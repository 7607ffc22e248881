//! Surface materials and their GPU-side uniform layout.

use anyhow::Context as _;

use crate::data_structures::texture::Texture;

/// Material attributes as laid out in the shader's material block.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    /// Light-marker id + 1, or 0 for ordinary surfaces.
    pub extra: u32,
    pub shininess: f32,
    pub _padding: [f32; 2],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
    pub ambient: [f32; 4],
    pub emission: [f32; 4],
}

impl Default for MaterialUniform {
    fn default() -> Self {
        Self {
            extra: 0,
            shininess: 0.0,
            _padding: [0.0; 2],
            diffuse: [0.8, 0.8, 0.8, 1.0],
            specular: [0.0, 0.0, 0.0, 1.0],
            ambient: [0.2, 0.2, 0.2, 1.0],
            emission: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

/// Where a material texture comes from.
#[derive(Clone, Debug, PartialEq)]
pub enum TextureSource {
    /// Relative to the asset directory.
    Path(String),
    /// Encoded image data embedded in the model file.
    Embedded(Vec<u8>),
}

/// A surface description: colour attributes, culling mode and the textures
/// it was imported with. `bind_group` is filled in once the textures
/// are resident on the GPU.
#[derive(Clone, Debug, Default)]
pub struct Material {
    pub name: String,
    pub attributes: MaterialUniform,
    pub two_sided: bool,
    pub diffuse_texture: Option<TextureSource>,
    pub normal_texture: Option<TextureSource>,
    pub bind_group: Option<wgpu::BindGroup>,
}

impl Material {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_attributes(mut self, attributes: MaterialUniform) -> Self {
        self.attributes = attributes;
        self
    }

    /// Bind a diffuse and a normal map to this material.
    pub fn bind_textures(
        &mut self,
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        diffuse: &Texture,
        normal: &Texture,
    ) -> anyhow::Result<()> {
        let diffuse_sampler = diffuse
            .sampler
            .as_ref()
            .with_context(|| format!("diffuse texture of {} has no sampler", self.name))?;
        let normal_sampler = normal
            .sampler
            .as_ref()
            .with_context(|| format!("normal texture of {} has no sampler", self.name))?;
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&diffuse.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(diffuse_sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&normal.view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(normal_sampler),
                },
            ],
            label: Some(&self.name),
        });
        self.bind_group = Some(bind_group);
        Ok(())
    }
}
