//! Triangle meshes: CPU-side vertex data, tangent space generation and the
//! GPU buffers a mesh is drawn from.

use anyhow::{bail, ensure};
use cgmath::{InnerSpace, Vector2, Vector3, Zero};
use wgpu::util::DeviceExt;

pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    pub normal: [f32; 3],
    pub tangent: [f32; 3],
    pub bitangent: [f32; 3],
}

impl ModelVertex {
    const ATTRIBS: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x2,
        2 => Float32x3,
        3 => Float32x3,
        4 => Float32x3,
    ];

    pub fn new(position: Vector3<f32>, tex_coords: Vector2<f32>) -> Self {
        Self {
            position: position.into(),
            tex_coords: tex_coords.into(),
            ..Default::default()
        }
    }
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

/// Vertex and index buffers of an uploaded mesh. Cloning only clones the
/// buffer handles.
#[derive(Clone, Debug)]
pub struct GpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_elements: u32,
}

/// An indexed triangle list with the index of the material it is drawn with.
///
/// Geometry can be post-processed (normals, tangent space) until
/// [`upload`](Self::upload) is called; after that it is immutable.
#[derive(Clone, Debug)]
pub struct Mesh {
    pub name: String,
    pub material: usize,
    vertices: Vec<ModelVertex>,
    indices: Vec<u32>,
    gpu: Option<GpuMesh>,
}

impl Mesh {
    pub fn new(
        name: impl Into<String>,
        vertices: Vec<ModelVertex>,
        indices: Vec<u32>,
        material: usize,
    ) -> anyhow::Result<Self> {
        let name = name.into();
        ensure!(
            indices.len() % 3 == 0,
            "mesh {name} has {} indices, which is not a triangle list",
            indices.len()
        );
        if let Some(bad) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
            bail!(
                "mesh {name} references vertex {bad} but only has {} vertices",
                vertices.len()
            );
        }
        Ok(Self {
            name,
            material,
            vertices,
            indices,
            gpu: None,
        })
    }

    pub fn vertices(&self) -> &[ModelVertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn gpu(&self) -> Option<&GpuMesh> {
        self.gpu.as_ref()
    }

    pub fn is_uploaded(&self) -> bool {
        self.gpu.is_some()
    }

    /// Axis-aligned bounds of all vertex positions.
    pub fn bounds(&self) -> Option<(Vector3<f32>, Vector3<f32>)> {
        let mut positions = self.vertices.iter().map(|v| Vector3::from(v.position));
        let first = positions.next()?;
        Some(positions.fold((first, first), |(min, max), p| {
            (
                Vector3::new(min.x.min(p.x), min.y.min(p.y), min.z.min(p.z)),
                Vector3::new(max.x.max(p.x), max.y.max(p.y), max.z.max(p.z)),
            )
        }))
    }

    /// Replace all normals with the sum of the (unnormalized) face normals
    /// of the triangles sharing each vertex.
    pub fn generate_normals(&mut self) -> anyhow::Result<()> {
        self.ensure_mutable("generate normals")?;
        let mut normals = vec![Vector3::zero(); self.vertices.len()];
        for c in self.indices.chunks_exact(3) {
            let p0: Vector3<f32> = self.vertices[c[0] as usize].position.into();
            let p1: Vector3<f32> = self.vertices[c[1] as usize].position.into();
            let p2: Vector3<f32> = self.vertices[c[2] as usize].position.into();
            let face = (p1 - p0).cross(p2 - p0);
            for &i in c {
                normals[i as usize] += face;
            }
        }
        for (vertex, normal) in self.vertices.iter_mut().zip(normals) {
            vertex.normal = normal.into();
        }
        Ok(())
    }

    /// Accumulate per-vertex tangents and bitangents from the UV-space
    /// edge deltas of every triangle.
    pub fn generate_tangents_and_bitangents(&mut self) -> anyhow::Result<()> {
        self.ensure_mutable("generate tangents")?;
        let mut tangents = vec![Vector3::zero(); self.vertices.len()];
        let mut bitangents = vec![Vector3::zero(); self.vertices.len()];
        for c in self.indices.chunks_exact(3) {
            let v0 = self.vertices[c[0] as usize];
            let v1 = self.vertices[c[1] as usize];
            let v2 = self.vertices[c[2] as usize];

            let pos0: Vector3<f32> = v0.position.into();
            let delta_pos1 = Vector3::from(v1.position) - pos0;
            let delta_pos2 = Vector3::from(v2.position) - pos0;

            let uv0: Vector2<f32> = v0.tex_coords.into();
            let delta_uv1 = Vector2::from(v1.tex_coords) - uv0;
            let delta_uv2 = Vector2::from(v2.tex_coords) - uv0;

            let det = delta_uv1.x * delta_uv2.y - delta_uv1.y * delta_uv2.x;
            if det.abs() <= f32::EPSILON {
                // degenerate UV mapping, nothing to derive a direction from
                continue;
            }
            let r = 1.0 / det;
            let tangent = (delta_pos1 * delta_uv2.y - delta_pos2 * delta_uv1.y) * r;
            let bitangent = (delta_pos2 * delta_uv1.x - delta_pos1 * delta_uv2.x) * r;
            for &i in c {
                tangents[i as usize] += tangent;
                bitangents[i as usize] += bitangent;
            }
        }
        for ((vertex, tangent), bitangent) in
            self.vertices.iter_mut().zip(tangents).zip(bitangents)
        {
            vertex.tangent = tangent.into();
            vertex.bitangent = bitangent.into();
        }
        Ok(())
    }

    /// Normalize the normal, Gram-Schmidt the tangent against it and rebuild
    /// the bitangent as `normal x tangent`. Where the accumulated frame was
    /// left-handed the rebuilt bitangent is negated, so tangent and bitangent
    /// keep following +u and +v.
    pub fn orthonormalize_tangent_space(&mut self) -> anyhow::Result<()> {
        self.ensure_mutable("orthonormalize tangent space")?;
        for vertex in self.vertices.iter_mut() {
            let normal = normalize_or_zero(vertex.normal.into());
            let tangent: Vector3<f32> = vertex.tangent.into();
            let tangent = normalize_or_zero(tangent - normal * normal.dot(tangent));
            let mut bitangent = normal.cross(tangent);
            // handedness, same as the w component of a glTF tangent
            if bitangent.dot(vertex.bitangent.into()) < 0.0 {
                bitangent = -bitangent;
            }
            vertex.normal = normal.into();
            vertex.tangent = tangent.into();
            vertex.bitangent = bitangent.into();
        }
        Ok(())
    }

    /// Create the GPU buffers. Further geometry edits are rejected.
    pub fn upload(&mut self, device: &wgpu::Device) {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Vertex Buffer", self.name)),
            contents: bytemuck::cast_slice(&self.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Index Buffer", self.name)),
            contents: bytemuck::cast_slice(&self.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        self.gpu = Some(GpuMesh {
            vertex_buffer,
            index_buffer,
            num_elements: self.indices.len() as u32,
        });
    }

    fn ensure_mutable(&self, operation: &str) -> anyhow::Result<()> {
        ensure!(
            self.gpu.is_none(),
            "cannot {operation} on mesh {}: it is already uploaded",
            self.name
        );
        Ok(())
    }
}

fn normalize_or_zero(v: Vector3<f32>) -> Vector3<f32> {
    if v.magnitude2() > f32::EPSILON * f32::EPSILON {
        v.normalize()
    } else {
        v
    }
}
