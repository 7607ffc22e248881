//! Height-field terrain with a static water surface.
//!
//! The terrain mesh has one vertex per height sample and two triangles per
//! grid cell. Water is a second mesh holding one independent quad for every
//! cell that dips below the water level. Both meshes are built once; only
//! the wave time advances per frame, as a shader parameter.

use anyhow::{Context as _, ensure};
use cgmath::{Matrix4, SquareMatrix, Vector2, Vector3, Vector4};
use image::{DynamicImage, GenericImageView};

use crate::{
    data_structures::{
        material::{Material, TextureSource},
        mesh::{Mesh, ModelVertex},
        scene_graph::{GroupNode, SceneNode},
        transform::{Spatial, Transform},
    },
    render::{RenderBackend, ShaderProgram},
    resources,
};

/// Grid of normalized elevations in `[0, 1]`.
#[derive(Clone, Debug, PartialEq)]
pub struct HeightField {
    width: usize,
    height: usize,
    elevations: Vec<f32>,
}

impl HeightField {
    pub fn from_elevations(width: usize, height: usize, elevations: Vec<f32>) -> anyhow::Result<Self> {
        ensure!(width > 0 && height > 0, "height field must not be empty");
        ensure!(
            elevations.len() == width * height,
            "height field of {width}x{height} needs {} samples, got {}",
            width * height,
            elevations.len()
        );
        Ok(Self {
            width,
            height,
            elevations,
        })
    }

    /// Elevation of a pixel is the mean of its RGBA channels. Pixel (x, y)
    /// becomes sample (x, y).
    pub fn from_image(image: &DynamicImage) -> anyhow::Result<Self> {
        let (width, height) = image.dimensions();
        let rgba = image.to_rgba8();
        let elevations = rgba
            .pixels()
            .map(|p| p.0.iter().map(|&c| c as f32 / 255.0).sum::<f32>() / 4.0)
            .collect();
        Self::from_elevations(width as usize, height as usize, elevations)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Sample at a grid position, clamped to the grid.
    pub fn get(&self, x: usize, y: usize) -> f32 {
        let x = x.min(self.width - 1);
        let y = y.min(self.height - 1);
        self.elevations[y * self.width + x]
    }

    /// Bilinear sample at fractional grid coordinates, clamped to the grid.
    pub fn sample(&self, x: f32, y: f32) -> f32 {
        let x = x.clamp(0.0, (self.width - 1) as f32);
        let y = y.clamp(0.0, (self.height - 1) as f32);
        let (x0, y0) = (x.floor() as usize, y.floor() as usize);
        let (fx, fy) = (x - x0 as f32, y - y0 as f32);
        let top = self.get(x0, y0) * (1.0 - fx) + self.get(x0 + 1, y0) * fx;
        let bottom = self.get(x0, y0 + 1) * (1.0 - fx) + self.get(x0 + 1, y0 + 1) * fx;
        top * (1.0 - fy) + bottom * fy
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TerrainSettings {
    /// World units per grid cell.
    pub horizontal_scale: f32,
    /// World height of elevation 1.
    pub vertical_scale: f32,
    /// World units one texture repeat covers.
    pub texture_scale: f32,
    /// In terrain space, compared against scaled heights.
    pub water_level: f32,
    /// The terrain is placed this far below the origin.
    pub start_height: f32,
    pub texture: Option<String>,
    pub normal_map: Option<String>,
    pub water_texture: Option<String>,
}

impl Default for TerrainSettings {
    fn default() -> Self {
        Self {
            horizontal_scale: 1.0,
            vertical_scale: 100.0,
            texture_scale: 2.0,
            water_level: 40.0,
            start_height: 30.0,
            texture: None,
            normal_map: None,
            water_texture: None,
        }
    }
}

pub struct Terrain {
    group: GroupNode,
    heights: HeightField,
    settings: TerrainSettings,
    mesh: Mesh,
    water: Mesh,
    material: Material,
    water_material: Material,
    time: f32,
}

impl Terrain {
    pub fn new(heights: HeightField, settings: TerrainSettings) -> anyhow::Result<Self> {
        let mesh = build_surface(&heights, &settings)?;
        let water = build_water(&heights, &settings)?;
        log::debug!(
            "Terrain {}x{}: {} triangles, {} water quads",
            heights.width(),
            heights.height(),
            mesh.triangle_count(),
            water.vertices().len() / 4
        );

        let mut material = Material::new("terrain");
        material.diffuse_texture = settings.texture.clone().map(TextureSource::Path);
        material.normal_texture = settings.normal_map.clone().map(TextureSource::Path);
        let mut water_material = Material::new("water");
        water_material.two_sided = true;
        water_material.diffuse_texture = settings.water_texture.clone().map(TextureSource::Path);

        Ok(Self {
            group: GroupNode::at(Vector3::new(0.0, -settings.start_height, 0.0)),
            heights,
            settings,
            mesh,
            water,
            material,
            water_material,
            time: 0.0,
        })
    }

    /// Load `<folder>/heightmap.png`. A missing height map is fatal.
    pub async fn load(folder: &str, settings: TerrainSettings) -> anyhow::Result<Self> {
        let heights = resources::load_heightmap(&format!("{folder}/heightmap.png"))
            .await
            .with_context(|| format!("loading terrain {folder}"))?;
        Self::new(heights, settings)
    }

    pub async fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
    ) -> anyhow::Result<()> {
        self.mesh.upload(device);
        self.water.upload(device);
        resources::bind_material(&mut self.material, device, queue, layout).await?;
        resources::bind_material(&mut self.water_material, device, queue, layout).await?;
        Ok(())
    }

    pub fn settings(&self) -> &TerrainSettings {
        &self.settings
    }

    pub fn heights(&self) -> &HeightField {
        &self.heights
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn water(&self) -> &Mesh {
        &self.water
    }

    pub fn water_quads(&self) -> usize {
        self.water.vertices().len() / 4
    }

    pub fn material_mut(&mut self) -> &mut Material {
        &mut self.material
    }

    pub fn water_material_mut(&mut self) -> &mut Material {
        &mut self.water_material
    }

    pub fn group(&self) -> &GroupNode {
        &self.group
    }

    pub fn group_mut(&mut self) -> &mut GroupNode {
        &mut self.group
    }

    pub fn wave_time(&self) -> f32 {
        self.time
    }

    /// Terrain-space height at a grid sample.
    pub fn height_at(&self, x: usize, y: usize) -> f32 {
        self.heights.get(x, y) * self.settings.vertical_scale
    }

    /// Terrain-space height at fractional grid coordinates.
    pub fn height_at_f(&self, x: f32, y: f32) -> f32 {
        self.heights.sample(x, y) * self.settings.vertical_scale
    }

    /// World height of the ground below `(world_x, world_z)`.
    pub fn ground_height(&self, world_x: f32, world_z: f32) -> f32 {
        let matrix = self.group.local_matrix();
        let Some(inverse) = matrix.invert() else {
            return self.transform().position().y;
        };
        let local = inverse * Vector4::new(world_x, 0.0, world_z, 1.0);
        let h = self.settings.horizontal_scale;
        let height = self.height_at_f(local.x / h, local.z / h);
        (matrix * Vector4::new(local.x, height, local.z, 1.0)).y
    }
}

fn grid_vertex(heights: &HeightField, settings: &TerrainSettings, x: usize, y: usize) -> ModelVertex {
    let position = Vector3::new(
        x as f32 * settings.horizontal_scale,
        heights.get(x, y) * settings.vertical_scale,
        y as f32 * settings.horizontal_scale,
    );
    let uv = Vector2::new(position.x, position.z) / settings.texture_scale;
    ModelVertex::new(position, uv)
}

fn build_surface(heights: &HeightField, settings: &TerrainSettings) -> anyhow::Result<Mesh> {
    let (w, h) = (heights.width(), heights.height());
    let vertices = (0..h)
        .flat_map(|y| (0..w).map(move |x| (x, y)))
        .map(|(x, y)| grid_vertex(heights, settings, x, y))
        .collect();

    let idx = |x: usize, y: usize| (y * w + x) as u32;
    let mut indices = Vec::with_capacity(w.saturating_sub(1) * h.saturating_sub(1) * 6);
    for y in 0..h.saturating_sub(1) {
        for x in 0..w.saturating_sub(1) {
            indices.extend_from_slice(&[idx(x, y), idx(x, y + 1), idx(x + 1, y)]);
            indices.extend_from_slice(&[idx(x, y + 1), idx(x + 1, y + 1), idx(x + 1, y)]);
        }
    }

    let mut mesh = Mesh::new("terrain", vertices, indices, 0)?;
    mesh.generate_normals()?;
    mesh.generate_tangents_and_bitangents()?;
    mesh.orthonormalize_tangent_space()?;
    Ok(mesh)
}

fn build_water(heights: &HeightField, settings: &TerrainSettings) -> anyhow::Result<Mesh> {
    let (w, h) = (heights.width(), heights.height());
    let mut vertices = Vec::new();
    let mut indices = Vec::new();
    for y in 0..h.saturating_sub(1) {
        for x in 0..w.saturating_sub(1) {
            let corners = [(x, y), (x, y + 1), (x + 1, y), (x + 1, y + 1)];
            let submerged = corners
                .iter()
                .any(|&(cx, cy)| heights.get(cx, cy) * settings.vertical_scale < settings.water_level);
            if !submerged {
                continue;
            }
            let base = vertices.len() as u32;
            for (cx, cy) in corners {
                let mut vertex = grid_vertex(heights, settings, cx, cy);
                vertex.normal = [0.0, 1.0, 0.0];
                vertex.tangent = [1.0, 0.0, 0.0];
                vertex.bitangent = [0.0, 0.0, 1.0];
                vertices.push(vertex);
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base + 1, base + 3, base + 2]);
        }
    }
    Mesh::new("water", vertices, indices, 0)
}

impl Spatial for Terrain {
    fn transform(&self) -> &Transform {
        self.group.transform()
    }

    fn transform_mut(&mut self) -> &mut Transform {
        self.group.transform_mut()
    }
}

impl SceneNode for Terrain {
    fn matrix(&self) -> Matrix4<f32> {
        self.group.local_matrix()
    }

    fn update(&mut self, dt: f32) {
        self.time += dt;
        self.group.update_children(dt);
    }

    fn render(&self, dt: f32, parent: &Matrix4<f32>, backend: &mut dyn RenderBackend) {
        let world = parent * self.group.local_matrix();
        backend.upload_model_matrices(&world);
        backend.upload_material(&self.material);
        backend.draw_mesh(&self.mesh, ShaderProgram::Terrain);
        if !self.water.indices().is_empty() {
            backend.upload_shader_params([self.settings.water_level, self.time, 0.0, 0.0]);
            backend.upload_material(&self.water_material);
            backend.draw_mesh(&self.water, ShaderProgram::Water);
        }
        self.group.render_children(dt, &world, backend);
    }
}
