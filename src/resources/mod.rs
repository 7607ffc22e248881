//! Asset loading: models, textures, cube maps and height maps.
//!
//! All paths are relative to `./assets`. Loaders are `async` and only read
//! and decode data; GPU uploads happen in the `upload` methods of the scene
//! types, which call back into [`bind_material`] and [`load_texture`].

use std::path::Path;

use anyhow::{Context as _, bail};

use crate::data_structures::{
    material::Material,
    model::ImportedModel,
    terrain::HeightField,
    texture::Texture,
};

pub mod gltf_model;
pub mod obj;
pub mod texture;

pub use texture::{load_binary, load_cube_texture, load_string, load_texture};

/// Import an OBJ or glTF model, picked by file extension.
pub async fn load_model(file_name: &str) -> anyhow::Result<ImportedModel> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("obj") => obj::load_obj(file_name).await,
        Some("gltf") | Some("glb") => gltf_model::load_gltf(file_name).await,
        _ => bail!("{file_name}: unsupported model format"),
    }
}

/// Load a height map image into a height field.
pub async fn load_heightmap(file_name: &str) -> anyhow::Result<HeightField> {
    let data = load_binary(file_name).await?;
    let image = image::load_from_memory(&data).with_context(|| format!("decoding height map {file_name}"))?;
    HeightField::from_image(&image)
}

/// Load the textures of `material` and create its bind group. Missing
/// textures fall back to a white diffuse map and a flat normal map.
pub async fn bind_material(
    material: &mut Material,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
) -> anyhow::Result<()> {
    let diffuse = match &material.diffuse_texture {
        Some(source) => load_texture(source, false, device, queue).await?,
        None => Texture::create_default_diffuse(device, queue),
    };
    let normal = match &material.normal_texture {
        Some(source) => load_texture(source, true, device, queue).await?,
        None => Texture::create_default_normal_map(1, 1, device, queue),
    };
    material.bind_textures(device, layout, &diffuse, &normal)
}
