use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::data_structures::{material::TextureSource, texture};

/// Names of the cube map faces in wgpu layer order (+x, -x, +y, -y, +z, -z).
pub const CUBE_FACE_NAMES: [&str; 6] = ["right", "left", "top", "bottom", "front", "back"];

pub fn diffuse_normal_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    let texture = |binding| wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            multisampled: false,
            view_dimension: wgpu::TextureViewDimension::D2,
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
        },
        count: None,
    };
    let sampler = |binding| wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    };
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[texture(0), sampler(1), texture(2), sampler(3)],
        label: Some("Model texture_bind_group_layout"),
    })
}

pub fn cube_texture_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::Cube,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
        label: Some("skybox_bind_group_layout"),
    })
}

/// Assets are looked up below `./assets`.
pub fn asset_path(file_name: &str) -> PathBuf {
    Path::new("./").join("assets").join(file_name)
}

/// `file_name` relative to the directory of the asset that referenced it.
pub fn sibling_path(referrer: &str, file_name: &str) -> String {
    match Path::new(referrer).parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.join(file_name).to_string_lossy().into_owned(),
        _ => file_name.to_string(),
    }
}

pub async fn load_string(file_name: &str) -> anyhow::Result<String> {
    let path = asset_path(file_name);
    tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("reading {}", path.display()))
}

pub async fn load_binary(file_name: &str) -> anyhow::Result<Vec<u8>> {
    let path = asset_path(file_name);
    tokio::fs::read(&path)
        .await
        .with_context(|| format!("reading {}", path.display()))
}

pub async fn load_texture(
    source: &TextureSource,
    is_normal_map: bool,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> anyhow::Result<texture::Texture> {
    match source {
        TextureSource::Path(file_name) => {
            let data = load_binary(file_name).await?;
            let extension = Path::new(file_name).extension().and_then(|e| e.to_str());
            texture::Texture::from_bytes(device, queue, &data, file_name, extension, is_normal_map)
                .with_context(|| format!("decoding texture {file_name}"))
        }
        TextureSource::Embedded(data) => {
            texture::Texture::from_bytes(device, queue, data, "embedded texture", None, is_normal_map)
        }
    }
}

/// Load `<folder>/{right,left,top,bottom,front,back}.png` into a cube map.
pub async fn load_cube_texture(
    folder: &str,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> anyhow::Result<texture::Texture> {
    let faces = futures::future::try_join_all(CUBE_FACE_NAMES.iter().map(|face| async move {
        let file_name = format!("{folder}/{face}.png");
        let data = load_binary(&file_name).await?;
        image::load_from_memory(&data).with_context(|| format!("decoding cube face {file_name}"))
    }))
    .await?;
    let faces: [image::DynamicImage; 6] = faces
        .try_into()
        .map_err(|_| anyhow::anyhow!("cube map {folder} needs exactly six faces"))?;
    texture::Texture::from_cube_faces(device, queue, &faces, folder)
}
