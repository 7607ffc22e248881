//! glTF 2.0 import: node hierarchy, triangle primitives, PBR base colours
//! and node animations.
//!
//! glTF keyframe times are seconds, so imported animations run at one tick
//! per second.

use std::collections::{HashMap, HashSet};

use anyhow::{Context as _, bail};
use cgmath::{Quaternion, Vector3};

use crate::{
    data_structures::{
        animation::{Animation, Keyframe, NodeChannel},
        material::{Material, MaterialUniform, TextureSource},
        mesh::{Mesh, ModelVertex},
        model::{ImportedModel, ModelNode},
        pose::Pose,
    },
    resources::texture::{load_binary, sibling_path},
};

pub const GLTF_TICKS_PER_SECOND: f32 = 1.0;

pub async fn load_gltf(file_name: &str) -> anyhow::Result<ImportedModel> {
    let data = load_binary(file_name).await?;
    let gltf = gltf::Gltf::from_slice(&data).with_context(|| format!("parsing {file_name}"))?;

    let mut buffer_data = Vec::new();
    for buffer in gltf.buffers() {
        match buffer.source() {
            gltf::buffer::Source::Bin => match gltf.blob.as_deref() {
                Some(blob) => buffer_data.push(blob.to_vec()),
                None => bail!("{file_name}: binary buffer referenced but no blob present"),
            },
            gltf::buffer::Source::Uri(uri) => {
                buffer_data.push(load_binary(&sibling_path(file_name, uri)).await?);
            }
        }
    }

    let materials = gltf
        .materials()
        .map(|material| convert_material(file_name, &material, &buffer_data))
        .collect();

    let mut meshes = Vec::new();
    let mut root = ModelNode::new(file_name);
    let scene = gltf
        .default_scene()
        .or_else(|| gltf.scenes().next())
        .with_context(|| format!("{file_name} contains no scene"))?;
    for node in scene.nodes() {
        root.children
            .push(convert_node(file_name, &node, &buffer_data, &mut meshes)?);
    }

    let mut known_nodes = HashSet::new();
    collect_names(&root, &mut known_nodes);
    let animations = gltf
        .animations()
        .map(|animation| convert_animation(&animation, &buffer_data, &known_nodes))
        .collect();

    Ok(ImportedModel {
        root,
        meshes,
        materials,
        animations,
    })
}

fn node_name(node: &gltf::Node) -> String {
    node.name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("node_{}", node.index()))
}

fn collect_names(node: &ModelNode, names: &mut HashSet<String>) {
    names.insert(node.name.clone());
    for child in &node.children {
        collect_names(child, names);
    }
}

fn texture_source(file_name: &str, texture: gltf::Texture, buffers: &[Vec<u8>]) -> Option<TextureSource> {
    match texture.source().source() {
        gltf::image::Source::View { view, .. } => {
            let buffer = buffers.get(view.buffer().index())?;
            let bytes = buffer.get(view.offset()..view.offset() + view.length())?;
            Some(TextureSource::Embedded(bytes.to_vec()))
        }
        gltf::image::Source::Uri { uri, .. } if uri.starts_with("data:") => {
            log::warn!("{file_name}: data URI textures are not supported, ignoring.");
            None
        }
        gltf::image::Source::Uri { uri, .. } => Some(TextureSource::Path(sibling_path(file_name, uri))),
    }
}

fn convert_material(file_name: &str, material: &gltf::Material, buffers: &[Vec<u8>]) -> Material {
    let pbr = material.pbr_metallic_roughness();
    let [er, eg, eb] = material.emissive_factor();
    let attributes = MaterialUniform {
        diffuse: pbr.base_color_factor(),
        emission: [er, eg, eb, 1.0],
        shininess: (1.0 - pbr.roughness_factor()) * 128.0,
        ..Default::default()
    };
    let name = material
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("{file_name}#{}", material.index().unwrap_or(0)));
    Material {
        two_sided: material.double_sided(),
        diffuse_texture: pbr
            .base_color_texture()
            .and_then(|info| texture_source(file_name, info.texture(), buffers)),
        normal_texture: material
            .normal_texture()
            .and_then(|normal| texture_source(file_name, normal.texture(), buffers)),
        ..Material::new(name).with_attributes(attributes)
    }
}

fn convert_node(
    file_name: &str,
    node: &gltf::Node,
    buffers: &[Vec<u8>],
    meshes: &mut Vec<Mesh>,
) -> anyhow::Result<ModelNode> {
    let mut model_node = ModelNode::new(node_name(node));
    model_node.bind_pose = Pose::from(node.transform().decomposed());

    if let Some(mesh) = node.mesh() {
        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                bail!(
                    "{file_name}: primitive {} of mesh {} is {:?}, only triangles are supported",
                    primitive.index(),
                    mesh.name().unwrap_or("?"),
                    primitive.mode()
                );
            }
            let name = format!("{}#{}", mesh.name().unwrap_or(&model_node.name), primitive.index());
            model_node.meshes.push(meshes.len());
            meshes.push(convert_primitive(name, &primitive, buffers)?);
        }
    }

    for child in node.children() {
        model_node
            .children
            .push(convert_node(file_name, &child, buffers, meshes)?);
    }
    Ok(model_node)
}

fn convert_primitive(name: String, primitive: &gltf::Primitive, buffers: &[Vec<u8>]) -> anyhow::Result<Mesh> {
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));

    let mut vertices: Vec<ModelVertex> = reader
        .read_positions()
        .with_context(|| format!("primitive {name} has no positions"))?
        .map(|position| ModelVertex {
            position,
            ..Default::default()
        })
        .collect();

    let has_normals = match reader.read_normals() {
        Some(normals) => {
            for (vertex, normal) in vertices.iter_mut().zip(normals) {
                vertex.normal = normal;
            }
            true
        }
        None => false,
    };
    if let Some(tex_coords) = reader.read_tex_coords(0) {
        for (vertex, uv) in vertices.iter_mut().zip(tex_coords.into_f32()) {
            vertex.tex_coords = uv;
        }
    }
    let has_tangents = match reader.read_tangents() {
        Some(tangents) => {
            for (vertex, [x, y, z, w]) in vertices.iter_mut().zip(tangents) {
                let tangent = Vector3::new(x, y, z);
                vertex.tangent = tangent.into();
                // w is the handedness of the bitangent
                vertex.bitangent = (Vector3::from(vertex.normal).cross(tangent) * w).into();
            }
            true
        }
        None => false,
    };

    let indices = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..vertices.len() as u32).collect(),
    };

    let material = primitive.material().index().unwrap_or(0);
    let mut mesh = Mesh::new(name, vertices, indices, material)?;
    if !has_normals {
        mesh.generate_normals()?;
    }
    if !has_tangents {
        mesh.generate_tangents_and_bitangents()?;
    }
    mesh.orthonormalize_tangent_space()?;
    Ok(mesh)
}

fn keyframes<T>(times: &[f32], values: impl Iterator<Item = T>) -> Vec<Keyframe<T>> {
    times
        .iter()
        .zip(values)
        .map(|(&time, value)| Keyframe::new(time, value))
        .collect()
}

fn convert_animation(
    animation: &gltf::Animation,
    buffers: &[Vec<u8>],
    known_nodes: &HashSet<String>,
) -> Animation {
    let mut channels: HashMap<String, NodeChannel> = HashMap::new();
    let mut duration: f32 = 0.0;
    for channel in animation.channels() {
        let target = node_name(&channel.target().node());
        if !known_nodes.contains(&target) {
            log::warn!(
                "Animation {} targets unknown node {target}, skipping channel.",
                animation.name().unwrap_or("?")
            );
            continue;
        }
        let reader = channel.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));
        let Some(times) = reader.read_inputs() else {
            continue;
        };
        let times: Vec<f32> = times.collect();
        duration = times.iter().copied().fold(duration, f32::max);

        let entry = channels.entry(target).or_default();
        match reader.read_outputs() {
            Some(gltf::animation::util::ReadOutputs::Translations(values)) => {
                entry.positions = keyframes(&times, values.map(Vector3::from));
            }
            Some(gltf::animation::util::ReadOutputs::Rotations(values)) => {
                entry.rotations = keyframes(
                    &times,
                    values.into_f32().map(|[x, y, z, w]| Quaternion::new(w, x, y, z)),
                );
            }
            Some(gltf::animation::util::ReadOutputs::Scales(values)) => {
                entry.scales = keyframes(&times, values.map(Vector3::from));
            }
            Some(gltf::animation::util::ReadOutputs::MorphTargetWeights(_)) | None => (),
        }
    }

    Animation {
        name: animation
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("animation_{}", animation.index())),
        duration,
        ticks_per_second: GLTF_TICKS_PER_SECOND,
        channels,
    }
}
