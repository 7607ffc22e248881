//! Wavefront OBJ import via `tobj`.
//!
//! OBJ files carry no hierarchy and no animation: the result is a single
//! node owning every mesh in the file.

use std::io::{BufReader, Cursor};

use anyhow::bail;

use crate::{
    data_structures::{
        material::{Material, MaterialUniform, TextureSource},
        mesh::{Mesh, ModelVertex},
        model::{ImportedModel, ModelNode},
    },
    resources::texture::{load_string, sibling_path},
};

pub async fn load_obj(file_name: &str) -> anyhow::Result<ImportedModel> {
    let obj_text = load_string(file_name).await?;
    let mut obj_reader = BufReader::new(Cursor::new(obj_text));

    let (models, obj_materials) = tobj::load_obj_buf_async(
        &mut obj_reader,
        &tobj::LoadOptions {
            triangulate: false,
            single_index: true,
            ..Default::default()
        },
        |p| {
            let mtl_path = sibling_path(file_name, &p);
            async move {
                match load_string(&mtl_path).await {
                    Ok(mat_text) => tobj::load_mtl_buf(&mut BufReader::new(Cursor::new(mat_text))),
                    Err(e) => {
                        log::warn!("Material library {mtl_path} could not be read: {e:#}");
                        Err(tobj::LoadError::OpenFileFailed)
                    }
                }
            }
        },
    )
    .await?;

    let materials = match obj_materials {
        Ok(materials) => materials
            .iter()
            .map(|m| convert_material(file_name, m))
            .collect(),
        Err(e) => {
            log::warn!("{file_name} has no usable materials ({e}), using defaults.");
            Vec::new()
        }
    };

    let mut meshes = Vec::with_capacity(models.len());
    for model in &models {
        meshes.push(convert_mesh(file_name, model)?);
    }

    let root = ModelNode::new(file_name).with_meshes((0..meshes.len()).collect());
    Ok(ImportedModel {
        root,
        meshes,
        materials,
        animations: Vec::new(),
    })
}

fn convert_material(file_name: &str, m: &tobj::Material) -> Material {
    let defaults = MaterialUniform::default();
    let alpha = m.dissolve.unwrap_or(1.0);
    let colour = |c: Option<[f32; 3]>, fallback: [f32; 4]| c.map_or(fallback, |[r, g, b]| [r, g, b, alpha]);
    let attributes = MaterialUniform {
        shininess: m.shininess.unwrap_or(defaults.shininess),
        diffuse: colour(m.diffuse, defaults.diffuse),
        specular: colour(m.specular, defaults.specular),
        ambient: colour(m.ambient, defaults.ambient),
        ..defaults
    };
    let texture = |t: &Option<String>| t.as_ref().map(|t| TextureSource::Path(sibling_path(file_name, t)));
    Material {
        diffuse_texture: texture(&m.diffuse_texture),
        normal_texture: texture(&m.normal_texture),
        ..Material::new(m.name.clone()).with_attributes(attributes)
    }
}

fn convert_mesh(file_name: &str, model: &tobj::Model) -> anyhow::Result<Mesh> {
    let m = &model.mesh;
    if let Some(arity) = m.face_arities.iter().find(|&&a| a != 3) {
        bail!(
            "{file_name}: mesh {} has a face with {arity} vertices, only triangles are supported",
            model.name
        );
    }
    let vertices = (0..m.positions.len() / 3)
        .map(|i| ModelVertex {
            position: [m.positions[i * 3], m.positions[i * 3 + 1], m.positions[i * 3 + 2]],
            tex_coords: [
                m.texcoords.get(i * 2).copied().unwrap_or(0.0),
                1.0 - m.texcoords.get(i * 2 + 1).copied().unwrap_or(0.0),
            ],
            normal: [
                m.normals.get(i * 3).copied().unwrap_or(0.0),
                m.normals.get(i * 3 + 1).copied().unwrap_or(0.0),
                m.normals.get(i * 3 + 2).copied().unwrap_or(0.0),
            ],
            ..Default::default()
        })
        .collect();

    let mut mesh = Mesh::new(model.name.clone(), vertices, m.indices.clone(), m.material_id.unwrap_or(0))?;
    if m.normals.is_empty() {
        mesh.generate_normals()?;
    }
    // OBJ files don't come with tangents; normal maps need them.
    mesh.generate_tangents_and_bitangents()?;
    mesh.orthonormalize_tangent_space()?;
    Ok(mesh)
}
