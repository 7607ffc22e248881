use approx::assert_relative_eq;
use cgmath::{InnerSpace, Vector2, Vector3};
use vale_ngin::data_structures::mesh::{Mesh, ModelVertex};

use crate::common::test_utils::{box_mesh, quad_mesh};

mod common;

fn corner(x: f32, z: f32) -> ModelVertex {
    ModelVertex::new(Vector3::new(x, 0.0, z), Vector2::new(x, z))
}

#[test]
fn index_count_must_form_triangles() {
    let vertices = vec![corner(0.0, 0.0), corner(1.0, 0.0), corner(0.0, 1.0)];
    let err = Mesh::new("broken", vertices, vec![0, 1], 0).unwrap_err();
    assert!(err.to_string().contains("broken"));
}

#[test]
fn indices_must_reference_existing_vertices() {
    let vertices = vec![corner(0.0, 0.0), corner(1.0, 0.0), corner(0.0, 1.0)];
    assert!(Mesh::new("dangling", vertices, vec![0, 1, 3], 0).is_err());
}

#[test]
fn empty_mesh_is_valid() {
    let mesh = Mesh::new("empty", Vec::new(), Vec::new(), 0).unwrap();
    assert_eq!(mesh.triangle_count(), 0);
    assert!(mesh.bounds().is_none());
    assert!(!mesh.is_uploaded());
}

#[test]
fn normals_sum_the_faces_sharing_a_vertex() {
    let mut mesh = quad_mesh("quad", 0);
    mesh.generate_normals().unwrap();

    // corners 1 and 2 are shared by both triangles
    assert_eq!(mesh.vertices()[0].normal, [0.0, 1.0, 0.0]);
    assert_eq!(mesh.vertices()[1].normal, [0.0, 2.0, 0.0]);
    assert_eq!(mesh.vertices()[2].normal, [0.0, 2.0, 0.0]);
    assert_eq!(mesh.vertices()[3].normal, [0.0, 1.0, 0.0]);
}

#[test]
fn tangent_space_is_orthonormal() {
    let mut mesh = quad_mesh("quad", 0);
    mesh.generate_normals().unwrap();
    mesh.generate_tangents_and_bitangents().unwrap();
    mesh.orthonormalize_tangent_space().unwrap();

    for vertex in mesh.vertices() {
        let n = Vector3::from(vertex.normal);
        let t = Vector3::from(vertex.tangent);
        let b = Vector3::from(vertex.bitangent);
        assert_relative_eq!(n.magnitude(), 1.0, epsilon = 1e-5);
        assert_relative_eq!(t.magnitude(), 1.0, epsilon = 1e-5);
        assert_relative_eq!(b.magnitude(), 1.0, epsilon = 1e-5);
        assert_relative_eq!(n.dot(t), 0.0, epsilon = 1e-5);
        assert_relative_eq!(n.dot(b), 0.0, epsilon = 1e-5);
        assert_relative_eq!(t.dot(b), 0.0, epsilon = 1e-5);
        // u runs along +x and v along +z in the quad
        assert_relative_eq!(t, Vector3::new(1.0, 0.0, 0.0), epsilon = 1e-5);
        assert_relative_eq!(b, Vector3::new(0.0, 0.0, 1.0), epsilon = 1e-5);
    }
}

#[test]
fn left_handed_uv_layout_negates_the_bitangent_only() {
    let mut mesh = quad_mesh("quad", 0);
    mesh.generate_normals().unwrap();
    mesh.generate_tangents_and_bitangents().unwrap();
    mesh.orthonormalize_tangent_space().unwrap();

    for vertex in mesh.vertices() {
        let n = Vector3::from(vertex.normal);
        let t = Vector3::from(vertex.tangent);
        let b = Vector3::from(vertex.bitangent);
        // +x, +z, +y is left-handed, so b is the negated cross product
        assert_relative_eq!(b, -n.cross(t), epsilon = 1e-5);
    }
}

#[test]
fn degenerate_uvs_leave_tangents_untouched() {
    let vertices = vec![
        ModelVertex::new(Vector3::new(0.0, 0.0, 0.0), Vector2::new(0.5, 0.5)),
        ModelVertex::new(Vector3::new(1.0, 0.0, 0.0), Vector2::new(0.5, 0.5)),
        ModelVertex::new(Vector3::new(0.0, 0.0, 1.0), Vector2::new(0.5, 0.5)),
    ];
    let mut mesh = Mesh::new("flat uv", vertices, vec![0, 2, 1], 0).unwrap();
    mesh.generate_tangents_and_bitangents().unwrap();
    assert!(mesh.vertices().iter().all(|v| v.tangent == [0.0, 0.0, 0.0]));
}

#[test]
fn bounds_cover_every_vertex() {
    let mesh = box_mesh("box", Vector3::new(-1.0, 0.0, 2.0), Vector3::new(3.0, 5.0, 4.0));
    let (min, max) = mesh.bounds().unwrap();
    assert_eq!(min, Vector3::new(-1.0, 0.0, 2.0));
    assert_eq!(max, Vector3::new(3.0, 5.0, 4.0));
    assert_eq!(mesh.triangle_count(), 12);
}
