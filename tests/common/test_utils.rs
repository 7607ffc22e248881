use std::{cell::Cell, collections::HashMap, rc::Rc};

use cgmath::{Matrix4, SquareMatrix, Vector2, Vector3};
use vale_ngin::{
    data_structures::{
        animation::{Animation, Keyframe, NodeChannel},
        material::Material,
        mesh::{Mesh, ModelVertex},
        model::{ImportedModel, ModelNode},
        pose::Pose,
        scene_graph::{GroupNode, SceneNode},
    },
    render::{RenderBackend, ShaderProgram},
};

/// A unit quad in the xz plane, two triangles.
pub fn quad_mesh(name: &str, material: usize) -> Mesh {
    let vertices = vec![
        ModelVertex::new(Vector3::new(0.0, 0.0, 0.0), Vector2::new(0.0, 0.0)),
        ModelVertex::new(Vector3::new(1.0, 0.0, 0.0), Vector2::new(1.0, 0.0)),
        ModelVertex::new(Vector3::new(0.0, 0.0, 1.0), Vector2::new(0.0, 1.0)),
        ModelVertex::new(Vector3::new(1.0, 0.0, 1.0), Vector2::new(1.0, 1.0)),
    ];
    Mesh::new(name, vertices, vec![0, 2, 1, 1, 2, 3], material).unwrap()
}

/// An axis aligned box from `min` to `max`, eight shared corners.
pub fn box_mesh(name: &str, min: Vector3<f32>, max: Vector3<f32>) -> Mesh {
    let mut vertices = Vec::new();
    for i in 0..8 {
        let pick = |bit: usize, lo: f32, hi: f32| if i & bit == 0 { lo } else { hi };
        vertices.push(ModelVertex::new(
            Vector3::new(pick(1, min.x, max.x), pick(2, min.y, max.y), pick(4, min.z, max.z)),
            Vector2::new(0.0, 0.0),
        ));
    }
    #[rustfmt::skip]
    let indices = vec![
        0, 2, 1, 1, 2, 3,
        4, 5, 6, 5, 7, 6,
        0, 1, 4, 1, 5, 4,
        2, 6, 3, 3, 6, 7,
        0, 4, 2, 2, 4, 6,
        1, 3, 5, 3, 7, 5,
    ];
    Mesh::new(name, vertices, indices, 0).unwrap()
}

/// A body with an arm two units to its right. The "wave" animation lifts
/// the arm by one unit per tick over ten ticks.
pub fn waving_model() -> ImportedModel {
    let arm = ModelNode {
        bind_pose: Pose {
            position: Vector3::new(2.0, 0.0, 0.0),
            ..Pose::new()
        },
        ..ModelNode::new("arm").with_meshes(vec![1])
    };
    let root = ModelNode::new("body").with_meshes(vec![0]).with_child(arm);

    let mut channels = HashMap::new();
    channels.insert(
        "arm".to_string(),
        NodeChannel {
            positions: vec![
                Keyframe::new(0.0, Vector3::new(2.0, 0.0, 0.0)),
                Keyframe::new(10.0, Vector3::new(2.0, 10.0, 0.0)),
            ],
            ..Default::default()
        },
    );

    ImportedModel {
        root,
        meshes: vec![
            box_mesh("body", Vector3::new(-1.0, -1.0, -1.0), Vector3::new(1.0, 1.0, 1.0)),
            box_mesh("arm", Vector3::new(-0.5, -0.5, -0.5), Vector3::new(0.5, 0.5, 0.5)),
        ],
        materials: vec![Material::new("skin")],
        animations: vec![Animation {
            name: "wave".to_string(),
            duration: 10.0,
            ticks_per_second: 1.0,
            channels,
        }],
    }
}

/// A node that draws one named quad at its own local matrix.
pub struct Marker {
    pub group: GroupNode,
    mesh: Mesh,
}

impl Marker {
    pub fn new(name: &str, position: Vector3<f32>) -> Self {
        Self {
            group: GroupNode::at(position),
            mesh: quad_mesh(name, 0),
        }
    }
}

impl SceneNode for Marker {
    fn matrix(&self) -> Matrix4<f32> {
        self.group.local_matrix()
    }

    fn render(&self, dt: f32, parent: &Matrix4<f32>, backend: &mut dyn RenderBackend) {
        let world = parent * self.group.local_matrix();
        backend.upload_model_matrices(&world);
        backend.draw_mesh(&self.mesh, ShaderProgram::Normal);
        self.group.render_children(dt, &world, backend);
    }
}

/// Counts how often it was updated and bumps a shared counter when dropped.
pub struct Tracked {
    pub updates: Rc<Cell<usize>>,
    pub drops: Rc<Cell<usize>>,
}

impl Tracked {
    pub fn new(drops: &Rc<Cell<usize>>) -> Self {
        Self {
            updates: Rc::new(Cell::new(0)),
            drops: drops.clone(),
        }
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.drops.set(self.drops.get() + 1);
    }
}

impl SceneNode for Tracked {
    fn matrix(&self) -> Matrix4<f32> {
        Matrix4::identity()
    }

    fn update(&mut self, _dt: f32) {
        self.updates.set(self.updates.get() + 1);
    }

    fn render(&self, _dt: f32, _parent: &Matrix4<f32>, _backend: &mut dyn RenderBackend) {}
}
