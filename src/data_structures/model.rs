//! Imported models and the render object that draws and animates them.

use cgmath::{Matrix4, SquareMatrix, Vector3, Vector4};

use crate::{
    data_structures::{
        animation::{Animation, EndBehavior, Playback, StopFrame},
        material::Material,
        mesh::Mesh,
        pose::Pose,
        scene_graph::{GroupNode, SceneNode},
        transform::{Spatial, Transform},
    },
    render::{RenderBackend, ShaderProgram},
    resources,
};

/// One node of an imported model hierarchy.
#[derive(Clone, Debug, Default)]
pub struct ModelNode {
    pub name: String,
    pub bind_pose: Pose,
    /// Indices into the owning model's mesh list.
    pub meshes: Vec<usize>,
    pub children: Vec<ModelNode>,
}

impl ModelNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_meshes(mut self, meshes: Vec<usize>) -> Self {
        self.meshes = meshes;
        self
    }

    pub fn with_child(mut self, child: ModelNode) -> Self {
        self.children.push(child);
        self
    }

    fn visit<'a>(&'a self, parent: &Matrix4<f32>, f: &mut impl FnMut(&'a ModelNode, &Matrix4<f32>)) {
        let matrix = parent * self.bind_pose.to_matrix();
        f(self, &matrix);
        for child in &self.children {
            child.visit(&matrix, f);
        }
    }
}

/// What the asset importer hands back: a node tree, the meshes and
/// materials it references and any node animations.
#[derive(Clone, Debug, Default)]
pub struct ImportedModel {
    pub root: ModelNode,
    pub meshes: Vec<Mesh>,
    pub materials: Vec<Material>,
    pub animations: Vec<Animation>,
}

/// A placed, optionally animated model.
///
/// The model is normalized once at construction: centered on its bind-pose
/// bounding box and scaled so the largest extent is 1. An object whose model
/// failed to load renders nothing but still carries its children.
pub struct RenderObject {
    group: GroupNode,
    program: ShaderProgram,
    root: Option<ModelNode>,
    meshes: Vec<Mesh>,
    materials: Vec<Material>,
    animations: Vec<Animation>,
    normalization: Matrix4<f32>,
    playback: Playback,
}

impl std::fmt::Debug for RenderObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderObject")
            .field("program", &self.program)
            .field("root", &self.root)
            .field("meshes", &self.meshes)
            .field("materials", &self.materials)
            .field("animations", &self.animations)
            .field("normalization", &self.normalization)
            .field("playback", &self.playback)
            .finish_non_exhaustive()
    }
}

impl RenderObject {
    pub fn empty(program: ShaderProgram) -> Self {
        Self {
            group: GroupNode::new(),
            program,
            root: None,
            meshes: Vec::new(),
            materials: Vec::new(),
            animations: Vec::new(),
            normalization: Matrix4::identity(),
            playback: Playback::default(),
        }
    }

    pub fn from_imported(model: ImportedModel, program: ShaderProgram) -> Self {
        let ImportedModel {
            root,
            mut meshes,
            mut materials,
            animations,
        } = model;
        if materials.is_empty() {
            materials.push(Material::new("default"));
        }
        for mesh in meshes.iter_mut() {
            if mesh.material >= materials.len() {
                log::warn!(
                    "Mesh {} references missing material {}, using the first one.",
                    mesh.name,
                    mesh.material
                );
                mesh.material = 0;
            }
        }
        let mut object = Self {
            root: Some(root),
            meshes,
            materials,
            animations,
            ..Self::empty(program)
        };
        object.normalization = match object.bounds() {
            Some((min, max)) => normalization_matrix(min, max),
            None => Matrix4::identity(),
        };
        object
    }

    /// Import `file_name`. A model file that cannot be read is logged and
    /// yields an empty object. Malformed content is an error.
    pub async fn load(file_name: &str, program: ShaderProgram) -> anyhow::Result<Self> {
        match resources::load_model(file_name).await {
            Ok(model) => Ok(Self::from_imported(model, program)),
            Err(e) if is_unreadable(&e) => {
                log::warn!("Could not load model {file_name}: {e:#}");
                Ok(Self::empty(program))
            }
            Err(e) => Err(e),
        }
    }

    /// Create GPU buffers for all meshes and bind the material textures.
    /// Materials without textures get a white diffuse and a flat normal map.
    pub async fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
    ) -> anyhow::Result<()> {
        for mesh in self.meshes.iter_mut() {
            mesh.upload(device);
        }
        for material in self.materials.iter_mut() {
            resources::bind_material(material, device, queue, layout).await?;
        }
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.root.is_some()
    }

    pub fn group(&self) -> &GroupNode {
        &self.group
    }

    pub fn group_mut(&mut self) -> &mut GroupNode {
        &mut self.group
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn materials_mut(&mut self) -> &mut [Material] {
        &mut self.materials
    }

    pub fn animations(&self) -> &[Animation] {
        &self.animations
    }

    pub fn normalization(&self) -> Matrix4<f32> {
        self.normalization
    }

    /// Bind-pose bounds of all meshes in model space.
    pub fn bounds(&self) -> Option<(Vector3<f32>, Vector3<f32>)> {
        let root = self.root.as_ref()?;
        let mut bounds: Option<(Vector3<f32>, Vector3<f32>)> = None;
        root.visit(&Matrix4::identity(), &mut |node, matrix| {
            for mesh in node.meshes.iter().filter_map(|&i| self.meshes.get(i)) {
                for vertex in mesh.vertices() {
                    let p = (matrix * Vector4::new(vertex.position[0], vertex.position[1], vertex.position[2], 1.0)).truncate();
                    bounds = Some(match bounds {
                        None => (p, p),
                        Some((min, max)) => (
                            Vector3::new(min.x.min(p.x), min.y.min(p.y), min.z.min(p.z)),
                            Vector3::new(max.x.max(p.x), max.y.max(p.y), max.z.max(p.z)),
                        ),
                    });
                }
            }
        });
        bounds
    }

    pub fn start_animation(
        &mut self,
        index: usize,
        start_frame: Option<f32>,
        end_frame: Option<f32>,
        end_behavior: EndBehavior,
    ) -> bool {
        self.playback
            .start(&self.animations, index, start_frame, end_frame, end_behavior)
    }

    pub fn stop_animation(&mut self, end_frame: Option<f32>, set_frame: StopFrame) -> bool {
        self.playback.stop(end_frame, set_frame)
    }

    pub fn playback(&self) -> &Playback {
        &self.playback
    }

    pub fn current_frame(&self) -> f32 {
        self.playback.current_frame()
    }

    pub fn is_running(&self) -> bool {
        self.playback.is_running()
    }

    /// The pose `node` is drawn with right now.
    pub fn node_pose(&self, node: &ModelNode) -> Pose {
        self.playback
            .current_animation()
            .and_then(|i| self.animations.get(i))
            .and_then(|animation| animation.channels.get(&node.name))
            .map(|channel| channel.sample(self.playback.current_frame(), &node.bind_pose))
            .unwrap_or(node.bind_pose)
    }

    fn render_node(&self, node: &ModelNode, parent: &Matrix4<f32>, backend: &mut dyn RenderBackend) {
        let matrix = parent * self.node_pose(node).to_matrix();
        if !node.meshes.is_empty() {
            backend.upload_model_matrices(&matrix);
            for mesh in node.meshes.iter().filter_map(|&i| self.meshes.get(i)) {
                if let Some(material) = self.materials.get(mesh.material) {
                    backend.upload_material(material);
                }
                backend.draw_mesh(mesh, self.program);
            }
        }
        for child in &node.children {
            self.render_node(child, &matrix, backend);
        }
    }
}

/// Center the box on the origin and scale its largest side to 1.
fn normalization_matrix(min: Vector3<f32>, max: Vector3<f32>) -> Matrix4<f32> {
    let extent = max - min;
    let largest = extent.x.max(extent.y).max(extent.z);
    let center = (min + max) * 0.5;
    let scale = if largest > f32::EPSILON { 1.0 / largest } else { 1.0 };
    Matrix4::from_scale(scale) * Matrix4::from_translation(-center)
}

/// Whether an import failed because a file could not be read at all.
fn is_unreadable(error: &anyhow::Error) -> bool {
    error
        .chain()
        .any(|cause| cause.downcast_ref::<std::io::Error>().is_some())
}

impl Spatial for RenderObject {
    fn transform(&self) -> &Transform {
        self.group.transform()
    }

    fn transform_mut(&mut self) -> &mut Transform {
        self.group.transform_mut()
    }
}

impl SceneNode for RenderObject {
    fn matrix(&self) -> Matrix4<f32> {
        self.group.local_matrix()
    }

    fn update(&mut self, dt: f32) {
        self.playback.tick(&self.animations, dt);
        self.group.update_children(dt);
    }

    fn render(&self, dt: f32, parent: &Matrix4<f32>, backend: &mut dyn RenderBackend) {
        let world = parent * self.group.local_matrix();
        if let Some(root) = &self.root {
            self.render_node(root, &(world * self.normalization), backend);
        }
        self.group.render_children(dt, &world, backend);
    }
}
