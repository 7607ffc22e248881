//! Scene graph and hierarchical scene organization.
//!
//! A [`SceneNode`] is anything that can be updated and rendered below a parent
//! transform. [`GroupNode`] is the plain container: a transform plus a scale
//! that exclusively owns an ordered list of children. Specialised nodes
//! (render objects, terrain, particle systems) embed a `GroupNode` for their
//! placement and children.
//!
//! [`MoveGroup`] is a different kind of grouping: it does not compose
//! matrices, it replays every move/rotate command on each member.

use std::{cell::RefCell, ops::Index, rc::Rc};

use cgmath::{Matrix4, Rad, Vector3};

use crate::{
    data_structures::transform::{Movable, Spatial, Transform},
    render::RenderBackend,
};

pub trait SceneNode {
    /// Local matrix of this node relative to its parent, including scale.
    fn matrix(&self) -> Matrix4<f32>;

    /// Advance time dependent state (animation, particles, water).
    fn update(&mut self, _dt: f32) {}

    /// Draw this node and its subtree. `parent` is the accumulated matrix
    /// of all ancestors; implementations compose their own matrix onto it
    /// and hand the result down, so siblings never see each other's
    /// transforms.
    fn render(&self, dt: f32, parent: &Matrix4<f32>, backend: &mut dyn RenderBackend);
}

impl<T: SceneNode + ?Sized> SceneNode for Rc<RefCell<T>> {
    fn matrix(&self) -> Matrix4<f32> {
        self.borrow().matrix()
    }

    fn update(&mut self, dt: f32) {
        self.borrow_mut().update(dt);
    }

    fn render(&self, dt: f32, parent: &Matrix4<f32>, backend: &mut dyn RenderBackend) {
        self.borrow().render(dt, parent, backend);
    }
}

/// A transform with a non-uniform scale that owns its children.
///
/// Children are rendered in insertion order. Dropping the group drops the
/// whole subtree.
pub struct GroupNode {
    transform: Transform,
    pub scale: Vector3<f32>,
    children: Vec<Box<dyn SceneNode>>,
}

impl Default for GroupNode {
    fn default() -> Self {
        Self::new()
    }
}

impl GroupNode {
    pub fn new() -> Self {
        Self::at(Vector3::new(0.0, 0.0, 0.0))
    }

    pub fn at(position: Vector3<f32>) -> Self {
        Self {
            transform: Transform::at(position),
            scale: Vector3::new(1.0, 1.0, 1.0),
            children: Vec::new(),
        }
    }

    pub fn add_object(&mut self, child: Box<dyn SceneNode>) {
        self.children.push(child);
    }

    pub fn get(&self, index: usize) -> Option<&dyn SceneNode> {
        self.children.get(index).map(|child| child.as_ref())
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut (dyn SceneNode + 'static)> {
        self.children.get_mut(index).map(|child| child.as_mut())
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// `translation * rotation * scale`
    pub fn local_matrix(&self) -> Matrix4<f32> {
        self.transform.matrix() * Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }

    pub fn update_children(&mut self, dt: f32) {
        for child in self.children.iter_mut() {
            child.update(dt);
        }
    }

    /// Render every child below `world`, the already composed matrix of the
    /// node owning this group.
    pub fn render_children(&self, dt: f32, world: &Matrix4<f32>, backend: &mut dyn RenderBackend) {
        for child in &self.children {
            child.render(dt, world, backend);
        }
    }
}

impl Index<usize> for GroupNode {
    type Output = dyn SceneNode;

    fn index(&self, index: usize) -> &Self::Output {
        self.children[index].as_ref()
    }
}

impl Spatial for GroupNode {
    fn transform(&self) -> &Transform {
        &self.transform
    }

    fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }
}

impl SceneNode for GroupNode {
    fn matrix(&self) -> Matrix4<f32> {
        self.local_matrix()
    }

    fn update(&mut self, dt: f32) {
        self.update_children(dt);
    }

    fn render(&self, dt: f32, parent: &Matrix4<f32>, backend: &mut dyn RenderBackend) {
        let world = parent * self.local_matrix();
        self.render_children(dt, &world, backend);
    }
}

/// Moves a set of objects as one unit.
///
/// Every command is applied to the group's own transform and then issued
/// again, unchanged, to each member. Members therefore interpret relative
/// moves and rotations in their *own* frame; nothing is propagated by matrix
/// multiplication. A typical use is a light and its marker mesh.
pub struct MoveGroup {
    transform: Transform,
    members: Vec<Box<dyn Movable>>,
}

impl Default for MoveGroup {
    fn default() -> Self {
        Self::new()
    }
}

impl MoveGroup {
    pub fn new() -> Self {
        Self {
            transform: Transform::new(),
            members: Vec::new(),
        }
    }

    pub fn add_object(&mut self, member: Box<dyn Movable>) {
        self.members.push(member);
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn get(&self, index: usize) -> Option<&dyn Movable> {
        self.members.get(index).map(|member| member.as_ref())
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    fn replay(&mut self, command: impl Fn(&mut dyn Movable)) {
        command(&mut self.transform);
        for member in self.members.iter_mut() {
            command(member.as_mut());
        }
    }
}

impl Movable for MoveGroup {
    fn relative_move(&mut self, v: Vector3<f32>) {
        self.replay(|m| m.relative_move(v));
    }

    fn absolute_move(&mut self, v: Vector3<f32>) {
        self.replay(|m| m.absolute_move(v));
    }

    fn relative_rotate(&mut self, axis: Vector3<f32>, angle: Rad<f32>) {
        self.replay(|m| m.relative_rotate(axis, angle));
    }

    fn absolute_rotate(&mut self, axis: Vector3<f32>, angle: Rad<f32>) {
        self.replay(|m| m.absolute_rotate(axis, angle));
    }

    fn set_position(&mut self, position: Vector3<f32>) {
        self.replay(|m| m.set_position(position));
    }

    fn set_rotation(&mut self, axis: Vector3<f32>, angle: Rad<f32>) {
        self.replay(|m| m.set_rotation(axis, angle));
    }

    fn position(&self) -> Vector3<f32> {
        self.transform.position()
    }
}
