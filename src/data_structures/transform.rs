//! Position and orientation with lazily cached transform matrices.
//!
//! [`Transform`] is the value type every placeable thing in the scene embeds.
//! Types expose their transform through [`Spatial`] and get the full set of
//! move/rotate commands through the blanket [`Movable`] implementation.

use std::{cell::Cell, cell::RefCell, rc::Rc};

use cgmath::{InnerSpace, Matrix4, One, Quaternion, Rad, Rotation3, Vector3, Zero};

/// Single-threaded shared ownership, used when one object is a member of
/// several collections (e.g. a light that is both in the scene and in a
/// [`MoveGroup`](crate::data_structures::scene_graph::MoveGroup)).
pub type Shared<T> = Rc<RefCell<T>>;

pub fn shared<T>(value: T) -> Shared<T> {
    Rc::new(RefCell::new(value))
}

/// Position plus unit orientation.
///
/// The translation, rotation and composed matrices are computed on demand and
/// cached until the next mutation touches the part they depend on.
#[derive(Clone, Debug)]
pub struct Transform {
    position: Vector3<f32>,
    orientation: Quaternion<f32>,
    translation_matrix: Cell<Option<Matrix4<f32>>>,
    rotation_matrix: Cell<Option<Matrix4<f32>>>,
    matrix: Cell<Option<Matrix4<f32>>>,
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}

impl Transform {
    pub fn new() -> Self {
        Self::at(Vector3::zero())
    }

    pub fn at(position: Vector3<f32>) -> Self {
        Self {
            position,
            orientation: Quaternion::one(),
            translation_matrix: Cell::new(None),
            rotation_matrix: Cell::new(None),
            matrix: Cell::new(None),
        }
    }

    pub fn position(&self) -> Vector3<f32> {
        self.position
    }

    pub fn orientation(&self) -> Quaternion<f32> {
        self.orientation
    }

    /// Rotate `v` from the local frame into the parent frame.
    pub fn orient(&self, v: Vector3<f32>) -> Vector3<f32> {
        self.orientation * v
    }

    pub fn translation_matrix(&self) -> Matrix4<f32> {
        cached(&self.translation_matrix, || {
            Matrix4::from_translation(self.position)
        })
    }

    pub fn rotation_matrix(&self) -> Matrix4<f32> {
        cached(&self.rotation_matrix, || Matrix4::from(self.orientation))
    }

    /// `translation * rotation`
    pub fn matrix(&self) -> Matrix4<f32> {
        cached(&self.matrix, || {
            self.translation_matrix() * self.rotation_matrix()
        })
    }

    /// Translate along the node's own axes.
    pub fn relative_move(&mut self, v: Vector3<f32>) {
        self.position += self.orient(v);
        self.invalidate_translation();
    }

    /// Translate in the parent frame, ignoring orientation.
    pub fn absolute_move(&mut self, v: Vector3<f32>) {
        self.position += v;
        self.invalidate_translation();
    }

    /// Rotate about `axis` given in the node's local frame.
    pub fn relative_rotate(&mut self, axis: Vector3<f32>, angle: Rad<f32>) {
        if let Some(rotation) = axis_angle(axis, angle) {
            self.set_orientation(self.orientation * rotation);
        }
    }

    /// Rotate about `axis` given in the parent frame.
    ///
    /// Equivalent to mapping the axis into the local frame with the inverse
    /// orientation and composing on the right.
    pub fn absolute_rotate(&mut self, axis: Vector3<f32>, angle: Rad<f32>) {
        if let Some(rotation) = axis_angle(axis, angle) {
            self.set_orientation(rotation * self.orientation);
        }
    }

    pub fn set_position(&mut self, position: Vector3<f32>) {
        self.position = position;
        self.invalidate_translation();
    }

    /// Replace the orientation with a rotation of `angle` about `axis`.
    pub fn set_rotation(&mut self, axis: Vector3<f32>, angle: Rad<f32>) {
        self.set_orientation(axis_angle(axis, angle).unwrap_or_else(Quaternion::one));
    }

    pub fn set_orientation(&mut self, orientation: Quaternion<f32>) {
        // composing many small rotations drifts off the unit sphere
        self.orientation = if orientation.magnitude2() > f32::EPSILON {
            orientation.normalize()
        } else {
            Quaternion::one()
        };
        self.invalidate_rotation();
    }

    fn invalidate_translation(&mut self) {
        self.translation_matrix.set(None);
        self.matrix.set(None);
    }

    fn invalidate_rotation(&mut self) {
        self.rotation_matrix.set(None);
        self.matrix.set(None);
    }
}

fn cached(cell: &Cell<Option<Matrix4<f32>>>, compute: impl FnOnce() -> Matrix4<f32>) -> Matrix4<f32> {
    match cell.get() {
        Some(matrix) => matrix,
        None => {
            let matrix = compute();
            cell.set(Some(matrix));
            matrix
        }
    }
}

fn axis_angle(axis: Vector3<f32>, angle: Rad<f32>) -> Option<Quaternion<f32>> {
    if axis.magnitude2() <= f32::EPSILON {
        log::warn!("Ignoring rotation about a zero-length axis.");
        return None;
    }
    Some(Quaternion::from_axis_angle(axis.normalize(), angle))
}

/// Access to the [`Transform`] embedded in a node.
pub trait Spatial {
    fn transform(&self) -> &Transform;
    fn transform_mut(&mut self) -> &mut Transform;
}

impl Spatial for Transform {
    fn transform(&self) -> &Transform {
        self
    }

    fn transform_mut(&mut self) -> &mut Transform {
        self
    }
}

/// The move/rotate command set shared by every placeable object.
///
/// Implemented for everything [`Spatial`], for shared handles, and by
/// [`MoveGroup`](crate::data_structures::scene_graph::MoveGroup), which
/// replays each command on its members.
pub trait Movable {
    fn relative_move(&mut self, v: Vector3<f32>);
    fn absolute_move(&mut self, v: Vector3<f32>);
    fn relative_rotate(&mut self, axis: Vector3<f32>, angle: Rad<f32>);
    fn absolute_rotate(&mut self, axis: Vector3<f32>, angle: Rad<f32>);
    fn set_position(&mut self, position: Vector3<f32>);
    fn set_rotation(&mut self, axis: Vector3<f32>, angle: Rad<f32>);
    fn position(&self) -> Vector3<f32>;
}

impl<T: Spatial> Movable for T {
    fn relative_move(&mut self, v: Vector3<f32>) {
        self.transform_mut().relative_move(v);
    }

    fn absolute_move(&mut self, v: Vector3<f32>) {
        self.transform_mut().absolute_move(v);
    }

    fn relative_rotate(&mut self, axis: Vector3<f32>, angle: Rad<f32>) {
        self.transform_mut().relative_rotate(axis, angle);
    }

    fn absolute_rotate(&mut self, axis: Vector3<f32>, angle: Rad<f32>) {
        self.transform_mut().absolute_rotate(axis, angle);
    }

    fn set_position(&mut self, position: Vector3<f32>) {
        self.transform_mut().set_position(position);
    }

    fn set_rotation(&mut self, axis: Vector3<f32>, angle: Rad<f32>) {
        self.transform_mut().set_rotation(axis, angle);
    }

    fn position(&self) -> Vector3<f32> {
        self.transform().position()
    }
}

impl<T: Movable + ?Sized> Movable for Rc<RefCell<T>> {
    fn relative_move(&mut self, v: Vector3<f32>) {
        self.borrow_mut().relative_move(v);
    }

    fn absolute_move(&mut self, v: Vector3<f32>) {
        self.borrow_mut().absolute_move(v);
    }

    fn relative_rotate(&mut self, axis: Vector3<f32>, angle: Rad<f32>) {
        self.borrow_mut().relative_rotate(axis, angle);
    }

    fn absolute_rotate(&mut self, axis: Vector3<f32>, angle: Rad<f32>) {
        self.borrow_mut().absolute_rotate(axis, angle);
    }

    fn set_position(&mut self, position: Vector3<f32>) {
        self.borrow_mut().set_position(position);
    }

    fn set_rotation(&mut self, axis: Vector3<f32>, angle: Rad<f32>) {
        self.borrow_mut().set_rotation(axis, angle);
    }

    fn position(&self) -> Vector3<f32> {
        self.borrow().position()
    }
}
