//! Decomposed node transforms.
//!
//! Imported nodes keep their bind pose as separate translation, rotation and
//! scale so animation channels can override each component independently.

use cgmath::{One, Quaternion, Vector3};

/// Translation, rotation (as quaternion) and non-uniform scale.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    pub position: Vector3<f32>,
    pub rotation: Quaternion<f32>,
    pub scale: Vector3<f32>,
}

impl Pose {
    /// The identity pose: no move, rotation or scale.
    pub fn new() -> Self {
        Self {
            position: Vector3::new(0.0, 0.0, 0.0),
            rotation: Quaternion::one(),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }

    /// `translation * rotation * scale`
    pub fn to_matrix(&self) -> cgmath::Matrix4<f32> {
        cgmath::Matrix4::from_translation(self.position)
            * cgmath::Matrix4::from(self.rotation)
            * cgmath::Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::new()
    }
}

/// glTF stores rotations as `[x, y, z, w]`.
impl From<([f32; 3], [f32; 4], [f32; 3])> for Pose {
    fn from((position, rotation, scale): ([f32; 3], [f32; 4], [f32; 3])) -> Self {
        Self {
            position: position.into(),
            rotation: Quaternion::new(rotation[3], rotation[0], rotation[1], rotation[2]),
            scale: scale.into(),
        }
    }
}
