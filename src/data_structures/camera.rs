//! Camera placement and projection.

use cgmath::{EuclideanSpace, Matrix4, Point3, Rad, Vector3, perspective};

use crate::data_structures::transform::{Spatial, Transform};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// A transform the view is built from. Looks down its local +z axis with
/// local +y as up.
#[derive(Clone, Debug, Default)]
pub struct Camera {
    transform: Transform,
}

impl Camera {
    pub fn new(position: Vector3<f32>) -> Self {
        Self {
            transform: Transform::at(position),
        }
    }

    pub fn look_at(&self) -> Point3<f32> {
        Point3::from_vec(self.transform.position() + self.transform.orient(Vector3::unit_z()))
    }

    pub fn up(&self) -> Vector3<f32> {
        self.transform.orient(Vector3::unit_y())
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(
            Point3::from_vec(self.transform.position()),
            self.look_at(),
            self.up(),
        )
    }
}

impl Spatial for Camera {
    fn transform(&self) -> &Transform {
        &self.transform
    }

    fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Projection {
    aspect: f32,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height.max(1) as f32;
    }

    pub fn zfar(&self) -> f32 {
        self.zfar
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}
