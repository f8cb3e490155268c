//! Rigid transforms between tagged frames.

use crate::error::{check_frame, Result};
use crate::{Frame, Mat3, Vec3};
use nalgebra::{Rotation3, UnitQuaternion, UnitVector3};

/// Rigid transform from one frame to another.
///
/// Maps point coordinates as `p_to = rot * p_from + trans`. The rotation is
/// stored as a matrix and kept orthonormal to tolerance; routine operations
/// never renormalize — call [`Transform3D::renormalize`] explicitly after
/// long composition chains.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform3D {
    pub from: Frame,
    pub to: Frame,
    pub rot: Mat3,
    pub trans: Vec3,
}

impl Transform3D {
    pub fn new(from: Frame, to: Frame, rot: Mat3, trans: Vec3) -> Self {
        Self {
            from,
            to,
            rot,
            trans,
        }
    }

    /// Identity transform between two (coincident) frames.
    pub fn identity(from: Frame, to: Frame) -> Self {
        Self {
            from,
            to,
            rot: Mat3::identity(),
            trans: Vec3::zeros(),
        }
    }

    /// Pure rotation about an axis.
    pub fn from_axis_angle(from: Frame, to: Frame, axis: &UnitVector3<f64>, angle: f64) -> Self {
        Self {
            from,
            to,
            rot: *Rotation3::from_axis_angle(axis, angle).matrix(),
            trans: Vec3::zeros(),
        }
    }

    /// Pure translation.
    pub fn from_translation(from: Frame, to: Frame, trans: Vec3) -> Self {
        Self {
            from,
            to,
            rot: Mat3::identity(),
            trans,
        }
    }

    /// Map point coordinates from the `from` frame to the `to` frame.
    #[inline]
    pub fn transform_point(&self, p: &Vec3) -> Vec3 {
        self.rot * p + self.trans
    }

    /// Rotate a (free) vector from the `from` frame to the `to` frame.
    #[inline]
    pub fn rotate(&self, v: &Vec3) -> Vec3 {
        self.rot * v
    }

    /// Compose with an inner transform: `self (b→c) ∘ inner (a→b) = (a→c)`.
    ///
    /// Fails unless `inner.to == self.from`.
    pub fn compose(&self, inner: &Transform3D) -> Result<Transform3D> {
        check_frame("Transform3D::compose", self.from, inner.to)?;
        Ok(Transform3D {
            from: inner.from,
            to: self.to,
            rot: self.rot * inner.rot,
            trans: self.rot * inner.trans + self.trans,
        })
    }

    /// Inverse transform, swapping the frame annotations.
    pub fn inv(&self) -> Transform3D {
        let rot_t = self.rot.transpose();
        Transform3D {
            from: self.to,
            to: self.from,
            rot: rot_t,
            trans: -(rot_t * self.trans),
        }
    }

    /// Re-orthonormalize the rotation after drift from long composition
    /// chains, via a unit-quaternion round trip.
    pub fn renormalize(&mut self) {
        let q = UnitQuaternion::from_matrix(&self.rot);
        self.rot = *q.to_rotation_matrix().matrix();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    #[test]
    fn compose_checks_inner_frames() {
        let a = Frame::new();
        let b = Frame::new();
        let c = Frame::new();
        let ab = Transform3D::from_translation(a, b, Vector3::new(1.0, 0.0, 0.0));
        let bc = Transform3D::from_translation(b, c, Vector3::new(0.0, 2.0, 0.0));

        let ac = bc.compose(&ab).unwrap();
        assert_eq!(ac.from, a);
        assert_eq!(ac.to, c);
        assert_relative_eq!(ac.trans, Vector3::new(1.0, 2.0, 0.0), epsilon = 1e-12);

        // wrong order: inner frames do not line up
        assert!(ab.compose(&bc).is_err());
    }

    #[test]
    fn inverse_roundtrip() {
        let a = Frame::new();
        let b = Frame::new();
        let tf = Transform3D::new(
            a,
            b,
            *Rotation3::from_axis_angle(&Vector3::z_axis(), 0.5).matrix(),
            Vector3::new(1.0, 2.0, 3.0),
        );
        let id = tf.compose(&tf.inv()).unwrap();
        assert_eq!(id.from, b);
        assert_eq!(id.to, b);
        assert_relative_eq!(id.rot, Mat3::identity(), epsilon = 1e-12);
        assert_relative_eq!(id.trans, Vector3::zeros(), epsilon = 1e-12);
    }

    #[test]
    fn point_roundtrip() {
        let a = Frame::new();
        let b = Frame::new();
        let tf = Transform3D::new(
            a,
            b,
            *Rotation3::from_axis_angle(&Vector3::y_axis(), 1.2).matrix(),
            Vector3::new(-0.3, 0.7, 2.0),
        );
        let p = Vector3::new(0.1, -0.4, 0.9);
        let back = tf.inv().transform_point(&tf.transform_point(&p));
        assert_relative_eq!(back, p, epsilon = 1e-12);
    }

    #[test]
    fn renormalize_restores_orthonormality() {
        let a = Frame::new();
        let b = Frame::new();
        let mut tf = Transform3D::from_axis_angle(a, b, &Vector3::x_axis(), 0.8);
        // inject drift
        tf.rot[(0, 0)] += 1e-4;
        tf.renormalize();
        let rrt = tf.rot * tf.rot.transpose();
        assert_relative_eq!(rrt, Mat3::identity(), epsilon = 1e-8);
    }
}
