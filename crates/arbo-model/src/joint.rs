//! Joint types and their kinematics.
//!
//! Each joint kind supplies its configuration/velocity sizes, the transform
//! and twist across the joint, motion and constraint-wrench subspaces, and
//! the maps between velocities and configuration derivatives for non-linear
//! parametrizations.

use crate::error::{ModelError, Result};
use arbo_math::{
    skew, Frame, GeometricJacobian, Mat3, SpatialAcceleration, Transform3D, Twist, Vec3,
    WrenchMatrix,
};
use nalgebra::{Quaternion, UnitQuaternion, UnitVector3};
use rand::Rng;
use std::f64::consts::PI;

/// Joint type descriptor. Dispatch is a single `match` per joint, not per
/// element.
#[derive(Debug, Clone, PartialEq)]
pub enum JointKind {
    /// Single rotational DOF about `axis`.
    Revolute { axis: UnitVector3<f64> },
    /// Single translational DOF along `axis`.
    Prismatic { axis: UnitVector3<f64> },
    /// Translation in the `x_axis`/`y_axis` plane plus rotation about its
    /// normal. q = (x, y, θ) in the before-frame; v = (ω, vx, vy) with the
    /// linear part in the after-frame basis, so q̇_xy = R₂(θ)·v_xy.
    Planar {
        x_axis: UnitVector3<f64>,
        y_axis: UnitVector3<f64>,
        axis: UnitVector3<f64>,
    },
    /// Rigid attachment, 0 DOF.
    Fixed,
    /// 6-DOF floating joint, q = [unit quaternion wxyz; position] (nq = 7).
    /// The canonical floating joint.
    QuaternionFloating,
    /// 6-DOF floating joint with a stereographic (modified Rodrigues)
    /// rotation parametrization, q = [s; position] (nq = 6).
    SpQuatFloating,
}

impl JointKind {
    pub fn revolute(axis: Vec3) -> Self {
        JointKind::Revolute {
            axis: UnitVector3::new_normalize(axis),
        }
    }

    pub fn prismatic(axis: Vec3) -> Self {
        JointKind::Prismatic {
            axis: UnitVector3::new_normalize(axis),
        }
    }

    /// Planar joint in the plane spanned by `x_axis` and `y_axis`;
    /// `y_axis` is re-orthogonalized against `x_axis`.
    pub fn planar(x_axis: Vec3, y_axis: Vec3) -> Self {
        let x = UnitVector3::new_normalize(x_axis);
        let y = UnitVector3::new_normalize(y_axis - x.into_inner() * y_axis.dot(&x));
        let axis = UnitVector3::new_normalize(x.cross(&y));
        JointKind::Planar {
            x_axis: x,
            y_axis: y,
            axis,
        }
    }

    /// Configuration dimension.
    pub fn nq(&self) -> usize {
        match self {
            JointKind::Revolute { .. } | JointKind::Prismatic { .. } => 1,
            JointKind::Planar { .. } => 3,
            JointKind::Fixed => 0,
            JointKind::QuaternionFloating => 7,
            JointKind::SpQuatFloating => 6,
        }
    }

    /// Velocity dimension.
    pub fn nv(&self) -> usize {
        match self {
            JointKind::Revolute { .. } | JointKind::Prismatic { .. } => 1,
            JointKind::Planar { .. } => 3,
            JointKind::Fixed => 0,
            JointKind::QuaternionFloating | JointKind::SpQuatFloating => 6,
        }
    }

    /// Constraint-wrench dimension, `6 - nv`.
    pub fn nconstraint(&self) -> usize {
        6 - self.nv()
    }
}

/// A joint instance: a kind plus its two attachment frames. `frame_before`
/// is fixed on the predecessor body, `frame_after` on the successor.
#[derive(Debug, Clone)]
pub struct Joint {
    pub name: String,
    pub kind: JointKind,
    pub frame_before: Frame,
    pub frame_after: Frame,
}

/// Two unit vectors completing `axis` to a right-handed orthonormal basis.
fn orthogonal_complement(axis: &UnitVector3<f64>) -> (Vec3, Vec3) {
    let a = axis.into_inner();
    let seed = if a.x.abs() < 0.9 { Vec3::x() } else { Vec3::y() };
    let u = a.cross(&seed).normalize();
    let v = a.cross(&u);
    (u, v)
}

/// Uniform random unit quaternion (Shoemake's subgroup algorithm).
fn rand_unit_quaternion<R: Rng + ?Sized>(rng: &mut R) -> UnitQuaternion<f64> {
    let u1: f64 = rng.gen_range(0.0..1.0);
    let u2: f64 = rng.gen_range(0.0..2.0 * PI);
    let u3: f64 = rng.gen_range(0.0..2.0 * PI);
    let a = (1.0 - u1).sqrt();
    let b = u1.sqrt();
    UnitQuaternion::new_unchecked(Quaternion::new(
        a * u2.sin(),
        a * u2.cos(),
        b * u3.sin(),
        b * u3.cos(),
    ))
}

/// Unit quaternion from stereographic (MRP) parameters.
fn spquat_to_quaternion(s: &Vec3) -> UnitQuaternion<f64> {
    let n = s.norm_squared();
    let scale = 1.0 / (1.0 + n);
    UnitQuaternion::new_unchecked(Quaternion::new(
        (1.0 - n) * scale,
        2.0 * s.x * scale,
        2.0 * s.y * scale,
        2.0 * s.z * scale,
    ))
}

impl Joint {
    /// Create a joint with fresh attachment frames.
    pub fn new(name: &str, kind: JointKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            frame_before: Frame::new(),
            frame_after: Frame::new(),
        }
    }

    pub fn nq(&self) -> usize {
        self.kind.nq()
    }

    pub fn nv(&self) -> usize {
        self.kind.nv()
    }

    pub fn nconstraint(&self) -> usize {
        self.kind.nconstraint()
    }

    /// Transform across the joint at configuration `q`:
    /// `Transform3D(frame_after → frame_before)`.
    ///
    /// Floating configurations are assumed normalized (see
    /// [`Joint::normalize_configuration`]); no silent renormalization
    /// happens here.
    pub fn joint_transform(&self, q: &[f64]) -> Transform3D {
        debug_assert_eq!(q.len(), self.nq());
        let (from, to) = (self.frame_after, self.frame_before);
        match &self.kind {
            JointKind::Revolute { axis } => Transform3D::from_axis_angle(from, to, axis, q[0]),
            JointKind::Prismatic { axis } => {
                Transform3D::from_translation(from, to, axis.into_inner() * q[0])
            }
            JointKind::Planar {
                x_axis,
                y_axis,
                axis,
            } => {
                let mut tf = Transform3D::from_axis_angle(from, to, axis, q[2]);
                tf.trans = x_axis.into_inner() * q[0] + y_axis.into_inner() * q[1];
                tf
            }
            JointKind::Fixed => Transform3D::identity(from, to),
            JointKind::QuaternionFloating => {
                let rot = UnitQuaternion::new_unchecked(Quaternion::new(q[0], q[1], q[2], q[3]));
                Transform3D::new(
                    from,
                    to,
                    *rot.to_rotation_matrix().matrix(),
                    Vec3::new(q[4], q[5], q[6]),
                )
            }
            JointKind::SpQuatFloating => {
                let rot = spquat_to_quaternion(&Vec3::new(q[0], q[1], q[2]));
                Transform3D::new(
                    from,
                    to,
                    *rot.to_rotation_matrix().matrix(),
                    Vec3::new(q[3], q[4], q[5]),
                )
            }
        }
    }

    /// Twist of `frame_after` with respect to `frame_before`, expressed in
    /// `frame_after`.
    pub fn joint_twist(&self, q: &[f64], v: &[f64]) -> Twist {
        debug_assert_eq!(q.len(), self.nq());
        debug_assert_eq!(v.len(), self.nv());
        let (body, base, frame) = (self.frame_after, self.frame_before, self.frame_after);
        match &self.kind {
            JointKind::Revolute { axis } => {
                Twist::new(body, base, frame, axis.into_inner() * v[0], Vec3::zeros())
            }
            JointKind::Prismatic { axis } => {
                Twist::new(body, base, frame, Vec3::zeros(), axis.into_inner() * v[0])
            }
            JointKind::Planar {
                x_axis,
                y_axis,
                axis,
            } => Twist::new(
                body,
                base,
                frame,
                axis.into_inner() * v[0],
                x_axis.into_inner() * v[1] + y_axis.into_inner() * v[2],
            ),
            JointKind::Fixed => Twist::zero(body, base, frame),
            JointKind::QuaternionFloating | JointKind::SpQuatFloating => Twist::new(
                body,
                base,
                frame,
                Vec3::new(v[0], v[1], v[2]),
                Vec3::new(v[3], v[4], v[5]),
            ),
        }
    }

    /// The part of the joint's spatial acceleration independent of v̇.
    ///
    /// Zero for every implemented kind: the motion subspaces are constant in
    /// `frame_after`, so the apparent derivative `Ṡ·v` vanishes.
    pub fn bias_acceleration(&self, q: &[f64], v: &[f64]) -> SpatialAcceleration {
        debug_assert_eq!(q.len(), self.nq());
        debug_assert_eq!(v.len(), self.nv());
        SpatialAcceleration::zero(self.frame_after, self.frame_before, self.frame_after)
    }

    /// Fill `out` (6 × nv, expressed in `frame_after`) with the motion
    /// subspace: columns are twists per unit joint velocity.
    pub fn fill_motion_subspace(&self, q: &[f64], out: &mut GeometricJacobian) {
        debug_assert_eq!(q.len(), self.nq());
        assert_eq!(out.ncols(), self.nv(), "motion subspace width");
        out.body = self.frame_after;
        out.base = self.frame_before;
        out.frame = self.frame_after;
        match &self.kind {
            JointKind::Revolute { axis } => {
                out.set_col(0, &axis.into_inner(), &Vec3::zeros());
            }
            JointKind::Prismatic { axis } => {
                out.set_col(0, &Vec3::zeros(), &axis.into_inner());
            }
            JointKind::Planar {
                x_axis,
                y_axis,
                axis,
            } => {
                out.set_col(0, &axis.into_inner(), &Vec3::zeros());
                out.set_col(1, &Vec3::zeros(), &x_axis.into_inner());
                out.set_col(2, &Vec3::zeros(), &y_axis.into_inner());
            }
            JointKind::Fixed => {}
            JointKind::QuaternionFloating | JointKind::SpQuatFloating => {
                for i in 0..3 {
                    let mut e = Vec3::zeros();
                    e[i] = 1.0;
                    out.set_col(i, &e, &Vec3::zeros());
                    out.set_col(i + 3, &Vec3::zeros(), &e);
                }
            }
        }
    }

    /// Allocating variant of [`Joint::fill_motion_subspace`].
    pub fn motion_subspace(&self, q: &[f64]) -> GeometricJacobian {
        let mut out =
            GeometricJacobian::zeros(self.frame_after, self.frame_before, self.frame_after, self.nv());
        self.fill_motion_subspace(q, &mut out);
        out
    }

    /// Fill `out` (6 × nconstraint, expressed in `frame_after`) with a basis
    /// of the wrenches the joint can transmit; dual-complementary to the
    /// motion subspace under the power pairing. `q` is unused by the
    /// implemented kinds but kept in the signature for parametrized bases.
    pub fn fill_constraint_wrench_subspace(&self, q: &[f64], out: &mut WrenchMatrix) {
        let _ = q;
        assert_eq!(out.ncols(), self.nconstraint(), "constraint subspace width");
        out.frame = self.frame_after;
        match &self.kind {
            JointKind::Revolute { axis } => {
                let (u, w) = orthogonal_complement(axis);
                out.set_col(0, &u, &Vec3::zeros());
                out.set_col(1, &w, &Vec3::zeros());
                for i in 0..3 {
                    let mut e = Vec3::zeros();
                    e[i] = 1.0;
                    out.set_col(2 + i, &Vec3::zeros(), &e);
                }
            }
            JointKind::Prismatic { axis } => {
                for i in 0..3 {
                    let mut e = Vec3::zeros();
                    e[i] = 1.0;
                    out.set_col(i, &e, &Vec3::zeros());
                }
                let (u, w) = orthogonal_complement(axis);
                out.set_col(3, &Vec3::zeros(), &u);
                out.set_col(4, &Vec3::zeros(), &w);
            }
            JointKind::Planar {
                x_axis,
                y_axis,
                axis,
            } => {
                out.set_col(0, &x_axis.into_inner(), &Vec3::zeros());
                out.set_col(1, &y_axis.into_inner(), &Vec3::zeros());
                out.set_col(2, &Vec3::zeros(), &axis.into_inner());
            }
            JointKind::Fixed => {
                for i in 0..3 {
                    let mut e = Vec3::zeros();
                    e[i] = 1.0;
                    out.set_col(i, &e, &Vec3::zeros());
                    out.set_col(i + 3, &Vec3::zeros(), &e);
                }
            }
            JointKind::QuaternionFloating | JointKind::SpQuatFloating => {}
        }
    }

    /// Allocating variant of [`Joint::fill_constraint_wrench_subspace`].
    pub fn constraint_wrench_subspace(&self, q: &[f64]) -> WrenchMatrix {
        let mut out = WrenchMatrix::zeros(self.frame_after, self.nconstraint());
        self.fill_constraint_wrench_subspace(q, &mut out);
        out
    }

    /// Write the zero (identity) configuration into `q`.
    pub fn zero_configuration(&self, q: &mut [f64]) {
        debug_assert_eq!(q.len(), self.nq());
        q.fill(0.0);
        if let JointKind::QuaternionFloating = self.kind {
            q[0] = 1.0;
        }
    }

    /// Write a uniformly sampled configuration into `q`: joint angles and
    /// displacements in [-π, π) / [-1, 1), rotations uniform on SO(3).
    pub fn rand_configuration<R: Rng + ?Sized>(&self, q: &mut [f64], rng: &mut R) {
        debug_assert_eq!(q.len(), self.nq());
        match &self.kind {
            JointKind::Revolute { .. } => q[0] = rng.gen_range(-PI..PI),
            JointKind::Prismatic { .. } => q[0] = rng.gen_range(-1.0..1.0),
            JointKind::Planar { .. } => {
                q[0] = rng.gen_range(-1.0..1.0);
                q[1] = rng.gen_range(-1.0..1.0);
                q[2] = rng.gen_range(-PI..PI);
            }
            JointKind::Fixed => {}
            JointKind::QuaternionFloating => {
                let rot = rand_unit_quaternion(rng);
                q[0] = rot.w;
                q[1] = rot.i;
                q[2] = rot.j;
                q[3] = rot.k;
                for qi in q.iter_mut().skip(4) {
                    *qi = rng.gen_range(-1.0..1.0);
                }
            }
            JointKind::SpQuatFloating => {
                let mut rot = rand_unit_quaternion(rng).into_inner();
                if rot.w < 0.0 {
                    rot = -rot;
                }
                let s = rot.imag() / (1.0 + rot.w);
                q[0] = s.x;
                q[1] = s.y;
                q[2] = s.z;
                for qi in q.iter_mut().skip(3) {
                    *qi = rng.gen_range(-1.0..1.0);
                }
            }
        }
    }

    /// Project `q` back onto the configuration manifold, in place.
    ///
    /// Quaternions are rescaled to unit norm; stereographic parameters with
    /// norm above one are mapped to the equivalent shadow set. Fails with
    /// `ConfigurationOutOfRange` when the result would not be finite.
    pub fn normalize_configuration(&self, q: &mut [f64]) -> Result<()> {
        debug_assert_eq!(q.len(), self.nq());
        match &self.kind {
            JointKind::QuaternionFloating => {
                let norm =
                    (q[0] * q[0] + q[1] * q[1] + q[2] * q[2] + q[3] * q[3]).sqrt();
                if !norm.is_finite() || norm < 1e-10 {
                    return Err(ModelError::ConfigurationOutOfRange(format!(
                        "quaternion of joint `{}` has norm {norm}",
                        self.name
                    )));
                }
                for qi in q.iter_mut().take(4) {
                    *qi /= norm;
                }
            }
            JointKind::SpQuatFloating => {
                let n = q[0] * q[0] + q[1] * q[1] + q[2] * q[2];
                if !n.is_finite() {
                    return Err(ModelError::ConfigurationOutOfRange(format!(
                        "stereographic parameters of joint `{}` are not finite",
                        self.name
                    )));
                }
                if n > 1.0 {
                    for qi in q.iter_mut().take(3) {
                        *qi = -*qi / n;
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Map a velocity segment to the configuration derivative, `q̇ = f(q, v)`.
    pub fn velocity_to_configuration_derivative(&self, q: &[f64], v: &[f64], qd: &mut [f64]) {
        debug_assert_eq!(q.len(), self.nq());
        debug_assert_eq!(v.len(), self.nv());
        debug_assert_eq!(qd.len(), self.nq());
        match &self.kind {
            JointKind::Revolute { .. } | JointKind::Prismatic { .. } => qd[0] = v[0],
            JointKind::Planar { .. } => {
                let (s, c) = q[2].sin_cos();
                qd[0] = c * v[1] - s * v[2];
                qd[1] = s * v[1] + c * v[2];
                qd[2] = v[0];
            }
            JointKind::Fixed => {}
            JointKind::QuaternionFloating => {
                // quaternion kinematic equation, body-fixed angular velocity
                let quat = Quaternion::new(q[0], q[1], q[2], q[3]);
                let omega = Quaternion::new(0.0, v[0], v[1], v[2]);
                let qdot = quat * omega * 0.5;
                qd[0] = qdot.w;
                qd[1] = qdot.i;
                qd[2] = qdot.j;
                qd[3] = qdot.k;
                let rot = UnitQuaternion::new_unchecked(quat);
                let pdot = rot * Vec3::new(v[3], v[4], v[5]);
                qd[4] = pdot.x;
                qd[5] = pdot.y;
                qd[6] = pdot.z;
            }
            JointKind::SpQuatFloating => {
                // MRP kinematics: ṡ = ¼ [(1-|s|²)·E + 2[s]ₓ + 2ssᵀ] ω
                let s = Vec3::new(q[0], q[1], q[2]);
                let n = s.norm_squared();
                let b = (Mat3::identity() * (1.0 - n) + skew(&s) * 2.0 + s * s.transpose() * 2.0)
                    * 0.25;
                let sdot = b * Vec3::new(v[0], v[1], v[2]);
                qd[0] = sdot.x;
                qd[1] = sdot.y;
                qd[2] = sdot.z;
                let rot = spquat_to_quaternion(&s);
                let pdot = rot * Vec3::new(v[3], v[4], v[5]);
                qd[3] = pdot.x;
                qd[4] = pdot.y;
                qd[5] = pdot.z;
            }
        }
    }

    /// Inverse of [`Joint::velocity_to_configuration_derivative`].
    pub fn configuration_derivative_to_velocity(&self, q: &[f64], qd: &[f64], v: &mut [f64]) {
        debug_assert_eq!(q.len(), self.nq());
        debug_assert_eq!(qd.len(), self.nq());
        debug_assert_eq!(v.len(), self.nv());
        match &self.kind {
            JointKind::Revolute { .. } | JointKind::Prismatic { .. } => v[0] = qd[0],
            JointKind::Planar { .. } => {
                let (s, c) = q[2].sin_cos();
                v[0] = qd[2];
                v[1] = c * qd[0] + s * qd[1];
                v[2] = -s * qd[0] + c * qd[1];
            }
            JointKind::Fixed => {}
            JointKind::QuaternionFloating => {
                let quat = Quaternion::new(q[0], q[1], q[2], q[3]);
                let qdot = Quaternion::new(qd[0], qd[1], qd[2], qd[3]);
                let omega = quat.conjugate() * qdot * 2.0;
                v[0] = omega.i;
                v[1] = omega.j;
                v[2] = omega.k;
                let rot = UnitQuaternion::new_unchecked(quat);
                let vel = rot.inverse() * Vec3::new(qd[4], qd[5], qd[6]);
                v[3] = vel.x;
                v[4] = vel.y;
                v[5] = vel.z;
            }
            JointKind::SpQuatFloating => {
                let s = Vec3::new(q[0], q[1], q[2]);
                let n = s.norm_squared();
                let b_inv = (Mat3::identity() * (1.0 - n) - skew(&s) * 2.0
                    + s * s.transpose() * 2.0)
                    * (4.0 / ((1.0 + n) * (1.0 + n)));
                let omega = b_inv * Vec3::new(qd[0], qd[1], qd[2]);
                v[0] = omega.x;
                v[1] = omega.y;
                v[2] = omega.z;
                let rot = spquat_to_quaternion(&s);
                let vel = rot.inverse() * Vec3::new(qd[3], qd[4], qd[5]);
                v[3] = vel.x;
                v[4] = vel.y;
                v[5] = vel.z;
            }
        }
    }
}
