//! Frame-tagged spatial algebra for rigid-body dynamics.
//!
//! Implements 6D twists, wrenches, spatial inertia, and Plücker-style
//! transforms following Featherstone's conventions, with every quantity
//! annotated by the coordinate frame(s) it is expressed in.
//!
//! Convention: spatial vectors are `[angular; linear]` (Featherstone order).

pub mod error;
pub mod frame;
pub mod inertia;
pub mod jacobian;
pub mod spatial;
pub mod transform;

pub use error::SpatialError;
pub use frame::Frame;
pub use inertia::SpatialInertia;
pub use jacobian::{GeometricJacobian, MomentumMatrix, WrenchMatrix};
pub use spatial::{Momentum, SpatialAcceleration, Twist, Wrench};
pub use transform::Transform3D;

/// 3D vector alias.
pub type Vec3 = nalgebra::Vector3<f64>;
/// 3x3 matrix alias.
pub type Mat3 = nalgebra::Matrix3<f64>;
/// 6D vector alias.
pub type Vec6 = nalgebra::Vector6<f64>;
/// 6x6 matrix alias.
pub type Mat6 = nalgebra::Matrix6<f64>;
/// 3xN matrix alias (Jacobian halves).
pub type Mat3xX = nalgebra::Matrix3xX<f64>;
/// Dynamic vector.
pub type DVec = nalgebra::DVector<f64>;
/// Dynamic matrix.
pub type DMat = nalgebra::DMatrix<f64>;

/// Cross-product matrix: `[v]x` such that `[v]x w = v x w`.
#[inline]
pub fn skew(v: &Vec3) -> Mat3 {
    Mat3::new(0.0, -v.z, v.y, v.z, 0.0, -v.x, -v.y, v.x, 0.0)
}

/// Standard gravity (m/s^2).
pub const GRAVITY: f64 = 9.81;
