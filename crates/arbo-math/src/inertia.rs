//! Spatial inertia of rigid bodies.

use crate::error::{check_frame, Result};
use crate::{skew, Frame, Mat3, Mat6, Momentum, SpatialAcceleration, Transform3D, Twist, Vec3, Wrench};

/// Spatial inertia of a rigid body, expressed in `frame`.
///
/// Stored as the rotational moment about the frame origin, the first mass
/// moment `cross_part = mass * com`, and the mass. As a 6x6 operator (see
/// [`SpatialInertia::to_matrix`]) it is symmetric positive definite modulo
/// the skew cross-product block, and maps twists to momenta.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialInertia {
    pub frame: Frame,
    /// Rotational inertia about the frame origin.
    pub moment: Mat3,
    /// First mass moment, `mass * com`.
    pub cross_part: Vec3,
    pub mass: f64,
}

impl SpatialInertia {
    pub fn new(frame: Frame, moment: Mat3, cross_part: Vec3, mass: f64) -> Self {
        Self {
            frame,
            moment,
            cross_part,
            mass,
        }
    }

    /// Inertia of nothing; the additive identity for composite bodies.
    pub fn zero(frame: Frame) -> Self {
        Self {
            frame,
            moment: Mat3::zeros(),
            cross_part: Vec3::zeros(),
            mass: 0.0,
        }
    }

    /// Build from center-of-mass properties via the parallel-axis theorem.
    pub fn from_com(frame: Frame, mass: f64, com: Vec3, moment_about_com: Mat3) -> Self {
        let c = skew(&com);
        Self {
            frame,
            moment: moment_about_com + (c * c.transpose()) * mass,
            cross_part: com * mass,
            mass,
        }
    }

    /// Point mass at `pos`.
    pub fn point_mass(frame: Frame, mass: f64, pos: Vec3) -> Self {
        Self::from_com(frame, mass, pos, Mat3::zeros())
    }

    /// Uniform solid sphere centered at the frame origin.
    pub fn solid_sphere(frame: Frame, mass: f64, radius: f64) -> Self {
        let i = 2.0 / 5.0 * mass * radius * radius;
        Self::from_com(frame, mass, Vec3::zeros(), Mat3::from_diagonal_element(i))
    }

    /// Center of mass in this inertia's frame.
    pub fn center_of_mass(&self) -> Vec3 {
        if self.mass.abs() > 1e-12 {
            self.cross_part / self.mass
        } else {
            Vec3::zeros()
        }
    }

    /// Checked sum of two inertias expressed in the same frame (composite
    /// rigid body accumulation).
    pub fn add(&self, rhs: &SpatialInertia) -> Result<SpatialInertia> {
        check_frame("SpatialInertia::add", self.frame, rhs.frame)?;
        Ok(SpatialInertia {
            frame: self.frame,
            moment: self.moment + rhs.moment,
            cross_part: self.cross_part + rhs.cross_part,
            mass: self.mass + rhs.mass,
        })
    }

    /// Momentum of a body with this inertia moving with the given twist.
    pub fn mul_twist(&self, tw: &Twist) -> Result<Momentum> {
        check_frame("SpatialInertia::mul_twist", self.frame, tw.frame)?;
        Ok(Momentum {
            frame: self.frame,
            angular: self.moment * tw.angular + self.cross_part.cross(&tw.linear),
            linear: tw.linear * self.mass - self.cross_part.cross(&tw.angular),
        })
    }

    /// Newton–Euler wrench `I · a` for a body accelerating at `a`.
    pub fn mul_acceleration(&self, accel: &SpatialAcceleration) -> Result<Wrench> {
        check_frame("SpatialInertia::mul_acceleration", self.frame, accel.frame)?;
        Ok(Wrench {
            frame: self.frame,
            angular: self.moment * accel.angular + self.cross_part.cross(&accel.linear),
            linear: accel.linear * self.mass - self.cross_part.cross(&accel.angular),
        })
    }

    /// Kinetic energy `½ ⟨I·twist, twist⟩`.
    pub fn kinetic_energy(&self, tw: &Twist) -> Result<f64> {
        let h = self.mul_twist(tw)?;
        Ok(0.5 * h.dot(tw)?)
    }

    /// Express this inertia in the `to` frame of `tf`, preserving physical
    /// meaning exactly.
    pub fn transform(&self, tf: &Transform3D) -> Result<SpatialInertia> {
        check_frame("SpatialInertia::transform", tf.from, self.frame)?;
        let r = tf.rot;
        let t = skew(&tf.trans);
        let rc = skew(&(r * self.cross_part));
        Ok(SpatialInertia {
            frame: tf.to,
            moment: r * self.moment * r.transpose() - t * rc - rc * t - (t * t) * self.mass,
            cross_part: r * self.cross_part + tf.trans * self.mass,
            mass: self.mass,
        })
    }

    /// Full 6x6 spatial inertia matrix, `[angular; linear]` ordering:
    ///
    /// ```text
    /// | J       [c̄]x |
    /// | [c̄]xᵀ   m·E  |
    /// ```
    pub fn to_matrix(&self) -> Mat6 {
        let c = skew(&self.cross_part);
        let mut m = Mat6::zeros();
        m.fixed_view_mut::<3, 3>(0, 0).copy_from(&self.moment);
        m.fixed_view_mut::<3, 3>(0, 3).copy_from(&c);
        m.fixed_view_mut::<3, 3>(3, 0).copy_from(&c.transpose());
        m.fixed_view_mut::<3, 3>(3, 3)
            .copy_from(&(Mat3::identity() * self.mass));
        m
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Rotation3, Vector3};

    #[test]
    fn point_mass_momentum() {
        let f = Frame::new();
        let body = Frame::new();
        let base = Frame::new();
        let inertia = SpatialInertia::point_mass(f, 2.0, Vector3::new(0.0, 1.0, 0.0));
        // pure translation along x
        let tw = Twist::new(body, base, f, Vector3::zeros(), Vector3::new(3.0, 0.0, 0.0));
        let h = inertia.mul_twist(&tw).unwrap();
        assert_relative_eq!(h.linear, Vector3::new(6.0, 0.0, 0.0), epsilon = 1e-12);
        // angular momentum about origin: c × p = (0,1,0) × (6,0,0) = (0,0,-6)
        assert_relative_eq!(h.angular, Vector3::new(0.0, 0.0, -6.0), epsilon = 1e-12);
    }

    #[test]
    fn parallel_axis_matches_direct() {
        // rod of mass m, length l along y with com at l/2: moment about the
        // end must be m l²/3 about x and z.
        let f = Frame::new();
        let m = 1.0;
        let l = 1.0;
        let inertia = SpatialInertia::from_com(
            f,
            m,
            Vector3::new(0.0, l / 2.0, 0.0),
            Mat3::from_diagonal(&Vector3::new(m * l * l / 12.0, 0.0, m * l * l / 12.0)),
        );
        assert_relative_eq!(inertia.moment[(0, 0)], m * l * l / 3.0, epsilon = 1e-12);
        assert_relative_eq!(inertia.moment[(2, 2)], m * l * l / 3.0, epsilon = 1e-12);
        assert_relative_eq!(inertia.moment[(1, 1)], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn transform_roundtrip() {
        let fa = Frame::new();
        let fb = Frame::new();
        let tf = Transform3D::new(
            fa,
            fb,
            *Rotation3::from_axis_angle(&Vector3::z_axis(), 0.9).matrix(),
            Vector3::new(0.2, -0.5, 1.1),
        );
        let inertia = SpatialInertia::from_com(
            fa,
            3.0,
            Vector3::new(0.1, 0.2, -0.3),
            Mat3::from_diagonal(&Vector3::new(0.4, 0.5, 0.6)),
        );
        let back = inertia
            .transform(&tf)
            .unwrap()
            .transform(&tf.inv())
            .unwrap();
        assert_relative_eq!(back.moment, inertia.moment, epsilon = 1e-10);
        assert_relative_eq!(back.cross_part, inertia.cross_part, epsilon = 1e-10);
        assert_relative_eq!(back.mass, inertia.mass, epsilon = 1e-12);
    }

    #[test]
    fn kinetic_energy_is_frame_invariant() {
        let fa = Frame::new();
        let fb = Frame::new();
        let body = Frame::new();
        let base = Frame::new();
        let tf = Transform3D::new(
            fa,
            fb,
            *Rotation3::from_axis_angle(&Vector3::x_axis(), -0.4).matrix(),
            Vector3::new(1.0, 0.3, -0.2),
        );
        let inertia = SpatialInertia::from_com(
            fa,
            2.5,
            Vector3::new(-0.1, 0.4, 0.2),
            Mat3::from_diagonal(&Vector3::new(0.2, 0.3, 0.25)),
        );
        let tw = Twist::new(
            body,
            base,
            fa,
            Vector3::new(0.5, -0.2, 0.8),
            Vector3::new(0.1, 1.2, -0.4),
        );
        let ke_a = inertia.kinetic_energy(&tw).unwrap();
        let ke_b = inertia
            .transform(&tf)
            .unwrap()
            .kinetic_energy(&tw.transform(&tf).unwrap())
            .unwrap();
        assert_relative_eq!(ke_a, ke_b, epsilon = 1e-10);
    }

    #[test]
    fn matrix_form_matches_mul_twist() {
        let f = Frame::new();
        let body = Frame::new();
        let base = Frame::new();
        let inertia = SpatialInertia::from_com(
            f,
            1.7,
            Vector3::new(0.3, -0.2, 0.5),
            Mat3::from_diagonal(&Vector3::new(0.11, 0.22, 0.33)),
        );
        let tw = Twist::new(
            body,
            base,
            f,
            Vector3::new(-0.6, 0.1, 0.9),
            Vector3::new(0.4, 0.4, -1.0),
        );
        let h = inertia.mul_twist(&tw).unwrap();

        let m = inertia.to_matrix();
        let v6 = nalgebra::Vector6::new(
            tw.angular.x,
            tw.angular.y,
            tw.angular.z,
            tw.linear.x,
            tw.linear.y,
            tw.linear.z,
        );
        let h6 = m * v6;
        assert_relative_eq!(h.angular, Vector3::new(h6[0], h6[1], h6[2]), epsilon = 1e-12);
        assert_relative_eq!(h.linear, Vector3::new(h6[3], h6[4], h6[5]), epsilon = 1e-12);
    }
}
