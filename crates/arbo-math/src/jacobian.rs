//! Geometric Jacobians and their wrench-side duals.

use crate::error::{check_frame, Result};
use crate::{
    DMat, Frame, Mat3xX, SpatialAcceleration, SpatialInertia, Transform3D, Twist, Vec3, Wrench,
};

/// A geometric Jacobian maps joint velocities to a twist of `body` with
/// respect to `base`, expressed in `frame`. Columns are twists per unit
/// joint velocity, stored as separate angular and linear 3xN halves.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometricJacobian {
    pub body: Frame,
    pub base: Frame,
    pub frame: Frame,
    pub angular: Mat3xX,
    pub linear: Mat3xX,
}

impl GeometricJacobian {
    pub fn zeros(body: Frame, base: Frame, frame: Frame, ncols: usize) -> Self {
        Self {
            body,
            base,
            frame,
            angular: Mat3xX::zeros(ncols),
            linear: Mat3xX::zeros(ncols),
        }
    }

    #[inline]
    pub fn ncols(&self) -> usize {
        self.angular.ncols()
    }

    #[inline]
    pub fn set_col(&mut self, col: usize, angular: &Vec3, linear: &Vec3) {
        self.angular.set_column(col, angular);
        self.linear.set_column(col, linear);
    }

    /// Zero every column.
    pub fn fill_zero(&mut self) {
        self.angular.fill(0.0);
        self.linear.fill(0.0);
    }

    /// Re-express every column in the `to` frame of `tf`, in place.
    pub fn apply_transform(&mut self, tf: &Transform3D) -> Result<()> {
        check_frame("GeometricJacobian::apply_transform", tf.from, self.frame)?;
        for col in 0..self.ncols() {
            let ang: Vec3 = tf.rot * self.angular.column(col);
            let lin: Vec3 = tf.rot * self.linear.column(col) + tf.trans.cross(&ang);
            self.angular.set_column(col, &ang);
            self.linear.set_column(col, &lin);
        }
        self.frame = tf.to;
        Ok(())
    }

    /// Allocating variant of [`GeometricJacobian::apply_transform`].
    pub fn transform(&self, tf: &Transform3D) -> Result<GeometricJacobian> {
        let mut out = self.clone();
        out.apply_transform(tf)?;
        Ok(out)
    }

    /// The twist contributed by unit velocity on one column.
    pub fn column_twist(&self, col: usize) -> Twist {
        Twist {
            body: self.body,
            base: self.base,
            frame: self.frame,
            angular: self.angular.column(col).into_owned(),
            linear: self.linear.column(col).into_owned(),
        }
    }

    /// Twist produced by the joint-velocity segment `v`.
    pub fn mul_velocity(&self, v: &[f64]) -> Twist {
        assert_eq!(v.len(), self.ncols(), "joint velocity segment length");
        let mut angular = Vec3::zeros();
        let mut linear = Vec3::zeros();
        for (col, &vi) in v.iter().enumerate() {
            angular += self.angular.column(col) * vi;
            linear += self.linear.column(col) * vi;
        }
        Twist {
            body: self.body,
            base: self.base,
            frame: self.frame,
            angular,
            linear,
        }
    }

    /// Project a wrench onto the joint axes: `out_j = ⟨column_j, wrench⟩`.
    pub fn transpose_mul_wrench(&self, w: &Wrench, out: &mut [f64]) -> Result<()> {
        check_frame("GeometricJacobian::transpose_mul_wrench", self.frame, w.frame)?;
        assert_eq!(out.len(), self.ncols(), "torque segment length");
        for (col, o) in out.iter_mut().enumerate() {
            *o = self.angular.column(col).dot(&w.angular)
                + self.linear.column(col).dot(&w.linear);
        }
        Ok(())
    }
}

/// Inertia times Jacobian: columns are momenta per unit joint velocity.
/// Pairing a column against a Jacobian column ([`Momentum::dot`]) yields a
/// joint-space inertia entry.
#[derive(Debug, Clone, PartialEq)]
pub struct MomentumMatrix {
    pub frame: Frame,
    pub angular: Mat3xX,
    pub linear: Mat3xX,
}

impl MomentumMatrix {
    pub fn zeros(frame: Frame, ncols: usize) -> Self {
        Self {
            frame,
            angular: Mat3xX::zeros(ncols),
            linear: Mat3xX::zeros(ncols),
        }
    }

    #[inline]
    pub fn ncols(&self) -> usize {
        self.angular.ncols()
    }

    /// Overwrite columns `col0..col0 + jac.ncols()` with `inertia * jac`.
    pub fn fill_mul_at(
        &mut self,
        inertia: &SpatialInertia,
        jac: &GeometricJacobian,
        col0: usize,
    ) -> Result<()> {
        check_frame("MomentumMatrix::fill_mul_at", inertia.frame, jac.frame)?;
        check_frame("MomentumMatrix::fill_mul_at", self.frame, jac.frame)?;
        for col in 0..jac.ncols() {
            let w: Vec3 = jac.angular.column(col).into_owned();
            let v: Vec3 = jac.linear.column(col).into_owned();
            self.angular
                .set_column(col0 + col, &(inertia.moment * w + inertia.cross_part.cross(&v)));
            self.linear
                .set_column(col0 + col, &(v * inertia.mass - inertia.cross_part.cross(&w)));
        }
        Ok(())
    }

}

/// A basis of wrenches transmissible by a joint, expressed in `frame`;
/// the dual complement of the joint's motion subspace under the power
/// pairing. Used to assemble loop-constraint rows.
#[derive(Debug, Clone, PartialEq)]
pub struct WrenchMatrix {
    pub frame: Frame,
    pub angular: Mat3xX,
    pub linear: Mat3xX,
}

impl WrenchMatrix {
    pub fn zeros(frame: Frame, ncols: usize) -> Self {
        Self {
            frame,
            angular: Mat3xX::zeros(ncols),
            linear: Mat3xX::zeros(ncols),
        }
    }

    #[inline]
    pub fn ncols(&self) -> usize {
        self.angular.ncols()
    }

    #[inline]
    pub fn set_col(&mut self, col: usize, angular: &Vec3, linear: &Vec3) {
        self.angular.set_column(col, angular);
        self.linear.set_column(col, linear);
    }

    /// Re-express every wrench column in the `to` frame of `tf`, in place.
    pub fn apply_transform(&mut self, tf: &Transform3D) -> Result<()> {
        check_frame("WrenchMatrix::apply_transform", tf.from, self.frame)?;
        for col in 0..self.ncols() {
            let lin: Vec3 = tf.rot * self.linear.column(col);
            let ang: Vec3 = tf.rot * self.angular.column(col) + tf.trans.cross(&lin);
            self.angular.set_column(col, &ang);
            self.linear.set_column(col, &lin);
        }
        self.frame = tf.to;
        Ok(())
    }

    /// Pair every wrench column against every Jacobian column, scaled by
    /// `scale`, and write the block into `out` at `(row0, col0)`.
    pub fn pair_into(
        &self,
        jac: &GeometricJacobian,
        out: &mut DMat,
        row0: usize,
        col0: usize,
        scale: f64,
    ) -> Result<()> {
        check_frame("WrenchMatrix::pair_into", self.frame, jac.frame)?;
        for i in 0..self.ncols() {
            for j in 0..jac.ncols() {
                out[(row0 + i, col0 + j)] = scale
                    * (self.angular.column(i).dot(&jac.angular.column(j))
                        + self.linear.column(i).dot(&jac.linear.column(j)));
            }
        }
        Ok(())
    }

    /// Pair every wrench column against a spatial acceleration.
    pub fn pair_accel(&self, accel: &SpatialAcceleration, out: &mut [f64]) -> Result<()> {
        check_frame("WrenchMatrix::pair_accel", self.frame, accel.frame)?;
        assert_eq!(out.len(), self.ncols(), "constraint row count");
        for (col, o) in out.iter_mut().enumerate() {
            *o = self.angular.column(col).dot(&accel.angular)
                + self.linear.column(col).dot(&accel.linear);
        }
        Ok(())
    }

    /// Pair every wrench column against a twist (velocity-level residual).
    pub fn pair_twist(&self, tw: &Twist, out: &mut [f64]) -> Result<()> {
        check_frame("WrenchMatrix::pair_twist", self.frame, tw.frame)?;
        assert_eq!(out.len(), self.ncols(), "constraint row count");
        for (col, o) in out.iter_mut().enumerate() {
            *o = self.angular.column(col).dot(&tw.angular)
                + self.linear.column(col).dot(&tw.linear);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Rotation3, Vector3};

    #[test]
    fn jacobian_transform_matches_column_twists() {
        let body = Frame::new();
        let base = Frame::new();
        let fa = Frame::new();
        let fb = Frame::new();
        let tf = Transform3D::new(
            fa,
            fb,
            *Rotation3::from_axis_angle(&Vector3::z_axis(), 0.6).matrix(),
            Vector3::new(0.3, -0.8, 0.1),
        );

        let mut jac = GeometricJacobian::zeros(body, base, fa, 2);
        jac.set_col(0, &Vector3::new(0.0, 0.0, 1.0), &Vector3::new(0.1, 0.0, 0.0));
        jac.set_col(1, &Vector3::new(1.0, 0.0, 0.0), &Vector3::new(0.0, -0.2, 0.4));

        let jac_b = jac.transform(&tf).unwrap();
        for col in 0..2 {
            let tw = Twist::new(
                body,
                base,
                fa,
                jac.angular.column(col).into_owned(),
                jac.linear.column(col).into_owned(),
            );
            let tw_b = tw.transform(&tf).unwrap();
            assert_relative_eq!(jac_b.angular.column(col).into_owned(), tw_b.angular, epsilon = 1e-12);
            assert_relative_eq!(jac_b.linear.column(col).into_owned(), tw_b.linear, epsilon = 1e-12);
        }
    }

    #[test]
    fn momentum_matrix_columns_match_inertia_products() {
        let body = Frame::new();
        let base = Frame::new();
        let f = Frame::new();
        let inertia = SpatialInertia::from_com(
            f,
            2.0,
            Vector3::new(0.1, -0.2, 0.3),
            crate::Mat3::from_diagonal(&Vector3::new(0.3, 0.4, 0.5)),
        );
        let mut jac = GeometricJacobian::zeros(body, base, f, 3);
        jac.set_col(0, &Vector3::new(0.0, 0.0, 1.0), &Vector3::zeros());
        jac.set_col(1, &Vector3::new(0.0, 1.0, 0.0), &Vector3::new(0.5, 0.0, 0.0));
        jac.set_col(2, &Vector3::zeros(), &Vector3::new(0.0, 1.0, 0.0));

        let mut mm = MomentumMatrix::zeros(f, 3);
        mm.fill_mul_at(&inertia, &jac, 0).unwrap();

        for col in 0..3 {
            let h = inertia.mul_twist(&jac.column_twist(col)).unwrap();
            assert_relative_eq!(mm.angular.column(col).into_owned(), h.angular, epsilon = 1e-12);
            assert_relative_eq!(mm.linear.column(col).into_owned(), h.linear, epsilon = 1e-12);
        }
    }

    #[test]
    fn wrench_matrix_pairing_invariant_under_common_transform() {
        let body = Frame::new();
        let base = Frame::new();
        let fa = Frame::new();
        let fb = Frame::new();
        let tf = Transform3D::new(
            fa,
            fb,
            *Rotation3::from_axis_angle(&Vector3::x_axis(), 1.1).matrix(),
            Vector3::new(-0.4, 0.2, 0.9),
        );

        let mut t = WrenchMatrix::zeros(fa, 2);
        t.set_col(0, &Vector3::new(1.0, 0.0, 0.0), &Vector3::zeros());
        t.set_col(1, &Vector3::zeros(), &Vector3::new(0.0, 0.0, 1.0));

        let mut jac = GeometricJacobian::zeros(body, base, fa, 2);
        jac.set_col(0, &Vector3::new(0.0, 0.0, 1.0), &Vector3::new(0.2, 0.0, 0.0));
        jac.set_col(1, &Vector3::new(0.3, 0.0, 0.0), &Vector3::new(0.0, 0.1, 0.0));

        let mut k_a = DMat::zeros(2, 2);
        t.pair_into(&jac, &mut k_a, 0, 0, 1.0).unwrap();

        let mut t_b = t.clone();
        t_b.apply_transform(&tf).unwrap();
        let jac_b = jac.transform(&tf).unwrap();
        let mut k_b = DMat::zeros(2, 2);
        t_b.pair_into(&jac_b, &mut k_b, 0, 0, 1.0).unwrap();

        assert_relative_eq!(k_a, k_b, epsilon = 1e-12);

        // the scale factor is applied uniformly
        let mut k_neg = DMat::zeros(2, 2);
        t.pair_into(&jac, &mut k_neg, 0, 0, -1.0).unwrap();
        assert_relative_eq!(k_neg, -k_a, epsilon = 1e-12);
    }
}
