//! Frame-annotated 6D spatial quantities: twists, accelerations, wrenches,
//! and momenta.
//!
//! A twist describes the velocity of `body` relative to `base`, expressed in
//! `frame`; a spatial acceleration is its apparent derivative. Wrenches and
//! momenta carry a single `frame` annotation.

use crate::error::{check_frame, Result, SpatialError};
use crate::{Frame, Transform3D, Vec3};

/// se(3) commutator of two `[angular; linear]` pairs.
#[inline]
fn se3_commutator(w1: &Vec3, v1: &Vec3, w2: &Vec3, v2: &Vec3) -> (Vec3, Vec3) {
    (w1.cross(w2), w1.cross(v2) + v1.cross(w2))
}

/// Angular + linear velocity of `body` relative to `base`, expressed in
/// `frame`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Twist {
    pub body: Frame,
    pub base: Frame,
    pub frame: Frame,
    pub angular: Vec3,
    pub linear: Vec3,
}

impl Twist {
    pub fn new(body: Frame, base: Frame, frame: Frame, angular: Vec3, linear: Vec3) -> Self {
        Self {
            body,
            base,
            frame,
            angular,
            linear,
        }
    }

    pub fn zero(body: Frame, base: Frame, frame: Frame) -> Self {
        Self::new(body, base, frame, Vec3::zeros(), Vec3::zeros())
    }

    /// Checked sum. Twists with identical `(body, base, frame)` add
    /// componentwise; otherwise `twist(A,B,F) + twist(B,C,F) = twist(A,C,F)`.
    pub fn add(&self, rhs: &Twist) -> Result<Twist> {
        check_frame("Twist::add", self.frame, rhs.frame)?;
        let (body, base) = if self.body == rhs.body && self.base == rhs.base {
            (self.body, self.base)
        } else if self.base == rhs.body {
            (self.body, rhs.base)
        } else {
            return Err(SpatialError::FrameMismatch {
                op: "Twist::add",
                expected: self.base,
                got: rhs.body,
            });
        };
        Ok(Twist {
            body,
            base,
            frame: self.frame,
            angular: self.angular + rhs.angular,
            linear: self.linear + rhs.linear,
        })
    }

    /// Twist of `base` relative to `body`: swap the annotations, negate the
    /// components.
    pub fn inv(&self) -> Twist {
        Twist {
            body: self.base,
            base: self.body,
            frame: self.frame,
            angular: -self.angular,
            linear: -self.linear,
        }
    }

    /// Express this twist in the `to` frame of `tf` (adjoint transform).
    pub fn transform(&self, tf: &Transform3D) -> Result<Twist> {
        check_frame("Twist::transform", tf.from, self.frame)?;
        let angular = tf.rot * self.angular;
        let linear = tf.rot * self.linear + tf.trans.cross(&angular);
        Ok(Twist {
            body: self.body,
            base: self.base,
            frame: tf.to,
            angular,
            linear,
        })
    }

    /// se(3) commutator `[self, rhs]`, the Coriolis-type acceleration term.
    /// The result carries the `(body, base)` annotations of `rhs`.
    pub fn cross(&self, rhs: &Twist) -> Result<SpatialAcceleration> {
        check_frame("Twist::cross", self.frame, rhs.frame)?;
        let (angular, linear) =
            se3_commutator(&self.angular, &self.linear, &rhs.angular, &rhs.linear);
        Ok(SpatialAcceleration {
            body: rhs.body,
            base: rhs.base,
            frame: self.frame,
            angular,
            linear,
        })
    }

    /// Dual cross product `self ×* m`, the gyroscopic wrench term
    /// `twist ×* (I · twist)` of the Newton–Euler equations.
    pub fn cross_momentum(&self, m: &Momentum) -> Result<Wrench> {
        check_frame("Twist::cross_momentum", self.frame, m.frame)?;
        Ok(Wrench {
            frame: self.frame,
            angular: self.angular.cross(&m.angular) + self.linear.cross(&m.linear),
            linear: self.angular.cross(&m.linear),
        })
    }
}

/// Apparent derivative of a twist; same annotations as [`Twist`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialAcceleration {
    pub body: Frame,
    pub base: Frame,
    pub frame: Frame,
    pub angular: Vec3,
    pub linear: Vec3,
}

impl SpatialAcceleration {
    pub fn new(body: Frame, base: Frame, frame: Frame, angular: Vec3, linear: Vec3) -> Self {
        Self {
            body,
            base,
            frame,
            angular,
            linear,
        }
    }

    pub fn zero(body: Frame, base: Frame, frame: Frame) -> Self {
        Self::new(body, base, frame, Vec3::zeros(), Vec3::zeros())
    }

    /// Checked sum with the same composition rule as [`Twist::add`].
    pub fn add(&self, rhs: &SpatialAcceleration) -> Result<SpatialAcceleration> {
        check_frame("SpatialAcceleration::add", self.frame, rhs.frame)?;
        let (body, base) = if self.body == rhs.body && self.base == rhs.base {
            (self.body, self.base)
        } else if self.base == rhs.body {
            (self.body, rhs.base)
        } else {
            return Err(SpatialError::FrameMismatch {
                op: "SpatialAcceleration::add",
                expected: self.base,
                got: rhs.body,
            });
        };
        Ok(SpatialAcceleration {
            body,
            base,
            frame: self.frame,
            angular: self.angular + rhs.angular,
            linear: self.linear + rhs.linear,
        })
    }

    pub fn inv(&self) -> SpatialAcceleration {
        SpatialAcceleration {
            body: self.base,
            base: self.body,
            frame: self.frame,
            angular: -self.angular,
            linear: -self.linear,
        }
    }

    /// Full change of frame for spatial accelerations.
    ///
    /// Unlike twists, accelerations pick up a commutator term when the old
    /// and new frames are in relative motion: `twist_of_current_wrt_new` is
    /// the twist of the old frame with respect to the new one and
    /// `twist_of_body_wrt_base` is the twist whose derivative this
    /// acceleration is, both expressed in the old frame.
    pub fn transform(
        &self,
        tf: &Transform3D,
        twist_of_current_wrt_new: &Twist,
        twist_of_body_wrt_base: &Twist,
    ) -> Result<SpatialAcceleration> {
        check_frame("SpatialAcceleration::transform", tf.from, self.frame)?;
        check_frame(
            "SpatialAcceleration::transform",
            tf.from,
            twist_of_current_wrt_new.frame,
        )?;
        check_frame(
            "SpatialAcceleration::transform",
            tf.from,
            twist_of_body_wrt_base.frame,
        )?;
        let (cw, cv) = se3_commutator(
            &twist_of_current_wrt_new.angular,
            &twist_of_current_wrt_new.linear,
            &twist_of_body_wrt_base.angular,
            &twist_of_body_wrt_base.linear,
        );
        let angular = tf.rot * (self.angular + cw);
        let linear = tf.rot * (self.linear + cv) + tf.trans.cross(&angular);
        Ok(SpatialAcceleration {
            body: self.body,
            base: self.base,
            frame: tf.to,
            angular,
            linear,
        })
    }
}

/// Torque + force, expressed in `frame`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Wrench {
    pub frame: Frame,
    pub angular: Vec3,
    pub linear: Vec3,
}

impl Wrench {
    pub fn new(frame: Frame, angular: Vec3, linear: Vec3) -> Self {
        Self {
            frame,
            angular,
            linear,
        }
    }

    pub fn zero(frame: Frame) -> Self {
        Self::new(frame, Vec3::zeros(), Vec3::zeros())
    }

    pub fn add(&self, rhs: &Wrench) -> Result<Wrench> {
        check_frame("Wrench::add", self.frame, rhs.frame)?;
        Ok(Wrench {
            frame: self.frame,
            angular: self.angular + rhs.angular,
            linear: self.linear + rhs.linear,
        })
    }

    pub fn sub(&self, rhs: &Wrench) -> Result<Wrench> {
        check_frame("Wrench::sub", self.frame, rhs.frame)?;
        Ok(Wrench {
            frame: self.frame,
            angular: self.angular - rhs.angular,
            linear: self.linear - rhs.linear,
        })
    }

    /// Express this wrench in the `to` frame of `tf` (force adjoint).
    pub fn transform(&self, tf: &Transform3D) -> Result<Wrench> {
        check_frame("Wrench::transform", tf.from, self.frame)?;
        let linear = tf.rot * self.linear;
        let angular = tf.rot * self.angular + tf.trans.cross(&linear);
        Ok(Wrench {
            frame: tf.to,
            angular,
            linear,
        })
    }

    /// Power pairing `⟨wrench, twist⟩ = τ·ω + f·v`, invariant under a common
    /// change of frame.
    pub fn dot(&self, tw: &Twist) -> Result<f64> {
        check_frame("Wrench::dot", self.frame, tw.frame)?;
        Ok(self.angular.dot(&tw.angular) + self.linear.dot(&tw.linear))
    }
}

/// Angular + linear momentum, expressed in `frame`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Momentum {
    pub frame: Frame,
    pub angular: Vec3,
    pub linear: Vec3,
}

impl Momentum {
    pub fn new(frame: Frame, angular: Vec3, linear: Vec3) -> Self {
        Self {
            frame,
            angular,
            linear,
        }
    }

    pub fn zero(frame: Frame) -> Self {
        Self::new(frame, Vec3::zeros(), Vec3::zeros())
    }

    pub fn add(&self, rhs: &Momentum) -> Result<Momentum> {
        check_frame("Momentum::add", self.frame, rhs.frame)?;
        Ok(Momentum {
            frame: self.frame,
            angular: self.angular + rhs.angular,
            linear: self.linear + rhs.linear,
        })
    }

    /// Momenta change frame like wrenches.
    pub fn transform(&self, tf: &Transform3D) -> Result<Momentum> {
        check_frame("Momentum::transform", tf.from, self.frame)?;
        let linear = tf.rot * self.linear;
        let angular = tf.rot * self.angular + tf.trans.cross(&linear);
        Ok(Momentum {
            frame: tf.to,
            angular,
            linear,
        })
    }

    /// Pairing with a twist (`2·KE` when the twist is the body's own).
    pub fn dot(&self, tw: &Twist) -> Result<f64> {
        check_frame("Momentum::dot", self.frame, tw.frame)?;
        Ok(self.angular.dot(&tw.angular) + self.linear.dot(&tw.linear))
    }
}
