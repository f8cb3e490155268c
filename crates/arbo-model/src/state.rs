//! Mechanism state — configuration, velocity, and lazily refreshed
//! world-frame caches.

use crate::error::{ModelError, Result};
use crate::{BodyId, JointId, Mechanism};
use arbo_math::{
    DVec, Frame, GeometricJacobian, SpatialAcceleration, SpatialInertia, Transform3D, Twist, Vec3,
    WrenchMatrix,
};
use rand::Rng;

/// One validity bit per cache group.
#[derive(Debug, Clone, Copy, Default)]
struct CacheValidity {
    transforms: bool,
    motion_subspaces: bool,
    twists: bool,
    bias_accelerations: bool,
    inertias: bool,
    crb_inertias: bool,
    constraint_subspaces: bool,
}

impl CacheValidity {
    /// Configuration writes invalidate every group.
    fn invalidate_configuration(&mut self) {
        *self = Self::default();
    }

    /// Velocity writes invalidate only velocity-dependent groups.
    fn invalidate_velocity(&mut self) {
        self.twists = false;
        self.bias_accelerations = false;
    }
}

/// Mutable state of a mechanism: the vectors `q` and `v` plus memoized
/// per-body kinematic and inertial quantities, all expressed in the world
/// frame.
///
/// The state owns its vectors and caches and borrows the mechanism, which
/// is therefore immutable for the state's lifetime. All cache storage is
/// allocated at construction; refreshes are lazy, idempotent, and run as a
/// single topological sweep over the tree joints.
pub struct MechanismState<'a> {
    mechanism: &'a Mechanism,
    q: DVec,
    v: DVec,
    transforms: Vec<Transform3D>,
    motion_subspaces: Vec<GeometricJacobian>,
    twists: Vec<Twist>,
    bias_accelerations: Vec<SpatialAcceleration>,
    inertias: Vec<SpatialInertia>,
    crb_inertias: Vec<SpatialInertia>,
    constraint_subspaces: Vec<WrenchMatrix>,
    valid: CacheValidity,
}

impl<'a> MechanismState<'a> {
    /// Create a state at the zero configuration with zero velocity.
    pub fn new(mechanism: &'a Mechanism) -> Self {
        let world = mechanism.world_frame();
        let nb = mechanism.num_bodies();
        let transforms = (0..nb)
            .map(|b| Transform3D::identity(mechanism.body(b).frame, world))
            .collect();
        let motion_subspaces = mechanism
            .tree_joints()
            .iter()
            .map(|tj| {
                GeometricJacobian::zeros(
                    tj.joint.frame_after,
                    tj.joint.frame_before,
                    tj.joint.frame_after,
                    tj.joint.nv(),
                )
            })
            .collect();
        let constraint_subspaces = mechanism
            .loop_joints()
            .iter()
            .map(|lj| WrenchMatrix::zeros(lj.joint.frame_after, lj.joint.nconstraint()))
            .collect();

        let mut state = Self {
            mechanism,
            q: DVec::zeros(mechanism.nq()),
            v: DVec::zeros(mechanism.nv()),
            transforms,
            motion_subspaces,
            twists: vec![Twist::zero(world, world, world); nb],
            bias_accelerations: vec![SpatialAcceleration::zero(world, world, world); nb],
            inertias: vec![SpatialInertia::zero(world); nb],
            crb_inertias: vec![SpatialInertia::zero(world); nb],
            constraint_subspaces,
            valid: CacheValidity::default(),
        };
        state.zero_configuration();
        state
    }

    pub fn mechanism(&self) -> &'a Mechanism {
        self.mechanism
    }

    // ── configuration and velocity access ──

    pub fn configuration(&self) -> &DVec {
        &self.q
    }

    pub fn velocity(&self) -> &DVec {
        &self.v
    }

    /// Write the configuration segment of one joint.
    pub fn set_configuration(&mut self, joint: JointId, values: &[f64]) -> Result<()> {
        let range = self.mechanism.q_range(joint);
        if values.len() != range.len() {
            return Err(ModelError::Dimension {
                expected: range.len(),
                got: values.len(),
            });
        }
        self.q.as_mut_slice()[range].copy_from_slice(values);
        self.valid.invalidate_configuration();
        Ok(())
    }

    /// Write the velocity segment of one joint.
    pub fn set_velocity(&mut self, joint: JointId, values: &[f64]) -> Result<()> {
        let range = self.mechanism.v_range(joint);
        if values.len() != range.len() {
            return Err(ModelError::Dimension {
                expected: range.len(),
                got: values.len(),
            });
        }
        self.v.as_mut_slice()[range].copy_from_slice(values);
        self.valid.invalidate_velocity();
        Ok(())
    }

    /// Overwrite the whole configuration vector.
    pub fn set_configuration_vector(&mut self, q: &DVec) -> Result<()> {
        if q.len() != self.q.len() {
            return Err(ModelError::Dimension {
                expected: self.q.len(),
                got: q.len(),
            });
        }
        self.q.copy_from(q);
        self.valid.invalidate_configuration();
        Ok(())
    }

    /// Overwrite the whole velocity vector.
    pub fn set_velocity_vector(&mut self, v: &DVec) -> Result<()> {
        if v.len() != self.v.len() {
            return Err(ModelError::Dimension {
                expected: self.v.len(),
                got: v.len(),
            });
        }
        self.v.copy_from(v);
        self.valid.invalidate_velocity();
        Ok(())
    }

    /// Reset every joint to its zero (identity) configuration.
    pub fn zero_configuration(&mut self) {
        for j in 0..self.mechanism.num_tree_joints() {
            let range = self.mechanism.q_range(j);
            self.mechanism.tree_joint(j)
                .joint
                .zero_configuration(&mut self.q.as_mut_slice()[range]);
        }
        self.valid.invalidate_configuration();
    }

    /// Zero the velocity vector.
    pub fn zero_velocity(&mut self) {
        self.v.fill(0.0);
        self.valid.invalidate_velocity();
    }

    /// Sample a uniformly random configuration for every joint.
    pub fn rand_configuration<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for j in 0..self.mechanism.num_tree_joints() {
            let range = self.mechanism.q_range(j);
            self.mechanism.tree_joint(j)
                .joint
                .rand_configuration(&mut self.q.as_mut_slice()[range], rng);
        }
        self.valid.invalidate_configuration();
    }

    /// Project the configuration back onto the manifold (renormalize
    /// quaternions, canonicalize stereographic parameters).
    pub fn normalize_configuration(&mut self) -> Result<()> {
        for j in 0..self.mechanism.num_tree_joints() {
            let range = self.mechanism.q_range(j);
            self.mechanism.tree_joint(j)
                .joint
                .normalize_configuration(&mut self.q.as_mut_slice()[range])?;
        }
        self.valid.invalidate_configuration();
        Ok(())
    }

    /// Invalidate every cache group.
    pub fn set_dirty(&mut self) {
        self.valid.invalidate_configuration();
    }

    /// Compute the global configuration derivative `q̇` from the current
    /// velocity (quaternion kinematics etc.), for integrating callers.
    pub fn configuration_derivative(&self, qd: &mut DVec) -> Result<()> {
        if qd.len() != self.q.len() {
            return Err(ModelError::Dimension {
                expected: self.q.len(),
                got: qd.len(),
            });
        }
        for j in 0..self.mechanism.num_tree_joints() {
            let q_range = self.mechanism.q_range(j);
            let v_range = self.mechanism.v_range(j);
            let joint = &self.mechanism.tree_joint(j).joint;
            joint.velocity_to_configuration_derivative(
                &self.q.as_slice()[q_range.clone()],
                &self.v.as_slice()[v_range],
                &mut qd.as_mut_slice()[q_range],
            );
        }
        Ok(())
    }

    // ── cache refresh (lazy, idempotent) ──

    /// Refresh body-to-world transforms.
    pub fn update_transforms(&mut self) -> Result<()> {
        if self.valid.transforms {
            return Ok(());
        }
        let mech = self.mechanism;
        let world = mech.world_frame();
        self.transforms[0] = Transform3D::identity(world, world);
        for j in 0..mech.num_tree_joints() {
            let tj = mech.tree_joint(j);
            let q = &self.q.as_slice()[mech.q_range(j)];
            let across = tj
                .joint_pose
                .compose(&tj.joint.joint_transform(q))?
                .compose(&tj.successor_pose)?;
            let to_root = self.transforms[mech.predecessor(j)].compose(&across)?;
            self.transforms[mech.successor(j)] = to_root;
        }
        self.valid.transforms = true;
        Ok(())
    }

    /// Refresh per-joint motion subspaces, expressed in the world frame.
    pub fn update_motion_subspaces(&mut self) -> Result<()> {
        if self.valid.motion_subspaces {
            return Ok(());
        }
        self.update_transforms()?;
        let mech = self.mechanism;
        for j in 0..mech.num_tree_joints() {
            let tj = mech.tree_joint(j);
            let q = &self.q.as_slice()[mech.q_range(j)];
            tj.joint.fill_motion_subspace(q, &mut self.motion_subspaces[j]);
            let after_to_world =
                self.transforms[mech.successor(j)].compose(&tj.successor_pose.inv())?;
            self.motion_subspaces[j].apply_transform(&after_to_world)?;
            // frame_after is rigid on the successor: retag the columns to
            // the body pair so twists chain across joints
            self.motion_subspaces[j].body = mech.body(mech.successor(j)).frame;
            self.motion_subspaces[j].base = mech.body(mech.predecessor(j)).frame;
        }
        self.valid.motion_subspaces = true;
        Ok(())
    }

    /// Refresh body twists with respect to the world, in world frame.
    pub fn update_twists(&mut self) -> Result<()> {
        if self.valid.twists {
            return Ok(());
        }
        self.update_motion_subspaces()?;
        let mech = self.mechanism;
        let world = mech.world_frame();
        self.twists[0] = Twist::zero(world, world, world);
        for j in 0..mech.num_tree_joints() {
            let v = &self.v.as_slice()[mech.v_range(j)];
            let joint_twist = self.motion_subspaces[j].mul_velocity(v);
            let twist = joint_twist.add(&self.twists[mech.predecessor(j)])?;
            self.twists[mech.successor(j)] = twist;
        }
        self.valid.twists = true;
        Ok(())
    }

    /// Refresh bias accelerations (spatial accelerations at v̇ = 0), in
    /// world frame, with gravity folded in as the root acceleration `-g`.
    pub fn update_bias_accelerations(&mut self) -> Result<()> {
        if self.valid.bias_accelerations {
            return Ok(());
        }
        self.update_twists()?;
        let mech = self.mechanism;
        let world = mech.world_frame();
        self.bias_accelerations[0] =
            SpatialAcceleration::new(world, world, world, Vec3::zeros(), -mech.gravity());
        for j in 0..mech.num_tree_joints() {
            let succ = mech.successor(j);
            let v = &self.v.as_slice()[mech.v_range(j)];
            let joint_twist = self.motion_subspaces[j].mul_velocity(v);
            // the joint bias proper is zero for every implemented joint
            // kind; only the Coriolis term of the moving frame survives
            let coriolis = self.twists[succ].cross(&joint_twist)?;
            let bias = coriolis.add(&self.bias_accelerations[mech.predecessor(j)])?;
            self.bias_accelerations[succ] = bias;
        }
        self.valid.bias_accelerations = true;
        Ok(())
    }

    /// Refresh per-body spatial inertias expressed in the world frame.
    pub fn update_inertias(&mut self) -> Result<()> {
        if self.valid.inertias {
            return Ok(());
        }
        self.update_transforms()?;
        let mech = self.mechanism;
        let world = mech.world_frame();
        self.inertias[0] = SpatialInertia::zero(world);
        for b in 1..mech.num_bodies() {
            self.inertias[b] = match &mech.body(b).inertia {
                Some(inertia) => inertia.transform(&self.transforms[b])?,
                None => SpatialInertia::zero(world),
            };
        }
        self.valid.inertias = true;
        Ok(())
    }

    /// Refresh composite-rigid-body inertias (each body plus its whole
    /// subtree), leaves to root.
    pub fn update_crb_inertias(&mut self) -> Result<()> {
        if self.valid.crb_inertias {
            return Ok(());
        }
        self.update_inertias()?;
        let mech = self.mechanism;
        self.crb_inertias.copy_from_slice(&self.inertias);
        for b in (1..mech.num_bodies()).rev() {
            let child = self.crb_inertias[b];
            let parent = mech.parent(b);
            self.crb_inertias[parent] = self.crb_inertias[parent].add(&child)?;
        }
        self.valid.crb_inertias = true;
        Ok(())
    }

    /// Refresh loop-joint constraint-wrench subspaces, expressed in the
    /// world frame.
    pub fn update_constraint_subspaces(&mut self) -> Result<()> {
        if self.valid.constraint_subspaces {
            return Ok(());
        }
        self.update_transforms()?;
        let mech = self.mechanism;
        for (l, lj) in mech.loop_joints().iter().enumerate() {
            lj.joint
                .fill_constraint_wrench_subspace(&[], &mut self.constraint_subspaces[l]);
            let after_to_world =
                self.transforms[lj.successor].compose(&lj.successor_pose.inv())?;
            self.constraint_subspaces[l].apply_transform(&after_to_world)?;
        }
        self.valid.constraint_subspaces = true;
        Ok(())
    }

    /// Refresh transforms, motion subspaces, and twists in one call.
    pub fn update_kinematics(&mut self) -> Result<()> {
        self.update_twists()
    }

    // ── cache views (call the matching `update_*` first) ──

    pub fn transforms(&self) -> &[Transform3D] {
        debug_assert!(self.valid.transforms, "transforms cache is stale");
        &self.transforms
    }

    pub fn motion_subspaces(&self) -> &[GeometricJacobian] {
        debug_assert!(self.valid.motion_subspaces, "motion subspace cache is stale");
        &self.motion_subspaces
    }

    pub fn twists(&self) -> &[Twist] {
        debug_assert!(self.valid.twists, "twist cache is stale");
        &self.twists
    }

    pub fn bias_accelerations(&self) -> &[SpatialAcceleration] {
        debug_assert!(
            self.valid.bias_accelerations,
            "bias acceleration cache is stale"
        );
        &self.bias_accelerations
    }

    pub fn inertias_in_world(&self) -> &[SpatialInertia] {
        debug_assert!(self.valid.inertias, "inertia cache is stale");
        &self.inertias
    }

    pub fn crb_inertias(&self) -> &[SpatialInertia] {
        debug_assert!(self.valid.crb_inertias, "CRB inertia cache is stale");
        &self.crb_inertias
    }

    pub fn constraint_subspaces(&self) -> &[WrenchMatrix] {
        debug_assert!(
            self.valid.constraint_subspaces,
            "constraint subspace cache is stale"
        );
        &self.constraint_subspaces
    }

    // ── kinematic queries ──

    /// Transform from an arbitrary body-fixed frame to the world frame.
    pub fn transform_to_root(&mut self, frame: Frame) -> Result<Transform3D> {
        self.update_transforms()?;
        let (body, to_body) = self.mechanism.body_fixed_frame(frame)?;
        Ok(self.transforms[body].compose(&to_body)?)
    }

    /// Relative transform `Transform3D(from → to)` between two frames.
    pub fn relative_transform(&mut self, from: Frame, to: Frame) -> Result<Transform3D> {
        let from_to_root = self.transform_to_root(from)?;
        let to_to_root = self.transform_to_root(to)?;
        Ok(to_to_root.inv().compose(&from_to_root)?)
    }

    /// Twist of `body` with respect to the world, expressed in world frame.
    pub fn twist_wrt_world(&mut self, body: BodyId) -> Result<Twist> {
        self.update_twists()?;
        Ok(self.twists[body])
    }

    /// Twist of `body` with respect to `base`, expressed in world frame.
    pub fn relative_twist(&mut self, body: BodyId, base: BodyId) -> Result<Twist> {
        self.update_twists()?;
        Ok(self.twists[body].add(&self.twists[base].inv())?)
    }

    /// Bias acceleration of `body` (world frame, gravity trick included).
    pub fn bias_acceleration(&mut self, body: BodyId) -> Result<SpatialAcceleration> {
        self.update_bias_accelerations()?;
        Ok(self.bias_accelerations[body])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Joint, JointKind, RigidBody};
    use approx::assert_relative_eq;
    use arbo_math::{Mat3, SpatialInertia};
    use std::f64::consts::FRAC_PI_2;

    /// Unit-length, unit-mass rod hanging along -z from a y-axis revolute.
    fn pendulum() -> Mechanism {
        let mut mechanism = Mechanism::new(RigidBody::root("world"), Vec3::new(0.0, 0.0, -9.81));
        let frame = Frame::new();
        let inertia = SpatialInertia::from_com(
            frame,
            1.0,
            Vec3::new(0.0, 0.0, -0.5),
            Mat3::from_diagonal(&Vec3::new(1.0 / 12.0, 1.0 / 12.0, 0.0)),
        );
        let joint = Joint::new("shoulder", JointKind::revolute(Vec3::y()));
        let joint_pose = Transform3D::identity(joint.frame_before, mechanism.world_frame());
        let successor_pose = Transform3D::identity(frame, joint.frame_after);
        mechanism
            .attach(0, RigidBody::new("rod", inertia), joint, joint_pose, successor_pose)
            .unwrap();
        mechanism
    }

    #[test]
    fn pendulum_transform_at_quarter_turn() {
        let mechanism = pendulum();
        let mut state = MechanismState::new(&mechanism);
        state.set_configuration(0, &[FRAC_PI_2]).unwrap();

        let tf = state.transform_to_root(mechanism.body(1).frame).unwrap();
        // rod tip at (0,0,-1) in body frame swings to (-1,0,0) in world
        let tip = tf.transform_point(&Vec3::new(0.0, 0.0, -1.0));
        assert_relative_eq!(tip, Vec3::new(-1.0, 0.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn pendulum_twist_matches_joint_rate() {
        let mechanism = pendulum();
        let mut state = MechanismState::new(&mechanism);
        state.set_velocity(0, &[2.0]).unwrap();

        let tw = state.twist_wrt_world(1).unwrap();
        assert_relative_eq!(tw.angular, Vec3::new(0.0, 2.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(tw.linear, Vec3::zeros(), epsilon = 1e-12);
    }

    #[test]
    fn velocity_write_keeps_transforms_valid() {
        let mechanism = pendulum();
        let mut state = MechanismState::new(&mechanism);
        state.set_configuration(0, &[0.3]).unwrap();
        state.update_transforms().unwrap();
        let before = state.transforms()[1];

        state.set_velocity(0, &[1.0]).unwrap();
        // transforms survived the velocity write
        assert!(state.valid.transforms);
        assert_eq!(state.transforms()[1], before);
        // twists did not
        assert!(!state.valid.twists);
    }

    #[test]
    fn relative_transform_roundtrip_is_identity() {
        let mechanism = pendulum();
        let mut state = MechanismState::new(&mechanism);
        state.set_configuration(0, &[0.7]).unwrap();

        let a = mechanism.body(1).frame;
        let b = mechanism.world_frame();
        let ab = state.relative_transform(a, b).unwrap();
        let ba = state.relative_transform(b, a).unwrap();
        let id = ab.compose(&ba).unwrap();
        assert_relative_eq!(id.rot, Mat3::identity(), epsilon = 1e-10);
        assert_relative_eq!(id.trans, Vec3::zeros(), epsilon = 1e-10);
    }

    #[test]
    fn crb_root_carries_total_mass() {
        let mechanism = pendulum();
        let mut state = MechanismState::new(&mechanism);
        state.update_crb_inertias().unwrap();
        assert_relative_eq!(state.crb_inertias()[0].mass, mechanism.mass(), epsilon = 1e-12);
    }
}
