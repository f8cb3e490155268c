//! Mechanism — static topology of an articulated rigid-body system.

use crate::error::{ModelError, Result};
use crate::{Joint, JointKind, RigidBody};
use arbo_math::error::check_frame;
use arbo_math::{Frame, Transform3D, Vec3};
use std::ops::Range;

/// Index of a body; the root is body 0.
pub type BodyId = usize;
/// Index of a tree joint; tree joint `j` has successor body `j + 1`.
pub type JointId = usize;

/// A tree joint together with its attachment poses.
///
/// `joint_pose` maps `frame_before` to the predecessor's default frame;
/// `successor_pose` maps the successor's default frame to `frame_after`.
/// The transform of a body B to the world frame W via its tree joint is
/// `T(B→W) = T(P→W) ∘ joint_pose ∘ joint_transform(q) ∘ successor_pose`.
#[derive(Debug, Clone)]
pub struct TreeJoint {
    pub joint: Joint,
    pub joint_pose: Transform3D,
    pub successor_pose: Transform3D,
}

/// A non-tree joint closing a kinematic cycle. Loop joints carry no
/// configuration; they constrain the relative motion of their two
/// attachment frames to the joint's motion subspace.
#[derive(Debug, Clone)]
pub struct LoopJoint {
    pub joint: Joint,
    pub predecessor: BodyId,
    pub successor: BodyId,
    pub joint_pose: Transform3D,
    pub successor_pose: Transform3D,
}

/// Static description of an articulated mechanism: a spanning tree of
/// joints over rigid bodies, plus loop joints, frozen once states exist.
#[derive(Debug, Clone)]
pub struct Mechanism {
    bodies: Vec<RigidBody>,
    tree_joints: Vec<TreeJoint>,
    /// Parent body index per body; `parents[0] == 0`.
    parents: Vec<BodyId>,
    loop_joints: Vec<LoopJoint>,
    gravity: Vec3,
    nq: usize,
    nv: usize,
    q_offsets: Vec<usize>,
    v_offsets: Vec<usize>,
    version: u64,
}

impl Mechanism {
    /// Create a mechanism with the given root body; the root's default
    /// frame is the world frame.
    pub fn new(root: RigidBody, gravity: Vec3) -> Self {
        Self {
            bodies: vec![root],
            tree_joints: Vec::new(),
            parents: vec![0],
            loop_joints: Vec::new(),
            gravity,
            nq: 0,
            nv: 0,
            q_offsets: Vec::new(),
            v_offsets: Vec::new(),
            version: 0,
        }
    }

    /// Attach a new body to `predecessor` through `joint`, extending the
    /// spanning tree.
    ///
    /// `joint_pose` places `frame_before` on the predecessor
    /// (`Transform3D(frame_before → predecessor frame)`); `successor_pose`
    /// places the successor's frame on `frame_after`
    /// (`Transform3D(successor frame → frame_after)`).
    pub fn attach(
        &mut self,
        predecessor: BodyId,
        successor: RigidBody,
        joint: Joint,
        joint_pose: Transform3D,
        successor_pose: Transform3D,
    ) -> Result<BodyId> {
        self.check_poses(predecessor, &successor, &joint, &joint_pose, &successor_pose)?;

        self.bodies[predecessor].add_frame_definition(joint_pose)?;
        let mut successor = successor;
        successor.add_frame_definition(successor_pose.inv())?;

        let id = self.bodies.len();
        self.bodies.push(successor);
        self.parents.push(predecessor);
        self.tree_joints.push(TreeJoint {
            joint,
            joint_pose,
            successor_pose,
        });
        self.recompute_offsets();
        Ok(id)
    }

    /// Close a kinematic loop between two existing bodies. The joint is
    /// stored as a non-tree joint and does not alter the spanning tree.
    pub fn close_loop(
        &mut self,
        predecessor: BodyId,
        successor: BodyId,
        joint: Joint,
        joint_pose: Transform3D,
        successor_pose: Transform3D,
    ) -> Result<JointId> {
        if successor >= self.bodies.len() {
            return Err(ModelError::Topology(format!(
                "loop joint `{}` successor {successor} does not exist",
                joint.name
            )));
        }
        self.check_poses(
            predecessor,
            &self.bodies[successor],
            &joint,
            &joint_pose,
            &successor_pose,
        )?;
        if predecessor == successor {
            return Err(ModelError::Topology(format!(
                "loop joint `{}` connects body {predecessor} to itself",
                joint.name
            )));
        }

        self.bodies[predecessor].add_frame_definition(joint_pose)?;
        self.bodies[successor].add_frame_definition(successor_pose.inv())?;

        let id = self.loop_joints.len();
        self.loop_joints.push(LoopJoint {
            joint,
            predecessor,
            successor,
            joint_pose,
            successor_pose,
        });
        Ok(id)
    }

    fn check_poses(
        &self,
        predecessor: BodyId,
        successor: &RigidBody,
        joint: &Joint,
        joint_pose: &Transform3D,
        successor_pose: &Transform3D,
    ) -> Result<()> {
        let pred = self.bodies.get(predecessor).ok_or_else(|| {
            ModelError::Topology(format!(
                "joint `{}` predecessor {predecessor} does not exist",
                joint.name
            ))
        })?;
        check_frame("attach: joint_pose.from", joint.frame_before, joint_pose.from)?;
        check_frame("attach: joint_pose.to", pred.frame, joint_pose.to)?;
        check_frame(
            "attach: successor_pose.from",
            successor.frame,
            successor_pose.from,
        )?;
        check_frame(
            "attach: successor_pose.to",
            joint.frame_after,
            successor_pose.to,
        )?;
        Ok(())
    }

    fn recompute_offsets(&mut self) {
        self.q_offsets.clear();
        self.v_offsets.clear();
        let (mut nq, mut nv) = (0, 0);
        for tj in &self.tree_joints {
            self.q_offsets.push(nq);
            self.v_offsets.push(nv);
            nq += tj.joint.nq();
            nv += tj.joint.nv();
        }
        self.nq = nq;
        self.nv = nv;
    }

    /// Replace a tree joint's type. Configuration and velocity offsets are
    /// reassigned globally and the mechanism version is bumped, which
    /// invalidates outstanding result buffers.
    pub fn change_joint_type(&mut self, joint: JointId, kind: JointKind) -> Result<()> {
        let tj = self.tree_joints.get_mut(joint).ok_or_else(|| {
            ModelError::Topology(format!("tree joint {joint} does not exist"))
        })?;
        tj.joint.kind = kind;
        self.recompute_offsets();
        self.version += 1;
        Ok(())
    }

    /// Merge every fixed tree joint into its predecessor, transforming and
    /// adding inertias; dynamics on the remaining coordinates are preserved
    /// exactly. Child joints, frame definitions, and loop-joint endpoints
    /// are re-homed onto the surviving bodies. Bumps the mechanism version.
    pub fn remove_fixed_joints(&mut self) -> Result<()> {
        // per old body: surviving body index and the transform from the old
        // body's frame to the surviving body's frame
        let world = self.bodies[0].frame;
        let mut map: Vec<(BodyId, Transform3D)> = vec![(0, Transform3D::identity(world, world))];

        let mut bodies = vec![self.bodies[0].clone()];
        let mut parents = vec![0];
        let mut tree_joints: Vec<TreeJoint> = Vec::new();

        for (j, tj) in self.tree_joints.iter().enumerate() {
            let old_succ = j + 1;
            let old_pred = self.parents[old_succ];
            let (new_pred, pred_fix) = map[old_pred];
            let succ_body = &self.bodies[old_succ];

            if tj.joint.kind == JointKind::Fixed {
                let across = tj
                    .joint_pose
                    .compose(&tj.joint.joint_transform(&[]))?
                    .compose(&tj.successor_pose)?;
                let to_new = pred_fix.compose(&across)?;

                // mass welded to the root does not move; drop it there
                if new_pred != 0 {
                    if let Some(inertia) = &succ_body.inertia {
                        let transformed = inertia.transform(&to_new)?;
                        let merged = match &bodies[new_pred].inertia {
                            Some(existing) => existing.add(&transformed)?,
                            None => transformed,
                        };
                        bodies[new_pred].inertia = Some(merged);
                    }
                }

                bodies[new_pred].add_frame_definition(to_new)?;
                for def in &succ_body.frame_definitions {
                    let composed = to_new.compose(def)?;
                    bodies[new_pred].add_frame_definition(composed)?;
                }
                map.push((new_pred, to_new));
            } else {
                let new_id = bodies.len();
                map.push((new_id, Transform3D::identity(succ_body.frame, succ_body.frame)));
                bodies.push(succ_body.clone());
                parents.push(new_pred);
                tree_joints.push(TreeJoint {
                    joint: tj.joint.clone(),
                    joint_pose: pred_fix.compose(&tj.joint_pose)?,
                    successor_pose: tj.successor_pose,
                });
            }
        }

        for lj in &mut self.loop_joints {
            let (new_pred, pred_fix) = map[lj.predecessor];
            let (new_succ, succ_fix) = map[lj.successor];
            lj.joint_pose = pred_fix.compose(&lj.joint_pose)?;
            lj.successor_pose = lj.successor_pose.compose(&succ_fix.inv())?;
            lj.predecessor = new_pred;
            lj.successor = new_succ;
        }

        self.bodies = bodies;
        self.parents = parents;
        self.tree_joints = tree_joints;
        self.recompute_offsets();
        self.version += 1;
        Ok(())
    }

    // ── accessors ──

    pub fn gravity(&self) -> Vec3 {
        self.gravity
    }

    pub fn world_frame(&self) -> Frame {
        self.bodies[0].frame
    }

    pub fn num_bodies(&self) -> usize {
        self.bodies.len()
    }

    pub fn num_tree_joints(&self) -> usize {
        self.tree_joints.len()
    }

    pub fn bodies(&self) -> &[RigidBody] {
        &self.bodies
    }

    pub fn body(&self, id: BodyId) -> &RigidBody {
        &self.bodies[id]
    }

    pub fn tree_joints(&self) -> &[TreeJoint] {
        &self.tree_joints
    }

    pub fn tree_joint(&self, id: JointId) -> &TreeJoint {
        &self.tree_joints[id]
    }

    pub fn loop_joints(&self) -> &[LoopJoint] {
        &self.loop_joints
    }

    /// Parent body of `body` (the root is its own parent).
    pub fn parent(&self, body: BodyId) -> BodyId {
        self.parents[body]
    }

    /// Successor body of tree joint `id`.
    pub fn successor(&self, id: JointId) -> BodyId {
        id + 1
    }

    /// Predecessor body of tree joint `id`.
    pub fn predecessor(&self, id: JointId) -> BodyId {
        self.parents[id + 1]
    }

    /// Tree joint whose successor is `body`, if `body` is not the root.
    pub fn joint_to_parent(&self, body: BodyId) -> Option<JointId> {
        (body > 0).then(|| body - 1)
    }

    pub fn nq(&self) -> usize {
        self.nq
    }

    pub fn nv(&self) -> usize {
        self.nv
    }

    pub fn q_range(&self, id: JointId) -> Range<usize> {
        let off = self.q_offsets[id];
        off..off + self.tree_joints[id].joint.nq()
    }

    pub fn v_range(&self, id: JointId) -> Range<usize> {
        let off = self.v_offsets[id];
        off..off + self.tree_joints[id].joint.nv()
    }

    /// Total constraint dimension over all loop joints.
    pub fn nconstraint(&self) -> usize {
        self.loop_joints.iter().map(|lj| lj.joint.nconstraint()).sum()
    }

    /// Total mass of all bodies.
    pub fn mass(&self) -> f64 {
        self.bodies
            .iter()
            .filter_map(|b| b.inertia.as_ref().map(|i| i.mass))
            .sum()
    }

    /// Topology revision; bumped by every index reassignment.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Find the body carrying `frame` and the transform from `frame` to
    /// that body's default frame.
    pub fn body_fixed_frame(&self, frame: Frame) -> Result<(BodyId, Transform3D)> {
        for (id, body) in self.bodies.iter().enumerate() {
            if let Some(tf) = body.frame_definition(frame) {
                return Ok((id, tf));
            }
        }
        Err(ModelError::Topology(format!(
            "{frame} is not fixed to any body of this mechanism"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbo_math::{Mat3, SpatialInertia};

    fn unit_rod_inertia(frame: Frame) -> SpatialInertia {
        SpatialInertia::from_com(
            frame,
            1.0,
            Vec3::new(0.0, 0.0, -0.5),
            Mat3::from_diagonal(&Vec3::new(1.0 / 12.0, 1.0 / 12.0, 0.0)),
        )
    }

    fn attach_revolute(mechanism: &mut Mechanism, pred: BodyId, name: &str, offset: Vec3) -> BodyId {
        let body_frame = Frame::new();
        let body = RigidBody::new(name, unit_rod_inertia(body_frame));
        let joint = Joint::new(&format!("{name}_joint"), JointKind::revolute(Vec3::y()));
        let joint_pose = Transform3D::from_translation(
            joint.frame_before,
            mechanism.body(pred).frame,
            offset,
        );
        let successor_pose = Transform3D::identity(body_frame, joint.frame_after);
        mechanism
            .attach(pred, body, joint, joint_pose, successor_pose)
            .unwrap()
    }

    #[test]
    fn attach_preserves_tree_ordering() {
        let mut mechanism = Mechanism::new(RigidBody::root("world"), Vec3::new(0.0, 0.0, -9.81));
        let b1 = attach_revolute(&mut mechanism, 0, "link1", Vec3::zeros());
        let b2 = attach_revolute(&mut mechanism, b1, "link2", Vec3::new(0.0, 0.0, -1.0));
        let b3 = attach_revolute(&mut mechanism, b1, "link3", Vec3::new(0.0, 0.0, -1.0));

        assert_eq!((b1, b2, b3), (1, 2, 3));
        for j in 0..mechanism.num_tree_joints() {
            assert!(mechanism.predecessor(j) < mechanism.successor(j));
        }
        assert_eq!(mechanism.nq(), 3);
        assert_eq!(mechanism.nv(), 3);
        assert_eq!(mechanism.q_range(2), 2..3);
    }

    #[test]
    fn attach_rejects_wrong_pose_frames() {
        let mut mechanism = Mechanism::new(RigidBody::root("world"), Vec3::zeros());
        let body_frame = Frame::new();
        let body = RigidBody::new("link", unit_rod_inertia(body_frame));
        let joint = Joint::new("joint", JointKind::revolute(Vec3::y()));
        // joint_pose.from must be frame_before, not some unrelated frame
        let bogus = Transform3D::identity(Frame::new(), mechanism.world_frame());
        let successor_pose = Transform3D::identity(body_frame, joint.frame_after);
        assert!(mechanism.attach(0, body, joint, bogus, successor_pose).is_err());
    }

    #[test]
    fn change_joint_type_reassigns_offsets_and_bumps_version() {
        let mut mechanism = Mechanism::new(RigidBody::root("world"), Vec3::zeros());
        let b1 = attach_revolute(&mut mechanism, 0, "link1", Vec3::zeros());
        attach_revolute(&mut mechanism, b1, "link2", Vec3::new(0.0, 0.0, -1.0));
        let v0 = mechanism.version();

        mechanism
            .change_joint_type(0, JointKind::QuaternionFloating)
            .unwrap();
        assert_eq!(mechanism.nq(), 8);
        assert_eq!(mechanism.nv(), 7);
        assert_eq!(mechanism.q_range(1), 7..8);
        assert_eq!(mechanism.v_range(1), 6..7);
        assert!(mechanism.version() > v0);
    }

    #[test]
    fn loop_joint_does_not_extend_tree() {
        let mut mechanism = Mechanism::new(RigidBody::root("world"), Vec3::zeros());
        let b1 = attach_revolute(&mut mechanism, 0, "link1", Vec3::zeros());
        let b2 = attach_revolute(&mut mechanism, b1, "link2", Vec3::new(0.0, 0.0, -1.0));

        let joint = Joint::new("closure", JointKind::revolute(Vec3::y()));
        let joint_pose = Transform3D::identity(joint.frame_before, mechanism.world_frame());
        let successor_pose = Transform3D::from_translation(
            mechanism.body(b2).frame,
            joint.frame_after,
            Vec3::new(0.0, 0.0, 1.0),
        );
        mechanism
            .close_loop(0, b2, joint, joint_pose, successor_pose)
            .unwrap();

        assert_eq!(mechanism.num_tree_joints(), 2);
        assert_eq!(mechanism.loop_joints().len(), 1);
        assert_eq!(mechanism.nconstraint(), 5);
        assert_eq!(mechanism.nv(), 2);
    }
}
