//! Shared mechanism builders for the integration tests.

use arbo::arbo_math::{Mat3, Vec3};
use arbo::{BodyId, Frame, Joint, JointKind, Mechanism, RigidBody, SpatialInertia, Transform3D};
use rand::Rng;

pub use arbo::arbo_math::GRAVITY;

/// Inertia of a thin rod hanging along -z from the frame origin, moment
/// about the origin.
pub fn hanging_rod_inertia(frame: Frame, mass: f64, length: f64) -> SpatialInertia {
    let i = mass * length * length / 3.0;
    SpatialInertia::new(
        frame,
        Mat3::from_diagonal(&Vec3::new(i, i, 0.0)),
        Vec3::new(0.0, 0.0, -mass * length / 2.0),
        mass,
    )
}

/// Inertia of a thin rod extending along +x from the frame origin.
pub fn x_rod_inertia(frame: Frame, mass: f64, length: f64) -> SpatialInertia {
    let i = mass * length * length / 3.0;
    SpatialInertia::new(
        frame,
        Mat3::from_diagonal(&Vec3::new(0.0, i, i)),
        Vec3::new(mass * length / 2.0, 0.0, 0.0),
        mass,
    )
}

/// Attach `inertia` to `pred` through a joint of the given kind, with the
/// joint placed at `offset` in the predecessor's frame.
pub fn attach(
    mechanism: &mut Mechanism,
    pred: BodyId,
    name: &str,
    kind: JointKind,
    offset: Vec3,
    inertia: SpatialInertia,
) -> BodyId {
    let body_frame = inertia.frame;
    let joint = Joint::new(&format!("{name}_joint"), kind);
    let joint_pose = Transform3D::from_translation(
        joint.frame_before,
        mechanism.body(pred).frame,
        offset,
    );
    let successor_pose = Transform3D::identity(body_frame, joint.frame_after);
    mechanism
        .attach(pred, RigidBody::new(name, inertia), joint, joint_pose, successor_pose)
        .unwrap()
}

/// The double pendulum of the reference scenario: unit masses and lengths,
/// moment 0.333 about each pivot, revolute about +x, links hanging along
/// -z, gravity -9.81 ẑ.
pub fn double_pendulum() -> Mechanism {
    let mut mechanism = Mechanism::new(RigidBody::root("world"), Vec3::new(0.0, 0.0, -GRAVITY));
    let inertia = |frame| {
        SpatialInertia::new(
            frame,
            Mat3::from_diagonal(&Vec3::new(0.333, 0.333, 0.0)),
            Vec3::new(0.0, 0.0, -0.5),
            1.0,
        )
    };
    let b1 = attach(
        &mut mechanism,
        0,
        "upper",
        JointKind::revolute(Vec3::x()),
        Vec3::zeros(),
        inertia(Frame::new()),
    );
    attach(
        &mut mechanism,
        b1,
        "lower",
        JointKind::revolute(Vec3::x()),
        Vec3::new(0.0, 0.0, -1.0),
        inertia(Frame::new()),
    );
    mechanism
}

/// Acrobot: unit-mass links, l1 = 1, lc2 = 1, pivot moments 0.333 and 1.33.
pub fn acrobot() -> Mechanism {
    let mut mechanism = Mechanism::new(RigidBody::root("world"), Vec3::new(0.0, 0.0, -GRAVITY));
    let upper = SpatialInertia::new(
        Frame::new(),
        Mat3::from_diagonal(&Vec3::new(0.333, 0.333, 0.0)),
        Vec3::new(0.0, 0.0, -0.5),
        1.0,
    );
    let lower = SpatialInertia::new(
        Frame::new(),
        Mat3::from_diagonal(&Vec3::new(1.33, 1.33, 0.0)),
        Vec3::new(0.0, 0.0, -1.0),
        1.0,
    );
    let b1 = attach(
        &mut mechanism,
        0,
        "upper",
        JointKind::revolute(Vec3::x()),
        Vec3::zeros(),
        upper,
    );
    attach(
        &mut mechanism,
        b1,
        "lower",
        JointKind::revolute(Vec3::x()),
        Vec3::new(0.0, 0.0, -1.0),
        lower,
    );
    mechanism
}

/// Parallelogram four-bar: cranks of length 0.6 at x = 0 and x = 1, a unit
/// coupler, three tree revolutes about +y and one loop revolute closing the
/// cycle. At the zero configuration the loop is exactly closed.
pub fn four_bar() -> Mechanism {
    let crank_len = 0.6;
    let coupler_len = 1.0;
    let mut mechanism = Mechanism::new(RigidBody::root("world"), Vec3::new(0.0, 0.0, -GRAVITY));

    let crank = attach(
        &mut mechanism,
        0,
        "crank",
        JointKind::revolute(Vec3::y()),
        Vec3::zeros(),
        hanging_rod_inertia(Frame::new(), 0.6, crank_len),
    );
    let coupler = attach(
        &mut mechanism,
        crank,
        "coupler",
        JointKind::revolute(Vec3::y()),
        Vec3::new(0.0, 0.0, -crank_len),
        x_rod_inertia(Frame::new(), 1.0, coupler_len),
    );
    let follower = attach(
        &mut mechanism,
        0,
        "follower",
        JointKind::revolute(Vec3::y()),
        Vec3::new(coupler_len, 0.0, 0.0),
        hanging_rod_inertia(Frame::new(), 0.6, crank_len),
    );

    // close the loop at the coupler's far end / follower's tip
    let joint = Joint::new("closure", JointKind::revolute(Vec3::y()));
    let joint_pose = Transform3D::from_translation(
        joint.frame_before,
        mechanism.body(coupler).frame,
        Vec3::new(coupler_len, 0.0, 0.0),
    );
    let successor_pose = Transform3D::from_translation(
        mechanism.body(follower).frame,
        joint.frame_after,
        Vec3::new(0.0, 0.0, crank_len),
    );
    mechanism
        .close_loop(coupler, follower, joint, joint_pose, successor_pose)
        .unwrap();
    mechanism
}

/// Random serial chain mixing revolute, prismatic, and planar joints.
pub fn rand_chain<R: Rng>(rng: &mut R, joints: usize) -> Mechanism {
    let mut mechanism = Mechanism::new(RigidBody::root("world"), Vec3::new(0.0, 0.0, -GRAVITY));
    let mut pred = 0;
    for i in 0..joints {
        let axis = Vec3::new(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0_f64).clamp(0.1, 1.0),
        );
        let kind = match i % 3 {
            0 => JointKind::revolute(axis),
            1 => JointKind::prismatic(axis),
            _ => JointKind::planar(Vec3::x(), Vec3::y()),
        };
        let inertia = SpatialInertia::from_com(
            Frame::new(),
            rng.gen_range(0.5..2.0),
            Vec3::new(
                rng.gen_range(-0.3..0.3),
                rng.gen_range(-0.3..0.3),
                rng.gen_range(-0.8..-0.2),
            ),
            Mat3::from_diagonal(&Vec3::new(
                rng.gen_range(0.05..0.4),
                rng.gen_range(0.05..0.4),
                rng.gen_range(0.05..0.4),
            )),
        );
        let offset = Vec3::new(
            rng.gen_range(-0.2..0.2),
            rng.gen_range(-0.2..0.2),
            rng.gen_range(-0.8..-0.3),
        );
        pred = attach(&mut mechanism, pred, &format!("link{i}"), kind, offset, inertia);
    }
    mechanism
}

/// Humanoid-scale mechanism: quaternion-floating pelvis plus `limbs`
/// revolute chains branching off it.
pub fn floating_humanoid<R: Rng>(rng: &mut R, revolutes: usize) -> Mechanism {
    let mut mechanism = Mechanism::new(RigidBody::root("world"), Vec3::new(0.0, 0.0, -GRAVITY));
    let pelvis_inertia = SpatialInertia::from_com(
        Frame::new(),
        10.0,
        Vec3::zeros(),
        Mat3::from_diagonal(&Vec3::new(0.3, 0.3, 0.2)),
    );
    let pelvis = attach(
        &mut mechanism,
        0,
        "pelvis",
        JointKind::QuaternionFloating,
        Vec3::zeros(),
        pelvis_inertia,
    );

    let limbs = 5;
    let per_limb = revolutes / limbs;
    for limb in 0..limbs {
        let mut pred = pelvis;
        for seg in 0..per_limb {
            let axis = match seg % 3 {
                0 => Vec3::x(),
                1 => Vec3::y(),
                _ => Vec3::z(),
            };
            let inertia = SpatialInertia::from_com(
                Frame::new(),
                rng.gen_range(0.5..3.0),
                Vec3::new(0.0, 0.0, rng.gen_range(-0.3..-0.1)),
                Mat3::from_diagonal(&Vec3::new(
                    rng.gen_range(0.01..0.1),
                    rng.gen_range(0.01..0.1),
                    rng.gen_range(0.01..0.1),
                )),
            );
            let offset = Vec3::new(
                rng.gen_range(-0.2..0.2),
                rng.gen_range(-0.2..0.2),
                rng.gen_range(-0.4..-0.1),
            );
            pred = attach(
                &mut mechanism,
                pred,
                &format!("limb{limb}_seg{seg}"),
                JointKind::revolute(axis),
                offset,
                inertia,
            );
        }
    }
    mechanism
}
