//! Double pendulum released from rest: forward dynamics with a small
//! semi-implicit Euler loop, printing the energy drift.

use arbo::arbo_math::{DVec, Mat3, Vec3};
use arbo::{
    dynamics, total_energy, DynamicsResult, Frame, Joint, JointKind, Mechanism, MechanismState,
    RigidBody, SpatialInertia, Transform3D,
};
use std::collections::HashMap;

fn main() {
    let mut mechanism = Mechanism::new(RigidBody::root("world"), Vec3::new(0.0, 0.0, -9.81));

    let rod = |frame: Frame| {
        SpatialInertia::new(
            frame,
            Mat3::from_diagonal(&Vec3::new(1.0 / 3.0, 1.0 / 3.0, 0.0)),
            Vec3::new(0.0, 0.0, -0.5),
            1.0,
        )
    };

    let upper_frame = Frame::new();
    let shoulder = Joint::new("shoulder", JointKind::revolute(Vec3::x()));
    let shoulder_pose = Transform3D::identity(shoulder.frame_before, mechanism.world_frame());
    let upper_pose = Transform3D::identity(upper_frame, shoulder.frame_after);
    let upper = mechanism
        .attach(
            0,
            RigidBody::new("upper", rod(upper_frame)),
            shoulder,
            shoulder_pose,
            upper_pose,
        )
        .unwrap();

    let lower_frame = Frame::new();
    let elbow = Joint::new("elbow", JointKind::revolute(Vec3::x()));
    let elbow_pose = Transform3D::from_translation(
        elbow.frame_before,
        mechanism.body(upper).frame,
        Vec3::new(0.0, 0.0, -1.0),
    );
    let lower_pose = Transform3D::identity(lower_frame, elbow.frame_after);
    mechanism
        .attach(
            upper,
            RigidBody::new("lower", rod(lower_frame)),
            elbow,
            elbow_pose,
            lower_pose,
        )
        .unwrap();

    let mut state = MechanismState::new(&mechanism);
    state.set_configuration(0, &[1.0]).unwrap();
    state.set_configuration(1, &[0.5]).unwrap();

    let mut result = DynamicsResult::new(&mechanism);
    let tau = DVec::zeros(mechanism.nv());
    let external = HashMap::new();
    let mut qd = DVec::zeros(mechanism.nq());

    let e0 = total_energy(&mut state).unwrap();
    let dt = 1e-4;
    for step in 0..50_000 {
        dynamics(&mut state, &tau, &external, &mut result).unwrap();
        let v_new = state.velocity() + &result.vd * dt;
        state.set_velocity_vector(&v_new).unwrap();
        state.configuration_derivative(&mut qd).unwrap();
        let q_new = state.configuration() + &qd * dt;
        state.set_configuration_vector(&q_new).unwrap();

        if step % 10_000 == 0 {
            let e = total_energy(&mut state).unwrap();
            println!(
                "t = {:5.2} s  q = [{:+.4}, {:+.4}]  energy drift = {:+.3e}",
                step as f64 * dt,
                state.configuration()[0],
                state.configuration()[1],
                e - e0,
            );
        }
    }
}
