//! Recursive Newton–Euler Algorithm — inverse dynamics.

use crate::error::{DynamicsError, Result};
use arbo_math::error::check_frame;
use arbo_math::{DVec, SpatialAcceleration, Wrench};
use arbo_model::{BodyId, MechanismState};
use std::collections::HashMap;

fn check_buffers(
    state: &MechanismState<'_>,
    external_wrenches: &HashMap<BodyId, Wrench>,
    tau: &DVec,
    wrenches: &[Wrench],
    accelerations: &[SpatialAcceleration],
) -> Result<()> {
    let mech = state.mechanism();
    if tau.len() != mech.nv() {
        return Err(DynamicsError::Dimension {
            expected: mech.nv(),
            got: tau.len(),
        });
    }
    if wrenches.len() != mech.num_bodies() {
        return Err(DynamicsError::Dimension {
            expected: mech.num_bodies(),
            got: wrenches.len(),
        });
    }
    if accelerations.len() != mech.num_bodies() {
        return Err(DynamicsError::Dimension {
            expected: mech.num_bodies(),
            got: accelerations.len(),
        });
    }
    for (&body, wrench) in external_wrenches {
        if body >= mech.num_bodies() {
            return Err(DynamicsError::Dimension {
                expected: mech.num_bodies(),
                got: body,
            });
        }
        check_frame("external wrench", mech.world_frame(), wrench.frame)?;
    }
    Ok(())
}

/// Two-sweep RNEA over the tree. With `vd = None` the desired acceleration
/// is zero and the result is the bias torque `c(q, v)` (gravity included via
/// the root-acceleration trick).
pub(crate) fn rnea(
    state: &mut MechanismState<'_>,
    vd: Option<&DVec>,
    external_wrenches: &HashMap<BodyId, Wrench>,
    tau: &mut DVec,
    wrenches: &mut [Wrench],
    accelerations: &mut [SpatialAcceleration],
) -> Result<()> {
    check_buffers(state, external_wrenches, tau, wrenches, accelerations)?;
    state.update_bias_accelerations()?;
    state.update_inertias()?;

    let mech = state.mechanism();
    let world = mech.world_frame();
    let subspaces = state.motion_subspaces();
    let twists = state.twists();
    let bias = state.bias_accelerations();
    let inertias = state.inertias_in_world();

    // ── forward sweep: spatial accelerations ──
    accelerations[0] = bias[0];
    for j in 0..mech.num_tree_joints() {
        let succ = mech.successor(j);
        let pred = mech.predecessor(j);
        let v_range = mech.v_range(j);
        let joint_twist = subspaces[j].mul_velocity(&state.velocity().as_slice()[v_range.clone()]);
        let coriolis = twists[succ].cross(&joint_twist)?;
        let mut accel = coriolis.add(&accelerations[pred])?;
        if let Some(vd) = vd {
            let sv = subspaces[j].mul_velocity(&vd.as_slice()[v_range]);
            accel.angular += sv.angular;
            accel.linear += sv.linear;
        }
        accelerations[succ] = accel;
    }

    // ── net wrenches: f = I·a + v ×* (I·v) − f_ext ──
    wrenches[0] = Wrench::zero(world);
    for body in 1..mech.num_bodies() {
        let inertia = &inertias[body];
        let mut wrench = inertia
            .mul_acceleration(&accelerations[body])?
            .add(&twists[body].cross_momentum(&inertia.mul_twist(&twists[body])?)?)?;
        if let Some(external) = external_wrenches.get(&body) {
            wrench = wrench.sub(external)?;
        }
        wrenches[body] = wrench;
    }

    // ── backward sweep: accumulate and project ──
    for j in (0..mech.num_tree_joints()).rev() {
        let succ = mech.successor(j);
        let pred = mech.predecessor(j);
        let v_range = mech.v_range(j);
        subspaces[j].transpose_mul_wrench(&wrenches[succ], &mut tau.as_mut_slice()[v_range])?;
        let accumulated = wrenches[pred].add(&wrenches[succ])?;
        wrenches[pred] = accumulated;
    }
    Ok(())
}

/// Inverse dynamics: joint torques `τ` realizing the desired acceleration
/// `vd` at the state's `(q, v)`, under the given external wrenches (world
/// frame, zero when absent).
///
/// `wrenches` and `accelerations` are caller-owned per-body buffers; after
/// the call they hold the joint wrenches and body accelerations.
pub fn inverse_dynamics(
    state: &mut MechanismState<'_>,
    vd: &DVec,
    external_wrenches: &HashMap<BodyId, Wrench>,
    tau: &mut DVec,
    wrenches: &mut [Wrench],
    accelerations: &mut [SpatialAcceleration],
) -> Result<()> {
    if vd.len() != state.mechanism().nv() {
        return Err(DynamicsError::Dimension {
            expected: state.mechanism().nv(),
            got: vd.len(),
        });
    }
    rnea(state, Some(vd), external_wrenches, tau, wrenches, accelerations)
}

/// Bias torque `c(q, v)`: inverse dynamics at `v̇ = 0`.
pub fn dynamics_bias(
    state: &mut MechanismState<'_>,
    external_wrenches: &HashMap<BodyId, Wrench>,
    tau: &mut DVec,
    wrenches: &mut [Wrench],
    accelerations: &mut [SpatialAcceleration],
) -> Result<()> {
    rnea(state, None, external_wrenches, tau, wrenches, accelerations)
}
