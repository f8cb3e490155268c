//! Momentum, center of mass, and energy utilities.

use crate::error::{DynamicsError, Result};
use arbo_math::{Momentum, MomentumMatrix, Vec3};
use arbo_model::{MechanismState, ModelError};

/// Total momentum of the mechanism, world frame.
pub fn momentum(state: &mut MechanismState<'_>) -> Result<Momentum> {
    state.update_twists()?;
    state.update_inertias()?;
    let mech = state.mechanism();
    let twists = state.twists();
    let inertias = state.inertias_in_world();

    let mut total = Momentum::zero(mech.world_frame());
    for body in 1..mech.num_bodies() {
        total = total.add(&inertias[body].mul_twist(&twists[body])?)?;
    }
    Ok(total)
}

/// Momentum matrix `A(q)` with `h = A·v`: block per tree joint is
/// `I^c(successor(J)) · S_J`, world frame.
pub fn momentum_matrix(state: &mut MechanismState<'_>, out: &mut MomentumMatrix) -> Result<()> {
    let mech = state.mechanism();
    if out.ncols() != mech.nv() {
        return Err(DynamicsError::Dimension {
            expected: mech.nv(),
            got: out.ncols(),
        });
    }
    state.update_motion_subspaces()?;
    state.update_crb_inertias()?;
    out.frame = mech.world_frame();
    let subspaces = state.motion_subspaces();
    let crb = state.crb_inertias();
    for j in 0..mech.num_tree_joints() {
        out.fill_mul_at(&crb[mech.successor(j)], &subspaces[j], mech.v_range(j).start)?;
    }
    Ok(())
}

/// Center of mass of the whole mechanism, world frame.
pub fn center_of_mass(state: &mut MechanismState<'_>) -> Result<Vec3> {
    state.update_inertias()?;
    let mech = state.mechanism();
    let inertias = state.inertias_in_world();

    let mut weighted = Vec3::zeros();
    let mut mass = 0.0;
    for inertia in inertias.iter().skip(1) {
        weighted += inertia.cross_part;
        mass += inertia.mass;
    }
    if mass <= 0.0 {
        return Err(ModelError::Topology("mechanism has no mass".to_string()).into());
    }
    Ok(weighted / mass)
}

/// Kinetic energy `½ Σ ⟨I_b·T_b, T_b⟩`.
pub fn kinetic_energy(state: &mut MechanismState<'_>) -> Result<f64> {
    state.update_twists()?;
    state.update_inertias()?;
    let mech = state.mechanism();
    let twists = state.twists();
    let inertias = state.inertias_in_world();

    let mut ke = 0.0;
    for body in 1..mech.num_bodies() {
        ke += inertias[body].kinetic_energy(&twists[body])?;
    }
    Ok(ke)
}

/// Gravitational potential energy `−Σ m_b g·c_b`, zero at the world origin.
pub fn gravitational_potential_energy(state: &mut MechanismState<'_>) -> Result<f64> {
    state.update_inertias()?;
    let mech = state.mechanism();
    let gravity = mech.gravity();
    let inertias = state.inertias_in_world();

    let mut pe = 0.0;
    for inertia in inertias.iter().skip(1) {
        // cross_part is m·c in world coordinates
        pe -= gravity.dot(&inertia.cross_part);
    }
    Ok(pe)
}

/// Total mechanical energy.
pub fn total_energy(state: &mut MechanismState<'_>) -> Result<f64> {
    Ok(kinetic_energy(state)? + gravitational_potential_energy(state)?)
}
