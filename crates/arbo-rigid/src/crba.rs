//! Composite Rigid Body Algorithm — joint-space mass matrix.

use crate::error::{DynamicsError, Result};
use arbo_math::{DMat, Momentum};
use arbo_model::MechanismState;

/// Compute the symmetric `nv × nv` mass matrix `M(q)` into `out`.
///
/// For each tree joint J, the columns of `F = I^c(successor(J)) · S_J` are
/// momenta per unit joint velocity (all in world frame); pairing them
/// against the subspace columns of J and of every ancestor joint A fills
/// `M[range(A), range(J)] = S_Aᵀ · F`, and the transpose by reflection.
/// The momentum columns live on the stack, so evaluation does not
/// allocate. Loop joints contribute nothing here — their constraint forces
/// enter forward dynamics through the constraint Jacobian.
pub fn mass_matrix(state: &mut MechanismState<'_>, out: &mut DMat) -> Result<()> {
    let mech = state.mechanism();
    let nv = mech.nv();
    if out.nrows() != nv || out.ncols() != nv {
        return Err(DynamicsError::Dimension {
            expected: nv,
            got: out.nrows().max(out.ncols()),
        });
    }
    state.update_motion_subspaces()?;
    state.update_crb_inertias()?;

    let subspaces = state.motion_subspaces();
    let crb = state.crb_inertias();
    out.fill(0.0);

    for j in 0..mech.num_tree_joints() {
        let s_j = &subspaces[j];
        let ic = &crb[mech.successor(j)];
        let width = s_j.ncols();

        // F columns, at most 6 per joint
        let mut f = [Momentum::zero(ic.frame); 6];
        for (c, f_c) in f[..width].iter_mut().enumerate() {
            *f_c = ic.mul_twist(&s_j.column_twist(c))?;
        }

        let col0 = mech.v_range(j).start;
        for i in 0..width {
            let twist_i = s_j.column_twist(i);
            for (c, f_c) in f[..width].iter().enumerate() {
                out[(col0 + i, col0 + c)] = f_c.dot(&twist_i)?;
            }
        }

        // walk up the ancestors of J's successor
        let mut body = mech.predecessor(j);
        while let Some(a) = mech.joint_to_parent(body) {
            let s_a = &subspaces[a];
            let row0 = mech.v_range(a).start;
            for i in 0..s_a.ncols() {
                let twist_i = s_a.column_twist(i);
                for (c, f_c) in f[..width].iter().enumerate() {
                    let value = f_c.dot(&twist_i)?;
                    out[(row0 + i, col0 + c)] = value;
                    out[(col0 + c, row0 + i)] = value;
                }
            }
            body = mech.parent(body);
        }
    }
    Ok(())
}
