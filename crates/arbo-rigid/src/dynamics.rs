//! Forward dynamics with Lagrange-multiplier loop constraints.
//!
//! Solves
//!
//! ```text
//! M·v̇ + c(q, v) = τ + Kᵀ·λ
//! K·v̇ + k(q, v) = 0
//! ```
//!
//! by a Cholesky-based Schur complement: factor `M`, form
//! `A = K·M⁻¹·Kᵀ`, solve `A·λ = −(K·M⁻¹·(τ − c) + k)`, then
//! `v̇ = M⁻¹·(τ − c + Kᵀ·λ)`. Without loop joints the system reduces to
//! `M·v̇ = τ − c`.
//!
//! Constraint rows whose Jacobian is identically zero — directions a loop
//! joint would constrain but the spanning tree cannot move in at all, as in
//! planar linkages — carry no information and would make `A` singular; they
//! are dropped before the Schur solve and their multipliers reported as
//! zero. Rows that survive but leave `A` rank-deficient indicate genuinely
//! redundant constraints and fail with `RedundantConstraint`.

use crate::crba::mass_matrix;
use crate::error::{DynamicsError, Result};
use crate::rnea::rnea;
use arbo_math::{DMat, DVec, SpatialAcceleration, Wrench};
use arbo_model::{BodyId, Mechanism, MechanismState};
use std::collections::HashMap;

/// Row-norm threshold below which a constraint row is structurally inactive.
const INACTIVE_ROW_TOL: f64 = 1e-9;
/// Relative pivot threshold for declaring the Schur complement singular.
const SINGULAR_PIVOT_TOL: f64 = 1e-8;

/// Caller-owned, reusable output and scratch buffers for [`dynamics`].
///
/// Built for one mechanism revision; using it against a state of a
/// mechanism whose topology changed afterwards fails with `StaleState`.
#[derive(Debug, Clone)]
pub struct DynamicsResult {
    /// Joint accelerations `v̇`.
    pub vd: DVec,
    /// Loop-constraint Lagrange multipliers `λ`, one per constraint row.
    pub lambda: DVec,
    /// Mass matrix `M(q)`.
    pub mass_matrix: DMat,
    /// Bias torque `c(q, v)` (gravity and external wrenches included).
    pub dynamics_bias: DVec,
    /// Per-body joint wrenches (world frame), from the RNEA backward sweep.
    pub joint_wrenches: Vec<Wrench>,
    /// Per-body spatial accelerations (world frame).
    pub accelerations: Vec<SpatialAcceleration>,

    constraint_jacobian: DMat,
    constraint_bias: DVec,
    path_sign: Vec<i8>,
    active_rows: Vec<usize>,
    k_active: DMat,
    k_bias_active: DVec,
    lambda_active: DVec,
    rhs: DVec,
    factor: DMat,
    m_inv_kt: DMat,
    schur_factor: DMat,
    stabilization_gain: f64,
    version: u64,
}

impl DynamicsResult {
    pub fn new(mechanism: &Mechanism) -> Self {
        let nv = mechanism.nv();
        let nc = mechanism.nconstraint();
        let nb = mechanism.num_bodies();
        let world = mechanism.world_frame();
        Self {
            vd: DVec::zeros(nv),
            lambda: DVec::zeros(nc),
            mass_matrix: DMat::zeros(nv, nv),
            dynamics_bias: DVec::zeros(nv),
            joint_wrenches: vec![Wrench::zero(world); nb],
            accelerations: vec![SpatialAcceleration::zero(world, world, world); nb],
            constraint_jacobian: DMat::zeros(nc, nv),
            constraint_bias: DVec::zeros(nc),
            path_sign: vec![0; mechanism.num_tree_joints()],
            active_rows: Vec::with_capacity(nc),
            k_active: DMat::zeros(nc, nv),
            k_bias_active: DVec::zeros(nc),
            lambda_active: DVec::zeros(nc),
            rhs: DVec::zeros(nv),
            factor: DMat::zeros(nv, nv),
            m_inv_kt: DMat::zeros(nv, nc),
            schur_factor: DMat::zeros(nc, nc),
            stabilization_gain: 0.0,
            version: mechanism.version(),
        }
    }

    /// Enable velocity-residual stabilization of the loop constraints:
    /// `k ← k + gain·(K·v)`. The default gain is 0 (no stabilization).
    pub fn with_stabilization_gain(mut self, gain: f64) -> Self {
        self.stabilization_gain = gain;
        self
    }

    /// Constraint Jacobian `K` of the last solve (all rows, including
    /// structurally inactive ones).
    pub fn constraint_jacobian(&self) -> &DMat {
        &self.constraint_jacobian
    }

    /// Constraint bias `k` of the last solve.
    pub fn constraint_bias(&self) -> &DVec {
        &self.constraint_bias
    }
}

/// Assemble the loop-constraint rows: `K` pairs each loop joint's
/// constraint-wrench basis (world frame) against the relative Jacobian of
/// its successor with respect to its predecessor; `k` is the corresponding
/// acceleration-level bias, `⟨T, a_rel − tw(S) ×ₘ tw_rel⟩`.
fn assemble_constraints(state: &mut MechanismState<'_>, result: &mut DynamicsResult) -> Result<()> {
    state.update_constraint_subspaces()?;
    state.update_bias_accelerations()?;
    let mech = state.mechanism();
    let subspaces = state.motion_subspaces();
    let constraint_subspaces = state.constraint_subspaces();
    let twists = state.twists();
    let bias = state.bias_accelerations();

    result.constraint_jacobian.fill(0.0);
    let mut residual = [0.0_f64; 6];
    let mut row0 = 0;
    for (l, lj) in mech.loop_joints().iter().enumerate() {
        let t = &constraint_subspaces[l];
        let rows = t.ncols();

        // signed path membership: joints on the successor side enter with
        // +S, the predecessor side with -S; ancestors shared by both sides
        // drop out
        for (start, sign) in [(lj.successor, 1i8), (lj.predecessor, -1i8)] {
            let mut b = start;
            while let Some(j) = mech.joint_to_parent(b) {
                result.path_sign[j] += sign;
                b = mech.parent(b);
            }
        }
        for j in 0..mech.num_tree_joints() {
            let sign = result.path_sign[j];
            result.path_sign[j] = 0;
            if sign != 0 {
                t.pair_into(
                    &subspaces[j],
                    &mut result.constraint_jacobian,
                    row0,
                    mech.v_range(j).start,
                    f64::from(sign),
                )?;
            }
        }

        let rel_twist = twists[lj.successor].add(&twists[lj.predecessor].inv())?;
        let rel_bias = bias[lj.successor].add(&bias[lj.predecessor].inv())?;
        let correction = twists[lj.successor].inv().cross(&rel_twist)?;
        let corrected = rel_bias.add(&correction)?;
        t.pair_accel(
            &corrected,
            &mut result.constraint_bias.as_mut_slice()[row0..row0 + rows],
        )?;

        if result.stabilization_gain != 0.0 {
            t.pair_twist(&rel_twist, &mut residual[..rows])?;
            for (i, r) in residual[..rows].iter().enumerate() {
                result.constraint_bias[row0 + i] += result.stabilization_gain * r;
            }
        }
        row0 += rows;
    }
    Ok(())
}

/// Forward dynamics: compute `v̇` (and `λ` for loop constraints) from the
/// state, applied torques, and external wrenches (world frame, zero when
/// absent). All outputs land in `result`.
pub fn dynamics(
    state: &mut MechanismState<'_>,
    tau: &DVec,
    external_wrenches: &HashMap<BodyId, Wrench>,
    result: &mut DynamicsResult,
) -> Result<()> {
    let mech = state.mechanism();
    if result.version != mech.version() {
        return Err(DynamicsError::StaleState {
            expected: result.version,
            got: mech.version(),
        });
    }
    let nv = mech.nv();
    if tau.len() != nv {
        return Err(DynamicsError::Dimension {
            expected: nv,
            got: tau.len(),
        });
    }

    mass_matrix(state, &mut result.mass_matrix)?;
    rnea(
        state,
        None,
        external_wrenches,
        &mut result.dynamics_bias,
        &mut result.joint_wrenches,
        &mut result.accelerations,
    )?;

    result.rhs.copy_from(tau);
    result.rhs -= &result.dynamics_bias;

    // factor M, reusing the preallocated workspace
    result.factor.copy_from(&result.mass_matrix);
    let factor = std::mem::replace(&mut result.factor, DMat::zeros(0, 0));
    let chol = match factor.cholesky() {
        Some(chol) => chol,
        None => {
            // the workspace was consumed; restore its shape for reuse
            result.factor = DMat::zeros(nv, nv);
            return Err(DynamicsError::SingularInertia);
        }
    };

    // v̇ = M⁻¹·(τ − c); with constraints this is the unconstrained estimate u
    result.vd.copy_from(&result.rhs);
    chol.solve_mut(&mut result.vd);

    let nc = mech.nconstraint();
    if nc == 0 {
        result.factor = chol.unpack_dirty();
        return Ok(());
    }

    assemble_constraints(state, result)?;

    // drop structurally inactive rows
    result.active_rows.clear();
    for r in 0..nc {
        if result.constraint_jacobian.row(r).norm() > INACTIVE_ROW_TOL {
            result.active_rows.push(r);
        }
    }
    let na = result.active_rows.len();
    result.lambda.fill(0.0);
    if na == 0 {
        result.factor = chol.unpack_dirty();
        return Ok(());
    }
    for i in 0..na {
        let r = result.active_rows[i];
        for v in 0..nv {
            result.k_active[(i, v)] = result.constraint_jacobian[(r, v)];
        }
        result.k_bias_active[i] = result.constraint_bias[r];
    }

    // M⁻¹·Kᵀ over the active rows
    for c in 0..na {
        for v in 0..nv {
            result.m_inv_kt[(v, c)] = result.k_active[(c, v)];
        }
    }
    {
        let mut m_inv_kt = result.m_inv_kt.view_mut((0, 0), (nv, na));
        chol.solve_mut(&mut m_inv_kt);
    }

    // Schur complement A = K·M⁻¹·Kᵀ (active block)
    if result.schur_factor.nrows() != na {
        result.schur_factor = DMat::zeros(na, na);
        result.lambda_active = DVec::zeros(na);
    }
    result.schur_factor.gemm(
        1.0,
        &result.k_active.rows(0, na),
        &result.m_inv_kt.view((0, 0), (nv, na)),
        0.0,
    );

    // A·λ = −(K·u + k)
    result
        .lambda_active
        .gemv(1.0, &result.k_active.rows(0, na), &result.vd, 0.0);
    for i in 0..na {
        result.lambda_active[i] += result.k_bias_active[i];
    }
    result.lambda_active.neg_mut();

    let schur_factor = std::mem::replace(&mut result.schur_factor, DMat::zeros(0, 0));
    let schur_chol = match schur_factor.cholesky() {
        Some(chol) => chol,
        None => {
            result.factor = chol.unpack_dirty();
            result.schur_factor = DMat::zeros(na, na);
            return Err(DynamicsError::RedundantConstraint);
        }
    };
    // a numerically tiny pivot means linearly dependent active rows
    let l = schur_chol.l_dirty();
    let mut pivot_min = f64::INFINITY;
    let mut pivot_max: f64 = 0.0;
    for i in 0..na {
        pivot_min = pivot_min.min(l[(i, i)].abs());
        pivot_max = pivot_max.max(l[(i, i)].abs());
    }
    if pivot_min <= SINGULAR_PIVOT_TOL * pivot_max {
        result.factor = chol.unpack_dirty();
        result.schur_factor = schur_chol.unpack_dirty();
        return Err(DynamicsError::RedundantConstraint);
    }
    schur_chol.solve_mut(&mut result.lambda_active);
    result.schur_factor = schur_chol.unpack_dirty();

    for i in 0..na {
        let r = result.active_rows[i];
        result.lambda[r] = result.lambda_active[i];
    }

    // v̇ = M⁻¹·(τ − c + Kᵀ·λ)
    result.rhs.gemv_tr(
        1.0,
        &result.k_active.rows(0, na),
        &result.lambda_active,
        1.0,
    );
    result.vd.copy_from(&result.rhs);
    chol.solve_mut(&mut result.vd);
    result.factor = chol.unpack_dirty();
    Ok(())
}
