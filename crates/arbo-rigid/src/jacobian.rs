//! Geometric Jacobians over tree paths.

use crate::error::{DynamicsError, Result};
use arbo_math::{Frame, GeometricJacobian, Vec3};
use arbo_model::{BodyId, MechanismState};

/// Compute the geometric Jacobian of `body` with respect to `base` into
/// `out` (6 × nv): `J·v` is the twist of `body` relative to `base`,
/// expressed in `expressed_in`.
///
/// Columns of joints on the path from `body` to the common ancestor enter
/// with `+S`, those on the path from `base` with `−S`; all other columns
/// are zero.
pub fn geometric_jacobian(
    state: &mut MechanismState<'_>,
    body: BodyId,
    base: BodyId,
    expressed_in: Frame,
    out: &mut GeometricJacobian,
) -> Result<()> {
    let mech = state.mechanism();
    if out.ncols() != mech.nv() {
        return Err(DynamicsError::Dimension {
            expected: mech.nv(),
            got: out.ncols(),
        });
    }
    let world = mech.world_frame();
    let world_to_target = if expressed_in == world {
        None
    } else {
        Some(state.transform_to_root(expressed_in)?.inv())
    };
    state.update_motion_subspaces()?;
    let subspaces = state.motion_subspaces();

    out.fill_zero();
    out.body = mech.body(body).frame;
    out.base = mech.body(base).frame;
    out.frame = world;

    // +S up the body path, −S up the base path; shared ancestors cancel
    for (start, sign) in [(body, 1.0), (base, -1.0)] {
        let mut b = start;
        while let Some(j) = mech.joint_to_parent(b) {
            let sub = &subspaces[j];
            let col0 = mech.v_range(j).start;
            for c in 0..sub.ncols() {
                let ang: Vec3 = sub.angular.column(c).into_owned();
                let lin: Vec3 = sub.linear.column(c).into_owned();
                let mut out_ang = out.angular.column_mut(col0 + c);
                out_ang += ang * sign;
                let mut out_lin = out.linear.column_mut(col0 + c);
                out_lin += lin * sign;
            }
            b = mech.parent(b);
        }
    }

    if let Some(tf) = world_to_target {
        out.apply_transform(&tf)?;
    }
    Ok(())
}
