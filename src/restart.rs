//! Thick restart of a bidiagonal factorization.
//!
//! The leading `target` Ritz triplets are kept and the residual direction is appended
//! as the new start vector. With $u_i = Up_i$, $v_i = Vq_i$ and $v_t = f/\|f\|$ the
//! restarted factorization satisfies
//!
//! $$A v_i = \sigma_i u_i,\qquad A^T u_i = \sigma_i v_i + \rho_i v_t,$$
//!
//! where $\rho_i = \|f\|p_{w,i}$ are the signed residual estimates. The projected matrix
//! becomes $\mathrm{diag}(\sigma_1,\dots,\sigma_t)$ with the couplings $\rho_i$ stored in
//! column `t`, which the next extension picks up through reorthogonalization of
//! $Av_t$ against the kept left vectors.

use crate::convergence::RitzSet;
use crate::lanczos::{breakdown_tolerance, BidiagonalFactorization, Reseeder};
use crate::normal_sampler::NormalSampler;
use crate::orthogonalize::orthogonalize_vector;
use log::{debug, trace};
use ndarray::linalg::general_mat_mul;
use ndarray::{s, Axis};
use ndarray_linalg::Norm;
use rand::Rng;

/// Compress the factorization to `target` Ritz vectors plus the new start vector.
///
/// On success the first `target` columns of the factorization are valid and
/// `V[:, target]` holds the next start vector, so that extension can continue from
/// `target`. Returns false if the residual vanished and no replacement start vector
/// could be drawn. Only the scratch buffers are written in that case, the bases, the
/// projected matrix and the residual keep their values.
pub fn restart<R: Rng>(
    fac: &mut BidiagonalFactorization,
    ritz: &RitzSet,
    filled: usize,
    target: usize,
    reseeder: &mut Reseeder,
    sampler: &mut NormalSampler<R>,
) -> bool {
    assert!(
        target > 0 && target < fac.work() && target <= ritz.len() && ritz.len() == filled,
        "Cannot restart {} vectors to {} in a working subspace of size {}.",
        filled,
        target,
        fac.work()
    );

    general_mat_mul(
        1.0,
        &fac.u.slice(s![.., ..filled]),
        &ritz.left.slice(s![.., ..target]),
        0.0,
        &mut fac.scratch_u.slice_mut(s![.., ..target]),
    );
    general_mat_mul(
        1.0,
        &fac.v.slice(s![.., ..filled]),
        &ritz.right.slice(s![.., ..target]),
        0.0,
        &mut fac.scratch_v.slice_mut(s![.., ..target]),
    );

    let tol = breakdown_tolerance();
    let scale = ritz
        .values
        .iter()
        .fold(fac.norm_estimate(), |acc, &item| acc.max(item));

    // The new start vector is built in the first unused column of the scratch basis.
    let (kept, mut rest) = fac.scratch_v.view_mut().split_at(Axis(1), target);
    let mut next = rest.column_mut(0);
    let mut coupled = false;

    if ritz.residual_norm > tol * scale {
        next.assign(&fac.residual);
        next /= ritz.residual_norm;
        orthogonalize_vector(kept.view(), next.view_mut(), target, fac.workspace.view_mut());
        let norm = next.norm_l2();
        if norm > tol {
            next /= norm;
            coupled = true;
        }
    }

    if !coupled {
        debug!("Residual vanished on restart, drawing a new start vector.");
        if !reseeder.reseed(
            next.view_mut(),
            kept.view(),
            target,
            fac.workspace.view_mut(),
            sampler,
        ) {
            return false;
        }
    }

    std::mem::swap(&mut fac.u, &mut fac.scratch_u);
    std::mem::swap(&mut fac.v, &mut fac.scratch_v);

    fac.b.fill(0.0);
    for index in 0..target {
        fac.b[[index, index]] = ritz.values[index];
        if coupled {
            fac.b[[index, target]] = ritz.residuals[index];
        }
    }
    fac.record(scale);

    trace!("Restarted from {} to {} vectors.", filled, target);
    true
}
