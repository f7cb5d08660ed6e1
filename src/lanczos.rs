//! Lanczos bidiagonalization with full reorthogonalization.
//!
//! For an operator $A\in\mathbb{R}^{m\times n}$ the process builds matrices
//! $U\in\mathbb{R}^{m\times w}$ and $V\in\mathbb{R}^{n\times w}$ with orthonormal columns,
//! a small matrix $B\in\mathbb{R}^{w\times w}$ and a residual vector $f\in\mathbb{R}^n$ such that
//!
//! $$AV = UB,\qquad A^TU = VB^T + fe_w^T.$$
//!
//! Starting from a single unit vector in $V$ the matrix $B$ is upper bidiagonal with diagonal
//! $\alpha_j = B_{jj}$ and super-diagonal $\beta_j = B_{j,j+1}$. After a restart the leading
//! block of $B$ is diagonal and the column following it couples the kept directions to the
//! new start vector (see [crate::restart]). Extension only ever writes the bidiagonal entries
//! of the new steps, so both forms are handled by the same recurrence.
//!
//! Every new vector is reorthogonalized against all previous columns of its basis. When a
//! candidate vector vanishes (breakdown) it is replaced by a random vector orthogonal to the
//! current basis and the corresponding coefficient is set to zero, which keeps the relations
//! above intact. A candidate counts as vanished when reorthogonalization shrinks it below
//! [breakdown_tolerance] times the larger of the raw product norm and the largest
//! coefficient seen so far, so the test does not depend on the scale of $A$.

use crate::normal_sampler::NormalSampler;
use crate::orthogonalize::orthogonalize_vector;
use crate::types::LinearOperator;
use log::debug;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, ArrayViewMut1, ShapeBuilder};
use ndarray_linalg::Norm;
use rand::Rng;

/// Relative norm below which a Lanczos vector is considered to have vanished.
pub fn breakdown_tolerance() -> f64 {
    f64::EPSILON.powf(0.8)
}

/// Storage for a partial bidiagonalization.
///
/// All buffers are allocated once for the maximum working subspace size `work`
/// and reused for every extension and restart.
pub struct BidiagonalFactorization {
    pub(crate) u: Array2<f64>,
    pub(crate) v: Array2<f64>,
    pub(crate) b: Array2<f64>,
    pub(crate) residual: Array1<f64>,
    pub(crate) scratch_u: Array2<f64>,
    pub(crate) scratch_v: Array2<f64>,
    pub(crate) workspace: Array1<f64>,
    pub(crate) norm_estimate: f64,
}

impl BidiagonalFactorization {
    /// Allocate a factorization for an operator of shape (`nrows`, `ncols`).
    pub fn new(nrows: usize, ncols: usize, work: usize) -> Self {
        assert!(work > 0, "Working subspace must hold at least one vector.");
        assert!(
            work <= std::cmp::min(nrows, ncols),
            "Working subspace size {} exceeds the smaller operator dimension {}.",
            work,
            std::cmp::min(nrows, ncols)
        );

        Self {
            u: Array2::<f64>::zeros((nrows, work).f()),
            v: Array2::<f64>::zeros((ncols, work).f()),
            b: Array2::<f64>::zeros((work, work)),
            residual: Array1::<f64>::zeros(ncols),
            scratch_u: Array2::<f64>::zeros((nrows, work).f()),
            scratch_v: Array2::<f64>::zeros((ncols, work).f()),
            workspace: Array1::<f64>::zeros(work),
            norm_estimate: 0.0,
        }
    }

    /// Maximum number of Lanczos vectors.
    pub fn work(&self) -> usize {
        self.b.nrows()
    }

    /// Left Lanczos vectors.
    pub fn u(&self) -> ArrayView2<'_, f64> {
        self.u.view()
    }

    /// Right Lanczos vectors.
    pub fn v(&self) -> ArrayView2<'_, f64> {
        self.v.view()
    }

    /// The projected matrix $B = U^TAV$.
    pub fn b(&self) -> ArrayView2<'_, f64> {
        self.b.view()
    }

    /// The unnormalized residual left over from the last extension step.
    pub fn residual(&self) -> ArrayView1<'_, f64> {
        self.residual.view()
    }

    /// Largest coefficient of the projected matrix seen so far, a lower bound for $\|A\|$.
    pub fn norm_estimate(&self) -> f64 {
        self.norm_estimate
    }

    /// True if `norm`, the norm of a candidate after reorthogonalization, is negligible
    /// compared to `raw`, the norm of the operator product it came from.
    pub fn vanished(&self, norm: f64, raw: f64) -> bool {
        norm <= breakdown_tolerance() * raw.max(self.norm_estimate)
    }

    pub(crate) fn record(&mut self, coefficient: f64) {
        self.norm_estimate = self.norm_estimate.max(coefficient.abs());
    }

    pub fn alpha(&self, j: usize) -> f64 {
        self.b[[j, j]]
    }

    pub fn beta(&self, j: usize) -> f64 {
        self.b[[j, j + 1]]
    }

    /// Set the first right vector to `start / ||start||`. Returns false for a zero vector.
    pub fn set_start(&mut self, start: ArrayView1<f64>) -> bool {
        let norm = start.norm_l2();
        if !(norm > 0.0) || !norm.is_finite() {
            return false;
        }
        self.v.column_mut(0).assign(&start);
        self.v.column_mut(0).mapv_inplace(|item| item / norm);
        true
    }
}

/// Replaces vanished Lanczos vectors by random ones and keeps count.
pub struct Reseeder {
    max_retries: usize,
    count: usize,
}

impl Reseeder {
    /// `max_retries` is the number of random draws attempted per breakdown.
    pub fn new(max_retries: usize) -> Self {
        Self {
            max_retries: max_retries.max(1),
            count: 0,
        }
    }

    /// Number of breakdowns handled so far.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Fill `candidate` with a random unit vector orthogonal to the first `ncols` columns
    /// of `basis`. Returns false if no such vector could be found within the retry budget.
    pub fn reseed<R: Rng>(
        &mut self,
        mut candidate: ArrayViewMut1<f64>,
        basis: ArrayView2<f64>,
        ncols: usize,
        mut workspace: ArrayViewMut1<f64>,
        sampler: &mut NormalSampler<R>,
    ) -> bool {
        self.count += 1;

        for attempt in 0..self.max_retries {
            sampler.fill(candidate.view_mut());
            let raw = candidate.norm_l2();
            orthogonalize_vector(basis, candidate.view_mut(), ncols, workspace.view_mut());

            let norm = candidate.norm_l2();
            if norm > breakdown_tolerance() * raw {
                candidate /= norm;
                return true;
            }
            debug!(
                "Random replacement vector {} lies in the span of {} basis vectors.",
                attempt, ncols
            );
        }

        false
    }
}

/// Result of an extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extension {
    /// All requested steps were performed.
    Complete,
    /// A breakdown could not be repaired. Only the first `filled` columns are valid.
    Stalled { filled: usize },
}

/// Extend the factorization from `from` to `to` vectors.
///
/// On entry `V[:, from]` must hold a unit vector orthogonal to `V[:, ..from]` and the first
/// `from` columns of the factorization must be valid. On exit the first `to` columns of `U`
/// and `V` and the leading `to x to` block of `B` are valid and `residual` holds the
/// unnormalized vector $f$ of the final step.
pub fn extend<Op: LinearOperator + ?Sized, R: Rng>(
    op: &Op,
    fac: &mut BidiagonalFactorization,
    reseeder: &mut Reseeder,
    sampler: &mut NormalSampler<R>,
    from: usize,
    to: usize,
) -> Extension {
    assert!(
        from < to && to <= fac.work(),
        "Invalid Lanczos range {}..{} for a working subspace of size {}.",
        from,
        to,
        fac.work()
    );

    let mut w = op.matvec(fac.v.column(from));
    let raw = w.norm_l2();
    orthogonalize_vector(fac.u.view(), w.view_mut(), from, fac.workspace.view_mut());
    let mut alpha = w.norm_l2();
    if fac.vanished(alpha, raw) {
        debug!("Lanczos breakdown in left vector {}.", from);
        if !reseeder.reseed(w.view_mut(), fac.u.view(), from, fac.workspace.view_mut(), sampler) {
            fac.residual.fill(0.0);
            return Extension::Stalled { filled: from };
        }
        alpha = 0.0;
    } else {
        w /= alpha;
    }
    fac.u.column_mut(from).assign(&w);
    fac.b[[from, from]] = alpha;
    fac.record(alpha);

    for j in from..to {
        let mut f = op.conj_matvec(fac.u.column(j));
        let raw = f.norm_l2();
        f.scaled_add(-alpha, &fac.v.column(j));
        orthogonalize_vector(fac.v.view(), f.view_mut(), j + 1, fac.workspace.view_mut());

        if j + 1 == to {
            fac.residual.assign(&f);
            break;
        }

        let mut beta = f.norm_l2();
        if fac.vanished(beta, raw) {
            debug!("Lanczos breakdown in right vector {}.", j + 1);
            fac.residual.assign(&f);
            if !reseeder.reseed(f.view_mut(), fac.v.view(), j + 1, fac.workspace.view_mut(), sampler) {
                return Extension::Stalled { filled: j + 1 };
            }
            beta = 0.0;
        } else {
            f /= beta;
        }
        fac.v.column_mut(j + 1).assign(&f);
        fac.b[[j, j + 1]] = beta;
        fac.record(beta);

        let mut w = op.matvec(fac.v.column(j + 1));
        let raw = w.norm_l2();
        w.scaled_add(-beta, &fac.u.column(j));
        orthogonalize_vector(fac.u.view(), w.view_mut(), j + 1, fac.workspace.view_mut());

        alpha = w.norm_l2();
        if fac.vanished(alpha, raw) {
            debug!("Lanczos breakdown in left vector {}.", j + 1);
            if !reseeder.reseed(w.view_mut(), fac.u.view(), j + 1, fac.workspace.view_mut(), sampler) {
                // Fall back to the last consistent state, whose residual is beta * v_{j+1}.
                let residual = &fac.v.column(j + 1) * beta;
                fac.residual.assign(&residual);
                return Extension::Stalled { filled: j + 1 };
            }
            alpha = 0.0;
        } else {
            w /= alpha;
        }
        fac.u.column_mut(j + 1).assign(&w);
        fac.b[[j + 1, j + 1]] = alpha;
        fac.record(alpha);
    }

    Extension::Complete
}
