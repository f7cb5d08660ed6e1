//! Ritz triplets of the projected matrix and their residual estimates.
//!
//! Let $B = P\Sigma Q^T$ be the SVD of the projected matrix of a factorization with
//! $AV = UB$ and $A^TU = VB^T + fe_w^T$. The Ritz triplets are
//! $(\sigma_i, Up_i, Vq_i)$ and satisfy $A(Vq_i) = \sigma_i Up_i$ exactly, while
//!
//! $$A^T(Up_i) - \sigma_i Vq_i = f\,p_{w,i}.$$
//!
//! The residual of triplet $i$ is therefore $\|f\|\,|p_{w,i}|$, the norm of the residual
//! vector times the last entry of the reduced coordinates of the triplet.

use crate::lanczos::BidiagonalFactorization;
use crate::types::{IrlbaError, Result};
use itertools::izip;
use ndarray::{s, Array1, Array2, ArrayView1};
use ndarray_linalg::{JobSvd, Norm, SVDDCInto};

/// Thresholds deciding when a Ritz triplet is accepted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvergenceCriteria {
    /// A triplet converges when its residual is at most `tolerance * sigma`
    /// or at most `tolerance`.
    pub tolerance: f64,
    /// If set, the relative change of the singular value since the previous
    /// evaluation must also be at most this value.
    pub ratio_tolerance: Option<f64>,
}

impl ConvergenceCriteria {
    fn accepts(&self, sigma: f64, residual: f64, previous: Option<f64>) -> bool {
        let residual = residual.abs();
        let small_residual = residual <= self.tolerance * sigma || residual <= self.tolerance;

        let stable = match (self.ratio_tolerance, previous) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(ratio), Some(previous)) => (sigma - previous).abs() <= ratio * sigma,
        };

        small_residual && stable
    }
}

/// Ritz triplets in reduced coordinates.
pub struct RitzSet {
    /// Singular values of the projected matrix in descending order.
    pub values: Array1<f64>,
    /// Left singular vectors of the projected matrix (columns).
    pub left: Array2<f64>,
    /// Right singular vectors of the projected matrix (columns).
    pub right: Array2<f64>,
    /// Signed residual estimates $\|f\|p_{w,i}$.
    pub residuals: Array1<f64>,
    /// Norm of the residual vector $f$.
    pub residual_norm: f64,
    /// Number of the leading requested triplets that passed the convergence test.
    pub converged: usize,
}

impl RitzSet {
    pub(crate) fn empty() -> Self {
        Self {
            values: Array1::zeros(0),
            left: Array2::zeros((0, 0)),
            right: Array2::zeros((0, 0)),
            residuals: Array1::zeros(0),
            residual_norm: 0.0,
            converged: 0,
        }
    }

    /// Number of triplets.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Decompose the leading `filled x filled` block of the projected matrix and test the
/// first `rank` Ritz triplets.
///
/// # Arguments
///
/// * `fac`: The factorization. Its first `filled` columns must be valid.
/// * `filled`: Number of valid Lanczos vectors.
/// * `rank`: Number of requested triplets.
/// * `criteria`: Convergence thresholds.
/// * `previous`: Singular values from the previous evaluation, if any.
pub fn evaluate(
    fac: &BidiagonalFactorization,
    filled: usize,
    rank: usize,
    criteria: &ConvergenceCriteria,
    previous: Option<ArrayView1<f64>>,
) -> Result<RitzSet> {
    if filled == 0 {
        return Ok(RitzSet::empty());
    }

    let projected = fac.b.slice(s![..filled, ..filled]).to_owned();
    let (left, values, right_t) = projected.svddc_into(JobSvd::All)?;
    let left = left.ok_or(IrlbaError::MissingSingularVectors)?;
    let right = right_t
        .ok_or(IrlbaError::MissingSingularVectors)?
        .reversed_axes();

    let residual_norm = fac.residual.norm_l2();
    let residuals = left.row(filled - 1).mapv(|item| residual_norm * item);

    let converged = izip!(values.iter(), residuals.iter())
        .take(rank)
        .enumerate()
        .filter(|(index, (sigma, residual))| {
            let before = previous.and_then(|prev| prev.get(*index).copied());
            criteria.accepts(**sigma, **residual, before)
        })
        .count();

    Ok(RitzSet {
        values,
        left,
        right,
        residuals,
        residual_norm,
        converged,
    })
}
