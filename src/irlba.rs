//! Truncated SVD by implicitly restarted Lanczos bidiagonalization.
//!
//! The solver keeps a bidiagonal factorization of at most `work` vectors. Each iteration
//! extends the factorization to its full size, computes the Ritz triplets of the
//! projected matrix and checks their residuals. If not all requested triplets have
//! converged the factorization is restarted with the leading Ritz vectors and the loop
//! continues.
//!
//! Small problems, and requests for a large share of the spectrum, are handed to a dense
//! SVD of the realized operator instead.

use crate::convergence::{evaluate, ConvergenceCriteria, RitzSet};
use crate::lanczos::{extend, BidiagonalFactorization, Extension, Reseeder};
use crate::normal_sampler::NormalSampler;
use crate::restart::restart;
use crate::types::{IrlbaError, LinearOperator, Result};
use log::{debug, info, trace, warn};
use ndarray::{s, Array1, Array2, ArrayView1};
use ndarray_linalg::{JobSvd, Norm, SVDDCInto};

/// Operators whose smaller dimension does not exceed this value are decomposed densely.
pub const SMALL_MATRIX_LIMIT: usize = 6;

/// Options of the solver.
///
/// Fields are public so that callers can override single values with struct update
/// syntax:
///
/// ```
/// use rusty_irlba::prelude::IrlbaOptions;
///
/// let options = IrlbaOptions {
///     tolerance: 1E-10,
///     ..IrlbaOptions::default()
/// };
/// assert_eq!(options.max_iterations, 1000);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct IrlbaOptions {
    /// Relative residual below which a Ritz triplet is accepted. Also used as an
    /// absolute floor for tiny singular values.
    pub tolerance: f64,
    /// Maximum relative change of the singular values between two iterations.
    pub singular_value_ratio_tolerance: Option<f64>,
    /// Maximum number of extend and evaluate cycles.
    pub max_iterations: usize,
    /// Size of the working subspace. Defaults to `rank + extra_work`.
    pub working_subspace_size: Option<usize>,
    /// Extra vectors used when `working_subspace_size` is not given.
    pub extra_work: usize,
    /// Number of Ritz vectors kept beyond the rank on restart. If not set the number
    /// grows with the number of converged triplets.
    pub restart_oversampling: Option<usize>,
    /// Reduce a rank above the smaller operator dimension instead of failing.
    pub cap_rank: bool,
    /// Use a dense SVD for operators with at most [SMALL_MATRIX_LIMIT] rows or columns.
    pub exact_for_small_matrix: bool,
    /// Use a dense SVD if the rank is at least half the smaller operator dimension.
    pub exact_for_large_rank: bool,
    /// Stop once more breakdowns than this have been repaired.
    pub max_breakdowns: usize,
    /// Random draws attempted to repair a single breakdown.
    pub max_breakdown_retries: usize,
    /// Seed of the random number generator.
    pub seed: u64,
}

impl Default for IrlbaOptions {
    fn default() -> Self {
        Self {
            tolerance: 1E-6,
            singular_value_ratio_tolerance: None,
            max_iterations: 1000,
            working_subspace_size: None,
            extra_work: 7,
            restart_oversampling: None,
            cap_rank: false,
            exact_for_small_matrix: true,
            exact_for_large_rank: true,
            max_breakdowns: 50,
            max_breakdown_retries: 5,
            seed: 5489,
        }
    }
}

/// How a validated problem is solved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Dense SVD of the realized operator.
    Exact,
    /// Restarted Lanczos with a working subspace of size `work`.
    Iterative { work: usize },
}

/// Outcome of [IrlbaOptions::validate].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Plan {
    /// The effective rank after capping.
    pub rank: usize,
    pub method: Method,
}

fn check_tolerance(tolerance: f64) -> Result<()> {
    if tolerance > 0.0 && tolerance.is_finite() {
        Ok(())
    } else {
        Err(IrlbaError::InvalidTolerance(tolerance))
    }
}

impl IrlbaOptions {
    /// Check the options against an operator of shape (`nrows`, `ncols`) and resolve the
    /// effective rank and working subspace size.
    pub fn validate(&self, nrows: usize, ncols: usize, rank: usize) -> Result<Plan> {
        check_tolerance(self.tolerance)?;
        if let Some(ratio) = self.singular_value_ratio_tolerance {
            check_tolerance(ratio)?;
        }
        if self.max_iterations == 0 {
            return Err(IrlbaError::InvalidIterationLimit);
        }
        if rank == 0 {
            return Err(IrlbaError::InvalidRank { rank });
        }

        let min_dim = std::cmp::min(nrows, ncols);
        let mut rank = rank;
        if rank > min_dim {
            if !self.cap_rank || min_dim == 0 {
                return Err(IrlbaError::RankTooLarge { rank, max: min_dim });
            }
            info!("Capping rank {} to the smaller operator dimension {}.", rank, min_dim);
            rank = min_dim;
        }

        let mut work = match self.working_subspace_size {
            Some(work) if work <= rank => {
                return Err(IrlbaError::InvalidWorkingSubspace { work, rank })
            }
            Some(work) => work,
            None => rank + std::cmp::max(self.extra_work, 1),
        };
        if work > min_dim {
            info!(
                "Capping working subspace size {} to the smaller operator dimension {}.",
                work, min_dim
            );
            work = min_dim;
        }

        let method = if self.exact_for_small_matrix && min_dim <= SMALL_MATRIX_LIMIT {
            info!("Operator of shape ({}, {}) is decomposed densely.", nrows, ncols);
            Method::Exact
        } else if self.exact_for_large_rank && 2 * rank >= min_dim {
            info!(
                "Rank {} is at least half of {}, using a dense decomposition.",
                rank, min_dim
            );
            Method::Exact
        } else if work <= rank {
            info!(
                "No room for a working subspace above rank {}, using a dense decomposition.",
                rank
            );
            Method::Exact
        } else {
            Method::Iterative { work }
        };

        Ok(Plan { rank, method })
    }
}

/// Leading singular triplets of an operator.
#[derive(Debug, Clone)]
pub struct TruncatedSvd {
    /// Left singular vectors (columns).
    pub u: Array2<f64>,
    /// Singular values in descending order.
    pub s: Array1<f64>,
    /// Right singular vectors (columns).
    pub v: Array2<f64>,
    /// True if all requested triplets satisfied the convergence test.
    pub converged: bool,
    /// Number of extend and evaluate cycles performed.
    pub iterations: usize,
    /// Number of breakdowns repaired with random vectors.
    pub breakdowns: usize,
}

impl TruncatedSvd {
    /// Number of returned triplets.
    pub fn rank(&self) -> usize {
        self.s.len()
    }

    /// Return the low-rank approximation $U\Sigma V^T$.
    pub fn to_mat(&self) -> Array2<f64> {
        (&self.u * &self.s).dot(&self.v.t())
    }
}

/// Compute the `rank` largest singular triplets of `op`.
///
/// # Arguments
///
/// * `op`: The operator.
/// * `rank`: Number of requested triplets.
/// * `options`: Solver options. See [IrlbaOptions].
///
/// Non-convergence is not an error. The result then has `converged = false` and holds the
/// current approximations, with orthonormal singular vectors.
pub fn solve<Op: LinearOperator + ?Sized>(
    op: &Op,
    rank: usize,
    options: &IrlbaOptions,
) -> Result<TruncatedSvd> {
    solve_impl(op, rank, options, None)
}

/// Like [solve] but start the Lanczos process from the right vector `start`.
pub fn solve_with_start<Op: LinearOperator + ?Sized>(
    op: &Op,
    rank: usize,
    options: &IrlbaOptions,
    start: ArrayView1<f64>,
) -> Result<TruncatedSvd> {
    if start.len() != op.ncols() {
        return Err(IrlbaError::DimensionMismatch {
            expected: op.ncols(),
            found: start.len(),
        });
    }
    if !(start.norm_l2() > 0.0) {
        return Err(IrlbaError::ZeroStartVector);
    }

    solve_impl(op, rank, options, Some(start))
}

fn solve_impl<Op: LinearOperator + ?Sized>(
    op: &Op,
    rank: usize,
    options: &IrlbaOptions,
    start: Option<ArrayView1<f64>>,
) -> Result<TruncatedSvd> {
    let (nrows, ncols) = op.dimensions();
    let plan = options.validate(nrows, ncols, rank)?;

    match plan.method {
        Method::Exact => exact_svd(op, plan.rank),
        Method::Iterative { work } => Solver::new(op, plan.rank, work, options).run(start),
    }
}

fn exact_svd<Op: LinearOperator + ?Sized>(op: &Op, rank: usize) -> Result<TruncatedSvd> {
    let (u, sigma, vt) = op.to_dense().svddc_into(JobSvd::Some)?;
    let u = u.ok_or(IrlbaError::MissingSingularVectors)?;
    let vt = vt.ok_or(IrlbaError::MissingSingularVectors)?;

    Ok(TruncatedSvd {
        u: u.slice(s![.., ..rank]).to_owned(),
        s: sigma.slice(s![..rank]).to_owned(),
        v: vt.slice(s![..rank, ..]).t().to_owned(),
        converged: true,
        iterations: 0,
        breakdowns: 0,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SolverState {
    Extending { from: usize },
    Evaluating { filled: usize, stalled: bool },
    Restarting { filled: usize },
    Done { filled: usize, converged: bool },
}

struct Solver<'a, Op: LinearOperator + ?Sized> {
    op: &'a Op,
    rank: usize,
    work: usize,
    options: &'a IrlbaOptions,
    criteria: ConvergenceCriteria,
    fac: BidiagonalFactorization,
    sampler: NormalSampler,
    reseeder: Reseeder,
}

impl<'a, Op: LinearOperator + ?Sized> Solver<'a, Op> {
    fn new(op: &'a Op, rank: usize, work: usize, options: &'a IrlbaOptions) -> Self {
        let (nrows, ncols) = op.dimensions();
        Self {
            op,
            rank,
            work,
            options,
            criteria: ConvergenceCriteria {
                tolerance: options.tolerance,
                ratio_tolerance: options.singular_value_ratio_tolerance,
            },
            fac: BidiagonalFactorization::new(nrows, ncols, work),
            sampler: NormalSampler::new(options.seed),
            reseeder: Reseeder::new(options.max_breakdown_retries),
        }
    }

    /// Number of Ritz vectors kept on restart.
    fn restart_size(&self, converged: usize) -> usize {
        let target = match self.options.restart_oversampling {
            Some(oversampling) => self.rank.saturating_add(oversampling),
            None => {
                let target = self.rank + std::cmp::min(converged, (self.work - self.rank) / 2);
                if target == 1 && self.work > 3 {
                    self.work / 2
                } else {
                    target
                }
            }
        };
        target.max(self.rank).min(self.work - 1)
    }

    fn run(mut self, start: Option<ArrayView1<f64>>) -> Result<TruncatedSvd> {
        let start = match start {
            Some(start) => start.to_owned(),
            None => {
                let mut start = Array1::<f64>::zeros(self.fac.v.nrows());
                self.sampler.fill(start.view_mut());
                start
            }
        };
        if !self.fac.set_start(start.view()) {
            return Err(IrlbaError::ZeroStartVector);
        }

        let mut ritz = RitzSet::empty();
        let mut previous: Option<Array1<f64>> = None;
        let mut iterations = 0;
        let mut state = SolverState::Extending { from: 0 };

        let (filled, converged) = loop {
            trace!("Solver state: {:?}", state);
            state = match state {
                SolverState::Extending { from } => {
                    match extend(
                        self.op,
                        &mut self.fac,
                        &mut self.reseeder,
                        &mut self.sampler,
                        from,
                        self.work,
                    ) {
                        Extension::Complete => SolverState::Evaluating {
                            filled: self.work,
                            stalled: false,
                        },
                        Extension::Stalled { filled } => {
                            debug!("Lanczos extension stalled after {} vectors.", filled);
                            SolverState::Evaluating {
                                filled,
                                stalled: true,
                            }
                        }
                    }
                }
                SolverState::Evaluating { filled, stalled } => {
                    iterations += 1;
                    ritz = evaluate(
                        &self.fac,
                        filled,
                        self.rank,
                        &self.criteria,
                        previous.as_ref().map(|values| values.view()),
                    )?;

                    let max_residual = ritz
                        .residuals
                        .iter()
                        .take(self.rank)
                        .fold(0.0f64, |acc, item| acc.max(item.abs()));
                    debug!(
                        "Iteration {}: {} of {} triplets converged, largest residual {:.3e}.",
                        iterations, ritz.converged, self.rank, max_residual
                    );

                    if ritz.converged >= self.rank {
                        SolverState::Done {
                            filled,
                            converged: true,
                        }
                    } else if stalled || self.reseeder.count() > self.options.max_breakdowns {
                        warn!(
                            "Stopping after {} breakdowns with {} of {} triplets converged.",
                            self.reseeder.count(),
                            ritz.converged,
                            self.rank
                        );
                        SolverState::Done {
                            filled,
                            converged: false,
                        }
                    } else if iterations >= self.options.max_iterations {
                        warn!(
                            "No convergence within {} iterations, {} of {} triplets converged.",
                            iterations, ritz.converged, self.rank
                        );
                        SolverState::Done {
                            filled,
                            converged: false,
                        }
                    } else {
                        previous = Some(ritz.values.clone());
                        SolverState::Restarting { filled }
                    }
                }
                SolverState::Restarting { filled } => {
                    let target = self.restart_size(ritz.converged);
                    if restart(
                        &mut self.fac,
                        &ritz,
                        filled,
                        target,
                        &mut self.reseeder,
                        &mut self.sampler,
                    ) {
                        SolverState::Extending { from: target }
                    } else {
                        warn!("Restart failed to find a new start vector.");
                        SolverState::Done {
                            filled,
                            converged: false,
                        }
                    }
                }
                SolverState::Done { filled, converged } => break (filled, converged),
            };
        };

        let rank = std::cmp::min(self.rank, ritz.len());
        let u = self
            .fac
            .u
            .slice(s![.., ..filled])
            .dot(&ritz.left.slice(s![.., ..rank]));
        let v = self
            .fac
            .v
            .slice(s![.., ..filled])
            .dot(&ritz.right.slice(s![.., ..rank]));

        Ok(TruncatedSvd {
            u,
            s: ritz.values.slice(s![..rank]).to_owned(),
            v,
            converged,
            iterations,
            breakdowns: self.reseeder.count(),
        })
    }
}
