//! Collect all traits and other exports here.

pub use crate::helpers::*;
pub use crate::irlba::{
    solve, solve_with_start, IrlbaOptions, Method, Plan, TruncatedSvd, SMALL_MATRIX_LIMIT,
};
pub use crate::normal_sampler::NormalSampler;
pub use crate::orthogonalize::orthogonalize_vector;
pub use crate::random_matrix::RandomMatrix;
pub use crate::types::{ConjMatMat, ConjMatVec, IrlbaError, LinearOperator, MatMat, MatVec, Result};
pub use crate::wrappers::{Centered, Scaled};
