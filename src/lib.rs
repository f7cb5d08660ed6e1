pub mod convergence;
pub mod helpers;
pub mod irlba;
pub mod lanczos;
pub mod normal_sampler;
pub mod orthogonalize;
pub mod prelude;
pub mod random_matrix;
pub mod restart;
pub mod types;
pub mod wrappers;

pub use irlba::{solve, solve_with_start, IrlbaOptions, TruncatedSvd};
pub use types::{IrlbaError, LinearOperator, Result};
