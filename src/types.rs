//! This module collects the error type and the operator traits

use ndarray::{Array1, Array2, ArrayBase, ArrayView1, ArrayView2, Axis, Data, Ix2};
use ndarray_linalg::error::LinalgError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IrlbaError {
    #[error("Requested rank must be positive, got {rank}")]
    InvalidRank { rank: usize },
    #[error("Requested rank {rank} exceeds the smaller operator dimension {max}")]
    RankTooLarge { rank: usize, max: usize },
    #[error("Working subspace size {work} must be larger than the requested rank {rank}")]
    InvalidWorkingSubspace { work: usize, rank: usize },
    #[error("Tolerance must be positive and finite, got {0}")]
    InvalidTolerance(f64),
    #[error("At least one iteration is required")]
    InvalidIterationLimit,
    #[error("Starting vector must not be zero")]
    ZeroStartVector,
    #[error("Dimension mismatch: expected length {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("Scaling factor at index {index} is zero or not finite")]
    InvalidScale { index: usize },
    #[error("Lapack did not return singular vectors")]
    MissingSingularVectors,
    #[error("Lapack Error: {0}")]
    LinalgError(#[from] LinalgError),
}

pub type Result<T> = std::result::Result<T, IrlbaError>;

/// Matrix-Vector Product Trait
///
/// This trait defines an interface for operators that provide matrix-vector products.
pub trait MatVec {
    // Return the number of rows of the operator.
    fn nrows(&self) -> usize;

    // Return the number of columns of the operator.
    fn ncols(&self) -> usize;

    // Return the matrix vector product of an operator with a vector of length `ncols`.
    fn matvec(&self, vec: ArrayView1<f64>) -> Array1<f64>;
}

/// Matrix-Matrix Product Trait
///
/// This trait defines the application of a linear operator $A$ to a matrix X representing multiple columns.
/// A default implementation based on the `MatVec` trait applied to the individual columns of X is
/// provided for every operator.
pub trait MatMat: MatVec {
    // Return the matrix-matrix product of an operator with a matrix.
    fn matmat(&self, mat: ArrayView2<f64>) -> Array2<f64> {
        let mut output = Array2::<f64>::zeros((self.nrows(), mat.ncols()));

        for (index, col) in mat.axis_iter(Axis(1)).enumerate() {
            output
                .index_axis_mut(Axis(1), index)
                .assign(&self.matvec(col));
        }

        output
    }
}

/// Trait describing the product of the adjoint of an operator with a vector
///
/// In the case that the operator is a real matrix then this simply describes the action $A^Tx$,
/// where $x$ is a vector of length `nrows`.
pub trait ConjMatVec: MatVec {
    fn conj_matvec(&self, vec: ArrayView1<f64>) -> Array1<f64>;
}

/// Trait describing the action of the adjoint of an operator with a matrix
pub trait ConjMatMat: MatMat + ConjMatVec {
    // Return the product of the adjoint of `self` with a given matrix.
    fn conj_matmat(&self, mat: ArrayView2<f64>) -> Array2<f64> {
        let mut output = Array2::<f64>::zeros((self.ncols(), mat.ncols()));

        for (index, col) in mat.axis_iter(Axis(1)).enumerate() {
            output
                .index_axis_mut(Axis(1), index)
                .assign(&self.conj_matvec(col));
        }

        output
    }
}

impl<T: MatVec + ?Sized> MatMat for T {}
impl<T: ConjMatVec + ?Sized> ConjMatMat for T {}

/// The operator capability consumed by the solver.
///
/// Besides the products an operator may offer a dense materialization through `realize`.
/// This is only used as a shortcut for small problems and never needed for correctness, so
/// the default returns `None`. Types that only implement the products can opt in with an
/// empty `impl LinearOperator for MyType {}`.
pub trait LinearOperator: ConjMatMat {
    /// Return the tuple (rows, cols).
    fn dimensions(&self) -> (usize, usize) {
        (self.nrows(), self.ncols())
    }

    /// Return a dense copy of the operator if one can be formed cheaply.
    fn realize(&self) -> Option<Array2<f64>> {
        None
    }

    /// Return a dense copy of the operator, falling back to products with unit vectors.
    fn to_dense(&self) -> Array2<f64> {
        match self.realize() {
            Some(dense) => dense,
            None => self.matmat(Array2::<f64>::eye(self.ncols()).view()),
        }
    }
}

impl<S> MatVec for ArrayBase<S, Ix2>
where
    S: Data<Elem = f64>,
{
    fn nrows(&self) -> usize {
        self.nrows()
    }

    fn ncols(&self) -> usize {
        self.ncols()
    }

    fn matvec(&self, vec: ArrayView1<f64>) -> Array1<f64> {
        self.dot(&vec)
    }
}

impl<S> ConjMatVec for ArrayBase<S, Ix2>
where
    S: Data<Elem = f64>,
{
    fn conj_matvec(&self, vec: ArrayView1<f64>) -> Array1<f64> {
        self.t().dot(&vec)
    }
}

impl<S> LinearOperator for ArrayBase<S, Ix2>
where
    S: Data<Elem = f64>,
{
    fn realize(&self) -> Option<Array2<f64>> {
        Some(self.to_owned())
    }
}

impl<'a, T: MatVec + ?Sized> MatVec for &'a T {
    fn nrows(&self) -> usize {
        (**self).nrows()
    }

    fn ncols(&self) -> usize {
        (**self).ncols()
    }

    fn matvec(&self, vec: ArrayView1<f64>) -> Array1<f64> {
        (**self).matvec(vec)
    }
}

impl<'a, T: ConjMatVec + ?Sized> ConjMatVec for &'a T {
    fn conj_matvec(&self, vec: ArrayView1<f64>) -> Array1<f64> {
        (**self).conj_matvec(vec)
    }
}

impl<'a, T: LinearOperator + ?Sized> LinearOperator for &'a T {
    fn realize(&self) -> Option<Array2<f64>> {
        (**self).realize()
    }
}
