//! Generation of random test matrices with known singular values

use crate::types::{IrlbaError, Result};
use ndarray::{Array, Array1, Array2, ArrayView1};
use ndarray_linalg::{JobSvd, SVDDCInto};
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

pub trait RandomMatrix
where
    Self: Sized,
{
    /// Generate a random Gaussian matrix.
    ///
    /// # Arguments
    ///
    /// * `dimension`: Tuple (rows, cols) specifying the number of rows and columns.
    /// * `rng`: The random number generator to use.
    fn random_gaussian<R: Rng>(dimension: (usize, usize), rng: &mut R) -> Array2<Self>;

    /// Generate a random matrix with orthonormal rows or columns.
    ///
    /// If m > n then the returned matrix has orthonormal columns. If n > m
    /// the returned matrix has orthonormal rows.
    ///
    /// # Arguments
    ///
    /// * `dimension`: Tuple (rows, cols) specifying the number of rows and columns.
    /// * `rng`: The random number generator to use.
    fn random_orthogonal_matrix<R: Rng>(
        dimension: (usize, usize),
        rng: &mut R,
    ) -> Result<Array2<Self>>;

    /// Generate a matrix $U\Sigma V^T$ with prescribed singular values.
    ///
    /// Returns the matrix together with the factors $U$ and $V$, whose columns
    /// are the exact singular vectors.
    ///
    /// # Arguments
    ///
    /// * `dimension`: Tuple (rows, cols). The number of singular values must not
    ///                exceed min(rows, cols).
    /// * `singvals`: The singular values.
    /// * `rng`: The random number generator to use.
    fn random_matrix_with_singular_values<R: Rng>(
        dimension: (usize, usize),
        singvals: ArrayView1<Self>,
        rng: &mut R,
    ) -> Result<(Array2<Self>, Array2<Self>, Array2<Self>)>;

    /// Generate a random approximate low-rank matrix.
    ///
    /// The singular values are logarithmically distributed between
    /// `sigma_max` and `sigma_min`.
    fn random_approximate_low_rank_matrix<R: Rng>(
        dimension: (usize, usize),
        sigma_max: f64,
        sigma_min: f64,
        rng: &mut R,
    ) -> Result<Array2<Self>>;
}

impl RandomMatrix for f64 {
    fn random_gaussian<R: Rng>(dimension: (usize, usize), rng: &mut R) -> Array2<f64> {
        let mut mat = Array2::<f64>::zeros(dimension);
        mat.map_inplace(|item| *item = StandardNormal.sample(rng));
        mat
    }

    fn random_orthogonal_matrix<R: Rng>(
        dimension: (usize, usize),
        rng: &mut R,
    ) -> Result<Array2<f64>> {
        let (m, n) = if dimension.1 > dimension.0 {
            (dimension.1, dimension.0)
        } else {
            dimension
        };

        let mat = Self::random_gaussian((m, n), rng);
        let (u, _, _) = mat.svddc_into(JobSvd::Some)?;
        let u = u.ok_or(IrlbaError::MissingSingularVectors)?;

        // We always orthogonalize the tall matrix, so transpose back for wide requests.
        if dimension.1 > dimension.0 {
            Ok(u.reversed_axes())
        } else {
            Ok(u)
        }
    }

    fn random_matrix_with_singular_values<R: Rng>(
        dimension: (usize, usize),
        singvals: ArrayView1<f64>,
        rng: &mut R,
    ) -> Result<(Array2<f64>, Array2<f64>, Array2<f64>)> {
        let rank = singvals.len();
        assert!(
            rank <= std::cmp::min(dimension.0, dimension.1),
            "Number of singular values must not exceed the smaller dimension."
        );

        let u = Self::random_orthogonal_matrix((dimension.0, rank), rng)?;
        let v = Self::random_orthogonal_matrix((dimension.1, rank), rng)?;
        let mat = (&u * &singvals).dot(&v.t());

        Ok((mat, u, v))
    }

    fn random_approximate_low_rank_matrix<R: Rng>(
        dimension: (usize, usize),
        sigma_max: f64,
        sigma_min: f64,
        rng: &mut R,
    ) -> Result<Array2<f64>> {
        assert!(
            sigma_min < sigma_max,
            "`sigma_min` must be smaller than `sigma_max`"
        );
        assert!(sigma_min > 0.0, "`sigma_min` must be positive.");

        let min_dim = std::cmp::min(dimension.0, dimension.1);
        let mut singvals: Array1<f64> = Array::geomspace(sigma_max, sigma_min, min_dim)
            .unwrap_or_else(|| Array1::from_elem(min_dim, sigma_max));
        if min_dim == 1 {
            singvals[0] = sigma_max;
        }

        let (mat, _, _) = Self::random_matrix_with_singular_values(dimension, singvals.view(), rng)?;
        Ok(mat)
    }
}
