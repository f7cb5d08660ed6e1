//! Lazy centering and scaling of operators.
//!
//! Principal component analysis needs the singular values of a column-centered and
//! possibly column-scaled matrix. Forming that matrix destroys sparsity or any other
//! structure of the original operator, so the wrappers here apply the correction on
//! the fly inside the products.

use crate::types::{ConjMatVec, IrlbaError, LinearOperator, MatVec, Result};
use ndarray::{Array1, Array2, ArrayView1, Axis};

/// The operator $A - \mathbf{1}c^T$, subtracting `centers[j]` from every entry of column `j`.
pub struct Centered<Op> {
    inner: Op,
    centers: Array1<f64>,
}

impl<Op: LinearOperator> Centered<Op> {
    /// Wrap `inner` with one center per column.
    pub fn new(inner: Op, centers: Array1<f64>) -> Result<Self> {
        if centers.len() != inner.ncols() {
            return Err(IrlbaError::DimensionMismatch {
                expected: inner.ncols(),
                found: centers.len(),
            });
        }
        Ok(Self { inner, centers })
    }

    /// Wrap `inner` with its column means, computed from products with the ones vector.
    pub fn from_column_means(inner: Op) -> Self {
        let nrows = inner.nrows();
        let mut centers = inner.conj_matvec(Array1::<f64>::ones(nrows).view());
        if nrows > 0 {
            centers /= nrows as f64;
        }
        Self { inner, centers }
    }

    pub fn centers(&self) -> ArrayView1<'_, f64> {
        self.centers.view()
    }

    pub fn into_inner(self) -> Op {
        self.inner
    }
}

impl<Op: LinearOperator> MatVec for Centered<Op> {
    fn nrows(&self) -> usize {
        self.inner.nrows()
    }

    fn ncols(&self) -> usize {
        self.inner.ncols()
    }

    fn matvec(&self, vec: ArrayView1<f64>) -> Array1<f64> {
        let shift = self.centers.dot(&vec);
        let mut result = self.inner.matvec(vec);
        result.mapv_inplace(|item| item - shift);
        result
    }
}

impl<Op: LinearOperator> ConjMatVec for Centered<Op> {
    fn conj_matvec(&self, vec: ArrayView1<f64>) -> Array1<f64> {
        let total = vec.sum();
        let mut result = self.inner.conj_matvec(vec);
        result.scaled_add(-total, &self.centers);
        result
    }
}

impl<Op: LinearOperator> LinearOperator for Centered<Op> {
    fn realize(&self) -> Option<Array2<f64>> {
        let mut dense = self.inner.realize()?;
        dense -= &self.centers.view().insert_axis(Axis(0));
        Some(dense)
    }
}

/// The operator $A\,\mathrm{diag}(s)^{-1}$, dividing column `j` by `scale[j]`.
pub struct Scaled<Op> {
    inner: Op,
    scale: Array1<f64>,
}

impl<Op: LinearOperator> Scaled<Op> {
    /// Wrap `inner` with one scaling factor per column. Factors must be finite and nonzero.
    pub fn new(inner: Op, scale: Array1<f64>) -> Result<Self> {
        if scale.len() != inner.ncols() {
            return Err(IrlbaError::DimensionMismatch {
                expected: inner.ncols(),
                found: scale.len(),
            });
        }
        if let Some(index) = scale
            .iter()
            .position(|&item| item == 0.0 || !item.is_finite())
        {
            return Err(IrlbaError::InvalidScale { index });
        }
        Ok(Self { inner, scale })
    }

    pub fn scale(&self) -> ArrayView1<'_, f64> {
        self.scale.view()
    }

    pub fn into_inner(self) -> Op {
        self.inner
    }
}

impl<Op: LinearOperator> MatVec for Scaled<Op> {
    fn nrows(&self) -> usize {
        self.inner.nrows()
    }

    fn ncols(&self) -> usize {
        self.inner.ncols()
    }

    fn matvec(&self, vec: ArrayView1<f64>) -> Array1<f64> {
        let scaled = &vec / &self.scale;
        self.inner.matvec(scaled.view())
    }
}

impl<Op: LinearOperator> ConjMatVec for Scaled<Op> {
    fn conj_matvec(&self, vec: ArrayView1<f64>) -> Array1<f64> {
        self.inner.conj_matvec(vec) / &self.scale
    }
}

impl<Op: LinearOperator> LinearOperator for Scaled<Op> {
    fn realize(&self) -> Option<Array2<f64>> {
        let mut dense = self.inner.realize()?;
        dense /= &self.scale.view().insert_axis(Axis(0));
        Some(dense)
    }
}
