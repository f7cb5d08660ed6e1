//! Error measures used to check decompositions.

use ndarray::{Array2, ArrayView1, ArrayView2};
use ndarray_linalg::{Norm, OperationNorm};

pub trait RelDiff {
    type A;

    /// Return the relative Frobenius norm difference of `first` and `second`.
    fn rel_diff_fro(first: ArrayView2<Self::A>, second: ArrayView2<Self::A>) -> Self::A;

    /// Return the relative l2 vector norm difference of `first` and `second`.
    fn rel_diff_l2(first: ArrayView1<Self::A>, second: ArrayView1<Self::A>) -> Self::A;
}

macro_rules! rel_diff_impl {
    ($scalar:ty) => {
        impl RelDiff for $scalar {
            type A = $scalar;
            fn rel_diff_fro(first: ArrayView2<Self::A>, second: ArrayView2<Self::A>) -> Self::A {
                let diff = first.to_owned() - &second;
                diff.opnorm_fro().unwrap() / second.opnorm_fro().unwrap()
            }

            fn rel_diff_l2(first: ArrayView1<Self::A>, second: ArrayView1<Self::A>) -> Self::A {
                let diff = first.to_owned() - &second;
                diff.norm_l2() / second.norm_l2()
            }
        }
    };
}

rel_diff_impl!(f32);
rel_diff_impl!(f64);

/// Return $\max_{ij} |(Q^TQ - I)_{ij}|$ for a matrix `q` with (hopefully) orthonormal columns.
pub fn orthonormality_error(q: ArrayView2<f64>) -> f64 {
    let gram = q.t().dot(&q) - Array2::<f64>::eye(q.ncols());
    gram.iter().fold(0.0f64, |acc, item| acc.max(item.abs()))
}

#[cfg(test)]
mod tests {

    use super::*;
    use ndarray::{arr1, arr2};

    #[test]
    fn test_rel_diff() {
        let first = arr1(&[1.0, 2.0, 2.0]);
        let second = arr1(&[1.0, 2.0, 3.0]);

        assert!((f64::rel_diff_l2(first.view(), second.view()) - 1.0 / 14f64.sqrt()).abs() < 1E-14);

        let mat = arr2(&[[3.0, 0.0], [0.0, 4.0]]);
        let zero = Array2::<f64>::zeros((2, 2));
        assert!((f64::rel_diff_fro(zero.view(), mat.view()) - 1.0).abs() < 1E-14);
    }

    #[test]
    fn test_orthonormality_error() {
        let identity = Array2::<f64>::eye(3);
        assert_eq!(orthonormality_error(identity.view()), 0.0);

        let skewed = arr2(&[[1.0, 0.1], [0.0, 1.0]]);
        assert!((orthonormality_error(skewed.view()) - 0.1).abs() < 1E-14);
    }
}
