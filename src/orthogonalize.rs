//! Orthogonalization of a vector against a prefix of an orthonormal basis.

use ndarray::linalg::general_mat_vec_mul;
use ndarray::{s, ArrayView2, ArrayViewMut1};

/// Remove from `vector` its component in the span of the first `ncols` columns of `basis`.
///
/// The columns of `basis` are assumed to be orthonormal. Classical Gram-Schmidt is applied
/// twice, the second pass removing what cancellation left over from the first. Only
/// `vector` and the first `ncols` entries of `workspace` are written.
///
/// # Arguments
///
/// * `basis`: Matrix with orthonormal columns.
/// * `vector`: The vector to orthogonalize in place. Its length must match `basis.nrows()`.
/// * `ncols`: Number of leading columns of `basis` to project against. Zero is a no-op.
/// * `workspace`: Scratch space of length at least `ncols`.
pub fn orthogonalize_vector(
    basis: ArrayView2<f64>,
    mut vector: ArrayViewMut1<f64>,
    ncols: usize,
    mut workspace: ArrayViewMut1<f64>,
) {
    assert!(
        ncols <= basis.ncols(),
        "Cannot orthogonalize against {} columns of a basis with {} columns.",
        ncols,
        basis.ncols()
    );

    if ncols == 0 {
        return;
    }

    let basis = basis.slice_move(s![.., ..ncols]);
    let mut coefficients = workspace.slice_mut(s![..ncols]);

    for _ in 0..2 {
        general_mat_vec_mul(1.0, &basis.t(), &vector, 0.0, &mut coefficients);
        general_mat_vec_mul(-1.0, &basis, &coefficients, 1.0, &mut vector);
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::random_matrix::RandomMatrix;
    use ndarray::{arr1, arr2, Array1, Axis};
    use ndarray_linalg::Norm;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    #[test]
    fn test_orthogonalize_known_basis() {
        // Left singular vectors of a 5 x 4 Gaussian matrix.
        let basis = arr2(&[
            [0.1186600, 0.9038716, 0.10194199, 0.2484399218],
            [-0.3090796, -0.1659502, 0.52915799, -0.3366910627],
            [-0.3107643, -0.2636561, -0.35950860, 0.7248074228],
            [-0.1683330, 0.1634341, -0.75523159, -0.5473305105],
            [0.8749166, -0.2434161, -0.09989224, -0.0004957394],
        ]);
        let vector = arr1(&[-0.24054848, -0.04785069, -0.76491749, -0.65634291, 0.62815141]);
        let mut workspace = Array1::<f64>::zeros(4);

        let mut full = vector.clone();
        orthogonalize_vector(basis.view(), full.view_mut(), 4, workspace.view_mut());

        assert!(full.norm_l2() > 0.1);
        for col in basis.axis_iter(Axis(1)) {
            assert!(col.dot(&full).abs() < 1E-9);
        }

        let mut partial = vector.clone();
        orthogonalize_vector(basis.view(), partial.view_mut(), 2, workspace.view_mut());

        assert_ne!(full, partial);
        for col in basis.axis_iter(Axis(1)).take(2) {
            assert!(col.dot(&partial).abs() < 1E-9);
        }
    }

    #[test]
    fn test_zero_columns_is_noop() {
        let basis = Array1::<f64>::ones(3).insert_axis(Axis(1)) / 3f64.sqrt();
        let vector = arr1(&[1.0, 2.0, 3.0]);
        let mut workspace = Array1::<f64>::zeros(1);

        let mut copy = vector.clone();
        orthogonalize_vector(basis.view(), copy.view_mut(), 0, workspace.view_mut());

        assert_eq!(copy, vector);
    }

    #[test]
    fn test_orthogonalize_random_basis() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
        let basis = f64::random_orthogonal_matrix((200, 30), &mut rng).unwrap();
        let mut vector = f64::random_gaussian((200, 1), &mut rng).remove_axis(Axis(1));
        let mut workspace = Array1::<f64>::zeros(30);

        orthogonalize_vector(basis.view(), vector.view_mut(), 30, workspace.view_mut());

        let projection = basis.t().dot(&vector);
        assert!(projection.iter().all(|item| item.abs() < 1E-12 * vector.norm_l2().max(1.0)));
        assert!(vector.norm_l2() > 1.0);
    }

    #[test]
    #[should_panic(expected = "Cannot orthogonalize against 3 columns of a basis with 2 columns.")]
    fn test_too_many_columns_panics() {
        let basis = ndarray::Array2::<f64>::zeros((4, 2));
        let mut vector = Array1::<f64>::ones(4);
        let mut workspace = Array1::<f64>::zeros(3);

        orthogonalize_vector(basis.view(), vector.view_mut(), 3, workspace.view_mut());
    }
}
