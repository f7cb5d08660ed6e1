use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use rusty_irlba::prelude::*;

pub fn main() -> Result<()> {
    let nrows = 400;
    let ncols = 250;
    let rank = 5;

    let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
    let mat = f64::random_approximate_low_rank_matrix((nrows, ncols), 1.0, 1E-8, &mut rng)?;

    let options = IrlbaOptions {
        tolerance: 1E-10,
        ..IrlbaOptions::default()
    };
    let svd = solve(&mat, rank, &options)?;

    println!(
        "Converged: {} after {} iterations ({} breakdowns).",
        svd.converged, svd.iterations, svd.breakdowns
    );
    for (index, sigma) in svd.s.iter().enumerate() {
        println!("sigma_{} = {:.12e}", index, sigma);
    }
    println!(
        "Orthonormality error of U: {:.3e}, V: {:.3e}",
        orthonormality_error(svd.u.view()),
        orthonormality_error(svd.v.view())
    );
    println!(
        "Relative error of the rank {} approximation: {:.3e}",
        rank,
        f64::rel_diff_fro(svd.to_mat().view(), mat.view())
    );

    Ok(())
}
