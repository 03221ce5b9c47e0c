//! Torgerson double centering.
//!
//! Builds the Gram-like matrix
//!
//! ```text
//! B = -1/2 * J (D ∘ D) J,    J = I - (1/n) 1 1ᵀ
//! ```
//!
//! through the additive identity
//! `B[i,j] = -1/2 (D²[i,j] - rowMean_i - colMean_j + grandMean)`,
//! so the centering matrix J is never formed. Row and column means are kept
//! separate: a square input need not be symmetric.

use log::warn;
use ndarray::parallel::prelude::*;
use ndarray::{Array1, Array2, Axis};

use crate::error::{Error, Result};

/// Double-center `-1/2 * D∘D` and symmetrize the result.
///
/// Fails with [`Error::Overflow`] when finite dissimilarities square past
/// `f64::MAX` and leave an infinite or NaN entry in B.
pub fn gram_matrix(dist: &Array2<f64>) -> Result<Array2<f64>> {
    let mut b = Array2::<f64>::zeros(dist.dim());
    let (row_means, col_means, grand_mean) = squared_means(dist, &mut b);
    center_inplace(&row_means, &col_means, grand_mean, &mut b);
    symmetrize_inplace(&mut b);

    if let Some(((row, col), v)) = b.indexed_iter().find(|(_, v)| !v.is_finite()) {
        warn!("centered matrix entry ({row}, {col}) is {v}");
        return Err(Error::Overflow { row, col });
    }
    Ok(b)
}

/// Fill `out` with D∘D; return its row means, column means and grand mean.
/// Rows are squared in parallel.
fn squared_means(dist: &Array2<f64>, out: &mut Array2<f64>) -> (Array1<f64>, Array1<f64>, f64) {
    let n = dist.nrows();
    debug_assert_eq!(n, dist.ncols());
    debug_assert_eq!(out.dim(), (n, n));

    let row_sums: Vec<f64> = out
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .map(|(i, mut row)| {
            let di = dist.row(i);
            let mut sum = 0.0;
            for j in 0..n {
                let sq = di[j] * di[j];
                row[j] = sq;
                sum += sq;
            }
            sum
        })
        .collect();

    let nf = n as f64;
    let row_means = Array1::from_iter(row_sums.iter().map(|s| *s / nf));
    let col_means = out.sum_axis(Axis(0)) / nf;
    let grand_mean = row_sums.iter().sum::<f64>() / nf / nf;
    (row_means, col_means, grand_mean)
}

/// `B[i,j] = -1/2 (E[i,j] - r_i - c_j + g)`, in place over E = D∘D.
fn center_inplace(row_means: &Array1<f64>, col_means: &Array1<f64>, grand_mean: f64, b: &mut Array2<f64>) {
    let n = b.nrows();
    debug_assert_eq!(row_means.len(), n);
    debug_assert_eq!(col_means.len(), n);

    b.axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(i, mut row)| {
            let shift = grand_mean - row_means[i];
            for j in 0..n {
                row[j] = -0.5 * (row[j] + shift - col_means[j]);
            }
        });
}

/// Replace `a` with `(a + aᵀ) / 2`.
pub(crate) fn symmetrize_inplace(a: &mut Array2<f64>) {
    let n = a.nrows();
    debug_assert_eq!(n, a.ncols());
    for i in 0..n {
        for j in (i + 1)..n {
            let s = 0.5 * (a[[i, j]] + a[[j, i]]);
            a[[i, j]] = s;
            a[[j, i]] = s;
        }
    }
}
