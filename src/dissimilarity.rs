//! Shape resolution for dissimilarity input.
//!
//! A dissimilarity matrix arrives either as a full n×n matrix or in condensed
//! form: the n(n-1)/2 upper-triangle entries in row-major order
//! `(0,1), (0,2), …, (0,n-1), (1,2), …, (n-2,n-1)`, stored as a single row or
//! column. A single-row (or single-column) matrix is always read as condensed,
//! so a 1×1 input describes two points.

use log::debug;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

use crate::error::{Error, Result, ShapeViolation};

/// Resolve `dist` into a full square matrix.
///
/// Condensed input is expanded into the symmetric zero-diagonal matrix it
/// describes; square input is copied as-is (symmetry and a zero diagonal are
/// not enforced).
pub fn resolve(dist: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
    let (rows, cols) = dist.dim();
    if rows == 0 || cols == 0 {
        return Err(Error::InvalidShape {
            rows,
            cols,
            violation: ShapeViolation::Empty,
        });
    }

    if rows == 1 || cols == 1 {
        // Row or column: iterate in logical order either way.
        let flat: Array1<f64> = dist.iter().copied().collect();
        return expand_condensed(flat.view(), rows, cols);
    }

    if rows != cols {
        return Err(Error::InvalidShape {
            rows,
            cols,
            violation: ShapeViolation::NotSquare,
        });
    }

    if let Some(((row, col), _)) = dist.indexed_iter().find(|(_, v)| !v.is_finite()) {
        return Err(Error::NonFinite { row, col });
    }

    debug!("dissimilarity input is a square {rows}x{cols} matrix");
    Ok(dist.to_owned())
}

/// Number of points described by a condensed vector of length `m`, if any.
pub fn points_for_condensed_len(m: usize) -> Option<usize> {
    if m == 0 {
        return None;
    }
    let n = ((2 * m) as f64).sqrt().ceil() as usize;
    (n * (n - 1) / 2 == m).then_some(n)
}

/// Expand a condensed vector into its full symmetric matrix.
///
/// `rows`/`cols` only feed error reporting.
fn expand_condensed(condensed: ArrayView1<'_, f64>, rows: usize, cols: usize) -> Result<Array2<f64>> {
    let m = condensed.len();
    let n = points_for_condensed_len(m).ok_or(Error::InvalidShape {
        rows,
        cols,
        violation: ShapeViolation::CondensedLength { len: m },
    })?;

    let mut full = Array2::<f64>::zeros((n, n));
    let mut idx = 0usize;
    for i in 0..n {
        for j in (i + 1)..n {
            let v = condensed[idx];
            if !v.is_finite() {
                return Err(Error::NonFinite { row: i, col: j });
            }
            if v < 0.0 {
                return Err(Error::InvalidShape {
                    rows,
                    cols,
                    violation: ShapeViolation::NegativeEntry { index: idx, value: v },
                });
            }
            full[[i, j]] = v;
            full[[j, i]] = v;
            idx += 1;
        }
    }

    debug!("expanded condensed vector of length {m} into {n}x{n} matrix");
    Ok(full)
}

/// Condensed (upper-triangle, row-major) form of a square matrix.
///
/// Only the upper triangle is read; the diagonal is dropped.
pub fn to_condensed(dist: &Array2<f64>) -> Result<Array1<f64>> {
    let (rows, cols) = dist.dim();
    if rows == 0 || cols == 0 {
        return Err(Error::InvalidShape {
            rows,
            cols,
            violation: ShapeViolation::Empty,
        });
    }
    if rows != cols {
        return Err(Error::InvalidShape {
            rows,
            cols,
            violation: ShapeViolation::NotSquare,
        });
    }

    let n = rows;
    let mut out = Vec::with_capacity(n * (n - 1) / 2);
    for i in 0..n {
        for j in (i + 1)..n {
            out.push(dist[[i, j]]);
        }
    }
    Ok(Array1::from(out))
}
