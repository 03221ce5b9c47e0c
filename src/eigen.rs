//! Symmetric eigensolvers for the centered Gram matrix.
//!
//! Two paths:
//! - [`full_eigh`]: dense decomposition of all n eigenpairs (nalgebra
//!   `SymmetricEigen`).
//! - [`top_eigh`]: the p algebraically largest eigenpairs via block Krylov
//!   iteration with full reorthogonalization and Rayleigh–Ritz extraction.
//!   The basis is capped at an eighth of n; slowly converging spectra hand
//!   over to the full decomposition instead of growing it further.
//!
//! The Krylov path works directly on B, so eigenvalues of large magnitude at
//! the bottom of the spectrum (non-Euclidean input) are resolved alongside
//! the top ones rather than displacing them. Both paths return eigenpairs
//! sorted by descending eigenvalue with eigenvectors in columns.

use std::cmp::Ordering;

use log::{debug, trace, warn};
use nalgebra as na;
use ndarray::{s, Array1, Array2};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};

/// A column accepted into the Krylov basis must keep at least this fraction
/// of its norm after projection.
const DROP_TOLERANCE: f64 = 1e-8;

/// Attempts at drawing a random direction outside the current basis.
const MAX_RANDOM_DRAWS: usize = 4;

/// The Krylov basis may grow to at most n / MAX_BASIS_FRACTION columns.
const MAX_BASIS_FRACTION: usize = 8;

/// Eigenvalues (descending) and matching eigenvectors (columns).
#[derive(Debug, Clone)]
pub struct EigenPairs {
    /// Eigenvalues sorted in descending order.
    pub values: Array1<f64>,
    /// n × k, column j pairs with `values[j]`.
    pub vectors: Array2<f64>,
}

impl EigenPairs {
    /// Keep only the first `k` pairs.
    pub fn truncate(self, k: usize) -> Self {
        let k = k.min(self.values.len());
        Self {
            values: self.values.slice_move(s![..k]),
            vectors: self.vectors.slice_move(s![.., ..k]),
        }
    }
}

/// Parameters of the truncated solver.
#[derive(Debug, Clone, Copy)]
pub(crate) struct KrylovParams {
    pub oversample: usize,
    pub max_blocks: usize,
    pub tolerance: f64,
    pub seed: u64,
}

/// Full symmetric eigendecomposition, sorted descending.
pub fn full_eigh(mat: &Array2<f64>) -> EigenPairs {
    let n = mat.nrows();
    debug_assert_eq!(n, mat.ncols());

    let dm = na::DMatrix::<f64>::from_fn(n, n, |r, c| mat[[r, c]]);
    // Eigenvalues come back unordered; eigenvectors are columns.
    let se = na::SymmetricEigen::new(dm);

    let values = Array1::from_iter(se.eigenvalues.iter().copied());
    let ev = se.eigenvectors;
    let vectors = Array2::from_shape_fn((n, n), |(r, c)| ev[(r, c)]);

    let mut pairs = EigenPairs { values, vectors };
    sort_desc_inplace(&mut pairs);
    pairs
}

/// Sort eigenpairs in descending order, in place.
///
/// The sort is stable, so equal eigenvalues keep the solver's order.
pub fn sort_desc_inplace(pairs: &mut EigenPairs) {
    let vals = &pairs.values;
    let mut idx: Vec<usize> = (0..vals.len()).collect();
    idx.sort_by(|&i, &j| vals[j].partial_cmp(&vals[i]).unwrap_or(Ordering::Equal));

    let sorted_vals = Array1::from_iter(idx.iter().map(|&i| vals[i]));
    let mut sorted_vecs = Array2::<f64>::zeros(pairs.vectors.dim());
    for (new_c, &old_c) in idx.iter().enumerate() {
        sorted_vecs.column_mut(new_c).assign(&pairs.vectors.column(old_c));
    }

    pairs.values = sorted_vals;
    pairs.vectors = sorted_vecs;
}

/// Output of [`top_eigh`].
#[derive(Debug, Clone)]
pub(crate) struct TopEigen {
    pub pairs: EigenPairs,
    /// Final Krylov basis dimension; `None` when the full decomposition ran.
    pub basis_dim: Option<usize>,
}

/// Largest Krylov basis worth building for an n×n matrix. Past this the
/// repeated Rayleigh–Ritz work costs more than one full decomposition.
pub(crate) fn krylov_basis_limit(n: usize) -> usize {
    n / MAX_BASIS_FRACTION
}

fn full_fallback(mat: &Array2<f64>, p: usize) -> TopEigen {
    TopEigen {
        pairs: full_eigh(mat).truncate(p),
        basis_dim: None,
    }
}

/// Top-`p` eigenpairs of the symmetric matrix `mat` by algebraic value.
///
/// Falls back to [`full_eigh`] when the starting block already exceeds the
/// basis limit, or when the basis would outgrow it before converging.
pub(crate) fn top_eigh(mat: &Array2<f64>, p: usize, params: &KrylovParams) -> TopEigen {
    let n = mat.nrows();
    debug_assert_eq!(n, mat.ncols());
    let p = p.clamp(1, n);
    let limit = krylov_basis_limit(n);

    let block = (p + params.oversample).min(n);
    if block > limit {
        debug!("krylov block {block} exceeds basis limit {limit} for n = {n}, using full decomposition");
        return full_fallback(mat, p);
    }

    let mut krylov = Krylov::new(mat, params.seed);
    let start: Vec<Array1<f64>> = (0..block).map(|_| krylov.random_vector()).collect();
    let mut last = krylov.extend(start);

    let mut step = 0usize;
    loop {
        let ritz = krylov.ritz(p);
        let scale = ritz.spectral_scale;
        let worst = ritz.residuals.iter().copied().fold(0.0_f64, f64::max);
        trace!(
            "krylov step {step}: basis {} worst residual {worst:.3e} (scale {scale:.3e})",
            krylov.len()
        );

        if worst <= params.tolerance * scale || krylov.len() == n {
            debug!(
                "krylov converged after {} blocks with basis dimension {}",
                step + 1,
                krylov.len()
            );
            return TopEigen {
                pairs: ritz.pairs,
                basis_dim: Some(krylov.len()),
            };
        }
        if step + 1 >= params.max_blocks {
            warn!(
                "krylov solver stopped after {} blocks: residual {worst:.3e} exceeds {:.3e}",
                step + 1,
                params.tolerance * scale
            );
            return TopEigen {
                pairs: ritz.pairs,
                basis_dim: Some(krylov.len()),
            };
        }
        if krylov.len() + block > limit {
            debug!(
                "krylov basis {} would pass limit {limit} (residual {worst:.3e}), using full decomposition",
                krylov.len()
            );
            return full_fallback(mat, p);
        }

        let next: Vec<Array1<f64>> = last.map(|i| krylov.bq[i].clone()).collect();
        last = krylov.extend(next);
        step += 1;
    }
}

struct Ritz {
    pairs: EigenPairs,
    /// ‖B u - θ u‖ per returned pair.
    residuals: Vec<f64>,
    /// Largest |θ| over all Ritz values, a lower bound on ‖B‖.
    spectral_scale: f64,
}

/// Growing orthonormal Krylov basis Q with cached B·Q and QᵀBQ.
struct Krylov<'a> {
    mat: &'a Array2<f64>,
    q: Vec<Array1<f64>>,
    bq: Vec<Array1<f64>>,
    projected: Array2<f64>,
    rng: ChaCha8Rng,
}

impl<'a> Krylov<'a> {
    fn new(mat: &'a Array2<f64>, seed: u64) -> Self {
        Self {
            mat,
            q: Vec::new(),
            bq: Vec::new(),
            projected: Array2::zeros((0, 0)),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    fn len(&self) -> usize {
        self.q.len()
    }

    fn dim(&self) -> usize {
        self.mat.nrows()
    }

    fn random_vector(&mut self) -> Array1<f64> {
        let n = self.dim();
        Array1::from_iter((0..n).map(|_| StandardNormal.sample(&mut self.rng)))
    }

    /// Orthogonalize `v` against the basis (two passes) and normalize it.
    /// Returns false if too little of `v` survives the projection.
    fn orthonormalize(&self, v: &mut Array1<f64>) -> bool {
        let before = v.dot(v).sqrt();
        for _ in 0..2 {
            for qi in &self.q {
                let c = qi.dot(v);
                v.scaled_add(-c, qi);
            }
        }
        let after = v.dot(v).sqrt();
        if after == 0.0 || after <= DROP_TOLERANCE * before {
            return false;
        }
        *v /= after;
        true
    }

    /// Append candidates to the basis, replacing collapsed ones with random
    /// directions. Returns the index range of the appended columns.
    fn extend(&mut self, candidates: Vec<Array1<f64>>) -> std::ops::Range<usize> {
        let n = self.dim();
        let old = self.len();

        for mut v in candidates {
            if self.len() == n {
                break;
            }
            let mut accepted = self.orthonormalize(&mut v);
            let mut draws = 0;
            while !accepted && draws < MAX_RANDOM_DRAWS {
                v = self.random_vector();
                accepted = self.orthonormalize(&mut v);
                draws += 1;
            }
            if accepted {
                self.bq.push(self.mat.dot(&v));
                self.q.push(v);
            }
        }

        let m = self.len();
        let mut projected = Array2::<f64>::zeros((m, m));
        projected.slice_mut(s![..old, ..old]).assign(&self.projected);
        for j in old..m {
            for i in 0..=j {
                let v = 0.5 * (self.q[i].dot(&self.bq[j]) + self.q[j].dot(&self.bq[i]));
                projected[[i, j]] = v;
                projected[[j, i]] = v;
            }
        }
        self.projected = projected;

        old..m
    }

    /// Rayleigh–Ritz extraction of the top `p` pairs from the current basis.
    fn ritz(&self, p: usize) -> Ritz {
        let n = self.dim();
        let m = self.len();
        let small = full_eigh(&self.projected);
        let spectral_scale = small.values.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));

        let k = p.min(m);
        let small = small.truncate(k);

        let q = Array2::from_shape_fn((n, m), |(r, c)| self.q[c][r]);
        let bq = Array2::from_shape_fn((n, m), |(r, c)| self.bq[c][r]);
        let vectors = q.dot(&small.vectors);
        let b_vectors = bq.dot(&small.vectors);

        let residuals = (0..k)
            .map(|j| {
                let r = &b_vectors.column(j) - &(&vectors.column(j) * small.values[j]);
                r.dot(&r).sqrt()
            })
            .collect();

        Ritz {
            pairs: EigenPairs {
                values: small.values,
                vectors,
            },
            residuals,
            spectral_scale,
        }
    }
}
