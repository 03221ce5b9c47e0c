//! The embedding pipeline: options, solver selection, eigenvalue filtering,
//! scaling and sign normalization.

use log::debug;
use ndarray::{Array1, Array2, ArrayView2, Axis};

use crate::centering::gram_matrix;
use crate::dissimilarity::resolve;
use crate::eigen::{full_eigh, krylov_basis_limit, top_eigh, EigenPairs, KrylovParams};
use crate::error::Result;

/// Eigensolver selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Solver {
    /// Truncated when the Krylov block `p + oversample` fits in an eighth
    /// of n, full otherwise.
    #[default]
    Auto,
    /// Always decompose all n eigenpairs, then keep the top p.
    Full,
    /// Block Krylov solver for the top p. Still hands over to the full
    /// decomposition when the Krylov basis would pass an eighth of n.
    Truncated,
}

/// Options for classical MDS.
#[derive(Clone, Copy, Debug)]
pub struct EmbedOptions {
    /// Eigensolver selection.
    pub solver: Solver,
    /// Extra Krylov block columns beyond p. Typical: 5–10.
    pub oversample: usize,
    /// Maximum number of Krylov blocks before giving up on convergence.
    pub max_blocks: usize,
    /// Relative residual accepted by the truncated solver.
    pub tolerance: f64,
    /// Seed of the random starting block.
    pub seed: u64,
}

impl Default for EmbedOptions {
    fn default() -> Self {
        Self {
            solver: Solver::Auto,
            oversample: 8,
            max_blocks: 64,
            tolerance: 1e-10,
            seed: 42,
        }
    }
}

impl EmbedOptions {
    /// Set the eigensolver.
    pub fn with_solver(mut self, solver: Solver) -> Self {
        self.solver = solver;
        self
    }

    /// Set Krylov oversampling.
    pub fn with_oversample(mut self, oversample: usize) -> Self {
        self.oversample = oversample;
        self
    }

    /// Set the Krylov block limit.
    pub fn with_max_blocks(mut self, max_blocks: usize) -> Self {
        self.max_blocks = max_blocks.max(1);
        self
    }

    /// Set the truncated solver's residual tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the random seed of the truncated solver.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn krylov(&self) -> KrylovParams {
        KrylovParams {
            oversample: self.oversample,
            max_blocks: self.max_blocks.max(1),
            tolerance: self.tolerance,
            seed: self.seed,
        }
    }
}

/// Result of classical MDS.
#[derive(Debug, Clone)]
pub struct Embedding {
    /// n × k coordinates; row i is point i.
    pub coordinates: Array2<f64>,
    /// Retained eigenvalues, descending, length k.
    pub eigenvalues: Array1<f64>,
    /// eigenvalues / trace(B); zero when the trace is not positive.
    pub proportion_explained: Array1<f64>,
    /// Solver that actually produced the eigenpairs: `Truncated` only when
    /// the Krylov iteration returned them. Never `Auto`.
    pub solver: Solver,
}

impl Embedding {
    /// Number of embedded points.
    pub fn n_points(&self) -> usize {
        self.coordinates.nrows()
    }

    /// Number of retained dimensions.
    pub fn n_dims(&self) -> usize {
        self.coordinates.ncols()
    }

    /// True when no eigenvalue survived filtering.
    pub fn is_degenerate(&self) -> bool {
        self.eigenvalues.len() == 1 && self.eigenvalues[0] == 0.0
    }
}

/// Classical MDS with default options.
///
/// `dist` is an n×n dissimilarity matrix or a 1×m / m×1 condensed vector.
/// `p` defaults to n and is clamped to `[1, n]`.
pub fn embed(dist: &Array2<f64>, p: Option<usize>) -> Result<Embedding> {
    embed_with(dist, p, &EmbedOptions::default())
}

/// Classical MDS on a condensed distance vector.
pub fn embed_condensed(condensed: &Array1<f64>, p: Option<usize>) -> Result<Embedding> {
    let row = condensed.view().insert_axis(Axis(0));
    embed_view(row, p, &EmbedOptions::default())
}

/// Classical MDS with explicit options.
pub fn embed_with(dist: &Array2<f64>, p: Option<usize>, opts: &EmbedOptions) -> Result<Embedding> {
    embed_view(dist.view(), p, opts)
}

pub(crate) fn embed_view(dist: ArrayView2<'_, f64>, p: Option<usize>, opts: &EmbedOptions) -> Result<Embedding> {
    let d = resolve(dist)?;
    let n = d.nrows();
    let p = resolve_dimension(p, n);

    let b = gram_matrix(&d)?;
    let trace: f64 = b.diag().sum();

    let requested = select_solver(opts, p, n);
    debug!("embedding {n} points into at most {p} dimensions ({requested:?} solver)");

    let (pairs, solver) = match requested {
        Solver::Truncated => {
            let top = top_eigh(&b, p, &opts.krylov());
            match top.basis_dim {
                Some(_) => (top.pairs, Solver::Truncated),
                None => (top.pairs, Solver::Full),
            }
        }
        _ => (full_eigh(&b).truncate(p), Solver::Full),
    };

    Ok(finish(pairs, n, trace, solver))
}

/// Resolve `Auto`: Krylov only pays off when its block is small next to n.
fn select_solver(opts: &EmbedOptions, p: usize, n: usize) -> Solver {
    match opts.solver {
        Solver::Auto if p + opts.oversample <= krylov_basis_limit(n) => Solver::Truncated,
        Solver::Auto => Solver::Full,
        other => other,
    }
}

/// Clamp `p` to `[1, n]`; omitted means n.
fn resolve_dimension(p: Option<usize>, n: usize) -> usize {
    match p {
        None => n,
        Some(p) => {
            let clamped = p.clamp(1, n);
            if clamped != p {
                debug!("target dimension {p} clamped to {clamped} for {n} points");
            }
            clamped
        }
    }
}

/// Filtering threshold: max|e| · ε^(3/4).
pub fn filter_threshold(values: &Array1<f64>) -> f64 {
    let max_abs = values.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    max_abs * f64::EPSILON.powf(0.75)
}

/// Filter, scale and sign-normalize sorted eigenpairs into an embedding.
fn finish(pairs: EigenPairs, n: usize, trace: f64, solver: Solver) -> Embedding {
    let tau = filter_threshold(&pairs.values);
    // Sorted descending, so survivors form a prefix.
    let keep = pairs.values.iter().take_while(|v| **v > tau).count();
    debug!(
        "kept {keep} of {} eigenvalues above threshold {tau:.3e}",
        pairs.values.len()
    );

    if keep == 0 {
        return Embedding {
            coordinates: Array2::zeros((n, 1)),
            eigenvalues: Array1::zeros(1),
            proportion_explained: Array1::zeros(1),
            solver,
        };
    }

    let pairs = pairs.truncate(keep);
    let mut coordinates = pairs.vectors;
    for (mut col, value) in coordinates.axis_iter_mut(Axis(1)).zip(pairs.values.iter()) {
        col *= value.sqrt();
    }
    normalize_signs(&mut coordinates);

    let proportion_explained = if trace > 0.0 {
        &pairs.values / trace
    } else {
        Array1::zeros(keep)
    };

    Embedding {
        coordinates,
        eigenvalues: pairs.values,
        proportion_explained,
        solver,
    }
}

/// Flip each column so its largest-magnitude entry (first on ties) is positive.
pub fn normalize_signs(coordinates: &mut Array2<f64>) {
    for mut col in coordinates.axis_iter_mut(Axis(1)) {
        let mut pivot = 0.0_f64;
        for v in col.iter() {
            if v.abs() > pivot.abs() {
                pivot = *v;
            }
        }
        if pivot < 0.0 {
            col.mapv_inplace(|v| -v);
        }
    }
}
