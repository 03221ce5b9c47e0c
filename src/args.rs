//! Positional-argument front end for dynamic callers.
//!
//! Bindings that forward a variadic argument list (every argument a matrix,
//! scalars as 1×1) call [`embed_args`]: `args[0]` is the dissimilarity input,
//! `args[1]` the optional target dimension.

use ndarray::Array2;

use crate::embed::{embed_view, EmbedOptions, Embedding};
use crate::error::{Error, Result};

/// Classical MDS over a positional argument list `(D[, p])`.
pub fn embed_args(args: &[&Array2<f64>]) -> Result<Embedding> {
    let (dist, p) = match args {
        [] => return Err(Error::MissingArgument),
        [dist] => (*dist, None),
        [dist, p] => (*dist, Some(scalar_dimension(p)?)),
        _ => return Err(Error::ExtraArgument { count: args.len() }),
    };
    embed_view(dist.view(), p, &EmbedOptions::default())
}

/// Read a 1×1 matrix as a target dimension. Values below 1 clamp to 1
/// downstream, like any other out-of-range `p`.
fn scalar_dimension(p: &Array2<f64>) -> Result<usize> {
    if p.dim() != (1, 1) {
        let (rows, cols) = p.dim();
        return Err(Error::InvalidDimension(format!(
            "expected a scalar, got a {rows}x{cols} matrix"
        )));
    }
    let v = p[[0, 0]];
    if !v.is_finite() || v.fract() != 0.0 {
        return Err(Error::InvalidDimension(format!("{v} is not an integer")));
    }
    Ok(if v < 1.0 { 0 } else { v as usize })
}
