//! cmdscale: classical (Torgerson) multidimensional scaling, a.k.a. Principal
//! Coordinate Analysis.
//!
//! Input: an n×n dissimilarity matrix D, or its condensed upper triangle.
//! Pipeline:
//! 1) Resolve shape (expand condensed form, require square otherwise)
//! 2) B = -0.5 * J * (D ∘ D) * J   (double-centering), then B = (B + Bᵀ)/2
//! 3) Symmetric eig of B: all n pairs (nalgebra), or the top p via block
//!    Krylov iteration + Rayleigh–Ritz
//! 4) Sort descending, keep λ > max|λ| · ε^(3/4)
//! 5) Coordinates = V_k * sqrt(Λ_k)
//! 6) Flip each axis so its largest-magnitude coordinate is positive
//!
//! ```
//! use cmdscale::embed;
//! use ndarray::array;
//!
//! let s = 2.0_f64.sqrt();
//! let d = array![
//!     [0.0, 1.0, 1.0, s],
//!     [1.0, 0.0, s, 1.0],
//!     [1.0, s, 0.0, 1.0],
//!     [s, 1.0, 1.0, 0.0],
//! ];
//! let out = embed(&d, Some(2)).unwrap();
//! assert_eq!(out.coordinates.dim(), (4, 2));
//! assert!((out.eigenvalues[0] - 1.0).abs() < 1e-12);
//! ```

pub mod args;
pub mod centering;
pub mod dissimilarity;
pub mod eigen;
pub mod embed;
pub mod error;

pub use args::embed_args;
pub use dissimilarity::to_condensed;
pub use embed::{embed, embed_condensed, embed_with, EmbedOptions, Embedding, Solver};
pub use error::{Error, Result, ShapeViolation};
