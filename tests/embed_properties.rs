//! End-to-end properties of classical MDS.

use approx::assert_abs_diff_eq;
use cmdscale::{
    embed, embed_args, embed_condensed, embed_with, to_condensed, EmbedOptions, Error,
    ShapeViolation, Solver,
};
use ndarray::{array, Array2};
use proptest::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn random_points(n: usize, d: usize, seed: u64) -> Array2<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    Array2::from_shape_fn((n, d), |_| rng.random_range(-5.0..5.0))
}

fn squared_distances(points: &Array2<f64>) -> Array2<f64> {
    let n = points.nrows();
    Array2::from_shape_fn((n, n), |(i, j)| {
        let diff = &points.row(i) - &points.row(j);
        diff.dot(&diff)
    })
}

fn distances(points: &Array2<f64>) -> Array2<f64> {
    squared_distances(points).mapv(f64::sqrt)
}

fn assert_same_geometry(a: &Array2<f64>, b: &Array2<f64>, tol: f64) {
    let da = squared_distances(a);
    let db = squared_distances(b);
    let scale = 1.0 + db.iter().fold(0.0_f64, |m, v| m.max(*v));
    for (x, y) in da.iter().zip(db.iter()) {
        assert_abs_diff_eq!(*x, *y, epsilon = tol * scale);
    }
}

#[test]
fn unit_square_recovers_distances() {
    init();
    let points = array![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]];
    let d = distances(&points);
    let out = embed(&d, Some(2)).unwrap();

    assert_eq!(out.eigenvalues.len(), 2);
    assert!(out.eigenvalues.iter().all(|v| *v > 0.0));
    let back = distances(&out.coordinates);
    for (x, y) in back.iter().zip(d.iter()) {
        assert_abs_diff_eq!(*x, *y, epsilon = 1e-6);
    }
}

#[test]
fn round_trip_recovers_configuration() {
    init();
    let points = random_points(200, 3, 11);
    let out = embed(&distances(&points), Some(3)).unwrap();

    assert_eq!(out.solver, Solver::Truncated);
    assert_eq!(out.coordinates.dim(), (200, 3));
    assert_same_geometry(&out.coordinates, &points, 1e-8);
}

#[test]
fn truncated_agrees_with_full() {
    init();
    let points = random_points(60, 5, 12);
    let d = distances(&points);
    let full = embed_with(&d, Some(3), &EmbedOptions::default().with_solver(Solver::Full)).unwrap();
    let truncated =
        embed_with(&d, Some(3), &EmbedOptions::default().with_solver(Solver::Truncated)).unwrap();

    assert_eq!(full.eigenvalues.len(), 3);
    assert_eq!(truncated.eigenvalues.len(), 3);
    for (a, b) in full.eigenvalues.iter().zip(truncated.eigenvalues.iter()) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-8 * full.eigenvalues[0]);
    }
    let gram_full = full.coordinates.dot(&full.coordinates.t());
    let gram_truncated = truncated.coordinates.dot(&truncated.coordinates.t());
    for (a, b) in gram_full.iter().zip(gram_truncated.iter()) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-6);
    }
}

/// Symmetric dissimilarities drawn uniformly: full rank, flat spectrum.
fn random_dissimilarities(n: usize, seed: u64) -> Array2<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut d = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in (i + 1)..n {
            let v = rng.random_range(0.0..10.0);
            d[[i, j]] = v;
            d[[j, i]] = v;
        }
    }
    d
}

#[test]
fn truncated_agrees_with_full_on_non_euclidean_input() {
    init();
    let d = random_dissimilarities(40, 13);
    let full = embed_with(&d, Some(4), &EmbedOptions::default().with_solver(Solver::Full)).unwrap();
    let truncated =
        embed_with(&d, Some(4), &EmbedOptions::default().with_solver(Solver::Truncated)).unwrap();

    assert_eq!(full.eigenvalues.len(), truncated.eigenvalues.len());
    for (a, b) in full.eigenvalues.iter().zip(truncated.eigenvalues.iter()) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-8 * full.eigenvalues[0]);
    }
}

#[test]
fn auto_hands_flat_spectrum_to_full_solver() {
    init();
    let d = random_dissimilarities(240, 18);
    let auto = embed(&d, Some(5)).unwrap();
    let full = embed_with(&d, Some(5), &EmbedOptions::default().with_solver(Solver::Full)).unwrap();

    // The Krylov basis hits its cap long before the flat spectrum converges.
    assert_eq!(auto.solver, Solver::Full);
    assert_eq!(auto.eigenvalues, full.eigenvalues);
    assert_eq!(auto.coordinates, full.coordinates);
}

#[test]
fn overflowing_dissimilarities_are_rejected() {
    init();
    let mut d = distances(&random_points(6, 2, 19));
    d[[1, 4]] = 1e200;
    d[[4, 1]] = 1e200;
    assert!(matches!(embed(&d, None), Err(Error::Overflow { .. })));
}

#[test]
fn transpose_gives_same_eigenvalues() {
    init();
    let d = array![
        [0.0, 1.0, 4.0, 2.0],
        [2.0, 0.0, 1.0, 3.0],
        [3.0, 5.0, 0.0, 1.5],
        [1.0, 2.5, 2.0, 0.0],
    ];
    let dt = d.t().to_owned();
    let d2 = d.mapv(|x| x * x);
    let symmetric = ((&d2 + &d2.t()) * 0.5).mapv(f64::sqrt);

    let a = embed(&d, None).unwrap();
    let b = embed(&dt, None).unwrap();
    let c = embed(&symmetric, None).unwrap();

    assert_eq!(a.eigenvalues.len(), b.eigenvalues.len());
    assert_eq!(a.eigenvalues.len(), c.eigenvalues.len());
    for ((x, y), z) in a.eigenvalues.iter().zip(b.eigenvalues.iter()).zip(c.eigenvalues.iter()) {
        assert_abs_diff_eq!(*x, *y, epsilon = 1e-10);
        assert_abs_diff_eq!(*x, *z, epsilon = 1e-10);
    }
}

#[test]
fn condensed_matches_full() {
    init();
    let d = distances(&random_points(8, 2, 14));
    let condensed = to_condensed(&d).unwrap();
    assert_eq!(condensed.len(), 28);

    let from_full = embed(&d, Some(2)).unwrap();
    let from_condensed = embed_condensed(&condensed, Some(2)).unwrap();
    let from_row = embed(&condensed.clone().insert_axis(ndarray::Axis(0)), Some(2)).unwrap();

    for other in [&from_condensed, &from_row] {
        assert_eq!(other.eigenvalues.len(), from_full.eigenvalues.len());
        for (a, b) in from_full.coordinates.iter().zip(other.coordinates.iter()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-12);
        }
    }
}

#[test]
fn signs_are_deterministic() {
    init();
    let d = distances(&random_points(25, 4, 15));
    let first = embed(&d, Some(3)).unwrap();
    let second = embed(&d, Some(3)).unwrap();
    assert_eq!(first.coordinates, second.coordinates);

    for col in first.coordinates.columns() {
        let pivot = col
            .iter()
            .copied()
            .fold(0.0_f64, |m, v| if v.abs() > m.abs() { v } else { m });
        assert!(pivot > 0.0);
    }
}

#[test]
fn dimension_clamps_to_n() {
    init();
    let d = distances(&random_points(6, 3, 16));
    let clamped = embed(&d, Some(50)).unwrap();
    let exact = embed(&d, Some(6)).unwrap();
    assert_eq!(clamped.coordinates, exact.coordinates);
    assert_eq!(clamped.eigenvalues, exact.eigenvalues);
}

#[test]
fn zero_matrix_is_degenerate() {
    init();
    let out = embed(&Array2::zeros((5, 5)), None).unwrap();
    assert_eq!(out.coordinates, Array2::<f64>::zeros((5, 1)));
    assert_eq!(out.eigenvalues, array![0.0]);
    assert!(out.is_degenerate());
}

#[test]
fn validation_scenarios() {
    init();
    assert_eq!(embed_args(&[]).unwrap_err(), Error::MissingArgument);

    let d = distances(&random_points(4, 2, 17));
    let p = array![[2.0]];
    assert_eq!(
        embed_args(&[&d, &p, &p]).unwrap_err(),
        Error::ExtraArgument { count: 3 }
    );

    let bad_len = array![[1.0, 2.0, 3.0, 4.0]];
    assert!(matches!(
        embed(&bad_len, None),
        Err(Error::InvalidShape {
            violation: ShapeViolation::CondensedLength { len: 4 },
            ..
        })
    ));

    let not_square = Array2::<f64>::ones((3, 4));
    let err = embed(&not_square, None).unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidShape {
            rows: 3,
            cols: 4,
            violation: ShapeViolation::NotSquare,
        }
    ));
    assert!(err.to_string().contains("3x4"));
}

#[test]
fn three_entry_vector_is_three_points() {
    init();
    let out = embed(&array![[1.0, 2.0, 3.0]], None).unwrap();
    assert_eq!(out.n_points(), 3);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(40))]

    #[test]
    fn prop_round_trip(
        (n, dim, coords) in (3usize..12, 1usize..4).prop_flat_map(|(n, dim)| {
            (Just(n), Just(dim), prop::collection::vec(-10.0f64..10.0, n * dim))
        })
    ) {
        let points = Array2::from_shape_vec((n, dim), coords).unwrap();
        let out = embed(&distances(&points), None).unwrap();

        prop_assert!(out.n_dims() <= dim.max(1));
        for w in out.eigenvalues.windows(2) {
            prop_assert!(w[0] >= w[1]);
        }
        let got = squared_distances(&out.coordinates);
        let want = squared_distances(&points);
        let scale = 1.0 + want.iter().fold(0.0_f64, |m, v| m.max(*v));
        for (x, y) in got.iter().zip(want.iter()) {
            prop_assert!((x - y).abs() <= 1e-8 * scale, "{} vs {}", x, y);
        }
    }
}
