//! Posterior expected Variation of Information.
//!
//! Given a posterior sample of partitions C_1..C_M, the expected VI loss of a
//! candidate partition c is estimated as
//!
//! ```text
//! E[VI(c, C)] ≈ (1/n) Σ_i [ log2|c(i)| + (1/M) Σ_m ( log2|C_m(i)| − 2 log2|c(i) ∩ C_m(i)| ) ]
//! ```
//!
//! which costs O(n·M) per candidate ([`expected_vi`]). Moving the expectation
//! inside the logarithms of the last two terms (Jensen) replaces the sample by
//! the posterior similarity matrix `psm[i, j] = P(c_i = c_j | data)`:
//!
//! ```text
//! VI_lb(c) = (1/n) Σ_i [ log2|c(i)| + log2 Σ_j psm[i, j] − 2 log2 Σ_j 1[c_i = c_j] psm[i, j] ]
//! ```
//!
//! [`expected_vi_lower_bound`] needs no draws once the PSM exists and costs
//! O(n) per item. The two Jensen steps point in opposite directions, so the
//! bound is not guaranteed for every candidate: partitions into many small
//! clusters under a spread posterior can come out above the Monte-Carlo
//! value. [`posterior_similarity`] builds the PSM from a sample.
//!
//! Candidates are passed as a (K × n) matrix, one partition per row, and the
//! result has one value per row, in row order. The `*_one` variants take a
//! single partition.
//!
//! # References
//!
//! - Wade & Ghahramani (2018). "Bayesian cluster analysis: point estimation
//!   and credible balls." Bayesian Analysis 13(2).

use std::collections::HashMap;

use ndarray::{Array1, Array2, ArrayView2};
use tracing::{debug, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::partition::{check_sample, cluster_sizes, contingency, row_labels};

/// Relative tolerance of the PSM symmetry check.
pub const PSM_SYMMETRY_RTOL: f64 = 1e-5;
/// Absolute tolerance of the PSM symmetry check.
pub const PSM_SYMMETRY_ATOL: f64 = 1e-8;

/// Monte-Carlo estimate of the posterior expected VI of each candidate row.
///
/// # Errors
///
/// - [`Error::EmptyInput`] if there are no candidates, no draws or no items.
/// - [`Error::DimensionMismatch`] if candidates and draws label different
///   numbers of items.
pub fn expected_vi(cls: ArrayView2<'_, usize>, cls_draw: ArrayView2<'_, usize>) -> Result<Array1<f64>> {
    check_sample(cls, None)?;
    check_sample(cls_draw, Some(cls.ncols()))?;

    let n = cls.ncols();
    let m = cls_draw.nrows();
    debug!(k = cls.nrows(), n, m, "expected VI");

    // Σ_i log2|C_m(i)| does not depend on the candidate.
    let draw_entropy_terms: Vec<f64> = cls_draw
        .outer_iter()
        .map(|row| sum_size_log_size(cluster_sizes(&row_labels(row)).into_values()))
        .collect();
    let draw_term_mean = draw_entropy_terms.iter().sum::<f64>() / m as f64;

    let one = |k: usize| {
        let c = row_labels(cls.row(k));
        let own = sum_size_log_size(cluster_sizes(&c).into_values());
        let joint_mean = cls_draw
            .outer_iter()
            .map(|row| sum_size_log_size(contingency(&c, &row_labels(row)).into_values()))
            .sum::<f64>()
            / m as f64;
        (own + draw_term_mean - 2.0 * joint_mean) / n as f64
    };

    Ok(Array1::from(map_rows(cls.nrows(), one)))
}

/// [`expected_vi`] for a single partition.
pub fn expected_vi_one(c: &[usize], cls_draw: ArrayView2<'_, usize>) -> Result<f64> {
    let cls = single_row(c)?;
    Ok(expected_vi(cls, cls_draw)?[0])
}

/// Lower bound on the posterior expected VI of each candidate row, from a
/// posterior similarity matrix.
///
/// The PSM is checked with [`validate_psm`] before anything else.
///
/// # Errors
///
/// - Any error from [`validate_psm`].
/// - [`Error::EmptyInput`] if there are no candidates.
/// - [`Error::DimensionMismatch`] if candidates do not label `psm.nrows()` items.
pub fn expected_vi_lower_bound(
    cls: ArrayView2<'_, usize>,
    psm: ArrayView2<'_, f64>,
) -> Result<Array1<f64>> {
    validate_psm(psm)?;
    check_sample(cls, Some(psm.nrows()))?;

    let n = psm.nrows();
    debug!(k = cls.nrows(), n, "expected VI lower bound");

    let row_sums: Vec<f64> = psm.outer_iter().map(|row| row.sum()).collect();

    let one = |k: usize| {
        let c = row_labels(cls.row(k));
        let mut members: HashMap<usize, Vec<usize>> = HashMap::new();
        for (j, &label) in c.iter().enumerate() {
            members.entry(label).or_default().push(j);
        }

        let mut f = 0.0;
        for (i, label) in c.iter().enumerate() {
            let cluster = &members[label];
            let within: f64 = cluster.iter().map(|&j| psm[[i, j]]).sum();
            f += ((cluster.len() as f64).log2() + row_sums[i].log2() - 2.0 * within.log2())
                / n as f64;
        }
        f
    };

    Ok(Array1::from(map_rows(cls.nrows(), one)))
}

/// [`expected_vi_lower_bound`] for a single partition.
pub fn expected_vi_lower_bound_one(c: &[usize], psm: ArrayView2<'_, f64>) -> Result<f64> {
    let cls = single_row(c)?;
    Ok(expected_vi_lower_bound(cls, psm)?[0])
}

/// Check that `psm` is a posterior similarity matrix.
///
/// It must be square and non-empty, symmetric up to
/// `|a - b| <= PSM_SYMMETRY_ATOL + PSM_SYMMETRY_RTOL * |b|`, have every entry
/// in `[0, 1]`, and have a diagonal of exactly `1.0`.
pub fn validate_psm(psm: ArrayView2<'_, f64>) -> Result<()> {
    let (rows, cols) = psm.dim();
    if rows != cols {
        return Err(Error::ShapeMismatch {
            expected: format!("square psm ({rows} x {rows})"),
            actual: format!("{rows} x {cols}"),
        });
    }
    if rows == 0 {
        return Err(Error::EmptyInput);
    }

    let fail = |reason: String| {
        warn!(%reason, n = rows, "psm rejected");
        Err(Error::InvalidPsm { reason })
    };

    for ((i, j), &a) in psm.indexed_iter() {
        if !(0.0..=1.0).contains(&a) {
            return fail(format!("entry ({i}, {j}) = {a} is outside [0, 1]"));
        }
        let b = psm[[j, i]];
        if (a - b).abs() > PSM_SYMMETRY_ATOL + PSM_SYMMETRY_RTOL * b.abs() {
            return fail(format!("entries ({i}, {j}) = {a} and ({j}, {i}) = {b} differ"));
        }
    }
    for i in 0..rows {
        let d = psm[[i, i]];
        if d != 1.0 {
            return fail(format!("diagonal entry ({i}, {i}) = {d} is not 1"));
        }
    }
    Ok(())
}

/// Posterior similarity matrix of a sample: entry (i, j) is the share of draws
/// that put items i and j in the same cluster.
///
/// The result always passes [`validate_psm`].
pub fn posterior_similarity(cls_draw: ArrayView2<'_, usize>) -> Result<Array2<f64>> {
    check_sample(cls_draw, None)?;
    let (m, n) = cls_draw.dim();
    debug!(m, n, "posterior similarity matrix");

    let mut counts = Array2::<usize>::zeros((n, n));
    for row in cls_draw.outer_iter() {
        let mut members: HashMap<usize, Vec<usize>> = HashMap::new();
        for (j, &label) in row.iter().enumerate() {
            members.entry(label).or_default().push(j);
        }
        for cluster in members.values() {
            for &i in cluster {
                for &j in cluster {
                    counts[[i, j]] += 1;
                }
            }
        }
    }
    Ok(counts.mapv(|c| c as f64 / m as f64))
}

/// Σ s log2 s over group sizes.
fn sum_size_log_size(sizes: impl Iterator<Item = usize>) -> f64 {
    sizes
        .map(|s| {
            let s = s as f64;
            s * s.log2()
        })
        .sum()
}

fn single_row(c: &[usize]) -> Result<ArrayView2<'_, usize>> {
    ArrayView2::from_shape((1, c.len()), c).map_err(|e| Error::ShapeMismatch {
        expected: format!("1 x {}", c.len()),
        actual: e.to_string(),
    })
}

/// Evaluate `f` on every row index, keeping row order.
fn map_rows<F>(k: usize, f: F) -> Vec<f64>
where
    F: Fn(usize) -> f64 + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        (0..k).into_par_iter().map(f).collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        (0..k).map(f).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::vi;
    use crate::partition::co_membership;
    use ndarray::array;
    use proptest::prelude::*;

    const TOL: f64 = 1e-9;

    /// Item-by-item Monte-Carlo estimate over co-membership indicators.
    fn expected_vi_naive(c: &[usize], draws: &Array2<usize>) -> f64 {
        let n = c.len();
        let m = draws.nrows() as f64;
        let mut f = 0.0;
        for i in 0..n {
            let ind = co_membership(c, i);
            f += (ind.iter().filter(|&&x| x).count() as f64).log2();
            for row in draws.outer_iter() {
                let ind_m = co_membership(&row.to_vec(), i);
                let s_m = ind_m.iter().filter(|&&x| x).count() as f64;
                let s = ind.iter().zip(&ind_m).filter(|&(&x, &y)| x && y).count() as f64;
                f += (s_m.log2() - 2.0 * s.log2()) / m;
            }
        }
        f / n as f64
    }

    fn sample_strategy() -> impl Strategy<Value = (Array2<usize>, Array2<usize>)> {
        (2usize..8, 1usize..12, 1usize..4).prop_flat_map(|(n, m, k)| {
            (
                prop::collection::vec(1usize..4, n * k),
                prop::collection::vec(1usize..4, n * m),
            )
                .prop_map(move |(cands, draws)| {
                    (
                        Array2::from_shape_vec((k, n), cands).unwrap(),
                        Array2::from_shape_vec((m, n), draws).unwrap(),
                    )
                })
        })
    }

    #[test]
    fn test_expected_vi_is_zero_for_point_mass() {
        let draws = array![[1, 1, 2, 2], [3, 3, 1, 1]];
        let v = expected_vi_one(&[1, 1, 2, 2], draws.view()).unwrap();
        assert!(v.abs() < TOL, "got {v}");
    }

    #[test]
    fn test_expected_vi_matches_naive() {
        let c = [1, 1, 2, 2, 3];
        let draws = array![[1, 1, 2, 2, 3], [1, 2, 1, 2, 1], [1, 1, 1, 1, 1], [1, 2, 3, 4, 5]];
        let v = expected_vi_one(&c, draws.view()).unwrap();
        assert!((v - expected_vi_naive(&c, &draws)).abs() < TOL);
    }

    #[test]
    fn test_expected_vi_batch_keeps_order() {
        let cls = array![[1, 1, 1, 1], [1, 1, 2, 2], [1, 2, 3, 4]];
        let draws = array![[1, 1, 2, 2], [1, 1, 2, 3]];
        let out = expected_vi(cls.view(), draws.view()).unwrap();
        assert_eq!(out.len(), 3);
        for (k, row) in cls.outer_iter().enumerate() {
            let single = expected_vi_one(&row.to_vec(), draws.view()).unwrap();
            assert!((out[k] - single).abs() < TOL);
        }
        // The middle candidate is closest to both draws.
        assert!(out[1] < out[0]);
        assert!(out[1] < out[2]);
    }

    #[test]
    fn test_expected_vi_shape_errors() {
        let draws = array![[1, 1, 2]];
        assert_eq!(
            expected_vi_one(&[1, 1], draws.view()),
            Err(Error::DimensionMismatch {
                expected: 2,
                found: 3
            })
        );
        let none = Array2::<usize>::zeros((0, 3));
        assert_eq!(expected_vi_one(&[1, 1, 1], none.view()), Err(Error::EmptyInput));
        assert_eq!(expected_vi(none.view(), draws.view()), Err(Error::EmptyInput));
    }

    #[test]
    fn test_asymmetric_psm_rejected() {
        let psm = array![[1.0, 0.5], [0.6, 1.0]];
        let err = expected_vi_lower_bound_one(&[1, 1], psm.view()).unwrap_err();
        assert!(matches!(err, Error::InvalidPsm { .. }));
    }

    #[test]
    fn test_psm_checked_before_candidates() {
        // Wrong candidate length too, but the PSM error wins.
        let psm = array![[1.0, 0.5], [0.6, 1.0]];
        let err = expected_vi_lower_bound_one(&[1, 1, 1], psm.view()).unwrap_err();
        assert!(matches!(err, Error::InvalidPsm { .. }));
    }

    #[test]
    fn test_psm_validation() {
        assert!(validate_psm(array![[1.0, 0.3], [0.3, 1.0]].view()).is_ok());
        // Symmetry is checked with a tolerance.
        assert!(validate_psm(array![[1.0, 0.3], [0.3 + 1e-12, 1.0]].view()).is_ok());
        // The diagonal is not.
        assert!(matches!(
            validate_psm(array![[1.0 - 1e-12, 0.3], [0.3, 1.0]].view()),
            Err(Error::InvalidPsm { .. })
        ));
        assert!(matches!(
            validate_psm(array![[1.0, 1.2], [1.2, 1.0]].view()),
            Err(Error::InvalidPsm { .. })
        ));
        assert!(matches!(
            validate_psm(array![[1.0, -0.1], [-0.1, 1.0]].view()),
            Err(Error::InvalidPsm { .. })
        ));
        assert!(matches!(
            validate_psm(array![[1.0, f64::NAN], [f64::NAN, 1.0]].view()),
            Err(Error::InvalidPsm { .. })
        ));
        assert!(matches!(
            validate_psm(array![[1.0, 0.5, 0.5], [0.5, 1.0, 0.5]].view()),
            Err(Error::ShapeMismatch { .. })
        ));
        assert_eq!(
            validate_psm(Array2::<f64>::zeros((0, 0)).view()),
            Err(Error::EmptyInput)
        );
    }

    #[test]
    fn test_posterior_similarity() {
        let draws = array![[1, 1, 2], [1, 2, 2]];
        let psm = posterior_similarity(draws.view()).unwrap();
        let expected = array![[1.0, 0.5, 0.0], [0.5, 1.0, 0.5], [0.0, 0.5, 1.0]];
        assert_eq!(psm, expected);
        assert!(validate_psm(psm.view()).is_ok());
    }

    #[test]
    fn test_lower_bound_known_value() {
        // Point-mass posterior: PSM is the co-clustering indicator of the draw,
        // and the bound equals the exact VI to that draw.
        let draw = [1, 1, 2, 2];
        let draws = array![[1, 1, 2, 2]];
        let psm = posterior_similarity(draws.view()).unwrap();
        let c = [1, 2, 1, 2];
        let lb = expected_vi_lower_bound_one(&c, psm.view()).unwrap();
        assert!((lb - vi(&c, &draw)).abs() < TOL);
        assert!(expected_vi_lower_bound_one(&draw, psm.view()).unwrap().abs() < TOL);
    }

    #[test]
    fn test_lower_bound_below_expectation() {
        let draws = array![[1, 1, 2, 2], [1, 1, 2, 2], [1, 1, 1, 2]];
        let psm = posterior_similarity(draws.view()).unwrap();
        let cls = array![[1, 1, 2, 2], [1, 1, 1, 2], [1, 2, 1, 2], [1, 1, 1, 1]];
        let lb = expected_vi_lower_bound(cls.view(), psm.view()).unwrap();
        let ev = expected_vi(cls.view(), draws.view()).unwrap();
        for k in 0..cls.nrows() {
            assert!(lb[k] <= ev[k], "row {k}: lb {} > E[VI] {}", lb[k], ev[k]);
            assert!(lb[k] >= 0.0);
        }
        // Same ranking of candidates under both.
        assert!(lb[0] < lb[1] && lb[1] < lb[3] && lb[3] < lb[2]);
        assert!(ev[0] < ev[1] && ev[1] < ev[3] && ev[3] < ev[2]);
    }

    #[test]
    fn test_lower_bound_on_spread_posterior() {
        let draws = array![
            [1, 1, 2, 2, 3, 3],
            [1, 1, 1, 2, 2, 2],
            [1, 2, 1, 2, 1, 2],
            [1, 1, 2, 2, 2, 2],
            [1, 2, 3, 4, 5, 6],
        ];
        let psm = posterior_similarity(draws.view()).unwrap();
        let cls = array![[1, 1, 2, 2, 3, 3], [1, 1, 1, 1, 1, 1], [1, 2, 3, 4, 5, 6]];
        let lb = expected_vi_lower_bound(cls.view(), psm.view()).unwrap();
        let ev = expected_vi(cls.view(), draws.view()).unwrap();
        assert!(lb[0] <= ev[0]);
        assert!(lb[1] <= ev[1]);
        // Singletons: every cluster term vanishes, leaving log2 of the PSM row sums.
        let expected_singletons: f64 = psm
            .outer_iter()
            .map(|row| row.sum().log2())
            .sum::<f64>()
            / 6.0;
        assert!((lb[2] - expected_singletons).abs() < TOL);
    }

    proptest! {
        #[test]
        fn expected_vi_is_mean_pairwise_vi((cls, draws) in sample_strategy()) {
            let out = expected_vi(cls.view(), draws.view()).unwrap();
            for (k, c) in cls.outer_iter().enumerate() {
                let c = c.to_vec();
                let mean: f64 = draws
                    .outer_iter()
                    .map(|d| vi(&c, &d.to_vec()))
                    .sum::<f64>()
                    / draws.nrows() as f64;
                prop_assert!((out[k] - mean).abs() < TOL);
                prop_assert!((out[k] - expected_vi_naive(&c, &draws)).abs() < TOL);
            }
        }

        #[test]
        fn lower_bound_is_nonnegative((cls, draws) in sample_strategy()) {
            let psm = posterior_similarity(draws.view()).unwrap();
            let lb = expected_vi_lower_bound(cls.view(), psm.view()).unwrap();
            for v in lb.iter() {
                prop_assert!(*v >= -TOL);
            }
        }

        #[test]
        fn posterior_similarity_is_valid((_cls, draws) in sample_strategy()) {
            let psm = posterior_similarity(draws.view()).unwrap();
            prop_assert!(validate_psm(psm.view()).is_ok());
        }
    }
}
