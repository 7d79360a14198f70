//! Distances between two partitions of the same items.
//!
//! # Metrics Overview
//!
//! | Distance | Range | Zero iff | Metric |
//! |----------|-------|----------|--------|
//! | [`binder`] | [0, 1] | same partition | assumed, not checked |
//! | [`vi`] | [0, log2 n] | same partition | yes |
//!
//! Both depend only on the equivalence relations the labels induce, so
//! relabelling either argument never changes the result.
//!
//! ```text
//! Binder(c1, c2) = (1/n²) Σ_i Σ_j | 1[c1_i = c1_j] − 1[c2_i = c2_j] |
//! VI(c1, c2)     = (1/n)  Σ_i [ log2|C1(i)| + log2|C2(i)| − 2 log2|C1(i) ∩ C2(i)| ]
//! ```
//!
//! where C(i) is the cluster containing item i. Every C(i) contains i itself,
//! so no logarithm ever sees zero.
//!
//! Neither function validates its input. Callers check lengths first.
//!
//! # Example
//!
//! ```rust
//! use credball::distance::{binder, vi};
//!
//! let a = [1, 1, 2, 2];
//! let b = [1, 2, 1, 2];
//! assert_eq!(binder(&a, &a), 0.0);
//! assert!((binder(&a, &b) - 0.5).abs() < 1e-12);
//! assert!((vi(&a, &b) - 2.0).abs() < 1e-12);
//! ```
//!
//! # References
//!
//! - Binder (1978). "Bayesian cluster analysis"
//! - Meilă (2007). "Comparing clusterings: an information based distance"
//! - Wade & Ghahramani (2018). "Bayesian cluster analysis: point estimation and credible balls"

use core::fmt;
use core::str::FromStr;

use crate::error::Error;
use crate::partition::{cluster_sizes, contingency};

/// Binder distance: fraction of ordered item pairs on which the two
/// co-clustering relations disagree.
pub fn binder(c1: &[usize], c2: &[usize]) -> f64 {
    let n = c1.len();
    if n == 0 {
        return 0.0;
    }

    // Pairs together in c1, together in c2, and together in both.
    // Disagreements are the symmetric difference of the first two sets.
    let together_1: usize = cluster_sizes(c1).values().map(|&s| s * s).sum();
    let together_2: usize = cluster_sizes(c2).values().map(|&s| s * s).sum();
    let together_both: usize = contingency(c1, c2).values().map(|&s| s * s).sum();

    let disagreements = together_1 + together_2 - 2 * together_both;
    disagreements as f64 / (n * n) as f64
}

/// Variation of Information in bits.
pub fn vi(c1: &[usize], c2: &[usize]) -> f64 {
    let n = c1.len();
    if n == 0 {
        return 0.0;
    }

    let sizes_1 = cluster_sizes(c1);
    let sizes_2 = cluster_sizes(c2);

    // One term per joint cell, summed in a label-free order so that any two
    // pairs with the same cell structure give bit-identical distances.
    let mut cells: Vec<(usize, usize, usize)> = contingency(c1, c2)
        .into_iter()
        .map(|((a, b), count)| (sizes_1[&a], sizes_2[&b], count))
        .collect();
    cells.sort_unstable();

    let f: f64 = cells
        .iter()
        .map(|&(s1, s2, s12)| {
            s12 as f64 * ((s1 as f64).log2() + (s2 as f64).log2() - 2.0 * (s12 as f64).log2())
        })
        .sum();
    f / n as f64
}

/// Which partition distance to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PartitionDistance {
    /// Variation of Information ([`vi`]).
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "VI"))]
    Vi,
    /// Binder loss ([`binder`]).
    #[cfg_attr(feature = "serde", serde(rename = "Binder"))]
    Binder,
}

impl PartitionDistance {
    /// Distance between `c1` and `c2` under this metric.
    pub fn compute(self, c1: &[usize], c2: &[usize]) -> f64 {
        match self {
            PartitionDistance::Vi => vi(c1, c2),
            PartitionDistance::Binder => binder(c1, c2),
        }
    }

    /// Canonical name, as accepted by [`FromStr`].
    pub fn as_str(self) -> &'static str {
        match self {
            PartitionDistance::Vi => "VI",
            PartitionDistance::Binder => "Binder",
        }
    }
}

impl fmt::Display for PartitionDistance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PartitionDistance {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "VI" => Ok(PartitionDistance::Vi),
            "Binder" => Ok(PartitionDistance::Binder),
            other => Err(Error::InvalidParameter {
                name: "c_dist",
                message: format!("expected 'VI' or 'Binder', got '{other}'"),
            }),
        }
    }
}
