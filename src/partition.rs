//! Label-vector utilities for partitions.
//!
//! A partition of n items is a slice of n labels. Two partitions are the same
//! partition when they induce the same equivalence relation on items, whatever
//! the label values are:
//!
//! ```rust
//! use credball::partition::same_partition;
//!
//! assert!(same_partition(&[1, 1, 2, 2], &[7, 7, 3, 3]));
//! assert!(!same_partition(&[1, 1, 2, 2], &[1, 2, 1, 2]));
//! ```
//!
//! # Cluster-count proxy
//!
//! The credible ball ranks draws by [`max_label`], not by the number of
//! distinct labels. The two agree when labels run `1..=K` without gaps, which
//! is what [`canonicalize`] produces.

use std::borrow::Cow;
use std::collections::HashMap;

use ndarray::{ArrayView1, ArrayView2};

use crate::error::{Error, Result};

/// Size of every cluster, keyed by label.
pub fn cluster_sizes(c: &[usize]) -> HashMap<usize, usize> {
    let mut sizes = HashMap::new();
    for &label in c {
        *sizes.entry(label).or_insert(0usize) += 1;
    }
    sizes
}

/// Joint cluster sizes: number of items carrying label `a` in `c1` and `b` in `c2`.
///
/// Both slices must have the same length; extra items in the longer one are ignored.
pub fn contingency(c1: &[usize], c2: &[usize]) -> HashMap<(usize, usize), usize> {
    let mut table = HashMap::new();
    for (&a, &b) in c1.iter().zip(c2.iter()) {
        *table.entry((a, b)).or_insert(0usize) += 1;
    }
    table
}

/// Co-membership indicator of item `i`: entry j is true iff j shares i's cluster.
///
/// # Panics
///
/// Panics if `i >= c.len()`.
pub fn co_membership(c: &[usize], i: usize) -> Vec<bool> {
    let label = c[i];
    c.iter().map(|&l| l == label).collect()
}

/// Largest label value, the cluster-count proxy. Zero for an empty partition.
pub fn max_label(c: &[usize]) -> usize {
    c.iter().copied().max().unwrap_or(0)
}

/// Number of distinct labels.
pub fn n_clusters(c: &[usize]) -> usize {
    cluster_sizes(c).len()
}

/// Relabel to `1..=K` in order of first appearance.
///
/// The result induces the same partition as `c`, and its [`max_label`] equals
/// its [`n_clusters`].
pub fn canonicalize(c: &[usize]) -> Vec<usize> {
    let mut map: HashMap<usize, usize> = HashMap::new();
    c.iter()
        .map(|&label| {
            let next = map.len() + 1;
            *map.entry(label).or_insert(next)
        })
        .collect()
}

/// True iff `c1` and `c2` induce the same equivalence relation.
pub fn same_partition(c1: &[usize], c2: &[usize]) -> bool {
    c1.len() == c2.len() && canonicalize(c1) == canonicalize(c2)
}

/// Borrow a matrix row as a slice, copying only when the row is not contiguous.
pub(crate) fn row_labels(row: ArrayView1<'_, usize>) -> Cow<'_, [usize]> {
    match row.to_slice() {
        Some(s) => Cow::Borrowed(s),
        None => Cow::Owned(row.to_vec()),
    }
}

/// Check that `cls` is a non-empty (rows × n) label matrix with n > 0,
/// and that n matches `n_items` when given.
pub(crate) fn check_sample(cls: ArrayView2<'_, usize>, n_items: Option<usize>) -> Result<()> {
    if cls.nrows() == 0 || cls.ncols() == 0 {
        return Err(Error::EmptyInput);
    }
    if let Some(n) = n_items {
        if cls.ncols() != n {
            return Err(Error::DimensionMismatch {
                expected: n,
                found: cls.ncols(),
            });
        }
    }
    Ok(())
}
