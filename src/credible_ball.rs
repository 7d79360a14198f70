//! Credible balls around a point estimate of a clustering.
//!
//! Given an optimal partition `c_star` and M posterior draws, the credible ball
//! at level `1 - alpha` is the smallest distance ball centred at `c_star` that
//! holds `ceil((1 - alpha) M)` of the draws. Three kinds of extreme draw in the
//! ball summarise its shape:
//!
//! | Extreme | Chosen among | Reported distance |
//! |---------|--------------|-------------------|
//! | horizontal | all retained draws | the ball radius |
//! | upper vertical | retained draws with the fewest clusters | farthest of those |
//! | lower vertical | retained draws with the most clusters | farthest of those |
//!
//! "Number of clusters" is the largest label value in the draw (see
//! [`max_label`]). With labels `1..=K` and no gaps this is K. Samplers that
//! emit gapped labels should pass draws through [`canonicalize`] first.
//!
//! Every extreme is a set: all draws tied at the relevant distance are
//! reported, in ascending-distance order with ties in draw order.
//!
//! # Example
//!
//! ```rust
//! use credball::{credible_ball, CredibleBallConfig, PartitionDistance};
//! use ndarray::array;
//!
//! let c_star = [1, 1, 2, 2];
//! let draws = array![[1, 1, 2, 2], [1, 2, 1, 2], [1, 1, 1, 2]];
//!
//! let config = CredibleBallConfig::new()
//!     .with_distance(PartitionDistance::Vi)
//!     .with_alpha(0.34);
//! let ball = credible_ball(&c_star, draws.view(), &config).unwrap();
//!
//! assert_eq!(ball.members, vec![0, 2]);
//! assert_eq!(ball.c_horiz.row(0).to_vec(), vec![1, 1, 1, 2]);
//! ```
//!
//! # References
//!
//! - Wade & Ghahramani (2018). "Bayesian cluster analysis: point estimation
//!   and credible balls." Bayesian Analysis 13(2).
//!
//! [`canonicalize`]: crate::partition::canonicalize

use ndarray::{Array1, Array2, ArrayView2, Axis};
use tracing::{debug, trace};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::distance::PartitionDistance;
use crate::error::{Error, Result};
use crate::partition::{check_sample, max_label, row_labels};

/// Parameters of a credible-ball computation.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CredibleBallConfig {
    /// Distance between partitions. Default: VI.
    pub distance: PartitionDistance,
    /// One minus the credible level. Default: 0.05 (a 95% ball).
    pub alpha: f64,
}

impl Default for CredibleBallConfig {
    fn default() -> Self {
        Self {
            distance: PartitionDistance::Vi,
            alpha: 0.05,
        }
    }
}

impl CredibleBallConfig {
    /// Default configuration: VI distance, 95% credible level.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the partition distance.
    pub fn with_distance(mut self, distance: PartitionDistance) -> Self {
        self.distance = distance;
        self
    }

    /// Set `alpha`; the ball holds a `1 - alpha` share of the draws.
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Check that `alpha` is finite and in `[0, 1)`.
    pub fn validate(&self) -> Result<()> {
        if !self.alpha.is_finite() || !(0.0..1.0).contains(&self.alpha) {
            return Err(Error::InvalidParameter {
                name: "alpha",
                message: format!("must be in [0, 1), got {}", self.alpha),
            });
        }
        Ok(())
    }

    /// Build the credible ball of `c_star` from `cls_draw` with this configuration.
    pub fn compute(&self, c_star: &[usize], cls_draw: ArrayView2<'_, usize>) -> Result<CredibleBall> {
        credible_ball(c_star, cls_draw, self)
    }
}

/// Credible ball of an optimal partition, with its extreme draws.
///
/// `c_horiz`, `c_uppervert` and `c_lowervert` hold one draw per row and are
/// never empty.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CredibleBall {
    /// Centre of the ball.
    pub c_star: Array1<usize>,
    /// Retained draws at the ball radius.
    pub c_horiz: Array2<usize>,
    /// Farthest retained draws among those with the fewest clusters.
    pub c_uppervert: Array2<usize>,
    /// Farthest retained draws among those with the most clusters.
    pub c_lowervert: Array2<usize>,
    /// Ball radius: distance of the farthest retained draw.
    pub dist_horiz: f64,
    /// Distance of the upper vertical extreme to `c_star`.
    pub dist_uppervert: f64,
    /// Distance of the lower vertical extreme to `c_star`.
    pub dist_lowervert: f64,
    /// Indices (rows of the sample) of the retained draws, closest first.
    pub members: Vec<usize>,
    /// Distance of each retained draw to `c_star`, aligned with `members`.
    pub member_distances: Vec<f64>,
    /// Distance used to build the ball.
    pub distance: PartitionDistance,
    /// `alpha` used to build the ball.
    pub alpha: f64,
}

impl CredibleBall {
    /// Number of retained draws.
    pub fn n_members(&self) -> usize {
        self.members.len()
    }

    /// Ball radius (same as `dist_horiz`).
    pub fn radius(&self) -> f64 {
        self.dist_horiz
    }

    /// Whether `c` lies within the ball: its distance to `c_star` is at most the radius.
    ///
    /// Returns an error if `c` does not label the same number of items as `c_star`.
    pub fn contains(&self, c: &[usize]) -> Result<bool> {
        if c.len() != self.c_star.len() {
            return Err(Error::DimensionMismatch {
                expected: self.c_star.len(),
                found: c.len(),
            });
        }
        let center = row_labels(self.c_star.view());
        Ok(self.distance.compute(c, &center) <= self.dist_horiz)
    }
}

/// Number of draws a `1 - alpha` credible ball keeps out of `m`: `ceil((1 - alpha) m)`.
pub fn retained_count(m: usize, alpha: f64) -> usize {
    let k = ((1.0 - alpha) * m as f64).ceil() as usize;
    k.clamp(1, m.max(1))
}

/// Compute the credible ball of `c_star` from the posterior sample `cls_draw` (M × n).
///
/// # Errors
///
/// - [`Error::EmptyInput`] if there are no draws or no items.
/// - [`Error::DimensionMismatch`] if draws do not have `c_star.len()` columns.
/// - [`Error::InvalidParameter`] if `alpha` is outside `[0, 1)`.
///
/// All checks run before any distance is computed.
pub fn credible_ball(
    c_star: &[usize],
    cls_draw: ArrayView2<'_, usize>,
    config: &CredibleBallConfig,
) -> Result<CredibleBall> {
    config.validate()?;
    if c_star.is_empty() {
        return Err(Error::EmptyInput);
    }
    check_sample(cls_draw, Some(c_star.len()))?;

    let m = cls_draw.nrows();
    let ind_star = retained_count(m, config.alpha);
    debug!(
        n = c_star.len(),
        m,
        distance = %config.distance,
        alpha = config.alpha,
        ind_star,
        "building credible ball"
    );

    let distances = distances_to(c_star, cls_draw, config.distance);

    // Stable: equal distances keep draw order.
    let mut order: Vec<usize> = (0..m).collect();
    order.sort_by(|&a, &b| distances[a].total_cmp(&distances[b]));

    let members: Vec<usize> = order[..ind_star].to_vec();
    let member_distances: Vec<f64> = members.iter().map(|&i| distances[i]).collect();

    let dist_horiz = member_distances[ind_star - 1];
    let horiz: Vec<usize> = members
        .iter()
        .zip(&member_distances)
        .filter(|&(_, &d)| d == dist_horiz)
        .map(|(&i, _)| i)
        .collect();

    let proxies: Vec<usize> = members
        .iter()
        .map(|&i| max_label(&row_labels(cls_draw.row(i))))
        .collect();
    let fewest = proxies.iter().copied().min().ok_or(Error::EmptyInput)?;
    let most = proxies.iter().copied().max().ok_or(Error::EmptyInput)?;

    let (upper, dist_uppervert) = vertical_extreme(&members, &member_distances, &proxies, fewest);
    let (lower, dist_lowervert) = vertical_extreme(&members, &member_distances, &proxies, most);

    debug!(
        radius = dist_horiz,
        n_horiz = horiz.len(),
        fewest_clusters = fewest,
        n_uppervert = upper.len(),
        most_clusters = most,
        n_lowervert = lower.len(),
        "credible ball extremes"
    );

    Ok(CredibleBall {
        c_star: Array1::from(c_star.to_vec()),
        c_horiz: cls_draw.select(Axis(0), &horiz),
        c_uppervert: cls_draw.select(Axis(0), &upper),
        c_lowervert: cls_draw.select(Axis(0), &lower),
        dist_horiz,
        dist_uppervert,
        dist_lowervert,
        members,
        member_distances,
        distance: config.distance,
        alpha: config.alpha,
    })
}

/// Credible ball with the distance given by name (`"VI"` or `"Binder"`).
///
/// An unrecognised name fails with [`Error::InvalidParameter`] before anything
/// else is looked at.
pub fn credible_ball_by_name(
    c_star: &[usize],
    cls_draw: ArrayView2<'_, usize>,
    c_dist: &str,
    alpha: f64,
) -> Result<CredibleBall> {
    let distance: PartitionDistance = c_dist.parse()?;
    let config = CredibleBallConfig { distance, alpha };
    credible_ball(c_star, cls_draw, &config)
}

/// Distance of every draw to `c_star`, in draw order.
fn distances_to(
    c_star: &[usize],
    cls_draw: ArrayView2<'_, usize>,
    distance: PartitionDistance,
) -> Vec<f64> {
    let one = |m: usize| {
        let d = distance.compute(&row_labels(cls_draw.row(m)), c_star);
        trace!(draw = m, d, "distance to c_star");
        d
    };

    #[cfg(feature = "parallel")]
    {
        (0..cls_draw.nrows()).into_par_iter().map(one).collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        (0..cls_draw.nrows()).map(one).collect()
    }
}

/// Among retained positions whose proxy equals `target`, the draws at the
/// largest distance. Positions are in ascending-distance order, so that
/// distance is the one at the last matching position.
fn vertical_extreme(
    members: &[usize],
    member_distances: &[f64],
    proxies: &[usize],
    target: usize,
) -> (Vec<usize>, f64) {
    let positions: Vec<usize> = (0..members.len())
        .filter(|&p| proxies[p] == target)
        .collect();
    let far = positions
        .last()
        .map_or(f64::NAN, |&p| member_distances[p]);
    let chosen = positions
        .into_iter()
        .filter(|&p| member_distances[p] == far)
        .map(|p| members[p])
        .collect();
    (chosen, far)
}


#[cfg(all(test, feature = "serde"))]
mod serde_tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_ball_serializes_contract_field_names() {
        let c_star = [1, 1, 2, 2];
        let draws = array![[1, 1, 2, 2], [1, 2, 1, 2], [1, 1, 1, 2]];
        let ball = credible_ball_by_name(&c_star, draws.view(), "VI", 0.34).unwrap();

        let value = serde_json::to_value(&ball).unwrap();
        let obj = value.as_object().unwrap();
        for key in [
            "c_star",
            "c_horiz",
            "c_uppervert",
            "c_lowervert",
            "dist_horiz",
            "dist_uppervert",
            "dist_lowervert",
        ] {
            assert!(obj.contains_key(key), "missing field {key}");
        }
        assert_eq!(obj["distance"], "VI");
        assert_eq!(obj["dist_horiz"].as_f64(), Some(ball.dist_horiz));

        let back: CredibleBall = serde_json::from_value(value).unwrap();
        assert_eq!(back, ball);
    }

    #[test]
    fn test_config_distance_names_round_trip() {
        for (distance, name) in [
            (PartitionDistance::Vi, "VI"),
            (PartitionDistance::Binder, "Binder"),
        ] {
            let config = CredibleBallConfig::new()
                .with_distance(distance)
                .with_alpha(0.1);
            let json = serde_json::to_string(&config).unwrap();
            assert!(json.contains(&format!("\"distance\":\"{name}\"")), "{json}");
            let back: CredibleBallConfig = serde_json::from_str(&json).unwrap();
            assert_eq!(back, config);
        }

        let err = serde_json::from_str::<CredibleBallConfig>(r#"{"distance":"vi","alpha":0.1}"#);
        assert!(err.is_err());
    }
}
