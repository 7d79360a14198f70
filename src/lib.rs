//! # credball
//!
//! Uncertainty summaries for Bayesian clustering: credible balls around a point
//! estimate, and posterior expected Variation of Information.
//!
//! Inputs are a posterior sample of partitions (an M × n label matrix, one draw
//! per row) and a chosen partition of the same n items. Nothing here samples;
//! the draws come from whatever MCMC produced them.
//!
//! - [`credible_ball`]: the smallest VI or Binder ball around `c_star` holding
//!   a `1 - alpha` share of the draws, with its horizontal and vertical extremes.
//! - [`expected_vi`]: Monte-Carlo posterior expected VI of candidate partitions.
//! - [`expected_vi_lower_bound`]: the cheaper bound computed from a posterior
//!   similarity matrix.
//!
//! ```rust
//! use credball::{credible_ball, expected_vi_one, CredibleBallConfig};
//! use ndarray::array;
//!
//! let draws = array![[1, 1, 2, 2], [1, 1, 2, 2], [1, 1, 1, 2], [1, 2, 1, 2]];
//! let c_star = [1, 1, 2, 2];
//!
//! let ball = credible_ball(&c_star, draws.view(), &CredibleBallConfig::default()).unwrap();
//! assert_eq!(ball.n_members(), 4);
//!
//! let loss = expected_vi_one(&c_star, draws.view()).unwrap();
//! assert!(loss > 0.0);
//! ```
//!
//! **Default build** enables `std` and `parallel` (rayon over draws and
//! candidates). `serde` adds `Serialize`/`Deserialize` on results and configs.

pub mod credible_ball;
pub mod distance;
/// Error types used across `credball`.
pub mod error;
pub mod partition;
pub mod vi;

pub use credible_ball::{
    credible_ball, credible_ball_by_name, retained_count, CredibleBall, CredibleBallConfig,
};
pub use distance::{binder, vi, PartitionDistance};
pub use error::{Error, Result};
pub use vi::{
    expected_vi, expected_vi_lower_bound, expected_vi_lower_bound_one, expected_vi_one,
    posterior_similarity, validate_psm,
};
