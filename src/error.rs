use core::fmt;

/// Result alias for `credball`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by distance, credible-ball and expected-VI computations.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Input was empty (no items, no draws, or no candidates).
    EmptyInput,

    /// Partition length mismatch.
    DimensionMismatch {
        /// Expected number of items.
        expected: usize,
        /// Found number of items.
        found: usize,
    },

    /// Shape mismatch (string description).
    ShapeMismatch {
        /// Expected shape description.
        expected: String,
        /// Actual shape description.
        actual: String,
    },

    /// Invalid parameter value.
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Error message.
        message: String,
    },

    /// Posterior similarity matrix failed validation.
    InvalidPsm {
        /// Which check failed.
        reason: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::EmptyInput => write!(f, "empty input provided"),
            Error::DimensionMismatch { expected, found } => {
                write!(f, "dimension mismatch: expected {expected}, found {found}")
            }
            Error::ShapeMismatch { expected, actual } => {
                write!(f, "shape mismatch: expected {expected}, actual {actual}")
            }
            Error::InvalidParameter { name, message } => {
                write!(f, "invalid parameter '{name}': {message}")
            }
            Error::InvalidPsm { reason } => {
                write!(
                    f,
                    "psm must be a symmetric matrix with entries between 0 and 1 and 1's on the diagonal: {reason}"
                )
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}
