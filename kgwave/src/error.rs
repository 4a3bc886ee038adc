/// Everything that can go wrong when building or decomposing a Klein-Gordon solution.
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum KgError {
    /// Two arrays that must be sampled on the same grid have different lengths.
    #[error("dimension mismatch: `{left}` has length {left_len} but `{right}` has length {right_len}")]
    DimensionMismatch {
        /// The name of the first array.
        left: &'static str,
        /// The length of the first array.
        left_len: usize,
        /// The name of the second array.
        right: &'static str,
        /// The length of the second array.
        right_len: usize,
    },
    /// The mass parameter `mu` is not a positive finite number.
    #[error("mass parameter must be positive and finite, got mu = {0}")]
    InvalidMass(f64),
    /// The mode cutoff would produce no modes.
    #[error("mode cutoff must be at least 2, got nmax = {0}")]
    InvalidModeCount(usize),
    /// A solution was requested over an empty set of modes.
    #[error("a mode solution needs at least one mode")]
    EmptyModeSet,
    /// The sample grid has no points.
    #[error("cannot integrate over an empty grid")]
    EmptyGrid,
    /// An input contains NaN or an infinity.
    #[error("`{0}` contains non-finite values")]
    NonFinite(&'static str),
    /// Every amplitude is zero, so the amplitudes cannot be normalized.
    #[error("amplitudes sum to zero norm and cannot be normalized")]
    DegenerateNormalization,
    /// An environment variable override could not be parsed.
    #[error("could not parse environment variable `{name}` = {value:?}")]
    InvalidEnvironment {
        /// The variable name.
        name: &'static str,
        /// The raw value.
        value: String,
    },
}

/// The result type of this crate.
pub type Result<T> = std::result::Result<T, KgError>;

/// Fails with [`KgError::DimensionMismatch`] unless both lengths agree.
pub(crate) fn check_lengths(
    left: &'static str,
    left_len: usize,
    right: &'static str,
    right_len: usize,
) -> Result<()> {
    if left_len == right_len {
        Ok(())
    } else {
        Err(KgError::DimensionMismatch {
            left,
            left_len,
            right,
            right_len,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{check_lengths, KgError};

    #[test]
    fn test_mismatch_message() {
        let err = check_lengths("x0", 3, "y0", 4).unwrap_err();

        assert_eq!(
            err,
            KgError::DimensionMismatch {
                left: "x0",
                left_len: 3,
                right: "y0",
                right_len: 4
            }
        );
        assert_eq!(
            err.to_string(),
            "dimension mismatch: `x0` has length 3 but `y0` has length 4"
        );
    }

    #[test]
    fn test_matching_lengths() {
        assert!(check_lengths("x0", 5, "psi0", 5).is_ok());
    }
}
