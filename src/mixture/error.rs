//! Error types for mixture search operations.

use std::fmt;

use crate::mixture::traits::fit::FitResult;

/// Result type for mixture operations.
pub type MixtureResult<T> = Result<T, MixtureError>;

/// Errors that can occur while scoring, fitting, or searching mixtures.
#[derive(Debug, Clone)]
pub enum MixtureError {
    /// Weights or covariances are malformed (non-positive weight, weights not
    /// summing to one, covariance not positive-definite, non-finite cost).
    InvalidMixture { reason: String },

    /// The EM iteration cap was reached before the tolerance was met.
    ///
    /// Carries the best fit seen so the caller can accept it or reseed.
    NonConvergence {
        iterations: usize,
        tolerance: f64,
        best: Box<FitResult>,
    },

    /// The split lookup produced weights below the usable floor.
    DegenerateSplit { weights: Vec<f64>, context: String },

    /// The controller stopped on its transition cap or on a revisited K.
    SearchExhausted { transitions: usize, reason: String },

    /// Invalid option value.
    InvalidParameter { parameter: String, message: String },

    /// Invalid input data or dimensions.
    InvalidInput { context: String },
}

impl fmt::Display for MixtureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidMixture { reason } => {
                write!(f, "Invalid mixture: {}", reason)
            }
            Self::NonConvergence {
                iterations,
                tolerance,
                best,
            } => {
                write!(
                    f,
                    "EM did not converge after {} iterations (tolerance: {}, best message length: {:.3} bits)",
                    iterations,
                    tolerance,
                    best.message_length.total()
                )
            }
            Self::DegenerateSplit { weights, context } => {
                write!(
                    f,
                    "Degenerate split in {}: weights {:?} fall below the floor",
                    context, weights
                )
            }
            Self::SearchExhausted {
                transitions,
                reason,
            } => {
                write!(
                    f,
                    "Search exhausted after {} transitions: {}",
                    transitions, reason
                )
            }
            Self::InvalidParameter { parameter, message } => {
                write!(f, "Invalid parameter '{}': {}", parameter, message)
            }
            Self::InvalidInput { context } => {
                write!(f, "Invalid input in {}", context)
            }
        }
    }
}

impl std::error::Error for MixtureError {}

impl MixtureError {
    /// The best-so-far fit carried by a `NonConvergence` error.
    pub fn into_best_fit(self) -> Option<FitResult> {
        match self {
            Self::NonConvergence { best, .. } => Some(*best),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MixtureError::InvalidMixture {
            reason: "weight 0 of component 1 is not positive".to_string(),
        };
        assert!(err.to_string().contains("component 1"));

        let err = MixtureError::InvalidParameter {
            parameter: "min_k".to_string(),
            message: "must be at least 1".to_string(),
        };
        assert!(err.to_string().contains("min_k"));

        let err = MixtureError::SearchExhausted {
            transitions: 4,
            reason: "transition cap reached".to_string(),
        };
        assert!(err.to_string().contains("4 transitions"));
    }

    #[test]
    fn test_into_best_fit_only_for_non_convergence() {
        let err = MixtureError::DegenerateSplit {
            weights: vec![0.001, 0.999],
            context: "lookup".to_string(),
        };
        assert!(err.into_best_fit().is_none());
    }
}
