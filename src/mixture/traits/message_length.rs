//! Two-part message length trait and records.

use crate::mixture::error::MixtureResult;
use crate::mixture::traits::dataset::Dataset;
use crate::mixture::traits::mixture::{CovarianceType, Mixture, free_parameters};

/// Decomposed two-part message length of one mixture, in bits.
///
/// Always a fresh value computed from a specific mixture; never updated in place.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MessageLength {
    /// Part 1a: number of classes, `K log 2`.
    pub class_count: f64,
    /// Part 1b: mixing proportions.
    pub mixing_proportions: f64,
    /// Part 1c: component (and latent factor) parameters.
    pub component_parameters: f64,
    /// Part 2: data given the model, including the lattice correction.
    pub data: f64,
}

impl MessageLength {
    /// Exact sum of the four parts.
    pub fn total(&self) -> f64 {
        self.class_count + self.mixing_proportions + self.component_parameters + self.data
    }

    /// Whether every part is finite.
    pub fn is_finite(&self) -> bool {
        self.class_count.is_finite()
            && self.mixing_proportions.is_finite()
            && self.component_parameters.is_finite()
            && self.data.is_finite()
    }
}

/// ΔI = I(candidate) - I(current), broken into the same four parts (bits).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MessageLengthDelta {
    pub class_count: f64,
    /// Weight-ratio and `ln Γ(K)` terms.
    pub mixing_proportions: f64,
    pub component_parameters: f64,
    /// Likelihood ratio and free-parameter-count terms.
    pub data: f64,
    /// Whether `½ ln(Q'/Q)` was replaced by its large-K/large-D form `ΔQ / 2Q`.
    pub asymptotic: bool,
}

impl MessageLengthDelta {
    pub fn total(&self) -> f64 {
        self.class_count + self.mixing_proportions + self.component_parameters + self.data
    }

    /// Candidate encodes strictly shorter than the current mixture.
    pub fn improves(&self) -> bool {
        self.total() < 0.0
    }
}

/// Sufficient statistics of a scored mixture; everything the evaluator and
/// the ΔI recurrence need, without the data.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MixtureSummary {
    /// Number of observations N.
    pub n_samples: usize,
    /// Dimensionality D.
    pub n_dims: usize,
    /// Mixing weights [k].
    pub weights: Vec<f64>,
    /// ln|C_k| per component [k].
    pub log_dets: Vec<f64>,
    /// Covariance parameterization per component [k].
    pub covariance_types: Vec<CovarianceType>,
    /// Latent-factor cost in nats per component, 0 when absent [k].
    pub factor_costs: Vec<f64>,
    /// Number of components with an active factor.
    pub n_factors: usize,
    /// Negative log-likelihood of the data in nats.
    pub negative_log_likelihood: f64,
    /// Σ_d ln(y_err_d).
    pub log_error_sum: f64,
}

impl MixtureSummary {
    pub fn n_components(&self) -> usize {
        self.weights.len()
    }

    /// Free-parameter count Q of the summarised mixture.
    pub fn free_parameters(&self) -> f64 {
        free_parameters(&self.covariance_types, self.n_dims, self.n_factors)
    }
}

/// Message-length evaluation.
pub trait MessageLengthAlgorithms {
    /// Score a mixture against a dataset.
    ///
    /// # Errors
    ///
    /// `InvalidMixture` for non-positive weights, weights not summing to one,
    /// covariances that are not positive-definite, or any non-finite part.
    fn message_length(&self, mixture: &Mixture, dataset: &Dataset) -> MixtureResult<MessageLength>;

    /// Sufficient statistics of a mixture against a dataset.
    fn mixture_summary(&self, mixture: &Mixture, dataset: &Dataset) -> MixtureResult<MixtureSummary>;

    /// ΔI between two mixtures of the same dataset.
    ///
    /// The `½ ln(Q'/Q)` term uses its asymptotic form only when both K and D
    /// exceed `asymptotic_threshold`.
    fn message_length_delta(
        &self,
        current: &MixtureSummary,
        candidate: &MixtureSummary,
        asymptotic_threshold: Option<usize>,
    ) -> MessageLengthDelta;
}
