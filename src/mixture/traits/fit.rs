//! Fixed-K component fitter trait.

use nalgebra::DMatrix;

use crate::mixture::error::MixtureResult;
use crate::mixture::traits::dataset::Dataset;
use crate::mixture::traits::message_length::{MessageLength, MixtureSummary};
use crate::mixture::traits::mixture::{CovarianceType, Mixture};
use crate::mixture::validation::{validate_iterations, validate_non_negative, validate_positive};

/// Options for the EM fitter.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FitOptions {
    /// Stop once the relative change in message length between iterations
    /// falls to or below this value.
    pub convergence_tolerance: f64,
    /// Maximum EM iterations.
    pub max_em_iterations: usize,
    /// Covariance parameterization of fitted components.
    pub covariance_type: CovarianceType,
    /// Regularization added to covariance diagonal.
    pub covariance_regularization: f64,
    /// Fit a single latent factor per component and keep it only when it
    /// shortens the message. Overrides `covariance_type`: a component with a
    /// factor is full, one without is diagonal.
    pub enable_latent_factor: bool,
    /// Maximum inner iterations of the single-factor estimate.
    pub max_factor_iterations: usize,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            convergence_tolerance: 1e-5,
            max_em_iterations: 10_000,
            covariance_type: CovarianceType::Full,
            covariance_regularization: 1e-6,
            enable_latent_factor: false,
            max_factor_iterations: 200,
        }
    }
}

impl FitOptions {
    pub fn validate(&self) -> MixtureResult<()> {
        validate_positive(self.convergence_tolerance, "convergence_tolerance", "fit")?;
        validate_iterations(self.max_em_iterations, "max_em_iterations", "fit")?;
        validate_non_negative(self.covariance_regularization, "covariance_regularization", "fit")?;
        validate_iterations(self.max_factor_iterations, "max_factor_iterations", "fit")?;
        Ok(())
    }
}

/// Locally optimal mixture for one K, together with its score.
#[derive(Debug, Clone)]
pub struct FitResult {
    /// Fitted mixture.
    pub mixture: Mixture,
    /// Message length of `mixture` against the fitted dataset.
    pub message_length: MessageLength,
    /// Responsibilities [n, k]; rows sum to one.
    pub responsibilities: DMatrix<f64>,
    /// Negative log-likelihood in nats.
    pub negative_log_likelihood: f64,
    /// Sufficient statistics for ΔI.
    pub summary: MixtureSummary,
    /// Number of EM iterations run.
    pub n_iter: usize,
    /// Whether the tolerance was met.
    pub converged: bool,
}

impl FitResult {
    /// Number of components K.
    pub fn n_components(&self) -> usize {
        self.mixture.n_components()
    }

    /// Hard assignment of each observation to its most responsible component.
    pub fn labels(&self) -> Vec<usize> {
        self.responsibilities
            .row_iter()
            .map(|row| row.transpose().imax())
            .collect()
    }
}

/// EM fitting for a fixed number of components.
pub trait FitAlgorithms {
    /// Fit `centers.nrows()` components starting from the given centers
    /// [k, d] (typically k-means++ seeds).
    ///
    /// # Errors
    ///
    /// `NonConvergence` carrying the best-so-far fit when the iteration cap is
    /// reached first.
    fn mixture_fit(
        &self,
        dataset: &Dataset,
        centers: &DMatrix<f64>,
        options: &FitOptions,
    ) -> MixtureResult<FitResult>;

    /// Continue EM from a fully specified mixture.
    fn mixture_refine(
        &self,
        dataset: &Dataset,
        initial: &Mixture,
        options: &FitOptions,
    ) -> MixtureResult<FitResult>;
}
