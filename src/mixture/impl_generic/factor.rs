//! Single latent factor per component: `C = diag(ψ) + a aᵀ`.
//!
//! Loadings are estimated by single-factor EM on the component's weighted
//! scatter. The factor is kept only when it pays for its own encoding.

use nalgebra::{DMatrix, DVector};
use tracing::debug;

use crate::mixture::error::MixtureResult;
use crate::mixture::impl_generic::linalg::{covariance_cholesky, log_det_cholesky, top_eigenpair};
use crate::mixture::traits::dataset::Dataset;
use crate::mixture::traits::fit::FitOptions;
use crate::mixture::traits::mixture::{CovarianceType, LatentFactor};

/// Specific variances never fall below this fraction of the marginal variance.
const SPECIFIC_VARIANCE_FLOOR: f64 = 1e-6;

/// Encoding cost of one factor in nats: `½ [D ln(N w) + ln(1 + ‖b‖²)]`
/// with `b_d = a_d / σ_d`.
///
/// The likelihood is the marginal one with the scores integrated out, so only
/// the loadings are charged for.
pub fn factor_cost(n_samples: usize, weight: f64, factor: &LatentFactor) -> f64 {
    let d = factor.loadings.len() as f64;
    let n_w = n_samples as f64 * weight;
    0.5 * (d * n_w.ln() + (1.0 + factor.scaled_loading_norm_sq()).ln())
}

/// Single-factor EM on a scatter matrix. Returns `(a, ψ)`.
pub(crate) fn fit_single_factor(
    scatter: &DMatrix<f64>,
    max_iterations: usize,
    tolerance: f64,
) -> (DVector<f64>, DVector<f64>) {
    let d = scatter.nrows();
    let diag = scatter.diagonal();
    let floor = diag.map(|s| (s * SPECIFIC_VARIANCE_FLOOR).max(f64::MIN_POSITIVE));

    let (lambda, v) = top_eigenpair(scatter);
    let mut a = v * lambda.max(0.0).sqrt();
    let mut psi = DVector::from_fn(d, |i, _| (diag[i] - a[i] * a[i]).max(floor[i]));

    for _ in 0..max_iterations {
        let beta = factor_weights(&a, &psi);
        let s_beta = scatter * &beta;
        let ezz = 1.0 - beta.dot(&a) + beta.dot(&s_beta);
        if ezz <= 0.0 || !ezz.is_finite() {
            break;
        }
        let a_new = &s_beta / ezz;
        let psi_new = DVector::from_fn(d, |i, _| (diag[i] - a_new[i] * s_beta[i]).max(floor[i]));

        let change = (&a_new - &a).amax() + (&psi_new - &psi).amax();
        a = a_new;
        psi = psi_new;
        if change <= tolerance * diag.amax() {
            break;
        }
    }
    (a, psi)
}

/// `β = Ψ⁻¹a / (1 + aᵀΨ⁻¹a)`; scores are `βᵀ(x - μ)`.
fn factor_weights(loadings: &DVector<f64>, psi: &DVector<f64>) -> DVector<f64> {
    let psi_inv_a = loadings.component_div(psi);
    let denominator = 1.0 + loadings.dot(&psi_inv_a);
    psi_inv_a / denominator
}

/// Factor scores `ν_n` of every observation.
pub(crate) fn factor_scores(
    data: &DMatrix<f64>,
    mean: &DVector<f64>,
    loadings: &DVector<f64>,
    psi: &DVector<f64>,
) -> Vec<f64> {
    let beta = factor_weights(loadings, psi);
    let offset = beta.dot(mean);
    (data * &beta).iter().map(|v| v - offset).collect()
}

/// `ln|C| + tr(C⁻¹ S)`, the per-observation Gaussian cost of covariance C.
fn covariance_cost(covariance: &DMatrix<f64>, scatter: &DMatrix<f64>) -> MixtureResult<(f64, f64)> {
    let chol = covariance_cholesky(covariance, "latent factor")?;
    let log_det = log_det_cholesky(&chol);
    Ok((log_det, log_det + chol.solve(scatter).trace()))
}

/// Fit a factor for one component and decide whether to keep it.
///
/// Returns the component covariance (`diag(ψ) + a aᵀ` when the factor is
/// kept, `diag(S)` otherwise) and the factor, if any. The factor is kept when
/// the likelihood gain exceeds its own cost plus the difference between
/// stating a full and a diagonal covariance.
pub(crate) fn select_factor(
    dataset: &Dataset,
    mean: &DVector<f64>,
    scatter: &DMatrix<f64>,
    n_k: f64,
    weight: f64,
    options: &FitOptions,
) -> MixtureResult<(DMatrix<f64>, Option<LatentFactor>)> {
    let d = dataset.n_dims();
    let diagonal = DMatrix::from_diagonal(&scatter.diagonal());
    let (a, psi) = fit_single_factor(
        scatter,
        options.max_factor_iterations,
        options.convergence_tolerance,
    );
    let with_factor = DMatrix::from_diagonal(&psi) + &a * a.transpose();

    let (log_det_0, cost_0) = covariance_cost(&diagonal, scatter)?;
    let (log_det_1, cost_1) = covariance_cost(&with_factor, scatter)?;
    let gain = 0.5 * n_k * (cost_0 - cost_1);

    let factor = LatentFactor {
        scores: factor_scores(dataset.data(), mean, &a, &psi),
        loadings: a,
        specific_variances: psi,
    };
    // A kept factor states a full covariance, a rejected one a diagonal
    let (full, diag) = (CovarianceType::Full, CovarianceType::Diagonal);
    let n_w = dataset.n_samples() as f64 * weight;
    let structure = 0.5
        * ((full.parameters(d) - diag.parameters(d)) * n_w.ln()
            - full.log_det_exponent(d) * log_det_1
            + diag.log_det_exponent(d) * log_det_0);
    let cost = factor_cost(dataset.n_samples(), weight, &factor) + structure;

    if cost < gain {
        Ok((with_factor, Some(factor)))
    } else {
        debug!(cost, gain, "latent factor does not pay for itself");
        Ok((diagonal, None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_factor_recovers_rank_one_structure() {
        // C = diag(0.1) + a aᵀ with a = (1, 2, -1)
        let a = DVector::from_vec(vec![1.0, 2.0, -1.0]);
        let scatter = DMatrix::from_diagonal_element(3, 3, 0.1) + &a * a.transpose();
        let (loadings, psi) = fit_single_factor(&scatter, 5000, 1e-12);

        let reconstructed = DMatrix::from_diagonal(&psi) + &loadings * loadings.transpose();
        assert!((reconstructed - &scatter).amax() < 1e-4);
        assert!((loadings.dot(&loadings) - 6.0).abs() < 1e-3);
    }

    #[test]
    fn test_factor_cost() {
        let factor = LatentFactor {
            loadings: DVector::from_vec(vec![1.0, 1.0]),
            specific_variances: DVector::from_vec(vec![1.0, 1.0]),
            scores: Vec::new(),
        };
        // ½ [2 ln 50 + ln 3]
        let expected = 0.5 * (2.0 * 50.0f64.ln() + 3.0f64.ln());
        assert!((factor_cost(100, 0.5, &factor) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_factor_scores_centered() {
        let data = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, -1.0, -1.0]);
        let mean = DVector::zeros(2);
        let a = DVector::from_vec(vec![1.0, 1.0]);
        let psi = DVector::from_vec(vec![1.0, 1.0]);
        let scores = factor_scores(&data, &mean, &a, &psi);
        // β = (1, 1) / 3
        assert!((scores[0] - 2.0 / 3.0).abs() < 1e-12);
        assert!((scores[1] + 2.0 / 3.0).abs() < 1e-12);
    }
}
