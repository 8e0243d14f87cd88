//! Two-part message length of a Gaussian mixture and the ΔI recurrence.
//!
//! All parts are accumulated in nats and reported in bits.

use std::f64::consts::{LN_2, PI};

use crate::mixture::error::{MixtureError, MixtureResult};
use crate::mixture::impl_generic::em::expectation;
use crate::mixture::impl_generic::factor::factor_cost;
use crate::mixture::special::ln_gamma;
use crate::mixture::traits::dataset::Dataset;
use crate::mixture::traits::message_length::{MessageLength, MessageLengthDelta, MixtureSummary};
use crate::mixture::traits::mixture::Mixture;

/// Score a mixture against a dataset.
pub fn message_length_impl(mixture: &Mixture, dataset: &Dataset) -> MixtureResult<MessageLength> {
    let summary = mixture_summary_impl(mixture, dataset)?;
    message_length_from_summary(&summary)
}

/// Validate a mixture and collect its sufficient statistics.
pub fn mixture_summary_impl(mixture: &Mixture, dataset: &Dataset) -> MixtureResult<MixtureSummary> {
    mixture.validate(dataset.n_dims())?;
    let e = expectation(dataset, mixture)?;
    Ok(summarize(mixture, dataset, e.log_dets, e.negative_log_likelihood))
}

/// Assemble a summary from quantities the E-step already produced.
pub(crate) fn summarize(
    mixture: &Mixture,
    dataset: &Dataset,
    log_dets: Vec<f64>,
    negative_log_likelihood: f64,
) -> MixtureSummary {
    let n = dataset.n_samples();
    let factor_costs = mixture
        .components
        .iter()
        .map(|c| c.factor.as_ref().map_or(0.0, |f| factor_cost(n, c.weight, f)))
        .collect();

    MixtureSummary {
        n_samples: n,
        n_dims: dataset.n_dims(),
        weights: mixture.weights(),
        log_dets,
        covariance_types: mixture.covariance_types(),
        factor_costs,
        n_factors: mixture.n_factors(),
        negative_log_likelihood,
        log_error_sum: dataset.log_error_sum(),
    }
}

/// Four-part message length of a summarised mixture, in bits.
pub fn message_length_from_summary(summary: &MixtureSummary) -> MixtureResult<MessageLength> {
    let k = summary.n_components();
    let q = summary.free_parameters();

    let length = MessageLength {
        class_count: k as f64,
        mixing_proportions: mixing_nats(summary) / LN_2,
        component_parameters: component_nats(summary) / LN_2,
        data: (likelihood_nats(summary) - 0.5 * q * (2.0 * PI).ln() + 0.5 * (q * PI).ln()) / LN_2,
    };

    if !length.is_finite() {
        return Err(MixtureError::InvalidMixture {
            reason: format!("message length is not finite: {:?}", length),
        });
    }
    Ok(length)
}

/// ΔI = I(candidate) - I(current), assembled term by term.
///
/// `½ ln(Q'/Q)` is replaced by `(Q' - Q) / 2Q` only when both K and D of the
/// current mixture exceed `asymptotic_threshold`.
pub fn message_length_delta_impl(
    current: &MixtureSummary,
    candidate: &MixtureSummary,
    asymptotic_threshold: Option<usize>,
) -> MessageLengthDelta {
    let k = current.n_components();
    let q = current.free_parameters();
    let q_new = candidate.free_parameters();

    let asymptotic =
        asymptotic_threshold.is_some_and(|t| k > t && current.n_dims > t);
    let lattice = if asymptotic {
        0.5 * (q_new - q) / q
    } else {
        0.5 * (q_new / q).ln()
    };

    let likelihood = likelihood_nats(candidate) - likelihood_nats(current);
    let data = likelihood - 0.5 * (q_new - q) * (2.0 * PI).ln() + lattice;

    MessageLengthDelta {
        class_count: candidate.n_components() as f64 - k as f64,
        mixing_proportions: (mixing_nats(candidate) - mixing_nats(current)) / LN_2,
        component_parameters: (component_nats(candidate) - component_nats(current)) / LN_2,
        data: data / LN_2,
        asymptotic,
    }
}

/// `(K-1)/2 ln N - ½ Σ ln w_k - ln Γ(K)`; zero for K = 1.
fn mixing_nats(s: &MixtureSummary) -> f64 {
    let k = s.n_components() as f64;
    let sum_log_w: f64 = s.weights.iter().map(|w| w.ln()).sum();
    0.5 * (k - 1.0) * (s.n_samples as f64).ln() - 0.5 * sum_log_w - ln_gamma(k)
}

/// `½ Σ_k [P_k ln(N w_k) - e_k ln|C_k| - D ln 2]` plus factor costs, where a
/// full covariance has `P = D(D+3)/2, e = D+2` and a diagonal one `P = 2D, e = 3`.
fn component_nats(s: &MixtureSummary) -> f64 {
    let d = s.n_dims;
    let n = s.n_samples as f64;
    let gaussian: f64 = s
        .weights
        .iter()
        .zip(&s.log_dets)
        .zip(&s.covariance_types)
        .map(|((w, log_det), t)| {
            t.parameters(d) * (n * w).ln() - t.log_det_exponent(d) * log_det - d as f64 * LN_2
        })
        .sum();
    0.5 * gaussian + s.factor_costs.iter().sum::<f64>()
}

/// Negative log-likelihood less the `N Σ ln y_err` precision term.
fn likelihood_nats(s: &MixtureSummary) -> f64 {
    s.negative_log_likelihood - s.n_samples as f64 * s.log_error_sum
}
