//! EM fitter for a fixed number of components.
//!
//! Iterates M-step / E-step until the relative change in message length
//! between iterations is within `convergence_tolerance`.

use nalgebra::DMatrix;
use tracing::{debug, warn};

use crate::mixture::error::{MixtureError, MixtureResult};
use crate::mixture::impl_generic::em::{
    Expectation, expectation, maximization, mixture_at_centers, nearest_center_responsibilities,
};
use crate::mixture::impl_generic::message_length::{message_length_from_summary, summarize};
use crate::mixture::traits::dataset::Dataset;
use crate::mixture::traits::fit::{FitOptions, FitResult};
use crate::mixture::traits::mixture::Mixture;
use crate::mixture::validation::validate_n_components;

/// Fit `centers.nrows()` components starting from hard assignment to the
/// nearest center.
pub fn mixture_fit_impl(
    dataset: &Dataset,
    centers: &DMatrix<f64>,
    options: &FitOptions,
) -> MixtureResult<FitResult> {
    options.validate()?;
    validate_n_components(centers.nrows(), dataset.n_samples(), "mixture_fit")?;
    if centers.ncols() != dataset.n_dims() {
        return Err(MixtureError::InvalidInput {
            context: format!(
                "mixture_fit: centers have {} columns, data has {} dimensions",
                centers.ncols(),
                dataset.n_dims()
            ),
        });
    }

    let data_covariance = dataset.covariance();
    let responsibilities = nearest_center_responsibilities(dataset.data(), centers);
    let start = mixture_at_centers(centers, &data_covariance);
    let mixture = maximization(dataset, &responsibilities, &start, &data_covariance, options)?;

    run_em(dataset, mixture, f64::INFINITY, &data_covariance, options)
}

/// Continue EM from a fully specified mixture.
pub fn mixture_refine_impl(
    dataset: &Dataset,
    initial: &Mixture,
    options: &FitOptions,
) -> MixtureResult<FitResult> {
    options.validate()?;
    initial.validate(dataset.n_dims())?;

    let e = expectation(dataset, initial)?;
    let summary = summarize(initial, dataset, e.log_dets.clone(), e.negative_log_likelihood);
    let initial_length = message_length_from_summary(&summary)?.total();

    let data_covariance = dataset.covariance();
    let mixture = maximization(dataset, &e.responsibilities, initial, &data_covariance, options)?;
    run_em(dataset, mixture, initial_length, &data_covariance, options)
}

fn run_em(
    dataset: &Dataset,
    mut mixture: Mixture,
    mut previous: f64,
    data_covariance: &DMatrix<f64>,
    options: &FitOptions,
) -> MixtureResult<FitResult> {
    let mut best: Option<FitResult> = None;

    for iter in 1..=options.max_em_iterations {
        let e = expectation(dataset, &mixture)?;
        let result = score(dataset, mixture, e, iter)?;
        let current = result.message_length.total();
        let converged = (previous - current).abs() <= options.convergence_tolerance * current.abs();

        if converged {
            debug!(
                k = result.n_components(),
                n_iter = iter,
                message_length = current,
                "EM converged"
            );
            return Ok(FitResult {
                converged: true,
                ..result
            });
        }

        mixture = maximization(
            dataset,
            &result.responsibilities,
            &result.mixture,
            data_covariance,
            options,
        )?;
        previous = current;
        if best
            .as_ref()
            .is_none_or(|b| current < b.message_length.total())
        {
            best = Some(result);
        }
    }

    let best = best.ok_or_else(|| MixtureError::InvalidParameter {
        parameter: "max_em_iterations".to_string(),
        message: "must be >= 1 to produce a fit".to_string(),
    })?;
    warn!(
        k = best.n_components(),
        iterations = options.max_em_iterations,
        message_length = best.message_length.total(),
        "EM iteration cap reached before convergence"
    );
    Err(MixtureError::NonConvergence {
        iterations: options.max_em_iterations,
        tolerance: options.convergence_tolerance,
        best: Box::new(best),
    })
}

fn score(dataset: &Dataset, mixture: Mixture, e: Expectation, n_iter: usize) -> MixtureResult<FitResult> {
    let summary = summarize(&mixture, dataset, e.log_dets, e.negative_log_likelihood);
    let message_length = message_length_from_summary(&summary)?;
    Ok(FitResult {
        mixture,
        message_length,
        responsibilities: e.responsibilities,
        negative_log_likelihood: e.negative_log_likelihood,
        summary,
        n_iter,
        converged: false,
    })
}
