//! Expectation and maximization steps of the MML-weighted EM fitter.

use std::f64::consts::PI;

use nalgebra::{DMatrix, DVector};

use crate::mixture::error::{MixtureError, MixtureResult};
use crate::mixture::impl_generic::factor::select_factor;
use crate::mixture::impl_generic::linalg::{
    covariance_cholesky, log_det_cholesky, weighted_mean, weighted_scatter,
};
use crate::mixture::traits::dataset::Dataset;
use crate::mixture::traits::fit::FitOptions;
use crate::mixture::traits::mixture::{Component, CovarianceType, Mixture};

/// Output of one E-step.
#[derive(Debug, Clone)]
pub(crate) struct Expectation {
    /// Responsibilities [n, k].
    pub responsibilities: DMatrix<f64>,
    /// -Σ_n ln Σ_k w_k N(x_n | μ_k, C_k), in nats.
    pub negative_log_likelihood: f64,
    /// ln|C_k| [k].
    pub log_dets: Vec<f64>,
}

/// Compute responsibilities and the negative log-likelihood.
///
/// Fails with `InvalidMixture` when any covariance is not positive-definite.
pub(crate) fn expectation(dataset: &Dataset, mixture: &Mixture) -> MixtureResult<Expectation> {
    let data = dataset.data();
    let n = dataset.n_samples();
    let d = dataset.n_dims();
    let k = mixture.n_components();
    let log_2pi = (2.0 * PI).ln();

    // ln w_k + ln N(x_n | μ_k, C_k)
    let mut log_weighted = DMatrix::<f64>::zeros(n, k);
    let mut log_dets = Vec::with_capacity(k);

    for (j, component) in mixture.components.iter().enumerate() {
        let chol = covariance_cholesky(&component.covariance, &format!("component {j}"))?;
        let log_det = log_det_cholesky(&chol);

        let mut diffs = data.transpose();
        for mut col in diffs.column_iter_mut() {
            col -= &component.mean;
        }
        let l = chol.l();
        let z = l
            .solve_lower_triangular(&diffs)
            .ok_or_else(|| MixtureError::InvalidMixture {
                reason: format!("component {j}: singular Cholesky factor"),
            })?;

        let log_w = component.weight.ln();
        for (i, col) in z.column_iter().enumerate() {
            log_weighted[(i, j)] =
                log_w - 0.5 * (d as f64 * log_2pi + log_det + col.norm_squared());
        }
        log_dets.push(log_det);
    }

    let mut responsibilities = DMatrix::<f64>::zeros(n, k);
    let mut log_likelihood = 0.0;
    for i in 0..n {
        let row = log_weighted.row(i);
        let max = row.max();
        let lse = max + row.iter().map(|v| (v - max).exp()).sum::<f64>().ln();
        for j in 0..k {
            responsibilities[(i, j)] = (log_weighted[(i, j)] - lse).exp();
        }
        log_likelihood += lse;
    }

    if !log_likelihood.is_finite() {
        return Err(MixtureError::InvalidMixture {
            reason: "log-likelihood is not finite".to_string(),
        });
    }

    Ok(Expectation {
        responsibilities,
        negative_log_likelihood: -log_likelihood,
        log_dets,
    })
}

/// Update weights, means and covariances from responsibilities.
///
/// Weights use the MML estimate `(n_k + ½) / (N + K/2)`, so none is ever zero.
/// A component that owns less than one effective observation keeps its
/// previous mean and falls back to the data covariance. Diagonal components
/// keep only the diagonal of their scatter; with latent factors, a component
/// whose factor is rejected becomes diagonal.
pub(crate) fn maximization(
    dataset: &Dataset,
    responsibilities: &DMatrix<f64>,
    previous: &Mixture,
    data_covariance: &DMatrix<f64>,
    options: &FitOptions,
) -> MixtureResult<Mixture> {
    let data = dataset.data();
    let n = dataset.n_samples();
    let d = dataset.n_dims();
    let k = responsibilities.ncols();
    let regularization = DMatrix::<f64>::identity(d, d) * options.covariance_regularization;

    let mut components = Vec::with_capacity(k);
    for j in 0..k {
        let r: Vec<f64> = responsibilities.column(j).iter().copied().collect();
        let n_k: f64 = r.iter().sum();
        let weight = (n_k + 0.5) / (n as f64 + 0.5 * k as f64);

        let mean = match weighted_mean(data, &r) {
            Some(mean) if n_k >= 1.0 => mean,
            _ => {
                let fallback = previous
                    .components
                    .get(j)
                    .map_or_else(|| dataset.mean(), |c| c.mean.clone());
                components.push(Component::with_covariance_type(
                    weight,
                    fallback,
                    data_covariance + &regularization,
                    options.covariance_type,
                ));
                continue;
            }
        };

        let denominator = if n_k > 1.0 { n_k - 1.0 } else { n_k };
        let scatter = weighted_scatter(data, &r, &mean) / denominator;

        let component = if options.enable_latent_factor {
            let (covariance, factor) =
                select_factor(dataset, &mean, &scatter, n_k, weight, options)?;
            let covariance_type = if factor.is_some() {
                CovarianceType::Full
            } else {
                CovarianceType::Diagonal
            };
            Component {
                weight,
                mean,
                covariance: covariance + &regularization,
                covariance_type,
                factor,
            }
        } else {
            Component::with_covariance_type(
                weight,
                mean,
                scatter + &regularization,
                options.covariance_type,
            )
        };
        components.push(component);
    }

    Ok(Mixture::new(components))
}

/// Hard-assign every observation to its nearest center.
pub(crate) fn nearest_center_responsibilities(
    data: &DMatrix<f64>,
    centers: &DMatrix<f64>,
) -> DMatrix<f64> {
    let n = data.nrows();
    let k = centers.nrows();
    let mut responsibilities = DMatrix::<f64>::zeros(n, k);
    for i in 0..n {
        let x = data.row(i);
        let nearest = (0..k)
            .map(|j| (j, (x - centers.row(j)).norm_squared()))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map_or(0, |(j, _)| j);
        responsibilities[(i, nearest)] = 1.0;
    }
    responsibilities
}

/// Mixture whose components sit at `centers` with the data covariance,
/// used as the fallback state for empty clusters on the first M-step.
pub(crate) fn mixture_at_centers(centers: &DMatrix<f64>, data_covariance: &DMatrix<f64>) -> Mixture {
    let k = centers.nrows();
    let components = (0..k)
        .map(|j| {
            Component::new(
                1.0 / k as f64,
                DVector::from_iterator(centers.ncols(), centers.row(j).iter().copied()),
                data_covariance.clone(),
            )
        })
        .collect();
    Mixture::new(components)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mixture::traits::dataset::ObservationError;

    fn two_blobs() -> Dataset {
        let rows: Vec<Vec<f64>> = [-5.2, -5.0, -4.8, -5.1, 4.9, 5.0, 5.1, 5.2]
            .iter()
            .map(|&x| vec![x])
            .collect();
        Dataset::from_rows(&rows, ObservationError::Scalar(0.01)).unwrap()
    }

    #[test]
    fn test_expectation_rows_sum_to_one() {
        let ds = two_blobs();
        let mixture = Mixture::new(vec![
            Component::new(0.5, DVector::from_vec(vec![-5.0]), DMatrix::identity(1, 1)),
            Component::new(0.5, DVector::from_vec(vec![5.0]), DMatrix::identity(1, 1)),
        ]);
        let e = expectation(&ds, &mixture).unwrap();
        for row in e.responsibilities.row_iter() {
            assert!((row.sum() - 1.0).abs() < 1e-12);
        }
        assert!(e.responsibilities[(0, 0)] > 0.999);
        assert!(e.responsibilities[(7, 1)] > 0.999);
        assert!(e.negative_log_likelihood.is_finite());
    }

    #[test]
    fn test_maximization_mml_weights() {
        let ds = two_blobs();
        let centers = DMatrix::from_row_slice(2, 1, &[-5.0, 5.0]);
        let r = nearest_center_responsibilities(ds.data(), &centers);
        let previous = mixture_at_centers(&centers, &ds.covariance());
        let m = maximization(&ds, &r, &previous, &ds.covariance(), &FitOptions::default()).unwrap();
        // (4 + ½) / (8 + 1)
        assert!((m.components[0].weight - 0.5).abs() < 1e-12);
        assert!((m.components[0].mean[0] + 5.025).abs() < 1e-12);
        let total: f64 = m.weights().iter().sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_maximization_empty_cluster_falls_back() {
        let ds = two_blobs();
        let centers = DMatrix::from_row_slice(3, 1, &[-5.0, 5.0, 100.0]);
        let r = nearest_center_responsibilities(ds.data(), &centers);
        let previous = mixture_at_centers(&centers, &ds.covariance());
        let m = maximization(&ds, &r, &previous, &ds.covariance(), &FitOptions::default()).unwrap();
        assert_eq!(m.n_components(), 3);
        assert!((m.components[2].mean[0] - 100.0).abs() < 1e-12);
        assert!(m.components[2].weight > 0.0);
    }
}
