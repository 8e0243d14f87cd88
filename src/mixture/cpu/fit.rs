//! Host implementation of the EM fitter.

use nalgebra::DMatrix;

use crate::mixture::cpu::MixtureClient;
use crate::mixture::error::MixtureResult;
use crate::mixture::impl_generic::{mixture_fit_impl, mixture_refine_impl};
use crate::mixture::traits::dataset::Dataset;
use crate::mixture::traits::fit::{FitAlgorithms, FitOptions, FitResult};
use crate::mixture::traits::mixture::Mixture;

impl FitAlgorithms for MixtureClient {
    fn mixture_fit(
        &self,
        dataset: &Dataset,
        centers: &DMatrix<f64>,
        options: &FitOptions,
    ) -> MixtureResult<FitResult> {
        mixture_fit_impl(dataset, centers, options)
    }

    fn mixture_refine(
        &self,
        dataset: &Dataset,
        initial: &Mixture,
        options: &FitOptions,
    ) -> MixtureResult<FitResult> {
        mixture_refine_impl(dataset, initial, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mixture::cpu::testing::gaussian_blobs;
    use crate::mixture::error::MixtureError;
    use crate::mixture::traits::dataset::ObservationError;
    use crate::mixture::traits::mixture::CovarianceType;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use rand_distr::{Distribution, Normal};

    fn setup() -> (MixtureClient, Dataset) {
        let client = MixtureClient::with_table_resolution(20);
        let dataset = gaussian_blobs(&[vec![0.0, 0.0], vec![8.0, 8.0]], 1.0, 150, 11);
        (client, dataset)
    }

    fn one_factor_data(n: usize, seed: u64) -> Dataset {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let latent = Normal::new(0.0, 1.0).unwrap();
        let noise = Normal::new(0.0, 0.1f64.sqrt()).unwrap();
        let loadings = [1.0, 2.0, -1.0];
        let rows: Vec<Vec<f64>> = (0..n)
            .map(|_| {
                let nu = latent.sample(&mut rng);
                loadings
                    .iter()
                    .map(|a| 3.0 + nu * a + noise.sample(&mut rng))
                    .collect()
            })
            .collect();
        Dataset::from_rows(&rows, ObservationError::Scalar(1e-3)).unwrap()
    }

    fn mean_center(dataset: &Dataset) -> DMatrix<f64> {
        DMatrix::from_row_slice(1, dataset.n_dims(), dataset.mean().as_slice())
    }

    #[test]
    fn test_fit_two_blobs() {
        let (client, dataset) = setup();
        let centers = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 7.0, 7.0]);
        let result = client
            .mixture_fit(&dataset, &centers, &FitOptions::default())
            .unwrap();

        assert!(result.converged);
        assert_eq!(result.n_components(), 2);
        let mixture = &result.mixture;
        assert!((mixture.components[0].weight - 0.5).abs() < 1e-6);
        assert!(mixture.components[0].mean.norm() < 0.5);
        assert!((mixture.components[1].mean[0] - 8.0).abs() < 0.5);
        assert!(mixture.validate(2).is_ok());

        for row in result.responsibilities.row_iter() {
            assert!((row.sum() - 1.0).abs() < 1e-9);
        }
        let labels = result.labels();
        assert!(labels[..150].iter().all(|&l| l == 0));
        assert!(labels[150..].iter().all(|&l| l == 1));
    }

    #[test]
    fn test_refit_from_converged_is_stable() {
        let (client, dataset) = setup();
        let options = FitOptions::default();
        let centers = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 7.0, 7.0]);
        let first = client.mixture_fit(&dataset, &centers, &options).unwrap();
        let second = client
            .mixture_refine(&dataset, &first.mixture, &options)
            .unwrap();

        let before = first.message_length.total();
        let after = second.message_length.total();
        assert!((before - after).abs() <= options.convergence_tolerance * after.abs());
        for (a, b) in first.mixture.components.iter().zip(&second.mixture.components) {
            assert!((&a.mean - &b.mean).amax() < 1e-6);
            assert!((a.weight - b.weight).abs() < 1e-6);
        }
    }

    #[test]
    fn test_iteration_cap_carries_best_fit() {
        let (client, dataset) = setup();
        let options = FitOptions {
            max_em_iterations: 1,
            ..Default::default()
        };
        let centers = DMatrix::from_row_slice(2, 2, &[3.0, 3.0, 5.0, 5.0]);
        let err = client.mixture_fit(&dataset, &centers, &options).unwrap_err();
        assert!(matches!(
            err,
            MixtureError::NonConvergence { iterations: 1, .. }
        ));
        let best = err.into_best_fit().unwrap();
        assert_eq!(best.n_components(), 2);
        assert!(!best.converged);
        assert!(best.message_length.is_finite());
    }

    #[test]
    fn test_invalid_inputs() {
        let (client, dataset) = setup();
        let options = FitOptions {
            convergence_tolerance: 0.0,
            ..Default::default()
        };
        let centers = DMatrix::from_row_slice(1, 2, &[0.0, 0.0]);
        assert!(matches!(
            client.mixture_fit(&dataset, &centers, &options),
            Err(MixtureError::InvalidParameter { .. })
        ));

        let wrong_dims = DMatrix::from_row_slice(1, 3, &[0.0, 0.0, 0.0]);
        assert!(matches!(
            client.mixture_fit(&dataset, &wrong_dims, &FitOptions::default()),
            Err(MixtureError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_latent_factor_kept_for_rank_one_structure() {
        let client = MixtureClient::with_table_resolution(20);
        let dataset = one_factor_data(500, 5);
        let options = FitOptions {
            enable_latent_factor: true,
            ..Default::default()
        };
        let result = client
            .mixture_fit(&dataset, &mean_center(&dataset), &options)
            .unwrap();

        let component = &result.mixture.components[0];
        let factor = component.factor.as_ref().expect("factor should be kept");
        assert_eq!(factor.scores.len(), 500);
        // loadings recovered up to sign
        let a = &factor.loadings;
        assert!((a[1].abs() - 2.0).abs() < 0.3);
        assert!(a[0] * a[2] < 0.0);
        assert_eq!(result.mixture.n_factors(), 1);
        assert_eq!(result.summary.n_factors, 1);
        assert!(result.summary.factor_costs[0] > 0.0);
        // 9 Gaussian parameters plus 3 loadings
        assert_eq!(result.mixture.free_parameters(), 12.0);
    }

    #[test]
    fn test_latent_factor_dropped_for_isotropic_data() {
        let client = MixtureClient::with_table_resolution(20);
        let dataset = gaussian_blobs(&[vec![0.0, 0.0, 0.0]], 1.0, 500, 21);
        let options = FitOptions {
            enable_latent_factor: true,
            ..Default::default()
        };
        let result = client
            .mixture_fit(&dataset, &mean_center(&dataset), &options)
            .unwrap();

        let component = &result.mixture.components[0];
        assert!(component.factor.is_none());
        assert_eq!(result.mixture.n_factors(), 0);
        assert_eq!(result.summary.factor_costs[0], 0.0);
        assert_eq!(component.covariance[(0, 1)], 0.0);
        assert_eq!(component.covariance_type, CovarianceType::Diagonal);
        // 3 means and 3 variances
        assert_eq!(result.mixture.free_parameters(), 6.0);
        assert_eq!(result.summary.free_parameters(), 6.0);
    }

    #[test]
    fn test_diagonal_beats_full_on_axis_aligned_data() {
        let client = MixtureClient::with_table_resolution(20);
        let dataset = gaussian_blobs(&[vec![0.0, 0.0, 0.0]], 1.0, 1000, 17);
        let center = mean_center(&dataset);

        let full = client
            .mixture_fit(&dataset, &center, &FitOptions::default())
            .unwrap();
        let diagonal = client
            .mixture_fit(
                &dataset,
                &center,
                &FitOptions {
                    covariance_type: CovarianceType::Diagonal,
                    ..Default::default()
                },
            )
            .unwrap();

        let component = &diagonal.mixture.components[0];
        assert_eq!(component.covariance_type, CovarianceType::Diagonal);
        assert_eq!(component.covariance[(0, 2)], 0.0);
        assert_eq!(diagonal.mixture.free_parameters(), 6.0);
        assert_eq!(full.mixture.free_parameters(), 9.0);
        // the full fit explains the data slightly better but pays for 3 more parameters
        assert!(full.negative_log_likelihood <= diagonal.negative_log_likelihood);
        assert!(diagonal.message_length.total() < full.message_length.total());
    }

    #[test]
    fn test_diagonal_fit_keeps_component_structure() {
        let (client, dataset) = setup();
        let options = FitOptions {
            covariance_type: CovarianceType::Diagonal,
            ..Default::default()
        };
        let centers = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 7.0, 7.0]);
        let result = client.mixture_fit(&dataset, &centers, &options).unwrap();
        assert!(result.converged);
        assert!(result.mixture.validate(2).is_ok());
        assert_eq!(
            result.summary.covariance_types,
            vec![CovarianceType::Diagonal; 2]
        );
        // 2 x (2 means + 2 variances) + 1 weight
        assert_eq!(result.summary.free_parameters(), 9.0);
    }
}
