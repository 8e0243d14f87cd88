//! Host implementation of the split heuristic.

use crate::mixture::cpu::MixtureClient;
use crate::mixture::error::MixtureResult;
use crate::mixture::impl_generic::{split_lookup_impl, split_projection_impl, suggest_split_impl};
use crate::mixture::traits::dataset::Dataset;
use crate::mixture::traits::mixture::Component;
use crate::mixture::traits::split::{
    Projection, SplitAlgorithms, SplitOptions, SplitSuggestion, SplitTable, StandardizedMoments,
};

impl SplitAlgorithms for MixtureClient {
    fn split_table(&self) -> &SplitTable {
        &self.split_table
    }

    fn split_projection(
        &self,
        dataset: &Dataset,
        component: &Component,
        responsibilities: &[f64],
    ) -> MixtureResult<Projection> {
        split_projection_impl(dataset, component, responsibilities)
    }

    fn split_lookup(
        &self,
        moments: &StandardizedMoments,
        options: &SplitOptions,
    ) -> MixtureResult<SplitSuggestion> {
        split_lookup_impl(&self.split_table, moments, options)
    }

    fn suggest_split(&self, moments: &StandardizedMoments, options: &SplitOptions) -> SplitSuggestion {
        suggest_split_impl(&self.split_table, moments, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mixture::cpu::testing::{gaussian_blobs, scale_mixture_1d};
    use crate::mixture::impl_generic::scale_mixture_moments;
    use nalgebra::{DMatrix, DVector};

    fn setup() -> MixtureClient {
        MixtureClient::new()
    }

    fn moments_of(client: &MixtureClient, dataset: &Dataset) -> Projection {
        let component = Component::new(1.0, dataset.mean(), dataset.covariance());
        let r = vec![1.0; dataset.n_samples()];
        client.split_projection(dataset, &component, &r).unwrap()
    }

    #[test]
    fn test_table_is_built_once_and_shared() {
        let client = setup();
        assert!(!client.split_table().is_empty());
        let clone = client.clone();
        assert!(std::sync::Arc::ptr_eq(
            &client.shared_split_table(),
            &clone.shared_split_table()
        ));
    }

    #[test]
    fn test_equal_means_different_variances_split() {
        let client = setup();
        let options = SplitOptions::default();

        // Exact moments of ½ N(0, σ1²) + ½ N(0, σ2²), σ1² : σ2² = 1 : 3
        let exact = scale_mixture_moments(&[0.5, 0.5], &[0.5, 1.5]);
        assert!(exact.excess_kurtosis() > options.kurtosis_threshold);
        assert!(client.suggest_split(&exact, &options).is_split());

        // Same shape measured from a sample
        let dataset = scale_mixture_1d(&[0.5, 2.0], 2000, 17);
        let projection = moments_of(&client, &dataset);
        match client.suggest_split(&projection.moments, &options) {
            SplitSuggestion::Split {
                weights,
                variances,
                offsets,
            } => {
                assert_eq!(weights.len(), 2);
                assert!(weights.iter().all(|&w| w > options.weight_floor));
                assert!(variances[0] < 1.0 && variances[1] > 1.0);
                assert_eq!(offsets, vec![0.0, 0.0]);
            }
            SplitSuggestion::NoSplit => panic!("scale mixture must split"),
        }
    }

    #[test]
    fn test_gaussian_sample_does_not_split() {
        let client = setup();
        let dataset = gaussian_blobs(&[vec![0.0]], 1.0, 5000, 23);
        let projection = moments_of(&client, &dataset);
        assert!(projection.moments.excess_kurtosis().abs() < 0.25);
        assert_eq!(
            client.suggest_split(&projection.moments, &SplitOptions::default()),
            SplitSuggestion::NoSplit
        );
    }

    #[test]
    fn test_bimodal_sample_gets_location_split() {
        let client = setup();
        let dataset = gaussian_blobs(&[vec![-2.0], vec![2.0]], 0.5, 1000, 29);
        let projection = moments_of(&client, &dataset);
        assert!(projection.moments.alpha4 < 2.0);
        match client.suggest_split(&projection.moments, &SplitOptions::default()) {
            SplitSuggestion::Split { offsets, .. } => {
                // true offsets are ±2 / √4.25 in standardized units
                assert!((offsets[1] - 2.0 / 4.25f64.sqrt()).abs() < 0.1);
                assert!((offsets[0] + offsets[1]).abs() < 1e-12);
            }
            SplitSuggestion::NoSplit => panic!("bimodal component must split"),
        }
    }

    #[test]
    fn test_projection_follows_major_axis() {
        let client = setup();
        let dataset = gaussian_blobs(&[vec![0.0, 0.0]], 1.0, 400, 31);
        let component = Component::new(
            1.0,
            DVector::zeros(2),
            DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, 9.0]),
        );
        let r = vec![1.0; 400];
        let projection = client.split_projection(&dataset, &component, &r).unwrap();
        assert!((projection.eigenvalue - 9.0).abs() < 1e-9);
        assert!((projection.direction[1].abs() - 1.0).abs() < 1e-9);

        assert!(client.split_projection(&dataset, &component, &r[..10]).is_err());
    }
}
