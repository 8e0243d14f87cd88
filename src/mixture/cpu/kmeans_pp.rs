//! Host implementation of k-means++ seeding.

use crate::mixture::cpu::MixtureClient;
use crate::mixture::error::MixtureResult;
use crate::mixture::impl_generic::kmeans_plusplus_impl;
use crate::mixture::traits::dataset::Dataset;
use crate::mixture::traits::kmeans_pp::{SeedAlgorithms, SeedOptions, Seeds};

impl SeedAlgorithms for MixtureClient {
    fn kmeans_plusplus(&self, dataset: &Dataset, k: usize, options: &SeedOptions) -> MixtureResult<Seeds> {
        kmeans_plusplus_impl(dataset, k, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mixture::cpu::testing::gaussian_blobs;
    use crate::mixture::traits::dataset::ObservationError;
    use std::collections::HashSet;

    fn setup() -> MixtureClient {
        MixtureClient::with_table_resolution(20)
    }

    #[test]
    fn test_deterministic_with_seed() {
        let client = setup();
        let dataset = gaussian_blobs(&[vec![0.0, 0.0], vec![5.0, 5.0], vec![-5.0, 5.0]], 0.5, 30, 1);
        let options = SeedOptions::with_seed(42);
        let a = client.kmeans_plusplus(&dataset, 3, &options).unwrap();
        let b = client.kmeans_plusplus(&dataset, 3, &options).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.centers.shape(), (3, 2));
    }

    #[test]
    fn test_never_repeats_a_point() {
        let client = setup();
        // Heavy duplication: only three distinct locations
        let rows: Vec<Vec<f64>> = (0..30).map(|i| vec![(i % 3) as f64]).collect();
        let dataset = Dataset::from_rows(&rows, ObservationError::default()).unwrap();

        for seed in 0..20 {
            let seeds = client
                .kmeans_plusplus(&dataset, 10, &SeedOptions::with_seed(seed))
                .unwrap();
            let unique: HashSet<usize> = seeds.indices.iter().copied().collect();
            assert_eq!(unique.len(), 10);
        }
    }

    #[test]
    fn test_spreads_over_separated_clusters() {
        let client = setup();
        let dataset = gaussian_blobs(&[vec![0.0], vec![100.0]], 0.1, 50, 3);
        let seeds = client
            .kmeans_plusplus(&dataset, 2, &SeedOptions::with_seed(9))
            .unwrap();
        let gap = (seeds.centers[(0, 0)] - seeds.centers[(1, 0)]).abs();
        assert!(gap > 50.0);
    }

    #[test]
    fn test_rejects_too_many_centers() {
        let client = setup();
        let dataset = gaussian_blobs(&[vec![0.0]], 1.0, 5, 3);
        assert!(client.kmeans_plusplus(&dataset, 6, &SeedOptions::default()).is_err());
        assert!(client.kmeans_plusplus(&dataset, 0, &SeedOptions::default()).is_err());
    }

    #[test]
    fn test_huge_finite_coordinates() {
        let client = setup();
        // squared distances between these rows overflow f64
        let rows = vec![vec![0.0], vec![1e200], vec![2e200]];
        let dataset = Dataset::from_rows(&rows, ObservationError::default()).unwrap();

        for seed in 0..10 {
            let seeds = client
                .kmeans_plusplus(&dataset, 2, &SeedOptions::with_seed(seed))
                .unwrap();
            assert_ne!(seeds.indices[0], seeds.indices[1]);
            for (r, &i) in seeds.indices.iter().enumerate() {
                assert_eq!(seeds.centers[(r, 0)], rows[i][0]);
            }
        }

        let all = client
            .kmeans_plusplus(&dataset, 3, &SeedOptions::with_seed(1))
            .unwrap();
        let unique: HashSet<usize> = all.indices.iter().copied().collect();
        assert_eq!(unique.len(), 3);
    }
}
