//! K-Means++ seeding trait.

use nalgebra::DMatrix;

use crate::mixture::error::MixtureResult;
use crate::mixture::traits::dataset::Dataset;

/// Options for k-means++ seeding.
#[derive(Debug, Clone, Default)]
pub struct SeedOptions {
    /// Fixed seed for reproducible draws; `None` draws from OS entropy.
    pub random_seed: Option<u64>,
}

impl SeedOptions {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            random_seed: Some(seed),
        }
    }
}

/// Chosen centers in selection order.
#[derive(Debug, Clone, PartialEq)]
pub struct Seeds {
    /// Row index of each chosen observation [k], all distinct.
    pub indices: Vec<usize>,
    /// Center coordinates [k, d].
    pub centers: DMatrix<f64>,
}

/// K-Means++ seeding.
pub trait SeedAlgorithms {
    /// Choose `k` distinct observations as initial centers, each new one drawn
    /// with probability proportional to its squared distance to the nearest
    /// center chosen so far.
    fn kmeans_plusplus(&self, dataset: &Dataset, k: usize, options: &SeedOptions) -> MixtureResult<Seeds>;
}
