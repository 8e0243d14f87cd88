//! K-Means++ seeding.

use nalgebra::DMatrix;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::mixture::error::MixtureResult;
use crate::mixture::traits::dataset::Dataset;
use crate::mixture::traits::kmeans_pp::{SeedOptions, Seeds};
use crate::mixture::validation::validate_n_components;

/// Seeded ChaCha generator, or one drawn from OS entropy.
pub(crate) fn seeded_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(s) => ChaCha8Rng::seed_from_u64(s),
        None => ChaCha8Rng::from_entropy(),
    }
}

/// K-Means++: first center uniform, each later one sampled with probability
/// proportional to the squared distance to its nearest chosen center.
///
/// Chosen points carry zero weight, so no observation is picked twice even
/// when the data contain duplicates.
pub fn kmeans_plusplus_impl(dataset: &Dataset, k: usize, options: &SeedOptions) -> MixtureResult<Seeds> {
    let n = dataset.n_samples();
    validate_n_components(k, n, "kmeans_plusplus")?;

    let data = dataset.data();
    let mut rng = seeded_rng(options.random_seed);

    // Distances are taken on data scaled into [-1, 1] so that squared
    // distances of finite but huge coordinates cannot overflow.
    let scale = data.amax();
    let scaled = if scale > 0.0 { data / scale } else { data.clone() };

    // Pick first center uniformly
    let first = rng.gen_range(0..n);
    let mut indices = vec![first];
    let mut chosen = vec![false; n];
    chosen[first] = true;

    let mut min_dists: Vec<f64> = (0..n)
        .map(|i| (scaled.row(i) - scaled.row(first)).norm_squared())
        .collect();

    while indices.len() < k {
        let total: f64 = (0..n).filter(|&i| !chosen[i]).map(|i| min_dists[i]).sum();

        let next = if total > 0.0 && total.is_finite() {
            let threshold = rng.gen_range(0.0..total);
            let mut cumulative = 0.0;
            let mut pick = None;
            let mut last_candidate = None;
            for i in (0..n).filter(|&i| !chosen[i]) {
                if min_dists[i] <= 0.0 {
                    continue;
                }
                cumulative += min_dists[i];
                last_candidate = Some(i);
                if cumulative > threshold {
                    pick = Some(i);
                    break;
                }
            }
            pick.or(last_candidate)
        } else {
            None
        };
        // All remaining points coincide with a center: take the first unchosen one
        let next = match next.or_else(|| (0..n).find(|&i| !chosen[i])) {
            Some(i) => i,
            None => break,
        };

        chosen[next] = true;
        indices.push(next);
        for (i, dist) in min_dists.iter_mut().enumerate() {
            let d = (scaled.row(i) - scaled.row(next)).norm_squared();
            if d < *dist {
                *dist = d;
            }
        }
    }

    let d = dataset.n_dims();
    let centers = DMatrix::from_fn(indices.len(), d, |r, c| data[(indices[r], c)]);
    Ok(Seeds { indices, centers })
}
