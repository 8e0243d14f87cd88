//! Moment-matching split heuristic.
//!
//! A two-component, zero-mean scale mixture `w1 N(0, v1) + w2 N(0, v2)` with
//! unit variance has standardized moments
//! `α4 = 3 Σ w v²`, `α6 = 15 Σ w v³`, `α8 = 105 Σ w v⁴`.
//! The table samples `(w1, v1)` densely and inverts that map by nearest
//! neighbour in log-moment space.

use std::collections::HashMap;

use tracing::debug;

use crate::mixture::error::{MixtureError, MixtureResult};
use crate::mixture::impl_generic::linalg::top_eigenpair;
use crate::mixture::traits::dataset::Dataset;
use crate::mixture::traits::mixture::Component;
use crate::mixture::traits::split::{
    Projection, SplitEntry, SplitOptions, SplitSuggestion, SplitTable, StandardizedMoments,
};

/// Grid points per axis of the default table.
pub const DEFAULT_TABLE_RESOLUTION: usize = 120;

/// Bucket width in log-moment space.
const BUCKET_WIDTH: f64 = 0.05;

/// Smallest sub-component variance a location split may suggest.
const MIN_SPLIT_VARIANCE: f64 = 1e-3;

/// Sample `resolution²` scale mixtures and index them by quantized
/// log-moments.
pub fn build_split_table_impl(resolution: usize) -> SplitTable {
    let resolution = resolution.max(2);
    let mut entries = Vec::with_capacity(resolution * resolution);

    for i in 0..resolution {
        let w1 = (i as f64 + 0.5) / resolution as f64;
        let w2 = 1.0 - w1;
        for j in 0..resolution {
            // v1 < 1 < v2 keeps each pair unique up to relabelling
            let v1 = (j as f64 + 0.5) / resolution as f64;
            let v2 = (1.0 - w1 * v1) / w2;
            let weights = [w1, w2];
            let variances = [v1, v2];
            entries.push(SplitEntry {
                weights,
                variances,
                coordinates: log_moments(&scale_mixture_moments(&weights, &variances)),
            });
        }
    }

    let mut buckets: HashMap<[i64; 3], Vec<usize>> = HashMap::new();
    for (idx, entry) in entries.iter().enumerate() {
        buckets
            .entry(bucket_key(&entry.coordinates, BUCKET_WIDTH))
            .or_default()
            .push(idx);
    }

    debug!(
        entries = entries.len(),
        buckets = buckets.len(),
        "built split lookup table"
    );
    SplitTable {
        entries,
        buckets,
        bucket_width: BUCKET_WIDTH,
    }
}

/// Moments of a unit-variance zero-mean scale mixture.
pub fn scale_mixture_moments(weights: &[f64], variances: &[f64]) -> StandardizedMoments {
    let moment = |p: i32| -> f64 { weights.iter().zip(variances).map(|(w, v)| w * v.powi(p)).sum() };
    StandardizedMoments {
        alpha4: 3.0 * moment(2),
        alpha6: 15.0 * moment(3),
        alpha8: 105.0 * moment(4),
    }
}

fn log_moments(m: &StandardizedMoments) -> [f64; 3] {
    [
        (m.alpha4 / 3.0).max(f64::MIN_POSITIVE).ln(),
        (m.alpha6 / 15.0).max(f64::MIN_POSITIVE).ln(),
        (m.alpha8 / 105.0).max(f64::MIN_POSITIVE).ln(),
    ]
}

fn bucket_key(coordinates: &[f64; 3], width: f64) -> [i64; 3] {
    coordinates.map(|c| (c / width).floor() as i64)
}

fn distance_sq(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Nearest entry: the query bucket and its 26 neighbours first, then a
/// linear scan when they are all empty.
fn nearest_entry<'a>(table: &'a SplitTable, coordinates: &[f64; 3]) -> Option<&'a SplitEntry> {
    let key = bucket_key(coordinates, table.bucket_width);
    let mut best: Option<(f64, usize)> = None;

    for dx in -1..=1 {
        for dy in -1..=1 {
            for dz in -1..=1 {
                let neighbour = [key[0] + dx, key[1] + dy, key[2] + dz];
                let Some(bucket) = table.buckets.get(&neighbour) else {
                    continue;
                };
                for &idx in bucket {
                    let dist = distance_sq(&table.entries[idx].coordinates, coordinates);
                    if best.is_none_or(|(b, _)| dist < b) {
                        best = Some((dist, idx));
                    }
                }
            }
        }
    }

    if best.is_none() {
        best = table
            .entries
            .iter()
            .enumerate()
            .map(|(idx, e)| (distance_sq(&e.coordinates, coordinates), idx))
            .min_by(|a, b| a.0.total_cmp(&b.0));
    }
    best.map(|(_, idx)| &table.entries[idx])
}

/// Table lookup for a scale split; `DegenerateSplit` when the smaller weight
/// is at or below the floor.
pub fn split_lookup_impl(
    table: &SplitTable,
    moments: &StandardizedMoments,
    options: &SplitOptions,
) -> MixtureResult<SplitSuggestion> {
    let coordinates = log_moments(moments);
    let entry = nearest_entry(table, &coordinates).ok_or_else(|| MixtureError::DegenerateSplit {
        weights: Vec::new(),
        context: "split table is empty".to_string(),
    })?;

    if entry.weights.iter().any(|&w| w <= options.weight_floor) {
        return Err(MixtureError::DegenerateSplit {
            weights: entry.weights.to_vec(),
            context: format!("nearest entry to α4 = {:.3}", moments.alpha4),
        });
    }

    Ok(SplitSuggestion::Split {
        weights: entry.weights.to_vec(),
        variances: entry.variances.to_vec(),
        offsets: vec![0.0, 0.0],
    })
}

/// Decide whether a standardized 1-D component should be split.
///
/// Near-Gaussian kurtosis gives `NoSplit`. Platykurtic shapes (`α4 < 3`) get a
/// symmetric location split `±δ` with `δ⁴ = (3 - α4) / 2`, which reproduces
/// α4 exactly. Leptokurtic shapes go to the scale-mixture table.
pub fn suggest_split_impl(
    table: &SplitTable,
    moments: &StandardizedMoments,
    options: &SplitOptions,
) -> SplitSuggestion {
    let excess = moments.excess_kurtosis();
    if !excess.is_finite() || excess.abs() <= options.kurtosis_threshold {
        return SplitSuggestion::NoSplit;
    }

    if excess < 0.0 {
        let delta_sq = (-0.5 * excess).sqrt().min(1.0 - MIN_SPLIT_VARIANCE);
        let delta = delta_sq.sqrt();
        let variance = 1.0 - delta_sq;
        return SplitSuggestion::Split {
            weights: vec![0.5, 0.5],
            variances: vec![variance, variance],
            offsets: vec![-delta, delta],
        };
    }

    match split_lookup_impl(table, moments, options) {
        Ok(suggestion) => suggestion,
        Err(err) => {
            debug!(%err, "split lookup rejected");
            SplitSuggestion::NoSplit
        }
    }
}

/// Weighted standardized moments of a sample.
pub fn standardized_moments(values: &[f64], weights: &[f64]) -> Option<StandardizedMoments> {
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return None;
    }
    let mean = values.iter().zip(weights).map(|(x, w)| w * x).sum::<f64>() / total;
    let central = |p: i32| -> f64 {
        values
            .iter()
            .zip(weights)
            .map(|(x, w)| w * (x - mean).powi(p))
            .sum::<f64>()
            / total
    };
    let variance = central(2);
    if variance <= 0.0 || !variance.is_finite() {
        return None;
    }
    Some(StandardizedMoments {
        alpha4: central(4) / variance.powi(2),
        alpha6: central(6) / variance.powi(3),
        alpha8: central(8) / variance.powi(4),
    })
}

/// Project one component's observations onto the top eigenvector of its
/// covariance and measure their standardized moments.
pub fn split_projection_impl(
    dataset: &Dataset,
    component: &Component,
    responsibilities: &[f64],
) -> MixtureResult<Projection> {
    if responsibilities.len() != dataset.n_samples() {
        return Err(MixtureError::InvalidInput {
            context: format!(
                "split_projection: {} responsibilities for {} observations",
                responsibilities.len(),
                dataset.n_samples()
            ),
        });
    }

    let (eigenvalue, direction) = top_eigenpair(&component.covariance);
    let projected: Vec<f64> = (dataset.data() * &direction).iter().copied().collect();
    let moments = standardized_moments(&projected, responsibilities).ok_or_else(|| {
        MixtureError::DegenerateSplit {
            weights: vec![component.weight],
            context: "component has no spread along its top eigenvector".to_string(),
        }
    })?;

    Ok(Projection {
        direction,
        eigenvalue,
        moments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gaussian_moments_do_not_split() {
        let table = build_split_table_impl(40);
        let suggestion =
            suggest_split_impl(&table, &StandardizedMoments::GAUSSIAN, &SplitOptions::default());
        assert_eq!(suggestion, SplitSuggestion::NoSplit);
    }

    #[test]
    fn test_lookup_recovers_scale_mixture() {
        let table = build_split_table_impl(DEFAULT_TABLE_RESOLUTION);
        let moments = scale_mixture_moments(&[0.5, 0.5], &[0.5, 1.5]);
        match split_lookup_impl(&table, &moments, &SplitOptions::default()).unwrap() {
            SplitSuggestion::Split {
                weights, variances, ..
            } => {
                assert!((weights[0] - 0.5).abs() < 0.05);
                assert!((variances[0] - 0.5).abs() < 0.05);
                assert!((variances[1] - 1.5).abs() < 0.1);
            }
            SplitSuggestion::NoSplit => panic!("expected a split"),
        }
    }

    #[test]
    fn test_degenerate_lookup() {
        let table = build_split_table_impl(DEFAULT_TABLE_RESOLUTION);
        // Tiny heavy-tailed outlier component
        let moments = scale_mixture_moments(&[0.995, 0.005], &[0.5, 100.5]);
        let options = SplitOptions::default();
        assert!(matches!(
            split_lookup_impl(&table, &moments, &options),
            Err(MixtureError::DegenerateSplit { .. })
        ));
        assert_eq!(suggest_split_impl(&table, &moments, &options), SplitSuggestion::NoSplit);
    }

    #[test]
    fn test_platykurtic_location_split() {
        let table = build_split_table_impl(40);
        let moments = StandardizedMoments {
            alpha4: 1.5,
            alpha6: 0.0,
            alpha8: 0.0,
        };
        match suggest_split_impl(&table, &moments, &SplitOptions::default()) {
            SplitSuggestion::Split {
                weights,
                variances,
                offsets,
            } => {
                assert_eq!(weights, vec![0.5, 0.5]);
                let delta = offsets[1];
                assert!((offsets[0] + delta).abs() < 1e-12);
                // 3 - 2δ⁴ reproduces α4
                assert!((3.0 - 2.0 * delta.powi(4) - 1.5).abs() < 1e-12);
                assert!((variances[0] + delta * delta - 1.0).abs() < 1e-12);
            }
            SplitSuggestion::NoSplit => panic!("expected a location split"),
        }
    }

    #[test]
    fn test_standardized_moments_two_point() {
        // ±1 with equal weight: every even moment is 1
        let m = standardized_moments(&[-1.0, 1.0], &[1.0, 1.0]).unwrap();
        assert!((m.alpha4 - 1.0).abs() < 1e-12);
        assert!((m.alpha8 - 1.0).abs() < 1e-12);
        assert!(standardized_moments(&[2.0, 2.0], &[1.0, 1.0]).is_none());
    }
}
