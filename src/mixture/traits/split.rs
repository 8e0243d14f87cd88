//! Moment-matching split heuristic trait.

use std::collections::HashMap;

use nalgebra::DVector;

use crate::mixture::error::{MixtureError, MixtureResult};
use crate::mixture::traits::dataset::Dataset;
use crate::mixture::traits::mixture::Component;
use crate::mixture::validation::validate_non_negative;

/// Options for the split heuristic.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SplitOptions {
    /// Minimum |α4 - 3| before a split is suggested at all.
    pub kurtosis_threshold: f64,
    /// Sub-component weights at or below this are degenerate.
    pub weight_floor: f64,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            kurtosis_threshold: 0.25,
            weight_floor: 0.02,
        }
    }
}

impl SplitOptions {
    pub fn validate(&self) -> MixtureResult<()> {
        validate_non_negative(self.kurtosis_threshold, "kurtosis_threshold", "split")?;
        if !(self.weight_floor > 0.0 && self.weight_floor < 0.5) {
            return Err(MixtureError::InvalidParameter {
                parameter: "weight_floor".to_string(),
                message: format!("must lie in (0, 0.5), got {}", self.weight_floor),
            });
        }
        Ok(())
    }
}

/// Standardized even moments of a zero-mean, unit-variance 1-D sample.
///
/// A Gaussian has α4 = 3, α6 = 15, α8 = 105.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StandardizedMoments {
    pub alpha4: f64,
    pub alpha6: f64,
    pub alpha8: f64,
}

impl StandardizedMoments {
    /// Moments of a standard normal.
    pub const GAUSSIAN: Self = Self {
        alpha4: 3.0,
        alpha6: 15.0,
        alpha8: 105.0,
    };

    /// Excess kurtosis α4 - 3.
    pub fn excess_kurtosis(&self) -> f64 {
        self.alpha4 - 3.0
    }
}

/// A component projected onto its dominant covariance direction.
#[derive(Debug, Clone)]
pub struct Projection {
    /// Unit top eigenvector of the component covariance [d].
    pub direction: DVector<f64>,
    /// Top eigenvalue (variance along `direction`).
    pub eigenvalue: f64,
    /// Moments of the standardized projections.
    pub moments: StandardizedMoments,
}

/// Outcome of the split heuristic, in standardized units.
#[derive(Debug, Clone, PartialEq)]
pub enum SplitSuggestion {
    NoSplit,
    /// Replace the component by `weights.len()` sub-components with the given
    /// relative weights, variances and mean offsets along the projection.
    Split {
        weights: Vec<f64>,
        variances: Vec<f64>,
        offsets: Vec<f64>,
    },
}

impl SplitSuggestion {
    pub fn is_split(&self) -> bool {
        matches!(self, Self::Split { .. })
    }

    /// Number of sub-components (1 for `NoSplit`).
    pub fn n_sub(&self) -> usize {
        match self {
            Self::NoSplit => 1,
            Self::Split { weights, .. } => weights.len(),
        }
    }
}

/// One sampled two-component scale mixture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitEntry {
    pub weights: [f64; 2],
    pub variances: [f64; 2],
    /// `(ln α4/3, ln α6/15, ln α8/105)`.
    pub coordinates: [f64; 3],
}

/// Read-only inverse map from standardized moments to two-component splits.
///
/// Built once, then shared across threads behind an `Arc`.
#[derive(Debug, Clone)]
pub struct SplitTable {
    pub(crate) entries: Vec<SplitEntry>,
    pub(crate) buckets: HashMap<[i64; 3], Vec<usize>>,
    pub(crate) bucket_width: f64,
}

impl SplitTable {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[SplitEntry] {
        &self.entries
    }
}

/// Split heuristic consulted before a full K+1 refit.
pub trait SplitAlgorithms {
    /// The shared lookup table.
    fn split_table(&self) -> &SplitTable;

    /// Project the observations of one component onto its top eigenvector
    /// and measure the standardized moments, weighting each observation by
    /// its responsibility [n].
    fn split_projection(
        &self,
        dataset: &Dataset,
        component: &Component,
        responsibilities: &[f64],
    ) -> MixtureResult<Projection>;

    /// Nearest table entry for the given moments.
    ///
    /// # Errors
    ///
    /// `DegenerateSplit` when the nearest entry's smaller weight is at or
    /// below `weight_floor`.
    fn split_lookup(
        &self,
        moments: &StandardizedMoments,
        options: &SplitOptions,
    ) -> MixtureResult<SplitSuggestion>;

    /// Decide whether a standardized component should be split in two.
    fn suggest_split(&self, moments: &StandardizedMoments, options: &SplitOptions) -> SplitSuggestion;
}
