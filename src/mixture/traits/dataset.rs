//! Observations handed to the search.

use nalgebra::{DMatrix, DVector};

use crate::mixture::error::{MixtureError, MixtureResult};
use crate::mixture::validation::{validate_data, validate_positive};

/// Observational error attached to every measurement.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ObservationError {
    /// One error shared by all dimensions.
    Scalar(f64),
    /// One error per dimension [d].
    PerDimension(Vec<f64>),
}

impl Default for ObservationError {
    fn default() -> Self {
        Self::Scalar(1e-3)
    }
}

/// Immutable [n, d] observations plus their measurement error.
#[derive(Debug, Clone)]
pub struct Dataset {
    data: DMatrix<f64>,
    y_err: ObservationError,
    log_error_sum: f64,
}

impl Dataset {
    /// Wrap an [n, d] matrix (one observation per row).
    ///
    /// # Errors
    ///
    /// `InvalidInput` for empty or non-finite data, `InvalidParameter` for a
    /// non-positive error or a per-dimension error of the wrong length.
    pub fn new(data: DMatrix<f64>, y_err: ObservationError) -> MixtureResult<Self> {
        validate_data(&data, "dataset")?;
        let d = data.ncols();

        let log_error_sum = match &y_err {
            ObservationError::Scalar(err) => {
                validate_positive(*err, "y_err", "dataset")?;
                d as f64 * err.ln()
            }
            ObservationError::PerDimension(errs) => {
                if errs.len() != d {
                    return Err(MixtureError::InvalidParameter {
                        parameter: "y_err".to_string(),
                        message: format!("expected {} per-dimension errors, got {}", d, errs.len()),
                    });
                }
                for &err in errs {
                    validate_positive(err, "y_err", "dataset")?;
                }
                errs.iter().map(|e| e.ln()).sum()
            }
        };

        Ok(Self {
            data,
            y_err,
            log_error_sum,
        })
    }

    /// Build a dataset from row vectors of equal length.
    pub fn from_rows(rows: &[Vec<f64>], y_err: ObservationError) -> MixtureResult<Self> {
        let n = rows.len();
        let d = rows.first().map_or(0, Vec::len);
        if let Some(bad) = rows.iter().position(|r| r.len() != d) {
            return Err(MixtureError::InvalidInput {
                context: format!("dataset: row {bad} has {} values, expected {d}", rows[bad].len()),
            });
        }
        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        Self::new(DMatrix::from_row_slice(n, d, &flat), y_err)
    }

    /// Observations [n, d].
    pub fn data(&self) -> &DMatrix<f64> {
        &self.data
    }

    pub fn y_err(&self) -> &ObservationError {
        &self.y_err
    }

    /// Number of observations N.
    pub fn n_samples(&self) -> usize {
        self.data.nrows()
    }

    /// Dimensionality D.
    pub fn n_dims(&self) -> usize {
        self.data.ncols()
    }

    /// Σ_d ln(y_err_d); equals D ln(y_err) for a scalar error.
    pub fn log_error_sum(&self) -> f64 {
        self.log_error_sum
    }

    /// Observation `i` as a column vector [d].
    pub fn observation(&self, i: usize) -> DVector<f64> {
        self.data.row(i).transpose()
    }

    /// Sample mean [d].
    pub fn mean(&self) -> DVector<f64> {
        let n = self.n_samples() as f64;
        DVector::from_fn(self.n_dims(), |j, _| self.data.column(j).sum() / n)
    }

    /// Unbiased sample covariance [d, d] (denominator N - 1 when N > 1).
    pub fn covariance(&self) -> DMatrix<f64> {
        let n = self.n_samples();
        let d = self.n_dims();
        let mean = self.mean();
        let mut cov = DMatrix::<f64>::zeros(d, d);
        for i in 0..n {
            let diff = self.observation(i) - &mean;
            cov += &diff * diff.transpose();
        }
        let denominator = if n > 1 { (n - 1) as f64 } else { 1.0 };
        cov / denominator
    }
}
