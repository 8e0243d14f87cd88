//! Validation helpers for mixture algorithms.

use nalgebra::DMatrix;

use crate::mixture::error::{MixtureError, MixtureResult};

/// Validate that data is a non-empty, finite [n, d] matrix.
pub fn validate_data(data: &DMatrix<f64>, op: &'static str) -> MixtureResult<()> {
    if data.nrows() == 0 {
        return Err(MixtureError::InvalidInput {
            context: format!("{op}: requires at least 1 data point"),
        });
    }
    if data.ncols() == 0 {
        return Err(MixtureError::InvalidInput {
            context: format!("{op}: requires at least 1 dimension"),
        });
    }
    if data.iter().any(|v| !v.is_finite()) {
        return Err(MixtureError::InvalidInput {
            context: format!("{op}: data contains non-finite values"),
        });
    }
    Ok(())
}

/// Validate the number of components against the number of points.
pub fn validate_n_components(
    n_components: usize,
    n_points: usize,
    op: &'static str,
) -> MixtureResult<()> {
    if n_components == 0 {
        return Err(MixtureError::InvalidParameter {
            parameter: "n_components".to_string(),
            message: format!("{op} requires n_components > 0"),
        });
    }
    if n_components > n_points {
        return Err(MixtureError::InvalidParameter {
            parameter: "n_components".to_string(),
            message: format!(
                "{op}: n_components={n_components} exceeds number of points {n_points}"
            ),
        });
    }
    Ok(())
}

/// Validate that a value is finite and strictly positive.
pub fn validate_positive(value: f64, parameter: &'static str, op: &'static str) -> MixtureResult<()> {
    if value <= 0.0 || !value.is_finite() {
        return Err(MixtureError::InvalidParameter {
            parameter: parameter.to_string(),
            message: format!("{op} requires finite {parameter} > 0, got {value}"),
        });
    }
    Ok(())
}

/// Validate that a value is finite and non-negative.
pub fn validate_non_negative(
    value: f64,
    parameter: &'static str,
    op: &'static str,
) -> MixtureResult<()> {
    if value < 0.0 || !value.is_finite() {
        return Err(MixtureError::InvalidParameter {
            parameter: parameter.to_string(),
            message: format!("{op} requires finite {parameter} >= 0, got {value}"),
        });
    }
    Ok(())
}

/// Validate an iteration cap.
pub fn validate_iterations(
    iterations: usize,
    parameter: &'static str,
    op: &'static str,
) -> MixtureResult<()> {
    if iterations == 0 {
        return Err(MixtureError::InvalidParameter {
            parameter: parameter.to_string(),
            message: format!("{op} requires {parameter} >= 1"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_data() {
        let ok = DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 2.0, 3.0]);
        assert!(validate_data(&ok, "test").is_ok());

        let empty = DMatrix::<f64>::zeros(0, 3);
        assert!(validate_data(&empty, "test").is_err());

        let nan = DMatrix::from_row_slice(1, 2, &[0.0, f64::NAN]);
        assert!(validate_data(&nan, "test").is_err());
    }

    #[test]
    fn test_validate_n_components() {
        assert!(validate_n_components(3, 100, "test").is_ok());
        assert!(validate_n_components(0, 100, "test").is_err());
        assert!(validate_n_components(101, 100, "test").is_err());
    }

    #[test]
    fn test_validate_positive() {
        assert!(validate_positive(0.5, "tol", "test").is_ok());
        assert!(validate_positive(0.0, "tol", "test").is_err());
        assert!(validate_positive(-1.0, "tol", "test").is_err());
        assert!(validate_positive(f64::INFINITY, "tol", "test").is_err());
        assert!(validate_non_negative(0.0, "reg", "test").is_ok());
        assert!(validate_non_negative(-1e-9, "reg", "test").is_err());
    }

    #[test]
    fn test_validate_iterations() {
        assert!(validate_iterations(1, "max_em_iterations", "test").is_ok());
        assert!(validate_iterations(0, "max_em_iterations", "test").is_err());
    }
}
