//! Dense linear algebra shared by the evaluator, fitter and heuristics.

use nalgebra::{Cholesky, DMatrix, DVector, Dyn, SymmetricEigen};

use crate::mixture::error::{MixtureError, MixtureResult};
use crate::mixture::traits::mixture::Component;

/// Cholesky factor of a covariance, or `InvalidMixture` when it is not
/// positive-definite.
pub fn covariance_cholesky(
    covariance: &DMatrix<f64>,
    context: &str,
) -> MixtureResult<Cholesky<f64, Dyn>> {
    Cholesky::new(covariance.clone()).ok_or_else(|| MixtureError::InvalidMixture {
        reason: format!("{context}: covariance is not positive-definite"),
    })
}

/// ln|C| from its Cholesky factor: 2 Σ ln L_ii.
pub fn log_det_cholesky(chol: &Cholesky<f64, Dyn>) -> f64 {
    2.0 * chol.l_dirty().diagonal().iter().map(|v| v.ln()).sum::<f64>()
}

/// Largest eigenvalue of a symmetric matrix and its unit eigenvector.
pub fn top_eigenpair(matrix: &DMatrix<f64>) -> (f64, DVector<f64>) {
    let eig = SymmetricEigen::new(matrix.clone());
    let i = eig.eigenvalues.imax();
    let vector = eig.eigenvectors.column(i).into_owned();
    (eig.eigenvalues[i], vector)
}

/// Responsibility-weighted mean; `None` when the total weight is zero.
pub fn weighted_mean(data: &DMatrix<f64>, weights: &[f64]) -> Option<DVector<f64>> {
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return None;
    }
    let w = DVector::from_column_slice(weights);
    Some(data.tr_mul(&w) / total)
}

/// Σ_n w_n (x_n - μ)(x_n - μ)ᵀ, unnormalised.
pub fn weighted_scatter(data: &DMatrix<f64>, weights: &[f64], mean: &DVector<f64>) -> DMatrix<f64> {
    let d = data.ncols();
    let mut scatter = DMatrix::<f64>::zeros(d, d);
    for (i, &w) in weights.iter().enumerate() {
        if w <= 0.0 {
            continue;
        }
        let diff = data.row(i).transpose() - mean;
        scatter += (&diff * diff.transpose()) * w;
    }
    scatter
}

/// KL(p || q) between two multivariate normals, in nats.
pub fn kl_divergence(p: &Component, q: &Component) -> MixtureResult<f64> {
    let d = p.mean.len() as f64;
    let chol_p = covariance_cholesky(&p.covariance, "kl_divergence")?;
    let chol_q = covariance_cholesky(&q.covariance, "kl_divergence")?;

    let trace = chol_q.solve(&p.covariance).trace();
    let diff = &q.mean - &p.mean;
    let mahalanobis = diff.dot(&chol_q.solve(&diff));

    Ok(0.5 * (trace + mahalanobis - d + log_det_cholesky(&chol_q) - log_det_cholesky(&chol_p)))
}

/// KL(p || q) + KL(q || p).
pub fn symmetric_kl(p: &Component, q: &Component) -> MixtureResult<f64> {
    Ok(kl_divergence(p, q)? + kl_divergence(q, p)?)
}
