//! Mixture and component records.

use nalgebra::{DMatrix, DVector};

use crate::mixture::error::{MixtureError, MixtureResult};

/// Tolerance on |Σ w - 1| accepted by [`Mixture::validate`].
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Relative tolerance on `max |C - Cᵀ|` accepted by [`Mixture::validate`].
pub const SYMMETRY_TOLERANCE: f64 = 1e-9;

/// Covariance parameterization of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CovarianceType {
    /// Full symmetric covariance [d, d].
    #[default]
    Full,
    /// Diagonal covariance; off-diagonal entries are exactly zero.
    Diagonal,
}

impl CovarianceType {
    /// Mean and covariance parameters of one component: `D(D+3)/2` or `2D`.
    pub fn parameters(self, d: usize) -> f64 {
        let d = d as f64;
        match self {
            Self::Full => 0.5 * d * (d + 3.0),
            Self::Diagonal => 2.0 * d,
        }
    }

    /// Exponent of `|C|` in the Fisher determinant: `D+2` or `3`.
    pub fn log_det_exponent(self, d: usize) -> f64 {
        match self {
            Self::Full => d as f64 + 2.0,
            Self::Diagonal => 3.0,
        }
    }

    /// Restrict a covariance to this parameterization.
    pub fn constrain(self, covariance: DMatrix<f64>) -> DMatrix<f64> {
        match self {
            Self::Full => covariance,
            Self::Diagonal => DMatrix::from_diagonal(&covariance.diagonal()),
        }
    }
}

/// Single latent factor of a component: `x_n = μ + ν_n a + σ r_n`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LatentFactor {
    /// Factor loadings `a` [d].
    pub loadings: DVector<f64>,
    /// Specific (per-dimension) variances `σ²` [d].
    pub specific_variances: DVector<f64>,
    /// Factor scores `ν_n` for every observation [n].
    pub scores: Vec<f64>,
}

impl LatentFactor {
    /// Squared norm of the loadings scaled by the specific deviations, ‖a/σ‖².
    pub fn scaled_loading_norm_sq(&self) -> f64 {
        self.loadings
            .iter()
            .zip(self.specific_variances.iter())
            .map(|(a, psi)| a * a / psi)
            .sum()
    }
}

/// One Gaussian component.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Component {
    /// Mixing weight in (0, 1).
    pub weight: f64,
    /// Mean [d].
    pub mean: DVector<f64>,
    /// Covariance [d, d], symmetric positive-definite.
    pub covariance: DMatrix<f64>,
    /// Parameterization the covariance is stated in.
    pub covariance_type: CovarianceType,
    /// Present only when latent-factor modelling kept a factor.
    pub factor: Option<LatentFactor>,
}

impl Component {
    /// Component with a full covariance.
    pub fn new(weight: f64, mean: DVector<f64>, covariance: DMatrix<f64>) -> Self {
        Self {
            weight,
            mean,
            covariance,
            covariance_type: CovarianceType::Full,
            factor: None,
        }
    }

    /// Component stated in `covariance_type`; the covariance is restricted to it.
    pub fn with_covariance_type(
        weight: f64,
        mean: DVector<f64>,
        covariance: DMatrix<f64>,
        covariance_type: CovarianceType,
    ) -> Self {
        Self {
            weight,
            mean,
            covariance: covariance_type.constrain(covariance),
            covariance_type,
            factor: None,
        }
    }
}

/// Ordered collection of K ≥ 1 components with weights summing to one.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Mixture {
    pub components: Vec<Component>,
}

impl Mixture {
    pub fn new(components: Vec<Component>) -> Self {
        Self { components }
    }

    /// Number of components K.
    pub fn n_components(&self) -> usize {
        self.components.len()
    }

    /// Dimensionality D (0 for an empty mixture).
    pub fn n_dims(&self) -> usize {
        self.components.first().map_or(0, |c| c.mean.len())
    }

    /// Mixing weights [k].
    pub fn weights(&self) -> Vec<f64> {
        self.components.iter().map(|c| c.weight).collect()
    }

    /// Number of components carrying a latent factor.
    pub fn n_factors(&self) -> usize {
        self.components.iter().filter(|c| c.factor.is_some()).count()
    }

    /// Covariance parameterization of each component [k].
    pub fn covariance_types(&self) -> Vec<CovarianceType> {
        self.components.iter().map(|c| c.covariance_type).collect()
    }

    /// Free-parameter count Q; see [`free_parameters`].
    pub fn free_parameters(&self) -> f64 {
        free_parameters(&self.covariance_types(), self.n_dims(), self.n_factors())
    }

    /// Check the structural invariants: K ≥ 1, matching dimensions, positive
    /// weights summing to one, finite parameters, symmetric covariances and
    /// zero off-diagonals for diagonal components.
    ///
    /// Positive-definiteness is checked where the covariance is factorised.
    pub fn validate(&self, n_dims: usize) -> MixtureResult<()> {
        if self.components.is_empty() {
            return Err(MixtureError::InvalidMixture {
                reason: "mixture has no components".to_string(),
            });
        }

        let mut weight_sum = 0.0;
        for (k, c) in self.components.iter().enumerate() {
            if c.weight <= 0.0 || !c.weight.is_finite() {
                return Err(MixtureError::InvalidMixture {
                    reason: format!("weight {} of component {} is not positive", c.weight, k),
                });
            }
            if c.mean.len() != n_dims || c.covariance.shape() != (n_dims, n_dims) {
                return Err(MixtureError::InvalidMixture {
                    reason: format!(
                        "component {} has mean [{}] and covariance {:?}, expected dimension {}",
                        k,
                        c.mean.len(),
                        c.covariance.shape(),
                        n_dims
                    ),
                });
            }
            if c.mean.iter().chain(c.covariance.iter()).any(|v| !v.is_finite()) {
                return Err(MixtureError::InvalidMixture {
                    reason: format!("component {} has non-finite parameters", k),
                });
            }
            let scale = c.covariance.amax();
            if (&c.covariance - c.covariance.transpose()).amax() > SYMMETRY_TOLERANCE * scale {
                return Err(MixtureError::InvalidMixture {
                    reason: format!("covariance of component {} is not symmetric", k),
                });
            }
            if c.covariance_type == CovarianceType::Diagonal
                && c.covariance != DMatrix::from_diagonal(&c.covariance.diagonal())
            {
                return Err(MixtureError::InvalidMixture {
                    reason: format!("diagonal component {} has off-diagonal covariance", k),
                });
            }
            weight_sum += c.weight;
        }

        if (weight_sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(MixtureError::InvalidMixture {
                reason: format!("weights sum to {}, expected 1", weight_sum),
            });
        }
        Ok(())
    }
}

/// `Q = Σ_k P_k + K - 1 + D·n_factors`, with `P_k = D(D+3)/2` for a full
/// covariance and `2D` for a diagonal one.
pub fn free_parameters(covariance_types: &[CovarianceType], d: usize, n_factors: usize) -> f64 {
    let k = covariance_types.len() as f64;
    let component: f64 = covariance_types.iter().map(|t| t.parameters(d)).sum();
    component + k - 1.0 + d as f64 * n_factors as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_component(weight: f64) -> Component {
        Component::new(weight, DVector::zeros(2), DMatrix::identity(2, 2))
    }

    #[test]
    fn test_free_parameters() {
        use CovarianceType::{Diagonal, Full};
        // D = 2: 5 parameters per full component, plus K - 1 weights
        assert_eq!(free_parameters(&[Full], 2, 0), 5.0);
        assert_eq!(free_parameters(&[Full; 3], 2, 0), 17.0);
        assert_eq!(free_parameters(&[Full; 3], 2, 2), 21.0);
        // 4 per diagonal component
        assert_eq!(free_parameters(&[Diagonal, Full], 2, 0), 10.0);
        // D = 1: both parameterizations coincide
        assert_eq!(Full.parameters(1), Diagonal.parameters(1));
        assert_eq!(Full.log_det_exponent(1), Diagonal.log_det_exponent(1));
    }

    #[test]
    fn test_validate_covariance_structure() {
        let mut skew = unit_component(1.0);
        skew.covariance[(0, 1)] = 50.0;
        assert!(matches!(
            Mixture::new(vec![skew]).validate(2),
            Err(MixtureError::InvalidMixture { .. })
        ));

        let mut coupled = unit_component(1.0);
        coupled.covariance_type = CovarianceType::Diagonal;
        coupled.covariance[(0, 1)] = 0.5;
        coupled.covariance[(1, 0)] = 0.5;
        assert!(Mixture::new(vec![coupled]).validate(2).is_err());

        let diagonal = Component::with_covariance_type(
            1.0,
            DVector::zeros(2),
            DMatrix::from_row_slice(2, 2, &[2.0, 0.5, 0.5, 1.0]),
            CovarianceType::Diagonal,
        );
        assert_eq!(diagonal.covariance[(0, 1)], 0.0);
        assert_eq!(diagonal.covariance[(0, 0)], 2.0);
        assert!(Mixture::new(vec![diagonal]).validate(2).is_ok());
    }

    #[test]
    fn test_validate_weights() {
        let ok = Mixture::new(vec![unit_component(0.25), unit_component(0.75)]);
        assert!(ok.validate(2).is_ok());

        let zero = Mixture::new(vec![unit_component(0.0), unit_component(1.0)]);
        assert!(matches!(
            zero.validate(2),
            Err(MixtureError::InvalidMixture { .. })
        ));

        let unnormalised = Mixture::new(vec![unit_component(0.5), unit_component(0.6)]);
        assert!(unnormalised.validate(2).is_err());

        assert!(ok.validate(3).is_err());
        assert!(Mixture::new(Vec::new()).validate(2).is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_roundtrip() {
        let mut component = unit_component(1.0);
        component.factor = Some(LatentFactor {
            loadings: DVector::from_vec(vec![0.5, -0.5]),
            specific_variances: DVector::from_vec(vec![1.0, 2.0]),
            scores: vec![0.1, -0.2, 0.3],
        });
        let mixture = Mixture::new(vec![component]);
        let json = serde_json::to_string(&mixture).unwrap();
        let back: Mixture = serde_json::from_str(&json).unwrap();
        assert_eq!(back, mixture);
    }
}
