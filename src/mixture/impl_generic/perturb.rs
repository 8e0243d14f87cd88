//! Structural moves between neighbouring K: split, merge, delete.

use nalgebra::{DMatrix, DVector};

use crate::mixture::error::{MixtureError, MixtureResult};
use crate::mixture::impl_generic::linalg::symmetric_kl;
use crate::mixture::traits::mixture::{Component, CovarianceType, Mixture};
use crate::mixture::traits::split::{Projection, SplitSuggestion};

/// Replace component `index` by the sub-components of `suggestion`, placed
/// along the projection direction.
///
/// Sub-component `i` gets weight `w·w_i`, mean `μ + o_i √λ v` and covariance
/// `C + (v_i - 1) λ v vᵀ`, so its variance along `v` is `v_i λ` and is
/// unchanged in every orthogonal direction. Children of a diagonal component
/// keep only the diagonal of that covariance.
pub fn split_component(
    mixture: &Mixture,
    index: usize,
    projection: &Projection,
    suggestion: &SplitSuggestion,
) -> MixtureResult<Mixture> {
    let parent = component_at(mixture, index, "split_component")?;
    let SplitSuggestion::Split {
        weights,
        variances,
        offsets,
    } = suggestion
    else {
        return Err(MixtureError::InvalidInput {
            context: "split_component: suggestion is NoSplit".to_string(),
        });
    };

    let v = &projection.direction;
    let lambda = projection.eigenvalue;
    let scale = lambda.max(0.0).sqrt();
    let outer = v * v.transpose();

    let mut components = Vec::with_capacity(mixture.n_components() + weights.len() - 1);
    for (k, component) in mixture.components.iter().enumerate() {
        if k != index {
            components.push(component.clone());
            continue;
        }
        for ((w, var), offset) in weights.iter().zip(variances).zip(offsets) {
            components.push(Component::with_covariance_type(
                parent.weight * w,
                &parent.mean + v * (offset * scale),
                &parent.covariance + &outer * ((var - 1.0) * lambda),
                parent.covariance_type,
            ));
        }
    }
    Ok(Mixture::new(components))
}

/// Merge the pair of components with the smallest symmetrised KL distance
/// into one moment-matched component.
pub fn merge_closest(mixture: &Mixture) -> MixtureResult<Mixture> {
    let k = mixture.n_components();
    if k < 2 {
        return Err(MixtureError::InvalidInput {
            context: "merge_closest: requires at least 2 components".to_string(),
        });
    }

    let mut closest: Option<(f64, usize, usize)> = None;
    for a in 0..k {
        for b in (a + 1)..k {
            let dist = symmetric_kl(&mixture.components[a], &mixture.components[b])?;
            if closest.is_none_or(|(best, _, _)| dist < best) {
                closest = Some((dist, a, b));
            }
        }
    }
    let (_, a, b) = closest.ok_or_else(|| MixtureError::InvalidInput {
        context: "merge_closest: no pair to merge".to_string(),
    })?;
    merge_pair(mixture, a, b)
}

/// Moment-matched merge of components `a` and `b`.
pub fn merge_pair(mixture: &Mixture, a: usize, b: usize) -> MixtureResult<Mixture> {
    let ca = component_at(mixture, a, "merge_pair")?;
    let cb = component_at(mixture, b, "merge_pair")?;
    if a == b {
        return Err(MixtureError::InvalidInput {
            context: format!("merge_pair: cannot merge component {a} with itself"),
        });
    }

    let weight = ca.weight + cb.weight;
    let mean: DVector<f64> = (&ca.mean * ca.weight + &cb.mean * cb.weight) / weight;
    let spread = |c: &Component| -> DMatrix<f64> {
        let diff = &c.mean - &mean;
        (&c.covariance + &diff * diff.transpose()) * c.weight
    };
    let covariance = (spread(ca) + spread(cb)) / weight;

    let mut components: Vec<Component> = mixture
        .components
        .iter()
        .enumerate()
        .filter(|(k, _)| *k != a && *k != b)
        .map(|(_, c)| c.clone())
        .collect();
    let covariance_type = if ca.covariance_type == cb.covariance_type {
        ca.covariance_type
    } else {
        CovarianceType::Full
    };
    components.insert(
        a.min(b),
        Component::with_covariance_type(weight, mean, covariance, covariance_type),
    );
    Ok(Mixture::new(components))
}

/// Remove the lightest component and renormalise the remaining weights.
pub fn delete_lightest(mixture: &Mixture) -> MixtureResult<Mixture> {
    let lightest = mixture
        .components
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.weight.total_cmp(&b.1.weight))
        .map(|(k, _)| k)
        .ok_or_else(|| MixtureError::InvalidInput {
            context: "delete_lightest: mixture is empty".to_string(),
        })?;
    delete_component(mixture, lightest)
}

/// Remove component `index` and renormalise the remaining weights.
pub fn delete_component(mixture: &Mixture, index: usize) -> MixtureResult<Mixture> {
    component_at(mixture, index, "delete_component")?;
    if mixture.n_components() < 2 {
        return Err(MixtureError::InvalidInput {
            context: "delete_component: requires at least 2 components".to_string(),
        });
    }

    let remaining: f64 = mixture
        .components
        .iter()
        .enumerate()
        .filter(|(k, _)| *k != index)
        .map(|(_, c)| c.weight)
        .sum();
    let components = mixture
        .components
        .iter()
        .enumerate()
        .filter(|(k, _)| *k != index)
        .map(|(_, c)| Component {
            weight: c.weight / remaining,
            ..c.clone()
        })
        .collect();
    Ok(Mixture::new(components))
}

fn component_at<'a>(mixture: &'a Mixture, index: usize, op: &str) -> MixtureResult<&'a Component> {
    mixture
        .components
        .get(index)
        .ok_or_else(|| MixtureError::InvalidInput {
            context: format!(
                "{op}: component {index} out of range for K = {}",
                mixture.n_components()
            ),
        })
}
