//! Two-part message length of a discrete source under a fixed prefix code.
//!
//! The codebook is charged one bit per code-length bit, the data the sum of
//! the code lengths of every observed symbol.

use crate::mixture::error::{MixtureError, MixtureResult};

/// Integer code length, in bits, for each symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PrefixCode {
    pub lengths: Vec<u32>,
}

impl PrefixCode {
    /// Fixed-length code for `n_symbols` symbols: `⌈log2 n⌉` bits each.
    pub fn uniform(n_symbols: usize) -> MixtureResult<Self> {
        if n_symbols == 0 {
            return Err(MixtureError::InvalidParameter {
                parameter: "n_symbols".to_string(),
                message: "a code needs at least one symbol".to_string(),
            });
        }
        let bits = n_symbols.next_power_of_two().trailing_zeros();
        Ok(Self {
            lengths: vec![bits; n_symbols],
        })
    }

    /// Shannon code: `⌈-log2 p⌉` bits per symbol.
    pub fn from_probabilities(probabilities: &[f64]) -> MixtureResult<Self> {
        let total: f64 = probabilities.iter().sum();
        if probabilities.is_empty()
            || probabilities.iter().any(|&p| p <= 0.0 || !p.is_finite())
            || (total - 1.0).abs() > 1e-9
        {
            return Err(MixtureError::InvalidParameter {
                parameter: "probabilities".to_string(),
                message: format!("expected positive probabilities summing to 1, got {probabilities:?}"),
            });
        }
        let lengths = probabilities
            .iter()
            .map(|p| (-p.log2() - 1e-12).ceil().max(0.0) as u32)
            .collect();
        Ok(Self { lengths })
    }

    pub fn n_symbols(&self) -> usize {
        self.lengths.len()
    }

    /// Whether the lengths satisfy Kraft's inequality `Σ 2^-l ≤ 1`.
    pub fn satisfies_kraft(&self) -> bool {
        self.lengths.iter().map(|&l| 0.5f64.powi(l as i32)).sum::<f64>() <= 1.0 + 1e-12
    }
}

/// Codebook and data parts of a discrete message, in bits.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DiscreteMessageLength {
    pub codebook: f64,
    pub data: f64,
}

impl DiscreteMessageLength {
    pub fn total(&self) -> f64 {
        self.codebook + self.data
    }
}

/// Encode symbol counts with `code`.
pub fn discrete_message_length(counts: &[u64], code: &PrefixCode) -> MixtureResult<DiscreteMessageLength> {
    if counts.len() != code.n_symbols() {
        return Err(MixtureError::InvalidInput {
            context: format!(
                "discrete_message_length: {} counts for a {}-symbol code",
                counts.len(),
                code.n_symbols()
            ),
        });
    }
    let codebook = code.lengths.iter().map(|&l| f64::from(l)).sum();
    let data = counts
        .iter()
        .zip(&code.lengths)
        .map(|(&c, &l)| c as f64 * f64::from(l))
        .sum();
    Ok(DiscreteMessageLength { codebook, data })
}
