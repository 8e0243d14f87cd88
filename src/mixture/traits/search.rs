//! Model search controller trait.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::AtomicBool;

use crate::mixture::error::{MixtureError, MixtureResult};
use crate::mixture::traits::dataset::Dataset;
use crate::mixture::traits::fit::{FitOptions, FitResult};
use crate::mixture::traits::message_length::MessageLengthDelta;
use crate::mixture::traits::split::SplitOptions;

/// Options for the search over K.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SearchOptions {
    /// Smallest K probed; also the starting K.
    pub min_k: usize,
    /// Largest K probed.
    pub max_k: usize,
    /// Maximum number of accepted K transitions.
    pub max_search_transitions: usize,
    /// Use the asymptotic `log Q` form of ΔI only when both K and D exceed
    /// this value. `None` always computes the exact form.
    pub asymptotic_threshold: Option<usize>,
    /// Seed for every k-means++ draw of the run; `None` uses OS entropy.
    pub random_seed: Option<u64>,
    /// Fit the K-1 and K+1 candidates concurrently.
    pub parallel_probes: bool,
    /// Options for every EM fit.
    pub fit: FitOptions,
    /// Options for the split heuristic.
    pub split: SplitOptions,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            min_k: 1,
            max_k: 32,
            max_search_transitions: 64,
            asymptotic_threshold: None,
            random_seed: None,
            parallel_probes: false,
            fit: FitOptions::default(),
            split: SplitOptions::default(),
        }
    }
}

impl SearchOptions {
    pub fn validate(&self) -> MixtureResult<()> {
        if self.min_k == 0 {
            return Err(MixtureError::InvalidParameter {
                parameter: "min_k".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.max_k < self.min_k {
            return Err(MixtureError::InvalidParameter {
                parameter: "max_k".to_string(),
                message: format!("max_k={} is below min_k={}", self.max_k, self.min_k),
            });
        }
        self.fit.validate()?;
        self.split.validate()?;
        Ok(())
    }
}

/// Controller state over K.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    /// Fitting the neighbours of the mixture accepted at this K.
    Probing(usize),
    /// A mixture at this K is the current best; neighbours are probed next.
    Accepted(usize),
    Terminated,
}

impl fmt::Display for SearchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Probing(k) => write!(f, "Probing({})", k),
            Self::Accepted(k) => write!(f, "Accepted({})", k),
            Self::Terminated => write!(f, "Terminated"),
        }
    }
}

/// How a candidate mixture was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ProbeKind {
    /// K+1 from a heuristic-guided split of one component.
    Split,
    /// K+1 from fresh k-means++ seeds after a degenerate split.
    Refit,
    /// K-1 from merging the closest pair of components.
    Merge,
    /// K-1 from deleting the lightest component.
    Delete,
}

/// One evaluated neighbour.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProbeRecord {
    pub from_k: usize,
    pub to_k: usize,
    pub kind: ProbeKind,
    /// ΔI of the candidate against the mixture accepted at `from_k`.
    pub delta: MessageLengthDelta,
    /// Total message length of the candidate in bits.
    pub message_length: f64,
    pub accepted: bool,
}

/// Bookkeeping carried between probes.
#[derive(Debug, Clone)]
pub struct SearchState {
    pub phase: SearchPhase,
    /// Fit accepted at the current K.
    pub current: FitResult,
    /// Best total message length accepted at each visited K.
    pub visited: BTreeMap<usize, f64>,
    /// ΔI of every candidate tried so far.
    pub history: Vec<ProbeRecord>,
    /// Accepted transitions so far.
    pub transitions: usize,
}

impl SearchState {
    /// State after accepting the initial fit.
    pub fn new(initial: FitResult) -> Self {
        let k = initial.n_components();
        let mut visited = BTreeMap::new();
        visited.insert(k, initial.message_length.total());
        Self {
            phase: SearchPhase::Accepted(k),
            current: initial,
            visited,
            history: Vec::new(),
            transitions: 0,
        }
    }

    /// Whether accepting a mixture at `k` with message length `total` would
    /// return to a visited K without beating what was accepted there.
    ///
    /// With the exact ΔI every accepted total is strictly below the previous
    /// one, so this only fires when the asymptotic ΔI misjudges a candidate.
    pub fn revisits_without_improvement(&self, k: usize, total: f64) -> bool {
        self.visited.get(&k).is_some_and(|&seen| total >= seen)
    }

    /// Move to `fit`, marking history entry `index` as the accepted probe.
    pub fn accept(&mut self, index: usize, fit: FitResult) {
        let k = fit.n_components();
        self.visited.insert(k, fit.message_length.total());
        if let Some(record) = self.history.get_mut(index) {
            record.accepted = true;
        }
        self.transitions += 1;
        self.phase = SearchPhase::Accepted(k);
        self.current = fit;
    }
}

/// Why the search stopped.
#[derive(Debug, Clone)]
pub enum Termination {
    /// No neighbour shortens the message.
    Converged,
    /// The cancel flag was raised between probes.
    Cancelled,
    /// Transition cap or a revisited K; carries `SearchExhausted`.
    Exhausted(MixtureError),
}

/// Final answer of a search, always carrying the best mixture found.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub fit: FitResult,
    pub history: Vec<ProbeRecord>,
    pub transitions: usize,
    pub termination: Termination,
}

impl SearchResult {
    pub fn n_components(&self) -> usize {
        self.fit.n_components()
    }
}

/// MML-guided search over the number of components.
pub trait SearchAlgorithms {
    /// Run the search to termination.
    fn mixture_search(&self, dataset: &Dataset, options: &SearchOptions) -> MixtureResult<SearchResult>;

    /// Run the search, checking `cancel` between K-probes.
    fn mixture_search_with_cancel(
        &self,
        dataset: &Dataset,
        options: &SearchOptions,
        cancel: &AtomicBool,
    ) -> MixtureResult<SearchResult>;
}
