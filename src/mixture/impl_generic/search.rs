//! MML-guided search over the number of components.
//!
//! From the mixture accepted at K, candidates at K+1 (heuristic split, or a
//! k-means++ refit when no split is suggested) and K-1 (better of merge and
//! delete) are refined with EM and compared by ΔI. The best strictly negative
//! ΔI is accepted; otherwise the search has converged.

use std::sync::atomic::{AtomicBool, Ordering};

use nalgebra::DMatrix;
use tracing::{debug, info, warn};

use crate::mixture::error::{MixtureError, MixtureResult};
use crate::mixture::impl_generic::fit::{mixture_fit_impl, mixture_refine_impl};
use crate::mixture::impl_generic::kmeans_pp::kmeans_plusplus_impl;
use crate::mixture::impl_generic::message_length::message_length_delta_impl;
use crate::mixture::impl_generic::perturb::{delete_lightest, merge_closest, split_component};
use crate::mixture::impl_generic::split::{split_projection_impl, suggest_split_impl};
use crate::mixture::traits::dataset::Dataset;
use crate::mixture::traits::fit::{FitOptions, FitResult};
use crate::mixture::traits::kmeans_pp::SeedOptions;
use crate::mixture::traits::mixture::{Component, Mixture};
use crate::mixture::traits::search::{
    ProbeKind, ProbeRecord, SearchOptions, SearchPhase, SearchResult, SearchState, Termination,
};
use crate::mixture::traits::split::{Projection, SplitSuggestion, SplitTable};
use crate::mixture::validation::validate_n_components;

/// A refined neighbour of the accepted mixture.
#[derive(Debug)]
struct Candidate {
    fit: FitResult,
    kind: ProbeKind,
}

/// Run the search, checking `cancel` (when given) between K-probes.
pub fn mixture_search_impl(
    table: &SplitTable,
    dataset: &Dataset,
    options: &SearchOptions,
    cancel: Option<&AtomicBool>,
) -> MixtureResult<SearchResult> {
    options.validate()?;
    validate_n_components(options.min_k, dataset.n_samples(), "mixture_search")?;
    let max_k = options.max_k.min(dataset.n_samples());

    let mut probe = 0u64;
    let mut next_seed = || {
        probe += 1;
        options.random_seed.map(|s| s.wrapping_add(probe))
    };

    let initial = initial_fit(dataset, options, next_seed())?;
    info!(
        k = initial.n_components(),
        message_length = initial.message_length.total(),
        "accepted initial mixture"
    );
    let mut state = SearchState::new(initial);

    let termination = loop {
        if cancel.is_some_and(|c| c.load(Ordering::Relaxed)) {
            info!(k = state.current.n_components(), "search cancelled");
            break Termination::Cancelled;
        }
        if state.transitions >= options.max_search_transitions {
            break exhausted(&state, "transition cap reached");
        }

        let k = state.current.n_components();
        state.phase = SearchPhase::Probing(k);
        let up_seed = next_seed();
        let down_seed = next_seed();
        let current = &state.current;
        let up_probe = || (k < max_k).then(|| probe_up(table, dataset, current, options, up_seed));
        let down_probe =
            || (k > options.min_k.max(1)).then(|| probe_down(dataset, current, options, down_seed));

        let (up, down) = if options.parallel_probes {
            rayon::join(up_probe, down_probe)
        } else {
            (up_probe(), down_probe())
        };

        let mut best: Option<(usize, Candidate)> = None;
        for outcome in [up, down].into_iter().flatten() {
            let candidate = match outcome {
                Ok(candidate) => candidate,
                Err(err) => {
                    warn!(k, %err, "candidate fit failed, skipping");
                    continue;
                }
            };
            let delta = message_length_delta_impl(
                &state.current.summary,
                &candidate.fit.summary,
                options.asymptotic_threshold,
            );
            debug!(
                from_k = k,
                to_k = candidate.fit.n_components(),
                kind = ?candidate.kind,
                delta = delta.total(),
                "probed neighbour"
            );
            state.history.push(ProbeRecord {
                from_k: k,
                to_k: candidate.fit.n_components(),
                kind: candidate.kind,
                delta,
                message_length: candidate.fit.message_length.total(),
                accepted: false,
            });

            let index = state.history.len() - 1;
            if delta.improves()
                && best.as_ref().is_none_or(|(i, _)| delta.total() < state.history[*i].delta.total())
            {
                best = Some((index, candidate));
            }
        }

        let Some((index, candidate)) = best else {
            break Termination::Converged;
        };

        let to_k = candidate.fit.n_components();
        let total = candidate.fit.message_length.total();
        if state.revisits_without_improvement(to_k, total) {
            break exhausted(&state, &format!("K = {to_k} revisited without improvement"));
        }

        info!(
            from_k = k,
            to_k,
            kind = ?candidate.kind,
            delta = state.history[index].delta.total(),
            message_length = total,
            "accepted transition"
        );
        state.accept(index, candidate.fit);
    };

    state.phase = SearchPhase::Terminated;
    info!(
        k = state.current.n_components(),
        transitions = state.transitions,
        message_length = state.current.message_length.total(),
        "search terminated"
    );
    Ok(SearchResult {
        fit: state.current,
        history: state.history,
        transitions: state.transitions,
        termination,
    })
}

fn exhausted(state: &SearchState, reason: &str) -> Termination {
    info!(transitions = state.transitions, reason, "search exhausted");
    Termination::Exhausted(MixtureError::SearchExhausted {
        transitions: state.transitions,
        reason: reason.to_string(),
    })
}

/// Fit at `min_k`: a single component starts from the data moments, more
/// from k-means++ seeds.
fn initial_fit(dataset: &Dataset, options: &SearchOptions, seed: Option<u64>) -> MixtureResult<FitResult> {
    if options.min_k == 1 {
        let d = dataset.n_dims();
        let regularization =
            DMatrix::<f64>::identity(d, d) * options.fit.covariance_regularization;
        let start = Mixture::new(vec![Component::new(
            1.0,
            dataset.mean(),
            dataset.covariance() + regularization,
        )]);
        accept_best(mixture_refine_impl(dataset, &start, &options.fit))
    } else {
        refit(dataset, options.min_k, &options.fit, seed)
    }
}

/// Fresh k-means++ seeding followed by EM.
fn refit(dataset: &Dataset, k: usize, options: &FitOptions, seed: Option<u64>) -> MixtureResult<FitResult> {
    let seeds = kmeans_plusplus_impl(dataset, k, &SeedOptions { random_seed: seed })?;
    accept_best(mixture_fit_impl(dataset, &seeds.centers, options))
}

/// Take the best-so-far fit when EM hits its iteration cap.
fn accept_best(result: MixtureResult<FitResult>) -> MixtureResult<FitResult> {
    match result {
        Err(MixtureError::NonConvergence { best, iterations, .. }) => {
            warn!(
                k = best.n_components(),
                iterations, "accepting best-so-far fit after non-convergence"
            );
            Ok(*best)
        }
        other => other,
    }
}

/// K+1: split the component whose projection is furthest from Gaussian,
/// weighted by its mass. Without a usable split, refit from k-means++.
fn probe_up(
    table: &SplitTable,
    dataset: &Dataset,
    current: &FitResult,
    options: &SearchOptions,
    seed: Option<u64>,
) -> MixtureResult<Candidate> {
    let mut best: Option<(f64, usize, Projection, SplitSuggestion)> = None;
    for (j, component) in current.mixture.components.iter().enumerate() {
        let r: Vec<f64> = current.responsibilities.column(j).iter().copied().collect();
        let projection = match split_projection_impl(dataset, component, &r) {
            Ok(projection) => projection,
            Err(err) => {
                debug!(component = j, %err, "no projection for split");
                continue;
            }
        };
        let suggestion = suggest_split_impl(table, &projection.moments, &options.split);
        if !suggestion.is_split() {
            continue;
        }
        let score = projection.moments.excess_kurtosis().abs() * component.weight;
        if best.as_ref().is_none_or(|(s, ..)| score > *s) {
            best = Some((score, j, projection, suggestion));
        }
    }

    if let Some((_, j, projection, suggestion)) = best {
        let split = split_component(&current.mixture, j, &projection, &suggestion)?;
        let fit = accept_best(mixture_refine_impl(dataset, &split, &options.fit))?;
        return Ok(Candidate {
            fit,
            kind: ProbeKind::Split,
        });
    }

    let k = current.n_components() + 1;
    let err = MixtureError::DegenerateSplit {
        weights: current.mixture.weights(),
        context: format!("no component of K = {} admits a split", k - 1),
    };
    debug!(%err, "falling back to k-means++ refit");
    Ok(Candidate {
        fit: refit(dataset, k, &options.fit, seed)?,
        kind: ProbeKind::Refit,
    })
}

/// K-1: the better of merging the closest pair and deleting the lightest
/// component, each refined with EM.
fn probe_down(
    dataset: &Dataset,
    current: &FitResult,
    options: &SearchOptions,
    seed: Option<u64>,
) -> MixtureResult<Candidate> {
    let merged = merge_closest(&current.mixture)
        .and_then(|m| accept_best(mixture_refine_impl(dataset, &m, &options.fit)))
        .map(|fit| Candidate {
            fit,
            kind: ProbeKind::Merge,
        });
    let deleted = delete_lightest(&current.mixture)
        .and_then(|m| accept_best(mixture_refine_impl(dataset, &m, &options.fit)))
        .map(|fit| Candidate {
            fit,
            kind: ProbeKind::Delete,
        });

    match (merged, deleted) {
        (Ok(m), Ok(d)) => {
            if d.fit.message_length.total() < m.fit.message_length.total() {
                Ok(d)
            } else {
                Ok(m)
            }
        }
        (Ok(c), Err(err)) | (Err(err), Ok(c)) => {
            warn!(%err, "one K-1 move failed");
            Ok(c)
        }
        (Err(err), Err(_)) => {
            debug!(%err, "both K-1 moves failed, refitting");
            Ok(Candidate {
                fit: refit(dataset, current.n_components() - 1, &options.fit, seed)?,
                kind: ProbeKind::Refit,
            })
        }
    }
}
