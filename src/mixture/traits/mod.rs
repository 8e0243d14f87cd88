//! Mixture search algorithm traits.

pub mod dataset;
pub mod fit;
pub mod kmeans_pp;
pub mod message_length;
pub mod mixture;
pub mod search;
pub mod split;

pub use dataset::{Dataset, ObservationError};
pub use fit::{FitAlgorithms, FitOptions, FitResult};
pub use kmeans_pp::{SeedAlgorithms, SeedOptions, Seeds};
pub use message_length::{MessageLength, MessageLengthAlgorithms, MessageLengthDelta, MixtureSummary};
pub use mixture::{Component, LatentFactor, Mixture};
pub use search::{
    ProbeKind, ProbeRecord, SearchAlgorithms, SearchOptions, SearchPhase, SearchResult,
    SearchState, Termination,
};
pub use split::{
    Projection, SplitAlgorithms, SplitEntry, SplitOptions, SplitSuggestion, SplitTable,
    StandardizedMoments,
};
