//! MML search over Gaussian mixture models.
//!
//! Scores mixtures by their two-part message length, fits a fixed number of
//! components with MML-weighted EM (optionally with one latent factor per
//! component), and searches over K by accepting neighbouring mixtures that
//! shorten the message.

mod cpu;
pub mod discrete;
pub mod error;
pub mod impl_generic;
pub mod traits;
mod validation;

pub use cpu::MixtureClient;
pub use discrete::{DiscreteMessageLength, PrefixCode, discrete_message_length};
pub use error::{MixtureError, MixtureResult};
pub use traits::dataset::{Dataset, ObservationError};
pub use traits::fit::{FitAlgorithms, FitOptions, FitResult};
pub use traits::kmeans_pp::{SeedAlgorithms, SeedOptions, Seeds};
pub use traits::message_length::{
    MessageLength, MessageLengthAlgorithms, MessageLengthDelta, MixtureSummary,
};
pub use traits::mixture::{Component, CovarianceType, LatentFactor, Mixture, free_parameters};
pub use traits::search::{
    ProbeKind, ProbeRecord, SearchAlgorithms, SearchOptions, SearchPhase, SearchResult,
    SearchState, Termination,
};
pub use traits::split::{
    Projection, SplitAlgorithms, SplitEntry, SplitOptions, SplitSuggestion, SplitTable,
    StandardizedMoments,
};
pub use validation::*;

/// Special functions used by the message-length terms.
pub(crate) mod special {
    use statrs::function::gamma;

    /// ln Γ(x); exactly zero at x = 1 and x = 2.
    pub fn ln_gamma(x: f64) -> f64 {
        if x == 1.0 || x == 2.0 {
            return 0.0;
        }
        gamma::ln_gamma(x)
    }
}
