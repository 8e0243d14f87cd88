//! mmlmix - Minimum Message Length search over Gaussian mixture models
//!
//! mmlmix decides how many Gaussian components a dataset supports by comparing
//! two-part message lengths: the cost of stating a mixture plus the cost of
//! the data given that mixture. A shorter message is a better model.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                  Search controller                        │
//! │    Probing(K) → Accepted(K) → ... → Terminated            │
//! └───────┬──────────────────┬─────────────────────┬─────────┘
//!         │ K+1              │ K-1                 │ ΔI
//! ┌───────▼────────┐ ┌───────▼────────┐  ┌─────────▼─────────┐
//! │ Split heuristic│ │ Merge / delete │  │ Message-length    │
//! │ (lookup table) │ │                │  │ evaluator         │
//! └───────┬────────┘ └───────┬────────┘  └─────────▲─────────┘
//!         └────────┬─────────┘                     │
//!          ┌───────▼────────┐   ┌──────────────┐   │
//!          │ EM fitter      ├───► k-means++    │   │
//!          │ (latent factor)│   │ seeding      │   │
//!          └───────┬────────┘   └──────────────┘   │
//!                  └───────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`mixture`] - Evaluator, seeding, fitter, split heuristic and search controller
//! - [`mixture::discrete`] - Two-part message length of a discrete source under a prefix code
//!
//! # Feature Flags
//!
//! | Feature | Description | Dependencies |
//! |---------|-------------|--------------|
//! | `serde` | Serialize mixtures and message-length records | serde, nalgebra/serde-serialize |
//!
//! # Logging
//!
//! Progress is reported through `tracing` (`info!` per accepted transition,
//! `debug!` per probe, `warn!` for skipped candidates and EM iteration caps).
//! The library never installs a subscriber.
//!
//! # Example
//!
//! ```no_run
//! use mmlmix::{Dataset, MixtureClient, ObservationError, SearchAlgorithms, SearchOptions};
//!
//! let rows: Vec<Vec<f64>> = (0..200)
//!     .map(|i| vec![if i % 2 == 0 { 0.0 } else { 10.0 } + (i as f64 * 0.37).sin()])
//!     .collect();
//! let dataset = Dataset::from_rows(&rows, ObservationError::Scalar(1e-3)).unwrap();
//!
//! let client = MixtureClient::new();
//! let options = SearchOptions {
//!     random_seed: Some(7),
//!     ..Default::default()
//! };
//! let result = client.mixture_search(&dataset, &options).unwrap();
//! println!(
//!     "K = {}, I = {:.1} bits",
//!     result.n_components(),
//!     result.fit.message_length.total()
//! );
//! ```

pub mod mixture;

// Re-export main types for convenience
pub use mixture::{
    Component, CovarianceType, Dataset, DiscreteMessageLength, FitAlgorithms, FitOptions, FitResult,
    LatentFactor, MessageLength, MessageLengthAlgorithms, MessageLengthDelta, Mixture,
    MixtureClient, MixtureError, MixtureResult, MixtureSummary, ObservationError, PrefixCode,
    ProbeKind, ProbeRecord, SearchAlgorithms, SearchOptions, SearchPhase, SearchResult,
    SearchState, SeedAlgorithms, SeedOptions, Seeds, SplitAlgorithms, SplitOptions,
    SplitSuggestion, SplitTable, StandardizedMoments, Termination, discrete_message_length,
};
