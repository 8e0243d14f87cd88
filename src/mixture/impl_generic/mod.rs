//! Generic mixture search implementations.

pub mod em;
pub mod factor;
pub mod fit;
pub mod kmeans_pp;
pub mod linalg;
pub mod message_length;
pub mod perturb;
pub mod search;
pub mod split;

pub use factor::factor_cost;
pub use fit::{mixture_fit_impl, mixture_refine_impl};
pub use kmeans_pp::kmeans_plusplus_impl;
pub use linalg::{kl_divergence, symmetric_kl};
pub use message_length::{
    message_length_delta_impl, message_length_from_summary, message_length_impl,
    mixture_summary_impl,
};
pub use perturb::{delete_component, delete_lightest, merge_closest, merge_pair, split_component};
pub use search::mixture_search_impl;
pub use split::{
    DEFAULT_TABLE_RESOLUTION, build_split_table_impl, scale_mixture_moments, split_lookup_impl,
    split_projection_impl, standardized_moments, suggest_split_impl,
};
