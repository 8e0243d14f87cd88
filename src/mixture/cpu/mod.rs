//! Host implementation of the mixture search traits.

mod fit;
mod kmeans_pp;
mod message_length;
mod search;
mod split;

use std::sync::Arc;

use crate::mixture::impl_generic::{DEFAULT_TABLE_RESOLUTION, build_split_table_impl};
use crate::mixture::traits::split::SplitTable;

/// Entry point for scoring, fitting and searching mixtures.
///
/// Owns the split lookup table, which is built once and shared read-only;
/// clones share the same table.
#[derive(Debug, Clone)]
pub struct MixtureClient {
    split_table: Arc<SplitTable>,
}

impl MixtureClient {
    /// Build the default split table.
    pub fn new() -> Self {
        Self::with_split_table(Arc::new(build_split_table_impl(DEFAULT_TABLE_RESOLUTION)))
    }

    /// Reuse an already built table.
    pub fn with_split_table(split_table: Arc<SplitTable>) -> Self {
        Self { split_table }
    }

    /// Build a table with `resolution` grid points per axis.
    pub fn with_table_resolution(resolution: usize) -> Self {
        Self::with_split_table(Arc::new(build_split_table_impl(resolution)))
    }

    /// Handle to the shared table.
    pub fn shared_split_table(&self) -> Arc<SplitTable> {
        Arc::clone(&self.split_table)
    }
}

impl Default for MixtureClient {
    fn default() -> Self {
        Self::new()
    }
}
