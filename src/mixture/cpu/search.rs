//! Host implementation of the search controller.

use std::sync::atomic::AtomicBool;

use crate::mixture::cpu::MixtureClient;
use crate::mixture::error::MixtureResult;
use crate::mixture::impl_generic::mixture_search_impl;
use crate::mixture::traits::dataset::Dataset;
use crate::mixture::traits::search::{SearchAlgorithms, SearchOptions, SearchResult};

impl SearchAlgorithms for MixtureClient {
    fn mixture_search(&self, dataset: &Dataset, options: &SearchOptions) -> MixtureResult<SearchResult> {
        mixture_search_impl(&self.split_table, dataset, options, None)
    }

    fn mixture_search_with_cancel(
        &self,
        dataset: &Dataset,
        options: &SearchOptions,
        cancel: &AtomicBool,
    ) -> MixtureResult<SearchResult> {
        mixture_search_impl(&self.split_table, dataset, options, Some(cancel))
    }
}
