//! Host implementation of message-length evaluation.

use crate::mixture::cpu::MixtureClient;
use crate::mixture::error::MixtureResult;
use crate::mixture::impl_generic::{
    message_length_delta_impl, message_length_impl, mixture_summary_impl,
};
use crate::mixture::traits::dataset::Dataset;
use crate::mixture::traits::message_length::{
    MessageLength, MessageLengthAlgorithms, MessageLengthDelta, MixtureSummary,
};
use crate::mixture::traits::mixture::Mixture;

impl MessageLengthAlgorithms for MixtureClient {
    fn message_length(&self, mixture: &Mixture, dataset: &Dataset) -> MixtureResult<MessageLength> {
        message_length_impl(mixture, dataset)
    }

    fn mixture_summary(&self, mixture: &Mixture, dataset: &Dataset) -> MixtureResult<MixtureSummary> {
        mixture_summary_impl(mixture, dataset)
    }

    fn message_length_delta(
        &self,
        current: &MixtureSummary,
        candidate: &MixtureSummary,
        asymptotic_threshold: Option<usize>,
    ) -> MessageLengthDelta {
        message_length_delta_impl(current, candidate, asymptotic_threshold)
    }
}
