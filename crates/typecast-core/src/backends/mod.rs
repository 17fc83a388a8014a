//! Language-model backends
//!
//! The translator depends only on the [`LanguageModel`] capability; concrete
//! adapters live here. Transport concerns (HTTP, auth, retry/backoff for
//! transient failures) belong entirely to the adapters. The translator's
//! repair loop is a semantic retry and never compensates for transport
//! failures.

pub mod ollama;
pub mod openai;
pub mod retry;

pub use ollama::{OllamaConfig, OllamaModel};
pub use openai::{OpenAiConfig, OpenAiModel};
pub use retry::RetryPolicy;

use std::future::Future;

use crate::cancel::CancelToken;
use crate::error::Result;
use crate::types::SamplingParams;

/// Capability interface for a text-generation backend
///
/// `generate` returns the raw completion text for one prompt. A returned
/// error is propagated verbatim by the translator and never retried there;
/// adapters observe the cancellation token so a signal aborts an in-flight
/// call.
pub trait LanguageModel: Send + Sync {
    fn generate(
        &self,
        prompt: &str,
        sampling: &SamplingParams,
        cancel: &CancelToken,
    ) -> impl Future<Output = Result<String>> + Send;
}
