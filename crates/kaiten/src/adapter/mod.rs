//! # Completion Adapters
//!
//! The seam between the dispatcher and a remote inference service.
//!
//! The dispatcher treats an adapter as an opaque, possibly slow, possibly failing
//! function from a [`CompletionRequest`] to a single text completion. It never retries;
//! retry or backoff policy belongs inside an adapter implementation.
//!
//! * [`CompletionAdapter`] - the trait every backend implements
//! * [`OpenAiAdapter`] - an HTTP implementation for OpenAI-compatible chat completion APIs

mod core_trait;
mod openai;

pub use core_trait::*;
pub use openai::OpenAiAdapter;

#[cfg(test)]
/// Scriptable in-process adapter.
///
/// Concatenates model, text and image url, with optional latency and failures.
pub(crate) mod mock;
