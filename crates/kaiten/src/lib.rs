//! # Kaiten
//!
//! Bounded-concurrency batch inference against OpenAI-compatible chat completion
//! APIs, shaped for dataframe UDFs: hand a worker a batch of rows, get back one
//! result per row, in row order, without running an event loop yourself.
//!
//! ## Overview
//!
//! A dataframe engine calls a UDF once per partition with column-oriented inputs
//! (model id, prompt text, optional image). Each row needs its own remote call,
//! the calls should overlap, but an unbounded fan-out overwhelms the server.
//! Kaiten provides the piece in between:
//!
//! - A reusable [`BatchInferenceWorker`], built once and called many times
//! - A hard ceiling on in-flight calls per worker (`max_concurrency`)
//! - Results returned by position, whatever order the calls finish in
//! - Row-level failure isolation: one failed call never fails the batch
//! - An optional per-batch deadline so a hung call cannot hold a partition forever
//!
//! ## Architecture
//!
//! ### Worker
//!
//! [`BatchInferenceWorker`] owns the adapter, a semaphore with `max_concurrency`
//! permits, and a dedicated tokio runtime. [`BatchInferenceWorker::run_batch`]
//! blocks the calling thread while the batch runs on that runtime.
//! [`BatchInferenceWorker::run_batch_async`] serves callers already inside
//! tokio; it needs the caller's runtime to have its time driver enabled.
//!
//! ### Adapters
//!
//! The [`CompletionAdapter`](adapter::CompletionAdapter) trait is the seam to the
//! remote service: one request in, one completion out. [`OpenAiAdapter`](adapter::OpenAiAdapter)
//! implements it over HTTP with a pooled `reqwest` client.
//!
//! ### Rows
//!
//! A [`RowRequest`] carries its `index`, which must equal its position in the batch.
//! [`BatchColumns`] converts parallel columns into rows and rejects mismatched lengths.
//!
//! ## Errors
//!
//! - [`ConfigurationError`] - returned before any call is made
//! - [`RowError`] - stored per row in the [`BatchResult`]
//!
//! ## Example
//!
//! ```no_run
//! use kaiten::{BatchInferenceWorker, ExtraBody, ImageSource, RowRequest, SamplingParams, WorkerConfig};
//!
//! let worker = BatchInferenceWorker::new(
//!     WorkerConfig::new("http://0.0.0.0:8000/v1", "none").with_max_concurrency(32),
//! )?;
//!
//! let rows = vec![
//!     RowRequest::new(0, "google/gemma-3n-e4b-it")
//!         .with_text("What is in this image?")
//!         .with_image(ImageSource::url("https://example.com/boardwalk.jpg")),
//!     RowRequest::new(1, "google/gemma-3n-e4b-it")
//!         .with_text("Classify this sentiment: Daft is fast!")
//!         .with_sampling_params(SamplingParams::new().temperature(0.0))
//!         .with_extra_body(ExtraBody::new().guided_choice(["positive", "negative"])),
//! ];
//!
//! for row in worker.run_batch(rows)? {
//!     match row.outcome {
//!         Ok(text) => println!("{}: {}", row.index, text),
//!         Err(error) => eprintln!("{}: failed: {}", row.index, error),
//!     }
//! }
//! # Ok::<(), kaiten::ConfigurationError>(())
//! ```

mod columns;
mod config;
mod core;
mod error;
mod request;
mod result;
mod worker;

pub mod adapter;

pub use columns::{BatchColumns, Column};
pub use config::{DEFAULT_API_KEY, DEFAULT_BASE_URL, DEFAULT_MAX_CONCURRENCY, WorkerConfig};
pub use error::{AdapterError, ConfigurationError, RowError};
pub use request::{
    ContentOrder, ContentPart, ExtraBody, ImageSource, ImageUrl, RowRequest, SamplingParams,
    assemble_content,
};
pub use result::{BatchResult, RowResult};
pub use worker::BatchInferenceWorker;
