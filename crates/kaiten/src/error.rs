//! Error types for worker configuration, adapter calls and row outcomes.
//!
//! Errors are split by blast radius:
//!
//! * [`ConfigurationError`] aborts a call before any request is issued.
//! * [`AdapterError`] describes a single failed remote call.
//! * [`RowError`] is what a failed row carries inside a [`BatchResult`](crate::BatchResult).
//!   A row error never aborts the rest of the batch.

use std::time::Duration;
use thiserror::Error;

/// Fatal, caller-side errors raised synchronously before any row is dispatched.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("max_concurrency must be at least 1")]
    ZeroConcurrency,

    #[error("invalid endpoint {url:?}: {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("column `{column}` has {actual} rows, expected {expected}")]
    LengthMismatch {
        column: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("row at position {position} carries index {index}")]
    IndexMismatch { position: usize, index: usize },

    #[error("failed to build execution context: {0}")]
    Runtime(#[from] std::io::Error),

    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Failure of a single call through a [`CompletionAdapter`](crate::adapter::CompletionAdapter).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdapterError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("remote returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request timed out")]
    Timeout,

    #[error("malformed completion response: {0}")]
    MalformedResponse(String),

    #[error("completion carried no text content")]
    EmptyCompletion,

    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for AdapterError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AdapterError::Timeout
        } else if err.is_decode() {
            AdapterError::MalformedResponse(err.to_string())
        } else {
            AdapterError::Transport(err.to_string())
        }
    }
}

/// Reason a row did not produce an output.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RowError {
    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error("batch deadline of {0:?} elapsed before the row completed")]
    Timeout(Duration),

    #[error("row was abandoned before reporting a result")]
    Abandoned,
}
