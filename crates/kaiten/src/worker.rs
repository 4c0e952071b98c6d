//! The user-facing batch inference worker.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::info;

use crate::adapter::{CompletionAdapter, OpenAiAdapter};
use crate::columns::BatchColumns;
use crate::config::WorkerConfig;
use crate::core::dispatch::{check_indices, dispatch};
use crate::core::worker::WorkerRuntime;
use crate::error::ConfigurationError;
use crate::request::RowRequest;
use crate::result::BatchResult;

/// A reusable batch inference worker.
///
/// Built once per logical UDF instance and called once per batch. The worker
/// owns the adapter (and through it, the HTTP connection pool), a dedicated
/// runtime, and the semaphore that bounds in-flight calls.
///
/// The bound is per worker, not per batch: batches submitted concurrently
/// through the same worker share its `max_concurrency` slots.
///
/// # Example
///
/// ```no_run
/// use kaiten::{BatchColumns, BatchInferenceWorker, ExtraBody, WorkerConfig};
///
/// let worker = BatchInferenceWorker::new(WorkerConfig::from_env().with_max_concurrency(32))?;
///
/// let columns = BatchColumns::new(
///     "google/gemma-3n-e4b-it",
///     vec![Some("Classify this sentiment: Daft is fast!".to_string())],
/// )
/// .with_extra_body(ExtraBody::new().guided_choice(["positive", "negative"]));
///
/// let column = worker.run_columns(columns)?.into_column();
/// println!("{:?}", column);
/// # Ok::<(), kaiten::ConfigurationError>(())
/// ```
pub struct BatchInferenceWorker<A = OpenAiAdapter> {
    config: WorkerConfig,
    adapter: Arc<A>,
    slots: Arc<Semaphore>,
    runtime: WorkerRuntime,
}

impl BatchInferenceWorker<OpenAiAdapter> {
    /// Builds a worker talking to the OpenAI-compatible endpoint in `config`.
    ///
    /// No network call is made here.
    pub fn new(config: WorkerConfig) -> Result<Self, ConfigurationError> {
        let adapter = OpenAiAdapter::new(&config)?;
        Self::with_adapter(config, adapter)
    }
}

impl<A> BatchInferenceWorker<A>
where
    A: CompletionAdapter + 'static,
{
    /// Builds a worker around any adapter.
    pub fn with_adapter(config: WorkerConfig, adapter: A) -> Result<Self, ConfigurationError> {
        config.validate()?;

        let threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .min(config.max_concurrency);
        let runtime = WorkerRuntime::new(threads)?;

        info!(
            base_url = %config.base_url,
            max_concurrency = config.max_concurrency,
            runtime_threads = threads,
            "batch inference worker ready"
        );

        Ok(Self {
            slots: Arc::new(Semaphore::new(config.max_concurrency)),
            adapter: Arc::new(adapter),
            runtime,
            config,
        })
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn max_concurrency(&self) -> usize {
        self.config.max_concurrency
    }

    /// Slots not currently held by an in-flight call.
    pub fn available_slots(&self) -> usize {
        self.slots.available_permits()
    }

    /// Runs a batch to completion, blocking the calling thread.
    ///
    /// Uses the configured `batch_timeout`. Row failures are reported inside the
    /// result; only configuration errors are returned as `Err`.
    pub fn run_batch(
        &self,
        rows: impl IntoIterator<Item = RowRequest>,
    ) -> Result<BatchResult, ConfigurationError> {
        self.run_batch_within(rows, self.config.batch_timeout)
    }

    /// Like [`run_batch`](Self::run_batch) with an explicit deadline for this call.
    pub fn run_batch_within(
        &self,
        rows: impl IntoIterator<Item = RowRequest>,
        timeout: Option<Duration>,
    ) -> Result<BatchResult, ConfigurationError> {
        let rows: Vec<RowRequest> = rows.into_iter().collect();
        check_indices(&rows)?;
        Ok(self.block_on(self.submit(rows, timeout)))
    }

    /// Validates column lengths, then runs the batch like [`run_batch`](Self::run_batch).
    pub fn run_columns(&self, columns: BatchColumns) -> Result<BatchResult, ConfigurationError> {
        self.run_batch(columns.into_requests()?)
    }

    /// Async entry point for callers already running inside a tokio runtime.
    ///
    /// Rows still run on the worker's own runtime. Dropping the returned future
    /// aborts every row of the batch that has not finished.
    pub async fn run_batch_async(
        &self,
        rows: impl IntoIterator<Item = RowRequest>,
    ) -> Result<BatchResult, ConfigurationError> {
        self.run_batch_async_within(rows, self.config.batch_timeout).await
    }

    pub async fn run_batch_async_within(
        &self,
        rows: impl IntoIterator<Item = RowRequest>,
        timeout: Option<Duration>,
    ) -> Result<BatchResult, ConfigurationError> {
        let rows: Vec<RowRequest> = rows.into_iter().collect();
        check_indices(&rows)?;
        Ok(self.submit(rows, timeout).await)
    }

    /// Drives `future` to completion from a blocking caller, with the worker's
    /// runtime providing timers and sockets.
    ///
    /// Works from any thread. Calling it from an async task blocks that task's
    /// thread until the future completes; async callers should prefer
    /// [`run_batch_async`](Self::run_batch_async).
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// Releases the runtime and the adapter's connection pool.
    ///
    /// Dropping the worker has the same effect.
    pub fn close(mut self) {
        self.slots.close();
        self.runtime.shutdown();
        info!(base_url = %self.config.base_url, "batch inference worker closed");
    }

    async fn submit(&self, rows: Vec<RowRequest>, timeout: Option<Duration>) -> BatchResult {
        dispatch(
            self.runtime.handle(),
            self.adapter.clone(),
            self.slots.clone(),
            rows,
            self.config.content_order,
            timeout,
        )
        .await
    }
}
