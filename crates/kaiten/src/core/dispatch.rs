use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use super::unit::{PendingRow, QueuedRow};
use crate::adapter::CompletionAdapter;
use crate::error::{ConfigurationError, RowError};
use crate::request::{ContentOrder, RowRequest};
use crate::result::{BatchResult, RowResult};

/// Aborts every row task still running when the batch is finished or dropped.
struct RowTasks(Vec<AbortHandle>);

impl Drop for RowTasks {
    fn drop(&mut self) {
        // Queued rows first: a freed permit must not reach a row about to be aborted
        for task in self.0.iter().rev() {
            task.abort();
        }
    }
}

/// Checks that every row's index equals its position in the batch.
pub(crate) fn check_indices(rows: &[RowRequest]) -> Result<(), ConfigurationError> {
    match rows.iter().enumerate().find(|(position, row)| row.index != *position) {
        Some((position, row)) => Err(ConfigurationError::IndexMismatch {
            position,
            index: row.index,
        }),
        None => Ok(()),
    }
}

/// Fans a batch out over `slots` and gathers the results back in index order.
///
/// Each row runs as its own task on `runtime` and makes exactly one adapter call
/// while holding one permit of `slots`, so the number of concurrent calls never
/// exceeds the permits the semaphore was created with. The semaphore is fair,
/// so rows are admitted in the order they queued.
///
/// With a `timeout`, rows that have not reported by the deadline fail with
/// [`RowError::Timeout`] and their tasks are aborted, releasing their permits.
///
/// Rows must already satisfy [`check_indices`].
pub(crate) async fn dispatch<A>(
    runtime: &Handle,
    adapter: Arc<A>,
    slots: Arc<Semaphore>,
    rows: Vec<RowRequest>,
    order: ContentOrder,
    timeout: Option<Duration>,
) -> BatchResult
where
    A: CompletionAdapter + 'static,
{
    if rows.is_empty() {
        return BatchResult::default();
    }

    let batch_id = Uuid::new_v4();
    let started = Instant::now();
    let deadline = timeout.map(|t| (started + t, t));
    debug!(%batch_id, rows = rows.len(), available = slots.available_permits(), "dispatching batch");

    let mut tasks = RowTasks(Vec::with_capacity(rows.len()));
    let mut pending = Vec::with_capacity(rows.len());
    for row in rows {
        let index = row.index;
        let (queued, receiver) = QueuedRow::channel(index, row.into_completion_request(order));
        let task = runtime.spawn(run_row(adapter.clone(), slots.clone(), queued));
        tasks.0.push(task.abort_handle());
        pending.push(receiver);
    }

    let results = join_all(
        pending
            .into_iter()
            .map(|receiver| await_row(receiver, deadline)),
    )
    .await;
    drop(tasks);

    for row in &results {
        if let Some(error) = row.error() {
            warn!(%batch_id, index = row.index, %error, "row failed");
        }
    }
    let batch = BatchResult::from_rows(results);
    debug!(
        %batch_id,
        succeeded = batch.succeeded(),
        failed = batch.failed(),
        elapsed = ?started.elapsed(),
        "batch complete"
    );
    batch
}

async fn run_row<A>(adapter: Arc<A>, slots: Arc<Semaphore>, row: QueuedRow)
where
    A: CompletionAdapter,
{
    let permit = match slots.acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => {
            row.complete(Err(RowError::Abandoned));
            return;
        }
    };
    trace!(index = row.index(), "row admitted");
    let outcome = adapter.call(row.request()).await.map_err(RowError::from);
    drop(permit);
    row.complete(outcome);
}

async fn await_row(row: PendingRow, deadline: Option<(Instant, Duration)>) -> RowResult {
    match deadline {
        Some((deadline, budget)) => {
            let index = row.index();
            tokio::time::timeout_at(deadline, row)
                .await
                .unwrap_or_else(|_| RowResult::failed(index, RowError::Timeout(budget)))
        }
        None => row.await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::mock::MockAdapter;
    use crate::error::AdapterError;

    fn rows(texts: &[&str]) -> Vec<RowRequest> {
        texts
            .iter()
            .enumerate()
            .map(|(index, text)| RowRequest::new(index, "m").with_text(*text))
            .collect()
    }

    async fn run(adapter: &Arc<MockAdapter>, slots: usize, texts: &[&str]) -> BatchResult {
        dispatch(
            &Handle::current(),
            adapter.clone(),
            Arc::new(Semaphore::new(slots)),
            rows(texts),
            ContentOrder::TextFirst,
            None,
        )
        .await
    }

    #[tokio::test]
    async fn test_two_row_example() {
        let adapter = Arc::new(
            MockAdapter::new().with_latency("a", Duration::from_millis(30)),
        );
        let batch = run(&adapter, 2, &["a", "b"]).await;

        assert_eq!(
            batch.into_rows(),
            vec![RowResult::succeeded(0, "ma"), RowResult::succeeded(1, "mb")]
        );
    }

    #[tokio::test]
    async fn test_order_independent_of_latency() {
        let texts: Vec<String> = (0..20).map(|i| format!("row{}", i)).collect();
        let text_refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let mut adapter = MockAdapter::new();
        for (i, text) in texts.iter().enumerate() {
            // Later rows finish first
            adapter = adapter.with_latency(text, Duration::from_millis(5 * (20 - i as u64)));
        }
        let adapter = Arc::new(adapter);

        let batch = run(&adapter, 8, &text_refs).await;

        assert_eq!(batch.len(), 20);
        for (pos, row) in batch.iter().enumerate() {
            assert_eq!(row.index, pos);
            assert_eq!(row.output(), Some(format!("mrow{}", pos).as_str()));
        }
    }

    #[tokio::test]
    async fn test_concurrency_never_exceeds_slots() {
        let texts: Vec<String> = (0..40).map(|i| format!("t{}", i)).collect();
        let text_refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let mut adapter = MockAdapter::new();
        for text in &texts {
            adapter = adapter.with_latency(text, Duration::from_millis(10));
        }
        let adapter = Arc::new(adapter);

        let batch = run(&adapter, 3, &text_refs).await;

        assert_eq!(batch.succeeded(), 40);
        assert_eq!(adapter.calls(), 40);
        assert!(adapter.peak() <= 3, "peak was {}", adapter.peak());
    }

    #[tokio::test]
    async fn test_empty_batch_makes_no_calls() {
        let adapter = Arc::new(MockAdapter::new());
        let batch = run(&adapter, 4, &[]).await;

        assert!(batch.is_empty());
        assert_eq!(adapter.calls(), 0);
    }

    #[tokio::test]
    async fn test_failing_row_is_isolated() {
        let adapter = Arc::new(MockAdapter::new().failing_on("b"));
        let batch = run(&adapter, 2, &["a", "b", "c"]).await;

        assert_eq!(batch.outputs(), vec![Some("ma"), None, Some("mc")]);
        assert!(matches!(
            batch[1].error(),
            Some(RowError::Adapter(AdapterError::Status { status: 500, .. }))
        ));
        assert_eq!(adapter.calls(), 3);
    }

    #[tokio::test]
    async fn test_single_slot_is_sequential() {
        let mut adapter = MockAdapter::new();
        for text in ["a", "b", "c", "d"] {
            adapter = adapter.with_latency(text, Duration::from_millis(10));
        }
        let adapter = Arc::new(adapter);

        run(&adapter, 1, &["a", "b", "c", "d"]).await;

        assert_eq!(adapter.peak(), 1);
        let spans = adapter.spans();
        assert_eq!(spans.len(), 4);
        for pair in spans.windows(2) {
            assert!(pair[1].0 >= pair[0].1, "calls overlapped");
        }
    }

    #[tokio::test]
    async fn test_deadline_fails_unfinished_rows() {
        let adapter = Arc::new(
            MockAdapter::new()
                .with_latency("fast", Duration::from_millis(5))
                .with_latency("hung", Duration::from_secs(30)),
        );
        let slots = Arc::new(Semaphore::new(2));
        let timeout = Duration::from_millis(200);

        let batch = dispatch(
            &Handle::current(),
            adapter.clone(),
            slots.clone(),
            rows(&["fast", "hung"]),
            ContentOrder::TextFirst,
            Some(timeout),
        )
        .await;

        assert_eq!(batch[0].output(), Some("mfast"));
        assert_eq!(batch[1].error(), Some(&RowError::Timeout(timeout)));

        // The hung row's task was aborted and gave its permit back
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(slots.available_permits(), 2);
    }

    #[tokio::test]
    async fn test_deadline_fails_rows_still_queued() {
        let mut adapter = MockAdapter::new();
        for text in ["a", "b", "c"] {
            adapter = adapter.with_latency(text, Duration::from_secs(30));
        }
        let adapter = Arc::new(adapter);
        let slots = Arc::new(Semaphore::new(1));
        let timeout = Duration::from_millis(100);

        let batch = dispatch(
            &Handle::current(),
            adapter.clone(),
            slots.clone(),
            rows(&["a", "b", "c"]),
            ContentOrder::TextFirst,
            Some(timeout),
        )
        .await;

        // Only the first row was ever admitted
        assert_eq!(adapter.calls(), 1);
        for row in &batch {
            assert_eq!(row.error(), Some(&RowError::Timeout(timeout)));
        }

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(slots.available_permits(), 1);
    }

    #[tokio::test]
    async fn test_closed_slots_abandon_rows() {
        let adapter = Arc::new(MockAdapter::new());
        let slots = Arc::new(Semaphore::new(1));
        slots.close();

        let batch = dispatch(
            &Handle::current(),
            adapter.clone(),
            slots,
            rows(&["a"]),
            ContentOrder::TextFirst,
            None,
        )
        .await;

        assert_eq!(batch[0].error(), Some(&RowError::Abandoned));
        assert_eq!(adapter.calls(), 0);
    }

    #[tokio::test]
    async fn test_repeated_runs_are_identical() {
        let adapter = Arc::new(MockAdapter::new().failing_on("x"));
        let first = run(&adapter, 2, &["p", "x", "q"]).await;
        let second = run(&adapter, 2, &["p", "x", "q"]).await;

        assert_eq!(first, second);
    }

    #[test]
    fn test_check_indices() {
        assert!(check_indices(&rows(&["a", "b"])).is_ok());

        let mut shuffled = rows(&["a", "b"]);
        shuffled.swap(0, 1);
        assert!(matches!(
            check_indices(&shuffled),
            Err(ConfigurationError::IndexMismatch { position: 0, index: 1 })
        ));
    }
}
