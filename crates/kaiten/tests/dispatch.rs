use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use kaiten::adapter::{CompletionAdapter, CompletionRequest};
use kaiten::{
    AdapterError, BatchColumns, BatchInferenceWorker, ImageSource, RowError, RowRequest,
    WorkerConfig,
};

/// `model + text + image`, sleeping according to the number embedded in the text.
struct ConcatAdapter {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

impl ConcatAdapter {
    fn new() -> Self {
        Self {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CompletionAdapter for ConcatAdapter {
    async fn call(&self, request: &CompletionRequest) -> Result<String, AdapterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let text = request.text().unwrap_or_default();
        let delay: u64 = text
            .chars()
            .filter(|c| c.is_ascii_digit())
            .collect::<String>()
            .parse()
            .unwrap_or(0);
        tokio::time::sleep(Duration::from_millis(delay)).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if text.starts_with("fail") {
            return Err(AdapterError::Other(format!("refused {}", text)));
        }
        Ok(format!(
            "{}{}{}",
            request.model,
            text,
            request.image_url().unwrap_or_default()
        ))
    }
}

fn worker(max_concurrency: usize) -> BatchInferenceWorker<ConcatAdapter> {
    let config = WorkerConfig::default().with_max_concurrency(max_concurrency);
    BatchInferenceWorker::with_adapter(config, ConcatAdapter::new()).unwrap()
}

#[test]
fn test_example_batch() {
    let worker = worker(4);
    let rows = vec![
        RowRequest::new(0, "m").with_text("a"),
        RowRequest::new(1, "m").with_text("b"),
    ];

    let batch = worker.run_batch(rows).unwrap();

    assert_eq!(batch.outputs(), vec![Some("ma"), Some("mb")]);
}

#[test]
fn test_results_follow_input_order() {
    let worker = worker(16);
    // Descending delays: the last rows finish first
    let texts: Vec<Option<String>> = (0..32).map(|i| Some(format!("r{}", (32 - i) * 3))).collect();
    let expected: Vec<Option<String>> = texts.iter().map(|t| t.as_ref().map(|t| format!("m{}", t))).collect();

    let column = worker
        .run_columns(BatchColumns::new("m", texts))
        .unwrap()
        .into_column();

    assert_eq!(column, expected);
}

#[test]
fn test_peak_concurrency_bounded() {
    let worker = worker(5);
    let rows = (0..50).map(|i| RowRequest::new(i, "m").with_text("t10"));

    let batch = worker.run_batch(rows).unwrap();

    assert_eq!(batch.succeeded(), 50);
    assert_eq!(worker.adapter().calls.load(Ordering::SeqCst), 50);
    assert!(worker.adapter().peak.load(Ordering::SeqCst) <= 5);
}

#[test]
fn test_single_slot_never_overlaps() {
    let worker = worker(1);
    let rows = (0..6).map(|i| RowRequest::new(i, "m").with_text("t5"));

    worker.run_batch(rows).unwrap();

    assert_eq!(worker.adapter().peak.load(Ordering::SeqCst), 1);
}

#[test]
fn test_empty_batch() {
    let worker = worker(2);
    let batch = worker.run_columns(BatchColumns::new("m", vec![])).unwrap();

    assert!(batch.is_empty());
    assert_eq!(worker.adapter().calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_failures_are_row_local() {
    let worker = worker(3);
    let texts = vec![Some("ok1".into()), Some("fail2".into()), Some("ok3".into()), None];
    let images = vec![None, None, Some(ImageSource::url("+img")), None];

    let batch = worker
        .run_columns(BatchColumns::new("m", texts).with_images(images))
        .unwrap();

    assert_eq!(batch.len(), 4);
    assert_eq!(batch[0].output(), Some("mok1"));
    assert!(matches!(
        batch[1].error(),
        Some(RowError::Adapter(AdapterError::Other(_)))
    ));
    assert_eq!(batch[2].output(), Some("mok3+img"));
    assert_eq!(batch[3].output(), Some("m"));
    assert_eq!(batch.failed(), 1);
}

#[test]
fn test_same_batch_same_result() {
    let worker = worker(4);
    let rows: Vec<RowRequest> = (0..10)
        .map(|i| RowRequest::new(i, "m").with_text(format!("x{}", i % 3)))
        .collect();

    let first = worker.run_batch(rows.clone()).unwrap();
    let second = worker.run_batch(rows).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_configured_batch_timeout() {
    let config = WorkerConfig::default()
        .with_max_concurrency(2)
        .with_batch_timeout(Duration::from_millis(150));
    let worker = BatchInferenceWorker::with_adapter(config, ConcatAdapter::new()).unwrap();
    let rows = vec![
        RowRequest::new(0, "m").with_text("t1"),
        RowRequest::new(1, "m").with_text("t20000"),
    ];

    let batch = worker.run_batch(rows).unwrap();

    assert!(batch[0].is_ok());
    assert_eq!(
        batch[1].error(),
        Some(&RowError::Timeout(Duration::from_millis(150)))
    );
}

#[test]
fn test_queued_rows_time_out_with_one_slot() {
    let config = WorkerConfig::default()
        .with_max_concurrency(1)
        .with_batch_timeout(Duration::from_millis(150));
    let worker = BatchInferenceWorker::with_adapter(config, ConcatAdapter::new()).unwrap();
    let rows = (0..3).map(|i| RowRequest::new(i, "m").with_text("t20000"));

    let batch = worker.run_batch(rows).unwrap();

    assert_eq!(worker.adapter().calls.load(Ordering::SeqCst), 1);
    assert!(batch
        .iter()
        .all(|row| row.error() == Some(&RowError::Timeout(Duration::from_millis(150)))));
}

#[test]
fn test_shared_worker_across_threads() {
    let worker = Arc::new(worker(3));
    let handles: Vec<_> = (0..3)
        .map(|t| {
            let worker = worker.clone();
            std::thread::spawn(move || {
                let rows = (0..10).map(|i| RowRequest::new(i, format!("w{}", t)).with_text("t5"));
                worker.run_batch(rows).unwrap()
            })
        })
        .collect();

    for (t, handle) in handles.into_iter().enumerate() {
        let batch = handle.join().unwrap();
        assert!(batch.iter().all(|row| row.output() == Some(format!("w{}t5", t).as_str())));
    }
    assert!(worker.adapter().peak.load(Ordering::SeqCst) <= 3);
}
