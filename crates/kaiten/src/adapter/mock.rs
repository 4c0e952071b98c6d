use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::core_trait::{CompletionAdapter, CompletionRequest};
use crate::error::AdapterError;
use crate::request::ContentPart;

/// Answers with the model id followed by every content block in order, after a
/// per-text latency. A text-first row with an image answers `model + text + url`.
///
/// Tracks how many calls are in flight at once and when each call ran.
#[derive(Default)]
pub(crate) struct MockAdapter {
    latency: HashMap<String, Duration>,
    failing: Vec<String>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
    spans: Mutex<Vec<(Instant, Instant)>>,
}

impl MockAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(mut self, text: &str, latency: Duration) -> Self {
        self.latency.insert(text.to_string(), latency);
        self
    }

    pub fn failing_on(mut self, text: &str) -> Self {
        self.failing.push(text.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Start and end instants of every finished call, in start order.
    pub fn spans(&self) -> Vec<(Instant, Instant)> {
        let mut spans = self.spans.lock().unwrap().clone();
        spans.sort_by_key(|(start, _)| *start);
        spans
    }
}

#[async_trait]
impl CompletionAdapter for MockAdapter {
    async fn call(&self, request: &CompletionRequest) -> Result<String, AdapterError> {
        let start = Instant::now();
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let text = request.text().unwrap_or_default();
        if let Some(latency) = self.latency.get(text) {
            tokio::time::sleep(*latency).await;
        } else {
            tokio::task::yield_now().await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.spans.lock().unwrap().push((start, Instant::now()));

        if self.failing.iter().any(|f| f == text) {
            return Err(AdapterError::Status {
                status: 500,
                body: format!("failed on {}", text),
            });
        }
        let blocks: String = request
            .content
            .iter()
            .map(|part| match part {
                ContentPart::Text { text } => text.as_str(),
                ContentPart::ImageUrl { image_url } => image_url.url.as_str(),
            })
            .collect();
        Ok(format!("{}{}", request.model, blocks))
    }
}
