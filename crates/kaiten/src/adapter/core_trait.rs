use async_trait::async_trait;

use crate::error::AdapterError;
use crate::request::{ContentPart, ExtraBody, SamplingParams};

/// A fully assembled request for one row, as handed to an adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub content: Vec<ContentPart>,
    pub sampling_params: Option<SamplingParams>,
    pub extra_body: Option<ExtraBody>,
}

impl CompletionRequest {
    /// Text of the first text block, if any.
    pub fn text(&self) -> Option<&str> {
        self.content.iter().find_map(|part| match part {
            ContentPart::Text { text } => Some(text.as_str()),
            _ => None,
        })
    }

    /// URL of the first image block, if any.
    pub fn image_url(&self) -> Option<&str> {
        self.content.iter().find_map(|part| match part {
            ContentPart::ImageUrl { image_url } => Some(image_url.url.as_str()),
            _ => None,
        })
    }
}

/// Issues a single completion call against a remote service.
///
/// Implementations are shared by every in-flight row of a worker and must be
/// safe to call concurrently. One call produces exactly one textual completion.
///
/// # Example
///
/// ```
/// use async_trait::async_trait;
/// use kaiten::adapter::{CompletionAdapter, CompletionRequest};
/// use kaiten::AdapterError;
///
/// struct Echo;
///
/// #[async_trait]
/// impl CompletionAdapter for Echo {
///     async fn call(&self, request: &CompletionRequest) -> Result<String, AdapterError> {
///         Ok(request.text().unwrap_or_default().to_string())
///     }
/// }
/// ```
#[async_trait]
pub trait CompletionAdapter: Send + Sync {
    async fn call(&self, request: &CompletionRequest) -> Result<String, AdapterError>;
}
