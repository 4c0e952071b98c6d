use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::debug;

use super::core_trait::{CompletionAdapter, CompletionRequest};
use crate::config::WorkerConfig;
use crate::error::{AdapterError, ConfigurationError};

/// Longest slice of an error body kept in [`AdapterError::Status`]
const MAX_ERROR_BODY: usize = 512;

/// Chat completion adapter for OpenAI-compatible servers such as vLLM.
///
/// Holds one pooled [`reqwest::Client`] for its whole lifetime, so every row of
/// every batch reuses the same connections.
pub struct OpenAiAdapter {
    client: Client,
    chat_url: String,
    models_url: String,
    api_key: String,
}

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ModelList {
    data: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    id: String,
}

impl OpenAiAdapter {
    /// Builds the client. No request is made until the first call.
    pub fn new(config: &WorkerConfig) -> Result<Self, ConfigurationError> {
        config.validate()?;

        let mut builder = Client::builder().pool_max_idle_per_host(config.max_concurrency);
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(ConfigurationError::Client)?;

        let base = config.base_url.trim_end_matches('/');
        Ok(Self {
            client,
            chat_url: format!("{}/chat/completions", base),
            models_url: format!("{}/models", base),
            api_key: config.api_key.clone(),
        })
    }

    pub fn chat_url(&self) -> &str {
        &self.chat_url
    }

    /// Lists the model ids served by the endpoint. Doubles as a reachability probe.
    pub async fn list_models(&self) -> Result<Vec<String>, AdapterError> {
        let response = self
            .client
            .get(&self.models_url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        let bytes = check_status(response).await?;
        let models: ModelList = serde_json::from_slice(&bytes)
            .map_err(|e| AdapterError::MalformedResponse(e.to_string()))?;
        Ok(models.data.into_iter().map(|m| m.id).collect())
    }
}

/// Request body for one row.
///
/// Sampling params and extra body are merged into the top level, extra body last.
/// Neither can replace `model` or `messages`.
pub(crate) fn build_body(request: &CompletionRequest) -> Value {
    let mut body = Map::new();
    if let Some(params) = &request.sampling_params {
        body.extend(params.as_map().clone());
    }
    if let Some(extra) = &request.extra_body {
        body.extend(extra.as_map().clone());
    }
    body.insert("model".into(), Value::String(request.model.clone()));
    body.insert(
        "messages".into(),
        json!([{ "role": "user", "content": request.content }]),
    );
    Value::Object(body)
}

/// Extracts the text of the first choice.
pub(crate) fn decode_completion(bytes: &[u8]) -> Result<String, AdapterError> {
    let completion: ChatCompletion = serde_json::from_slice(bytes)
        .map_err(|e| AdapterError::MalformedResponse(e.to_string()))?;
    completion
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| AdapterError::MalformedResponse("response has no choices".into()))?
        .message
        .content
        .ok_or(AdapterError::EmptyCompletion)
}

async fn check_status(response: reqwest::Response) -> Result<Vec<u8>, AdapterError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.bytes().await?.to_vec());
    }
    let mut body = response.text().await.unwrap_or_default();
    if body.len() > MAX_ERROR_BODY {
        let cut = (0..=MAX_ERROR_BODY).rev().find(|&i| body.is_char_boundary(i)).unwrap_or(0);
        body.truncate(cut);
    }
    Err(AdapterError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl CompletionAdapter for OpenAiAdapter {
    async fn call(&self, request: &CompletionRequest) -> Result<String, AdapterError> {
        debug!(model = %request.model, "sending chat completion");
        let response = self
            .client
            .post(&self.chat_url)
            .bearer_auth(&self.api_key)
            .json(&build_body(request))
            .send()
            .await?;
        let bytes = check_status(response).await?;
        decode_completion(&bytes)
    }
}
