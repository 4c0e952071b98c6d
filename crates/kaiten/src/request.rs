//! Row-level request types and prompt content assembly.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::adapter::CompletionRequest;

/// Position of the image block relative to the text block in a user message.
///
/// Some vision models prefer the image before the question, others after.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentOrder {
    #[default]
    TextFirst,
    ImageFirst,
}

/// Image attached to a row, either a URL passed through untouched or raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Url(String),
    Bytes { data: Vec<u8>, mime: String },
}

impl ImageSource {
    pub fn url(url: impl Into<String>) -> Self {
        ImageSource::Url(url.into())
    }

    /// Raw PNG bytes, sent as a base64 `data:` URL.
    pub fn png(data: impl Into<Vec<u8>>) -> Self {
        Self::bytes(data, "image/png")
    }

    pub fn bytes(data: impl Into<Vec<u8>>, mime: impl Into<String>) -> Self {
        ImageSource::Bytes {
            data: data.into(),
            mime: mime.into(),
        }
    }

    /// The value placed in `image_url.url` of the outgoing content block.
    pub fn to_url(&self) -> String {
        match self {
            ImageSource::Url(url) => url.clone(),
            ImageSource::Bytes { data, mime } => {
                format!("data:{};base64,{}", mime, STANDARD.encode(data))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

/// One block of a chat message's `content` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

/// Builds the user message content for one row.
///
/// Absent inputs produce no block, so a text-only row yields a single text block.
pub fn assemble_content(
    text: Option<&str>,
    image: Option<&ImageSource>,
    order: ContentOrder,
) -> Vec<ContentPart> {
    let text = text.map(|text| ContentPart::Text {
        text: text.to_string(),
    });
    let image = image.map(|image| ContentPart::ImageUrl {
        image_url: ImageUrl {
            url: image.to_url(),
        },
    });

    let (first, second) = match order {
        ContentOrder::TextFirst => (text, image),
        ContentOrder::ImageFirst => (image, text),
    };
    first.into_iter().chain(second).collect()
}

/// Sampling parameters merged into the top level of the request body.
///
/// The map is open: anything the remote accepts (`temperature`, `top_p`, `seed`, ...)
/// can be set with [`SamplingParams::set`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SamplingParams(Map<String, Value>);

impl SamplingParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn temperature(self, temperature: f64) -> Self {
        self.set("temperature", temperature)
    }

    pub fn max_tokens(self, max_tokens: u32) -> Self {
        self.set("max_tokens", max_tokens)
    }

    pub fn stop<I, S>(self, stop: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let stop: Vec<String> = stop.into_iter().map(Into::into).collect();
        self.set("stop", stop)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for SamplingParams {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Provider-specific fields passed through verbatim, such as vLLM guided decoding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtraBody(Map<String, Value>);

impl ExtraBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Constrain the completion to one of `choices`.
    pub fn guided_choice<I, S>(self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let choices: Vec<String> = choices.into_iter().map(Into::into).collect();
        self.set("guided_choice", choices)
    }

    /// Constrain the completion to match `pattern`. The pattern is not compiled locally.
    pub fn guided_regex(self, pattern: impl Into<String>) -> Self {
        self.set("guided_regex", pattern.into())
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for ExtraBody {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// A single row of an inference batch.
///
/// `index` is the row's position in the batch and the only key used to match
/// a result back to its request.
#[derive(Debug, Clone, PartialEq)]
pub struct RowRequest {
    pub index: usize,
    pub model_id: String,
    pub text: Option<String>,
    pub image: Option<ImageSource>,
    pub sampling_params: Option<SamplingParams>,
    pub extra_body: Option<ExtraBody>,
}

impl RowRequest {
    pub fn new(index: usize, model_id: impl Into<String>) -> Self {
        Self {
            index,
            model_id: model_id.into(),
            text: None,
            image: None,
            sampling_params: None,
            extra_body: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_image(mut self, image: ImageSource) -> Self {
        self.image = Some(image);
        self
    }

    pub fn with_sampling_params(mut self, params: SamplingParams) -> Self {
        self.sampling_params = Some(params);
        self
    }

    pub fn with_extra_body(mut self, extra_body: ExtraBody) -> Self {
        self.extra_body = Some(extra_body);
        self
    }

    pub(crate) fn into_completion_request(self, order: ContentOrder) -> CompletionRequest {
        CompletionRequest {
            content: assemble_content(self.text.as_deref(), self.image.as_ref(), order),
            model: self.model_id,
            sampling_params: self.sampling_params,
            extra_body: self.extra_body,
        }
    }
}
