//! Column-oriented batch input, the shape a dataframe partition hands to a UDF.

use crate::error::ConfigurationError;
use crate::request::{ExtraBody, ImageSource, RowRequest, SamplingParams};

/// A value given once for the whole batch or once per row.
#[derive(Debug, Clone, PartialEq)]
pub enum Column<T> {
    Scalar(T),
    Values(Vec<T>),
}

impl<T: Clone> Column<T> {
    fn expand(self, name: &'static str, rows: usize) -> Result<Vec<T>, ConfigurationError> {
        match self {
            Column::Scalar(value) => Ok(vec![value; rows]),
            Column::Values(values) => {
                check_len(name, rows, values.len())?;
                Ok(values)
            }
        }
    }
}

impl<T> From<T> for Column<T> {
    fn from(value: T) -> Self {
        Column::Scalar(value)
    }
}

fn check_len(column: &'static str, expected: usize, actual: usize) -> Result<(), ConfigurationError> {
    if expected == actual {
        Ok(())
    } else {
        Err(ConfigurationError::LengthMismatch {
            column,
            expected,
            actual,
        })
    }
}

/// Parallel per-row inputs for one batch. The row count is the length of `texts`.
///
/// ```
/// use kaiten::{BatchColumns, ExtraBody, ImageSource};
///
/// let columns = BatchColumns::new("google/gemma-3n-e4b-it", vec![Some("Question 1".into()), Some("Question 2".into())])
///     .with_images(vec![Some(ImageSource::png(vec![1, 2, 3])), None])
///     .with_extra_body(ExtraBody::new().guided_choice(["A", "B", "C", "D"]));
///
/// let rows = columns.into_requests().unwrap();
/// assert_eq!(rows[1].index, 1);
/// assert!(rows[1].image.is_none());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BatchColumns {
    pub model_id: Column<String>,
    pub texts: Vec<Option<String>>,
    pub images: Option<Vec<Option<ImageSource>>>,
    pub sampling_params: Option<Column<SamplingParams>>,
    pub extra_body: Option<Column<ExtraBody>>,
}

impl BatchColumns {
    pub fn new(model_id: impl Into<String>, texts: Vec<Option<String>>) -> Self {
        Self {
            model_id: Column::Scalar(model_id.into()),
            texts,
            images: None,
            sampling_params: None,
            extra_body: None,
        }
    }

    pub fn with_model_ids(mut self, model_ids: Vec<String>) -> Self {
        self.model_id = Column::Values(model_ids);
        self
    }

    pub fn with_images(mut self, images: Vec<Option<ImageSource>>) -> Self {
        self.images = Some(images);
        self
    }

    pub fn with_sampling_params(mut self, params: impl Into<Column<SamplingParams>>) -> Self {
        self.sampling_params = Some(params.into());
        self
    }

    pub fn with_extra_body(mut self, extra_body: impl Into<Column<ExtraBody>>) -> Self {
        self.extra_body = Some(extra_body.into());
        self
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    /// Validates column lengths and turns the columns into indexed row requests.
    pub fn into_requests(self) -> Result<Vec<RowRequest>, ConfigurationError> {
        let rows = self.len();
        let model_ids = self.model_id.expand("model_id", rows)?;
        let images = match self.images {
            Some(images) => {
                check_len("images", rows, images.len())?;
                images
            }
            None => vec![None; rows],
        };
        let sampling_params = match self.sampling_params {
            Some(column) => column.expand("sampling_params", rows)?.into_iter().map(Some).collect(),
            None => vec![None; rows],
        };
        let extra_body = match self.extra_body {
            Some(column) => column.expand("extra_body", rows)?.into_iter().map(Some).collect(),
            None => vec![None; rows],
        };

        let requests = self
            .texts
            .into_iter()
            .zip(model_ids)
            .zip(images)
            .zip(sampling_params)
            .zip(extra_body)
            .enumerate()
            .map(|(index, ((((text, model_id), image), sampling_params), extra_body))| RowRequest {
                index,
                model_id,
                text,
                image,
                sampling_params,
                extra_body,
            })
            .collect();
        Ok(requests)
    }
}
