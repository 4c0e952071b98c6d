//! Row and batch results.

use std::ops::Index;

use crate::error::RowError;

/// Outcome of one row, keyed by its position in the input batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowResult {
    pub index: usize,
    pub outcome: Result<String, RowError>,
}

impl RowResult {
    pub fn succeeded(index: usize, output: impl Into<String>) -> Self {
        Self {
            index,
            outcome: Ok(output.into()),
        }
    }

    pub fn failed(index: usize, error: RowError) -> Self {
        Self {
            index,
            outcome: Err(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn output(&self) -> Option<&str> {
        self.outcome.as_deref().ok()
    }

    pub fn error(&self) -> Option<&RowError> {
        self.outcome.as_ref().err()
    }

    pub fn into_output(self) -> Option<String> {
        self.outcome.ok()
    }
}

/// Ordered results of one batch, aligned position-for-position with its input.
///
/// A batch may mix successful and failed rows. Whether a failure becomes a null,
/// an error or a filtered row is left to the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResult {
    rows: Vec<RowResult>,
}

impl BatchResult {
    pub(crate) fn from_rows(rows: Vec<RowResult>) -> Self {
        debug_assert!(rows.iter().enumerate().all(|(pos, row)| row.index == pos));
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[RowResult] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RowResult> {
        self.rows.iter()
    }

    pub fn succeeded(&self) -> usize {
        self.rows.iter().filter(|row| row.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.len() - self.succeeded()
    }

    /// Outputs by position, `None` where the row failed.
    pub fn outputs(&self) -> Vec<Option<&str>> {
        self.rows.iter().map(RowResult::output).collect()
    }

    /// Consumes the batch into an output column with failed rows as nulls.
    pub fn into_column(self) -> Vec<Option<String>> {
        self.rows.into_iter().map(RowResult::into_output).collect()
    }

    pub fn into_rows(self) -> Vec<RowResult> {
        self.rows
    }
}

impl Index<usize> for BatchResult {
    type Output = RowResult;

    fn index(&self, index: usize) -> &Self::Output {
        &self.rows[index]
    }
}

impl IntoIterator for BatchResult {
    type Item = RowResult;
    type IntoIter = std::vec::IntoIter<RowResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<'a> IntoIterator for &'a BatchResult {
    type Item = &'a RowResult;
    type IntoIter = std::slice::Iter<'a, RowResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
