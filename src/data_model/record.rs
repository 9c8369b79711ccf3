//! JSON import/export and order-insensitive comparison shared by all records.

use itertools::Itertools;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors raised when converting records from and to JSON.
#[derive(Debug, Error)]
pub enum RecordError {
    /// The JSON does not describe a valid record, e.g. an enumerated value
    /// such as `type` or `license` is not recognized
    #[error("Invalid record: {0}")]
    Validation(#[from] serde_json::Error),

    /// A JSON-API document declares a different resource type
    #[error("`type` '{found}' != '{expected}'")]
    ResourceType { expected: String, found: String },
}

/// JSON conversion for records.
///
/// `from_json(to_json(x))` reproduces `x` up to the order of list-valued
/// fields, which record equality ignores.
pub trait JsonRecord: Serialize + DeserializeOwned {
    /// Exports the record to a JSON value
    fn to_json(&self) -> Result<Value, RecordError> {
        Ok(serde_json::to_value(self)?)
    }

    /// Imports a record from a JSON value. Missing optional keys default to
    /// `None` or an empty list.
    fn from_json(value: &Value) -> Result<Self, RecordError> {
        Ok(serde_json::from_value(value.clone())?)
    }
}

impl<T: Serialize + DeserializeOwned> JsonRecord for T {}

/// A deterministic key used to order records before comparing lists.
pub trait SortKey {
    type Key: Ord;

    fn sort_key(&self) -> Self::Key;
}

/// Compares two lists after sorting both by the records' sort keys.
pub(crate) fn sorted_eq<T: SortKey + PartialEq>(left: &[T], right: &[T]) -> bool {
    left.len() == right.len()
        && left
            .iter()
            .sorted_by_key(|item| item.sort_key())
            .zip(right.iter().sorted_by_key(|item| item.sort_key()))
            .all(|(a, b)| a == b)
}

/// Compares two lists of plain strings ignoring order.
pub(crate) fn sorted_strings_eq(left: &[String], right: &[String]) -> bool {
    left.len() == right.len() && left.iter().sorted().eq(right.iter().sorted())
}
