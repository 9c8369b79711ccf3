use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Loads a record, or a list of records, from a JSON file.
///
/// # Arguments
///
/// * `path` - Path to the JSON file
///
/// # Errors
///
/// Returns `IOError::FileNotFound` if the file cannot be opened and
/// `IOError::JsonParseError` if its contents do not describe a `T`.
pub fn load_json<T: DeserializeOwned>(path: impl Into<PathBuf>) -> Result<T, IOError> {
    let path = path.into();
    let file = std::fs::File::open(path).map_err(IOError::FileNotFound)?;
    serde_json::from_reader(std::io::BufReader::new(file)).map_err(IOError::JsonParseError)
}

/// Saves a record, or a list of records, as pretty-printed JSON.
///
/// # Arguments
///
/// * `path` - Path of the JSON file to create or overwrite
/// * `value` - The record to save
pub fn save_json<T: Serialize + ?Sized>(path: impl Into<PathBuf>, value: &T) -> Result<(), IOError> {
    let path = path.into();
    let file = std::fs::File::create(path).map_err(IOError::FileNotFound)?;
    serde_json::to_writer_pretty(file, value).map_err(IOError::JsonParseError)
}

/// Represents errors that can occur while reading or writing JSON files.
#[derive(Error, Debug)]
pub enum IOError {
    /// The file could not be opened or created.
    #[error("File not found: {0}")]
    FileNotFound(#[from] std::io::Error),

    /// The file contents could not be parsed as, or written from, the record.
    #[error("Failed to parse JSON: {0}")]
    JsonParseError(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::data_model::common::{Identifier, Taxon};

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("taxa.json");
        let taxa = vec![
            Taxon {
                id: Some(9606),
                name: Some("Homo sapiens".to_string()),
            },
            Taxon {
                id: Some(7787),
                name: None,
            },
        ];

        save_json(&path, &taxa).unwrap();
        let loaded: Vec<Taxon> = load_json(&path).unwrap();
        assert_eq!(loaded, taxa);
    }

    #[test]
    fn test_load_missing_file() {
        let result: Result<Identifier, IOError> = load_json("does/not/exist.json");
        assert!(matches!(result, Err(IOError::FileNotFound(_))));
    }

    #[test]
    fn test_load_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{\"namespace\": ").unwrap();

        let result: Result<Identifier, IOError> = load_json(&path);
        assert!(matches!(result, Err(IOError::JsonParseError(_))));
    }
}
