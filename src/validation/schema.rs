//! Schema module for validating JSON documents.
//!
//! This module validates JSON documents against the JSON schema derived from
//! a record type, e.g. a model or a simulation, and reports every schema
//! violation with its location.

use std::{error::Error, fmt};

use colored::Colorize;
use jsonschema::validator_for;
use schemars::{schema_for, JsonSchema};
use serde_json::Value;

/// Report containing validation results
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ValidationReport {
    /// Whether the document is valid
    pub valid: bool,
    /// List of validation errors if any
    pub errors: Vec<ValidationError>,
}

/// Individual validation error details
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ValidationError {
    /// JSON path where the error occurred
    pub location: String,
    /// Description of the validation error
    pub message: String,
}

impl fmt::Display for ValidationError {
    /// Formats the validation error for display
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\n\t└── {}",
            self.location.bold(),
            self.message.bold().red()
        )
    }
}

/// Validates a JSON document against the schema of the record type `T`
///
/// # Arguments
/// * `content` - JSON string containing the record
///
/// # Returns
/// * `Result<ValidationReport, Box<dyn Error>>` - Validation report, or an
///   error if the content is not JSON
pub fn validate_json<T: JsonSchema>(content: &str) -> Result<ValidationReport, Box<dyn Error>> {
    let json: Value = serde_json::from_str(content)?;
    let schema = serde_json::to_value(schema_for!(T))?;
    let validator = validator_for(&schema)?;

    let errors: Vec<ValidationError> = validator
        .iter_errors(&json)
        .map(|error| ValidationError {
            location: error.instance_path.to_string(),
            message: error.to_string().replace('"', "'"),
        })
        .collect();

    Ok(ValidationReport {
        valid: errors.is_empty(),
        errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_model::common::Taxon;
    use crate::data_model::model::Model;

    #[test]
    fn test_valid_document() {
        let report = validate_json::<Taxon>(r#"{"id": 9606, "name": "Homo sapiens"}"#).unwrap();
        assert!(report.valid);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_invalid_document() {
        let report = validate_json::<Taxon>(r#"{"id": "human"}"#).unwrap();
        assert!(!report.valid);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].location, "/id");
    }

    #[test]
    fn test_nested_records() {
        let report = validate_json::<Model>(r#"{"id": "m", "taxon": {"id": -1}}"#).unwrap();
        assert!(!report.valid);
        // Optional records are `anyOf` schemas, so the error is reported at the record
        assert!(report.errors.iter().any(|error| error.location == "/taxon"));
    }

    #[test]
    fn test_not_json() {
        assert!(validate_json::<Taxon>("id: 9606").is_err());
    }
}
