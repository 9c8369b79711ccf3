//! Staged model reading.
//!
//! Every model format backend implements the stages of [`ModelReader`];
//! [`ModelReader::run`] calls them in a fixed order and assembles the
//! [`Model`]. The parsed document and the units table are passed from
//! stage to stage, so a reader holds no per-file state and can be reused.

use std::collections::BTreeMap;
use std::path::Path;

use crate::data_model::common::{Format, OntologyTerm, ParameterValue, RemoteFile, Taxon};
use crate::data_model::model::{Model, Parameter, Variable};
use crate::model_io::error::ModelIoError;

/// Human-readable units keyed by unit definition id
pub type UnitsMap = BTreeMap<String, String>;

/// Descriptive metadata read from a model document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelMetadata {
    pub id: Option<String>,
    pub name: Option<String>,
    pub framework: Option<OntologyTerm>,
    pub taxon: Option<Taxon>,
}

/// Reads a model from a file through a fixed sequence of stages:
/// file, format, metadata, units, parameters, variables.
pub trait ModelReader {
    /// The parsed form of a model file
    type Document;

    /// Parses the file, returning the document and a description of the file
    fn read_from_file(&self, path: &Path) -> Result<(Self::Document, RemoteFile), ModelIoError>;

    /// Determines the format (and version) of the document
    fn read_format(&self, document: &Self::Document) -> Result<Format, ModelIoError>;

    /// Reads the id, name, modeling framework and taxon of the model
    fn read_metadata(&self, document: &Self::Document) -> Result<ModelMetadata, ModelIoError>;

    /// Builds the table of human-readable units
    fn read_units(&self, document: &Self::Document) -> Result<UnitsMap, ModelIoError>;

    /// Collects the adjustable parameters of the model
    fn read_parameters(
        &self,
        document: &Self::Document,
        units: &UnitsMap,
    ) -> Result<Vec<Parameter>, ModelIoError>;

    /// Collects the observable variables of the model
    fn read_variables(
        &self,
        document: &Self::Document,
        units: &UnitsMap,
    ) -> Result<Vec<Variable>, ModelIoError>;

    /// Reads a model from a file
    fn run(&self, path: impl AsRef<Path>) -> Result<Model, ModelIoError>
    where
        Self: Sized,
    {
        let path = path.as_ref();
        log::debug!("Reading model from {}", path.display());

        let (document, file) = self.read_from_file(path)?;
        let format = self.read_format(&document)?;
        let metadata = self.read_metadata(&document)?;
        let units = self.read_units(&document)?;
        let parameters = self.read_parameters(&document, &units)?;
        let variables = self.read_variables(&document, &units)?;

        Ok(Model {
            id: metadata.id,
            name: metadata.name,
            file: Some(file),
            format: Some(format),
            framework: metadata.framework,
            taxon: metadata.taxon,
            parameters,
            variables,
            ..Default::default()
        })
    }
}

/// Recommended range of a parameter around its nominal value:
/// `[0, 10]` for zero, `[value / 10, value * 10]` otherwise.
pub fn recommended_range(value: f64) -> Vec<ParameterValue> {
    if value == 0.0 {
        vec![ParameterValue::Float(0.0), ParameterValue::Float(10.0)]
    } else {
        vec![
            ParameterValue::Float(value / 10.0),
            ParameterValue::Float(value * 10.0),
        ]
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn bounds(value: f64) -> (f64, f64) {
        let range = recommended_range(value);
        (
            range[0].as_f64().unwrap(),
            range[1].as_f64().unwrap(),
        )
    }

    #[test]
    fn test_recommended_range_of_zero() {
        assert_eq!(
            recommended_range(0.0),
            vec![ParameterValue::Float(0.0), ParameterValue::Float(10.0)]
        );
    }

    #[test]
    fn test_recommended_range_of_nonzero_values() {
        for value in [1.0, 0.3, 2.5e-7, 42.0] {
            let (low, high) = bounds(value);
            assert_eq!(low, value / 10.0);
            assert_eq!(high, value * 10.0);
        }
    }

    #[test]
    fn test_recommended_range_of_negative_value_keeps_sign() {
        let (low, high) = bounds(-2.0);
        assert_relative_eq!(low, -0.2);
        assert_relative_eq!(high, -20.0);
    }
}
