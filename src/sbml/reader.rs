//! SBML model reader.
//!
//! [`SbmlModelReader`] implements the [`ModelReader`] stages for SBML
//! documents. Metadata reading rejects documents which use extension
//! packages the platform cannot simulate, determines the modeling
//! framework from the packages in use and resolves the taxon of the model.

use std::path::Path;

use crate::data_model::common::{Format, RemoteFile, Taxon};
use crate::data_model::model::{ModelFormat, ModelingFramework, Parameter, Variable};
use crate::model_io::error::ModelIoError;
use crate::model_io::reader::{ModelMetadata, ModelReader, UnitsMap};
use crate::sbml::annotations::taxon_id;
use crate::sbml::document::{non_empty, SbmlDocument, SBML_MEDIA_TYPE};
use crate::sbml::units::read_unit_definitions;
use crate::sbml::{parameters, variables};
use crate::taxonomy::{NcbiTaxonomy, TaxonomyLookup};

/// Extension packages models may use
pub const SUPPORTED_PACKAGES: [&str; 9] = [
    "annot", "comp", "fbc", "groups", "layout", "multi", "qual", "render", "req",
];

/// Reads models from SBML files
pub struct SbmlModelReader {
    taxonomy: Box<dyn TaxonomyLookup>,
}

impl SbmlModelReader {
    /// A reader which resolves taxa with the NCBI taxonomy service
    pub fn new() -> Self {
        Self::with_taxonomy(NcbiTaxonomy::new())
    }

    pub fn with_taxonomy(taxonomy: impl TaxonomyLookup + 'static) -> Self {
        SbmlModelReader {
            taxonomy: Box::new(taxonomy),
        }
    }

    fn framework(&self, document: &SbmlDocument) -> Result<ModelingFramework, ModelIoError> {
        let frameworks: Vec<ModelingFramework> = [
            ("fbc", ModelingFramework::FluxBalance),
            ("multi", ModelingFramework::NonSpatialDiscrete),
            ("qual", ModelingFramework::Logical),
        ]
        .into_iter()
        .filter(|(package, _)| document.uses_package(package))
        .map(|(_, framework)| framework)
        .collect();

        match frameworks.as_slice() {
            [] => Ok(ModelingFramework::NonSpatialContinuous),
            [framework] => Ok(*framework),
            _ => Err(ModelIoError::AmbiguousFramework),
        }
    }
}

impl Default for SbmlModelReader {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelReader for SbmlModelReader {
    type Document = SbmlDocument;

    fn read_from_file(&self, path: &Path) -> Result<(SbmlDocument, RemoteFile), ModelIoError> {
        let document = SbmlDocument::from_file(path)?;
        let file = RemoteFile {
            id: None,
            name: Some(document.source()),
            media_type: Some(SBML_MEDIA_TYPE.to_string()),
            size: Some(path.metadata()?.len()),
        };
        Ok((document, file))
    }

    fn read_format(&self, document: &SbmlDocument) -> Result<Format, ModelIoError> {
        Ok(ModelFormat::Sbml
            .format()
            .with_version(format!("L{}V{}", document.level(), document.version())))
    }

    fn read_metadata(&self, document: &SbmlDocument) -> Result<ModelMetadata, ModelIoError> {
        let unsupported: Vec<&str> = document
            .packages()
            .filter(|package| !SUPPORTED_PACKAGES.contains(package))
            .collect();
        if !unsupported.is_empty() {
            return Err(ModelIoError::UnsupportedPackages(unsupported.join(", ")));
        }

        if document.uses_model_composition() {
            return Err(ModelIoError::UnsupportedComp);
        }

        let framework = self.framework(document)?;

        let taxon = taxon_id(document.model()).and_then(|id| {
            let name = self.taxonomy.scientific_name(id)?;
            Some(Taxon {
                id: Some(id),
                name: Some(name),
            })
        });

        Ok(ModelMetadata {
            id: non_empty(document.model().attr("id")).map(str::to_string),
            name: non_empty(document.model().attr("name")).map(str::to_string),
            framework: Some(framework.term()),
            taxon,
        })
    }

    fn read_units(&self, document: &SbmlDocument) -> Result<UnitsMap, ModelIoError> {
        let list = document
            .model()
            .elements()
            .find(|element| element.name == "listOfUnitDefinitions");
        Ok(read_unit_definitions(list, &document.source()))
    }

    fn read_parameters(
        &self,
        document: &SbmlDocument,
        units: &UnitsMap,
    ) -> Result<Vec<Parameter>, ModelIoError> {
        parameters::read_parameters(document, units)
    }

    fn read_variables(
        &self,
        document: &SbmlDocument,
        units: &UnitsMap,
    ) -> Result<Vec<Variable>, ModelIoError> {
        variables::read_variables(document, units)
    }
}

/// Reads an SBML model, resolving taxa with the NCBI taxonomy service
pub fn read_sbml_model(path: impl AsRef<Path>) -> Result<crate::data_model::model::Model, ModelIoError> {
    SbmlModelReader::new().run(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::StaticTaxonomy;

    fn document(namespaces: &str, model: &str) -> SbmlDocument {
        let xml = format!(
            r#"<sbml xmlns="http://www.sbml.org/sbml/level3/version1/core" level="3" version="1" {namespaces}>
                 {model}
               </sbml>"#
        );
        SbmlDocument::parse(&xml, Path::new("model.xml")).unwrap()
    }

    fn reader() -> SbmlModelReader {
        SbmlModelReader::with_taxonomy(StaticTaxonomy::new())
    }

    #[test]
    fn test_framework_from_packages() {
        let continuous = document("", r#"<model id="m"/>"#);
        let metadata = reader().read_metadata(&continuous).unwrap();
        assert_eq!(
            metadata.framework,
            Some(ModelingFramework::NonSpatialContinuous.term())
        );

        let logical = document(
            r#"xmlns:qual="http://www.sbml.org/sbml/level3/version1/qual/version1""#,
            r#"<model id="m"/>"#,
        );
        let metadata = reader().read_metadata(&logical).unwrap();
        assert_eq!(metadata.framework, Some(ModelingFramework::Logical.term()));
    }

    #[test]
    fn test_multiple_frameworks_are_ambiguous() {
        let doc = document(
            r#"xmlns:fbc="http://www.sbml.org/sbml/level3/version1/fbc/version2"
               xmlns:qual="http://www.sbml.org/sbml/level3/version1/qual/version1""#,
            r#"<model id="m"/>"#,
        );
        assert!(matches!(
            reader().read_metadata(&doc),
            Err(ModelIoError::AmbiguousFramework)
        ));
    }

    #[test]
    fn test_unsupported_packages_are_listed() {
        let doc = document(
            r#"xmlns:spatial="http://www.sbml.org/sbml/level3/version1/spatial/version1"
               xmlns:distrib="http://www.sbml.org/sbml/level3/version1/distrib/version1""#,
            r#"<model id="m"/>"#,
        );
        match reader().read_metadata(&doc) {
            Err(ModelIoError::UnsupportedPackages(packages)) => {
                assert_eq!(packages, "distrib, spatial")
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_format_version() {
        let doc = document("", r#"<model id="m"/>"#);
        let format = reader().read_format(&doc).unwrap();
        assert_eq!(format.id.as_deref(), Some("SBML"));
        assert_eq!(format.version.as_deref(), Some("L3V1"));
    }
}
