//! Biological models and their parameters and variables.

use derive_builder::Builder;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::data_model::common::{
    range_key, Format, Identifier, JournalReference, License, OntologyTerm, ParameterValue,
    ParameterValueKey, Person, RemoteFile, Taxon, ValueType,
};
use crate::data_model::record::{sorted_eq, sorted_strings_eq, SortKey};

/// A model, e.g. one read from an SBML file.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Builder, Default)]
pub struct Model {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub name: Option<String>,

    /// File which encodes the model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub file: Option<RemoteFile>,

    /// Visualization of the model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub image: Option<RemoteFile>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub format: Option<Format>,

    /// Modeling framework, as an SBO term
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub framework: Option<OntologyTerm>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub taxon: Option<Taxon>,

    #[serde(default)]
    #[builder(default, setter(into, each(name = "to_tags")))]
    pub tags: Vec<String>,

    #[serde(default)]
    #[builder(default, setter(into, each(name = "to_identifiers")))]
    pub identifiers: Vec<Identifier>,

    /// Publications which describe the model
    #[serde(default)]
    #[builder(default, setter(into, each(name = "to_refs")))]
    pub refs: Vec<JournalReference>,

    #[serde(default)]
    #[builder(default, setter(into, each(name = "to_authors")))]
    pub authors: Vec<Person>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub license: Option<License>,

    #[serde(default)]
    #[builder(default, setter(into, each(name = "to_parameters")))]
    pub parameters: Vec<Parameter>,

    #[serde(default)]
    #[builder(default, setter(into, each(name = "to_variables")))]
    pub variables: Vec<Variable>,
}

impl PartialEq for Model {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.file == other.file
            && self.image == other.image
            && self.description == other.description
            && self.format == other.format
            && self.framework == other.framework
            && self.taxon == other.taxon
            && sorted_strings_eq(&self.tags, &other.tags)
            && sorted_eq(&self.identifiers, &other.identifiers)
            && sorted_eq(&self.refs, &other.refs)
            && sorted_eq(&self.authors, &other.authors)
            && self.license == other.license
            && sorted_eq(&self.parameters, &other.parameters)
            && sorted_eq(&self.variables, &other.variables)
    }
}

/// An adjustable input of a model.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Builder, Default)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    /// Address of the parameter within the source document, e.g.
    /// `/sbml:sbml/sbml:model/sbml:listOfParameters/sbml:parameter[@id='k1']/@value`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub target: Option<String>,

    /// Label used to group parameters in user interfaces
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub group: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub description: Option<String>,

    #[serde(default)]
    #[builder(default, setter(into, each(name = "to_identifiers")))]
    pub identifiers: Vec<Identifier>,

    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub value_type: Option<ValueType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub value: Option<ParameterValue>,

    /// Recommended minimum and maximum values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub recommended_range: Option<Vec<ParameterValue>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub units: Option<String>,
}

impl Parameter {
    /// A parameter which only records where it lives in the source document,
    /// as used by model parameter changes
    pub fn with_target(target: impl Into<String>) -> Self {
        Parameter {
            target: Some(target.into()),
            ..Default::default()
        }
    }

    /// Full identity of the parameter, used when parameters are compared
    /// as part of a parameter change
    pub(crate) fn identity_key(
        &self,
    ) -> (
        Option<String>,
        Option<String>,
        Option<ValueType>,
        Option<ParameterValueKey>,
        Option<Vec<ParameterValueKey>>,
        Option<String>,
    ) {
        (
            self.id.clone(),
            self.target.clone(),
            self.value_type,
            self.value.as_ref().map(ParameterValue::sort_key),
            range_key(&self.recommended_range),
            self.units.clone(),
        )
    }
}

impl PartialEq for Parameter {
    fn eq(&self, other: &Self) -> bool {
        self.target == other.target
            && self.group == other.group
            && self.id == other.id
            && self.name == other.name
            && self.description == other.description
            && sorted_eq(&self.identifiers, &other.identifiers)
            && self.value_type == other.value_type
            && self.value == other.value
            && self.recommended_range == other.recommended_range
            && self.units == other.units
    }
}

impl SortKey for Parameter {
    type Key = Option<String>;

    fn sort_key(&self) -> Self::Key {
        self.id.clone()
    }
}

/// An observable output of a model.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Builder, Default)]
pub struct Variable {
    /// Address of the variable within the source document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub target: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub group: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub description: Option<String>,

    #[serde(default)]
    #[builder(default, setter(into, each(name = "to_identifiers")))]
    pub identifiers: Vec<Identifier>,

    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub value_type: Option<ValueType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub units: Option<String>,
}

impl Variable {
    /// A variable known only by its id and target
    pub fn new(id: impl Into<String>, target: impl Into<String>) -> Self {
        Variable {
            id: Some(id.into()),
            target: Some(target.into()),
            ..Default::default()
        }
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        self.target == other.target
            && self.group == other.group
            && self.id == other.id
            && self.name == other.name
            && self.description == other.description
            && sorted_eq(&self.identifiers, &other.identifiers)
            && self.value_type == other.value_type
            && self.units == other.units
    }
}

impl SortKey for Variable {
    type Key = Option<String>;

    fn sort_key(&self) -> Self::Key {
        self.id.clone()
    }
}

/// Model formats known to the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelFormat {
    Sbml,
    CellMl,
    Bngl,
    Vcml,
}

impl ModelFormat {
    /// Metadata about the format, without a version
    pub fn format(&self) -> Format {
        let (id, name, edam_id, url, spec_url) = match self {
            ModelFormat::Sbml => (
                "SBML",
                "Systems Biology Markup Language",
                Some("format_2585"),
                "http://sbml.org",
                "http://identifiers.org/combine.specifications/sbml",
            ),
            ModelFormat::CellMl => (
                "CellML",
                "CellML",
                Some("format_3240"),
                "https://www.cellml.org",
                "http://identifiers.org/combine.specifications/cellml",
            ),
            ModelFormat::Bngl => (
                "BNGL",
                "BioNetGen Language",
                Some("format_3972"),
                "https://bionetgen.org",
                "https://bionetgen.org",
            ),
            ModelFormat::Vcml => (
                "VCML",
                "Virtual Cell Markup Language",
                None,
                "https://vcell.org",
                "https://vcell.org",
            ),
        };

        Format {
            id: Some(id.to_string()),
            name: Some(name.to_string()),
            version: None,
            edam_id: edam_id.map(str::to_string),
            url: Some(url.to_string()),
            spec_url: Some(spec_url.to_string()),
        }
    }

    /// Short name, e.g. `SBML`
    pub fn id(&self) -> &'static str {
        match self {
            ModelFormat::Sbml => "SBML",
            ModelFormat::CellMl => "CellML",
            ModelFormat::Bngl => "BNGL",
            ModelFormat::Vcml => "VCML",
        }
    }
}

/// Mathematical frameworks models are expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelingFramework {
    FluxBalance,
    Logical,
    NonSpatialContinuous,
    NonSpatialDiscrete,
    SpatialContinuous,
    SpatialDiscrete,
}

impl ModelingFramework {
    /// The SBO term of the framework
    pub fn term(&self) -> OntologyTerm {
        let (id, name) = match self {
            ModelingFramework::FluxBalance => ("0000624", "flux balance framework"),
            ModelingFramework::Logical => ("0000234", "logical framework"),
            ModelingFramework::NonSpatialContinuous => {
                ("0000293", "non-spatial continuous framework")
            }
            ModelingFramework::NonSpatialDiscrete => ("0000295", "non-spatial discrete framework"),
            ModelingFramework::SpatialContinuous => ("0000292", "spatial continuous framework"),
            ModelingFramework::SpatialDiscrete => ("0000294", "spatial discrete framework"),
        };

        OntologyTerm {
            ontology: Some("SBO".to_string()),
            id: Some(id.to_string()),
            name: Some(name.to_string()),
            description: None,
            iri: Some(format!("http://biomodels.net/SBO/SBO_{id}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::data_model::record::JsonRecord;

    fn parameter(id: &str, value: f64) -> Parameter {
        ParameterBuilder::default()
            .id(id.to_string())
            .target(format!(
                "/sbml:sbml/sbml:model/sbml:listOfParameters/sbml:parameter[@id='{id}']/@value"
            ))
            .value_type(ValueType::Float)
            .value(ParameterValue::Float(value))
            .recommended_range(vec![
                ParameterValue::Float(value / 10.0),
                ParameterValue::Float(value * 10.0),
            ])
            .build()
            .unwrap()
    }

    #[test]
    fn test_model_equality_ignores_list_order() {
        let a = ModelBuilder::default()
            .id("model".to_string())
            .to_tags("b".to_string())
            .to_tags("a".to_string())
            .to_parameters(parameter("k1", 1.0))
            .to_parameters(parameter("k2", 2.0))
            .build()
            .unwrap();

        let b = ModelBuilder::default()
            .id("model".to_string())
            .tags(vec!["a".to_string(), "b".to_string()])
            .parameters(vec![parameter("k2", 2.0), parameter("k1", 1.0)])
            .build()
            .unwrap();

        assert_eq!(a, b);

        let c = ModelBuilder::default()
            .id("model".to_string())
            .parameters(vec![parameter("k2", 2.0), parameter("k1", 3.0)])
            .build()
            .unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_model_json_round_trip() {
        let model = ModelBuilder::default()
            .id("BIOMD0000000001".to_string())
            .name("Edelstein1996 - EPSP ACh event".to_string())
            .format(ModelFormat::Sbml.format().with_version("L2V4"))
            .framework(ModelingFramework::NonSpatialContinuous.term())
            .taxon(Taxon {
                id: Some(7787),
                name: Some("Tetronarce californica".to_string()),
            })
            .license(License::Cc0)
            .to_parameters(parameter("k1", 0.5))
            .to_variables(Variable::new(
                "BLL",
                "/sbml:sbml/sbml:model/sbml:listOfSpecies/sbml:species[@id='BLL']",
            ))
            .build()
            .unwrap();

        let value = model.to_json().unwrap();
        assert_eq!(value["license"], json!("CC0"));
        assert_eq!(value["parameters"][0]["type"], json!("float"));
        assert_eq!(value["parameters"][0]["recommendedRange"], json!([0.05, 5.0]));
        assert_eq!(Model::from_json(&value).unwrap(), model);
    }

    #[test]
    fn test_model_from_sparse_json() {
        let model = Model::from_json(&json!({"id": "m"})).unwrap();
        assert_eq!(model.id.as_deref(), Some("m"));
        assert!(model.tags.is_empty());
        assert!(model.parameters.is_empty());
        assert!(model.license.is_none());
    }

    #[test]
    fn test_model_with_unknown_license_is_invalid() {
        assert!(Model::from_json(&json!({"license": "proprietary"})).is_err());
    }

    #[test]
    fn test_framework_terms() {
        let term = ModelingFramework::FluxBalance.term();
        assert_eq!(term.id.as_deref(), Some("0000624"));
        assert_eq!(
            ModelingFramework::NonSpatialContinuous.term().name.as_deref(),
            Some("non-spatial continuous framework")
        );
    }
}
