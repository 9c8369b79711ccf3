//! Records shared by models, simulations and simulators.

use std::fmt;

use derive_builder::Builder;
use ordered_float::OrderedFloat;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::data_model::record::SortKey;

/// Description of a file format.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Builder, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Format {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub version: Option<String>,

    /// Identifier of the format in the EDAM ontology, e.g. `format_2585`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub edam_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub spec_url: Option<String>,
}

impl Format {
    /// Returns a copy of the format tagged with a version
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Whether the format is identified by `id` or called `name`
    pub(crate) fn is(&self, id: &str, name: &str) -> bool {
        self.id.as_deref() == Some(id) || self.name.as_deref() == Some(name)
    }
}

impl SortKey for Format {
    type Key = (
        Option<String>,
        Option<String>,
        Option<String>,
        Option<String>,
        Option<String>,
        Option<String>,
    );

    fn sort_key(&self) -> Self::Key {
        (
            self.id.clone(),
            self.name.clone(),
            self.version.clone(),
            self.edam_id.clone(),
            self.url.clone(),
            self.spec_url.clone(),
        )
    }
}

/// Identifier of an object in an external namespace, e.g. `biomodels.db:BIOMD0000000001`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Builder, Default, PartialEq)]
pub struct Identifier {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub namespace: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub url: Option<String>,
}

impl SortKey for Identifier {
    type Key = (Option<String>, Option<String>, Option<String>);

    fn sort_key(&self) -> Self::Key {
        (self.namespace.clone(), self.id.clone(), self.url.clone())
    }
}

/// A reference to an article.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Builder, Default, PartialEq)]
pub struct JournalReference {
    /// Authors as they appear in the citation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub authors: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub journal: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub volume: Option<String>,

    /// Issue number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub num: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub pages: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub year: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub doi: Option<String>,
}

impl SortKey for JournalReference {
    type Key = (
        Option<String>,
        Option<String>,
        Option<String>,
        Option<String>,
        Option<String>,
        Option<String>,
        Option<i32>,
        Option<String>,
    );

    fn sort_key(&self) -> Self::Key {
        (
            self.authors.clone(),
            self.title.clone(),
            self.journal.clone(),
            self.volume.clone(),
            self.num.clone(),
            self.pages.clone(),
            self.year,
            self.doi.clone(),
        )
    }
}

/// A person, e.g. an author of a model.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Builder, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub first_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub middle_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub last_name: Option<String>,
}

impl Person {
    /// Splits a citation-style name such as `S J Edelstein` into first,
    /// middle and last names.
    pub fn from_full_name(full_name: &str) -> Self {
        let parts: Vec<&str> = full_name.split_whitespace().collect();
        match parts.as_slice() {
            [] => Person::default(),
            [last] => Person {
                last_name: Some(last.to_string()),
                ..Default::default()
            },
            [first, last] => Person {
                first_name: Some(first.to_string()),
                last_name: Some(last.to_string()),
                ..Default::default()
            },
            [first, middle @ .., last] => Person {
                first_name: Some(first.to_string()),
                middle_name: Some(middle.join(" ")),
                last_name: Some(last.to_string()),
            },
        }
    }
}

impl SortKey for Person {
    type Key = (Option<String>, Option<String>, Option<String>);

    fn sort_key(&self) -> Self::Key {
        (
            self.last_name.clone(),
            self.first_name.clone(),
            self.middle_name.clone(),
        )
    }
}

/// A file stored by the platform (model source, image, ...).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Builder, Default, PartialEq)]
pub struct RemoteFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub name: Option<String>,

    /// Media type, e.g. `application/sbml+xml`
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub media_type: Option<String>,

    /// Size in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub size: Option<u64>,
}

impl RemoteFile {
    /// JSON-API resource type
    pub const TYPE: &'static str = "file";
}

/// A term of an ontology such as SBO or KiSAO.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Builder, Default, PartialEq)]
pub struct OntologyTerm {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub ontology: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub iri: Option<String>,
}

impl SortKey for OntologyTerm {
    type Key = (
        Option<String>,
        Option<String>,
        Option<String>,
        Option<String>,
        Option<String>,
    );

    fn sort_key(&self) -> Self::Key {
        (
            self.ontology.clone(),
            self.id.clone(),
            self.name.clone(),
            self.description.clone(),
            self.iri.clone(),
        )
    }
}

/// A taxon of the NCBI taxonomy.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Builder, Default, PartialEq)]
pub struct Taxon {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub id: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub name: Option<String>,
}

/// A user of the platform.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Builder, Default, PartialEq)]
pub struct User {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub id: Option<String>,
}

impl User {
    /// JSON-API resource type
    pub const TYPE: &'static str = "user";
}

/// License under which a resource is shared.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum License {
    #[serde(rename = "CC0")]
    Cc0,
    #[serde(rename = "CC BY")]
    CcBy,
    #[serde(rename = "CC BY-SA")]
    CcBySa,
    #[serde(rename = "CC BY-NC")]
    CcByNc,
    #[serde(rename = "CC BY-NC-SA")]
    CcByNcSa,
    #[serde(rename = "MIT")]
    Mit,
    #[serde(rename = "Apache-2.0")]
    Apache2,
    #[serde(rename = "GPL-3.0")]
    Gpl3,
    #[serde(rename = "other")]
    Other,
}

impl License {
    /// Value used on the wire and in RDF annotations
    pub fn as_str(&self) -> &'static str {
        match self {
            License::Cc0 => "CC0",
            License::CcBy => "CC BY",
            License::CcBySa => "CC BY-SA",
            License::CcByNc => "CC BY-NC",
            License::CcByNcSa => "CC BY-NC-SA",
            License::Mit => "MIT",
            License::Apache2 => "Apache-2.0",
            License::Gpl3 => "GPL-3.0",
            License::Other => "other",
        }
    }

    /// Looks a license up by its wire value
    pub fn from_value(value: &str) -> Option<Self> {
        [
            License::Cc0,
            License::CcBy,
            License::CcBySa,
            License::CcByNc,
            License::CcByNcSa,
            License::Mit,
            License::Apache2,
            License::Gpl3,
            License::Other,
        ]
        .into_iter()
        .find(|license| license.as_str() == value)
    }
}

impl fmt::Display for License {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Data type of a parameter or variable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Boolean,
    Integer,
    Float,
    String,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Boolean => "boolean",
            ValueType::Integer => "integer",
            ValueType::Float => "float",
            ValueType::String => "string",
        };
        f.write_str(name)
    }
}

/// Value of a parameter, or a bound of its recommended range.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(untagged)]
pub enum ParameterValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

/// Totally ordered projection of a [`ParameterValue`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum ParameterValueKey {
    Boolean(bool),
    Integer(i64),
    Float(OrderedFloat<f64>),
    String(String),
}

impl ParameterValue {
    /// Parses a value stored as text, e.g. in a SED-ML attribute.
    ///
    /// With a declared type the text is parsed as that type; otherwise the
    /// narrowest of boolean, integer and float that accepts it is used, and
    /// anything else is kept as a string.
    pub fn parse(text: &str, value_type: Option<ValueType>) -> Self {
        let text = text.trim();
        match value_type {
            Some(ValueType::Boolean) => match text {
                "true" | "1" => ParameterValue::Boolean(true),
                "false" | "0" => ParameterValue::Boolean(false),
                _ => ParameterValue::String(text.to_string()),
            },
            Some(ValueType::Integer) => text
                .parse()
                .map(ParameterValue::Integer)
                .unwrap_or_else(|_| ParameterValue::String(text.to_string())),
            Some(ValueType::Float) => text
                .parse()
                .map(ParameterValue::Float)
                .unwrap_or_else(|_| ParameterValue::String(text.to_string())),
            Some(ValueType::String) => ParameterValue::String(text.to_string()),
            None => {
                if text == "true" || text == "false" {
                    ParameterValue::Boolean(text == "true")
                } else if let Ok(value) = text.parse::<i64>() {
                    ParameterValue::Integer(value)
                } else if let Ok(value) = text.parse::<f64>() {
                    ParameterValue::Float(value)
                } else {
                    ParameterValue::String(text.to_string())
                }
            }
        }
    }

    /// Numeric value, if any
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParameterValue::Integer(value) => Some(*value as f64),
            ParameterValue::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn sort_key(&self) -> ParameterValueKey {
        match self {
            ParameterValue::Boolean(value) => ParameterValueKey::Boolean(*value),
            ParameterValue::Integer(value) => ParameterValueKey::Integer(*value),
            ParameterValue::Float(value) => ParameterValueKey::Float(OrderedFloat(*value)),
            ParameterValue::String(value) => ParameterValueKey::String(value.clone()),
        }
    }
}

impl fmt::Display for ParameterValue {
    /// Floats keep a decimal point or exponent so that parsing the text
    /// yields a float again.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Boolean(value) => write!(f, "{value}"),
            ParameterValue::Integer(value) => write!(f, "{value}"),
            ParameterValue::Float(value) => write!(f, "{value:?}"),
            ParameterValue::String(value) => f.write_str(value),
        }
    }
}

impl From<f64> for ParameterValue {
    fn from(value: f64) -> Self {
        ParameterValue::Float(value)
    }
}

impl From<i64> for ParameterValue {
    fn from(value: i64) -> Self {
        ParameterValue::Integer(value)
    }
}

impl From<bool> for ParameterValue {
    fn from(value: bool) -> Self {
        ParameterValue::Boolean(value)
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        ParameterValue::String(value.to_string())
    }
}

/// Sort key of an optional recommended range
pub(crate) fn range_key(range: &Option<Vec<ParameterValue>>) -> Option<Vec<ParameterValueKey>> {
    range
        .as_ref()
        .map(|range| range.iter().map(ParameterValue::sort_key).collect())
}

/// Metadata attached to primary resources such as simulators.
///
/// `owner`, `image` and `parent` travel as JSON-API relationships rather
/// than attributes, so they are skipped when the metadata is serialized.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Builder, Default)]
#[serde(rename_all = "camelCase")]
pub struct PrimaryResourceMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub name: Option<String>,

    #[serde(skip)]
    #[builder(default, setter(into))]
    pub image: Option<RemoteFile>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[builder(default, setter(into, each(name = "to_tags")))]
    pub tags: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[builder(default, setter(into, each(name = "to_authors")))]
    pub authors: Vec<Person>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[builder(default, setter(into, each(name = "to_references")))]
    pub references: Vec<JournalReference>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub license: Option<License>,

    #[serde(skip)]
    #[builder(default, setter(into))]
    pub owner: Option<User>,

    /// Resource this one was derived from
    #[serde(skip)]
    #[builder(default, setter(into))]
    #[schemars(skip)]
    pub parent: Option<Box<crate::data_model::simulator::Simulator>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub created: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub updated: Option<String>,
}

impl PartialEq for PrimaryResourceMetadata {
    fn eq(&self, other: &Self) -> bool {
        use crate::data_model::record::{sorted_eq, sorted_strings_eq};

        self.name == other.name
            && self.image == other.image
            && self.description == other.description
            && sorted_strings_eq(&self.tags, &other.tags)
            && sorted_eq(&self.authors, &other.authors)
            && sorted_eq(&self.references, &other.references)
            && self.license == other.license
            && self.owner == other.owner
            && self.parent == other.parent
            && self.created == other.created
            && self.updated == other.updated
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::data_model::record::{JsonRecord, RecordError};

    #[test]
    fn test_parameter_value_json_variants() {
        let values: Vec<ParameterValue> =
            serde_json::from_value(json!([true, 3, 2.5, 1.0, "fast"])).unwrap();
        assert_eq!(
            values,
            vec![
                ParameterValue::Boolean(true),
                ParameterValue::Integer(3),
                ParameterValue::Float(2.5),
                ParameterValue::Float(1.0),
                ParameterValue::String("fast".to_string()),
            ]
        );
    }

    #[test]
    fn test_parameter_value_parse_and_display() {
        assert_eq!(ParameterValue::parse("10", None), ParameterValue::Integer(10));
        assert_eq!(ParameterValue::parse("1e-8", None), ParameterValue::Float(1e-8));
        assert_eq!(ParameterValue::parse("false", None), ParameterValue::Boolean(false));
        assert_eq!(
            ParameterValue::parse("CVODE", None),
            ParameterValue::String("CVODE".to_string())
        );
        assert_eq!(
            ParameterValue::parse("10", Some(ValueType::Float)),
            ParameterValue::Float(10.0)
        );

        let value = ParameterValue::Float(10.0);
        assert_eq!(value.to_string(), "10.0");
        assert_eq!(ParameterValue::parse(&value.to_string(), None), value);
    }

    #[test]
    fn test_unknown_license_is_rejected() {
        let result = Option::<License>::from_json(&json!("WTFPL"));
        assert!(matches!(result, Err(RecordError::Validation(_))));

        let license = License::from_json(&json!("CC BY-SA")).unwrap();
        assert_eq!(license, License::CcBySa);
        assert_eq!(License::from_value("CC0"), Some(License::Cc0));
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        assert!(ValueType::from_json(&json!("complex")).is_err());
        assert_eq!(ValueType::from_json(&json!("integer")).unwrap(), ValueType::Integer);
    }

    #[test]
    fn test_person_from_full_name() {
        assert_eq!(
            Person::from_full_name("S J Edelstein"),
            Person {
                first_name: Some("S".to_string()),
                middle_name: Some("J".to_string()),
                last_name: Some("Edelstein".to_string()),
            }
        );
        assert_eq!(
            Person::from_full_name("Changeux").last_name.as_deref(),
            Some("Changeux")
        );
    }

    #[test]
    fn test_format_builder_and_json() {
        let format = FormatBuilder::default()
            .id("SBML".to_string())
            .version("L3V2".to_string())
            .edam_id("format_2585".to_string())
            .build()
            .unwrap();

        let value = format.to_json().unwrap();
        assert_eq!(
            value,
            json!({"id": "SBML", "version": "L3V2", "edamId": "format_2585"})
        );
        assert_eq!(Format::from_json(&value).unwrap(), format);
    }
}
