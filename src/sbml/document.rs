//! Read-only view of an SBML document.
//!
//! [`SbmlDocument`] wraps the parsed XML tree and answers the questions the
//! reader stages ask: which Level and Version the document has, which
//! extension packages it declares, and where the core and package
//! components of the model are.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use regex::Regex;

use crate::data_model::common::ParameterValue;
use crate::model_io::error::ModelIoError;
use crate::xml::{XmlElement, XmlNode};

/// MathML namespace
pub const MATHML_NAMESPACE: &str = "http://www.w3.org/1998/Math/MathML";

/// Media type of SBML files
pub const SBML_MEDIA_TYPE: &str = "application/sbml+xml";

lazy_static! {
    static ref PACKAGE_NAMESPACE: Regex =
        Regex::new(r"^http://www\.sbml\.org/sbml/level3/version\d+/([a-z]+)/version\d+$")
            .expect("package namespace pattern is valid");
}

/// An SBML document whose root contains a model
#[derive(Debug, Clone)]
pub struct SbmlDocument {
    path: PathBuf,
    level: u32,
    version: u32,
    /// Extension packages keyed by name, with their namespace URI
    packages: BTreeMap<String, String>,
    /// The `sbml` element, without its model
    root: XmlElement,
    model: XmlElement,
}

/// A component of a model looked up by its id
#[derive(Debug, Clone, Copy)]
pub enum SbmlComponent<'a> {
    Parameter(&'a XmlElement),
    Compartment(&'a XmlElement),
    Species(&'a XmlElement),
    Reaction(&'a XmlElement),
    SpeciesReference(&'a XmlElement),
}

impl<'a> SbmlComponent<'a> {
    pub fn element(&self) -> &'a XmlElement {
        match self {
            SbmlComponent::Parameter(element)
            | SbmlComponent::Compartment(element)
            | SbmlComponent::Species(element)
            | SbmlComponent::Reaction(element)
            | SbmlComponent::SpeciesReference(element) => element,
        }
    }

    /// The name of the component, if it has a non-empty one
    pub fn name(&self) -> Option<&'a str> {
        non_empty(self.element().attr("name"))
    }
}

impl SbmlDocument {
    /// Reads and parses an SBML file
    pub fn from_file(path: &Path) -> Result<Self, ModelIoError> {
        if !path.is_file() {
            return Err(ModelIoError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::parse(&content, path)
    }

    /// Parses SBML text. `path` only names the document in messages.
    pub fn parse(content: &str, path: &Path) -> Result<Self, ModelIoError> {
        let invalid = |reason: String| ModelIoError::InvalidDocument {
            path: path.display().to_string(),
            reason,
        };

        let mut root = XmlElement::parse(content).map_err(|err| invalid(err.to_string()))?;
        if root.name != "sbml" {
            return Err(invalid(format!("root element is <{}>", root.name)));
        }

        let level = parse_number(root.attr("level")).ok_or_else(|| invalid("missing level".into()))?;
        let version =
            parse_number(root.attr("version")).ok_or_else(|| invalid("missing version".into()))?;

        let position = root
            .children
            .iter()
            .position(|child| matches!(child, XmlNode::Element(element) if element.name == "model"))
            .ok_or_else(|| invalid("document has no model".into()))?;
        let model = match root.children.remove(position) {
            XmlNode::Element(model) => model,
            XmlNode::Text(_) => return Err(invalid("document has no model".into())),
        };

        let packages = root
            .namespace_declarations()
            .chain(model.namespace_declarations())
            .filter_map(|(_, uri)| {
                PACKAGE_NAMESPACE
                    .captures(uri)
                    .map(|captures| (captures[1].to_string(), uri.to_string()))
            })
            .collect();

        Ok(SbmlDocument {
            path: path.to_path_buf(),
            level,
            version,
            packages,
            root,
            model,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name used in messages
    pub fn source(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn model(&self) -> &XmlElement {
        &self.model
    }

    /// Names of the extension packages declared by the document
    pub fn packages(&self) -> impl Iterator<Item = &str> {
        self.packages.keys().map(String::as_str)
    }

    pub fn uses_package(&self, package: &str) -> bool {
        self.packages.contains_key(package)
    }

    /// Whether the document defines or instantiates submodels
    pub fn uses_model_composition(&self) -> bool {
        let Some(namespace) = self.packages.get("comp") else {
            return false;
        };

        let has_items = |element: &XmlElement, list: &str| {
            element
                .child_ns(namespace, list)
                .is_some_and(|list| list.elements().next().is_some())
        };

        has_items(&self.root, "listOfModelDefinitions")
            || has_items(&self.root, "listOfExternalModelDefinitions")
            || has_items(&self.model, "listOfSubmodels")
    }

    /// Items of a core list of the model, e.g. `("listOfSpecies", "species")`
    pub fn core_list(&self, list: &str, item: &str) -> Vec<&XmlElement> {
        self.core_items(&self.model, list, item)
    }

    /// Items of a core list below any element of the model
    pub fn core_items<'a>(&self, parent: &'a XmlElement, list: &str, item: &str) -> Vec<&'a XmlElement> {
        let namespace = self.model.namespace.as_deref();
        parent
            .elements()
            .filter(|element| element.name == list && element.namespace.as_deref() == namespace)
            .flat_map(|list| list.elements())
            .filter(|element| element.name == item && element.namespace.as_deref() == namespace)
            .collect()
    }

    /// All elements of a core list, whatever their names (e.g. the rules)
    pub fn core_list_elements(&self, list: &str) -> Vec<&XmlElement> {
        let namespace = self.model.namespace.as_deref();
        self.model
            .elements()
            .filter(|element| element.name == list && element.namespace.as_deref() == namespace)
            .flat_map(|list| list.elements())
            .collect()
    }

    /// Items of a package list below `parent`, e.g. `fbc:listOfObjectives`
    pub fn package_items<'a>(
        &self,
        parent: &'a XmlElement,
        package: &str,
        list: &str,
        item: &str,
    ) -> Vec<&'a XmlElement> {
        let Some(namespace) = self.packages.get(package) else {
            return Vec::new();
        };

        let in_package = |element: &XmlElement, name: &str| {
            element.name == name && element.namespace.as_deref() == Some(namespace.as_str())
        };

        parent
            .elements()
            .filter(|element| in_package(*element, list))
            .flat_map(|list| list.elements())
            .filter(|element| in_package(*element, item))
            .collect()
    }

    /// The package list element below `parent`
    pub fn package_list<'a>(
        &self,
        parent: &'a XmlElement,
        package: &str,
        list: &str,
    ) -> Option<&'a XmlElement> {
        let namespace = self.packages.get(package)?;
        parent.child_ns(namespace, list)
    }

    /// A package attribute such as `fbc:id`. Unprefixed attributes are
    /// accepted as a fallback.
    pub fn package_attr<'a>(&self, element: &'a XmlElement, package: &str, name: &str) -> Option<&'a str> {
        self.packages
            .get(package)
            .and_then(|namespace| element.attr_ns(namespace, name))
            .or_else(|| element.attr(name))
    }

    /// A model attribute, e.g. `substanceUnits`
    pub fn model_attr(&self, name: &str) -> Option<&str> {
        non_empty(self.model.attr(name))
    }

    /// Finds a component of the model by its id
    pub fn component(&self, id: &str) -> Option<SbmlComponent<'_>> {
        let has_id = |element: &&XmlElement| element.attr("id") == Some(id);

        if let Some(parameter) = self.core_list("listOfParameters", "parameter").into_iter().find(has_id) {
            return Some(SbmlComponent::Parameter(parameter));
        }
        if let Some(compartment) = self
            .core_list("listOfCompartments", "compartment")
            .into_iter()
            .find(has_id)
        {
            return Some(SbmlComponent::Compartment(compartment));
        }
        if let Some(species) = self.core_list("listOfSpecies", "species").into_iter().find(has_id) {
            return Some(SbmlComponent::Species(species));
        }

        let reactions = self.core_list("listOfReactions", "reaction");
        if let Some(reaction) = reactions.iter().copied().find(has_id) {
            return Some(SbmlComponent::Reaction(reaction));
        }

        reactions
            .into_iter()
            .flat_map(|reaction| {
                let mut references = self.core_items(reaction, "listOfReactants", "speciesReference");
                references.extend(self.core_items(reaction, "listOfProducts", "speciesReference"));
                references
            })
            .find(has_id)
            .map(SbmlComponent::SpeciesReference)
    }

    pub fn compartment(&self, id: &str) -> Option<&XmlElement> {
        self.core_list("listOfCompartments", "compartment")
            .into_iter()
            .find(|compartment| compartment.attr("id") == Some(id))
    }

    pub fn reaction(&self, id: &str) -> Option<&XmlElement> {
        self.core_list("listOfReactions", "reaction")
            .into_iter()
            .find(|reaction| reaction.attr("id") == Some(id))
    }

    /// The `math` child of an element
    pub fn math<'a>(&self, element: &'a XmlElement) -> Option<&'a XmlElement> {
        element.child_ns(MATHML_NAMESPACE, "math").or_else(|| element.child("math"))
    }

    /// The value of a MathML expression that is a single number.
    ///
    /// Integer numbers are returned as integers. Real numbers, numbers
    /// without a type and e-notation numbers are returned as floats.
    /// Rationals and any other expression yield `None`.
    pub fn constant_value(&self, element: &XmlElement) -> Option<ParameterValue> {
        let math = self.math(element)?;
        let mut elements = math.elements();
        let number = elements.next()?;
        if elements.next().is_some() || number.name != "cn" {
            return None;
        }

        let parts: Vec<String> = number
            .children
            .iter()
            .filter_map(|child| match child {
                XmlNode::Text(text) => Some(text.trim().to_string()),
                XmlNode::Element(_) => None,
            })
            .filter(|text| !text.is_empty())
            .collect();

        match (number.attr("type").unwrap_or("real"), parts.as_slice()) {
            ("integer", [value]) => value.parse::<i64>().ok().map(ParameterValue::Integer),
            ("real", [value]) => value.parse::<f64>().ok().map(ParameterValue::Float),
            ("e-notation", [mantissa, exponent]) => {
                let mantissa = mantissa.parse::<f64>().ok()?;
                let exponent = exponent.parse::<i32>().ok()?;
                Some(ParameterValue::Float(mantissa * 10f64.powi(exponent)))
            }
            _ => None,
        }
    }
}

/// An attribute value, treating empty strings as absent
pub fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.is_empty())
}

/// Parses a numeric attribute
pub fn parse_number<T: std::str::FromStr>(value: Option<&str>) -> Option<T> {
    value.and_then(|value| value.trim().parse::<T>().ok())
}
