//! SBML units.
//!
//! Unit definitions are read from `listOfUnitDefinitions` and rendered as
//! compact human-readable strings such as `(0.001 mole) / litre` or
//! `metre^2`. Ids which are not defined by the model resolve to the SBML
//! base units or, for Level 1 and 2 documents, to the built-in units
//! `substance`, `volume`, `area`, `length` and `time`.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::model_io::reader::UnitsMap;
use crate::sbml::document::{non_empty, parse_number, SbmlComponent, SbmlDocument};
use crate::xml::XmlElement;

/// Errors raised while reading a unit definition
#[derive(Debug, Error, PartialEq)]
pub enum UnitError {
    #[error("Invalid unit kind: {0}")]
    InvalidUnitKind(String),

    #[error("Invalid value '{value}' for unit attribute '{attribute}'")]
    InvalidAttribute { attribute: String, value: String },
}

/// The SBML base units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitKind {
    Ampere,
    Avogadro,
    Becquerel,
    Candela,
    Celsius,
    Coulomb,
    Dimensionless,
    Farad,
    Gram,
    Gray,
    Henry,
    Hertz,
    Item,
    Joule,
    Katal,
    Kelvin,
    Kilogram,
    Litre,
    Lumen,
    Lux,
    Metre,
    Mole,
    Newton,
    Ohm,
    Pascal,
    Radian,
    Second,
    Siemens,
    Sievert,
    Steradian,
    Tesla,
    Volt,
    Watt,
    Weber,
}

impl UnitKind {
    /// Canonical SBML spelling of the unit
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitKind::Ampere => "ampere",
            UnitKind::Avogadro => "avogadro",
            UnitKind::Becquerel => "becquerel",
            UnitKind::Candela => "candela",
            UnitKind::Celsius => "celsius",
            UnitKind::Coulomb => "coulomb",
            UnitKind::Dimensionless => "dimensionless",
            UnitKind::Farad => "farad",
            UnitKind::Gram => "gram",
            UnitKind::Gray => "gray",
            UnitKind::Henry => "henry",
            UnitKind::Hertz => "hertz",
            UnitKind::Item => "item",
            UnitKind::Joule => "joule",
            UnitKind::Katal => "katal",
            UnitKind::Kelvin => "kelvin",
            UnitKind::Kilogram => "kilogram",
            UnitKind::Litre => "litre",
            UnitKind::Lumen => "lumen",
            UnitKind::Lux => "lux",
            UnitKind::Metre => "metre",
            UnitKind::Mole => "mole",
            UnitKind::Newton => "newton",
            UnitKind::Ohm => "ohm",
            UnitKind::Pascal => "pascal",
            UnitKind::Radian => "radian",
            UnitKind::Second => "second",
            UnitKind::Siemens => "siemens",
            UnitKind::Sievert => "sievert",
            UnitKind::Steradian => "steradian",
            UnitKind::Tesla => "tesla",
            UnitKind::Volt => "volt",
            UnitKind::Watt => "watt",
            UnitKind::Weber => "weber",
        }
    }
}

/// Parses SBML unit kinds. Both `liter` and `litre` map to [`UnitKind::Litre`],
/// and both `meter` and `metre` map to [`UnitKind::Metre`].
impl FromStr for UnitKind {
    type Err = UnitError;

    fn from_str(kind: &str) -> Result<Self, Self::Err> {
        let unit_kind = match kind {
            "ampere" => UnitKind::Ampere,
            "avogadro" => UnitKind::Avogadro,
            "becquerel" => UnitKind::Becquerel,
            "candela" => UnitKind::Candela,
            "celsius" | "Celsius" => UnitKind::Celsius,
            "coulomb" => UnitKind::Coulomb,
            "dimensionless" => UnitKind::Dimensionless,
            "farad" => UnitKind::Farad,
            "gram" => UnitKind::Gram,
            "gray" => UnitKind::Gray,
            "henry" => UnitKind::Henry,
            "hertz" => UnitKind::Hertz,
            "item" => UnitKind::Item,
            "joule" => UnitKind::Joule,
            "katal" => UnitKind::Katal,
            "kelvin" => UnitKind::Kelvin,
            "kilogram" => UnitKind::Kilogram,
            "liter" | "litre" => UnitKind::Litre,
            "lumen" => UnitKind::Lumen,
            "lux" => UnitKind::Lux,
            "meter" | "metre" => UnitKind::Metre,
            "mole" => UnitKind::Mole,
            "newton" => UnitKind::Newton,
            "ohm" => UnitKind::Ohm,
            "pascal" => UnitKind::Pascal,
            "radian" => UnitKind::Radian,
            "second" => UnitKind::Second,
            "siemens" => UnitKind::Siemens,
            "sievert" => UnitKind::Sievert,
            "steradian" => UnitKind::Steradian,
            "tesla" => UnitKind::Tesla,
            "volt" => UnitKind::Volt,
            "watt" => UnitKind::Watt,
            "weber" => UnitKind::Weber,
            _ => return Err(UnitError::InvalidUnitKind(kind.to_string())),
        };

        Ok(unit_kind)
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One factor of a unit definition: `(multiplier * 10^scale * kind)^exponent`
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    pub kind: UnitKind,
    pub exponent: f64,
    pub scale: i32,
    pub multiplier: f64,
}

impl Unit {
    pub fn new(kind: UnitKind) -> Self {
        Unit {
            kind,
            exponent: 1.0,
            scale: 0,
            multiplier: 1.0,
        }
    }

    pub fn with_exponent(mut self, exponent: f64) -> Self {
        self.exponent = exponent;
        self
    }

    pub fn with_scale(mut self, scale: i32) -> Self {
        self.scale = scale;
        self
    }

    /// Reads a `unit` element
    pub fn from_element(element: &XmlElement) -> Result<Self, UnitError> {
        let kind = element
            .attr("kind")
            .ok_or_else(|| UnitError::InvalidUnitKind(String::new()))?
            .parse::<UnitKind>()?;

        Ok(Unit {
            kind,
            exponent: numeric_attr(element, "exponent", 1.0)?,
            scale: numeric_attr(element, "scale", 0)?,
            multiplier: numeric_attr(element, "multiplier", 1.0)?,
        })
    }

    fn factor(&self) -> f64 {
        self.multiplier * 10f64.powi(self.scale)
    }

    /// The unit with its factor but without its exponent, e.g. `(0.001 mole)`
    fn base(&self) -> String {
        let factor = self.factor();
        if factor == 1.0 {
            self.kind.to_string()
        } else {
            format!("({} {})", factor, self.kind)
        }
    }
}

fn numeric_attr<T: FromStr>(element: &XmlElement, name: &str, default: T) -> Result<T, UnitError> {
    match element.attr(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| UnitError::InvalidAttribute {
                attribute: name.to_string(),
                value: value.to_string(),
            }),
    }
}

/// A named product of units
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UnitDefinition {
    pub id: Option<String>,
    pub units: Vec<Unit>,
}

impl UnitDefinition {
    /// Reads a `unitDefinition` element
    pub fn from_element(element: &XmlElement) -> Result<Self, UnitError> {
        let units = element
            .child("listOfUnits")
            .map(|list| {
                list.children_named("unit")
                    .map(Unit::from_element)
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?
            .unwrap_or_default();

        Ok(UnitDefinition {
            id: element.attr("id").map(str::to_string),
            units,
        })
    }

    /// Renders the definition, e.g. `(0.001 mole) / litre`.
    ///
    /// Returns `None` for definitions without units.
    pub fn format(&self) -> Option<String> {
        if self.units.is_empty() {
            return None;
        }

        let mut numerator = Vec::new();
        let mut denominator = Vec::new();
        for unit in &self.units {
            if unit.kind == UnitKind::Dimensionless && unit.factor() == 1.0 {
                continue;
            }

            let (terms, exponent) = if unit.exponent < 0.0 {
                (&mut denominator, -unit.exponent)
            } else {
                (&mut numerator, unit.exponent)
            };
            if exponent == 0.0 {
                continue;
            }

            let base = unit.base();
            if exponent == 1.0 {
                terms.push(base);
            } else {
                terms.push(format!("{}^{}", base, format_exponent(exponent)));
            }
        }

        let numerator = match numerator.len() {
            0 if denominator.is_empty() => return Some("dimensionless".to_string()),
            0 => "1".to_string(),
            _ => numerator.join(" * "),
        };

        if denominator.is_empty() {
            Some(numerator)
        } else {
            Some(format!("{} / {}", numerator, denominator.join(" / ")))
        }
    }
}

fn format_exponent(exponent: f64) -> String {
    if exponent.fract() == 0.0 {
        format!("{}", exponent as i64)
    } else {
        format!("{}", exponent)
    }
}

/// Reads all unit definitions of a model into a table of formatted units.
///
/// Definitions which cannot be read or rendered are logged and left out.
pub fn read_unit_definitions(list: Option<&XmlElement>, source: &str) -> UnitsMap {
    let mut units = UnitsMap::new();
    let Some(list) = list else {
        return units;
    };

    for element in list.children_named("unitDefinition") {
        let Some(id) = element.attr("id") else {
            log::error!("{}: unit definition does not have an id", source);
            continue;
        };

        match UnitDefinition::from_element(element).map(|definition| definition.format()) {
            Ok(Some(formatted)) => {
                units.insert(id.to_string(), formatted);
            }
            Ok(None) => log::error!("{}: units of '{}' could not be determined", source, id),
            Err(err) => log::error!("{}: unit definition '{}' is invalid: {}", source, id, err),
        }
    }

    units
}

/// Resolves a unit id against the model's definitions, the base units and,
/// before Level 3, the built-in units.
pub fn resolve_unit_id(id: &str, units: &UnitsMap, level: u32) -> Option<String> {
    if let Some(formatted) = units.get(id) {
        return Some(formatted.clone());
    }

    if let Ok(kind) = id.parse::<UnitKind>() {
        return Some(kind.to_string());
    }

    if level < 3 {
        return builtin_unit(id);
    }

    None
}

fn builtin_unit(id: &str) -> Option<String> {
    let definition = match id {
        "substance" => Unit::new(UnitKind::Mole),
        "volume" => Unit::new(UnitKind::Litre),
        "area" => Unit::new(UnitKind::Metre).with_exponent(2.0),
        "length" => Unit::new(UnitKind::Metre),
        "time" => Unit::new(UnitKind::Second),
        _ => return None,
    };

    UnitDefinition {
        id: Some(id.to_string()),
        units: vec![definition],
    }
    .format()
}

/// Units of a model component, derived from its declared units and the
/// defaults of its model.
pub fn component_units(
    document: &SbmlDocument,
    component: SbmlComponent<'_>,
    units: &UnitsMap,
) -> Option<String> {
    match component {
        SbmlComponent::Parameter(parameter) => non_empty(parameter.attr("units"))
            .and_then(|id| resolve_unit_id(id, units, document.level())),
        SbmlComponent::Compartment(compartment) => compartment_units(document, compartment, units),
        SbmlComponent::Species(species) => species_units(document, species, units),
        SbmlComponent::SpeciesReference(_) => Some(UnitKind::Dimensionless.to_string()),
        SbmlComponent::Reaction(_) => None,
    }
}

/// Units of the size of a compartment
pub fn compartment_units(
    document: &SbmlDocument,
    compartment: &XmlElement,
    units: &UnitsMap,
) -> Option<String> {
    if let Some(id) = non_empty(compartment.attr("units")) {
        return resolve_unit_id(id, units, document.level());
    }

    let dimensions = if document.level() < 3 {
        parse_number::<f64>(compartment.attr("spatialDimensions")).or(Some(3.0))
    } else {
        parse_number::<f64>(compartment.attr("spatialDimensions"))
    }?;

    if dimensions == 0.0 {
        return Some(UnitKind::Dimensionless.to_string());
    }

    let (model_attribute, builtin) = match dimensions as i64 {
        3 => ("volumeUnits", "volume"),
        2 => ("areaUnits", "area"),
        1 => ("lengthUnits", "length"),
        _ => return None,
    };

    if document.level() < 3 {
        resolve_unit_id(builtin, units, document.level())
    } else {
        document
            .model_attr(model_attribute)
            .and_then(|id| resolve_unit_id(id, units, document.level()))
    }
}

/// Id of the substance units of a species
pub fn species_substance_units<'a>(document: &'a SbmlDocument, species: &'a XmlElement) -> Option<&'a str> {
    non_empty(species.attr("substanceUnits"))
        .or_else(|| non_empty(species.attr("units")))
        .or_else(|| document.model_attr("substanceUnits"))
        .or_else(|| (document.level() < 3).then_some("substance"))
}

/// Units of the amount or concentration of a species
pub fn species_units(
    document: &SbmlDocument,
    species: &XmlElement,
    units: &UnitsMap,
) -> Option<String> {
    let substance = species_substance_units(document, species)
        .and_then(|id| resolve_unit_id(id, units, document.level()))?;

    if species.attr("hasOnlySubstanceUnits") == Some("true") {
        return Some(substance);
    }

    let compartment = species
        .attr("compartment")
        .and_then(|id| document.compartment(id))?;
    let size = compartment_units(document, compartment, units)?;
    if size == UnitKind::Dimensionless.as_str() {
        Some(substance)
    } else {
        Some(ratio(&substance, &size))
    }
}

/// Units of a ratio such as a concentration or a flux, e.g. `mole / litre`.
/// Compound operands are parenthesized.
pub fn ratio(numerator: &str, denominator: &str) -> String {
    format!(
        "{} / {}",
        parenthesize(numerator),
        parenthesize(denominator)
    )
}

fn parenthesize(units: &str) -> String {
    let is_single_factor =
        units.starts_with('(') && units.ends_with(')') && units.matches('(').count() == 1;
    if !units.contains(' ') || is_single_factor {
        units.to_string()
    } else {
        format!("({})", units)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    /// Tests that alternative spellings of units are normalized
    #[test]
    fn test_unit_kind_spellings() {
        assert_eq!("meter".parse::<UnitKind>().unwrap(), UnitKind::Metre);
        assert_eq!("metre".parse::<UnitKind>().unwrap(), UnitKind::Metre);
        assert_eq!("liter".parse::<UnitKind>().unwrap(), UnitKind::Litre);
        assert_eq!(
            "furlong".parse::<UnitKind>(),
            Err(UnitError::InvalidUnitKind("furlong".to_string()))
        );
    }

    #[test]
    fn test_format_millimolar() {
        let xml = r#"
            <unitDefinition id="mM">
              <listOfUnits>
                <unit kind="mole" exponent="1" scale="-3" multiplier="1"/>
                <unit kind="litre" exponent="-1" scale="0" multiplier="1"/>
              </listOfUnits>
            </unitDefinition>"#;
        let element = XmlElement::parse(xml).unwrap();
        let definition = UnitDefinition::from_element(&element).unwrap();

        assert_eq!(definition.id.as_deref(), Some("mM"));
        assert_eq!(
            definition.format().as_deref(),
            Some("(0.001 mole) / litre")
        );
    }

    #[test]
    fn test_format_exponents() {
        let definition = UnitDefinition {
            id: None,
            units: vec![
                Unit::new(UnitKind::Metre).with_exponent(2.0),
                Unit::new(UnitKind::Second).with_exponent(-1.0),
                Unit::new(UnitKind::Mole).with_exponent(-2.0),
            ],
        };
        assert_eq!(
            definition.format().as_deref(),
            Some("metre^2 / second / mole^2")
        );

        let per_second = UnitDefinition {
            id: None,
            units: vec![Unit::new(UnitKind::Second).with_exponent(-1.0)],
        };
        assert_eq!(per_second.format().as_deref(), Some("1 / second"));

        let dimensionless = UnitDefinition {
            id: None,
            units: vec![Unit::new(UnitKind::Dimensionless)],
        };
        assert_eq!(dimensionless.format().as_deref(), Some("dimensionless"));

        assert_eq!(UnitDefinition::default().format(), None);
    }

    #[test]
    fn test_resolve_builtin_units_by_level() {
        let units = UnitsMap::new();
        assert_eq!(resolve_unit_id("second", &units, 3).as_deref(), Some("second"));
        assert_eq!(resolve_unit_id("area", &units, 2).as_deref(), Some("metre^2"));
        assert_eq!(resolve_unit_id("substance", &units, 2).as_deref(), Some("mole"));
        assert_eq!(resolve_unit_id("substance", &units, 3), None);

        let mut units = UnitsMap::new();
        units.insert("substance".to_string(), "(0.001 mole)".to_string());
        assert_eq!(
            resolve_unit_id("substance", &units, 2).as_deref(),
            Some("(0.001 mole)")
        );
    }

    #[test]
    fn test_ratio_parenthesizes_compound_units() {
        assert_eq!(ratio("mole", "litre"), "mole / litre");
        assert_eq!(ratio("(0.001 mole)", "litre"), "(0.001 mole) / litre");
        assert_eq!(ratio("mole", "metre^2 * second"), "mole / (metre^2 * second)");
    }

    #[test]
    fn test_invalid_definitions_are_skipped() {
        let xml = r#"
            <listOfUnitDefinitions>
              <unitDefinition id="per_s">
                <listOfUnits><unit kind="second" exponent="-1"/></listOfUnits>
              </unitDefinition>
              <unitDefinition id="bad">
                <listOfUnits><unit kind="furlong"/></listOfUnits>
              </unitDefinition>
              <unitDefinition id="empty"/>
            </listOfUnitDefinitions>"#;
        let list = XmlElement::parse(xml).unwrap();
        let units = read_unit_definitions(Some(&list), "model.xml");

        assert_eq!(units.len(), 1);
        assert_eq!(units["per_s"], "1 / second");
    }
}
