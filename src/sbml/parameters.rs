//! Adjustable parameters of SBML models.
//!
//! Parameters are collected from global parameters, local parameters of
//! kinetic laws, compartment sizes, initial species amounts and
//! concentrations, constant initial assignments and assignment rules,
//! flux objective coefficients and initial levels of qualitative species.
//! Components whose values are computed by an assignment rule or an initial
//! assignment are dropped at the end.

use indexmap::IndexMap;

use crate::data_model::common::{ParameterValue, ValueType};
use crate::data_model::model::Parameter;
use crate::model_io::error::ModelIoError;
use crate::model_io::reader::{recommended_range, UnitsMap};
use crate::sbml::document::{non_empty, parse_number, SbmlDocument};
use crate::sbml::units::{
    compartment_units, component_units, ratio, resolve_unit_id, species_substance_units,
};
use crate::xml::XmlElement;

/// Reads the parameters of a model, in document order
pub fn read_parameters(
    document: &SbmlDocument,
    units: &UnitsMap,
) -> Result<Vec<Parameter>, ModelIoError> {
    let mut parameters: IndexMap<String, Parameter> = IndexMap::new();

    for element in document.core_list("listOfParameters", "parameter") {
        let parameter = global_parameter(document, element, units)?;
        parameters.insert(element_id(document, element, "parameter")?.to_string(), parameter);
    }

    for reaction in document.core_list("listOfReactions", "reaction") {
        read_local_parameters(document, reaction, units, &mut parameters)?;
    }

    for compartment in document.core_list("listOfCompartments", "compartment") {
        if let Some((key, parameter)) = compartment_size(document, compartment, units)? {
            parameters.insert(key, parameter);
        }
    }

    let mut last_species = None;
    for species in document.core_list("listOfSpecies", "species") {
        if let Some((key, parameter)) = initial_species_value(document, species, units)? {
            last_species = Some(key.clone());
            parameters.insert(key, parameter);
        }
    }

    for assignment in document.core_list("listOfInitialAssignments", "initialAssignment") {
        if let Some((key, parameter)) = initial_assignment(document, assignment, units) {
            parameters.insert(key, parameter);
        }
    }

    for rule in document.core_list("listOfRules", "assignmentRule") {
        if let Some((key, parameter)) = assignment_rule(document, rule, units) {
            parameters.insert(key, parameter);
        }
    }

    if document.uses_package("fbc") {
        read_flux_objective_coefficients(document, last_species.as_deref(), &mut parameters)?;
    }

    if document.uses_package("qual") {
        for species in document.package_items(document.model(), "qual", "listOfQualitativeSpecies", "qualitativeSpecies") {
            let (key, parameter) = initial_level(document, species)?;
            parameters.insert(key, parameter);
        }
    }

    for rule in document.core_list("listOfRules", "assignmentRule") {
        if let Some(variable) = rule.attr("variable") {
            parameters.shift_remove(variable);
        }
    }
    for assignment in document.core_list("listOfInitialAssignments", "initialAssignment") {
        if let Some(symbol) = assignment.attr("symbol") {
            parameters.shift_remove(symbol);
        }
    }

    Ok(parameters.into_values().collect())
}

fn element_id<'a>(document: &SbmlDocument, element: &'a XmlElement, kind: &str) -> Result<&'a str, ModelIoError> {
    non_empty(element.attr("id")).ok_or_else(|| ModelIoError::MissingId {
        path: document.source(),
        element: kind.to_string(),
    })
}

/// A numeric parameter with its recommended range
fn float_parameter(value: Option<f64>) -> Parameter {
    Parameter {
        value_type: Some(ValueType::Float),
        value: value.map(ParameterValue::Float),
        recommended_range: value.map(recommended_range),
        ..Default::default()
    }
}

fn global_parameter(
    document: &SbmlDocument,
    element: &XmlElement,
    units: &UnitsMap,
) -> Result<Parameter, ModelIoError> {
    let id = element_id(document, element, "parameter")?;
    Ok(Parameter {
        target: Some(format!(
            "/sbml:sbml/sbml:model/sbml:listOfParameters/sbml:parameter[@id='{id}']/@value"
        )),
        group: Some("Other global parameters".to_string()),
        id: Some(id.to_string()),
        name: Some(non_empty(element.attr("name")).unwrap_or(id).to_string()),
        units: non_empty(element.attr("units"))
            .and_then(|unit_id| resolve_unit_id(unit_id, units, document.level())),
        ..float_parameter(parse_number(element.attr("value")))
    })
}

fn read_local_parameters(
    document: &SbmlDocument,
    reaction: &XmlElement,
    units: &UnitsMap,
    parameters: &mut IndexMap<String, Parameter>,
) -> Result<(), ModelIoError> {
    let Some(kinetic_law) = reaction.elements().find(|element| element.name == "kineticLaw") else {
        return Ok(());
    };

    let (list, item) = if document.level() >= 3 {
        ("listOfLocalParameters", "localParameter")
    } else {
        ("listOfParameters", "parameter")
    };
    let locals = document.core_items(kinetic_law, list, item);
    if locals.is_empty() {
        return Ok(());
    }

    let reaction_id = element_id(document, reaction, "reaction")?;
    let reaction_label = non_empty(reaction.attr("name")).unwrap_or(reaction_id);
    let reaction_prefix = reaction.prefix.as_deref().unwrap_or("sbml");

    for local in locals {
        let id = element_id(document, local, item)?;
        let name = non_empty(local.attr("name")).unwrap_or(id);

        let parameter = Parameter {
            target: Some(format!(
                "/sbml:sbml/sbml:model/sbml:listOfReactions/{reaction_prefix}:{}[@id='{reaction_id}']\
                 /sbml:kineticLaw/sbml:{list}/sbml:{item}[@id='{id}']/@value",
                reaction.name
            )),
            group: Some(format!("{reaction_label} rate constants")),
            id: Some(format!("{reaction_id}/{id}")),
            name: Some(format!("{reaction_label}: {name}")),
            units: non_empty(local.attr("units"))
                .and_then(|unit_id| resolve_unit_id(unit_id, units, document.level())),
            ..float_parameter(parse_number(local.attr("value")))
        };
        parameters.insert(format!("{reaction_id}/{id}"), parameter);
    }

    Ok(())
}

fn compartment_size(
    document: &SbmlDocument,
    compartment: &XmlElement,
    units: &UnitsMap,
) -> Result<Option<(String, Parameter)>, ModelIoError> {
    if document.package_attr(compartment, "multi", "isType") == Some("true") && document.uses_package("multi") {
        return Ok(None);
    }

    // Level 1 names the size `volume`
    let size_attribute = if document.level() == 1 { "volume" } else { "size" };
    let Some(size) = parse_number::<f64>(compartment.attr(size_attribute)) else {
        return Ok(None);
    };

    let id = element_id(document, compartment, "compartment")?;
    let name = non_empty(compartment.attr("name")).unwrap_or(id);

    let parameter = Parameter {
        target: Some(format!(
            "/sbml:sbml/sbml:model/sbml:listOfCompartments/sbml:compartment[@id='{id}']/@{size_attribute}"
        )),
        group: Some("Initial compartment sizes".to_string()),
        id: Some(format!("init_size_{id}")),
        name: Some(format!("Initial size of {name}")),
        units: compartment_units(document, compartment, units),
        ..float_parameter(Some(size))
    };
    Ok(Some((id.to_string(), parameter)))
}

fn initial_species_value(
    document: &SbmlDocument,
    species: &XmlElement,
    units: &UnitsMap,
) -> Result<Option<(String, Parameter)>, ModelIoError> {
    let (kind, value) = match (
        parse_number::<f64>(species.attr("initialAmount")),
        parse_number::<f64>(species.attr("initialConcentration")),
    ) {
        (Some(amount), _) => ("Amount", amount),
        (None, Some(concentration)) => ("Concentration", concentration),
        (None, None) => return Ok(None),
    };

    let id = element_id(document, species, "species")?;
    let name = non_empty(species.attr("name")).unwrap_or(id);

    let substance_id = species_substance_units(document, species);
    let substance = match substance_id.and_then(|unit_id| resolve_unit_id(unit_id, units, document.level())) {
        Some(substance) => Some(substance),
        None => {
            log::error!("{}: species {} does not have valid units", document.source(), id);
            substance_id.map(str::to_string)
        }
    };

    let species_units = if kind == "Amount" {
        substance
    } else {
        let size = species
            .attr("compartment")
            .and_then(|compartment| document.compartment(compartment))
            .and_then(|compartment| compartment_units(document, compartment, units));
        match (substance, size) {
            (Some(substance), Some(size)) => Some(ratio(&substance, &size)),
            (substance, _) => substance,
        }
    };

    let lower = kind.to_lowercase();
    let parameter = Parameter {
        target: Some(format!(
            "/sbml:sbml/sbml:model/sbml:listOfSpecies/sbml:species[@id='{id}']/@initial{kind}"
        )),
        group: Some("Initial species amounts/concentrations".to_string()),
        id: Some(format!("init_{lower}_{id}")),
        name: Some(format!("Initial {lower} of {name}")),
        units: species_units,
        ..float_parameter(Some(value))
    };
    Ok(Some((id.to_string(), parameter)))
}

/// A parameter for a constant value set by an initial assignment or an
/// assignment rule
fn constant_parameter(value: ParameterValue) -> Parameter {
    let (value_type, range) = match value {
        ParameterValue::Integer(integer) => (ValueType::Integer, recommended_range(integer as f64)),
        _ => (
            ValueType::Float,
            recommended_range(value.as_f64().unwrap_or_default()),
        ),
    };

    Parameter {
        value_type: Some(value_type),
        value: Some(value),
        recommended_range: Some(range),
        ..Default::default()
    }
}

fn initial_assignment(
    document: &SbmlDocument,
    assignment: &XmlElement,
    units: &UnitsMap,
) -> Option<(String, Parameter)> {
    let symbol = assignment.attr("symbol")?;
    let value = document.constant_value(assignment)?;
    let component = document.component(symbol);

    let key = format!("init_assignment_{symbol}");
    let parameter = Parameter {
        target: Some(format!(
            "/sbml:sbml/sbml:model/sbml:listOfInitialAssignments\
             /sbml:initialAssignment[@symbol='{symbol}']/mathml:math/mathml:cn/text"
        )),
        group: Some("Initial assignments".to_string()),
        id: Some(key.clone()),
        name: Some(format!(
            "Initial assignment of {}",
            component.and_then(|component| component.name()).unwrap_or(symbol)
        )),
        units: component.and_then(|component| component_units(document, component, units)),
        ..constant_parameter(value)
    };
    Some((key, parameter))
}

fn assignment_rule(
    document: &SbmlDocument,
    rule: &XmlElement,
    units: &UnitsMap,
) -> Option<(String, Parameter)> {
    let variable = rule.attr("variable")?;
    let value = document.constant_value(rule)?;
    let component = document.component(variable);

    let key = format!("assignment_{variable}");
    let parameter = Parameter {
        target: Some(format!(
            "/sbml:sbml/sbml:model/sbml:listOfRules\
             /sbml:assignmentRule[@variable='{variable}']/mathml:math/mathml:cn/text"
        )),
        group: Some("Assignments".to_string()),
        id: Some(key.clone()),
        name: Some(format!(
            "Assignment of {}",
            component.and_then(|component| component.name()).unwrap_or(variable)
        )),
        units: component.and_then(|component| component_units(document, component, units)),
        ..constant_parameter(value)
    };
    Some((key, parameter))
}

/// The active objective of a flux balance model
pub(crate) fn active_objective(document: &SbmlDocument) -> Result<&XmlElement, ModelIoError> {
    let model = document.model();
    let active = document
        .package_list(model, "fbc", "listOfObjectives")
        .and_then(|list| document.package_attr(list, "fbc", "activeObjective"));

    document
        .package_items(model, "fbc", "listOfObjectives", "objective")
        .into_iter()
        .find(|objective| active.is_some() && document.package_attr(objective, "fbc", "id") == active)
        .ok_or_else(|| ModelIoError::MissingActiveObjective(document.source()))
}

fn read_flux_objective_coefficients(
    document: &SbmlDocument,
    last_species: Option<&str>,
    parameters: &mut IndexMap<String, Parameter>,
) -> Result<(), ModelIoError> {
    let objective = active_objective(document)?;
    let objective_id = non_empty(document.package_attr(objective, "fbc", "id")).ok_or_else(|| {
        ModelIoError::MissingId {
            path: document.source(),
            element: "objective".to_string(),
        }
    })?;
    let objective_name = non_empty(document.package_attr(objective, "fbc", "name")).unwrap_or(objective_id);

    for flux_objective in document.package_items(objective, "fbc", "listOfFluxObjectives", "fluxObjective") {
        let reaction_id = document.package_attr(flux_objective, "fbc", "reaction").unwrap_or_default();
        let reaction_name = document
            .reaction(reaction_id)
            .and_then(|reaction| non_empty(reaction.attr("name")))
            .unwrap_or(reaction_id);
        let coefficient = parse_number::<f64>(document.package_attr(flux_objective, "fbc", "coefficient"));

        let parameter = Parameter {
            target: Some(format!(
                "/sbml:sbml/sbml:model/fbc:listOfObjectives/fbc:objective[@fbc:id='{objective_id}']\
                 /fbc:listOfFluxObjectives/fbc:fluxObjective[@fbc:reaction='{reaction_id}']/@fbc:coefficient"
            )),
            group: Some("Flux objective coefficients".to_string()),
            id: Some(format!("{objective_id}/{reaction_id}")),
            name: Some(format!("Coefficient of {objective_name} of {reaction_name}")),
            units: Some("dimensionless".to_string()),
            ..float_parameter(coefficient)
        };

        // Coefficients are keyed by the last species with an initial value,
        // so each one replaces that species' entry and the previous coefficient.
        let key = last_species
            .map(str::to_string)
            .unwrap_or_else(|| format!("{objective_id}/{reaction_id}"));
        parameters.insert(key, parameter);
    }

    Ok(())
}

fn initial_level(document: &SbmlDocument, species: &XmlElement) -> Result<(String, Parameter), ModelIoError> {
    let id = non_empty(document.package_attr(species, "qual", "id")).ok_or_else(|| ModelIoError::MissingId {
        path: document.source(),
        element: "qualitativeSpecies".to_string(),
    })?;
    let name = non_empty(document.package_attr(species, "qual", "name")).unwrap_or(id);

    let initial_level = parse_number::<i64>(document.package_attr(species, "qual", "initialLevel")).unwrap_or(0);
    let max_level = parse_number::<i64>(document.package_attr(species, "qual", "maxLevel"))
        .unwrap_or_else(|| initial_level.max(1));

    let parameter = Parameter {
        target: Some(format!(
            "/sbml:sbml/sbml:model/qual:listOfQualitativeSpecies\
             /qual:qualitativeSpecies[@qual:id='{id}']/@qual:initialLevel"
        )),
        group: Some("Initial species levels".to_string()),
        id: Some(format!("init_level_{id}")),
        name: Some(format!("Initial level of {name}")),
        value_type: Some(ValueType::Integer),
        value: Some(ParameterValue::Integer(initial_level)),
        recommended_range: Some(vec![
            ParameterValue::Integer(0),
            ParameterValue::Integer(max_level),
        ]),
        units: Some("dimensionless".to_string()),
        ..Default::default()
    };
    Ok((id.to_string(), parameter))
}
