//! Observable variables of SBML models.

use crate::data_model::common::ValueType;
use crate::data_model::model::Variable;
use crate::model_io::error::ModelIoError;
use crate::model_io::reader::UnitsMap;
use crate::sbml::document::{non_empty, SbmlComponent, SbmlDocument};
use crate::sbml::parameters::active_objective;
use crate::sbml::units::{compartment_units, ratio, resolve_unit_id, species_units};

/// Reads the variables of a model.
///
/// Flux balance models expose their objective and reaction fluxes. Other
/// models expose their species, the parameters and compartments computed
/// by assignment rules, and their qualitative species.
pub fn read_variables(document: &SbmlDocument, units: &UnitsMap) -> Result<Vec<Variable>, ModelIoError> {
    if document.uses_package("fbc") {
        flux_balance_variables(document, units)
    } else {
        dynamic_variables(document, units)
    }
}

/// Units of a model-wide attribute such as `extentUnits`. Unresolvable
/// units are logged and kept as their raw id.
fn model_units(document: &SbmlDocument, attribute: &str, description: &str, units: &UnitsMap) -> String {
    let id = document.model_attr(attribute);
    match id.and_then(|id| resolve_unit_id(id, units, document.level())) {
        Some(resolved) => resolved,
        None => {
            log::error!("{}: model does not have valid {} units", document.source(), description);
            id.unwrap_or("None").to_string()
        }
    }
}

fn flux_balance_variables(document: &SbmlDocument, units: &UnitsMap) -> Result<Vec<Variable>, ModelIoError> {
    let extent = model_units(document, "extentUnits", "extent", units);
    let time = model_units(document, "timeUnits", "time", units);
    let flux_units = ratio(&extent, &time);

    let objective = active_objective(document)?;
    let objective_id = non_empty(document.package_attr(objective, "fbc", "id")).ok_or_else(|| {
        ModelIoError::MissingId {
            path: document.source(),
            element: "objective".to_string(),
        }
    })?;

    let mut variables = vec![Variable {
        target: Some(format!(
            "/sbml:sbml/sbml:model/fbc:listOfObjectives/fbc:objective[@fbc:id='{objective_id}']"
        )),
        group: Some("Objectives".to_string()),
        id: Some(objective_id.to_string()),
        name: Some(
            non_empty(document.package_attr(objective, "fbc", "name"))
                .unwrap_or(objective_id)
                .to_string(),
        ),
        value_type: Some(ValueType::Float),
        units: Some(flux_units.clone()),
        ..Default::default()
    }];

    for reaction in document.core_list("listOfReactions", "reaction") {
        let id = reaction.attr("id").unwrap_or_default();
        variables.push(Variable {
            target: Some(format!(
                "/sbml:sbml/sbml:model/sbml:listOfReactions/{}:{}[@id='{id}']",
                reaction.prefix.as_deref().unwrap_or("sbml"),
                reaction.name
            )),
            group: Some("Reaction fluxes".to_string()),
            id: Some(id.to_string()),
            name: non_empty(reaction.attr("name")).map(str::to_string),
            value_type: Some(ValueType::Float),
            units: Some(flux_units.clone()),
            ..Default::default()
        });
    }

    Ok(variables)
}

fn dynamic_variables(document: &SbmlDocument, units: &UnitsMap) -> Result<Vec<Variable>, ModelIoError> {
    let mut variables = Vec::new();

    for species in document.core_list("listOfSpecies", "species") {
        let id = non_empty(species.attr("id")).ok_or_else(|| ModelIoError::MissingId {
            path: document.source(),
            element: "species".to_string(),
        })?;
        variables.push(Variable {
            target: Some(format!(
                "/sbml:sbml/sbml:model/sbml:listOfSpecies/sbml:species[@id='{id}']"
            )),
            group: Some("Species amounts/concentrations".to_string()),
            id: Some(id.to_string()),
            name: non_empty(species.attr("name")).map(str::to_string),
            value_type: Some(ValueType::Float),
            units: species_units(document, species, units),
            ..Default::default()
        });
    }

    for rule in document.core_list_elements("listOfRules") {
        if document.constant_value(rule).is_some() || rule.name != "assignmentRule" {
            continue;
        }
        let Some(id) = rule.attr("variable") else {
            continue;
        };

        let (list, item, group, component_units) = match document.component(id) {
            Some(SbmlComponent::Parameter(parameter)) => (
                "listOfParameters",
                "parameter",
                "Other",
                non_empty(parameter.attr("units"))
                    .and_then(|unit_id| resolve_unit_id(unit_id, units, document.level())),
            ),
            Some(SbmlComponent::Compartment(compartment)) => (
                "listOfCompartments",
                "compartment",
                "Compartment sizes",
                compartment_units(document, compartment, units),
            ),
            _ => continue,
        };

        variables.push(Variable {
            target: Some(format!("/sbml:sbml/sbml:model/sbml:{list}/sbml:{item}[@id='{id}']")),
            group: Some(group.to_string()),
            id: Some(id.to_string()),
            name: document
                .component(id)
                .and_then(|component| component.name())
                .map(str::to_string),
            value_type: Some(ValueType::Float),
            units: component_units,
            ..Default::default()
        });
    }

    for species in document.package_items(document.model(), "qual", "listOfQualitativeSpecies", "qualitativeSpecies") {
        let id = document.package_attr(species, "qual", "id").unwrap_or_default();
        variables.push(Variable {
            target: Some(format!(
                "/sbml:sbml/sbml:model/qual:listOfQualitativeSpecies/qual:qualitativeSpecies[@qual:id='{id}']"
            )),
            group: Some("Species levels".to_string()),
            id: Some(id.to_string()),
            name: non_empty(document.package_attr(species, "qual", "name")).map(str::to_string),
            value_type: Some(ValueType::Integer),
            units: Some("dimensionless".to_string()),
            ..Default::default()
        });
    }

    Ok(variables)
}
