//! Information display module for models and simulations
//!
//! This module renders models and simulations in a human-readable format. It
//! implements the `Display` trait for `Model` and provides helper functions
//! to format parameters, variables and simulations as tables.

use std::fmt::{self, Display};

use tabled::{builder::Builder, settings::Style};

use crate::data_model::common::ParameterValue;
use crate::data_model::model::{Model, Parameter, Variable};
use crate::data_model::simulation::Simulation;

/// Trait for converting records to table rows
///
/// Implementors provide the column headers and the values of one row.
trait TableRecord {
    /// Get the column headers for the table
    fn columns() -> Vec<String>;

    /// Convert the instance to a row of the table
    fn to_record(&self) -> Vec<String>;
}

impl Display for Model {
    /// Formats a model as a table of its metadata, parameters and variables
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut builder = Builder::default();
        builder.push_record(vec![format!(
            "Model {}",
            self.id.as_deref().or(self.name.as_deref()).unwrap_or("-")
        )]);

        let mut summary = vec![];
        if let Some(name) = &self.name {
            summary.push(format!("Name: {name}"));
        }
        if let Some(format) = &self.format {
            summary.push(format!(
                "Format: {} {}",
                format.id.as_deref().unwrap_or("-"),
                format.version.as_deref().unwrap_or("")
            ));
        }
        if let Some(framework) = self.framework.as_ref().and_then(|term| term.name.as_deref()) {
            summary.push(format!("Framework: {framework}"));
        }
        if let Some(taxon) = self.taxon.as_ref().and_then(|taxon| taxon.name.as_deref()) {
            summary.push(format!("Taxon: {taxon}"));
        }
        if !summary.is_empty() {
            builder.push_record(vec![summary.join("\n")]);
        }

        if !self.parameters.is_empty() {
            builder.push_record(vec!["Parameters"]);
            builder.push_record(vec![to_table(&self.parameters)]);
        }

        if !self.variables.is_empty() {
            builder.push_record(vec!["Variables"]);
            builder.push_record(vec![to_table(&self.variables)]);
        }

        let mut table = builder.build();
        table.with(Style::sharp());
        write!(f, "{}", table)
    }
}

/// Formats simulations as a table with one row per simulation
pub fn simulation_table(simulations: &[Simulation]) -> String {
    to_table(simulations)
}

/// Converts a collection of TableRecord implementors to a formatted table string
fn to_table<T: TableRecord>(records: &[T]) -> String {
    let mut builder = Builder::default();
    builder.push_record(T::columns());

    for record in records {
        builder.push_record(record.to_record());
    }

    let mut table = builder.build();
    table.with(Style::rounded());
    table.to_string()
}

fn or_dash(value: Option<&str>) -> String {
    value.unwrap_or("-").to_string()
}

fn value_text(value: Option<&ParameterValue>) -> String {
    value.map_or("-".to_string(), ToString::to_string)
}

impl TableRecord for Parameter {
    fn columns() -> Vec<String> {
        ["Group", "ID", "Name", "Value", "Range", "Units"]
            .map(String::from)
            .to_vec()
    }

    fn to_record(&self) -> Vec<String> {
        let range = match self.recommended_range.as_deref() {
            Some([low, high]) => format!("[{low}, {high}]"),
            _ => "-".to_string(),
        };

        vec![
            or_dash(self.group.as_deref()),
            or_dash(self.id.as_deref()),
            or_dash(self.name.as_deref()),
            value_text(self.value.as_ref()),
            range,
            or_dash(self.units.as_deref()),
        ]
    }
}

impl TableRecord for Variable {
    fn columns() -> Vec<String> {
        ["Group", "ID", "Name", "Units"].map(String::from).to_vec()
    }

    fn to_record(&self) -> Vec<String> {
        vec![
            or_dash(self.group.as_deref()),
            or_dash(self.id.as_deref()),
            or_dash(self.name.as_deref()),
            or_dash(self.units.as_deref()),
        ]
    }
}

impl TableRecord for Simulation {
    fn columns() -> Vec<String> {
        ["ID", "Type", "Model", "Algorithm", "Time span", "Points"]
            .map(String::from)
            .to_vec()
    }

    fn to_record(&self) -> Vec<String> {
        let core = self.core();
        let (span, points) = match self {
            Simulation::Timecourse(course) => (
                format!(
                    "{} - {}",
                    course.start_time.map_or("-".to_string(), |time| time.to_string()),
                    course.end_time.map_or("-".to_string(), |time| time.to_string())
                ),
                course.num_time_points.map_or("-".to_string(), |points| points.to_string()),
            ),
            Simulation::SteadyState(_) => ("-".to_string(), "-".to_string()),
        };

        vec![
            or_dash(core.id.as_deref()),
            self.kind().to_string(),
            or_dash(core.model.as_ref().and_then(|model| model.id.as_deref())),
            or_dash(core.algorithm.as_ref().and_then(|algorithm| algorithm.kisao_id.as_deref())),
            span,
            points,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_model::simulation::{SimulationCore, TimecourseSimulation};

    #[test]
    fn test_model_table() {
        let model = Model {
            id: Some("BIOMD0000000001".to_string()),
            parameters: vec![Parameter {
                id: Some("kf".to_string()),
                group: Some("Other global parameters".to_string()),
                value: Some(ParameterValue::Float(3.0)),
                recommended_range: Some(vec![ParameterValue::Float(0.3), ParameterValue::Float(30.0)]),
                units: Some("1 / second".to_string()),
                ..Default::default()
            }],
            variables: vec![Variable::new("BLL", "/sbml:sbml/sbml:model")],
            ..Default::default()
        };

        let table = model.to_string();
        assert!(table.contains("Model BIOMD0000000001"));
        assert!(table.contains("Parameters"));
        assert!(table.contains("kf"));
        assert!(table.contains("1 / second"));
        assert!(table.contains("Variables"));
        assert!(table.contains("BLL"));
    }

    #[test]
    fn test_simulation_table() {
        let simulations = vec![Simulation::Timecourse(TimecourseSimulation {
            core: SimulationCore {
                id: Some("sim_1".to_string()),
                ..Default::default()
            },
            start_time: Some(0.0),
            output_start_time: None,
            end_time: Some(10.0),
            num_time_points: Some(100),
        })];

        let table = simulation_table(&simulations);
        assert!(table.contains("sim_1"));
        assert!(table.contains("time course"));
        assert!(table.contains("0 - 10"));
    }
}
