//! Charts and the simulation results they display.

use derive_builder::Builder;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::data_model::record::sorted_eq;
use crate::data_model::simulation::SimulationResult;

/// A chart type, e.g. `line` or `line-logX-logY`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Builder, Default, PartialEq)]
pub struct Chart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub id: Option<String>,
}

impl Chart {
    pub fn new(id: impl Into<String>) -> Self {
        Chart {
            id: Some(id.into()),
        }
    }

    /// Line chart, with optional logarithmic axes
    pub fn line(log_x: bool, log_y: bool) -> Self {
        let mut id = String::from("line");
        if log_x {
            id.push_str("-logX");
        }
        if log_y {
            id.push_str("-logY");
        }
        Chart::new(id)
    }

    pub fn is_log_x(&self) -> bool {
        self.id.as_deref().is_some_and(|id| id.contains("-logX"))
    }

    pub fn is_log_y(&self) -> bool {
        self.id.as_deref().is_some_and(|id| id.contains("-logY"))
    }
}

/// Shape of the data a chart field accepts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChartDataFieldShape {
    Scalar,
    Array,
}

/// Kind of the data a chart field accepts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ChartDataFieldType {
    Static,
    DynamicSimulationResult,
}

/// An input of a chart, such as its `x` or `y` series.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Builder, PartialEq)]
pub struct ChartDataField {
    #[builder(setter(into))]
    pub name: String,

    pub shape: ChartDataFieldShape,

    #[serde(rename = "type")]
    pub field_type: ChartDataFieldType,
}

impl ChartDataField {
    /// An array of simulation results, as used by line charts
    pub fn simulation_results(name: impl Into<String>) -> Self {
        ChartDataField {
            name: name.into(),
            shape: ChartDataFieldShape::Array,
            field_type: ChartDataFieldType::DynamicSimulationResult,
        }
    }
}

/// Binding of simulation results to one field of a chart.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Builder)]
#[serde(rename_all = "camelCase")]
pub struct VisualizationDataField {
    pub data_field: ChartDataField,

    #[serde(default)]
    #[builder(default, setter(into, each(name = "to_simulation_results")))]
    pub simulation_results: Vec<SimulationResult>,
}

impl PartialEq for VisualizationDataField {
    fn eq(&self, other: &Self) -> bool {
        self.data_field == other.data_field
            && sorted_eq(&self.simulation_results, &other.simulation_results)
    }
}

/// One chart of a visualization together with its data.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Builder, Default, PartialEq)]
pub struct VisualizationLayoutElement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub chart: Option<Chart>,

    #[serde(default)]
    #[builder(default, setter(into, each(name = "to_data")))]
    pub data: Vec<VisualizationDataField>,
}

impl VisualizationLayoutElement {
    /// The data bound to the field called `name`
    pub fn field(&self, name: &str) -> Option<&VisualizationDataField> {
        self.data.iter().find(|field| field.data_field.name == name)
    }
}

/// A grid of charts of simulation results.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Builder, Default, PartialEq)]
pub struct Visualization {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub name: Option<String>,

    /// Charts in display order
    #[serde(default)]
    #[builder(default, setter(into, each(name = "to_layout")))]
    pub layout: Vec<VisualizationLayoutElement>,
}
