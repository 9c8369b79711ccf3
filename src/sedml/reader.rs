//! SED-ML simulation reader.
//!
//! Each `task` of a SED-ML document becomes one [`Simulation`] of the model
//! and simulation it references. Data generator variables which point into
//! the model become variables of that simulation's model, and `plot2D`
//! outputs become the layout of a [`Visualization`]. Constructs that cannot
//! be represented are reported as [`SimulationIoWarning`]s and skipped.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;

use crate::data_model::common::{Format, ParameterValue, RemoteFile};
use crate::data_model::model::{Model, ModelFormat, Parameter, Variable};
use crate::data_model::simulation::{
    Algorithm, AlgorithmParameter, ParameterChange, Simulation, SimulationCore, SimulationFormat,
    SimulationResult, SteadyStateSimulation, TimecourseSimulation,
};
use crate::data_model::visualization::{
    Chart, ChartDataField, Visualization, VisualizationDataField, VisualizationLayoutElement,
};
use crate::sedml::error::{SimulationIoError, SimulationIoWarning};
use crate::sedml::metadata::SimulationMetadata;
use crate::xml::XmlElement;

/// Symbol of simulation time in data generator variables
pub const TIME_SYMBOL: &str = "urn:sedml:symbol:time";

lazy_static! {
    static ref SBML_LANGUAGE: Regex =
        Regex::new(r"^urn:sedml:language:sbml(?:\.level-(\d+)\.version-(\d+))?$")
            .expect("language pattern is valid");
}

/// Simulations, visualization and warnings read from a document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationReadResult {
    pub simulations: Vec<Simulation>,
    pub visualization: Option<Visualization>,
    pub warnings: Vec<SimulationIoWarning>,
}

/// A variable of a data generator
struct DataGeneratorVariable {
    id: String,
    target: Option<String>,
    symbol: Option<String>,
    task: Option<String>,
}

impl DataGeneratorVariable {
    fn to_variable(&self) -> Variable {
        Variable {
            id: Some(self.id.clone()),
            target: self.target.clone().or_else(|| self.symbol.clone()),
            ..Default::default()
        }
    }
}

/// Reads SED-ML documents
#[derive(Debug, Clone, Copy, Default)]
pub struct SedMlSimulationReader;

impl SedMlSimulationReader {
    pub fn new() -> Self {
        SedMlSimulationReader
    }

    /// Reads the simulation experiments of a SED-ML file
    pub fn run(&self, path: impl AsRef<Path>) -> Result<SimulationReadResult, SimulationIoError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(SimulationIoError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        self.read_str(&content, path)
    }

    /// Reads SED-ML text. `path` only names the document in messages.
    pub fn read_str(&self, content: &str, path: &Path) -> Result<SimulationReadResult, SimulationIoError> {
        let invalid = |reason: String| SimulationIoError::InvalidDocument {
            path: path.display().to_string(),
            reason,
        };

        let root = XmlElement::parse(content).map_err(|err| invalid(err.to_string()))?;
        if root.name != "sedML" {
            return Err(invalid(format!("root element is <{}>", root.name)));
        }

        DocumentReader::new(&root).read()
    }
}

/// State of reading one document
struct DocumentReader<'a> {
    root: &'a XmlElement,
    warnings: Vec<SimulationIoWarning>,
}

impl<'a> DocumentReader<'a> {
    fn new(root: &'a XmlElement) -> Self {
        DocumentReader {
            root,
            warnings: Vec::new(),
        }
    }

    fn warn(&mut self, message: String) {
        log::warn!("{}", message);
        self.warnings.push(SimulationIoWarning::new(message));
    }

    fn list(&self, list: &str) -> impl Iterator<Item = &'a XmlElement> {
        self.root
            .child(list)
            .into_iter()
            .flat_map(|list| list.elements())
    }

    fn read(mut self) -> Result<SimulationReadResult, SimulationIoError> {
        let level = self.root.attr("level").unwrap_or("1");
        let version = self.root.attr("version").unwrap_or("1");
        let format = SimulationFormat::SedMl
            .format()
            .with_version(format!("L{level}V{version}"));
        let metadata = SimulationMetadata::read(self.root);

        let mut models = HashMap::new();
        for element in self.list("listOfModels").filter(|element| element.name == "model") {
            let model = self.read_model(element)?;
            models.insert(element.attr("id").unwrap_or_default(), model);
        }

        let mut templates = HashMap::new();
        for element in self.list("listOfSimulations") {
            let simulation = read_simulation_element(element)?;
            templates.insert(element.attr("id").unwrap_or_default(), simulation);
        }

        let mut simulations: Vec<Simulation> = Vec::new();
        let mut task_indices: HashMap<&str, usize> = HashMap::new();
        for task in self.list("listOfTasks") {
            if task.name != "task" {
                self.warn(format!("Task type {} is not supported", task.name));
                continue;
            }

            let task_id = task.attr("id").unwrap_or_default();
            let model = task.attr("modelReference").and_then(|id| models.get(id));
            let template = task.attr("simulationReference").and_then(|id| templates.get(id));
            let (Some((model, changes)), Some(template)) = (model, template) else {
                self.warn(format!("Task {task_id} does not reference a model and a simulation"));
                continue;
            };

            let mut simulation = template.clone();
            let core = simulation.core_mut();
            metadata.apply_to(core);
            core.format = Some(format.clone());
            core.model = Some(model.clone());
            core.model_parameter_changes = changes.clone();

            task_indices.insert(task_id, simulations.len());
            simulations.push(simulation);
        }

        let data_generators = self.read_data_generators();
        for variables in data_generators.values() {
            for variable in variables.iter().filter(|variable| variable.target.is_some()) {
                let Some(index) = variable.task.as_deref().and_then(|task| task_indices.get(task)) else {
                    continue;
                };
                if let Some(model) = simulations[*index].core_mut().model.as_mut() {
                    if !model.variables.iter().any(|known| known.id.as_deref() == Some(variable.id.as_str())) {
                        model.variables.push(variable.to_variable());
                    }
                }
            }
        }

        let mut layout = Vec::new();
        for output in self.list("listOfOutputs") {
            match output.name.as_str() {
                "plot2D" => {
                    if let Some(element) =
                        self.read_plot(output, &data_generators, &task_indices, &simulations)
                    {
                        layout.push(element);
                    }
                }
                "report" => {}
                other => self.warn(format!("Output type {other} is not supported")),
            }
        }

        let visualization = (!layout.is_empty()).then(|| Visualization {
            id: None,
            name: None,
            layout,
        });

        Ok(SimulationReadResult {
            simulations,
            visualization,
            warnings: self.warnings,
        })
    }

    /// Reads a model and its attribute changes
    fn read_model(
        &mut self,
        element: &XmlElement,
    ) -> Result<(Model, Vec<ParameterChange<Parameter>>), SimulationIoError> {
        let language = element.attr("language").unwrap_or_default();
        let captures = SBML_LANGUAGE
            .captures(language)
            .ok_or_else(|| SimulationIoError::UnsupportedModelFormat(language.to_string()))?;

        let mut format: Format = ModelFormat::Sbml.format();
        if let (Some(level), Some(version)) = (captures.get(1), captures.get(2)) {
            format = format.with_version(format!("L{}V{}", level.as_str(), version.as_str()));
        }

        let model = Model {
            id: element.attr("id").map(str::to_string),
            name: element.attr("name").map(str::to_string),
            file: element.attr("source").map(|source| RemoteFile {
                name: Some(source.to_string()),
                ..Default::default()
            }),
            format: Some(format),
            ..Default::default()
        };

        let mut changes = Vec::new();
        for change in element
            .child("listOfChanges")
            .into_iter()
            .flat_map(|list| list.elements())
        {
            if change.name != "changeAttribute" {
                self.warn(format!("Change type {} is not supported", change.name));
                continue;
            }

            let parameter = Parameter {
                id: change.attr("id").map(str::to_string),
                name: change.attr("name").map(str::to_string),
                target: change.attr("target").map(str::to_string),
                ..Default::default()
            };
            changes.push(ParameterChange {
                parameter: Some(parameter),
                value: change
                    .attr("newValue")
                    .map(|value| ParameterValue::parse(value, None)),
            });
        }

        Ok((model, changes))
    }

    fn read_data_generators(&self) -> HashMap<&'a str, Vec<DataGeneratorVariable>> {
        self.list("listOfDataGenerators")
            .filter(|element| element.name == "dataGenerator")
            .map(|generator| {
                let variables = generator
                    .child("listOfVariables")
                    .into_iter()
                    .flat_map(|list| list.children_named("variable"))
                    .map(|variable| DataGeneratorVariable {
                        id: variable.attr("id").unwrap_or_default().to_string(),
                        target: variable.attr("target").map(str::to_string),
                        symbol: variable.attr("symbol").map(str::to_string),
                        task: variable.attr("taskReference").map(str::to_string),
                    })
                    .collect();
                (generator.attr("id").unwrap_or_default(), variables)
            })
            .collect()
    }

    fn read_plot(
        &mut self,
        plot: &XmlElement,
        data_generators: &HashMap<&str, Vec<DataGeneratorVariable>>,
        task_indices: &HashMap<&str, usize>,
        simulations: &[Simulation],
    ) -> Option<VisualizationLayoutElement> {
        let curves: Vec<&XmlElement> = plot
            .child("listOfCurves")
            .into_iter()
            .flat_map(|list| list.children_named("curve"))
            .collect();
        let first = curves.first()?;

        let x_reference = first.attr("xDataReference");
        let log_x = first.attr("logX") == Some("true");
        let log_y = first.attr("logY") == Some("true");

        let plot_id = plot.attr("id").unwrap_or_default();
        if curves
            .iter()
            .any(|curve| curve.attr("xDataReference") != x_reference || (curve.attr("logX") == Some("true")) != log_x)
        {
            self.warn(format!("Curves must have the same X axis ({plot_id})"));
        }
        if curves
            .iter()
            .any(|curve| (curve.attr("logY") == Some("true")) != log_y)
        {
            self.warn(format!("Curves must have the same Y axis ({plot_id})"));
        }

        let results = |reference: Option<&str>| -> Vec<SimulationResult> {
            reference
                .and_then(|reference| data_generators.get(reference))
                .into_iter()
                .flatten()
                .map(|variable| SimulationResult {
                    simulation: variable
                        .task
                        .as_deref()
                        .and_then(|task| task_indices.get(task))
                        .map(|index| simulations[*index].clone()),
                    variable: Some(variable.to_variable()),
                })
                .collect()
        };

        let x = VisualizationDataField {
            data_field: ChartDataField::simulation_results("x"),
            simulation_results: results(x_reference),
        };
        let y = VisualizationDataField {
            data_field: ChartDataField::simulation_results("y"),
            simulation_results: curves
                .iter()
                .flat_map(|curve| results(curve.attr("yDataReference")))
                .collect(),
        };

        Some(VisualizationLayoutElement {
            chart: Some(Chart::line(log_x, log_y)),
            data: vec![x, y],
        })
    }
}

/// Reads a simulation definition, without its model
fn read_simulation_element(element: &XmlElement) -> Result<Simulation, SimulationIoError> {
    let core = SimulationCore {
        id: element.attr("id").map(str::to_string),
        name: element.attr("name").map(str::to_string),
        algorithm: element.child("algorithm").map(|algorithm| Algorithm {
            id: algorithm.attr("id").map(str::to_string),
            name: algorithm.attr("name").map(str::to_string),
            kisao_id: algorithm.attr("kisaoID").map(str::to_string),
            ..Default::default()
        }),
        algorithm_parameter_changes: element
            .descend(&["algorithm", "listOfAlgorithmParameters"])
            .into_iter()
            .flat_map(|list| list.children_named("algorithmParameter"))
            .map(|parameter| ParameterChange {
                parameter: Some(AlgorithmParameter {
                    id: parameter.attr("id").map(str::to_string),
                    name: parameter.attr("name").map(str::to_string),
                    kisao_id: parameter.attr("kisaoID").map(str::to_string),
                    ..Default::default()
                }),
                value: parameter
                    .attr("value")
                    .map(|value| ParameterValue::parse(value, None)),
            })
            .collect(),
        ..Default::default()
    };

    let number = |name: &str| element.attr(name).and_then(|value| value.trim().parse::<f64>().ok());

    match element.name.as_str() {
        "uniformTimeCourse" => Ok(Simulation::Timecourse(TimecourseSimulation {
            core,
            start_time: number("initialTime"),
            output_start_time: number("outputStartTime"),
            end_time: number("outputEndTime"),
            num_time_points: element
                .attr("numberOfPoints")
                .and_then(|value| value.trim().parse().ok()),
        })),
        "steadyState" => Ok(Simulation::SteadyState(SteadyStateSimulation { core })),
        other => Err(SimulationIoError::UnsupportedSimulationType(other.to_string())),
    }
}
