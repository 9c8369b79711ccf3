//! SED-ML simulation writer.

use std::fs;
use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;

use crate::data_model::common::Format;
use crate::data_model::model::Variable;
use crate::data_model::simulation::Simulation;
use crate::data_model::visualization::Visualization;
use crate::sedml::error::SimulationIoError;
use crate::sedml::metadata::SimulationMetadata;
use crate::sedml::reader::TIME_SYMBOL;
use crate::xml::XmlElement;

const MATHML_NAMESPACE: &str = "http://www.w3.org/1998/Math/MathML";

lazy_static! {
    static ref SBML_VERSION: Regex = Regex::new(r"^L(\d+)V(\d+)$").expect("version pattern is valid");
}

/// Writes simulations as SED-ML documents of one level and version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SedMlSimulationWriter {
    pub level: u32,
    pub version: u32,
}

impl Default for SedMlSimulationWriter {
    fn default() -> Self {
        SedMlSimulationWriter { level: 1, version: 3 }
    }
}

impl SedMlSimulationWriter {
    pub fn new(level: u32, version: u32) -> Self {
        SedMlSimulationWriter { level, version }
    }

    /// Version string of the documents, e.g. `L1V3`
    pub fn format_version(&self) -> String {
        format!("L{}V{}", self.level, self.version)
    }

    /// XML namespace of the documents
    pub fn namespace(&self) -> String {
        if self.level == 1 && self.version == 1 {
            "http://sed-ml.org/".to_string()
        } else {
            format!("http://sed-ml.org/sed-ml/level{}/version{}", self.level, self.version)
        }
    }

    /// Writes a simulation, and optionally the plots of a visualization, to
    /// `path`. `model_filename` is referenced as the model's source.
    pub fn run(
        &self,
        simulation: &Simulation,
        model_filename: &str,
        path: impl AsRef<Path>,
        visualization: Option<&Visualization>,
    ) -> Result<(), SimulationIoError> {
        let document = self.to_xml(simulation, model_filename, visualization)?;
        fs::write(path.as_ref(), document.to_xml_string()?)?;
        log::debug!("Wrote simulation to {}", path.as_ref().display());
        Ok(())
    }

    /// Encodes a simulation as a SED-ML document
    pub fn to_xml(
        &self,
        simulation: &Simulation,
        model_filename: &str,
        visualization: Option<&Visualization>,
    ) -> Result<XmlElement, SimulationIoError> {
        let core = simulation.core();
        let expected_version = self.format_version();

        let format_matches = core.format.as_ref().is_some_and(|format| {
            format.is("SEDML", "SED-ML") && format.version.as_deref() == Some(expected_version.as_str())
        });
        if !format_matches {
            return Err(SimulationIoError::FormatMismatch(expected_version));
        }

        let model = core.model.clone().unwrap_or_default();
        let model_format = model.format.clone().unwrap_or_default();
        if !model_format.is("SBML", "SBML") {
            return Err(SimulationIoError::UnsupportedModelFormat(format_label(&model_format)));
        }

        let mut root = XmlElement::new("sedML")
            .with_attr("xmlns", self.namespace())
            .with_attr("xmlns:sbml", sbml_namespace(&model_format))
            .with_attr("level", self.level.to_string())
            .with_attr("version", self.version.to_string());

        if let Some(annotation) = SimulationMetadata::from_simulation(core).to_annotation() {
            root.push_element(annotation);
        }

        let simulation_id = core.id.clone().unwrap_or_else(|| "simulation".to_string());
        root.push_element(XmlElement::new("listOfSimulations").with_child(simulation_element(simulation, &simulation_id)?));

        let model_id = model.id.clone().unwrap_or_else(|| "model".to_string());
        let mut model_element = XmlElement::new("model")
            .with_attr("id", model_id.as_str())
            .with_attr("source", model_filename)
            .with_attr("language", sbml_language(&model_format));
        if let Some(name) = &model.name {
            model_element.set_attr("name", name.as_str());
        }
        if !core.model_parameter_changes.is_empty() {
            let mut changes = XmlElement::new("listOfChanges");
            for change in &core.model_parameter_changes {
                let parameter = change.parameter.clone().unwrap_or_default();
                let mut element = XmlElement::new("changeAttribute");
                if let Some(id) = &parameter.id {
                    element.set_attr("id", id.as_str());
                }
                if let Some(name) = &parameter.name {
                    element.set_attr("name", name.as_str());
                }
                element.set_attr("target", parameter.target.clone().unwrap_or_default());
                element.set_attr(
                    "newValue",
                    change.value.as_ref().map(ToString::to_string).unwrap_or_default(),
                );
                changes.push_element(element);
            }
            model_element.push_element(changes);
        }
        root.push_element(XmlElement::new("listOfModels").with_child(model_element));

        root.push_element(
            XmlElement::new("listOfTasks").with_child(
                XmlElement::new("task")
                    .with_attr("id", "task")
                    .with_attr("modelReference", model_id.as_str())
                    .with_attr("simulationReference", simulation_id.as_str()),
            ),
        );

        let mut generators = DataGenerators::default();
        generators.add(&Variable::new("time", TIME_SYMBOL));
        for variable in &model.variables {
            generators.add(variable);
        }

        let mut outputs = XmlElement::new("listOfOutputs");
        for (index, element) in visualization.into_iter().flat_map(|vis| vis.layout.iter()).enumerate() {
            let chart = element.chart.clone().unwrap_or_default();
            let variables = |name: &str| -> Vec<Variable> {
                element
                    .field(name)
                    .into_iter()
                    .flat_map(|field| field.simulation_results.iter())
                    .filter_map(|result| result.variable.clone())
                    .collect()
            };

            let x_variables = variables("x");
            let x_reference = match x_variables.first() {
                Some(variable) => generators.add(variable),
                None => generators.id_of("time"),
            };

            let mut curves = XmlElement::new("listOfCurves");
            for (curve_index, variable) in variables("y").iter().enumerate() {
                let y_reference = generators.add(variable);
                curves.push_element(
                    XmlElement::new("curve")
                        .with_attr("id", format!("plot_{index}_curve_{curve_index}"))
                        .with_attr("logX", chart.is_log_x().to_string())
                        .with_attr("logY", chart.is_log_y().to_string())
                        .with_attr("xDataReference", x_reference.as_str())
                        .with_attr("yDataReference", y_reference),
                );
            }

            outputs.push_element(
                XmlElement::new("plot2D")
                    .with_attr("id", format!("plot_{index}"))
                    .with_child(curves),
            );
        }

        root.push_element(generators.into_element());
        if !outputs.children.is_empty() {
            root.push_element(outputs);
        }

        Ok(root)
    }
}

/// Data generators, one per distinct variable
#[derive(Default)]
struct DataGenerators {
    ids: Vec<(String, String)>,
    element: Option<XmlElement>,
}

impl DataGenerators {
    /// Adds a generator for the variable, unless one exists, and returns
    /// the generator id
    fn add(&mut self, variable: &Variable) -> String {
        let variable_id = variable.id.clone().unwrap_or_default();
        if let Some((_, generator_id)) = self.ids.iter().find(|(id, _)| *id == variable_id) {
            return generator_id.clone();
        }

        let generator_id = format!("data_gen_{variable_id}");
        let target = variable.target.clone().unwrap_or_default();
        let mut sed_variable = XmlElement::new("variable")
            .with_attr("id", variable_id.as_str())
            .with_attr("taskReference", "task");
        if target.starts_with("urn:sedml:symbol:") {
            sed_variable.set_attr("symbol", target);
        } else {
            sed_variable.set_attr("target", target);
        }
        if let Some(name) = &variable.name {
            sed_variable.set_attr("name", name.as_str());
        }

        let mut generator = XmlElement::new("dataGenerator").with_attr("id", generator_id.as_str());
        if let Some(name) = &variable.name {
            generator.set_attr("name", name.as_str());
        }
        generator.push_element(XmlElement::new("listOfVariables").with_child(sed_variable));
        generator.push_element(
            XmlElement::new("math")
                .with_attr("xmlns", MATHML_NAMESPACE)
                .with_child(XmlElement::new("ci").with_text(variable_id.as_str())),
        );

        self.element
            .get_or_insert_with(|| XmlElement::new("listOfDataGenerators"))
            .push_element(generator);
        self.ids.push((variable_id, generator_id.clone()));
        generator_id
    }

    fn id_of(&self, variable_id: &str) -> String {
        self.ids
            .iter()
            .find(|(id, _)| id == variable_id)
            .map(|(_, generator_id)| generator_id.clone())
            .unwrap_or_else(|| format!("data_gen_{variable_id}"))
    }

    fn into_element(self) -> XmlElement {
        self.element
            .unwrap_or_else(|| XmlElement::new("listOfDataGenerators"))
    }
}

fn simulation_element(simulation: &Simulation, id: &str) -> Result<XmlElement, SimulationIoError> {
    let core = simulation.core();
    let mut element = match simulation {
        Simulation::Timecourse(timecourse) => {
            let end_time = timecourse.end_time.ok_or_else(|| {
                SimulationIoError::InvalidSimulation("time course must have an end time".to_string())
            })?;
            let points = timecourse.num_time_points.ok_or_else(|| {
                SimulationIoError::InvalidSimulation("time course must have a number of time points".to_string())
            })?;
            // uniformTimeCourse requires both times; output starts with the
            // simulation unless set, so reading the document back yields it
            let start_time = timecourse.start_time.unwrap_or(0.0);
            let output_start_time = timecourse.output_start_time.unwrap_or(start_time);

            XmlElement::new("uniformTimeCourse")
                .with_attr("id", id)
                .with_attr("initialTime", start_time.to_string())
                .with_attr("outputStartTime", output_start_time.to_string())
                .with_attr("outputEndTime", end_time.to_string())
                .with_attr("numberOfPoints", points.to_string())
        }
        Simulation::SteadyState(_) => XmlElement::new("steadyState").with_attr("id", id),
    };
    if let Some(name) = &core.name {
        element.set_attr("name", name.as_str());
    }

    let algorithm = core.algorithm.clone().unwrap_or_default();
    let mut algorithm_element = XmlElement::new("algorithm");
    if let Some(id) = &algorithm.id {
        algorithm_element.set_attr("id", id.as_str());
    }
    if let Some(name) = &algorithm.name {
        algorithm_element.set_attr("name", name.as_str());
    }
    algorithm_element.set_attr("kisaoID", algorithm.kisao_id.clone().unwrap_or_default());

    if !core.algorithm_parameter_changes.is_empty() {
        let mut parameters = XmlElement::new("listOfAlgorithmParameters");
        for change in &core.algorithm_parameter_changes {
            let parameter = change.parameter.clone().unwrap_or_default();
            let mut parameter_element = XmlElement::new("algorithmParameter");
            if let Some(id) = &parameter.id {
                parameter_element.set_attr("id", id.as_str());
            }
            if let Some(name) = &parameter.name {
                parameter_element.set_attr("name", name.as_str());
            }
            parameter_element.set_attr("kisaoID", parameter.kisao_id.clone().unwrap_or_default());
            parameter_element.set_attr(
                "value",
                change.value.as_ref().map(ToString::to_string).unwrap_or_default(),
            );
            parameters.push_element(parameter_element);
        }
        algorithm_element.push_element(parameters);
    }

    element.push_element(algorithm_element);
    Ok(element)
}

fn sbml_version(format: &Format) -> Option<(String, String)> {
    let captures = SBML_VERSION.captures(format.version.as_deref()?)?;
    Some((captures[1].to_string(), captures[2].to_string()))
}

/// Language URN of an SBML model, e.g. `urn:sedml:language:sbml.level-3.version-1`
fn sbml_language(format: &Format) -> String {
    match sbml_version(format) {
        Some((level, version)) => format!("urn:sedml:language:sbml.level-{level}.version-{version}"),
        None => "urn:sedml:language:sbml".to_string(),
    }
}

/// Namespace which the `sbml` prefix of targets is bound to
fn sbml_namespace(format: &Format) -> String {
    match sbml_version(format) {
        Some((level, version)) if level == "3" => {
            format!("http://www.sbml.org/sbml/level3/version{version}/core")
        }
        Some((level, version)) => format!("http://www.sbml.org/sbml/level{level}/version{version}"),
        None => "http://www.sbml.org/sbml/level3/version1/core".to_string(),
    }
}

fn format_label(format: &Format) -> String {
    format
        .name
        .clone()
        .or_else(|| format.id.clone())
        .unwrap_or_else(|| "None".to_string())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::data_model::model::{Model, ModelFormat};
    use crate::data_model::simulation::{
        Algorithm, SimulationCore, SimulationFormat, SteadyStateSimulation, TimecourseSimulation,
    };

    fn timecourse() -> Simulation {
        Simulation::Timecourse(TimecourseSimulation {
            core: SimulationCore {
                id: Some("sim".to_string()),
                format: Some(SimulationFormat::SedMl.format().with_version("L1V3")),
                model: Some(Model {
                    format: Some(ModelFormat::Sbml.format().with_version("L3V1")),
                    ..Default::default()
                }),
                algorithm: Some(Algorithm::with_kisao_id("KISAO_0000019")),
                ..Default::default()
            },
            start_time: Some(0.0),
            output_start_time: None,
            end_time: Some(10.0),
            num_time_points: Some(100),
        })
    }

    #[test]
    fn test_namespace() {
        assert_eq!(SedMlSimulationWriter::new(1, 1).namespace(), "http://sed-ml.org/");
        assert_eq!(
            SedMlSimulationWriter::default().namespace(),
            "http://sed-ml.org/sed-ml/level1/version3"
        );
    }

    #[test]
    fn test_to_xml() {
        let root = SedMlSimulationWriter::default()
            .to_xml(&timecourse(), "model.xml", None)
            .unwrap();

        let course = root.descend(&["listOfSimulations", "uniformTimeCourse"]).unwrap();
        assert_eq!(course.attr("outputStartTime"), Some("0"));
        assert_eq!(course.attr("outputEndTime"), Some("10"));
        assert_eq!(course.attr("numberOfPoints"), Some("100"));

        let model = root.descend(&["listOfModels", "model"]).unwrap();
        assert_eq!(model.attr("language"), Some("urn:sedml:language:sbml.level-3.version-1"));
        assert_eq!(model.attr("source"), Some("model.xml"));

        let generator = root.descend(&["listOfDataGenerators", "dataGenerator"]).unwrap();
        assert_eq!(generator.attr("id"), Some("data_gen_time"));
    }

    #[test]
    fn test_output_start_time_defaults_to_start_time() {
        let mut simulation = timecourse();
        if let Simulation::Timecourse(course) = &mut simulation {
            course.start_time = Some(2.0);
        }

        let root = SedMlSimulationWriter::default()
            .to_xml(&simulation, "model.xml", None)
            .unwrap();

        let course = root.descend(&["listOfSimulations", "uniformTimeCourse"]).unwrap();
        assert_eq!(course.attr("initialTime"), Some("2"));
        assert_eq!(course.attr("outputStartTime"), Some("2"));
    }

    #[test]
    fn test_format_mismatch() {
        let mut simulation = timecourse();
        simulation.core_mut().format = Some(SimulationFormat::SedMl.format().with_version("L1V2"));

        match SedMlSimulationWriter::default().to_xml(&simulation, "model.xml", None) {
            Err(SimulationIoError::FormatMismatch(version)) => assert_eq!(version, "L1V3"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_unsupported_model_format() {
        let mut simulation = timecourse();
        simulation.core_mut().model = Some(Model {
            format: Some(ModelFormat::CellMl.format()),
            ..Default::default()
        });

        assert!(matches!(
            SedMlSimulationWriter::default().to_xml(&simulation, "model.xml", None),
            Err(SimulationIoError::UnsupportedModelFormat(_))
        ));
    }

    #[test]
    fn test_incomplete_time_course() {
        let Simulation::Timecourse(mut course) = timecourse() else {
            unreachable!()
        };
        course.num_time_points = None;

        assert!(matches!(
            SedMlSimulationWriter::default().to_xml(&course.into(), "model.xml", None),
            Err(SimulationIoError::InvalidSimulation(_))
        ));
    }

    #[test]
    fn test_steady_state() {
        let simulation = Simulation::SteadyState(SteadyStateSimulation {
            core: timecourse().core().clone(),
        });
        let root = SedMlSimulationWriter::default()
            .to_xml(&simulation, "model.xml", None)
            .unwrap();
        assert!(root.descend(&["listOfSimulations", "steadyState"]).is_some());
    }
}
