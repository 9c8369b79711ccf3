//! Simulation experiments, algorithms and their parameters.
//!
//! A simulation is either a time course or a steady-state experiment. The
//! two share most of their fields through [`SimulationCore`]; on the wire
//! they are told apart by the time-course keys (`startTime`, `endTime`,
//! `numTimePoints`): a document with any of them is a time course.

use derive_builder::Builder;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use variantly::Variantly;

use crate::data_model::common::{
    range_key, Format, Identifier, JournalReference, License, OntologyTerm, ParameterValue,
    ParameterValueKey, Person, RemoteFile, ValueType,
};
use crate::data_model::model::{Model, Parameter, Variable};
use crate::data_model::record::{sorted_eq, sorted_strings_eq, SortKey};

/// Keys whose presence marks a time-course simulation
const TIMECOURSE_KEYS: [&str; 3] = ["startTime", "endTime", "numTimePoints"];

/// Simulation experiment formats known to the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimulationFormat {
    SedMl,
    Sessl,
}

impl SimulationFormat {
    /// Metadata about the format, without a version
    pub fn format(&self) -> Format {
        match self {
            SimulationFormat::SedMl => Format {
                id: Some("SEDML".to_string()),
                name: Some("Simulation Experiment Description Markup Language".to_string()),
                version: None,
                edam_id: Some("format_3685".to_string()),
                url: Some("https://sed-ml.org/".to_string()),
                spec_url: Some("http://identifiers.org/combine.specifications/sed-ml".to_string()),
            },
            SimulationFormat::Sessl => Format {
                id: Some("SESSL".to_string()),
                name: Some("Simulation Experiment Specification via a Scala Layer".to_string()),
                version: None,
                edam_id: None,
                url: Some("http://sessl.org".to_string()),
                spec_url: Some("http://sessl.org".to_string()),
            },
        }
    }

    /// Short name, e.g. `SEDML`
    pub fn id(&self) -> &'static str {
        match self {
            SimulationFormat::SedMl => "SEDML",
            SimulationFormat::Sessl => "SESSL",
        }
    }
}

/// Fields shared by all kinds of simulations.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Builder, Default)]
#[serde(rename_all = "camelCase")]
pub struct SimulationCore {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub image: Option<RemoteFile>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub description: Option<String>,

    #[serde(default)]
    #[builder(default, setter(into, each(name = "to_tags")))]
    pub tags: Vec<String>,

    #[serde(default)]
    #[builder(default, setter(into, each(name = "to_identifiers")))]
    pub identifiers: Vec<Identifier>,

    #[serde(default)]
    #[builder(default, setter(into, each(name = "to_references")))]
    pub references: Vec<JournalReference>,

    #[serde(default)]
    #[builder(default, setter(into, each(name = "to_authors")))]
    pub authors: Vec<Person>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub license: Option<License>,

    /// Format in which the simulation is encoded, e.g. SED-ML L1V3
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub format: Option<Format>,

    /// Simulated model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub model: Option<Model>,

    #[serde(default)]
    #[builder(default, setter(into, each(name = "to_model_parameter_changes")))]
    pub model_parameter_changes: Vec<ParameterChange<Parameter>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub algorithm: Option<Algorithm>,

    #[serde(default)]
    #[builder(default, setter(into, each(name = "to_algorithm_parameter_changes")))]
    pub algorithm_parameter_changes: Vec<ParameterChange<AlgorithmParameter>>,
}

impl PartialEq for SimulationCore {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.image == other.image
            && self.description == other.description
            && sorted_strings_eq(&self.tags, &other.tags)
            && sorted_eq(&self.identifiers, &other.identifiers)
            && sorted_eq(&self.references, &other.references)
            && sorted_eq(&self.authors, &other.authors)
            && self.license == other.license
            && self.format == other.format
            && self.model == other.model
            && sorted_eq(&self.model_parameter_changes, &other.model_parameter_changes)
            && self.algorithm == other.algorithm
            && sorted_eq(
                &self.algorithm_parameter_changes,
                &other.algorithm_parameter_changes,
            )
    }
}

/// A simulation which records the trajectory of a model over time.
///
/// The time-course fields are always serialized, even when unset, so that
/// the simulation is recognized as a time course when read back.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Builder, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimecourseSimulation {
    #[serde(flatten)]
    #[builder(default, setter(into))]
    pub core: SimulationCore,

    #[serde(default)]
    #[builder(default, setter(into))]
    pub start_time: Option<f64>,

    /// Time at which results start being recorded
    #[serde(default)]
    #[builder(default, setter(into))]
    pub output_start_time: Option<f64>,

    #[serde(default)]
    #[builder(default, setter(into))]
    pub end_time: Option<f64>,

    #[serde(default)]
    #[builder(default, setter(into))]
    pub num_time_points: Option<u64>,
}

/// A simulation which computes the steady state of a model.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Builder, Default, PartialEq)]
pub struct SteadyStateSimulation {
    #[serde(flatten)]
    #[builder(default, setter(into))]
    pub core: SimulationCore,
}

/// A simulation experiment.
#[derive(Debug, Clone, Serialize, JsonSchema, PartialEq, Variantly)]
#[serde(untagged)]
pub enum Simulation {
    Timecourse(TimecourseSimulation),
    SteadyState(SteadyStateSimulation),
}

impl Simulation {
    /// Builds the variant that matches a JSON document.
    ///
    /// Any of `startTime`, `endTime` or `numTimePoints` selects a time course;
    /// otherwise the simulation is a steady-state simulation.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        let is_timecourse = value
            .as_object()
            .is_some_and(|map| TIMECOURSE_KEYS.iter().any(|key| map.contains_key(*key)));

        if is_timecourse {
            Ok(Simulation::Timecourse(serde_json::from_value(value)?))
        } else {
            Ok(Simulation::SteadyState(serde_json::from_value(value)?))
        }
    }

    pub fn core(&self) -> &SimulationCore {
        match self {
            Simulation::Timecourse(sim) => &sim.core,
            Simulation::SteadyState(sim) => &sim.core,
        }
    }

    pub fn core_mut(&mut self) -> &mut SimulationCore {
        match self {
            Simulation::Timecourse(sim) => &mut sim.core,
            Simulation::SteadyState(sim) => &mut sim.core,
        }
    }

    /// Human-readable kind, e.g. `time course`
    pub fn kind(&self) -> &'static str {
        match self {
            Simulation::Timecourse(_) => "time course",
            Simulation::SteadyState(_) => "steady-state",
        }
    }
}

impl<'de> Deserialize<'de> for Simulation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Simulation::from_value(value).map_err(serde::de::Error::custom)
    }
}

impl From<TimecourseSimulation> for Simulation {
    fn from(sim: TimecourseSimulation) -> Self {
        Simulation::Timecourse(sim)
    }
}

impl From<SteadyStateSimulation> for Simulation {
    fn from(sim: SteadyStateSimulation) -> Self {
        Simulation::SteadyState(sim)
    }
}

impl SortKey for Simulation {
    type Key = Option<String>;

    fn sort_key(&self) -> Self::Key {
        self.core().id.clone()
    }
}

/// A simulation algorithm, identified by its KiSAO term.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Builder, Default)]
#[serde(rename_all = "camelCase")]
pub struct Algorithm {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub name: Option<String>,

    /// KiSAO id, e.g. `KISAO:0000019`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub kisao_id: Option<String>,

    /// Semantically equivalent KiSAO ids for the simulator of the algorithm
    #[serde(default)]
    #[builder(default, setter(into, each(name = "to_synonymous_kisao_ids")))]
    pub synonymous_kisao_ids: Vec<String>,

    #[serde(default)]
    #[builder(default, setter(into, each(name = "to_modeling_frameworks")))]
    pub modeling_frameworks: Vec<OntologyTerm>,

    #[serde(default)]
    #[builder(default, setter(into, each(name = "to_model_formats")))]
    pub model_formats: Vec<Format>,

    #[serde(default)]
    #[builder(default, setter(into, each(name = "to_parameters")))]
    pub parameters: Vec<AlgorithmParameter>,
}

impl Algorithm {
    /// An algorithm known only by its KiSAO id
    pub fn with_kisao_id(kisao_id: impl Into<String>) -> Self {
        Algorithm {
            kisao_id: Some(kisao_id.into()),
            ..Default::default()
        }
    }
}

impl PartialEq for Algorithm {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.kisao_id == other.kisao_id
            && sorted_strings_eq(&self.synonymous_kisao_ids, &other.synonymous_kisao_ids)
            && sorted_eq(&self.modeling_frameworks, &other.modeling_frameworks)
            && sorted_eq(&self.model_formats, &other.model_formats)
            && sorted_eq(&self.parameters, &other.parameters)
    }
}

impl SortKey for Algorithm {
    type Key = (Option<String>, Option<String>, Option<String>);

    fn sort_key(&self) -> Self::Key {
        (self.kisao_id.clone(), self.id.clone(), self.name.clone())
    }
}

/// A parameter of a simulation algorithm, e.g. an absolute tolerance.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Builder, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AlgorithmParameter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub name: Option<String>,

    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub value_type: Option<ValueType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub value: Option<ParameterValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub recommended_range: Option<Vec<ParameterValue>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub kisao_id: Option<String>,
}

impl AlgorithmParameter {
    /// A parameter known only by its KiSAO id
    pub fn with_kisao_id(kisao_id: impl Into<String>) -> Self {
        AlgorithmParameter {
            kisao_id: Some(kisao_id.into()),
            ..Default::default()
        }
    }
}

impl SortKey for AlgorithmParameter {
    type Key = (
        Option<String>,
        Option<String>,
        Option<ValueType>,
        Option<ParameterValueKey>,
        Option<Vec<ParameterValueKey>>,
        Option<String>,
    );

    fn sort_key(&self) -> Self::Key {
        (
            self.id.clone(),
            self.name.clone(),
            self.value_type,
            self.value.as_ref().map(ParameterValue::sort_key),
            range_key(&self.recommended_range),
            self.kisao_id.clone(),
        )
    }
}

/// Parameters which can be the subject of a [`ParameterChange`].
pub trait ChangeableParameter: Clone + PartialEq {
    type Key: Ord;

    fn change_key(&self) -> Self::Key;
}

impl ChangeableParameter for Parameter {
    type Key = (
        Option<String>,
        Option<String>,
        Option<ValueType>,
        Option<ParameterValueKey>,
        Option<Vec<ParameterValueKey>>,
        Option<String>,
    );

    fn change_key(&self) -> Self::Key {
        self.identity_key()
    }
}

impl ChangeableParameter for AlgorithmParameter {
    type Key = <AlgorithmParameter as SortKey>::Key;

    fn change_key(&self) -> Self::Key {
        self.sort_key()
    }
}

/// A new value for a model or algorithm parameter.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Builder, Default, PartialEq)]
pub struct ParameterChange<P: ChangeableParameter> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub parameter: Option<P>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub value: Option<ParameterValue>,
}

impl<P: ChangeableParameter> ParameterChange<P> {
    pub fn new(parameter: P, value: impl Into<ParameterValue>) -> Self {
        ParameterChange {
            parameter: Some(parameter),
            value: Some(value.into()),
        }
    }
}

impl<P: ChangeableParameter> SortKey for ParameterChange<P> {
    type Key = (Option<P::Key>, Option<ParameterValueKey>);

    fn sort_key(&self) -> Self::Key {
        (
            self.parameter.as_ref().map(ChangeableParameter::change_key),
            self.value.as_ref().map(ParameterValue::sort_key),
        )
    }
}

/// The trajectory of one model variable in one simulation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Builder, Default, PartialEq)]
pub struct SimulationResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub simulation: Option<Simulation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(into))]
    pub variable: Option<Variable>,
}

impl SortKey for SimulationResult {
    type Key = (Option<String>, Option<String>);

    fn sort_key(&self) -> Self::Key {
        (
            self.simulation.as_ref().and_then(|sim| sim.core().id.clone()),
            self.variable.as_ref().and_then(|var| var.id.clone()),
        )
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::data_model::record::JsonRecord;

    fn core() -> SimulationCore {
        SimulationCoreBuilder::default()
            .id("sim".to_string())
            .name("Simulation".to_string())
            .format(SimulationFormat::SedMl.format().with_version("L1V3"))
            .algorithm(Algorithm::with_kisao_id("KISAO:0000019"))
            .to_algorithm_parameter_changes(ParameterChange::new(
                AlgorithmParameter::with_kisao_id("KISAO:0000211"),
                1e-8,
            ))
            .to_algorithm_parameter_changes(ParameterChange::new(
                AlgorithmParameter::with_kisao_id("KISAO:0000209"),
                1e-6,
            ))
            .build()
            .unwrap()
    }

    #[test]
    fn test_timecourse_detection() {
        for key in TIMECOURSE_KEYS {
            let sim = Simulation::from_json(&json!({ "id": "s", key: 1 })).unwrap();
            assert!(sim.is_timecourse(), "{key} should select a time course");
        }

        let sim = Simulation::from_json(&json!({"id": "s", "outputStartTime": 1})).unwrap();
        assert!(sim.is_steady_state());

        let sim = Simulation::from_json(&json!({})).unwrap();
        assert!(sim.is_steady_state());
    }

    #[test]
    fn test_timecourse_round_trip_with_unset_times() {
        let sim: Simulation = TimecourseSimulationBuilder::default()
            .core(core())
            .build()
            .unwrap()
            .into();

        let value = sim.to_json().unwrap();
        assert_eq!(value["startTime"], Value::Null);
        assert_eq!(Simulation::from_json(&value).unwrap(), sim);
    }

    #[test]
    fn test_simulation_round_trip() {
        let sim: Simulation = TimecourseSimulation {
            core: core(),
            start_time: Some(0.0),
            output_start_time: Some(0.0),
            end_time: Some(10.0),
            num_time_points: Some(100),
        }
        .into();
        let value = sim.to_json().unwrap();
        assert_eq!(value["algorithm"]["kisaoId"], json!("KISAO:0000019"));
        assert_eq!(value["numTimePoints"], json!(100));
        assert_eq!(Simulation::from_json(&value).unwrap(), sim);

        let steady: Simulation = SteadyStateSimulation { core: core() }.into();
        let value = steady.to_json().unwrap();
        assert!(value.get("endTime").is_none());
        assert_eq!(Simulation::from_json(&value).unwrap(), steady);
    }

    #[test]
    fn test_parameter_changes_compare_unordered() {
        let mut reordered = core();
        reordered.algorithm_parameter_changes.reverse();
        assert_eq!(reordered, core());

        let mut changed = core();
        changed.algorithm_parameter_changes[0].value = Some(ParameterValue::Float(1e-9));
        assert_ne!(changed, core());
    }

    #[test]
    fn test_variants_are_not_equal() {
        let timecourse: Simulation = TimecourseSimulation {
            core: core(),
            ..Default::default()
        }
        .into();
        let steady: Simulation = SteadyStateSimulation { core: core() }.into();
        assert_ne!(timecourse, steady);
    }

    #[test]
    fn test_algorithm_round_trip() {
        let algorithm = AlgorithmBuilder::default()
            .id("cvode".to_string())
            .name("CVODE".to_string())
            .kisao_id("KISAO:0000019".to_string())
            .synonymous_kisao_ids(vec!["KISAO:0000088".to_string(), "KISAO:0000087".to_string()])
            .to_model_formats(crate::data_model::model::ModelFormat::Sbml.format())
            .to_parameters(
                AlgorithmParameterBuilder::default()
                    .id("rtol".to_string())
                    .kisao_id("KISAO:0000209".to_string())
                    .value_type(ValueType::Float)
                    .value(ParameterValue::Float(1e-6))
                    .recommended_range(vec![
                        ParameterValue::Float(1e-10),
                        ParameterValue::Float(1e-2),
                    ])
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();

        let value = algorithm.to_json().unwrap();
        assert_eq!(value["synonymousKisaoIds"], json!(["KISAO:0000088", "KISAO:0000087"]));
        assert_eq!(Algorithm::from_json(&value).unwrap(), algorithm);

        let mut reordered = algorithm.clone();
        reordered.synonymous_kisao_ids.reverse();
        assert_eq!(reordered, algorithm);
    }

    #[test]
    fn test_simulation_result_round_trip() {
        let result = SimulationResult {
            simulation: Some(SteadyStateSimulation { core: core() }.into()),
            variable: Some(Variable::new("time", "urn:sedml:symbol:time")),
        };
        let value = result.to_json().unwrap();
        assert_eq!(SimulationResult::from_json(&value).unwrap(), result);
        assert_eq!(
            result.sort_key(),
            (Some("sim".to_string()), Some("time".to_string()))
        );
    }
}
