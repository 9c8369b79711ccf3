//! Dispatch from model and simulation formats to their readers and writers.

use std::path::Path;

use crate::data_model::model::{Model, ModelFormat};
use crate::data_model::simulation::{Simulation, SimulationFormat};
use crate::data_model::visualization::Visualization;
use crate::model_io::error::ModelIoError;
use crate::model_io::reader::ModelReader;
use crate::sbml::reader::SbmlModelReader;
use crate::sedml::error::SimulationIoError;
use crate::sedml::reader::{SedMlSimulationReader, SimulationReadResult};
use crate::sedml::writer::SedMlSimulationWriter;

/// Reads a model of the given format
pub fn read_model(path: impl AsRef<Path>, format: ModelFormat) -> Result<Model, ModelIoError> {
    match format {
        ModelFormat::Sbml => SbmlModelReader::new().run(path),
        other => Err(ModelIoError::UnsupportedFormat(other.id().to_string())),
    }
}

/// Reads the simulations of a simulation experiment about a model of the
/// given format
pub fn read_simulation(
    path: impl AsRef<Path>,
    model_format: ModelFormat,
    simulation_format: SimulationFormat,
) -> Result<SimulationReadResult, SimulationIoError> {
    if simulation_format != SimulationFormat::SedMl {
        return Err(SimulationIoError::UnsupportedSimulationFormat(
            simulation_format.id().to_string(),
        ));
    }
    if model_format != ModelFormat::Sbml {
        return Err(SimulationIoError::UnsupportedModelFormat(model_format.id().to_string()));
    }

    SedMlSimulationReader::new().run(path)
}

/// Writes a simulation, and optionally a visualization of its results, as
/// a document of the given level and version.
///
/// The simulation's own format must declare the same SED-ML level and
/// version, e.g. `L1V3`.
pub fn write_simulation(
    simulation: &Simulation,
    model_filename: &str,
    path: impl AsRef<Path>,
    format: SimulationFormat,
    level: u32,
    version: u32,
    visualization: Option<&Visualization>,
) -> Result<(), SimulationIoError> {
    if format != SimulationFormat::SedMl {
        return Err(SimulationIoError::UnsupportedSimulationFormat(format.id().to_string()));
    }

    SedMlSimulationWriter::new(level, version).run(simulation, model_filename, path, visualization)
}
