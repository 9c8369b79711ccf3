use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::xml::XmlError;

/// Errors raised while reading or writing simulation experiments
#[derive(Debug, Error)]
pub enum SimulationIoError {
    /// The simulation file does not exist
    #[error("{} does not exist", .0.display())]
    FileNotFound(PathBuf),

    /// The file could not be parsed into a simulation experiment
    #[error("{path} is not a valid SED-ML document: {reason}")]
    InvalidDocument { path: String, reason: String },

    /// The experiment uses a simulation type other than time courses and
    /// steady states
    #[error("Unsupported simulation type: {0}")]
    UnsupportedSimulationType(String),

    /// The simulation is not encoded in the requested format
    #[error("Format must be SED-ML {0}")]
    FormatMismatch(String),

    /// The simulation experiment format cannot be read or written
    #[error("Simulation experiment format {0} is not supported")]
    UnsupportedSimulationFormat(String),

    /// The model format cannot be referenced from a simulation experiment
    #[error("Model format {0} is not supported")]
    UnsupportedModelFormat(String),

    /// The simulation lacks information required to encode it
    #[error("Invalid simulation: {0}")]
    InvalidSimulation(String),

    /// Reading or writing a file failed
    #[error("Failed to access simulation file: {0}")]
    Io(#[from] std::io::Error),

    /// The document could not be serialized
    #[error(transparent)]
    Xml(#[from] XmlError),
}

/// A recoverable problem found while reading a simulation experiment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationIoWarning {
    pub message: String,
}

impl SimulationIoWarning {
    pub fn new(message: impl Into<String>) -> Self {
        SimulationIoWarning {
            message: message.into(),
        }
    }
}

impl fmt::Display for SimulationIoWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
