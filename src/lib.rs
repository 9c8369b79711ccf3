//! Biosimulations Utilities Library
//!
//! This library provides the data models and format converters of a platform
//! for sharing biological models and simulation experiments, including:
//! - Record types for models, simulations, simulators and visualizations
//! - Reading SBML models into parameters and variables
//! - Reading and writing SED-ML simulation experiments
//! - Rendering SBML models with MINERVA
//! - GitHub issue automation for CI review workflows
//! - Importing curated models from BioModels
//! - Validating JSON records against their schemas

#![warn(unused_imports)]

/// Commonly used types and functionality re-exported for convenience
pub mod prelude {
    pub use crate::biomodels::{BioModelsImporter, ImportStats};
    pub use crate::data_model::common::*;
    pub use crate::data_model::model::*;
    pub use crate::data_model::record::{JsonRecord, RecordError};
    pub use crate::data_model::simulation::*;
    pub use crate::data_model::simulator::*;
    pub use crate::data_model::visualization::*;
    pub use crate::formats::{read_model, read_simulation, write_simulation};
    pub use crate::info::simulation_table;
    pub use crate::io::*;
    pub use crate::model_io::error::ModelIoError;
    pub use crate::model_io::reader::ModelReader;
    pub use crate::sbml::reader::{read_sbml_model, SbmlModelReader};
    pub use crate::sbml::visualize::{visualize_model, MinervaClient, RenderOptions};
    pub use crate::sedml::error::{SimulationIoError, SimulationIoWarning};
    pub use crate::sedml::reader::{SedMlSimulationReader, SimulationReadResult};
    pub use crate::sedml::writer::SedMlSimulationWriter;
    pub use crate::taxonomy::{NcbiTaxonomy, StaticTaxonomy, TaxonomyLookup};
}

/// Record types and their JSON representation
pub mod data_model {
    /// Records shared by all resources
    pub mod common;
    /// Models, their parameters and variables
    pub mod model;
    /// JSON conversion and order-insensitive comparison of records
    pub mod record;
    /// Simulation experiments and algorithms
    pub mod simulation;
    /// Simulation tools
    pub mod simulator;
    /// Charts and visualizations of simulation results
    pub mod visualization;
}

/// Owned XML element tree
pub mod xml;

/// Lookup of taxon names
pub mod taxonomy;

/// Format-independent model reading
pub mod model_io {
    pub mod error;
    pub mod reader;
}

/// SBML models
pub mod sbml {
    /// RDF annotations of models
    pub mod annotations;
    /// Navigation of SBML documents
    pub mod document;
    /// Adjustable parameters
    pub mod parameters;
    /// The SBML model reader
    pub mod reader;
    /// Unit definitions
    pub mod units;
    /// Observable variables
    pub mod variables;
    /// Rendering with MINERVA
    pub mod visualize;
}

/// SED-ML simulation experiments
pub mod sedml {
    pub mod error;
    /// RDF metadata of simulation experiments
    pub mod metadata;
    pub mod reader;
    pub mod writer;
}

/// Dispatch from formats to readers and writers
pub mod formats;

/// GitHub issue automation for CI workflows
pub mod ci {
    pub mod action;
    pub mod error;
}

/// Importer for BioModels
pub mod biomodels;

/// Tables of models and simulations
pub mod info;

/// JSON file input and output
pub mod io;

/// Validation of JSON records
pub mod validation {
    /// Schema validation
    pub mod schema;
}
