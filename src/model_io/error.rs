use std::path::PathBuf;

use thiserror::Error;

use crate::xml::XmlError;

/// Errors raised while reading or visualizing models
#[derive(Debug, Error)]
pub enum ModelIoError {
    /// The model file does not exist
    #[error("{} does not exist", .0.display())]
    FileNotFound(PathBuf),

    /// The file could not be parsed into a model
    #[error("{path} does not contain a valid model: {reason}")]
    InvalidDocument { path: String, reason: String },

    /// No reader exists for the model format
    #[error("Model format {0} is not supported")]
    UnsupportedFormat(String),

    /// The model uses extension packages outside the supported set
    #[error("{0} package(s) are not supported")]
    UnsupportedPackages(String),

    /// The model uses hierarchical model composition
    #[error("comp package is not supported")]
    UnsupportedComp,

    /// More than one of the fbc, multi and qual packages is used
    #[error("Unable to determine modeling framework")]
    AmbiguousFramework,

    /// A component that must be identified has no id
    #[error("{path}: {element} does not have an id")]
    MissingId { path: String, element: String },

    /// A flux balance model has no active objective
    #[error("{0}: model does not have an active flux objective")]
    MissingActiveObjective(String),

    /// The visualization service rejected the model
    #[error("Unable to generate image for {model}: {body}")]
    Visualization { model: String, body: String },

    /// Reading or writing a file failed
    #[error("Failed to access model file: {0}")]
    Io(#[from] std::io::Error),

    /// A request to an external service failed
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The model could not be serialized
    #[error(transparent)]
    Xml(#[from] XmlError),
}
