use thiserror::Error;

use crate::model_io::error::ModelIoError;
use crate::sedml::error::SimulationIoError;

/// Errors raised by continuous integration actions
#[derive(Debug, Error)]
pub enum ActionError {
    /// A required environment variable is not set
    #[error("Environment variable {name} is not set")]
    MissingVariable {
        name: String,
        #[source]
        source: std::env::VarError,
    },

    /// An environment variable does not hold a valid value
    #[error("Environment variable {name} is invalid: {value}")]
    InvalidVariable { name: String, value: String },

    /// The GitHub API rejected a request
    #[error("GitHub API request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    /// The request could not be sent or its response decoded
    #[error("GitHub API request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The issue body does not hold valid YAML data
    #[error("Invalid data in issue: {0}")]
    IssueData(#[from] serde_yml::Error),

    /// An error which could not be reported on the issue
    #[error("{error} (reporting it on the issue failed: {report})")]
    Unreported {
        error: Box<ActionError>,
        #[source]
        report: Box<ActionError>,
    },

    /// An error which has already been reported on the issue
    #[error("{0}")]
    Caught(String),

    #[error(transparent)]
    Model(#[from] ModelIoError),

    #[error(transparent)]
    Simulation(#[from] SimulationIoError),
}

impl ActionError {
    /// Whether the error has already been reported on the issue
    pub fn is_caught(&self) -> bool {
        matches!(self, ActionError::Caught(_))
    }
}
