use thirtyfour::error::WebDriverError;

use crate::services::workflow::WorkflowStep;

/// Failure of a single adapter action or workflow checkpoint.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("{what} never became ready (selector: {selector})")]
    ElementNotReady {
        what: &'static str,
        selector: String,
    },

    #[error("no category option exactly matching {label:?}")]
    OptionNotFound { label: String },

    #[error("checkpoint {what:?} failed: {detail}")]
    CheckpointFailed {
        what: &'static str,
        detail: String,
    },

    #[error("run deadline expired")]
    RunTimeout,

    #[error(transparent)]
    WebDriver(#[from] WebDriverError),
}

/// A run that died, with the step it died at.
#[derive(Debug, thiserror::Error)]
#[error("step {step} failed: {source}")]
pub struct WorkflowError {
    pub step: WorkflowStep,
    #[source]
    pub source: StepError,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unknown site in run name: {0:?}")]
    UnknownSite(String),

    #[error("invalid search criteria: {0}")]
    Criteria(String),
}
