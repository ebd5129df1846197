use devdeck_api::ServiceError;
use devdeck_types::ParsePlatformError;
use thiserror::Error;

/// Errors raised by the engine before or around step execution.
///
/// Step-level failures never surface here; they are carried as
/// [`devdeck_types::StepOutcome::Failure`] in the run transcript.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Task '{0}' not found")]
    UnknownTask(String),

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    /// The planning service proposed arguments that are not a JSON object.
    #[error("Invalid arguments for function '{function}': {message}")]
    MalformedPlan { function: String, message: String },

    #[error("record store write failed: {0}")]
    Persistence(#[source] ServiceError),

    #[error(transparent)]
    InvalidPlatform(#[from] ParsePlatformError),

    #[error("{0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("invalid task configuration: {0}")]
    Config(String),
}

impl EngineError {
    /// Upstream status for errors that originate from an external service.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            Self::Service(error) | Self::Persistence(error) => error.status(),
            _ => None,
        }
    }
}
