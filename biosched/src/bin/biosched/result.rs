use std::fmt::Display;

use biosched::config::ConfigError;
use biosched::instance::InstanceError;
use biosched::solve::SolveError;
use biosched::submit::SubmitError;
use biosched::summarize::SummarizeError;
use thiserror::Error;

pub(crate) type BioschedResult<T> = Result<T, BioschedError>;

#[derive(Error, Debug)]
pub(crate) enum BioschedError {
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("The instance {path} is invalid, more details: {source}")]
    InvalidInstance { path: String, source: InstanceError },
    #[error("Failed to submit the experiment, more details: {0}")]
    Submit(#[from] SubmitError),
    #[error("Failed to run the instance, more details: {0}")]
    Solve(#[from] SolveError),
    #[error("Failed to summarize, more details: {0}")]
    Summarize(#[from] SummarizeError),
    #[error("Cannot install the signal handlers, more details: {0}")]
    SignalHandlers(std::io::Error),
}

impl BioschedError {
    pub(crate) fn invalid_instance(path: impl Display, source: InstanceError) -> Self {
        Self::InvalidInstance {
            path: format!("{}", path),
            source,
        }
    }
}
