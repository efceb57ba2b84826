use thiserror::Error;

use super::{ExecutorError, PlannerError};

#[derive(Error, Debug)]
pub enum CliError {
    #[error("config error: {0}")]
    Config(String),
    #[error("planning failed: {0}")]
    Planning(#[from] PlannerError),
    #[error("execution failed: {0}")]
    Execution(#[from] ExecutorError),
    #[error("command failed: {0}")]
    Command(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}
