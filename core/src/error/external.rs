use std::time::Duration;

use thiserror::Error;

/// Failures reported by a reasoning oracle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    #[error("oracle transport error: {0}")]
    Transport(String),

    #[error("oracle returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("oracle api error: {0}")]
    Api(String),

    #[error("oracle response decode failed: {0}")]
    Decode(String),

    #[error("oracle call timed out after {0:?}")]
    Timeout(Duration),

    #[error("oracle call cancelled")]
    Cancelled,

    #[error("scripted failure: {0}")]
    Scripted(String),
}

/// Failures reported by a capability's validator or body.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CapabilityError {
    #[error("{0}")]
    InvalidArgs(String),

    #[error("{0}")]
    Execution(String),

    #[error("cancelled")]
    Cancelled,
}

impl From<std::io::Error> for CapabilityError {
    fn from(err: std::io::Error) -> Self {
        Self::Execution(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("ledger closed")]
    Closed,

    #[error("ledger payload serialize failed: {0}")]
    Serialize(String),

    #[error("ledger io error: {0}")]
    Io(String),
}
