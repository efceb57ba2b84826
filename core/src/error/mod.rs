#[allow(clippy::module_inception)]
pub mod error;
pub mod executor;
pub mod external;
pub mod planner;

pub use error::CliError;
pub use executor::ExecutorError;
pub use external::{CapabilityError, LedgerError, OracleError};
pub use planner::PlannerError;
