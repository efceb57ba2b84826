use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::error::CapabilityError;

/// Keyword arguments parsed from a function-call task.
pub type CapabilityArgs = Map<String, Value>;

/// A named external action invocable by function-call tasks.
#[async_trait]
pub trait Capability: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn validate(&self, args: &CapabilityArgs) -> Result<(), CapabilityError>;
    /// Long-running bodies should watch `cancel` and return [`CapabilityError::Cancelled`].
    async fn invoke(
        &self,
        cancel: CancellationToken,
        args: CapabilityArgs,
    ) -> Result<Value, CapabilityError>;
}
