use async_trait::async_trait;

use crate::error::OracleError;
use crate::model::{LlmParams, Message, OracleResponse};

/// Text-completion backend used for decomposition and direct task execution.
///
/// Implementations must tolerate concurrent calls from several workers.
#[async_trait]
pub trait ReasoningOracle: Send + Sync {
    fn name(&self) -> &str;
    async fn infer(
        &self,
        messages: Vec<Message>,
        params: LlmParams,
    ) -> Result<OracleResponse, OracleError>;
}
