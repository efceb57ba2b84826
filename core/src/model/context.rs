use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::config::AppConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmParams {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OracleResponse {
    pub content: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub usage: TokenUsage,
}

impl OracleResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }
}

/// Per-request parameters threaded through planning and execution.
///
/// The engine only reads it. Delegation and recursion derive a new value
/// (`delegated`, `descend`) so workers sharing one context never race.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub agent_id: String,
    pub agent_name: String,
    pub agent_chain: Vec<String>,
    pub session_id: String,
    pub parent_record_id: String,
    pub messages: Vec<Message>,
    pub config: Arc<AppConfig>,
    /// Planning recursion depth; indexes `config.agent.max_steps`.
    pub depth: usize,
    pub cancellation: CancellationToken,
}

impl ExecutionContext {
    pub fn new(config: Arc<AppConfig>) -> Self {
        let agent_name = config.agent.name.clone();
        Self {
            agent_id: uuid::Uuid::new_v4().to_string(),
            agent_chain: vec![agent_name.clone()],
            agent_name,
            session_id: uuid::Uuid::new_v4().to_string(),
            parent_record_id: String::new(),
            messages: Vec::new(),
            config,
            depth: 0,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn with_parent_record_id(&self, record_id: impl Into<String>) -> Self {
        let mut child = self.clone();
        child.parent_record_id = record_id.into();
        child
    }

    /// Copy with `agent` appended to the delegation chain.
    pub fn delegated(&self, agent: impl Into<String>) -> Self {
        let mut child = self.clone();
        child.agent_chain.push(agent.into());
        child
    }

    /// Copy one planning level deeper.
    pub fn descend(&self) -> Self {
        let mut child = self.clone();
        child.depth += 1;
        child
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Subtask ceiling for the current depth, `None` once the budget is exhausted.
    pub fn step_budget(&self) -> Option<usize> {
        self.config.agent.max_steps.get(self.depth).copied()
    }

    pub fn llm_params(&self) -> LlmParams {
        LlmParams {
            model: self.config.llm.model.clone(),
            temperature: self.config.llm.temperature,
            max_tokens: self.config.llm.max_tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_contexts_leave_original_untouched() {
        let ctx = ExecutionContext::new(Arc::new(AppConfig::default()));
        let child = ctx.delegated("Writer").descend();

        assert_eq!(ctx.agent_chain, vec!["DefaultAgent".to_string()]);
        assert_eq!(ctx.depth, 0);
        assert_eq!(child.agent_chain, vec!["DefaultAgent", "Writer"]);
        assert_eq!(child.depth, 1);
        assert_eq!(child.session_id, ctx.session_id);
    }

    #[test]
    fn step_budget_follows_depth() {
        let ctx = ExecutionContext::new(Arc::new(AppConfig::default()));
        assert_eq!(ctx.step_budget(), Some(5));
        assert_eq!(ctx.descend().descend().step_budget(), Some(2));
        assert_eq!(ctx.descend().descend().descend().step_budget(), None);
    }

    #[test]
    fn children_share_cancellation() {
        let ctx = ExecutionContext::new(Arc::new(AppConfig::default()));
        let child = ctx.delegated("Sub");
        ctx.cancellation.cancel();
        assert!(child.is_cancelled());
    }
}
