use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use crate::config::PlannerConfig;
use crate::error::{OracleError, PlannerError};
use crate::ledger::{append_best_effort, ExecutionLedger, LedgerKind};
use crate::model::{ExecutionContext, Message, OracleResponse, PlanningResult, Task};
use crate::oracle::ReasoningOracle;

use super::fallback::fallback_plan;
use super::heuristics::needs_plan;
use super::optimizer::optimize_plan;
use super::parse::parse_proposal;
use super::prompt::{planning_prompt, revision_prompt, PLANNING_SYSTEM_PROMPT, REVISION_SYSTEM_PROMPT};

/// Decomposes requests into task graphs.
///
/// Holds no per-request state: depth comes from the [`ExecutionContext`], so
/// one planner can serve concurrent requests and nested spawns.
pub struct Planner {
    oracle: Arc<dyn ReasoningOracle>,
    ledger: Arc<dyn ExecutionLedger>,
    timeout: Duration,
    long_message_chars: usize,
}

impl Planner {
    pub fn new(oracle: Arc<dyn ReasoningOracle>, ledger: Arc<dyn ExecutionLedger>) -> Self {
        Self::from_config(oracle, ledger, &PlannerConfig::default())
    }

    pub fn from_config(
        oracle: Arc<dyn ReasoningOracle>,
        ledger: Arc<dyn ExecutionLedger>,
        cfg: &PlannerConfig,
    ) -> Self {
        Self {
            oracle,
            ledger,
            timeout: Duration::from_secs(cfg.timeout_secs),
            long_message_chars: cfg.long_message_chars,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn needs_plan(&self, message: &str) -> bool {
        needs_plan(message, self.long_message_chars)
    }

    pub fn optimize_plan(&self, tasks: Vec<Task>) -> Vec<Task> {
        optimize_plan(tasks)
    }

    /// Run one level of decomposition at `ctx.depth`.
    ///
    /// Depth is checked before anything is recorded. Oracle failures, timeouts
    /// and cancellation are returned; an unusable answer yields the fallback plan.
    pub async fn plan(
        &self,
        message: &str,
        ctx: &ExecutionContext,
    ) -> Result<PlanningResult, PlannerError> {
        let budget = ctx.config.agent.max_steps.len();
        let max_steps = ctx.step_budget().ok_or(PlannerError::DepthExceeded {
            depth: ctx.depth,
            budget,
        })?;
        if ctx.is_cancelled() {
            return Err(PlannerError::Cancelled);
        }

        tracing::info!(
            target: "taskweave.plan",
            stage = "plan.start",
            depth = ctx.depth,
            max_steps,
            agent = %ctx.agent_name,
        );
        let plan_record_id = append_best_effort(
            self.ledger.as_ref(),
            LedgerKind::Planning,
            json!({
                "parent_id": ctx.parent_record_id,
                "agent_chain": ctx.agent_chain,
                "depth": ctx.depth,
                "message": message,
                "status": "started",
            }),
            &ctx.parent_record_id,
        )
        .await;

        let messages = vec![
            Message::system(PLANNING_SYSTEM_PROMPT),
            Message::user(planning_prompt(message, ctx, max_steps)),
        ];
        let response = match self.call_oracle(messages, ctx).await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!(target: "taskweave.plan", stage = "plan.failed", error = %e);
                append_best_effort(
                    self.ledger.as_ref(),
                    LedgerKind::Planning,
                    json!({
                        "parent_id": ctx.parent_record_id,
                        "plan_record_id": plan_record_id,
                        "depth": ctx.depth,
                        "status": "failed",
                        "error": e.to_string(),
                    }),
                    &ctx.parent_record_id,
                )
                .await;
                return Err(e);
            }
        };

        let mut plan = match parse_proposal(&response.content) {
            Ok(mut parsed) => {
                parsed.tasks = optimize_plan(parsed.tasks);
                if parsed.tasks.is_empty() {
                    tracing::warn!(target: "taskweave.plan", "proposal had no usable task, using fallback plan");
                    fallback_plan(message)
                } else {
                    parsed
                }
            }
            Err(e) => {
                tracing::warn!(target: "taskweave.plan", error = %e, "unparsable proposal, using fallback plan");
                fallback_plan(message)
            }
        };
        plan.rebuild_dependencies();

        if plan.len() > max_steps {
            tracing::warn!(
                target: "taskweave.plan",
                proposed = plan.len(),
                max_steps,
                "plan exceeds the step ceiling for this depth"
            );
        }

        append_best_effort(
            self.ledger.as_ref(),
            LedgerKind::Planning,
            json!({
                "parent_id": ctx.parent_record_id,
                "plan_record_id": plan_record_id,
                "agent_chain": ctx.agent_chain,
                "depth": ctx.depth,
                "status": "completed",
                "fallback": plan.fallback,
                "plan": plan,
            }),
            &ctx.parent_record_id,
        )
        .await;

        tracing::info!(
            target: "taskweave.plan",
            stage = "plan.done",
            tasks = plan.len(),
            fallback = plan.fallback,
        );
        Ok(plan)
    }

    /// Ask the oracle to revise `original` given `feedback`.
    ///
    /// An unusable answer returns the original plan unchanged.
    pub async fn revise_plan(
        &self,
        original: &PlanningResult,
        feedback: &str,
        ctx: &ExecutionContext,
    ) -> Result<PlanningResult, PlannerError> {
        if ctx.is_cancelled() {
            return Err(PlannerError::Cancelled);
        }

        let messages = vec![
            Message::system(REVISION_SYSTEM_PROMPT),
            Message::user(revision_prompt(original, feedback)),
        ];
        let response = self.call_oracle(messages, ctx).await?;

        let revised = match parse_proposal(&response.content) {
            Ok(mut parsed) => {
                parsed.tasks = optimize_plan(parsed.tasks);
                if parsed.tasks.is_empty() {
                    None
                } else {
                    parsed.rebuild_dependencies();
                    Some(parsed)
                }
            }
            Err(e) => {
                tracing::warn!(target: "taskweave.plan", error = %e, "unparsable revision, keeping original plan");
                None
            }
        };
        let unchanged = revised.is_none();
        let plan = revised.unwrap_or_else(|| original.clone());

        append_best_effort(
            self.ledger.as_ref(),
            LedgerKind::Planning,
            json!({
                "parent_id": ctx.parent_record_id,
                "agent_chain": ctx.agent_chain,
                "depth": ctx.depth,
                "status": "revised",
                "feedback": feedback,
                "unchanged": unchanged,
                "plan": plan,
            }),
            &ctx.parent_record_id,
        )
        .await;

        Ok(plan)
    }

    // Own timeout, raced against the caller's cancellation.
    async fn call_oracle(
        &self,
        messages: Vec<Message>,
        ctx: &ExecutionContext,
    ) -> Result<OracleResponse, PlannerError> {
        let call = self.oracle.infer(messages, ctx.llm_params());
        tokio::select! {
            _ = ctx.cancellation.cancelled() => Err(PlannerError::Cancelled),
            res = tokio::time::timeout(self.timeout, call) => match res {
                Err(_) => Err(PlannerError::Timeout(self.timeout)),
                Ok(Err(OracleError::Cancelled)) => Err(PlannerError::Cancelled),
                Ok(Err(e)) => Err(PlannerError::Oracle(e)),
                Ok(Ok(resp)) => Ok(resp),
            },
        }
    }
}
