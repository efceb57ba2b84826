//! Per-kind task bodies. Each returns the produced text and an output name.

use chrono::Local;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::json;

use crate::error::{CapabilityError, ExecutorError, OracleError};
use crate::ledger::{append_best_effort, LedgerKind};
use crate::model::{ExecutionContext, Message, OracleResponse, Task};

use super::call_parser::{parse_delegate_call, parse_function_call};
use super::engine::TaskExecutor;

pub(crate) struct TaskOutcome {
    pub output: String,
    pub location: String,
}

fn timestamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

fn markdown_location(task_name: &str) -> String {
    let stem: String = task_name
        .trim()
        .chars()
        .map(|c| if c.is_whitespace() || c == '/' || c == '\\' { '_' } else { c })
        .collect();
    let stem = if stem.is_empty() { "task".to_string() } else { stem };
    format!("{}_{}.md", stem, timestamp())
}

pub(crate) fn plain_prompt(task: &Task, ctx: &ExecutionContext) -> String {
    format!(
        "Execute the following task:\nTask: {}\nDescription: {}\nProcess: {}\n\nContext:\nAgent: {}\nSession: {}\n\nPlease complete this task and provide the result.",
        task.name, task.description, task.process, ctx.agent_name, ctx.session_id
    )
}

impl TaskExecutor {
    async fn call_oracle(
        &self,
        messages: Vec<Message>,
        ctx: &ExecutionContext,
    ) -> Result<OracleResponse, OracleError> {
        tokio::select! {
            _ = ctx.cancellation.cancelled() => Err(OracleError::Cancelled),
            res = self.oracle.infer(messages, ctx.llm_params()) => res,
        }
    }

    pub(crate) async fn run_plain(
        &self,
        task: &Task,
        ctx: &ExecutionContext,
    ) -> Result<TaskOutcome, ExecutorError> {
        let prompt = plain_prompt(task, ctx);
        let mut messages = ctx.messages.clone();
        messages.push(Message::user(prompt.clone()));

        let response = self.call_oracle(messages, ctx).await?;

        append_best_effort(
            self.ledger.as_ref(),
            LedgerKind::AgentExecution,
            json!({
                "parent_id": task.record_id,
                "agent_chain": ctx.agent_chain,
                "task_id": task.id,
                "prompt": prompt,
                "response": response.content,
                "model": response.model,
                "tokens": response.usage,
            }),
            &task.record_id,
        )
        .await;

        Ok(TaskOutcome {
            output: response.content,
            location: markdown_location(&task.name),
        })
    }

    pub(crate) async fn run_function(
        &self,
        task: &Task,
        ctx: &ExecutionContext,
    ) -> Result<TaskOutcome, ExecutorError> {
        let call = parse_function_call(&task.process)
            .ok_or_else(|| ExecutorError::CapabilityNotFound(task.process.trim().to_string()))?;
        let capability = self
            .capabilities
            .lookup(&call.name)
            .ok_or_else(|| ExecutorError::CapabilityNotFound(call.name.clone()))?;

        capability
            .validate(&call.args)
            .map_err(|source| ExecutorError::InvalidArguments {
                name: call.name.clone(),
                source,
            })?;

        tracing::debug!(target: "taskweave.capability", name = %call.name, task_id = %task.id, "invoke");
        let invoked = tokio::select! {
            _ = ctx.cancellation.cancelled() => Err(CapabilityError::Cancelled),
            res = capability.invoke(ctx.cancellation.clone(), call.args.clone()) => res,
        };
        let result = invoked.map_err(|source| match source {
            CapabilityError::Cancelled => ExecutorError::Cancelled,
            source => ExecutorError::CapabilityFailed {
                name: call.name.clone(),
                source,
            },
        })?;

        append_best_effort(
            self.ledger.as_ref(),
            LedgerKind::FunctionCall,
            json!({
                "parent_id": task.record_id,
                "agent_chain": ctx.agent_chain,
                "task_id": task.id,
                "function": call.name,
                "args": call.args,
                "result": result,
            }),
            &task.record_id,
        )
        .await;

        Ok(TaskOutcome {
            output: result.to_string(),
            location: format!("function_{}_{}.json", call.name, timestamp()),
        })
    }

    pub(crate) async fn run_delegate_call(
        &self,
        task: &Task,
        ctx: &ExecutionContext,
    ) -> Result<TaskOutcome, ExecutorError> {
        let (agent, instruction) = parse_delegate_call(&task.process, &task.description);
        let messages = vec![
            Message::system(format!("You are agent: {agent}")),
            Message::user(format!("Acting as agent '{agent}', execute: {instruction}")),
        ];

        let response = self
            .call_oracle(messages, ctx)
            .await
            .map_err(|source| match source {
                OracleError::Cancelled => ExecutorError::Cancelled,
                source => ExecutorError::DelegateFailed {
                    agent: agent.clone(),
                    source,
                },
            })?;

        append_best_effort(
            self.ledger.as_ref(),
            LedgerKind::AgentExecution,
            json!({
                "parent_id": task.record_id,
                "agent_chain": ctx.agent_chain,
                "task_id": task.id,
                "agent_name": agent,
                "agent_task": instruction,
                "result": response.content,
            }),
            &task.record_id,
        )
        .await;

        Ok(TaskOutcome {
            output: response.content,
            location: markdown_location(&task.name),
        })
    }

    /// Run under a child context whose delegation chain ends with the task name.
    ///
    /// With a planner attached, a decomposable description and budget left for
    /// `depth + 1`, the task is planned and executed as a nested batch;
    /// otherwise it runs as a plain task. Boxed because it re-enters the batch.
    pub(crate) fn run_delegate_spawn<'a>(
        &'a self,
        task: &'a Task,
        ctx: &'a ExecutionContext,
    ) -> BoxFuture<'a, Result<TaskOutcome, ExecutorError>> {
        async move {
            let child = ctx
                .delegated(task.name.clone())
                .with_parent_record_id(task.record_id.clone());
            let nested = child.descend();

            let planner = match &self.planner {
                Some(p) if nested.step_budget().is_some() && p.needs_plan(&task.description) => p,
                _ => return self.run_plain(task, &child).await,
            };

            tracing::info!(
                target: "taskweave.exec",
                stage = "spawn.plan",
                task_id = %task.id,
                depth = nested.depth,
            );
            let mut sub = planner.plan(&task.description, &nested).await?;
            let report = self.execute_batch(&mut sub.tasks, &nested).await?;
            if !report.is_success() {
                return Err(ExecutorError::SubtasksFailed {
                    failed: report.not_succeeded(),
                    total: report.total(),
                });
            }

            let output = sub
                .tasks
                .iter()
                .map(|t| format!("## {}\n\n{}", t.name, t.output.as_deref().unwrap_or_default()))
                .collect::<Vec<_>>()
                .join("\n\n");
            Ok(TaskOutcome {
                output,
                location: markdown_location(&task.name),
            })
        }
        .boxed()
    }
}
