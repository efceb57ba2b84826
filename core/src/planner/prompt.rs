use crate::model::{ExecutionContext, PlanningResult};

pub(crate) const PLANNING_SYSTEM_PROMPT: &str = r#"You are an intelligent task planner. Break complex user requests into actionable subtasks.

Rules:
1. Create clear, specific subtasks.
2. Identify dependencies between tasks.
3. Use an appropriate task type: task, function, agent_call or agent_gen.
4. Keep the number of tasks within the stated limit.
5. Order tasks logically.

For function tasks write the call in "process" as <function_call>name(key=value, ...)</function_call>.
For agent_call tasks write <agent_call>AgentName: instruction</agent_call>.

Reply with JSON in this structure:
{
  "tasks": [
    {
      "sub_task_name": "Task name",
      "sub_task_describe": "Detailed description",
      "process": "How to execute this task",
      "sub_task_type": "task|function|agent_call|agent_gen",
      "dependent": "name of the task this one depends on, or empty string"
    }
  ],
  "summary": "Brief summary of the plan"
}"#;

pub(crate) const REVISION_SYSTEM_PROMPT: &str =
    "You are a task planning expert. Revise execution plans according to feedback and reply with JSON in the same structure as the original plan.";

pub(crate) fn planning_prompt(message: &str, ctx: &ExecutionContext, max_steps: usize) -> String {
    let mut prompt = format!(
        "User Request: {message}\n\nContext:\n- Agent: {agent}\n- Max steps for this level: {max_steps}\n- Current depth: {depth}\n\nPrevious messages:\n",
        agent = ctx.agent_name,
        depth = ctx.depth,
    );

    let window = ctx.config.planner.history_window;
    let start = ctx.messages.len().saturating_sub(window);
    for msg in &ctx.messages[start..] {
        prompt.push_str(&format!("- {}: {}\n", msg.role, msg.content));
    }

    prompt.push_str(&format!(
        "\nPlease create a task plan to address this request.\nBreak it down into no more than {max_steps} subtasks.\nConsider what tools or functions might be needed.\nIdentify any dependencies between tasks."
    ));
    prompt
}

pub(crate) fn revision_prompt(original: &PlanningResult, feedback: &str) -> String {
    let plan_json = serde_json::to_string_pretty(&serde_json::json!({
        "tasks": original.tasks,
        "summary": original.summary,
    }))
    .unwrap_or_else(|_| original.summary.clone());

    format!(
        "Revise the following execution plan based on the feedback.\n\nOriginal plan:\n{plan_json}\n\nFeedback: {feedback}\n\nReply with the revised plan in the same JSON format."
    )
}
