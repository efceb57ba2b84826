mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{config, context, executor, RecordingCapability, RoutingOracle};
use pretty_assertions::assert_eq;
use taskweave_core::api::{
    group, AppConfig, CapabilityRegistry, ExecutorError, InMemoryLedger, LedgerKind, Planner,
    PlannerError, Task, TaskKind, TaskState,
};

const SALES_PLAN: &str = r#"Here is the plan:
{
  "tasks": [
    {
      "sub_task_name": "Collect sales data",
      "sub_task_describe": "Gather the quarterly sales figures",
      "process": "query the sales warehouse",
      "sub_task_type": "task",
      "dependent": ""
    },
    {
      "sub_task_name": "Write report",
      "sub_task_describe": "Summarize the findings in a report",
      "process": "write the report",
      "sub_task_type": "task",
      "dependent": "Collect sales data"
    }
  ],
  "summary": "collect then report"
}"#;

fn independent(names: &[&str]) -> Vec<Task> {
    names
        .iter()
        .map(|n| Task::new(*n, format!("do {n}")).with_id(*n).with_kind(TaskKind::Plain))
        .collect()
}

#[tokio::test]
async fn sales_report_plans_and_runs_in_order() {
    let message = "Analyze the sales data and generate a report";
    let oracle = Arc::new(
        RoutingOracle::new("done")
            .reply("User Request:", SALES_PLAN)
            .reply("Task: Collect sales data", "figures: 42")
            .reply("Task: Write report", "report body"),
    );
    let ledger = Arc::new(InMemoryLedger::new());
    let cfg = config(false, 5);
    let ctx = context(cfg.clone());

    let planner = Planner::new(oracle.clone(), ledger.clone());
    assert!(planner.needs_plan(message));

    let mut plan = planner.plan(message, &ctx).await.unwrap();
    assert!(!plan.fallback);
    assert_eq!(plan.summary, "collect then report");
    let a = plan.tasks[0].id.clone();
    let b = plan.tasks[1].id.clone();
    assert_eq!(plan.tasks[1].predecessor, a);
    assert_eq!(plan.dependencies[&b], vec![a.clone()]);

    let waves: Vec<Vec<String>> = group(&plan.tasks)
        .iter()
        .map(|w| w.iter().map(|t| t.id.clone()).collect())
        .collect();
    assert_eq!(waves, vec![vec![a.clone()], vec![b.clone()]]);

    let exec = executor(oracle.clone(), CapabilityRegistry::new(), ledger.clone(), &cfg);
    let report = exec.execute_batch(&mut plan.tasks, &ctx).await.unwrap();
    assert!(report.is_success());
    assert_eq!(report.succeeded, vec![a, b]);

    assert!(plan.tasks.iter().all(|t| t.state == TaskState::Success));
    assert_eq!(plan.tasks[0].output.as_deref(), Some("figures: 42"));
    assert_eq!(plan.tasks[1].output.as_deref(), Some("report body"));
    assert!(plan.tasks[1].output_location.starts_with("Write_report_"));

    let seen = oracle.seen();
    let first = seen.iter().position(|p| p.contains("Task: Collect sales data"));
    let second = seen.iter().position(|p| p.contains("Task: Write report"));
    assert!(first.unwrap() < second.unwrap());

    let planning = ledger.of_kind(LedgerKind::Planning);
    let statuses: Vec<_> = planning.iter().filter_map(|r| r.status()).collect();
    assert_eq!(statuses, vec!["started", "completed"]);
}

#[tokio::test]
async fn serial_batch_survives_a_failing_task() {
    let oracle = Arc::new(RoutingOracle::new("ok").fail("Task: second"));
    let ledger = Arc::new(InMemoryLedger::new());
    let cfg = config(false, 5);
    let ctx = context(cfg.clone());
    let exec = executor(oracle.clone(), CapabilityRegistry::new(), ledger.clone(), &cfg);

    let mut tasks = independent(&["first", "second", "third"]);
    let report = exec.execute_batch(&mut tasks, &ctx).await.unwrap();

    assert_eq!(report.succeeded, vec!["first", "third"]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].task_id, "second");
    assert_eq!(oracle.seen().len(), 3);

    assert_eq!(tasks[1].state, TaskState::Fail);
    assert!(tasks[1].state_msg.contains("refused: Task: second"));
    assert_eq!(tasks[0].state, TaskState::Success);
    assert_eq!(tasks[2].state, TaskState::Success);

    let errors = ledger.of_kind(LedgerKind::Error);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].parent_record_id, tasks[1].record_id);

    match report.ensure_success() {
        Err(ExecutorError::BatchFailed { failed, total, first }) => {
            assert_eq!((failed, total), (1, 3));
            assert!(first.starts_with("second: "));
        }
        other => panic!("expected BatchFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn parallel_wave_respects_worker_limit() {
    let oracle = Arc::new(
        RoutingOracle::new("ok")
            .fail("Task: t3")
            .with_delay(Duration::from_millis(40)),
    );
    let ledger = Arc::new(InMemoryLedger::new());
    let cfg = config(true, 2);
    let ctx = context(cfg.clone());
    let exec = executor(oracle.clone(), CapabilityRegistry::new(), ledger, &cfg);

    let mut tasks = independent(&["t1", "t2", "t3", "t4", "t5", "t6"]);
    let report = exec.execute_batch(&mut tasks, &ctx).await.unwrap();

    assert_eq!(report.waves.len(), 1);
    assert_eq!(oracle.peak(), 2);
    assert_eq!(report.succeeded.len(), 5);
    assert_eq!(report.failures.len(), 1);
    assert!(tasks.iter().all(|t| t.state.is_terminal()));
}

#[tokio::test]
async fn serial_mode_never_overlaps_calls() {
    let oracle = Arc::new(RoutingOracle::new("ok").with_delay(Duration::from_millis(5)));
    let cfg = config(false, 8);
    let ctx = context(cfg.clone());
    let exec = executor(
        oracle.clone(),
        CapabilityRegistry::new(),
        Arc::new(InMemoryLedger::new()),
        &cfg,
    );

    let mut tasks = independent(&["a", "b", "c"]);
    exec.execute_batch(&mut tasks, &ctx).await.unwrap();
    assert_eq!(oracle.peak(), 1);
}

#[tokio::test]
async fn cancelled_context_skips_dispatch() {
    let oracle = Arc::new(RoutingOracle::new("ok"));
    let cfg = config(true, 2);
    let ctx = context(cfg.clone());
    ctx.cancellation.cancel();
    let exec = executor(
        oracle.clone(),
        CapabilityRegistry::new(),
        Arc::new(InMemoryLedger::new()),
        &cfg,
    );

    let mut tasks = independent(&["a", "b"]);
    tasks.push(Task::new("c", "after a").with_id("c").with_predecessor("a"));
    let mut report = exec.execute_batch(&mut tasks, &ctx).await.unwrap();

    report.skipped.sort();
    assert_eq!(report.skipped, vec!["a", "b", "c"]);
    assert!(report.succeeded.is_empty());
    assert!(tasks.iter().all(|t| t.state == TaskState::Wait));
    assert!(oracle.seen().is_empty());
}

#[tokio::test]
async fn cyclic_tasks_stay_waiting_and_are_reported() {
    let oracle = Arc::new(RoutingOracle::new("ok"));
    let cfg = config(false, 5);
    let ctx = context(cfg.clone());
    let exec = executor(
        oracle,
        CapabilityRegistry::new(),
        Arc::new(InMemoryLedger::new()),
        &cfg,
    );

    let mut tasks = vec![
        Task::new("root", "r").with_id("root"),
        Task::new("x", "x").with_id("x").with_predecessor("y"),
        Task::new("y", "y").with_id("y").with_predecessor("x"),
    ];
    let report = exec.execute_batch(&mut tasks, &ctx).await.unwrap();

    assert_eq!(report.succeeded, vec!["root"]);
    assert_eq!(report.unresolved, vec!["x", "y"]);
    assert_eq!(tasks[1].state, TaskState::Wait);
    assert!(!report.is_success());
}

#[tokio::test]
async fn duplicate_ids_are_rejected_before_dispatch() {
    let oracle = Arc::new(RoutingOracle::new("ok"));
    let cfg = config(false, 5);
    let ctx = context(cfg.clone());
    let exec = executor(
        oracle.clone(),
        CapabilityRegistry::new(),
        Arc::new(InMemoryLedger::new()),
        &cfg,
    );

    let mut tasks = vec![
        Task::new("a", "one").with_id("same"),
        Task::new("b", "two").with_id("same"),
    ];
    let err = exec.execute_batch(&mut tasks, &ctx).await.unwrap_err();
    assert!(matches!(err, ExecutorError::DuplicateTaskId(id) if id == "same"));
    assert!(oracle.seen().is_empty());
}

#[tokio::test]
async fn function_call_tasks_use_the_registry() {
    let recorder = Arc::new(RecordingCapability::new("recorder"));
    let registry = CapabilityRegistry::new().with(recorder.clone());
    let ledger = Arc::new(InMemoryLedger::new());
    let cfg = config(false, 5);
    let ctx = context(cfg.clone());
    let exec = executor(Arc::new(RoutingOracle::new("ok")), registry, ledger.clone(), &cfg);

    let mut tasks = vec![
        Task::new("call", "invoke recorder")
            .with_id("call")
            .with_kind(TaskKind::FunctionCall)
            .with_process("<function_call>recorder(a=1, label='x y')</function_call>"),
        Task::new("missing", "invoke ghost")
            .with_id("missing")
            .with_kind(TaskKind::FunctionCall)
            .with_process("ghost(a=1)"),
        Task::new("rejected", "bad args")
            .with_id("rejected")
            .with_kind(TaskKind::FunctionCall)
            .with_process("recorder(reject=yes)"),
    ];
    let report = exec.execute_batch(&mut tasks, &ctx).await.unwrap();

    assert_eq!(report.succeeded, vec!["call"]);
    assert_eq!(recorder.calls().len(), 1);
    assert_eq!(recorder.calls()[0]["label"], "x y");

    let output: serde_json::Value =
        serde_json::from_str(tasks[0].output.as_deref().unwrap()).unwrap();
    assert_eq!(output["echo"]["a"], 1);
    assert!(tasks[0].output_location.starts_with("function_recorder_"));
    assert!(tasks[0].output_location.ends_with(".json"));

    assert_eq!(tasks[1].state_msg, "function ghost not found");
    assert!(tasks[2].state_msg.starts_with("invalid arguments for recorder"));
    assert_eq!(ledger.of_kind(LedgerKind::FunctionCall).len(), 1);
}

#[tokio::test]
async fn delegate_call_frames_the_persona() {
    let oracle = Arc::new(RoutingOracle::new("ok").reply("Acting as agent 'Analyst'", "compared"));
    let cfg = config(false, 5);
    let ctx = context(cfg.clone());
    let exec = executor(
        oracle.clone(),
        CapabilityRegistry::new(),
        Arc::new(InMemoryLedger::new()),
        &cfg,
    );

    let mut task = Task::new("compare", "compare quarters")
        .with_kind(TaskKind::DelegateCall)
        .with_process("<agent_call>Analyst: compare Q1 and Q2</agent_call>");
    exec.execute_task(&mut task, &ctx).await.unwrap();

    assert_eq!(task.output.as_deref(), Some("compared"));
    assert_eq!(
        oracle.seen(),
        vec!["Acting as agent 'Analyst', execute: compare Q1 and Q2".to_string()]
    );
}

#[tokio::test]
async fn non_waiting_task_is_left_untouched() {
    let oracle = Arc::new(RoutingOracle::new("ok"));
    let cfg = config(false, 5);
    let ctx = context(cfg.clone());
    let exec = executor(
        oracle.clone(),
        CapabilityRegistry::new(),
        Arc::new(InMemoryLedger::new()),
        &cfg,
    );

    let mut task = Task::new("done", "already ran");
    exec.execute_task(&mut task, &ctx).await.unwrap();
    let before = task.clone();

    let err = exec.execute_task(&mut task, &ctx).await.unwrap_err();
    assert!(matches!(err, ExecutorError::InvalidTransition(_)));
    assert_eq!(task.state, TaskState::Success);
    assert_eq!(task.updated_at, before.updated_at);
    assert_eq!(oracle.seen().len(), 1);
}

#[tokio::test]
async fn closed_ledger_does_not_stop_execution() {
    let ledger = Arc::new(InMemoryLedger::new());
    ledger.close();
    let cfg = config(false, 5);
    let ctx = context(cfg.clone()).with_parent_record_id("parent-1");
    let exec = executor(
        Arc::new(RoutingOracle::new("ok")),
        CapabilityRegistry::new(),
        ledger.clone(),
        &cfg,
    );

    let mut task = Task::new("t", "run anyway");
    exec.execute_task(&mut task, &ctx).await.unwrap();
    assert_eq!(task.state, TaskState::Success);
    assert_eq!(task.record_id, "parent-1");
    assert!(ledger.is_empty());
}

#[tokio::test]
async fn spawn_task_plans_and_runs_a_nested_batch() {
    let sub_plan = r#"{"tasks": [
        {"sub_task_name": "Sub one", "sub_task_describe": "gather market figures", "process": "p", "sub_task_type": "task", "dependent": ""},
        {"sub_task_name": "Sub two", "sub_task_describe": "write the summary", "process": "p", "sub_task_type": "task", "dependent": "Sub one"}
    ], "summary": "nested"}"#;
    let oracle = Arc::new(
        RoutingOracle::new("ok")
            .reply("User Request: Research the market", sub_plan)
            .reply("Task: Sub one", "figures")
            .reply("Task: Sub two", "summary"),
    );
    let ledger = Arc::new(InMemoryLedger::new());
    let cfg = config(false, 5);
    let ctx = context(cfg.clone());
    let planner = Arc::new(Planner::new(oracle.clone(), ledger.clone()));
    let exec = executor(oracle.clone(), CapabilityRegistry::new(), ledger.clone(), &cfg)
        .with_planner(planner);

    let mut tasks = vec![Task::new("Spawner", "Research the market and write a summary")
        .with_id("spawn")
        .with_kind(TaskKind::DelegateSpawn)];
    let report = exec.execute_batch(&mut tasks, &ctx).await.unwrap();

    assert!(report.is_success());
    let output = tasks[0].output.as_deref().unwrap();
    assert_eq!(output, "## Sub one\n\nfigures\n\n## Sub two\n\nsummary");

    let planning = ledger.of_kind(LedgerKind::Planning);
    assert_eq!(planning[0].data["depth"], 1);
    assert_eq!(planning[0].parent_record_id, tasks[0].record_id);

    let nested_started: Vec<_> = ledger
        .of_kind(LedgerKind::SubtaskExecution)
        .into_iter()
        .filter(|r| r.status() == Some("started") && r.data["task_name"] == "Sub one")
        .collect();
    assert_eq!(nested_started.len(), 1);
    assert_eq!(nested_started[0].agent_chain, vec!["DefaultAgent", "Spawner"]);
}

#[tokio::test]
async fn spawn_task_fails_when_a_subtask_fails() {
    let sub_plan = r#"{"tasks": [
        {"sub_task_name": "Sub one", "sub_task_describe": "gather", "process": "p", "sub_task_type": "task", "dependent": ""}
    ]}"#;
    let oracle = Arc::new(
        RoutingOracle::new("ok")
            .reply("User Request:", sub_plan)
            .fail("Task: Sub one"),
    );
    let ledger = Arc::new(InMemoryLedger::new());
    let cfg = config(false, 5);
    let ctx = context(cfg.clone());
    let planner = Arc::new(Planner::new(oracle.clone(), ledger.clone()));
    let exec = executor(oracle, CapabilityRegistry::new(), ledger, &cfg).with_planner(planner);

    let mut task = Task::new("Spawner", "Research the market and write a summary")
        .with_kind(TaskKind::DelegateSpawn);
    let err = exec.execute_task(&mut task, &ctx).await.unwrap_err();

    assert!(matches!(err, ExecutorError::SubtasksFailed { failed: 1, total: 1 }));
    assert_eq!(task.state, TaskState::Fail);
    assert_eq!(task.state_msg, "1 of 1 subtasks failed");
}

#[tokio::test]
async fn spawn_without_budget_runs_as_plain_task() {
    let oracle = Arc::new(RoutingOracle::new("plain answer"));
    let ledger = Arc::new(InMemoryLedger::new());
    let mut cfg = AppConfig::default();
    cfg.agent.max_steps = vec![3, 2];
    let cfg = Arc::new(cfg);
    let ctx = context(cfg.clone()).descend();
    let planner = Arc::new(Planner::new(oracle.clone(), ledger.clone()));
    let exec = executor(oracle.clone(), CapabilityRegistry::new(), ledger.clone(), &cfg)
        .with_planner(planner);

    let mut task = Task::new("Spawner", "Research the market and write a summary")
        .with_kind(TaskKind::DelegateSpawn);
    exec.execute_task(&mut task, &ctx).await.unwrap();

    assert_eq!(task.output.as_deref(), Some("plain answer"));
    assert!(ledger.of_kind(LedgerKind::Planning).is_empty());
    assert!(oracle.seen()[0].starts_with("Execute the following task:"));
}

#[tokio::test]
async fn planning_past_the_budget_is_refused_without_a_ledger_entry() {
    let oracle = Arc::new(RoutingOracle::new("{}"));
    let ledger = Arc::new(InMemoryLedger::new());
    let mut cfg = AppConfig::default();
    cfg.agent.max_steps = vec![3, 2];
    let ctx = context(Arc::new(cfg)).descend().descend();
    let planner = Planner::new(oracle.clone(), ledger.clone());

    let err = planner.plan("Research and compare", &ctx).await.unwrap_err();
    assert!(matches!(err, PlannerError::DepthExceeded { depth: 2, budget: 2 }));
    assert!(ledger.is_empty());
    assert!(oracle.seen().is_empty());
}

#[tokio::test]
async fn tasks_cut_short_by_cancellation_fail_as_cancelled() {
    let oracle = Arc::new(RoutingOracle::new("late").with_delay(Duration::from_millis(300)));
    let ledger = Arc::new(InMemoryLedger::new());
    let cfg = config(false, 5);
    let planner = Arc::new(Planner::new(oracle.clone(), ledger.clone()));
    let exec = executor(oracle.clone(), CapabilityRegistry::new(), ledger, &cfg)
        .with_planner(planner);

    let plain = Task::new("Plain", "answer a question").with_kind(TaskKind::Plain);
    let spawn = Task::new("Spawner", "Research the market and write a summary")
        .with_kind(TaskKind::DelegateSpawn);
    for mut task in [plain, spawn] {
        let ctx = context(cfg.clone());
        let token = ctx.cancellation.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            token.cancel();
        });

        let err = exec.execute_task(&mut task, &ctx).await.unwrap_err();
        assert!(matches!(err, ExecutorError::Cancelled), "{}: {err:?}", task.name);
        assert_eq!(task.state, TaskState::Fail);
        assert_eq!(task.state_msg, "cancelled");
    }
    assert!(oracle.seen()[1].contains("User Request:"));
}

#[tokio::test]
async fn wave_with_a_spawn_task_runs_serially() {
    let oracle = Arc::new(RoutingOracle::new("ok").with_delay(Duration::from_millis(20)));
    let cfg = config(true, 4);
    let ctx = context(cfg.clone());
    let exec = executor(
        oracle.clone(),
        CapabilityRegistry::new(),
        Arc::new(InMemoryLedger::new()),
        &cfg,
    );

    let mut tasks = independent(&["a", "b", "c"]);
    tasks.push(
        Task::new("Spawner", "write a summary")
            .with_id("spawn")
            .with_kind(TaskKind::DelegateSpawn),
    );
    let report = exec.execute_batch(&mut tasks, &ctx).await.unwrap();

    assert_eq!(report.waves.len(), 1);
    assert!(report.is_success());
    assert_eq!(oracle.peak(), 1);
    assert_eq!(oracle.seen().len(), 4);
}
