//! Stable re-exports for consumers (`cli`, `plugins`, and external crates).
//!
//! Prefer importing from `taskweave_core::api` instead of reaching into internal modules.

pub use crate::capability::{Capability, CapabilityArgs, CapabilityRegistry};
pub use crate::config::{
    apply_env_overrides, get_data_dir, load_default, load_from_path, AgentConfig, AppConfig,
    CapabilitiesConfig, LedgerConfig, LlmConfig, LoggingConfig, PlannerConfig,
};
pub use crate::error::{
    CapabilityError, CliError, ExecutorError, LedgerError, OracleError, PlannerError,
};
pub use crate::executor::{
    can_parallelize, group, parse_delegate_call, parse_function_call, resolve, BatchReport,
    FunctionCall, Resolution, TaskExecutor, TaskFailure, DEFAULT_PERSONA,
};
pub use crate::ledger::{
    append_best_effort, ExecutionLedger, InMemoryLedger, LedgerKind, LedgerRecord, NullLedger,
};
pub use crate::model::{
    ExecutionContext, LlmParams, Message, OracleResponse, PlanningResult, Task, TaskGraph,
    TaskKind, TaskState, TokenUsage,
};
pub use crate::oracle::{ReasoningOracle, ScriptedOracle};
pub use crate::planner::{fallback_plan, needs_plan, optimize_plan, Planner};
