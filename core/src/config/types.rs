use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub planner: PlannerConfig,

    #[serde(default)]
    pub ledger: LedgerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub capabilities: CapabilitiesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_agent_name")]
    pub name: String,

    #[serde(default = "default_role_description")]
    pub role_description: String,

    /// Planning budget: one ceiling on proposed subtasks per recursion depth.
    #[serde(default = "default_max_steps")]
    pub max_steps: Vec<usize>,

    /// Allow intra-wave parallel execution.
    #[serde(default)]
    pub parallel: bool,

    /// Worker limit for a parallel wave.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
}

fn default_agent_name() -> String {
    "DefaultAgent".to_string()
}

fn default_role_description() -> String {
    "A helpful AI assistant".to_string()
}

fn default_max_steps() -> Vec<usize> {
    vec![5, 3, 2]
}

fn default_max_workers() -> usize {
    5
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            role_description: default_role_description(),
            max_steps: default_max_steps(),
            parallel: false,
            max_workers: default_max_workers(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_provider")]
    pub provider: String,

    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    #[serde(default = "default_llm_temperature")]
    pub temperature: f32,

    #[serde(default = "default_llm_max_tokens")]
    pub max_tokens: u32,

    /// Per-request HTTP timeout.
    #[serde(default = "default_llm_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_llm_provider() -> String {
    "openai".to_string()
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_llm_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_llm_temperature() -> f32 {
    0.7
}

fn default_llm_max_tokens() -> u32 {
    2000
}

fn default_llm_timeout_ms() -> u64 {
    60_000
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            base_url: default_llm_base_url(),
            api_key: String::new(),
            model: default_llm_model(),
            temperature: default_llm_temperature(),
            max_tokens: default_llm_max_tokens(),
            timeout_ms: default_llm_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Wall-clock ceiling on one decomposition call, independent of the caller's deadline.
    #[serde(default = "default_planner_timeout_secs")]
    pub timeout_secs: u64,

    /// How many trailing conversation messages go into the planning prompt.
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Messages longer than this (in chars) always get a plan.
    #[serde(default = "default_long_message_chars")]
    pub long_message_chars: usize,
}

fn default_planner_timeout_secs() -> u64 {
    120
}

fn default_history_window() -> usize {
    5
}

fn default_long_message_chars() -> usize {
    100
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_planner_timeout_secs(),
            history_window: default_history_window(),
            long_message_chars: default_long_message_chars(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default = "default_ledger_enabled")]
    pub enabled: bool,

    /// JSONL file path, or `stdout:`.
    #[serde(default = "default_ledger_path")]
    pub path: String,

    #[serde(default = "default_ledger_channel_capacity")]
    pub channel_capacity: usize,

    #[serde(default = "default_ledger_drop_when_full")]
    pub drop_when_full: bool,
}

fn default_ledger_enabled() -> bool {
    true
}

fn default_ledger_path() -> String {
    "./records/ledger.jsonl".to_string()
}

fn default_ledger_channel_capacity() -> usize {
    2048
}

fn default_ledger_drop_when_full() -> bool {
    false
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            enabled: default_ledger_enabled(),
            path: default_ledger_path(),
            channel_capacity: default_ledger_channel_capacity(),
            drop_when_full: default_ledger_drop_when_full(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// If true, log to stderr.
    #[serde(default = "default_logging_console")]
    pub console: bool,

    /// If true, log to a file under `directory` (or OS temp dir if unset).
    #[serde(default)]
    pub file: bool,

    /// EnvFilter string, e.g. "info" or "taskweave_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    /// Optional directory for log files. If empty or unset, uses OS temp dir.
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_console() -> bool {
    true
}

fn default_logging_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            console: default_logging_console(),
            file: false,
            level: default_logging_level(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilitiesConfig {
    #[serde(default = "default_enabled_capabilities")]
    pub enabled: Vec<String>,

    /// Roots the `file` capability may touch.
    #[serde(default = "default_allowed_paths")]
    pub allowed_paths: Vec<String>,
}

fn default_enabled_capabilities() -> Vec<String> {
    vec!["calculator".to_string(), "file".to_string()]
}

fn default_allowed_paths() -> Vec<String> {
    vec!["./output".to_string()]
}

impl Default for CapabilitiesConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled_capabilities(),
            allowed_paths: default_allowed_paths(),
        }
    }
}
