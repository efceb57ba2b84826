#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use taskweave_core::api::{
    AppConfig, Capability, CapabilityArgs, CapabilityError, CapabilityRegistry, ExecutionContext,
    InMemoryLedger, LlmParams, Message, OracleError, OracleResponse, ReasoningOracle,
    TaskExecutor,
};
use tokio_util::sync::CancellationToken;

/// Answers by the first rule whose needle occurs in the last user message.
///
/// Tracks how many calls are in flight so tests can assert worker bounds.
pub struct RoutingOracle {
    rules: Vec<(String, Result<String, OracleError>)>,
    default: String,
    delay: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    seen: Mutex<Vec<String>>,
}

impl RoutingOracle {
    pub fn new(default: impl Into<String>) -> Self {
        Self {
            rules: Vec::new(),
            default: default.into(),
            delay: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn reply(mut self, needle: &str, text: impl Into<String>) -> Self {
        self.rules.push((needle.to_string(), Ok(text.into())));
        self
    }

    pub fn fail(mut self, needle: &str) -> Self {
        self.rules.push((
            needle.to_string(),
            Err(OracleError::Api(format!("refused: {needle}"))),
        ));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Last user message of every call, in call order.
    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReasoningOracle for RoutingOracle {
    fn name(&self) -> &str {
        "routing"
    }

    async fn infer(
        &self,
        messages: Vec<Message>,
        _params: LlmParams,
    ) -> Result<OracleResponse, OracleError> {
        let prompt = messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.clone())
            .unwrap_or_default();
        self.seen.lock().unwrap().push(prompt.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let answer = self
            .rules
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, answer)| answer.clone())
            .unwrap_or_else(|| Ok(self.default.clone()));
        answer.map(OracleResponse::text)
    }
}

/// Capability that records its arguments and echoes them back.
pub struct RecordingCapability {
    name: String,
    calls: Mutex<Vec<CapabilityArgs>>,
}

impl RecordingCapability {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<CapabilityArgs> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Capability for RecordingCapability {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "records arguments"
    }

    fn validate(&self, args: &CapabilityArgs) -> Result<(), CapabilityError> {
        if args.contains_key("reject") {
            return Err(CapabilityError::InvalidArgs("reject flag set".to_string()));
        }
        Ok(())
    }

    async fn invoke(
        &self,
        _cancel: CancellationToken,
        args: CapabilityArgs,
    ) -> Result<Value, CapabilityError> {
        self.calls.lock().unwrap().push(args.clone());
        Ok(json!({ "echo": Value::Object(args) }))
    }
}

/// Route engine logs through the test harness; `RUST_LOG` narrows them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

pub fn config(parallel: bool, max_workers: usize) -> Arc<AppConfig> {
    let mut cfg = AppConfig::default();
    cfg.agent.parallel = parallel;
    cfg.agent.max_workers = max_workers;
    Arc::new(cfg)
}

pub fn context(cfg: Arc<AppConfig>) -> ExecutionContext {
    ExecutionContext::new(cfg).with_session_id("session-test")
}

pub fn executor(
    oracle: Arc<dyn ReasoningOracle>,
    registry: CapabilityRegistry,
    ledger: Arc<InMemoryLedger>,
    cfg: &AppConfig,
) -> TaskExecutor {
    init_tracing();
    TaskExecutor::from_config(oracle, Arc::new(registry), ledger, &cfg.agent)
}
