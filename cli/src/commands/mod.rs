pub mod cli;
pub mod plan;
pub mod run;

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use taskweave_core::api::{
    AppConfig, CapabilityRegistry, CliError, ExecutionContext, ExecutionLedger, Planner,
    ReasoningOracle, ScriptedOracle,
};
use taskweave_plugins::factory;
use taskweave_plugins::ledger::JsonlLedger;
use tokio_util::sync::CancellationToken;

use cli::{Args, InputArgs};

/// Served on every call when `--offline` has no script; unparsable as a
/// plan, so planning takes the deterministic fallback.
const OFFLINE_RESPONSE: &str = "offline: no oracle configured";

/// Collaborators shared by one command invocation.
pub struct Session {
    pub cfg: Arc<AppConfig>,
    pub oracle: Arc<dyn ReasoningOracle>,
    pub ledger: Arc<dyn ExecutionLedger>,
    pub registry: Arc<CapabilityRegistry>,
    pub cancel: CancellationToken,
    jsonl: Option<Arc<JsonlLedger>>,
}

impl Session {
    pub async fn open(cfg: AppConfig, args: &Args) -> Result<Self, CliError> {
        let oracle: Arc<dyn ReasoningOracle> = if args.offline {
            Arc::new(offline_oracle(args.script.as_deref())?)
        } else {
            factory::build_oracle(&cfg).map_err(|e| CliError::Config(e.to_string()))?
        };
        let registry =
            factory::build_registry(&cfg).map_err(|e| CliError::Config(e.to_string()))?;
        let (ledger, jsonl) = factory::build_ledger(&cfg).await?;

        let cancel = CancellationToken::new();
        let on_signal = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!(target: "taskweave.exec", "interrupt received, stopping dispatch");
                on_signal.cancel();
            }
        });

        Ok(Self {
            cfg: Arc::new(cfg),
            oracle,
            ledger,
            registry: Arc::new(registry),
            cancel,
            jsonl,
        })
    }

    pub fn planner(&self) -> Planner {
        Planner::from_config(self.oracle.clone(), self.ledger.clone(), &self.cfg.planner)
    }

    pub fn context(&self) -> ExecutionContext {
        ExecutionContext::new(self.cfg.clone()).with_cancellation(self.cancel.clone())
    }

    /// Flush the ledger file, if any.
    pub async fn close(&self) {
        if let Some(jsonl) = &self.jsonl {
            jsonl.shutdown().await;
            let dropped = jsonl.dropped_count();
            if dropped > 0 {
                tracing::warn!(target: "taskweave.ledger", dropped, "ledger records dropped");
            }
        }
    }
}

pub fn offline_oracle(script: Option<&Path>) -> Result<ScriptedOracle, CliError> {
    let Some(path) = script else {
        return Ok(ScriptedOracle::echo(OFFLINE_RESPONSE));
    };
    let raw = std::fs::read_to_string(path)?;
    let responses: Vec<String> = serde_json::from_str(&raw)
        .map_err(|e| CliError::Config(format!("script {}: {e}", path.display())))?;
    if responses.is_empty() {
        return Err(CliError::Config(format!(
            "script {} has no responses",
            path.display()
        )));
    }
    Ok(ScriptedOracle::new(responses))
}

pub fn read_input(args: &InputArgs) -> Result<String, CliError> {
    let raw = if let Some(prompt) = &args.prompt {
        prompt.clone()
    } else if let Some(path) = &args.prompt_file {
        std::fs::read_to_string(path)?
    } else if args.stdin {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        return Err(CliError::Command(
            "one of --prompt, --prompt-file or --stdin is required".to_string(),
        ));
    };

    let message = raw.trim();
    if message.is_empty() {
        return Err(CliError::Command("request is empty".to_string()));
    }
    Ok(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskweave_core::api::{LlmParams, Message};

    fn params() -> LlmParams {
        LlmParams {
            model: "m".to_string(),
            temperature: 0.0,
            max_tokens: 1,
        }
    }

    #[test]
    fn input_comes_from_prompt_or_file() {
        let args = InputArgs {
            prompt: Some("  hello  ".to_string()),
            prompt_file: None,
            stdin: false,
        };
        assert_eq!(read_input(&args).unwrap(), "hello");

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("req.txt");
        std::fs::write(&file, "from file\n").unwrap();
        let args = InputArgs {
            prompt: None,
            prompt_file: Some(file),
            stdin: false,
        };
        assert_eq!(read_input(&args).unwrap(), "from file");

        let none = InputArgs {
            prompt: None,
            prompt_file: None,
            stdin: false,
        };
        assert!(matches!(read_input(&none), Err(CliError::Command(_))));
    }

    #[tokio::test]
    async fn offline_script_replays_responses() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("script.json");
        std::fs::write(&file, r#"["first", "second"]"#).unwrap();

        let oracle = offline_oracle(Some(&file)).unwrap();
        let a = oracle.infer(vec![Message::user("x")], params()).await.unwrap();
        let b = oracle.infer(vec![Message::user("y")], params()).await.unwrap();
        assert_eq!((a.content.as_str(), b.content.as_str()), ("first", "second"));

        std::fs::write(&file, "[]").unwrap();
        assert!(matches!(offline_oracle(Some(&file)), Err(CliError::Config(_))));
    }
}
