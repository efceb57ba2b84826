use std::sync::Arc;

use anyhow::Result;
use taskweave_core::api::{
    AppConfig, CapabilityRegistry, ExecutionLedger, NullLedger, ReasoningOracle,
};

use crate::capability::{CalculatorCapability, FileCapability};
use crate::ledger::JsonlLedger;
use crate::oracle::OpenAiChatOracle;

pub fn build_oracle(cfg: &AppConfig) -> Result<Arc<dyn ReasoningOracle>> {
    match cfg.llm.provider.as_str() {
        "openai" | "" => Ok(Arc::new(OpenAiChatOracle::from_config(&cfg.llm)?)),
        other => anyhow::bail!("unsupported llm provider: {other}"),
    }
}

/// The JSONL ledger is returned separately so the caller can flush it on exit.
pub async fn build_ledger(
    cfg: &AppConfig,
) -> Result<(Arc<dyn ExecutionLedger>, Option<Arc<JsonlLedger>>)> {
    if !cfg.ledger.enabled || cfg.ledger.path.trim().is_empty() {
        let ledger: Arc<dyn ExecutionLedger> = Arc::new(NullLedger);
        return Ok((ledger, None));
    }
    let jsonl = Arc::new(JsonlLedger::start(&cfg.ledger).await?);
    let ledger: Arc<dyn ExecutionLedger> = jsonl.clone();
    Ok((ledger, Some(jsonl)))
}

pub fn build_registry(cfg: &AppConfig) -> Result<CapabilityRegistry> {
    let mut registry = CapabilityRegistry::new();
    for name in &cfg.capabilities.enabled {
        match name.trim() {
            "calculator" => {
                registry.register(Arc::new(CalculatorCapability::new()));
            }
            "file" => {
                registry.register(Arc::new(FileCapability::new(
                    &cfg.capabilities.allowed_paths,
                )));
            }
            other => anyhow::bail!("unknown capability: {other}"),
        }
    }
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_follows_enabled_list() {
        let mut cfg = AppConfig::default();
        let registry = build_registry(&cfg).unwrap();
        assert_eq!(registry.names(), vec!["calculator", "file"]);

        cfg.capabilities.enabled = vec!["calculator".to_string()];
        assert_eq!(build_registry(&cfg).unwrap().names(), vec!["calculator"]);

        cfg.capabilities.enabled.push("shell".to_string());
        assert!(build_registry(&cfg).is_err());
    }

    #[tokio::test]
    async fn disabled_ledger_is_null() {
        let mut cfg = AppConfig::default();
        cfg.ledger.enabled = false;
        let (_ledger, jsonl) = build_ledger(&cfg).await.unwrap();
        assert!(jsonl.is_none());
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let mut cfg = AppConfig::default();
        cfg.llm.provider = "carrier-pigeon".to_string();
        assert!(build_oracle(&cfg).is_err());
        cfg.llm.provider = "openai".to_string();
        assert!(build_oracle(&cfg).is_ok());
    }
}
