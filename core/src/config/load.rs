use std::path::{Path, PathBuf};

use super::types::AppConfig;

/// Get the default taskweave data directory: ~/.taskweave
pub fn get_data_dir() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(PathBuf::from(home).join(".taskweave"))
}

pub fn load_from_path(path: &Path) -> anyhow::Result<AppConfig> {
    let s = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("read config {} failed: {}", path.display(), e))?;
    let mut cfg = toml::from_str::<AppConfig>(&s)
        .map_err(|e| anyhow::anyhow!("parse config {} failed: {}", path.display(), e))?;
    apply_env_overrides(&mut cfg, |k| std::env::var(k).ok());
    Ok(cfg)
}

pub fn load_default() -> anyhow::Result<AppConfig> {
    // Priority 1: ~/.taskweave/config.toml (highest)
    let home_config = get_data_dir()
        .map(|d| d.join("config.toml"))
        .ok()
        .filter(|p| p.exists());

    // Priority 2: ./config.toml (current directory)
    let local_config = Path::new("config.toml");

    let mut cfg: AppConfig = if let Some(path) = home_config {
        let s = std::fs::read_to_string(&path)?;
        toml::from_str::<AppConfig>(&s)?
    } else if local_config.exists() {
        let s = std::fs::read_to_string(local_config)?;
        toml::from_str::<AppConfig>(&s)?
    } else {
        AppConfig::default()
    };

    // Environment variable overrides (Priority 0: highest)
    apply_env_overrides(&mut cfg, |k| std::env::var(k).ok());

    Ok(cfg)
}

/// Apply `TASKWEAVE_*` overrides. `lookup` is the environment (injectable for tests).
pub fn apply_env_overrides<F>(cfg: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = get("TASKWEAVE_LLM_BASE_URL") {
        cfg.llm.base_url = v;
    }
    if let Some(v) = get("TASKWEAVE_LLM_API_KEY") {
        cfg.llm.api_key = v;
    }
    if let Some(v) = get("TASKWEAVE_LLM_MODEL") {
        cfg.llm.model = v;
    }
    if let Some(v) = get("TASKWEAVE_PARALLEL") {
        cfg.agent.parallel = matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes");
    }
    if let Some(v) = get("TASKWEAVE_MAX_WORKERS") {
        match v.trim().parse::<usize>() {
            Ok(n) if n > 0 => cfg.agent.max_workers = n,
            _ => tracing::warn!(target: "taskweave.config", "ignoring invalid TASKWEAVE_MAX_WORKERS={}", v),
        }
    }
}
