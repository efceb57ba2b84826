use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::LedgerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerKind {
    Planning,
    SubtaskExecution,
    FunctionCall,
    Error,
    AgentExecution,
}

impl LedgerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerKind::Planning => "planning",
            LedgerKind::SubtaskExecution => "subtask_execution",
            LedgerKind::FunctionCall => "function_call",
            LedgerKind::Error => "error",
            LedgerKind::AgentExecution => "agent_execution",
        }
    }
}

impl fmt::Display for LedgerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One stored ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub record_id: String,
    pub record_type: LedgerKind,
    #[serde(default)]
    pub parent_record_id: String,
    #[serde(default)]
    pub agent_chain: Vec<String>,
    pub timestamp: DateTime<Utc>,
    pub data: Value,
}

impl LedgerRecord {
    /// Lift `parent_id` and `agent_chain` out of the payload; the payload itself is kept whole.
    pub fn from_payload(kind: LedgerKind, payload: Value) -> Self {
        let parent_record_id = payload
            .get("parent_id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let agent_chain = payload
            .get("agent_chain")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            record_id: uuid::Uuid::new_v4().to_string(),
            record_type: kind,
            parent_record_id,
            agent_chain,
            timestamp: Utc::now(),
            data: payload,
        }
    }

    pub fn status(&self) -> Option<&str> {
        self.data.get("status").and_then(Value::as_str)
    }
}

/// Append-only observability sink. Callers never read it back during execution.
#[async_trait]
pub trait ExecutionLedger: Send + Sync {
    async fn append(&self, kind: LedgerKind, payload: Value) -> Result<String, LedgerError>;
}

/// Append without failing the caller; on error the `fallback_id` stands in
/// for the record id.
pub async fn append_best_effort(
    ledger: &dyn ExecutionLedger,
    kind: LedgerKind,
    payload: Value,
    fallback_id: &str,
) -> String {
    match ledger.append(kind, payload).await {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!(target: "taskweave.ledger", kind = %kind, error = %e, "ledger append failed");
            fallback_id.to_string()
        }
    }
}

/// Accepts and discards everything; used when the ledger is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLedger;

#[async_trait]
impl ExecutionLedger for NullLedger {
    async fn append(&self, _kind: LedgerKind, _payload: Value) -> Result<String, LedgerError> {
        Ok(uuid::Uuid::new_v4().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_lifts_parent_and_chain() {
        let record = LedgerRecord::from_payload(
            LedgerKind::SubtaskExecution,
            json!({"parent_id": "p-1", "agent_chain": ["Main", "Writer"], "status": "started"}),
        );
        assert_eq!(record.parent_record_id, "p-1");
        assert_eq!(record.agent_chain, vec!["Main", "Writer"]);
        assert_eq!(record.status(), Some("started"));

        let line = serde_json::to_value(&record).unwrap();
        assert_eq!(line["record_type"], "subtask_execution");
    }
}
