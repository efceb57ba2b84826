use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::LedgerError;

use super::traits::{ExecutionLedger, LedgerKind, LedgerRecord};

/// Mutex-guarded in-process ledger, readable after a run.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    records: Mutex<Vec<LedgerRecord>>,
    closed: std::sync::atomic::AtomicBool,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later append fail with [`LedgerError::Closed`].
    pub fn close(&self) {
        self.closed
            .store(true, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn records(&self) -> Vec<LedgerRecord> {
        self.records
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn of_kind(&self, kind: LedgerKind) -> Vec<LedgerRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.record_type == kind)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ExecutionLedger for InMemoryLedger {
    async fn append(&self, kind: LedgerKind, payload: Value) -> Result<String, LedgerError> {
        if self.closed.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(LedgerError::Closed);
        }
        let record = LedgerRecord::from_payload(kind, payload);
        let id = record.record_id.clone();
        self.records
            .lock()
            .map_err(|_| LedgerError::Io("ledger lock poisoned".to_string()))?
            .push(record);
        Ok(id)
    }
}
