use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;
use taskweave_core::api::{ExecutionLedger, LedgerConfig, LedgerError, LedgerKind, LedgerRecord};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const STDOUT_PATH: &str = "stdout:";

/// Append-only JSONL sink fed through a bounded channel.
///
/// One background task owns the file and writes one record per line. With
/// `drop_when_full` a saturated channel drops records instead of waiting.
pub struct JsonlLedger {
    tx: Mutex<Option<mpsc::Sender<String>>>,
    writer: Mutex<Option<JoinHandle<()>>>,
    dropped: Arc<AtomicU64>,
    drop_when_full: bool,
}

impl JsonlLedger {
    pub async fn start(cfg: &LedgerConfig) -> anyhow::Result<Self> {
        let path = cfg.path.trim().to_string();
        anyhow::ensure!(!path.is_empty(), "ledger path is empty");

        let mut out: Box<dyn tokio::io::AsyncWrite + Unpin + Send> = if path == STDOUT_PATH {
            Box::new(tokio::io::stdout())
        } else {
            if let Some(parent) = Path::new(&path).parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .with_context(|| format!("create ledger dir {}", parent.display()))?;
                }
            }
            let file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .await
                .with_context(|| format!("open ledger {path}"))?;
            Box::new(file)
        };

        let (tx, mut rx) = mpsc::channel::<String>(cfg.channel_capacity.max(1));
        let writer = tokio::spawn(async move {
            while let Some(mut line) = rx.recv().await {
                line.push('\n');
                if let Err(e) = out.write_all(line.as_bytes()).await {
                    tracing::warn!(target: "taskweave.ledger", path = %path, error = %e, "ledger write failed");
                    return;
                }
            }
            if let Err(e) = out.flush().await {
                tracing::warn!(target: "taskweave.ledger", path = %path, error = %e, "ledger flush failed");
            }
        });

        Ok(Self {
            tx: Mutex::new(Some(tx)),
            writer: Mutex::new(Some(writer)),
            dropped: Arc::new(AtomicU64::new(0)),
            drop_when_full: cfg.drop_when_full,
        })
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Stop accepting records and wait until everything queued is written.
    pub async fn shutdown(&self) {
        let tx = self.tx.lock().ok().and_then(|mut g| g.take());
        drop(tx);
        let writer = self.writer.lock().ok().and_then(|mut g| g.take());
        if let Some(writer) = writer {
            let _ = writer.await;
        }
    }

    fn sender(&self) -> Result<mpsc::Sender<String>, LedgerError> {
        self.tx
            .lock()
            .ok()
            .and_then(|g| g.clone())
            .ok_or(LedgerError::Closed)
    }
}

#[async_trait]
impl ExecutionLedger for JsonlLedger {
    async fn append(&self, kind: LedgerKind, payload: Value) -> Result<String, LedgerError> {
        let record = LedgerRecord::from_payload(kind, payload);
        let line =
            serde_json::to_string(&record).map_err(|e| LedgerError::Serialize(e.to_string()))?;
        let tx = self.sender()?;

        if self.drop_when_full {
            match tx.try_send(line) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                }
                Err(mpsc::error::TrySendError::Closed(_)) => return Err(LedgerError::Closed),
            }
        } else if tx.send(line).await.is_err() {
            return Err(LedgerError::Closed);
        }
        Ok(record.record_id)
    }
}
