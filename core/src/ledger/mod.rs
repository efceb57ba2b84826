mod memory;
mod traits;

pub use memory::InMemoryLedger;
pub use traits::{append_best_effort, ExecutionLedger, LedgerKind, LedgerRecord, NullLedger};
