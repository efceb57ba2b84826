mod jsonl;

pub use jsonl::JsonlLedger;
