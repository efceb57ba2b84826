//! One level of decomposition: gate, prompt, oracle call, parse, clean up.

mod engine;
mod fallback;
mod heuristics;
mod optimizer;
mod parse;
mod prompt;

pub use engine::Planner;
pub use fallback::fallback_plan;
pub use heuristics::needs_plan;
pub use optimizer::{infer_kind, optimize_plan};
pub use parse::{parse_proposal, ProposalError};
