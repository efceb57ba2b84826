mod scripted;
mod traits;

pub use scripted::ScriptedOracle;
pub use traits::ReasoningOracle;
