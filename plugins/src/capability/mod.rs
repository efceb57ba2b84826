mod calculator;
mod file;

pub use calculator::CalculatorCapability;
pub use file::FileCapability;
