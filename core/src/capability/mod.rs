mod registry;
mod traits;

pub use registry::CapabilityRegistry;
pub use traits::{Capability, CapabilityArgs};
