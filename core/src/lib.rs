pub mod api;
pub mod capability;
pub mod config;
pub mod error;
pub mod executor;
pub mod ledger;
pub mod model;
pub mod oracle;
pub mod planner;
