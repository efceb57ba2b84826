pub mod capability;
pub mod factory;
pub mod ledger;
pub mod oracle;
